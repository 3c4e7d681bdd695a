use fleur_bridge::{BridgeState, Config, build_app};
use tokio::net::TcpListener;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_max_level(
            std::env::var("LOG_LEVEL")
                .ok()
                .and_then(|l| l.parse().ok())
                .unwrap_or(tracing::Level::INFO),
        )
        .with_target(false)
        .init();

    info!("Fleur bridge starting...");

    let config = Config::from_env();
    let addr = format!("{}:{}", config.host, config.port);
    let state = BridgeState::initialize(&config)?;
    let app = build_app(state);

    let listener = TcpListener::bind(&addr).await?;
    info!(addr = %addr, "Bridge listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received");
        })
        .await?;

    Ok(())
}
