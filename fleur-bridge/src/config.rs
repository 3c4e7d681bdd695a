/// Configuration for the hardware bridge
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,

    /// Base URL of the storefront server
    pub server_url: String,
    /// Shared secret presented on credit reports
    pub api_key: String,

    /// Run against simulated devices instead of real hardware
    pub simulate: bool,

    /// Bill acceptor serial-TCP converter, "host:port"
    pub acceptor_host: String,
    pub acceptor_port: u16,
    /// Relay board, "host:port"
    pub relay_host: String,
    pub relay_port: u16,
    /// How long the relay stays ON when opening a door
    pub relay_pulse_ms: u64,
    /// Deadline for one note-accept cycle
    pub accept_deadline_ms: u64,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            host: std::env::var("BRIDGE_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: std::env::var("BRIDGE_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(9999),
            server_url: std::env::var("SERVER_URL")
                .unwrap_or_else(|_| "http://127.0.0.1:8000".into()),
            api_key: std::env::var("API_KEY").unwrap_or_else(|_| "dev-secret".into()),
            simulate: std::env::var("SIMULATE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(true),
            acceptor_host: std::env::var("ACCEPTOR_HOST").unwrap_or_else(|_| "127.0.0.1".into()),
            acceptor_port: std::env::var("ACCEPTOR_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(4001),
            relay_host: std::env::var("RELAY_HOST").unwrap_or_else(|_| "127.0.0.1".into()),
            relay_port: std::env::var("RELAY_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(4002),
            relay_pulse_ms: std::env::var("RELAY_PULSE_MS")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(700),
            accept_deadline_ms: std::env::var("ACCEPT_DEADLINE_MS")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(10000),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
