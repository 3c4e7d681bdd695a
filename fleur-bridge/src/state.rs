use std::sync::Arc;
use std::time::Duration;

use fleur_device::{
    BillAcceptor, DeviceResult, NetworkAcceptor, NetworkRelay, RelayDriver, SimulatedAcceptor,
    SimulatedRelay,
};
use shared::vend::SUPPORTED_BILLS;
use tracing::info;

use crate::config::Config;
use crate::gateway::{CreditGateway, CreditReporter};
use crate::session::SessionTracker;

/// Shared state for the bridge HTTP handlers
#[derive(Clone)]
pub struct BridgeState {
    pub config: Arc<Config>,
    pub acceptor: Arc<dyn BillAcceptor>,
    pub relay: Arc<dyn RelayDriver>,
    pub session: Arc<SessionTracker>,
    pub reporter: Arc<dyn CreditGateway>,
}

impl BridgeState {
    pub fn initialize(config: &Config) -> DeviceResult<Self> {
        let (acceptor, relay): (Arc<dyn BillAcceptor>, Arc<dyn RelayDriver>) = if config.simulate {
            info!("Running with simulated devices");
            (
                Arc::new(SimulatedAcceptor::default()),
                Arc::new(SimulatedRelay::default()),
            )
        } else {
            let acceptor =
                NetworkAcceptor::new(&config.acceptor_host, config.acceptor_port, SUPPORTED_BILLS.to_vec())?
                    .with_deadline(Duration::from_millis(config.accept_deadline_ms));
            let relay = NetworkRelay::new(&config.relay_host, config.relay_port)?
                .with_pulse_hold(Duration::from_millis(config.relay_pulse_ms));
            (Arc::new(acceptor), Arc::new(relay))
        };

        let reporter = Arc::new(CreditReporter::new(&config.server_url, config.api_key.clone()));

        Ok(Self {
            config: Arc::new(config.clone()),
            acceptor,
            relay,
            session: Arc::new(SessionTracker::new()),
            reporter,
        })
    }

    /// State over caller-supplied devices and gateway
    #[cfg(test)]
    pub fn for_tests(acceptor: Arc<dyn BillAcceptor>, reporter: Arc<dyn CreditGateway>) -> Self {
        let config = Config {
            host: "127.0.0.1".into(),
            port: 0,
            server_url: "http://127.0.0.1:1".into(),
            api_key: "test-key".into(),
            simulate: true,
            acceptor_host: "127.0.0.1".into(),
            acceptor_port: 4001,
            relay_host: "127.0.0.1".into(),
            relay_port: 4002,
            relay_pulse_ms: 1,
            accept_deadline_ms: 100,
        };
        Self {
            config: Arc::new(config),
            acceptor,
            relay: Arc::new(SimulatedRelay::new(Duration::from_millis(1))),
            session: Arc::new(SessionTracker::new()),
            reporter,
        }
    }
}
