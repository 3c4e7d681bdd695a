use std::sync::Arc;
use std::time::Duration;

use crate::core::config::Config;
use crate::dispense::{BridgeActuator, DispenseOrchestrator};
use crate::payments::PaymentLedger;
use crate::store::Store;
use crate::utils::error::{AppError, AppResult};

/// Shared state handed to every request handler
#[derive(Clone)]
pub struct ServerState {
    pub config: Arc<Config>,
    pub store: Store,
    pub ledger: PaymentLedger,
    pub orchestrator: Arc<DispenseOrchestrator>,
}

impl ServerState {
    pub fn initialize(config: &Config) -> AppResult<Self> {
        config
            .ensure_work_dir_structure()
            .map_err(|e| AppError::Internal(format!("Failed to create work dirs: {}", e)))?;

        let db_path = config.database_dir().join("fleur.redb");
        let store = Store::open(db_path)?;

        let actuator = Arc::new(BridgeActuator::new(
            config.bridge_url.clone(),
            Duration::from_millis(config.bridge_timeout_ms),
        ));
        let ledger = PaymentLedger::new(store.clone());
        let orchestrator = Arc::new(DispenseOrchestrator::new(store.clone(), actuator));

        Ok(Self {
            config: Arc::new(config.clone()),
            store,
            ledger,
            orchestrator,
        })
    }

    /// State over an in-memory store and a caller-supplied actuator
    #[cfg(test)]
    pub fn for_tests(actuator: Arc<dyn crate::dispense::SlotActuator>) -> Self {
        let config = Config {
            work_dir: "/tmp/fleur-test".into(),
            http_port: 0,
            environment: "test".into(),
            api_key: "test-key".into(),
            bridge_url: "http://127.0.0.1:1".into(),
            bridge_timeout_ms: 100,
        };
        let store = Store::open_in_memory().expect("in-memory store");
        let ledger = PaymentLedger::new(store.clone());
        let orchestrator = Arc::new(DispenseOrchestrator::new(store.clone(), actuator));
        Self {
            config: Arc::new(config),
            store,
            ledger,
            orchestrator,
        }
    }
}
