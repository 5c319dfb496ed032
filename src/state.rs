//! Shared application state
//!
//! Este módulo define el estado compartido de la aplicación que se pasa
//! a través del router de Axum.

use std::sync::Arc;

use crate::config::environment::EnvironmentConfig;
use crate::repositories::{LedgerStore, VehicleRegistry};
use crate::services::{FleetStatisticsService, FuelLedgerService, TripLifecycleService};

#[derive(Clone)]
pub struct AppState {
    pub config: EnvironmentConfig,
    pub fuel_ledger: Arc<FuelLedgerService>,
    pub trips: Arc<TripLifecycleService>,
    pub statistics: Arc<FleetStatisticsService>,
}

impl AppState {
    /// Todos los servicios comparten el mismo store y el mismo motor
    pub fn new(
        config: EnvironmentConfig,
        store: Arc<dyn LedgerStore>,
        registry: Arc<dyn VehicleRegistry>,
    ) -> Self {
        let ledger_config = config.ledger.clone();
        let fuel_ledger = Arc::new(FuelLedgerService::new(
            store.clone(),
            registry.clone(),
            ledger_config.clone(),
        ));
        let trips = Arc::new(TripLifecycleService::new(
            store.clone(),
            registry.clone(),
            fuel_ledger.clone(),
            ledger_config.clone(),
        ));
        let statistics = Arc::new(FleetStatisticsService::new(store, registry, ledger_config));

        Self {
            config,
            fuel_ledger,
            trips,
            statistics,
        }
    }
}
