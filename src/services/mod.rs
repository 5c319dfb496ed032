//! Services module
//!
//! Este módulo contiene la lógica de negocio del ledger de combustible:
//! el motor de registros, el ciclo de vida de los viajes y la capa de
//! lectura para estadísticas de flota.

pub mod fleet_statistics_service;
pub mod fuel_ledger_service;
pub mod trip_lifecycle_service;
pub mod vehicle_locks;

pub use fleet_statistics_service::FleetStatisticsService;
pub use fuel_ledger_service::FuelLedgerService;
pub use trip_lifecycle_service::{ClosedTrip, TripLifecycleService};

use std::future::Future;
use std::time::Duration;

use crate::utils::errors::{unavailable_error, AppResult};

/// Limita en el tiempo un acceso al store o al registro de flota
pub(crate) async fn bounded<T, F>(timeout: Duration, dependency: &str, operation: F) -> AppResult<T>
where
    F: Future<Output = AppResult<T>>,
{
    match tokio::time::timeout(timeout, operation).await {
        Ok(result) => result,
        Err(_) => Err(unavailable_error(
            dependency,
            format!("no response within {:?}", timeout),
        )),
    }
}
