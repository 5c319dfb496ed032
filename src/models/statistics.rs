//! Modelos de estadísticas de flota
//!
//! Proyecciones de solo lectura: último estado del ledger por vehículo
//! combinado con el último viaje registrado.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::car_entry::CheckOut;
use super::vehicle::Vehicle;

/// Estado actual de un vehículo activo
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VehicleSnapshot {
    #[serde(flatten)]
    pub vehicle: Vehicle,
    /// Fecha del último abastecimiento manual
    pub last_refuel_at: Option<DateTime<Utc>>,
    /// `None` significa desconocido, no cero
    pub current_fuel: Option<f64>,
    pub last_check_out: Option<CheckOut>,
}

/// Resumen para el panel de estadísticas
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FleetStatistics {
    pub active_vehicle_count: usize,
    pub car_entry_count: i64,
    pub open_trip_count: i64,
    pub vehicles: Vec<VehicleSnapshot>,
}
