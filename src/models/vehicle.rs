//! Modelo de Vehicle
//!
//! Vista de solo lectura del registro de flota. El CRUD de vehículos vive
//! fuera de este servicio; el ledger solo lee la tasa de consumo y el
//! estado activo.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::utils::errors::{invalid_input_error, AppResult};
use crate::utils::validation::ensure_consumption_rate;

/// Vehicle - mapea a la tabla vehicles
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct Vehicle {
    pub id: Uuid,
    pub number: String,
    pub plate: String,
    pub brand: String,
    pub model: String,
    pub year: i32,
    pub is_active: bool,
    /// Capacidad del tanque en litros; solo descriptiva
    #[serde(default)]
    pub capacity: f64,
    /// Distancia recorrida por unidad de combustible
    pub consumption_rate: f64,
}

impl Vehicle {
    /// Tasa de consumo validada; una tasa no positiva hace indefinida la división
    pub fn validated_consumption_rate(&self) -> AppResult<f64> {
        ensure_consumption_rate(self.consumption_rate)
    }

    /// Combustible consumido al recorrer `distance`
    pub fn fuel_for_distance(&self, distance: f64) -> AppResult<f64> {
        let fuel = distance / self.validated_consumption_rate()?;
        if !fuel.is_finite() {
            return Err(invalid_input_error(format!(
                "fuel for {} over rate {} is not a finite amount",
                distance, self.consumption_rate
            )));
        }
        Ok(fuel)
    }
}
