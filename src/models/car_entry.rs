//! Modelo de CarEntry (viaje)
//!
//! Un viaje se abre con un check-in y se cierra con un check-out. Mientras
//! `check_out` es `None` el viaje está abierto; al cerrarse se fija la
//! distancia recorrida y se emite exactamente un registro de consumo.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::utils::errors::AppResult;
use crate::utils::validation::{ensure_distance, ensure_valid};

#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct Location {
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: f64,
}

/// Datos capturados al retirar el vehículo
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct CheckIn {
    #[validate]
    pub location: Location,
    #[validate(length(min = 1, max = 255))]
    pub next_location: String,
    #[validate(length(min = 1, max = 1000))]
    pub car_state: String,
    /// Lectura del odómetro al iniciar
    pub odometer: f64,
    #[serde(default)]
    #[validate(length(max = 5))]
    pub images: Vec<String>,
}

impl CheckIn {
    pub fn validate_fields(&self) -> AppResult<()> {
        ensure_valid(
            self,
            &[("next_location", &self.next_location), ("car_state", &self.car_state)],
        )?;
        ensure_distance("check_in.odometer", self.odometer)?;
        Ok(())
    }
}

/// Datos capturados al devolver el vehículo
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct CheckOut {
    #[validate]
    pub location: Location,
    #[validate(length(min = 1, max = 1000))]
    pub car_state: String,
    /// Lectura del odómetro al finalizar
    pub odometer: f64,
    #[serde(default)]
    #[validate(length(max = 5))]
    pub images: Vec<String>,
}

impl CheckOut {
    pub fn validate_fields(&self) -> AppResult<()> {
        ensure_valid(self, &[("car_state", &self.car_state)])?;
        ensure_distance("check_out.odometer", self.odometer)?;
        Ok(())
    }
}

/// Información del dispositivo que registró el check-in
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DeviceInfo {
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
    /// Sistema operativo según el User-Agent
    pub os: Option<String>,
    /// `desktop`, `mobile`, `bot`, ...
    pub device_type: Option<String>,
    pub browser: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TripStatus {
    Open,
    Closed,
}

/// Etapa del viaje a la que se adjuntan imágenes
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ImageStage {
    CheckIn,
    CheckOut,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CarEntry {
    pub id: Uuid,
    pub vehicle_id: Uuid,
    pub employee_id: Uuid,
    pub device_info: DeviceInfo,
    pub check_in: CheckIn,
    pub started_at: DateTime<Utc>,
    pub check_out: Option<CheckOut>,
    pub distance_driven: Option<f64>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl CarEntry {
    pub fn open(
        vehicle_id: Uuid,
        employee_id: Uuid,
        check_in: CheckIn,
        device_info: DeviceInfo,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            vehicle_id,
            employee_id,
            device_info,
            check_in,
            started_at: Utc::now(),
            check_out: None,
            distance_driven: None,
            ended_at: None,
        }
    }

    pub fn status(&self) -> TripStatus {
        if self.check_out.is_some() {
            TripStatus::Closed
        } else {
            TripStatus::Open
        }
    }

    pub fn is_open(&self) -> bool {
        self.status() == TripStatus::Open
    }

    /// Distancia entre el odómetro de check-in y el de `check_out`
    pub fn distance_to(&self, check_out: &CheckOut) -> f64 {
        check_out.odometer - self.check_in.odometer
    }

    /// Copia cerrada de este viaje
    pub fn closed_with(&self, check_out: CheckOut, distance_driven: f64) -> Self {
        Self {
            check_out: Some(check_out),
            distance_driven: Some(distance_driven),
            ended_at: Some(Utc::now()),
            ..self.clone()
        }
    }

    pub fn images(&self, stage: ImageStage) -> &[String] {
        match stage {
            ImageStage::CheckIn => &self.check_in.images,
            ImageStage::CheckOut => self
                .check_out
                .as_ref()
                .map(|c| c.images.as_slice())
                .unwrap_or(&[]),
        }
    }
}

/// Filtros para el listado de viajes
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TripFilter {
    pub vehicle_id: Option<Uuid>,
    pub employee_id: Option<Uuid>,
    #[serde(default)]
    pub open_only: bool,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl TripFilter {
    pub fn matches(&self, entry: &CarEntry) -> bool {
        self.vehicle_id.map_or(true, |v| v == entry.vehicle_id)
            && self.employee_id.map_or(true, |e| e == entry.employee_id)
            && (!self.open_only || entry.is_open())
    }

    pub fn limit_or_default(&self) -> i64 {
        self.limit.unwrap_or(100).clamp(1, 1000)
    }

    pub fn offset_or_default(&self) -> i64 {
        self.offset.unwrap_or(0).max(0)
    }
}

/// Resultado de reconciliar escrituras de dos fases huérfanas
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ReconcileReport {
    /// Viajes borrados cuya compensación ya estaba registrada
    pub completed_deletions: Vec<Uuid>,
    /// Viajes abiertos que ya tienen registro de consumo; reintentar el cierre
    pub pending_closures: Vec<PendingClosure>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PendingClosure {
    pub trip_id: Uuid,
    pub fuel_record_id: Uuid,
    pub distance_driven: f64,
}
