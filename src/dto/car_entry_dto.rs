use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::{CheckIn, CheckOut, FuelRecord};

// Request de check-in; el empleado viene del contexto del llamador
#[derive(Debug, Deserialize)]
pub struct StartCarEntryRequest {
    pub vehicle_id: Uuid,
    pub check_in: CheckIn,
}

// Request de check-out
#[derive(Debug, Deserialize)]
pub struct EndCarEntryRequest {
    pub vehicle_id: Uuid,
    pub check_out: CheckOut,
}

// Request de abastecimiento manual
#[derive(Debug, Deserialize)]
pub struct FuelEntryRequest {
    pub vehicle_id: Uuid,
    pub fuel_added: f64,
}

// Rutas de imágenes ya guardadas por el almacén externo
#[derive(Debug, Deserialize, Validate)]
pub struct AttachImagesRequest {
    #[validate(length(min = 1, max = 5))]
    pub images: Vec<String>,
}

// Response de saldo de combustible
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct FuelBalanceResponse {
    pub vehicle_id: Uuid,
    /// `null` cuando el vehículo no tiene registros
    pub current_fuel: Option<f64>,
}

// Response de borrado de viaje
#[derive(Debug, Serialize, Deserialize)]
pub struct DeletedCarEntryResponse {
    pub entry_id: Uuid,
    pub compensation: FuelRecord,
}

#[derive(Debug, Default, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<i64>,
}
