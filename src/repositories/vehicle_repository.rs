use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::ledger_store::VehicleRegistry;
use crate::models::Vehicle;
use crate::utils::errors::AppResult;

const VEHICLE_COLUMNS: &str =
    "id, number, plate, brand, model, year, is_active, capacity, consumption_rate";

/// Lectura del registro de flota en PostgreSQL
pub struct VehicleRepository {
    pool: PgPool,
}

impl VehicleRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl VehicleRegistry for VehicleRepository {
    async fn get_vehicle(&self, id: Uuid) -> AppResult<Option<Vehicle>> {
        let vehicle = sqlx::query_as::<_, Vehicle>(&format!(
            "SELECT {} FROM vehicles WHERE id = $1",
            VEHICLE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(vehicle)
    }

    async fn list_active_vehicles(&self) -> AppResult<Vec<Vehicle>> {
        let vehicles = sqlx::query_as::<_, Vehicle>(&format!(
            "SELECT {} FROM vehicles WHERE is_active = TRUE ORDER BY number",
            VEHICLE_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(vehicles)
    }
}
