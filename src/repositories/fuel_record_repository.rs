use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{FuelRecord, FuelRecordKind};
use crate::utils::errors::{AppError, AppResult};

pub struct FuelRecordRepository {
    pool: PgPool,
}

impl FuelRecordRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_latest(&self, vehicle_id: Uuid) -> AppResult<Option<FuelRecord>> {
        let record = sqlx::query_as::<_, FuelRecord>(
            "SELECT * FROM fuel_records WHERE vehicle_id = $1 ORDER BY sequence DESC LIMIT 1",
        )
        .bind(vehicle_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    pub async fn find_latest_of_kind(
        &self,
        vehicle_id: Uuid,
        kind: FuelRecordKind,
    ) -> AppResult<Option<FuelRecord>> {
        let record = sqlx::query_as::<_, FuelRecord>(
            r#"
            SELECT * FROM fuel_records
            WHERE vehicle_id = $1 AND kind = $2
            ORDER BY sequence DESC
            LIMIT 1
            "#,
        )
        .bind(vehicle_id)
        .bind(kind)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    /// Inserta el registro; la restricción única `(vehicle_id, sequence)`
    /// convierte una carrera entre escritores en `Conflict`.
    pub async fn insert(&self, record: &FuelRecord) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO fuel_records
                (id, vehicle_id, sequence, kind, trip_id, previous_fuel, new_fuel, distance_driven, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(record.id)
        .bind(record.vehicle_id)
        .bind(record.sequence)
        .bind(record.kind)
        .bind(record.trip_id)
        .bind(record.previous_fuel)
        .bind(record.new_fuel)
        .bind(record.distance_driven)
        .bind(record.created_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => Err(AppError::Conflict(format!(
                "fuel record sequence {} for vehicle {} was taken by a concurrent writer",
                record.sequence, record.vehicle_id
            ))),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn find_for_trip(&self, trip_id: Uuid, kind: FuelRecordKind) -> AppResult<Option<FuelRecord>> {
        let record = sqlx::query_as::<_, FuelRecord>(
            "SELECT * FROM fuel_records WHERE trip_id = $1 AND kind = $2",
        )
        .bind(trip_id)
        .bind(kind)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    pub async fn list_by_vehicle(&self, vehicle_id: Uuid, limit: Option<i64>) -> AppResult<Vec<FuelRecord>> {
        let records = sqlx::query_as::<_, FuelRecord>(
            r#"
            SELECT * FROM fuel_records
            WHERE vehicle_id = $1
            ORDER BY sequence DESC
            LIMIT $2
            "#,
        )
        .bind(vehicle_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    pub async fn find_orphaned_compensations(&self) -> AppResult<Vec<FuelRecord>> {
        let records = sqlx::query_as::<_, FuelRecord>(
            r#"
            SELECT f.* FROM fuel_records f
            JOIN car_entries c ON c.id = f.trip_id
            WHERE f.kind = 'compensation'
            ORDER BY f.created_at
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    pub async fn find_orphaned_consumptions(&self) -> AppResult<Vec<FuelRecord>> {
        let records = sqlx::query_as::<_, FuelRecord>(
            r#"
            SELECT f.* FROM fuel_records f
            JOIN car_entries c ON c.id = f.trip_id
            WHERE f.kind = 'consumption' AND c.check_out IS NULL
            ORDER BY f.created_at
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }
}
