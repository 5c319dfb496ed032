use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{CarEntry, CheckIn, CheckOut, DeviceInfo, ImageStage, TripFilter};
use crate::utils::errors::{not_found_error, AppResult};

// Fila de car_entries; los bloques de check-in/out se guardan como JSONB
#[derive(Debug, sqlx::FromRow)]
struct CarEntryRow {
    id: Uuid,
    vehicle_id: Uuid,
    employee_id: Uuid,
    device_info: Json<DeviceInfo>,
    check_in: Json<CheckIn>,
    started_at: DateTime<Utc>,
    check_out: Option<Json<CheckOut>>,
    distance_driven: Option<f64>,
    ended_at: Option<DateTime<Utc>>,
}

impl From<CarEntryRow> for CarEntry {
    fn from(row: CarEntryRow) -> Self {
        Self {
            id: row.id,
            vehicle_id: row.vehicle_id,
            employee_id: row.employee_id,
            device_info: row.device_info.0,
            check_in: row.check_in.0,
            started_at: row.started_at,
            check_out: row.check_out.map(|c| c.0),
            distance_driven: row.distance_driven,
            ended_at: row.ended_at,
        }
    }
}

pub struct CarEntryRepository {
    pool: PgPool,
}

impl CarEntryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, entry: &CarEntry) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO car_entries
                (id, vehicle_id, employee_id, device_info, check_in, started_at, check_out, distance_driven, ended_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(entry.id)
        .bind(entry.vehicle_id)
        .bind(entry.employee_id)
        .bind(Json(&entry.device_info))
        .bind(Json(&entry.check_in))
        .bind(entry.started_at)
        .bind(entry.check_out.as_ref().map(Json))
        .bind(entry.distance_driven)
        .bind(entry.ended_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn close(&self, entry: &CarEntry) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE car_entries
            SET check_out = $2, distance_driven = $3, ended_at = $4
            WHERE id = $1 AND check_out IS NULL
            "#,
        )
        .bind(entry.id)
        .bind(entry.check_out.as_ref().map(Json))
        .bind(entry.distance_driven)
        .bind(entry.ended_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(not_found_error("Open car entry", &entry.id));
        }
        Ok(())
    }

    pub async fn replace_images(&self, id: Uuid, stage: ImageStage, images: &[String]) -> AppResult<()> {
        let sql = match stage {
            ImageStage::CheckIn => {
                "UPDATE car_entries SET check_in = jsonb_set(check_in, '{images}', $2) WHERE id = $1"
            }
            ImageStage::CheckOut => {
                "UPDATE car_entries SET check_out = jsonb_set(check_out, '{images}', $2) \
                 WHERE id = $1 AND check_out IS NOT NULL"
            }
        };

        let result = sqlx::query(sql)
            .bind(id)
            .bind(Json(images))
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(not_found_error("Car entry", &id));
        }
        Ok(())
    }

    pub async fn delete(&self, id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM car_entries WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn find_by_id(&self, id: Uuid) -> AppResult<Option<CarEntry>> {
        let row = sqlx::query_as::<_, CarEntryRow>("SELECT * FROM car_entries WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(CarEntry::from))
    }

    pub async fn find_open(&self, vehicle_id: Uuid, employee_id: Uuid) -> AppResult<Option<CarEntry>> {
        let row = sqlx::query_as::<_, CarEntryRow>(
            r#"
            SELECT * FROM car_entries
            WHERE vehicle_id = $1 AND employee_id = $2 AND check_out IS NULL
            ORDER BY started_at DESC
            LIMIT 1
            "#,
        )
        .bind(vehicle_id)
        .bind(employee_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(CarEntry::from))
    }

    pub async fn find_latest_for_vehicle(&self, vehicle_id: Uuid) -> AppResult<Option<CarEntry>> {
        let row = sqlx::query_as::<_, CarEntryRow>(
            "SELECT * FROM car_entries WHERE vehicle_id = $1 ORDER BY started_at DESC LIMIT 1",
        )
        .bind(vehicle_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(CarEntry::from))
    }

    pub async fn list(&self, filter: &TripFilter) -> AppResult<Vec<CarEntry>> {
        let rows = sqlx::query_as::<_, CarEntryRow>(
            r#"
            SELECT * FROM car_entries
            WHERE ($1::uuid IS NULL OR vehicle_id = $1)
              AND ($2::uuid IS NULL OR employee_id = $2)
              AND (NOT $3 OR check_out IS NULL)
            ORDER BY started_at DESC
            LIMIT $4 OFFSET $5
            "#,
        )
        .bind(filter.vehicle_id)
        .bind(filter.employee_id)
        .bind(filter.open_only)
        .bind(filter.limit_or_default())
        .bind(filter.offset_or_default())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(CarEntry::from).collect())
    }

    pub async fn count(&self, open_only: bool) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM car_entries WHERE (NOT $1 OR check_out IS NULL)",
        )
        .bind(open_only)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }
}
