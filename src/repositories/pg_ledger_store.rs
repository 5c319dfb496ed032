//! Implementación PostgreSQL del `LedgerStore`

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::car_entry_repository::CarEntryRepository;
use super::fuel_record_repository::FuelRecordRepository;
use super::ledger_store::LedgerStore;
use crate::models::{CarEntry, FuelRecord, FuelRecordKind, ImageStage, TripFilter};
use crate::utils::errors::AppResult;

pub struct PgLedgerStore {
    fuel_records: FuelRecordRepository,
    car_entries: CarEntryRepository,
}

impl PgLedgerStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            fuel_records: FuelRecordRepository::new(pool.clone()),
            car_entries: CarEntryRepository::new(pool),
        }
    }
}

#[async_trait]
impl LedgerStore for PgLedgerStore {
    async fn find_latest_fuel_record(&self, vehicle_id: Uuid) -> AppResult<Option<FuelRecord>> {
        self.fuel_records.find_latest(vehicle_id).await
    }

    async fn find_latest_fuel_record_of_kind(
        &self,
        vehicle_id: Uuid,
        kind: FuelRecordKind,
    ) -> AppResult<Option<FuelRecord>> {
        self.fuel_records.find_latest_of_kind(vehicle_id, kind).await
    }

    async fn append_fuel_record(&self, record: &FuelRecord) -> AppResult<()> {
        self.fuel_records.insert(record).await
    }

    async fn find_fuel_record_for_trip(
        &self,
        trip_id: Uuid,
        kind: FuelRecordKind,
    ) -> AppResult<Option<FuelRecord>> {
        self.fuel_records.find_for_trip(trip_id, kind).await
    }

    async fn list_fuel_records(&self, vehicle_id: Uuid, limit: Option<i64>) -> AppResult<Vec<FuelRecord>> {
        self.fuel_records.list_by_vehicle(vehicle_id, limit).await
    }

    async fn create_trip(&self, entry: &CarEntry) -> AppResult<()> {
        self.car_entries.create(entry).await
    }

    async fn close_trip(&self, entry: &CarEntry) -> AppResult<()> {
        self.car_entries.close(entry).await
    }

    async fn replace_trip_images(&self, id: Uuid, stage: ImageStage, images: &[String]) -> AppResult<()> {
        self.car_entries.replace_images(id, stage, images).await
    }

    async fn delete_trip(&self, id: Uuid) -> AppResult<bool> {
        self.car_entries.delete(id).await
    }

    async fn find_trip(&self, id: Uuid) -> AppResult<Option<CarEntry>> {
        self.car_entries.find_by_id(id).await
    }

    async fn find_open_trip(&self, vehicle_id: Uuid, employee_id: Uuid) -> AppResult<Option<CarEntry>> {
        self.car_entries.find_open(vehicle_id, employee_id).await
    }

    async fn find_latest_trip(&self, vehicle_id: Uuid) -> AppResult<Option<CarEntry>> {
        self.car_entries.find_latest_for_vehicle(vehicle_id).await
    }

    async fn list_trips(&self, filter: &TripFilter) -> AppResult<Vec<CarEntry>> {
        self.car_entries.list(filter).await
    }

    async fn count_trips(&self, open_only: bool) -> AppResult<i64> {
        self.car_entries.count(open_only).await
    }

    async fn find_orphaned_compensations(&self) -> AppResult<Vec<FuelRecord>> {
        self.fuel_records.find_orphaned_compensations().await
    }

    async fn find_orphaned_consumptions(&self) -> AppResult<Vec<FuelRecord>> {
        self.fuel_records.find_orphaned_consumptions().await
    }
}
