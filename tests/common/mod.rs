//! Fixtures compartidos por los tests de integración
#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use fleet_fuel_ledger::config::LedgerConfig;
use fleet_fuel_ledger::models::{
    CarEntry, CheckIn, CheckOut, FuelRecord, FuelRecordKind, ImageStage, Location, NextFuelRecord,
    TripFilter, Vehicle,
};
use fleet_fuel_ledger::repositories::{InMemoryLedgerStore, InMemoryVehicleRegistry, LedgerStore};
use fleet_fuel_ledger::services::{FuelLedgerService, TripLifecycleService};
use fleet_fuel_ledger::utils::errors::{AppError, AppResult};

pub fn vehicle(consumption_rate: f64) -> Vehicle {
    let id = Uuid::new_v4();
    Vehicle {
        id,
        number: id.simple().to_string()[..4].to_string(),
        plate: "TST0001".to_string(),
        brand: "Peugeot".to_string(),
        model: "Partner".to_string(),
        year: 2023,
        is_active: true,
        capacity: 50.0,
        consumption_rate,
    }
}

pub fn location() -> Location {
    Location {
        latitude: 48.85,
        longitude: 2.35,
    }
}

pub fn check_in(odometer: f64) -> CheckIn {
    CheckIn {
        location: location(),
        next_location: "Warehouse".to_string(),
        car_state: "no damage".to_string(),
        odometer,
        images: vec![],
    }
}

pub fn check_out(odometer: f64) -> CheckOut {
    CheckOut {
        location: location(),
        car_state: "no damage".to_string(),
        odometer,
        images: vec![],
    }
}

/// Fallos inyectables sobre un store en memoria
#[derive(Default)]
pub struct Faults {
    /// Cuántas lecturas de "último registro" serán adelantadas por un escritor concurrente
    pub races: AtomicU32,
    pub latest_delay_ms: AtomicU64,
    pub fail_close: AtomicBool,
    pub fail_delete: AtomicBool,
}

#[derive(Default)]
pub struct FaultyStore {
    pub inner: InMemoryLedgerStore,
    pub faults: Faults,
}

impl FaultyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_races(&self, races: u32) {
        self.faults.races.store(races, Ordering::SeqCst);
    }

    pub fn set_latest_delay(&self, delay: Duration) {
        self.faults.latest_delay_ms.store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn set_fail_close(&self, fail: bool) {
        self.faults.fail_close.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_delete(&self, fail: bool) {
        self.faults.fail_delete.store(fail, Ordering::SeqCst);
    }

    fn take_race(&self) -> bool {
        self.faults
            .races
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

fn store_down() -> AppError {
    AppError::DependencyUnavailable("ledger store unavailable: injected failure".to_string())
}

#[async_trait]
impl LedgerStore for FaultyStore {
    async fn find_latest_fuel_record(&self, vehicle_id: Uuid) -> AppResult<Option<FuelRecord>> {
        let delay = self.faults.latest_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }

        let latest = self.inner.find_latest_fuel_record(vehicle_id).await?;
        if self.take_race() {
            // Otro proceso agrega un abastecimiento después de esta lectura
            let competitor = NextFuelRecord {
                kind: FuelRecordKind::Refuel,
                trip_id: None,
                new_fuel: latest.as_ref().map_or(0.0, |r| r.new_fuel) + 1.0,
                distance_driven: 0.0,
            }
            .chain_after(vehicle_id, latest.as_ref());
            self.inner.append_fuel_record(&competitor).await?;
        }
        Ok(latest)
    }

    async fn find_latest_fuel_record_of_kind(
        &self,
        vehicle_id: Uuid,
        kind: FuelRecordKind,
    ) -> AppResult<Option<FuelRecord>> {
        self.inner.find_latest_fuel_record_of_kind(vehicle_id, kind).await
    }

    async fn append_fuel_record(&self, record: &FuelRecord) -> AppResult<()> {
        self.inner.append_fuel_record(record).await
    }

    async fn find_fuel_record_for_trip(
        &self,
        trip_id: Uuid,
        kind: FuelRecordKind,
    ) -> AppResult<Option<FuelRecord>> {
        self.inner.find_fuel_record_for_trip(trip_id, kind).await
    }

    async fn list_fuel_records(&self, vehicle_id: Uuid, limit: Option<i64>) -> AppResult<Vec<FuelRecord>> {
        self.inner.list_fuel_records(vehicle_id, limit).await
    }

    async fn create_trip(&self, entry: &CarEntry) -> AppResult<()> {
        self.inner.create_trip(entry).await
    }

    async fn close_trip(&self, entry: &CarEntry) -> AppResult<()> {
        if self.faults.fail_close.load(Ordering::SeqCst) {
            return Err(store_down());
        }
        self.inner.close_trip(entry).await
    }

    async fn replace_trip_images(&self, id: Uuid, stage: ImageStage, images: &[String]) -> AppResult<()> {
        self.inner.replace_trip_images(id, stage, images).await
    }

    async fn delete_trip(&self, id: Uuid) -> AppResult<bool> {
        if self.faults.fail_delete.load(Ordering::SeqCst) {
            return Err(store_down());
        }
        self.inner.delete_trip(id).await
    }

    async fn find_trip(&self, id: Uuid) -> AppResult<Option<CarEntry>> {
        self.inner.find_trip(id).await
    }

    async fn find_open_trip(&self, vehicle_id: Uuid, employee_id: Uuid) -> AppResult<Option<CarEntry>> {
        self.inner.find_open_trip(vehicle_id, employee_id).await
    }

    async fn find_latest_trip(&self, vehicle_id: Uuid) -> AppResult<Option<CarEntry>> {
        self.inner.find_latest_trip(vehicle_id).await
    }

    async fn list_trips(&self, filter: &TripFilter) -> AppResult<Vec<CarEntry>> {
        self.inner.list_trips(filter).await
    }

    async fn count_trips(&self, open_only: bool) -> AppResult<i64> {
        self.inner.count_trips(open_only).await
    }

    async fn find_orphaned_compensations(&self) -> AppResult<Vec<FuelRecord>> {
        self.inner.find_orphaned_compensations().await
    }

    async fn find_orphaned_consumptions(&self) -> AppResult<Vec<FuelRecord>> {
        self.inner.find_orphaned_consumptions().await
    }
}

/// Servicios conectados sobre un `FaultyStore`
pub struct Harness {
    pub store: Arc<FaultyStore>,
    pub registry: Arc<InMemoryVehicleRegistry>,
    pub ledger: Arc<FuelLedgerService>,
    pub trips: TripLifecycleService,
}

impl Harness {
    pub fn new(vehicles: Vec<Vehicle>, config: LedgerConfig) -> Self {
        let store = Arc::new(FaultyStore::new());
        let registry = Arc::new(InMemoryVehicleRegistry::with_vehicles(vehicles));
        let ledger = Arc::new(FuelLedgerService::new(
            store.clone(),
            registry.clone(),
            config.clone(),
        ));
        let trips = TripLifecycleService::new(store.clone(), registry.clone(), ledger.clone(), config);
        Self {
            store,
            registry,
            ledger,
            trips,
        }
    }
}
