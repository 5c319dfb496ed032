//! Implementación en memoria del store y del registro de flota
//!
//! Usada en tests y en ejecuciones locales (`STORE_BACKEND=memory`).
//! Respeta el mismo contrato compare-and-append que PostgreSQL.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::ledger_store::{LedgerStore, VehicleRegistry};
use crate::models::{CarEntry, FuelRecord, FuelRecordKind, ImageStage, TripFilter, Vehicle};
use crate::utils::errors::{not_found_error, AppError, AppResult};

#[derive(Default)]
struct MemoryState {
    /// Cadena por vehículo, del más antiguo al más nuevo
    fuel_records: HashMap<Uuid, Vec<FuelRecord>>,
    trips: HashMap<Uuid, CarEntry>,
}

impl MemoryState {
    fn all_records(&self) -> impl Iterator<Item = &FuelRecord> {
        self.fuel_records.values().flatten()
    }

    fn sorted_trips<'a>(&'a self, filter: &'a TripFilter) -> Vec<&'a CarEntry> {
        let mut trips: Vec<&CarEntry> = self.trips.values().filter(|t| filter.matches(t)).collect();
        trips.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        trips
    }
}

#[derive(Default)]
pub struct InMemoryLedgerStore {
    inner: RwLock<MemoryState>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn find_latest_fuel_record(&self, vehicle_id: Uuid) -> AppResult<Option<FuelRecord>> {
        let state = self.inner.read().await;
        Ok(state
            .fuel_records
            .get(&vehicle_id)
            .and_then(|chain| chain.last().cloned()))
    }

    async fn find_latest_fuel_record_of_kind(
        &self,
        vehicle_id: Uuid,
        kind: FuelRecordKind,
    ) -> AppResult<Option<FuelRecord>> {
        let state = self.inner.read().await;
        Ok(state
            .fuel_records
            .get(&vehicle_id)
            .and_then(|chain| chain.iter().rev().find(|r| r.kind == kind).cloned()))
    }

    async fn append_fuel_record(&self, record: &FuelRecord) -> AppResult<()> {
        let mut state = self.inner.write().await;

        if let Some(trip_id) = record.trip_id {
            let duplicate = state
                .all_records()
                .any(|r| r.trip_id == Some(trip_id) && r.kind == record.kind);
            if duplicate {
                return Err(AppError::Conflict(format!(
                    "trip {} already has a {:?} record",
                    trip_id, record.kind
                )));
            }
        }

        let chain = state.fuel_records.entry(record.vehicle_id).or_default();
        let expected = chain.len() as i64 + 1;
        if record.sequence != expected {
            return Err(AppError::Conflict(format!(
                "fuel record sequence {} for vehicle {} was taken by a concurrent writer (next is {})",
                record.sequence, record.vehicle_id, expected
            )));
        }

        chain.push(record.clone());
        Ok(())
    }

    async fn find_fuel_record_for_trip(
        &self,
        trip_id: Uuid,
        kind: FuelRecordKind,
    ) -> AppResult<Option<FuelRecord>> {
        let state = self.inner.read().await;
        let record = state
            .all_records()
            .find(|r| r.trip_id == Some(trip_id) && r.kind == kind)
            .cloned();
        Ok(record)
    }

    async fn list_fuel_records(&self, vehicle_id: Uuid, limit: Option<i64>) -> AppResult<Vec<FuelRecord>> {
        let state = self.inner.read().await;
        let limit = limit.map(|l| l.max(0) as usize).unwrap_or(usize::MAX);
        Ok(state
            .fuel_records
            .get(&vehicle_id)
            .map(|chain| chain.iter().rev().take(limit).cloned().collect())
            .unwrap_or_default())
    }

    async fn create_trip(&self, entry: &CarEntry) -> AppResult<()> {
        let mut state = self.inner.write().await;
        if state.trips.contains_key(&entry.id) {
            return Err(AppError::Conflict(format!("car entry {} already exists", entry.id)));
        }
        state.trips.insert(entry.id, entry.clone());
        Ok(())
    }

    async fn close_trip(&self, entry: &CarEntry) -> AppResult<()> {
        let mut state = self.inner.write().await;
        match state.trips.get_mut(&entry.id) {
            Some(stored) if stored.is_open() => {
                stored.check_out = entry.check_out.clone();
                stored.distance_driven = entry.distance_driven;
                stored.ended_at = entry.ended_at;
                Ok(())
            }
            _ => Err(not_found_error("Open car entry", &entry.id)),
        }
    }

    async fn replace_trip_images(&self, id: Uuid, stage: ImageStage, images: &[String]) -> AppResult<()> {
        let mut state = self.inner.write().await;
        let trip = state
            .trips
            .get_mut(&id)
            .ok_or_else(|| not_found_error("Car entry", &id))?;

        match stage {
            ImageStage::CheckIn => trip.check_in.images = images.to_vec(),
            ImageStage::CheckOut => match trip.check_out.as_mut() {
                Some(check_out) => check_out.images = images.to_vec(),
                None => return Err(not_found_error("Closed car entry", &id)),
            },
        }
        Ok(())
    }

    async fn delete_trip(&self, id: Uuid) -> AppResult<bool> {
        let mut state = self.inner.write().await;
        Ok(state.trips.remove(&id).is_some())
    }

    async fn find_trip(&self, id: Uuid) -> AppResult<Option<CarEntry>> {
        let state = self.inner.read().await;
        Ok(state.trips.get(&id).cloned())
    }

    async fn find_open_trip(&self, vehicle_id: Uuid, employee_id: Uuid) -> AppResult<Option<CarEntry>> {
        let filter = TripFilter {
            vehicle_id: Some(vehicle_id),
            employee_id: Some(employee_id),
            open_only: true,
            ..TripFilter::default()
        };
        let state = self.inner.read().await;
        let trip = state.sorted_trips(&filter).first().map(|t| (*t).clone());
        Ok(trip)
    }

    async fn find_latest_trip(&self, vehicle_id: Uuid) -> AppResult<Option<CarEntry>> {
        let filter = TripFilter {
            vehicle_id: Some(vehicle_id),
            ..TripFilter::default()
        };
        let state = self.inner.read().await;
        let trip = state.sorted_trips(&filter).first().map(|t| (*t).clone());
        Ok(trip)
    }

    async fn list_trips(&self, filter: &TripFilter) -> AppResult<Vec<CarEntry>> {
        let state = self.inner.read().await;
        let trips = state
            .sorted_trips(filter)
            .into_iter()
            .skip(filter.offset_or_default() as usize)
            .take(filter.limit_or_default() as usize)
            .cloned()
            .collect();
        Ok(trips)
    }

    async fn count_trips(&self, open_only: bool) -> AppResult<i64> {
        let state = self.inner.read().await;
        Ok(state
            .trips
            .values()
            .filter(|t| !open_only || t.is_open())
            .count() as i64)
    }

    async fn find_orphaned_compensations(&self) -> AppResult<Vec<FuelRecord>> {
        let state = self.inner.read().await;
        let records = state
            .all_records()
            .filter(|r| r.kind == FuelRecordKind::Compensation)
            .filter(|r| r.trip_id.map_or(false, |id| state.trips.contains_key(&id)))
            .cloned()
            .collect();
        Ok(records)
    }

    async fn find_orphaned_consumptions(&self) -> AppResult<Vec<FuelRecord>> {
        let state = self.inner.read().await;
        let records = state
            .all_records()
            .filter(|r| r.kind == FuelRecordKind::Consumption)
            .filter(|r| {
                r.trip_id
                    .and_then(|id| state.trips.get(&id))
                    .map_or(false, CarEntry::is_open)
            })
            .cloned()
            .collect();
        Ok(records)
    }
}

/// Registro de flota en memoria
#[derive(Default)]
pub struct InMemoryVehicleRegistry {
    vehicles: RwLock<HashMap<Uuid, Vehicle>>,
}

impl InMemoryVehicleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_vehicles(vehicles: impl IntoIterator<Item = Vehicle>) -> Self {
        Self {
            vehicles: RwLock::new(vehicles.into_iter().map(|v| (v.id, v)).collect()),
        }
    }

    pub async fn upsert(&self, vehicle: Vehicle) {
        self.vehicles.write().await.insert(vehicle.id, vehicle);
    }
}

#[async_trait]
impl VehicleRegistry for InMemoryVehicleRegistry {
    async fn get_vehicle(&self, id: Uuid) -> AppResult<Option<Vehicle>> {
        Ok(self.vehicles.read().await.get(&id).cloned())
    }

    async fn list_active_vehicles(&self) -> AppResult<Vec<Vehicle>> {
        let mut vehicles: Vec<Vehicle> = self
            .vehicles
            .read()
            .await
            .values()
            .filter(|v| v.is_active)
            .cloned()
            .collect();
        vehicles.sort_by(|a, b| a.number.cmp(&b.number));
        Ok(vehicles)
    }
}
