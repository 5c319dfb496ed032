//! Motor del ledger de combustible
//!
//! Calcula y agrega transiciones de nivel de combustible por vehículo.
//! Cada append lee el último registro, calcula el siguiente eslabón y lo
//! inserta con compare-and-append, todo bajo el lock del vehículo. Si otro
//! proceso ganó la carrera (`Conflict`) se relee y se reintenta.
//!
//! No hay caché de saldos: cada lectura vuelve a consultar el store.

use std::sync::Arc;

use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::bounded;
use super::vehicle_locks::VehicleLocks;
use crate::config::LedgerConfig;
use crate::models::{ChainReport, FuelRecord, FuelRecordKind, NextFuelRecord, Vehicle, CHAIN_TOLERANCE};
use crate::repositories::{LedgerStore, VehicleRegistry};
use crate::utils::errors::{invalid_input_error, not_found_error, AppError, AppResult};
use crate::utils::validation::{ensure_distance, ensure_fuel_added};

/// Transición pedida al motor, ya validada
#[derive(Debug, Clone, Copy)]
struct Transition {
    kind: FuelRecordKind,
    trip_id: Option<Uuid>,
    distance_driven: f64,
    /// Cambio con signo que se aplica sobre `previous_fuel`
    fuel_delta: f64,
}

pub struct FuelLedgerService {
    store: Arc<dyn LedgerStore>,
    registry: Arc<dyn VehicleRegistry>,
    locks: VehicleLocks,
    config: LedgerConfig,
}

impl FuelLedgerService {
    pub fn new(store: Arc<dyn LedgerStore>, registry: Arc<dyn VehicleRegistry>, config: LedgerConfig) -> Self {
        Self {
            store,
            registry,
            locks: VehicleLocks::new(),
            config,
        }
    }

    /// Consumo por distancia recorrida: `new = previous - distance / rate`
    pub async fn append_consumption(&self, vehicle_id: Uuid, distance_driven: f64) -> AppResult<FuelRecord> {
        self.append_trip_consumption(vehicle_id, distance_driven, None).await
    }

    /// Igual que `append_consumption`, etiquetado con el viaje que lo causó.
    /// Si el viaje ya tiene su consumo registrado, se devuelve ese registro.
    #[instrument(skip(self))]
    pub async fn append_trip_consumption(
        &self,
        vehicle_id: Uuid,
        distance_driven: f64,
        trip_id: Option<Uuid>,
    ) -> AppResult<FuelRecord> {
        let distance = ensure_distance("distance_driven", distance_driven)?;
        let vehicle = self.load_vehicle(vehicle_id).await?;
        let fuel_spent = vehicle.fuel_for_distance(distance)?;

        self.append(
            vehicle_id,
            Transition {
                kind: FuelRecordKind::Consumption,
                trip_id,
                distance_driven: distance,
                fuel_delta: -fuel_spent,
            },
        )
        .await
    }

    /// Abastecimiento manual: `new = previous + fuel_added`
    #[instrument(skip(self))]
    pub async fn append_manual_refuel(&self, vehicle_id: Uuid, fuel_added: f64) -> AppResult<FuelRecord> {
        let fuel_added = ensure_fuel_added(fuel_added)?;
        self.load_vehicle(vehicle_id).await?;

        self.append(
            vehicle_id,
            Transition {
                kind: FuelRecordKind::Refuel,
                trip_id: None,
                distance_driven: 0.0,
                fuel_delta: fuel_added,
            },
        )
        .await
    }

    /// Corrección hacia adelante de un consumo: `new = previous + distance / rate`
    pub async fn append_compensation(&self, vehicle_id: Uuid, distance_to_reverse: f64) -> AppResult<FuelRecord> {
        self.append_trip_compensation(vehicle_id, distance_to_reverse, None).await
    }

    #[instrument(skip(self))]
    pub async fn append_trip_compensation(
        &self,
        vehicle_id: Uuid,
        distance_to_reverse: f64,
        trip_id: Option<Uuid>,
    ) -> AppResult<FuelRecord> {
        let distance = ensure_distance("distance_driven", distance_to_reverse)?;
        let vehicle = self.load_vehicle(vehicle_id).await?;
        let fuel_restored = vehicle.fuel_for_distance(distance)?;

        // La compensación no recorre distancia; la revertida queda en el consumo original
        self.append(
            vehicle_id,
            Transition {
                kind: FuelRecordKind::Compensation,
                trip_id,
                distance_driven: 0.0,
                fuel_delta: fuel_restored,
            },
        )
        .await
    }

    /// `new_fuel` del último registro; `None` significa desconocido
    pub async fn current_balance(&self, vehicle_id: Uuid) -> AppResult<Option<f64>> {
        let latest = bounded(
            self.config.store_timeout,
            "ledger store",
            self.store.find_latest_fuel_record(vehicle_id),
        )
        .await?;

        Ok(latest.map(|record| record.new_fuel))
    }

    /// Historial del vehículo, del más nuevo al más antiguo
    pub async fn history(&self, vehicle_id: Uuid, limit: Option<i64>) -> AppResult<Vec<FuelRecord>> {
        bounded(
            self.config.store_timeout,
            "ledger store",
            self.store.list_fuel_records(vehicle_id, limit),
        )
        .await
    }

    /// Recorre la cadena completa y reporta el primer eslabón roto
    pub async fn verify_chain(&self, vehicle_id: Uuid) -> AppResult<ChainReport> {
        let mut records = self.history(vehicle_id, None).await?;
        records.reverse();

        let report = ChainReport::from_oldest_first(vehicle_id, &records);
        if !report.is_linked {
            warn!(
                "⚠️ Cadena de combustible rota para vehículo {}: {}",
                vehicle_id,
                report.reason.as_deref().unwrap_or("unknown")
            );
        }
        Ok(report)
    }

    async fn load_vehicle(&self, vehicle_id: Uuid) -> AppResult<Vehicle> {
        bounded(
            self.config.store_timeout,
            "vehicle registry",
            self.registry.get_vehicle(vehicle_id),
        )
        .await?
        .ok_or_else(|| not_found_error("Vehicle", &vehicle_id))
    }

    async fn append(&self, vehicle_id: Uuid, transition: Transition) -> AppResult<FuelRecord> {
        let _guard = self.locks.acquire(vehicle_id).await;
        let timeout = self.config.store_timeout;

        for attempt in 0..=self.config.max_append_retries {
            if let Some(trip_id) = transition.trip_id {
                let existing = bounded(
                    timeout,
                    "ledger store",
                    self.store.find_fuel_record_for_trip(trip_id, transition.kind),
                )
                .await?;
                if let Some(existing) = existing {
                    return reuse_trip_record(existing, &transition);
                }
            }

            let latest = bounded(timeout, "ledger store", self.store.find_latest_fuel_record(vehicle_id)).await?;
            let previous_fuel = latest.as_ref().map_or(0.0, |r| r.new_fuel);
            let new_fuel = previous_fuel + transition.fuel_delta;
            if !new_fuel.is_finite() {
                return Err(invalid_input_error(format!(
                    "fuel level for vehicle {} would leave the representable range ({} + {})",
                    vehicle_id, previous_fuel, transition.fuel_delta
                )));
            }

            let record = NextFuelRecord {
                kind: transition.kind,
                trip_id: transition.trip_id,
                new_fuel,
                distance_driven: transition.distance_driven,
            }
            .chain_after(vehicle_id, latest.as_ref());

            match bounded(timeout, "ledger store", self.store.append_fuel_record(&record)).await {
                Ok(()) => {
                    info!(
                        "⛽ {:?} registrado para vehículo {}: {:.3} -> {:.3} (seq {})",
                        record.kind, vehicle_id, record.previous_fuel, record.new_fuel, record.sequence
                    );
                    return Ok(record);
                }
                Err(AppError::Conflict(reason)) => {
                    debug!(
                        "🔁 Conflicto en append para vehículo {} (intento {}): {}",
                        vehicle_id,
                        attempt + 1,
                        reason
                    );
                }
                Err(e) => return Err(e),
            }
        }

        warn!(
            "❌ Append abandonado para vehículo {} tras {} reintentos",
            vehicle_id, self.config.max_append_retries
        );
        Err(AppError::Conflict(format!(
            "fuel ledger for vehicle {} kept changing; gave up after {} retries",
            vehicle_id, self.config.max_append_retries
        )))
    }
}

/// Un reintento del mismo viaje devuelve el registro ya escrito, si coincide
fn reuse_trip_record(existing: FuelRecord, transition: &Transition) -> AppResult<FuelRecord> {
    let tolerance = CHAIN_TOLERANCE * transition.fuel_delta.abs().max(1.0);
    if (existing.fuel_delta() - transition.fuel_delta).abs() > tolerance {
        return Err(AppError::Conflict(format!(
            "trip {:?} already has a {:?} record with a different amount ({:.3} vs {:.3})",
            existing.trip_id,
            existing.kind,
            existing.fuel_delta(),
            transition.fuel_delta
        )));
    }
    debug!("♻️ Reutilizando registro {} del viaje {:?}", existing.id, existing.trip_id);
    Ok(existing)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::{InMemoryLedgerStore, InMemoryVehicleRegistry};

    fn vehicle(rate: f64) -> Vehicle {
        Vehicle {
            id: Uuid::new_v4(),
            number: "7".to_string(),
            plate: "FLT0001".to_string(),
            brand: "Renault".to_string(),
            model: "Kangoo".to_string(),
            year: 2021,
            is_active: true,
            capacity: 60.0,
            consumption_rate: rate,
        }
    }

    fn service(vehicles: Vec<Vehicle>) -> FuelLedgerService {
        FuelLedgerService::new(
            Arc::new(InMemoryLedgerStore::new()),
            Arc::new(InMemoryVehicleRegistry::with_vehicles(vehicles)),
            LedgerConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_consumption_from_empty_chain() {
        let v = vehicle(10.0);
        let ledger = service(vec![v.clone()]);

        let record = ledger.append_consumption(v.id, 120.0).await.unwrap();
        assert_eq!(record.previous_fuel, 0.0);
        assert_eq!(record.new_fuel, -12.0);
        assert_eq!(record.distance_driven, 120.0);
        assert_eq!(ledger.current_balance(v.id).await.unwrap(), Some(-12.0));
    }

    #[tokio::test]
    async fn test_balance_is_unknown_without_records() {
        let v = vehicle(10.0);
        let ledger = service(vec![v.clone()]);
        assert_eq!(ledger.current_balance(v.id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_invalid_amounts_are_rejected() {
        let v = vehicle(10.0);
        let ledger = service(vec![v.clone()]);

        assert!(matches!(
            ledger.append_consumption(v.id, -1.0).await,
            Err(AppError::InvalidInput(_))
        ));
        assert!(matches!(
            ledger.append_manual_refuel(v.id, 0.0).await,
            Err(AppError::InvalidInput(_))
        ));
        assert!(matches!(
            ledger.append_compensation(v.id, f64::NAN).await,
            Err(AppError::InvalidInput(_))
        ));
        assert_eq!(ledger.current_balance(v.id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_non_positive_rate_is_invalid_input() {
        let v = vehicle(0.0);
        let ledger = service(vec![v.clone()]);
        assert!(matches!(
            ledger.append_consumption(v.id, 10.0).await,
            Err(AppError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_overflowing_balance_is_rejected_and_chain_stays_linked() {
        let v = vehicle(10.0);
        let ledger = service(vec![v.clone()]);

        ledger.append_manual_refuel(v.id, 1.7e308).await.unwrap();
        assert!(matches!(
            ledger.append_manual_refuel(v.id, 1.7e308).await,
            Err(AppError::InvalidInput(_))
        ));

        assert_eq!(ledger.current_balance(v.id).await.unwrap(), Some(1.7e308));
        let report = ledger.verify_chain(v.id).await.unwrap();
        assert!(report.is_linked);
        assert_eq!(report.record_count, 1);
    }

    #[tokio::test]
    async fn test_unbounded_consumption_is_rejected() {
        let v = vehicle(1e-300);
        let ledger = service(vec![v.clone()]);

        assert!(matches!(
            ledger.append_consumption(v.id, 1e300).await,
            Err(AppError::InvalidInput(_))
        ));
        assert!(ledger.history(v.id, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_vehicle_is_not_found() {
        let ledger = service(vec![]);
        assert!(matches!(
            ledger.append_manual_refuel(Uuid::new_v4(), 5.0).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_trip_tagged_append_is_idempotent() {
        let v = vehicle(10.0);
        let ledger = service(vec![v.clone()]);
        let trip_id = Uuid::new_v4();

        let first = ledger.append_trip_consumption(v.id, 50.0, Some(trip_id)).await.unwrap();
        let retry = ledger.append_trip_consumption(v.id, 50.0, Some(trip_id)).await.unwrap();
        assert_eq!(first, retry);
        assert_eq!(ledger.history(v.id, None).await.unwrap().len(), 1);

        let mismatch = ledger.append_trip_consumption(v.id, 80.0, Some(trip_id)).await;
        assert!(matches!(mismatch, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_verify_chain_after_mixed_appends() {
        let v = vehicle(12.5);
        let ledger = service(vec![v.clone()]);

        ledger.append_manual_refuel(v.id, 40.0).await.unwrap();
        ledger.append_consumption(v.id, 100.0).await.unwrap();
        ledger.append_compensation(v.id, 100.0).await.unwrap();

        let report = ledger.verify_chain(v.id).await.unwrap();
        assert!(report.is_linked);
        assert_eq!(report.record_count, 3);
        assert_eq!(ledger.current_balance(v.id).await.unwrap(), Some(40.0));
    }
}
