//! Capa de lectura / agregación
//!
//! Solo lecturas: nunca escribe en el ledger. Cada vehículo activo se
//! consulta en paralelo; el primer error aborta la instantánea completa.

use std::sync::Arc;

use futures::future::try_join_all;
use tracing::{debug, instrument};
use uuid::Uuid;

use super::bounded;
use crate::config::LedgerConfig;
use crate::models::{FleetStatistics, FuelRecordKind, Vehicle, VehicleSnapshot};
use crate::repositories::{LedgerStore, VehicleRegistry};
use crate::utils::errors::AppResult;

pub struct FleetStatisticsService {
    store: Arc<dyn LedgerStore>,
    registry: Arc<dyn VehicleRegistry>,
    config: LedgerConfig,
}

impl FleetStatisticsService {
    pub fn new(store: Arc<dyn LedgerStore>, registry: Arc<dyn VehicleRegistry>, config: LedgerConfig) -> Self {
        Self {
            store,
            registry,
            config,
        }
    }

    /// Saldo actual del vehículo; `None` si no tiene registros
    pub async fn current_fuel(&self, vehicle_id: Uuid) -> AppResult<Option<f64>> {
        let latest = bounded(
            self.config.store_timeout,
            "ledger store",
            self.store.find_latest_fuel_record(vehicle_id),
        )
        .await?;
        Ok(latest.map(|record| record.new_fuel))
    }

    /// Estado de cada vehículo activo
    #[instrument(skip(self))]
    pub async fn fleet_snapshot(&self) -> AppResult<Vec<VehicleSnapshot>> {
        let vehicles = bounded(
            self.config.store_timeout,
            "vehicle registry",
            self.registry.list_active_vehicles(),
        )
        .await?;

        let snapshots = try_join_all(vehicles.into_iter().map(|vehicle| self.snapshot(vehicle))).await?;
        debug!("📊 Instantánea de flota con {} vehículos", snapshots.len());
        Ok(snapshots)
    }

    /// Instantánea más los contadores de viajes
    pub async fn fleet_statistics(&self) -> AppResult<FleetStatistics> {
        let timeout = self.config.store_timeout;
        let (vehicles, car_entry_count, open_trip_count) = tokio::try_join!(
            self.fleet_snapshot(),
            bounded(timeout, "ledger store", self.store.count_trips(false)),
            bounded(timeout, "ledger store", self.store.count_trips(true)),
        )?;

        Ok(FleetStatistics {
            active_vehicle_count: vehicles.len(),
            car_entry_count,
            open_trip_count,
            vehicles,
        })
    }

    async fn snapshot(&self, vehicle: Vehicle) -> AppResult<VehicleSnapshot> {
        let timeout = self.config.store_timeout;
        let (latest_refuel, current_fuel, latest_trip) = tokio::try_join!(
            bounded(
                timeout,
                "ledger store",
                self.store
                    .find_latest_fuel_record_of_kind(vehicle.id, FuelRecordKind::Refuel),
            ),
            self.current_fuel(vehicle.id),
            bounded(timeout, "ledger store", self.store.find_latest_trip(vehicle.id)),
        )?;

        Ok(VehicleSnapshot {
            vehicle,
            last_refuel_at: latest_refuel.map(|record| record.created_at),
            current_fuel,
            last_check_out: latest_trip.and_then(|trip| trip.check_out),
        })
    }
}
