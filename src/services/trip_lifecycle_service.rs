//! Ciclo de vida de los viajes (car entries)
//!
//! Open -> Closed. Cerrar y borrar un viaje son escrituras de dos fases:
//! primero el registro de combustible (etiquetado con el id del viaje),
//! después la mutación del viaje. Si la segunda falla se devuelve
//! `AppError::PartialWrite`; reintentar la operación es seguro porque el
//! motor reutiliza el registro ya escrito para ese viaje.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::bounded;
use super::fuel_ledger_service::FuelLedgerService;
use super::vehicle_locks::VehicleLocks;
use crate::config::{LedgerConfig, OpenTripPolicy};
use crate::models::{
    CarEntry, CheckIn, CheckOut, DeviceInfo, FuelRecord, ImageStage, PendingClosure, ReconcileReport,
    TripFilter,
};
use crate::repositories::{LedgerStore, VehicleRegistry};
use crate::utils::errors::{invalid_input_error, not_found_error, AppError, AppResult};
use crate::utils::validation::{ensure_image_limit, validate_not_blank};

/// Resultado de un check-out
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ClosedTrip {
    pub entry: CarEntry,
    pub fuel_record: FuelRecord,
}

pub struct TripLifecycleService {
    store: Arc<dyn LedgerStore>,
    registry: Arc<dyn VehicleRegistry>,
    ledger: Arc<FuelLedgerService>,
    open_locks: VehicleLocks,
    config: LedgerConfig,
}

impl TripLifecycleService {
    pub fn new(
        store: Arc<dyn LedgerStore>,
        registry: Arc<dyn VehicleRegistry>,
        ledger: Arc<FuelLedgerService>,
        config: LedgerConfig,
    ) -> Self {
        Self {
            store,
            registry,
            ledger,
            open_locks: VehicleLocks::new(),
            config,
        }
    }

    /// Check-in: abre un viaje. No hay cálculo de combustible aquí.
    #[instrument(skip(self, check_in, device_info))]
    pub async fn open_trip(
        &self,
        vehicle_id: Uuid,
        employee_id: Uuid,
        check_in: CheckIn,
        device_info: DeviceInfo,
    ) -> AppResult<CarEntry> {
        check_in.validate_fields()?;

        let vehicle = bounded(
            self.config.store_timeout,
            "vehicle registry",
            self.registry.get_vehicle(vehicle_id),
        )
        .await?
        .ok_or_else(|| not_found_error("Vehicle", &vehicle_id))?;
        if !vehicle.is_active {
            return Err(invalid_input_error(format!("vehicle {} is not active", vehicle_id)));
        }

        let _guard = self.open_locks.acquire(vehicle_id).await;

        if self.config.open_trip_policy == OpenTripPolicy::Reject {
            let open = bounded(
                self.config.store_timeout,
                "ledger store",
                self.store.find_open_trip(vehicle_id, employee_id),
            )
            .await?;
            if let Some(open) = open {
                return Err(AppError::Conflict(format!(
                    "employee {} already has open car entry {} for vehicle {}",
                    employee_id, open.id, vehicle_id
                )));
            }
        }

        let entry = CarEntry::open(vehicle_id, employee_id, check_in, device_info);
        bounded(self.config.store_timeout, "ledger store", self.store.create_trip(&entry)).await?;

        info!("🚗 Check-in {} para vehículo {} (empleado {})", entry.id, vehicle_id, employee_id);
        Ok(entry)
    }

    /// Check-out: cierra el viaje abierto más reciente del par y registra el consumo
    #[instrument(skip(self, check_out))]
    pub async fn close_trip(
        &self,
        vehicle_id: Uuid,
        employee_id: Uuid,
        check_out: CheckOut,
    ) -> AppResult<ClosedTrip> {
        check_out.validate_fields()?;

        let entry = bounded(
            self.config.store_timeout,
            "ledger store",
            self.store.find_open_trip(vehicle_id, employee_id),
        )
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!(
                "no open car entry for vehicle {} and employee {}",
                vehicle_id, employee_id
            ))
        })?;

        let distance = entry.distance_to(&check_out);
        if distance < 0.0 {
            return Err(invalid_input_error(format!(
                "check-out odometer {} is lower than check-in odometer {}",
                check_out.odometer, entry.check_in.odometer
            )));
        }

        let fuel_record = self
            .ledger
            .append_trip_consumption(vehicle_id, distance, Some(entry.id))
            .await?;

        let closed = entry.closed_with(check_out, distance);
        if let Err(e) = bounded(self.config.store_timeout, "ledger store", self.store.close_trip(&closed)).await {
            // Un check-out concurrente pudo cerrar el viaje con el mismo registro
            if let Some(stored) = self.closed_by_concurrent_check_out(&closed, &fuel_record).await {
                info!(
                    "♻️ Viaje {} ya cerrado por otro check-out con el consumo {}",
                    stored.id, fuel_record.id
                );
                return Ok(ClosedTrip {
                    entry: stored,
                    fuel_record,
                });
            }

            warn!(
                "⚠️ Consumo {} registrado pero el viaje {} no se pudo cerrar: {}",
                fuel_record.id, closed.id, e
            );
            return Err(AppError::PartialWrite {
                completed: "fuel consumption record append".to_string(),
                failed: format!("car entry close ({})", e),
                record_id: fuel_record.id,
            });
        }

        info!("🏁 Check-out {}: {:.1} km recorridos", closed.id, distance);
        Ok(ClosedTrip {
            entry: closed,
            fuel_record,
        })
    }

    /// El viaje tal como quedó si otra petición lo cerró con la misma distancia
    async fn closed_by_concurrent_check_out(
        &self,
        closed: &CarEntry,
        fuel_record: &FuelRecord,
    ) -> Option<CarEntry> {
        if fuel_record.trip_id != Some(closed.id) {
            return None;
        }
        let stored = bounded(self.config.store_timeout, "ledger store", self.store.find_trip(closed.id))
            .await
            .ok()??;
        (!stored.is_open() && stored.distance_driven == closed.distance_driven).then_some(stored)
    }

    /// Borra un viaje cerrado emitiendo primero la compensación
    #[instrument(skip(self))]
    pub async fn delete_trip(&self, entry_id: Uuid) -> AppResult<FuelRecord> {
        let entry = self.get_trip(entry_id).await?;
        let distance = entry.distance_driven.ok_or_else(|| {
            invalid_input_error(format!(
                "car entry {} has no recorded distance; only closed trips can be deleted",
                entry_id
            ))
        })?;

        let compensation = self
            .ledger
            .append_trip_compensation(entry.vehicle_id, distance, Some(entry.id))
            .await?;

        match bounded(self.config.store_timeout, "ledger store", self.store.delete_trip(entry_id)).await {
            Ok(true) => {
                info!("🗑️ Viaje {} borrado con compensación {}", entry_id, compensation.id);
            }
            Ok(false) => {
                warn!("⚠️ Viaje {} ya había sido borrado por otra petición", entry_id);
            }
            Err(e) => {
                warn!(
                    "⚠️ Compensación {} registrada pero el viaje {} no se pudo borrar: {}",
                    compensation.id, entry_id, e
                );
                return Err(AppError::PartialWrite {
                    completed: "fuel compensation record append".to_string(),
                    failed: format!("car entry delete ({})", e),
                    record_id: compensation.id,
                });
            }
        }

        Ok(compensation)
    }

    pub async fn get_trip(&self, entry_id: Uuid) -> AppResult<CarEntry> {
        bounded(self.config.store_timeout, "ledger store", self.store.find_trip(entry_id))
            .await?
            .ok_or_else(|| not_found_error("Car entry", &entry_id))
    }

    pub async fn list_trips(&self, filter: &TripFilter) -> AppResult<Vec<CarEntry>> {
        bounded(self.config.store_timeout, "ledger store", self.store.list_trips(filter)).await
    }

    /// Adjunta rutas ya guardadas por el almacén de imágenes externo
    pub async fn attach_images(
        &self,
        entry_id: Uuid,
        stage: ImageStage,
        paths: Vec<String>,
    ) -> AppResult<CarEntry> {
        if paths.is_empty() || paths.iter().any(|p| validate_not_blank(p).is_err()) {
            return Err(invalid_input_error("image paths must be non-empty"));
        }

        let mut entry = self.get_trip(entry_id).await?;
        if stage == ImageStage::CheckOut && entry.is_open() {
            return Err(invalid_input_error(format!(
                "car entry {} is still open; check-out images need a check-out",
                entry_id
            )));
        }

        let current = entry.images(stage);
        ensure_image_limit(current.len(), paths.len())?;
        let merged: Vec<String> = current.iter().cloned().chain(paths).collect();

        bounded(
            self.config.store_timeout,
            "ledger store",
            self.store.replace_trip_images(entry_id, stage, &merged),
        )
        .await?;

        match stage {
            ImageStage::CheckIn => entry.check_in.images = merged,
            ImageStage::CheckOut => {
                if let Some(check_out) = entry.check_out.as_mut() {
                    check_out.images = merged;
                }
            }
        }
        Ok(entry)
    }

    /// Termina borrados a medias y reporta cierres a medias
    pub async fn reconcile(&self) -> AppResult<ReconcileReport> {
        let timeout = self.config.store_timeout;
        let mut report = ReconcileReport::default();

        let compensations = bounded(timeout, "ledger store", self.store.find_orphaned_compensations()).await?;
        for record in compensations {
            let Some(trip_id) = record.trip_id else { continue };
            if bounded(timeout, "ledger store", self.store.delete_trip(trip_id)).await? {
                info!("🧹 Borrado pendiente completado para viaje {}", trip_id);
                report.completed_deletions.push(trip_id);
            }
        }

        let consumptions = bounded(timeout, "ledger store", self.store.find_orphaned_consumptions()).await?;
        for record in consumptions {
            let Some(trip_id) = record.trip_id else { continue };
            warn!("⚠️ Viaje {} tiene consumo {} pero sigue abierto", trip_id, record.id);
            report.pending_closures.push(PendingClosure {
                trip_id,
                fuel_record_id: record.id,
                distance_driven: record.distance_driven,
            });
        }

        Ok(report)
    }
}
