//! Contratos de persistencia del ledger
//!
//! El store es dueño exclusivo de los registros de combustible y de los
//! viajes. Los servicios no guardan estado del ledger entre requests;
//! cada lectura vuelve a consultar el store.

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::{CarEntry, FuelRecord, FuelRecordKind, ImageStage, TripFilter, Vehicle};
use crate::utils::errors::AppResult;

/// Registro de flota externo (solo lectura)
#[async_trait]
pub trait VehicleRegistry: Send + Sync {
    async fn get_vehicle(&self, id: Uuid) -> AppResult<Option<Vehicle>>;

    async fn list_active_vehicles(&self) -> AppResult<Vec<Vehicle>>;
}

/// Persistencia de registros de combustible y viajes
///
/// `append_fuel_record` es compare-and-append: el registro lleva la
/// secuencia esperada (`latest.sequence + 1`) y el store debe devolver
/// `AppError::Conflict` si esa secuencia ya está ocupada para el vehículo,
/// o si el viaje ya tiene un registro del mismo tipo.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn find_latest_fuel_record(&self, vehicle_id: Uuid) -> AppResult<Option<FuelRecord>>;

    async fn find_latest_fuel_record_of_kind(
        &self,
        vehicle_id: Uuid,
        kind: FuelRecordKind,
    ) -> AppResult<Option<FuelRecord>>;

    async fn append_fuel_record(&self, record: &FuelRecord) -> AppResult<()>;

    async fn find_fuel_record_for_trip(
        &self,
        trip_id: Uuid,
        kind: FuelRecordKind,
    ) -> AppResult<Option<FuelRecord>>;

    /// Registros del vehículo, del más nuevo al más antiguo
    async fn list_fuel_records(&self, vehicle_id: Uuid, limit: Option<i64>) -> AppResult<Vec<FuelRecord>>;

    async fn create_trip(&self, entry: &CarEntry) -> AppResult<()>;

    /// Marca el viaje como cerrado; `NotFound` si no existe o ya estaba cerrado
    async fn close_trip(&self, entry: &CarEntry) -> AppResult<()>;

    async fn replace_trip_images(&self, id: Uuid, stage: ImageStage, images: &[String]) -> AppResult<()>;

    /// Devuelve `false` si el viaje no existía
    async fn delete_trip(&self, id: Uuid) -> AppResult<bool>;

    async fn find_trip(&self, id: Uuid) -> AppResult<Option<CarEntry>>;

    /// Viaje abierto más reciente para el par (vehículo, empleado)
    async fn find_open_trip(&self, vehicle_id: Uuid, employee_id: Uuid) -> AppResult<Option<CarEntry>>;

    /// Viaje más reciente del vehículo, abierto o cerrado
    async fn find_latest_trip(&self, vehicle_id: Uuid) -> AppResult<Option<CarEntry>>;

    async fn list_trips(&self, filter: &TripFilter) -> AppResult<Vec<CarEntry>>;

    async fn count_trips(&self, open_only: bool) -> AppResult<i64>;

    /// Compensaciones cuyo viaje todavía existe (borrado a medias)
    async fn find_orphaned_compensations(&self) -> AppResult<Vec<FuelRecord>>;

    /// Consumos cuyo viaje sigue abierto (cierre a medias)
    async fn find_orphaned_consumptions(&self) -> AppResult<Vec<FuelRecord>>;
}
