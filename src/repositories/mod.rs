//! Repositorios
//!
//! Persistencia del ledger de combustible y de los viajes, con una
//! implementación PostgreSQL y otra en memoria del mismo contrato.

pub mod car_entry_repository;
pub mod fuel_record_repository;
pub mod ledger_store;
pub mod memory;
pub mod pg_ledger_store;
pub mod vehicle_repository;

pub use ledger_store::{LedgerStore, VehicleRegistry};
pub use memory::{InMemoryLedgerStore, InMemoryVehicleRegistry};
pub use pg_ledger_store::PgLedgerStore;
pub use vehicle_repository::VehicleRepository;
