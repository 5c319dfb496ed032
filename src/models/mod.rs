//! Modelos del sistema
//!
//! Este módulo contiene los modelos de datos del ledger de combustible,
//! los viajes y las proyecciones de flota.

pub mod car_entry;
pub mod fuel_record;
pub mod statistics;
pub mod vehicle;

pub use car_entry::*;
pub use fuel_record::*;
pub use statistics::*;
pub use vehicle::Vehicle;
