//! Configuración del proyecto
//!
//! Este módulo contiene la configuración de base de datos, variables de entorno
//! y los parámetros del ledger de combustible.

pub mod database;
pub mod environment;
pub mod ledger;

pub use database::DatabaseConfig;
pub use environment::*;
pub use ledger::{LedgerConfig, OpenTripPolicy};
