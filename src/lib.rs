//! Fleet fuel ledger
//!
//! Ledger de combustible por vehículo: cada viaje cerrado, abastecimiento
//! manual o corrección agrega un registro encadenado (`previous_fuel` del
//! nuevo registro = `new_fuel` del anterior). El saldo actual es siempre el
//! `new_fuel` del último registro.

pub mod config;
pub mod database;
pub mod dto;
pub mod middleware;
pub mod models;
pub mod repositories;
pub mod routes;
pub mod services;
pub mod state;
pub mod utils;

pub use state::AppState;
pub use utils::errors::{AppError, AppResult};
