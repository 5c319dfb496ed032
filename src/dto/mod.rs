//! DTOs de la API HTTP

pub mod api_response;
pub mod car_entry_dto;

pub use api_response::ApiResponse;
pub use car_entry_dto::*;
