//! Rutas HTTP
//!
//! Capa delgada sobre los servicios: deserializa JSON, lee el contexto del
//! llamador y convierte `AppError` en respuestas HTTP.

pub mod car_entry_routes;
pub mod fuel_routes;
pub mod statistics_routes;

use axum::{middleware, response::Json, routing::get, Router};
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;

use crate::middleware::{caller_context_middleware, cors_middleware};
use crate::state::AppState;

/// Router completo de la aplicación
pub fn build_router(state: AppState) -> Router {
    let api = Router::new()
        .nest("/car-entry", car_entry_routes::create_car_entry_router())
        .nest("/vehicle", fuel_routes::create_fuel_router())
        .nest("/statistics", statistics_routes::create_statistics_router())
        .layer(middleware::from_fn(caller_context_middleware));

    let cors = cors_middleware(&state.config.cors_origins);

    Router::new()
        .route("/health", get(health))
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "fleet-fuel-ledger",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}
