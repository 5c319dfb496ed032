use axum::{
    extract::{Path, Query, State},
    middleware,
    routing::get,
    Json, Router,
};
use uuid::Uuid;

use crate::dto::{ApiResponse, FuelBalanceResponse, HistoryQuery};
use crate::middleware::admin_only_middleware;
use crate::models::{ChainReport, FuelRecord};
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_fuel_router() -> Router<AppState> {
    let admin = Router::new()
        .route("/:vehicle_id/fuel/verify", get(verify_chain))
        .route_layer(middleware::from_fn(admin_only_middleware));

    Router::new()
        .route("/:vehicle_id/fuel", get(current_fuel))
        .route("/:vehicle_id/fuel/history", get(fuel_history))
        .merge(admin)
}

async fn current_fuel(
    State(state): State<AppState>,
    Path(vehicle_id): Path<Uuid>,
) -> Result<Json<ApiResponse<FuelBalanceResponse>>, AppError> {
    let current_fuel = state.statistics.current_fuel(vehicle_id).await?;
    Ok(Json(ApiResponse::success(FuelBalanceResponse {
        vehicle_id,
        current_fuel,
    })))
}

async fn fuel_history(
    State(state): State<AppState>,
    Path(vehicle_id): Path<Uuid>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<ApiResponse<Vec<FuelRecord>>>, AppError> {
    let records = state.fuel_ledger.history(vehicle_id, query.limit).await?;
    Ok(Json(ApiResponse::success(records)))
}

async fn verify_chain(
    State(state): State<AppState>,
    Path(vehicle_id): Path<Uuid>,
) -> Result<Json<ApiResponse<ChainReport>>, AppError> {
    let report = state.fuel_ledger.verify_chain(vehicle_id).await?;
    Ok(Json(ApiResponse::success(report)))
}
