use axum::{extract::State, middleware, routing::get, Json, Router};

use crate::dto::ApiResponse;
use crate::middleware::admin_only_middleware;
use crate::models::{FleetStatistics, VehicleSnapshot};
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_statistics_router() -> Router<AppState> {
    let admin = Router::new()
        .route("/", get(fleet_statistics))
        .route_layer(middleware::from_fn(admin_only_middleware));

    Router::new().route("/fleet", get(fleet_snapshot)).merge(admin)
}

async fn fleet_statistics(State(state): State<AppState>) -> Result<Json<ApiResponse<FleetStatistics>>, AppError> {
    let statistics = state.statistics.fleet_statistics().await?;
    Ok(Json(ApiResponse::success(statistics)))
}

async fn fleet_snapshot(State(state): State<AppState>) -> Result<Json<ApiResponse<Vec<VehicleSnapshot>>>, AppError> {
    let vehicles = state.statistics.fleet_snapshot().await?;
    Ok(Json(ApiResponse::success(vehicles)))
}
