use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    routing::{delete, get, post, put},
    Extension, Json, Router,
};
use uuid::Uuid;
use validator::Validate;

use crate::dto::{
    ApiResponse, AttachImagesRequest, DeletedCarEntryResponse, EndCarEntryRequest, FuelEntryRequest,
    StartCarEntryRequest,
};
use crate::middleware::{admin_only_middleware, CallerContext};
use crate::models::{CarEntry, DeviceInfo, FuelRecord, ImageStage, ReconcileReport, TripFilter};
use crate::services::ClosedTrip;
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_car_entry_router() -> Router<AppState> {
    let admin = Router::new()
        .route("/delete/:entry_id", delete(delete_car_entry))
        .route("/reconcile", post(reconcile))
        .route_layer(middleware::from_fn(admin_only_middleware));

    Router::new()
        .route("/start", post(start_car_entry))
        .route("/end", put(end_car_entry))
        .route("/fuel", post(add_fuel))
        .route("/", get(list_car_entries))
        .route("/:entry_id", get(get_car_entry))
        .route("/:entry_id/checkin/images", post(attach_check_in_images))
        .route("/:entry_id/checkout/images", post(attach_check_out_images))
        .merge(admin)
}

async fn start_car_entry(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerContext>,
    Extension(device_info): Extension<DeviceInfo>,
    Json(request): Json<StartCarEntryRequest>,
) -> Result<(StatusCode, Json<ApiResponse<CarEntry>>), AppError> {
    let entry = state
        .trips
        .open_trip(request.vehicle_id, caller.subject_id, request.check_in, device_info)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success_with_message(entry, "Check-in registrado")),
    ))
}

async fn end_car_entry(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerContext>,
    Json(request): Json<EndCarEntryRequest>,
) -> Result<Json<ApiResponse<ClosedTrip>>, AppError> {
    let closed = state
        .trips
        .close_trip(request.vehicle_id, caller.subject_id, request.check_out)
        .await?;
    Ok(Json(ApiResponse::success_with_message(closed, "Check-out registrado")))
}

async fn add_fuel(
    State(state): State<AppState>,
    Json(request): Json<FuelEntryRequest>,
) -> Result<(StatusCode, Json<ApiResponse<FuelRecord>>), AppError> {
    let record = state
        .fuel_ledger
        .append_manual_refuel(request.vehicle_id, request.fuel_added)
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(record))))
}

async fn list_car_entries(
    State(state): State<AppState>,
    Query(filter): Query<TripFilter>,
) -> Result<Json<ApiResponse<Vec<CarEntry>>>, AppError> {
    let entries = state.trips.list_trips(&filter).await?;
    Ok(Json(ApiResponse::success(entries)))
}

async fn get_car_entry(
    State(state): State<AppState>,
    Path(entry_id): Path<Uuid>,
) -> Result<Json<ApiResponse<CarEntry>>, AppError> {
    let entry = state.trips.get_trip(entry_id).await?;
    Ok(Json(ApiResponse::success(entry)))
}

async fn delete_car_entry(
    State(state): State<AppState>,
    Path(entry_id): Path<Uuid>,
) -> Result<Json<ApiResponse<DeletedCarEntryResponse>>, AppError> {
    let compensation = state.trips.delete_trip(entry_id).await?;
    Ok(Json(ApiResponse::success_with_message(
        DeletedCarEntryResponse {
            entry_id,
            compensation,
        },
        "Viaje eliminado",
    )))
}

async fn attach_check_in_images(
    State(state): State<AppState>,
    Path(entry_id): Path<Uuid>,
    Json(request): Json<AttachImagesRequest>,
) -> Result<Json<ApiResponse<CarEntry>>, AppError> {
    attach_images(&state, entry_id, ImageStage::CheckIn, request).await
}

async fn attach_check_out_images(
    State(state): State<AppState>,
    Path(entry_id): Path<Uuid>,
    Json(request): Json<AttachImagesRequest>,
) -> Result<Json<ApiResponse<CarEntry>>, AppError> {
    attach_images(&state, entry_id, ImageStage::CheckOut, request).await
}

async fn attach_images(
    state: &AppState,
    entry_id: Uuid,
    stage: ImageStage,
    request: AttachImagesRequest,
) -> Result<Json<ApiResponse<CarEntry>>, AppError> {
    request.validate()?;
    let entry = state.trips.attach_images(entry_id, stage, request.images).await?;
    Ok(Json(ApiResponse::success(entry)))
}

async fn reconcile(State(state): State<AppState>) -> Result<Json<ApiResponse<ReconcileReport>>, AppError> {
    let report = state.trips.reconcile().await?;
    Ok(Json(ApiResponse::success(report)))
}
