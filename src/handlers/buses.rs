use std::collections::HashMap;

use axum::extract::{Path, State};
use uuid::Uuid;

use crate::error::ApiError;
use crate::middleware::{Ack, ApiResponse, ApiResult, Item, Listing, Saved, json::Json};
use crate::services::fleet_stats::{self, FleetStats};
use crate::state::AppState;
use crate::store::models::{
    Bus, BusUpdate, DriverInfo, MaintenanceInfo, NewBus, RouteInfo, SafetyInfo, StatusUpdate,
};

/// GET /api/buses/branch/:branchId - active buses only, ordered by fleet
/// code. Soft-deleted buses never appear here.
pub async fn list_for_branch(
    State(state): State<AppState>,
    Path(branch_id): Path<Uuid>,
) -> ApiResult<Listing<Bus>> {
    state.store.get_branch(branch_id).await?;
    let buses = state.store.list_active_buses(branch_id).await?;
    Ok(ApiResponse::success(Listing::of(buses)))
}

/// GET /api/buses/branch/:branchId/stats
pub async fn stats(
    State(state): State<AppState>,
    Path(branch_id): Path<Uuid>,
) -> ApiResult<Item<FleetStats>> {
    state.store.get_branch(branch_id).await?;
    let buses = state.store.list_active_buses(branch_id).await?;
    Ok(ApiResponse::success(Item { item: fleet_stats::fleet_stats(&buses) }))
}

/// GET /api/buses/:id - direct lookup also returns soft-deleted buses.
pub async fn get(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Item<Bus>> {
    let bus = state.store.get_bus(id).await?;
    Ok(ApiResponse::success(Item { item: bus }))
}

/// POST /api/buses
///
/// The owning branch must exist (NotFound otherwise, nothing persisted);
/// `institution_id` is copied from the branch. Fleet-code and registration
/// uniqueness come from the store's constraints.
pub async fn create(
    State(state): State<AppState>,
    Json(input): Json<NewBus>,
) -> ApiResult<Saved<Bus>> {
    if input.bus_id.trim().is_empty() {
        return Err(field_error("bus_id", "bus id is required"));
    }
    if input.registration_number.trim().is_empty() {
        return Err(field_error("registration_number", "registration number is required"));
    }
    let bus = state.store.create_bus(input).await?;
    Ok(ApiResponse::created(Saved::new("bus created", bus)))
}

/// PUT /api/buses/:id - general info; sub-objects have their own routes.
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(update): Json<BusUpdate>,
) -> ApiResult<Saved<Bus>> {
    let bus = state.store.update_bus(id, update).await?;
    Ok(ApiResponse::success(Saved::new("bus updated", bus)))
}

/// PUT /api/buses/:id/driver - whole-object replace; assignment status is
/// derived from whether a driver name is present.
pub async fn set_driver(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(driver): Json<DriverInfo>,
) -> ApiResult<Saved<Bus>> {
    let bus = state.store.set_bus_driver(id, driver).await?;
    Ok(ApiResponse::success(Saved::new("driver assigned", bus)))
}

/// PUT /api/buses/:id/route
pub async fn set_route(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(route): Json<RouteInfo>,
) -> ApiResult<Saved<Bus>> {
    let bus = state.store.set_bus_route(id, route).await?;
    Ok(ApiResponse::success(Saved::new("route updated", bus)))
}

/// PUT /api/buses/:id/maintenance - per-field merge, not read-modify-write.
pub async fn merge_maintenance(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(maintenance): Json<MaintenanceInfo>,
) -> ApiResult<Saved<Bus>> {
    let bus = state.store.merge_bus_maintenance(id, maintenance).await?;
    Ok(ApiResponse::success(Saved::new("maintenance information updated", bus)))
}

/// PUT /api/buses/:id/safety
pub async fn merge_safety(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(safety): Json<SafetyInfo>,
) -> ApiResult<Saved<Bus>> {
    let bus = state.store.merge_bus_safety(id, safety).await?;
    Ok(ApiResponse::success(Saved::new("safety information updated", bus)))
}

/// PUT /api/buses/:id/status
///
/// Compare-and-set when `expected_status` is supplied; invalid lifecycle
/// transitions are rejected before anything is written.
pub async fn set_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(update): Json<StatusUpdate>,
) -> ApiResult<Saved<Bus>> {
    if update.operational_status.is_none()
        && update.availability.is_none()
        && update.bus_condition.is_none()
    {
        return Err(ApiError::bad_request("no status fields supplied"));
    }
    let bus = state.store.update_bus_status(id, update).await?;
    Ok(ApiResponse::success(Saved::new("bus status updated", bus)))
}

/// DELETE /api/buses/:id - soft delete: the bus drops out of listings and
/// stats but stays retrievable by direct id.
pub async fn deactivate(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Ack> {
    state.store.deactivate_bus(id).await?;
    Ok(ApiResponse::success(Ack::new("bus deactivated")))
}

fn field_error(field: &str, message: &str) -> ApiError {
    let mut field_errors = HashMap::new();
    field_errors.insert(field.to_string(), message.to_string());
    ApiError::validation_error("invalid input", Some(field_errors))
}
