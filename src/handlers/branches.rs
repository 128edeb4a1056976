use axum::extract::{Path, State};
use uuid::Uuid;

use crate::middleware::{Ack, ApiResponse, ApiResult, Item, Listing, Saved, json::Json};
use crate::state::AppState;
use crate::store::models::{
    Branch, BranchUpdate, FeePayment, InventoryItem, NewBranch, Student, User,
};

/// POST /api/branches
///
/// The per-institution branch limit is enforced atomically inside the
/// store's insert, so concurrent creates cannot both slip under it.
pub async fn create(
    State(state): State<AppState>,
    Json(input): Json<NewBranch>,
) -> ApiResult<Saved<Branch>> {
    let branch = state.store.create_branch(input).await?;
    Ok(ApiResponse::created(Saved::new("branch created", branch)))
}

/// GET /api/branches/:id
pub async fn get(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Item<Branch>> {
    let branch = state.store.get_branch(id).await?;
    Ok(ApiResponse::success(Item { item: branch }))
}

/// PUT /api/branches/:id
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(update): Json<BranchUpdate>,
) -> ApiResult<Saved<Branch>> {
    let branch = state.store.update_branch(id, update).await?;
    Ok(ApiResponse::success(Saved::new("branch updated", branch)))
}

/// DELETE /api/branches/:id - hard delete, no cascade (see institutions).
pub async fn delete(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Ack> {
    let orphans = state.store.delete_branch(id).await?;
    if orphans.total() > 0 {
        tracing::warn!(
            branch_id = %id,
            students = orphans.students,
            buses = orphans.buses,
            fee_payments = orphans.fee_payments,
            users = orphans.users,
            inventory_items = orphans.inventory_items,
            "branch hard-deleted with surviving dependents"
        );
    }
    Ok(ApiResponse::success(Ack::new("branch deleted")))
}

/// GET /api/branches/:branchId/students
pub async fn students(
    State(state): State<AppState>,
    Path(branch_id): Path<Uuid>,
) -> ApiResult<Listing<Student>> {
    state.store.get_branch(branch_id).await?;
    let students = state.store.list_students(branch_id).await?;
    Ok(ApiResponse::success(Listing::of(students)))
}

/// GET /api/branches/:branchId/fees
pub async fn fees(
    State(state): State<AppState>,
    Path(branch_id): Path<Uuid>,
) -> ApiResult<Listing<FeePayment>> {
    state.store.get_branch(branch_id).await?;
    let payments = state.store.list_payments(branch_id).await?;
    Ok(ApiResponse::success(Listing::of(payments)))
}

/// GET /api/branches/:branchId/staff
pub async fn staff(
    State(state): State<AppState>,
    Path(branch_id): Path<Uuid>,
) -> ApiResult<Listing<User>> {
    state.store.get_branch(branch_id).await?;
    let staff = state.store.list_staff(branch_id).await?;
    Ok(ApiResponse::success(Listing::of(staff)))
}

/// GET /api/branches/:branchId/inventory
pub async fn inventory(
    State(state): State<AppState>,
    Path(branch_id): Path<Uuid>,
) -> ApiResult<Listing<InventoryItem>> {
    state.store.get_branch(branch_id).await?;
    let items = state.store.list_inventory(branch_id).await?;
    Ok(ApiResponse::success(Listing::of(items)))
}

/// GET /api/branches/:branchId/inventory/low-stock
pub async fn low_stock(
    State(state): State<AppState>,
    Path(branch_id): Path<Uuid>,
) -> ApiResult<Listing<InventoryItem>> {
    state.store.get_branch(branch_id).await?;
    let items = state.store.list_low_stock(branch_id).await?;
    Ok(ApiResponse::success(Listing::of(items)))
}
