use axum::extract::{Path, State};
use uuid::Uuid;

use crate::middleware::{Ack, ApiResponse, ApiResult, Item, Listing, Saved, json::Json};
use crate::state::AppState;
use crate::store::models::{Branch, Institution, InstitutionUpdate, NewInstitution};

/// GET /api/institutions
pub async fn list(State(state): State<AppState>) -> ApiResult<Listing<Institution>> {
    let institutions = state.store.list_institutions().await?;
    Ok(ApiResponse::success(Listing::of(institutions)))
}

/// POST /api/institutions
pub async fn create(
    State(state): State<AppState>,
    Json(input): Json<NewInstitution>,
) -> ApiResult<Saved<Institution>> {
    let institution = state.store.create_institution(input).await?;
    Ok(ApiResponse::created(Saved::new("institution created", institution)))
}

/// GET /api/institutions/:id
pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Item<Institution>> {
    let institution = state.store.get_institution(id).await?;
    Ok(ApiResponse::success(Item { item: institution }))
}

/// PUT /api/institutions/:id
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(update): Json<InstitutionUpdate>,
) -> ApiResult<Saved<Institution>> {
    let institution = state.store.update_institution(id, update).await?;
    Ok(ApiResponse::success(Saved::new("institution updated", institution)))
}

/// DELETE /api/institutions/:id
///
/// Hard delete with no cascade: dependents survive and are logged, not
/// removed. Whether that is intentional is an open question with the
/// system owner, so the behavior is kept and flagged.
pub async fn delete(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Ack> {
    let orphans = state.store.delete_institution(id).await?;
    if orphans.total() > 0 {
        tracing::warn!(
            institution_id = %id,
            branches = orphans.branches,
            students = orphans.students,
            buses = orphans.buses,
            fee_payments = orphans.fee_payments,
            users = orphans.users,
            "institution hard-deleted with surviving dependents"
        );
    }
    Ok(ApiResponse::success(Ack::new("institution deleted")))
}

/// GET /api/institutions/:id/branches
pub async fn branches(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Listing<Branch>> {
    let branches = state.store.list_branches(id).await?;
    Ok(ApiResponse::success(Listing::of(branches)))
}
