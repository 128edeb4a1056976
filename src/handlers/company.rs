use axum::extract::{Path, State};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::password;
use crate::middleware::{Ack, ApiResponse, ApiResult, Listing, Saved, json::Json};
use crate::state::AppState;
use crate::store::models::{NewUser, Role, User, UserUpdate};
use crate::store::{BranchSummary, DashboardTotals};

#[derive(Debug, Serialize)]
pub struct Dashboard {
    pub totals: DashboardTotals,
    pub branches: Vec<BranchSummary>,
}

/// GET /api/company/dashboard - company-wide totals plus the most recent
/// branches with their institution names.
pub async fn dashboard(State(state): State<AppState>) -> ApiResult<Dashboard> {
    let (totals, branches) =
        futures::try_join!(state.store.dashboard_totals(), state.store.recent_branches())?;
    Ok(ApiResponse::success(Dashboard { totals, branches }))
}

/// GET /api/company/admins - institution admins across the company.
pub async fn list_admins(State(state): State<AppState>) -> ApiResult<Listing<User>> {
    let admins = state.store.list_institution_admins().await?;
    Ok(ApiResponse::success(Listing::of(admins)))
}

#[derive(Debug, Deserialize)]
pub struct NewAdminInput {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub institution_id: Uuid,
    pub password: Option<String>,
}

/// POST /api/company/admins
///
/// New admins without an explicit password get the portal's well-known
/// initial one, as the company dashboard expects.
pub async fn create_admin(
    State(state): State<AppState>,
    Json(input): Json<NewAdminInput>,
) -> ApiResult<Saved<User>> {
    state.store.get_institution(input.institution_id).await?;

    let plaintext = input.password.as_deref().unwrap_or("Admin@123");
    let hash = password::set_password(plaintext, state.config.security.bcrypt_cost)
        .map_err(|e| {
            tracing::error!("password hashing failed: {}", e);
            crate::error::ApiError::internal_server_error("could not create admin")
        })?;

    let user = state
        .store
        .create_user(
            NewUser {
                name: input.name,
                email: input.email,
                phone: input.phone,
                role: Role::InstitutionAdmin,
                institution_id: Some(input.institution_id),
                branch_id: None,
                staff_category: None,
            },
            hash,
        )
        .await?;
    Ok(ApiResponse::created(Saved::new("admin created", user)))
}

/// PUT /api/company/admins/:id
pub async fn update_admin(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(update): Json<UserUpdate>,
) -> ApiResult<Saved<User>> {
    if let Some(institution_id) = update.institution_id {
        state.store.get_institution(institution_id).await?;
    }
    let user = state.store.update_user(id, update).await?;
    Ok(ApiResponse::success(Saved::new("admin updated", user)))
}

/// DELETE /api/company/admins/:id
pub async fn delete_admin(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Ack> {
    state.store.delete_user(id).await?;
    Ok(ApiResponse::success(Ack::new("admin deleted")))
}
