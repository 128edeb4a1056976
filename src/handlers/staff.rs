use axum::extract::{Path, State};
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::password;
use crate::error::ApiError;
use crate::middleware::{Ack, ApiResponse, ApiResult, Saved, json::Json};
use crate::state::AppState;
use crate::store::models::{NewUser, Role, User, UserUpdate};

#[derive(Debug, Deserialize)]
pub struct NewStaffInput {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub branch_id: Uuid,
    pub staff_category: Option<String>,
    pub password: Option<String>,
}

/// POST /api/staff
///
/// Staff belong to a branch; the institution scope is derived from that
/// branch, never taken from the request.
pub async fn create(
    State(state): State<AppState>,
    Json(input): Json<NewStaffInput>,
) -> ApiResult<Saved<User>> {
    let branch = state.store.get_branch(input.branch_id).await?;

    let new_user = NewUser {
        name: input.name,
        email: input.email,
        phone: input.phone,
        role: Role::Staff,
        institution_id: Some(branch.institution_id),
        branch_id: Some(branch.id),
        staff_category: input.staff_category,
    };
    new_user
        .validate_scope()
        .map_err(|msg| ApiError::validation_error(msg, None))?;

    let plaintext = input.password.as_deref().unwrap_or("Staff@123");
    let hash = password::set_password(plaintext, state.config.security.bcrypt_cost)
        .map_err(|e| {
            tracing::error!("password hashing failed: {}", e);
            ApiError::internal_server_error("could not create staff member")
        })?;

    let user = state.store.create_user(new_user, hash).await?;
    Ok(ApiResponse::created(Saved::new("staff member created", user)))
}

/// PUT /api/staff/:id
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(update): Json<UserUpdate>,
) -> ApiResult<Saved<User>> {
    let user = state.store.update_user(id, update).await?;
    Ok(ApiResponse::success(Saved::new("staff member updated", user)))
}

/// DELETE /api/staff/:id
pub async fn delete(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Ack> {
    state.store.delete_user(id).await?;
    Ok(ApiResponse::success(Ack::new("staff member deleted")))
}
