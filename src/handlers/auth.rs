use axum::extract::State;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::{self, Principal};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, json::Json};
use crate::state::AppState;
use crate::store::models::{Role, UserStatus};

#[derive(Debug, Deserialize)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginPayload {
    pub token: String,
    pub user: UserSummary,
}

#[derive(Debug, Serialize)]
pub struct UserSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub institution_id: Option<Uuid>,
    pub branch_id: Option<Uuid>,
}

/// POST /api/auth/login
///
/// Both an unknown email and a wrong password produce the same generic
/// Unauthorized message.
pub async fn login(
    State(state): State<AppState>,
    Json(input): Json<LoginInput>,
) -> ApiResult<LoginPayload> {
    let invalid = || ApiError::unauthorized("invalid email or password");

    let user = state
        .store
        .find_user_by_email(&input.email)
        .await?
        .ok_or_else(invalid)?;

    if user.status != UserStatus::Active {
        return Err(invalid());
    }

    let hash = user.password_hash.as_deref().ok_or_else(invalid)?;
    if !auth::password::verify_password(&input.password, hash) {
        return Err(invalid());
    }

    let principal = Principal::from_user(&user)?;
    let token = auth::issue_token(&principal, &state.config.security)?;

    Ok(ApiResponse::success(LoginPayload {
        token,
        user: UserSummary {
            id: user.id,
            name: user.name,
            email: user.email,
            role: user.role,
            institution_id: user.institution_id,
            branch_id: user.branch_id,
        },
    }))
}
