use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};

use crate::auth::{self, AuthError, Principal};
use crate::error::ApiError;
use crate::state::AppState;

/// Bearer-token middleware: validates the token, builds the `Principal`,
/// and injects it into request extensions for handlers to consume.
pub async fn require_bearer(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_bearer(&headers)?;
    let principal = auth::verify_token(&token, &state.config.security)?;
    request.extensions_mut().insert(principal);
    Ok(next.run(request).await)
}

fn extract_bearer(headers: &HeaderMap) -> Result<String, AuthError> {
    let header = headers
        .get("authorization")
        .ok_or(AuthError::MissingToken)?
        .to_str()
        .map_err(|_| AuthError::InvalidToken)?;

    let token = header.strip_prefix("Bearer ").ok_or(AuthError::InvalidToken)?;
    if token.trim().is_empty() {
        return Err(AuthError::MissingToken);
    }
    Ok(token.to_string())
}
