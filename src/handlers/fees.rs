use std::collections::HashMap;

use axum::extract::State;

use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, Saved, json::Json};
use crate::state::AppState;
use crate::store::models::{FeePayment, NewFeePayment};

/// POST /api/fees - record a fee payment against a branch + student name.
pub async fn create(
    State(state): State<AppState>,
    Json(input): Json<NewFeePayment>,
) -> ApiResult<Saved<FeePayment>> {
    if input.amount <= 0 {
        let mut field_errors = HashMap::new();
        field_errors.insert("amount".to_string(), "amount must be positive".to_string());
        return Err(ApiError::validation_error("invalid input", Some(field_errors)));
    }
    if input.student_name.trim().is_empty() {
        let mut field_errors = HashMap::new();
        field_errors.insert("student_name".to_string(), "student name is required".to_string());
        return Err(ApiError::validation_error("invalid input", Some(field_errors)));
    }
    let payment = state.store.record_payment(input).await?;
    Ok(ApiResponse::created(Saved::new("fee payment recorded", payment)))
}
