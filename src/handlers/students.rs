use std::collections::HashMap;

use axum::extract::{Path, State};
use uuid::Uuid;

use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, Item, Saved, json::Json};
use crate::state::AppState;
use crate::store::models::{Attendance, Exam, NewStudent, Student, StudentUpdate};

/// POST /api/students
///
/// `institution_id` is derived from the owning branch inside the store;
/// admission-number uniqueness within the institution is the store's
/// constraint.
pub async fn create(
    State(state): State<AppState>,
    Json(input): Json<NewStudent>,
) -> ApiResult<Saved<Student>> {
    if input.name.trim().is_empty() {
        return Err(field_error("name", "name is required"));
    }
    if input.admission_number.trim().is_empty() {
        return Err(field_error("admission_number", "admission number is required"));
    }
    let student = state.store.create_student(input).await?;
    Ok(ApiResponse::created(Saved::new("student created", student)))
}

/// GET /api/students/:id
pub async fn get(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Item<Student>> {
    let student = state.store.get_student(id).await?;
    Ok(ApiResponse::success(Item { item: student }))
}

/// PUT /api/students/:id
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(update): Json<StudentUpdate>,
) -> ApiResult<Saved<Student>> {
    let student = state.store.update_student(id, update).await?;
    Ok(ApiResponse::success(Saved::new("student updated", student)))
}

/// POST /api/students/:id/exams
pub async fn add_exam(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(exam): Json<Exam>,
) -> ApiResult<Saved<Student>> {
    if exam.name.trim().is_empty() {
        return Err(field_error("name", "exam name is required"));
    }
    let student = state.store.add_exam(id, exam).await?;
    Ok(ApiResponse::created(Saved::new("exam recorded", student)))
}

/// PUT /api/students/:id/attendance
pub async fn set_attendance(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(attendance): Json<Attendance>,
) -> ApiResult<Saved<Student>> {
    if attendance.total_days < 0 || attendance.present_days < 0 {
        return Err(field_error("attendance", "day counts must not be negative"));
    }
    if attendance.present_days > attendance.total_days {
        return Err(field_error(
            "present_days",
            "present days cannot exceed total days",
        ));
    }
    let student = state.store.set_attendance(id, attendance).await?;
    Ok(ApiResponse::success(Saved::new("attendance updated", student)))
}

fn field_error(field: &str, message: &str) -> ApiError {
    let mut field_errors = HashMap::new();
    field_errors.insert(field.to_string(), message.to_string());
    ApiError::validation_error("invalid input", Some(field_errors))
}
