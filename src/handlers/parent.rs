use axum::extract::{Extension, Path, Query, State};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::{self, Principal};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, Item};
use crate::services::fee_report::{self, FeeReport};
use crate::state::AppState;
use crate::store::models::{Exam, Student};

#[derive(Debug, Deserialize)]
pub struct VerifyQuery {
    #[serde(rename = "studentName")]
    pub student_name: String,
    pub phone: String,
}

/// Wire names here are pinned by the parent portal.
#[derive(Debug, Serialize)]
pub struct VerifyPayload {
    #[serde(rename = "parentId")]
    pub parent_id: Uuid,
    #[serde(rename = "parentName")]
    pub parent_name: String,
    #[serde(rename = "studentName")]
    pub student_name: String,
    pub token: String,
}

/// GET /api/parent/verify?studentName=...&phone=...
///
/// Matches a student by normalized name plus exact phone; the phone number
/// doubles as the parent's password. Either mismatch yields the same
/// generic failure so callers cannot probe which field was wrong.
pub async fn verify(
    State(state): State<AppState>,
    Query(query): Query<VerifyQuery>,
) -> ApiResult<VerifyPayload> {
    let failed = || ApiError::unauthorized("parent verification failed");

    if query.student_name.trim().is_empty() || query.phone.trim().is_empty() {
        return Err(failed());
    }

    let student = state
        .store
        .find_student_by_name_phone(&query.student_name, &query.phone)
        .await?
        .ok_or_else(failed)?;

    let principal = Principal::Parent { student_id: student.id };
    let token = auth::issue_token(&principal, &state.config.security)?;

    Ok(ApiResponse::success(VerifyPayload {
        parent_id: student.id,
        parent_name: student.parent_name.clone().unwrap_or_default(),
        student_name: student.name,
        token,
    }))
}

/// The bearer token must be a parent principal for exactly the student in
/// the path; anything else is Forbidden.
fn authorize_parent(principal: &Principal, parent_id: Uuid) -> Result<Uuid, ApiError> {
    match principal {
        Principal::Parent { student_id } if *student_id == parent_id => Ok(*student_id),
        _ => Err(ApiError::forbidden("token is not valid for this student")),
    }
}

/// GET /api/parent/:parentId/student
pub async fn student(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(parent_id): Path<Uuid>,
) -> ApiResult<Item<Student>> {
    let student_id = authorize_parent(&principal, parent_id)?;
    let student = state.store.get_student(student_id).await?;
    Ok(ApiResponse::success(Item { item: student }))
}

/// GET /api/parent/:parentId/fees
pub async fn fees(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(parent_id): Path<Uuid>,
) -> ApiResult<Item<FeeReport>> {
    let student_id = authorize_parent(&principal, parent_id)?;
    let student = state.store.get_student(student_id).await?;

    let (branch, payments) = futures::try_join!(
        state.store.get_branch(student.branch_id),
        state.store.payments_for_student(student.branch_id, &student.name),
    )?;

    Ok(ApiResponse::success(Item {
        item: fee_report::fee_report(&student, &branch, &payments),
    }))
}

#[derive(Debug, Serialize)]
pub struct AttendanceReport {
    pub present_days: i32,
    pub total_days: i32,
    pub percentage: f64,
}

#[derive(Debug, Serialize)]
pub struct MarksReport {
    pub student: String,
    pub attendance: Option<AttendanceReport>,
    pub exams: Vec<Exam>,
}

/// GET /api/parent/:parentId/marks
///
/// Empty exam lists and missing attendance are normal for new students.
pub async fn marks(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(parent_id): Path<Uuid>,
) -> ApiResult<Item<MarksReport>> {
    let student_id = authorize_parent(&principal, parent_id)?;
    let student = state.store.get_student(student_id).await?;

    let attendance = student.attendance.as_ref().map(|a| AttendanceReport {
        present_days: a.present_days,
        total_days: a.total_days,
        percentage: a.percentage(),
    });

    Ok(ApiResponse::success(Item {
        item: MarksReport {
            student: student.name.clone(),
            attendance,
            exams: student.exams,
        },
    }))
}
