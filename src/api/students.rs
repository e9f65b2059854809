//! Exam participant endpoints.

use axum::{
    extract::{Path, State},
    Extension, Json,
};

use super::{success, ApiResult};
use crate::auth::CompanyIdentity;
use crate::models::{RegisterStudentsRequest, Student};
use crate::AppState;

/// POST /api/company/drives/:id/students
pub async fn register_students(
    State(state): State<AppState>,
    Extension(company): Extension<CompanyIdentity>,
    Path(drive_id): Path<i64>,
    Json(request): Json<RegisterStudentsRequest>,
) -> ApiResult<Vec<Student>> {
    let students = state
        .repo
        .register_students(company.id, drive_id, &request.students)
        .await?;

    tracing::info!(drive_id, count = students.len(), "Registered students");
    success(students)
}

/// GET /api/company/drives/:id/students
pub async fn list_students(
    State(state): State<AppState>,
    Extension(company): Extension<CompanyIdentity>,
    Path(drive_id): Path<i64>,
) -> ApiResult<Vec<Student>> {
    success(state.repo.list_students(company.id, drive_id).await?)
}
