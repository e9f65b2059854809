//! Question endpoints.

use axum::{
    extract::{Path, State},
    Extension, Json,
};

use super::{success, ApiResult};
use crate::auth::CompanyIdentity;
use crate::models::{BulkQuestionsRequest, BulkUploadResult, CreateQuestionRequest, Question};
use crate::AppState;

/// POST /api/company/drives/:id/questions
pub async fn add_question(
    State(state): State<AppState>,
    Extension(company): Extension<CompanyIdentity>,
    Path(drive_id): Path<i64>,
    Json(request): Json<CreateQuestionRequest>,
) -> ApiResult<Question> {
    success(state.repo.add_question(company.id, drive_id, &request).await?)
}

/// POST /api/company/drives/:id/questions/bulk - All or nothing.
pub async fn add_questions_bulk(
    State(state): State<AppState>,
    Extension(company): Extension<CompanyIdentity>,
    Path(drive_id): Path<i64>,
    Json(request): Json<BulkQuestionsRequest>,
) -> ApiResult<BulkUploadResult> {
    let count = state
        .repo
        .add_questions_bulk(company.id, drive_id, &request.questions)
        .await?;

    success(BulkUploadResult {
        message: format!("Successfully added {} questions", count),
        count,
    })
}

/// GET /api/company/drives/:id/questions
pub async fn list_questions(
    State(state): State<AppState>,
    Extension(company): Extension<CompanyIdentity>,
    Path(drive_id): Path<i64>,
) -> ApiResult<Vec<Question>> {
    success(state.repo.list_questions(company.id, drive_id).await?)
}
