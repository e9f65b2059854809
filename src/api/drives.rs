//! Drive endpoints: company-side lifecycle and admin review.

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use serde::Deserialize;

use super::{page, success, ApiResult};
use crate::auth::CompanyIdentity;
use crate::errors::AppError;
use crate::models::{
    CreateDriveRequest, Drive, DriveReviewFilter, DriveStatusUpdate, ReplaceTargetsRequest,
    ReviewDecision, UpdateDriveRequest,
};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct DriveListQuery {
    pub status_filter: Option<String>,
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

// ==================== COMPANY ====================

/// GET /api/company/drives
pub async fn list_drives(
    State(state): State<AppState>,
    Extension(company): Extension<CompanyIdentity>,
) -> ApiResult<Vec<Drive>> {
    success(state.repo.list_company_drives(company.id).await?)
}

/// POST /api/company/drives - Create a draft drive.
pub async fn create_drive(
    State(state): State<AppState>,
    Extension(company): Extension<CompanyIdentity>,
    Json(request): Json<CreateDriveRequest>,
) -> ApiResult<Drive> {
    success(state.repo.create_drive(company.id, &request).await?)
}

/// GET /api/company/drives/:id
pub async fn get_drive(
    State(state): State<AppState>,
    Extension(company): Extension<CompanyIdentity>,
    Path(id): Path<i64>,
) -> ApiResult<Drive> {
    success(state.repo.get_drive(company.id, id).await?)
}

/// PUT /api/company/drives/:id
pub async fn update_drive(
    State(state): State<AppState>,
    Extension(company): Extension<CompanyIdentity>,
    Path(id): Path<i64>,
    Json(request): Json<UpdateDriveRequest>,
) -> ApiResult<Drive> {
    success(state.repo.update_drive(company.id, id, &request).await?)
}

/// DELETE /api/company/drives/:id
pub async fn delete_drive(
    State(state): State<AppState>,
    Extension(company): Extension<CompanyIdentity>,
    Path(id): Path<i64>,
) -> ApiResult<()> {
    state.repo.delete_drive(company.id, id).await?;
    success(())
}

/// PUT /api/company/drives/:id/targets - Replace all targets.
pub async fn replace_drive_targets(
    State(state): State<AppState>,
    Extension(company): Extension<CompanyIdentity>,
    Path(id): Path<i64>,
    Json(request): Json<ReplaceTargetsRequest>,
) -> ApiResult<Drive> {
    success(
        state
            .repo
            .replace_targets(company.id, id, &request.targets)
            .await?,
    )
}

/// PUT /api/company/drives/:id/submit - Submit a draft for admin review.
pub async fn submit_drive(
    State(state): State<AppState>,
    Extension(company): Extension<CompanyIdentity>,
    Path(id): Path<i64>,
) -> ApiResult<Drive> {
    let drive = state.repo.submit_drive(company.id, id).await?;
    tracing::info!(drive_id = id, company_id = company.id, "Drive submitted for review");
    success(drive)
}

/// PUT /api/company/drives/:id/status - Move an approved drive to another status.
pub async fn update_drive_status(
    State(state): State<AppState>,
    Extension(company): Extension<CompanyIdentity>,
    Path(id): Path<i64>,
    Json(update): Json<DriveStatusUpdate>,
) -> ApiResult<Drive> {
    success(
        state
            .repo
            .update_drive_status(company.id, id, update.status)
            .await?,
    )
}

/// POST /api/company/drives/:id/duplicate - Copy a drive into a new draft.
pub async fn duplicate_drive(
    State(state): State<AppState>,
    Extension(company): Extension<CompanyIdentity>,
    Path(id): Path<i64>,
) -> ApiResult<Drive> {
    success(state.repo.duplicate_drive(company.id, id).await?)
}

// ==================== ADMIN ====================

/// GET /api/admin/drives?status_filter=pending|approved|rejected|all
pub async fn list_drives_for_review(
    State(state): State<AppState>,
    Query(query): Query<DriveListQuery>,
) -> ApiResult<Vec<Drive>> {
    let filter = match query.status_filter.as_deref() {
        Some(raw) => DriveReviewFilter::from_str(raw).ok_or_else(|| {
            AppError::Validation(format!(
                "Unknown status filter {:?}; expected pending, approved, rejected or all",
                raw
            ))
        })?,
        None => DriveReviewFilter::default(),
    };
    let (skip, limit) = page(query.skip, query.limit);

    success(state.repo.list_drives_for_review(filter, skip, limit).await?)
}

/// GET /api/admin/drives/:id
pub async fn get_drive_for_review(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Drive> {
    success(state.repo.get_drive_for_review(id).await?)
}

/// PUT /api/admin/drives/:id/approve - Approve or reject a submitted drive.
pub async fn review_drive(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(decision): Json<ReviewDecision>,
) -> ApiResult<Drive> {
    success(
        state
            .repo
            .review_drive(id, decision.is_approved, decision.admin_notes.as_deref())
            .await?,
    )
}
