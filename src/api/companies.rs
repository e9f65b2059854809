//! Admin company review endpoints.

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use serde::Deserialize;

use super::{page, success, ApiResult};
use crate::auth::AdminIdentity;
use crate::errors::AppError;
use crate::models::{Company, CompanyStatus, ReviewDecision, SuspendCompanyRequest};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CompanyListQuery {
    pub status: Option<String>,
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

/// GET /api/admin/companies - List companies, optionally by status.
pub async fn list_companies(
    State(state): State<AppState>,
    Query(query): Query<CompanyListQuery>,
) -> ApiResult<Vec<Company>> {
    let status = match query.status.as_deref().filter(|s| !s.is_empty()) {
        Some(raw) => Some(CompanyStatus::from_str(raw).ok_or_else(|| {
            AppError::Validation(format!("Unknown company status {:?}", raw))
        })?),
        None => None,
    };
    let (skip, limit) = page(query.skip, query.limit);

    success(state.repo.list_companies(status, skip, limit).await?)
}

/// PUT /api/admin/companies/:id/approve - Approve or reject a company.
pub async fn review_company(
    State(state): State<AppState>,
    Extension(admin): Extension<AdminIdentity>,
    Path(id): Path<i64>,
    Json(decision): Json<ReviewDecision>,
) -> ApiResult<Company> {
    let status = if decision.is_approved {
        CompanyStatus::Approved
    } else {
        CompanyStatus::Rejected
    };

    let company = state
        .repo
        .review_company(id, status, decision.admin_notes.as_deref(), &admin.username)
        .await?;

    tracing::info!(
        company_id = id,
        status = status.as_str(),
        reviewer = %admin.username,
        "Company reviewed"
    );
    success(company)
}

/// PUT /api/admin/companies/:id/suspend - Suspend a company.
pub async fn suspend_company(
    State(state): State<AppState>,
    Extension(admin): Extension<AdminIdentity>,
    Path(id): Path<i64>,
    Json(request): Json<SuspendCompanyRequest>,
) -> ApiResult<Company> {
    let company = state
        .repo
        .review_company(
            id,
            CompanyStatus::Suspended,
            request.admin_notes.as_deref(),
            &admin.username,
        )
        .await?;

    tracing::info!(company_id = id, reviewer = %admin.username, "Company suspended");
    success(company)
}
