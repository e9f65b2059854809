//! Registration and login endpoints.

use axum::{extract::State, Json};
use validator::ValidateEmail;

use super::{success, ApiResult};
use crate::auth::{ensure_company_active, hash_password, verify_password, Role};
use crate::errors::AppError;
use crate::models::{
    AdminLoginRequest, Company, CompanyLoginRequest, RegisterCompanyRequest, TokenResponse,
};
use crate::AppState;

const MIN_PASSWORD_LEN: usize = 6;

/// POST /api/auth/company/register - Register a company for admin review.
pub async fn register_company(
    State(state): State<AppState>,
    Json(request): Json<RegisterCompanyRequest>,
) -> ApiResult<Company> {
    validate_registration(&request)?;

    let password_hash = hash_password(&request.password)?;
    let company = state.repo.create_company(&request, &password_hash).await?;

    tracing::info!(company_id = company.id, "Company registered, awaiting approval");
    success(company)
}

/// POST /api/auth/company/login - Exchange company credentials for a token.
pub async fn login_company(
    State(state): State<AppState>,
    Json(request): Json<CompanyLoginRequest>,
) -> ApiResult<TokenResponse> {
    let (company, _) = state
        .repo
        .get_company_credentials(&request.email)
        .await?
        .filter(|(_, hash)| verify_password(&request.password, hash))
        .ok_or_else(|| AppError::Unauthorized("Incorrect email or password".to_string()))?;

    ensure_company_active(company.status)?;

    let token = state.tokens.issue(&company.id.to_string(), Role::Company)?;
    success(TokenResponse::bearer(
        token,
        state.config.access_token_expire_minutes * 60,
        Some(company),
    ))
}

/// POST /api/auth/admin/login - Exchange admin credentials for a token.
pub async fn login_admin(
    State(state): State<AppState>,
    Json(request): Json<AdminLoginRequest>,
) -> ApiResult<TokenResponse> {
    let verified = state
        .repo
        .get_admin_password_hash(&request.username)
        .await?
        .is_some_and(|hash| verify_password(&request.password, &hash));

    if !verified {
        return Err(AppError::Unauthorized(
            "Incorrect username or password".to_string(),
        ));
    }

    let token = state.tokens.issue(&request.username, Role::Admin)?;
    success(TokenResponse::bearer(
        token,
        state.config.access_token_expire_minutes * 60,
        None,
    ))
}

fn validate_registration(request: &RegisterCompanyRequest) -> Result<(), AppError> {
    if request.name.trim().is_empty() {
        return Err(AppError::Validation("Company name is required".to_string()));
    }
    if !looks_like_email(request.email.trim()) {
        return Err(AppError::Validation(format!(
            "Invalid email address {:?}",
            request.email
        )));
    }
    if request.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::Validation(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}

fn looks_like_email(email: &str) -> bool {
    email.validate_email()
        && email
            .split_once('@')
            .is_some_and(|(_, domain)| domain.contains('.'))
}
