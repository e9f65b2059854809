//! Authentication module.
//!
//! Passwords are stored as argon2 PHC strings. Logins hand out HMAC-signed bearer tokens
//! carrying the subject and its role; the admin and company layers resolve a token to an
//! identity and insert it into the request extensions for handlers to extract.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::errors::AppError;
use crate::models::CompanyStatus;
use crate::AppState;

/// Who a token was issued to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Company,
}

/// Token claims.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Admin username or company id
    pub sub: String,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

/// Identity of an authenticated admin, available to admin handlers.
#[derive(Debug, Clone)]
pub struct AdminIdentity {
    pub username: String,
}

/// Identity of an authenticated, approved company, available to company handlers.
#[derive(Debug, Clone)]
pub struct CompanyIdentity {
    pub id: i64,
    pub name: String,
}

/// Issues and verifies access tokens.
pub struct TokenService {
    header: Header,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    expires_in: Duration,
}

impl TokenService {
    pub fn new(config: &Config) -> Self {
        let secret = config.secret_key.as_bytes();
        Self {
            header: Header::new(config.algorithm),
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation: Validation::new(config.algorithm),
            expires_in: Duration::minutes(config.access_token_expire_minutes),
        }
    }

    /// Sign a token for `subject` with the configured lifetime.
    pub fn issue(&self, subject: &str, role: Role) -> Result<String, AppError> {
        let now = Utc::now();
        let claims = Claims {
            sub: subject.to_string(),
            role,
            iat: now.timestamp(),
            exp: (now + self.expires_in).timestamp(),
        };
        encode(&self.header, &claims, &self.encoding_key)
            .map_err(|e| AppError::Internal(format!("Failed to sign token: {}", e)))
    }

    /// Verify signature and expiry, and require the expected role.
    pub fn verify(&self, token: &str, role: Role) -> Result<Claims, AppError> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
            tracing::debug!("Rejected token: {}", e);
            AppError::Unauthorized("Could not validate credentials".to_string())
        })?;

        if data.claims.role != role {
            return Err(AppError::Unauthorized(
                "Token is not valid for this resource".to_string(),
            ));
        }
        Ok(data.claims)
    }
}

/// Hash a password into a PHC string.
pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))
}

/// Check a password against a stored PHC string. Malformed hashes never verify.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    match PasswordHash::new(stored_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            tracing::warn!("Stored password hash is malformed: {}", e);
            false
        }
    }
}

/// Admin authentication layer.
pub async fn admin_auth_layer(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(&request)?;
    let claims = state.tokens.verify(&token, Role::Admin)?;

    if !state.repo.admin_exists(&claims.sub).await? {
        return Err(AppError::Unauthorized("Admin account no longer exists".to_string()));
    }

    request
        .extensions_mut()
        .insert(AdminIdentity { username: claims.sub });
    Ok(next.run(request).await)
}

/// Company authentication layer. Only approved companies get through.
pub async fn company_auth_layer(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(&request)?;
    let claims = state.tokens.verify(&token, Role::Company)?;

    let company_id: i64 = claims
        .sub
        .parse()
        .map_err(|_| AppError::Unauthorized("Could not validate credentials".to_string()))?;

    let company = state
        .repo
        .get_company(company_id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Company account no longer exists".to_string()))?;

    ensure_company_active(company.status)?;

    request.extensions_mut().insert(CompanyIdentity {
        id: company.id,
        name: company.name,
    });
    Ok(next.run(request).await)
}

/// Only approved companies may log in or call company endpoints.
pub fn ensure_company_active(status: CompanyStatus) -> Result<(), AppError> {
    match status {
        CompanyStatus::Approved => Ok(()),
        CompanyStatus::Pending => Err(AppError::Forbidden(
            "Company registration is pending admin approval".to_string(),
        )),
        CompanyStatus::Rejected => Err(AppError::Forbidden(
            "Company registration was rejected".to_string(),
        )),
        CompanyStatus::Suspended => Err(AppError::Forbidden(
            "Company account is suspended".to_string(),
        )),
    }
}

fn bearer_token(request: &Request) -> Result<String, AppError> {
    request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer ").or_else(|| s.strip_prefix("bearer ")))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::Unauthorized("Missing bearer token".to_string()))
}
