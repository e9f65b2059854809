//! Login request and token response bodies.

use serde::{Deserialize, Serialize};

use super::Company;

#[derive(Debug, Clone, Deserialize)]
pub struct CompanyLoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AdminLoginRequest {
    pub username: String,
    pub password: String,
}

/// Issued access token. Company logins also return the company profile.
#[derive(Debug, Clone, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: &'static str,
    /// Lifetime in seconds
    pub expires_in: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<Company>,
}

impl TokenResponse {
    pub fn bearer(access_token: String, expires_in: i64, company: Option<Company>) -> Self {
        Self {
            access_token,
            token_type: "bearer",
            expires_in,
            company,
        }
    }
}
