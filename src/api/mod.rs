//! REST API module.
//!
//! Handlers are grouped per resource. Admin and company handlers sit behind their auth layers
//! and receive the caller's identity as a request extension.

mod auth;
mod companies;
mod drives;
mod questions;
mod registries;
mod students;

pub use auth::*;
pub use companies::*;
pub use drives::*;
pub use questions::*;
pub use registries::*;
pub use students::*;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::errors::AppError;

const DEFAULT_PAGE_LIMIT: i64 = 100;
const MAX_PAGE_LIMIT: i64 = 1000;

/// Success response envelope.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn new(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

/// Response type that can be either success or error.
pub type ApiResult<T> = Result<ApiResponse<T>, AppError>;

/// Create a successful API response.
pub fn success<T: Serialize>(data: T) -> ApiResult<T> {
    Ok(ApiResponse::new(data))
}

/// Offset and limit from optional `skip` / `limit` query parameters.
fn page(skip: Option<i64>, limit: Option<i64>) -> (i64, i64) {
    (
        skip.unwrap_or(0).max(0),
        limit.unwrap_or(DEFAULT_PAGE_LIMIT).clamp(1, MAX_PAGE_LIMIT),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_defaults_and_bounds() {
        assert_eq!(page(None, None), (0, DEFAULT_PAGE_LIMIT));
        assert_eq!(page(Some(-5), Some(0)), (0, 1));
        assert_eq!(page(Some(20), Some(5000)), (20, MAX_PAGE_LIMIT));
    }
}
