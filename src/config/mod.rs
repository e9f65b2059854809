//! Configuration module for the exam portal backend.
//!
//! All configuration is loaded from environment variables with development defaults.
//! The signing secret and admin password defaults are insecure and logged as such at startup.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use jsonwebtoken::Algorithm;

pub const DEFAULT_SECRET_KEY: &str = "your-secret-key-here";
pub const DEFAULT_ADMIN_PASSWORD: &str = "admin123";
pub const DEFAULT_ACCESS_TOKEN_EXPIRE_MINUTES: i64 = 30;
/// One year. Longer lifetimes overflow chrono durations and second counts.
pub const MAX_ACCESS_TOKEN_EXPIRE_MINUTES: i64 = 60 * 24 * 365;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to SQLite database file
    pub db_path: PathBuf,
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Secret used to sign access tokens
    pub secret_key: String,
    /// HMAC algorithm used to sign access tokens
    pub algorithm: Algorithm,
    /// Access token lifetime in minutes
    pub access_token_expire_minutes: i64,
    /// Bootstrap admin account, created on first start
    pub admin_username: String,
    pub admin_password: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let db_path = env::var("PORTAL_DB_PATH")
            .unwrap_or_else(|_| "./data/portal.sqlite".to_string())
            .into();

        let bind_addr = env::var("PORTAL_BIND_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:8000".to_string())
            .parse()
            .expect("Invalid PORTAL_BIND_ADDR format");

        let log_level = env::var("PORTAL_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let secret_key =
            env::var("PORTAL_SECRET_KEY").unwrap_or_else(|_| DEFAULT_SECRET_KEY.to_string());

        let algorithm = env::var("PORTAL_ALGORITHM")
            .ok()
            .and_then(|raw| parse_algorithm(&raw))
            .unwrap_or(Algorithm::HS256);

        let access_token_expire_minutes = env::var("PORTAL_ACCESS_TOKEN_EXPIRE_MINUTES")
            .ok()
            .and_then(|raw| parse_expire_minutes(&raw))
            .unwrap_or(DEFAULT_ACCESS_TOKEN_EXPIRE_MINUTES);

        let admin_username =
            env::var("PORTAL_ADMIN_USERNAME").unwrap_or_else(|_| "admin".to_string());
        let admin_password = env::var("PORTAL_ADMIN_PASSWORD")
            .unwrap_or_else(|_| DEFAULT_ADMIN_PASSWORD.to_string());

        Self {
            db_path,
            bind_addr,
            log_level,
            secret_key,
            algorithm,
            access_token_expire_minutes,
            admin_username,
            admin_password,
        }
    }

    /// True when either credential still carries its shipped default.
    pub fn uses_insecure_defaults(&self) -> bool {
        self.secret_key == DEFAULT_SECRET_KEY || self.admin_password == DEFAULT_ADMIN_PASSWORD
    }
}

/// Only the HMAC family is accepted since tokens are signed with a shared secret.
fn parse_algorithm(raw: &str) -> Option<Algorithm> {
    match Algorithm::from_str(raw.trim()) {
        Ok(alg @ (Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512)) => Some(alg),
        _ => {
            tracing::warn!("Unsupported PORTAL_ALGORITHM {:?}, falling back to HS256", raw);
            None
        }
    }
}

fn parse_expire_minutes(raw: &str) -> Option<i64> {
    match raw.trim().parse::<i64>() {
        Ok(minutes) if (1..=MAX_ACCESS_TOKEN_EXPIRE_MINUTES).contains(&minutes) => Some(minutes),
        _ => {
            tracing::warn!(
                "Invalid PORTAL_ACCESS_TOKEN_EXPIRE_MINUTES {:?} (expected 1..={}), falling back to {}",
                raw,
                MAX_ACCESS_TOKEN_EXPIRE_MINUTES,
                DEFAULT_ACCESS_TOKEN_EXPIRE_MINUTES
            );
            None
        }
    }
}
