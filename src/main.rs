//! Exam Portal Backend
//!
//! REST backend for company recruitment drives: targeting, questions, and admin approval,
//! persisted in SQLite.

mod api;
mod auth;
mod config;
mod db;
mod errors;
mod models;

use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use api::{Colleges, StudentGroups};
use auth::TokenService;
use config::Config;
use db::Repository;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub tokens: Arc<TokenService>,
    pub config: Arc<Config>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env();

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Exam Portal Backend");
    tracing::info!("Database path: {:?}", config.db_path);
    tracing::info!("Bind address: {}", config.bind_addr);

    if config.uses_insecure_defaults() {
        tracing::warn!(
            "Running with the default secret key or admin password. Set PORTAL_SECRET_KEY and PORTAL_ADMIN_PASSWORD!"
        );
    }

    // Initialize database (schema, legacy migrations)
    let pool = db::init_database(&config.db_path).await?;
    let repo = Arc::new(Repository::new(pool));

    db::seed_reference_data(&repo).await?;
    db::ensure_bootstrap_admin(&repo, &config.admin_username, &config.admin_password).await?;

    let state = AppState {
        repo,
        tokens: Arc::new(TokenService::new(&config)),
        config: Arc::new(config.clone()),
    };

    // Build router
    let app = create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Registration and login (no auth required)
    let auth_routes = Router::new()
        .route("/company/register", post(api::register_company))
        .route("/company/login", post(api::login_company))
        .route("/admin/login", post(api::login_admin));

    let admin_routes = Router::new()
        // Companies
        .route("/companies", get(api::list_companies))
        .route("/companies/{id}/approve", put(api::review_company))
        .route("/companies/{id}/suspend", put(api::suspend_company))
        // Drives
        .route("/drives", get(api::list_drives_for_review))
        .route("/drives/{id}", get(api::get_drive_for_review))
        .route("/drives/{id}/approve", put(api::review_drive))
        // Colleges
        .route(
            "/colleges",
            get(api::list_registry_entries::<Colleges>)
                .post(api::create_registry_entry::<Colleges>),
        )
        .route(
            "/colleges/pending",
            get(api::list_pending_registry_entries::<Colleges>),
        )
        .route(
            "/colleges/{id}",
            put(api::update_registry_entry::<Colleges>)
                .delete(api::delete_registry_entry::<Colleges>),
        )
        .route(
            "/colleges/{id}/approve",
            put(api::approve_registry_entry::<Colleges>),
        )
        // Student groups
        .route(
            "/student-groups",
            get(api::list_registry_entries::<StudentGroups>)
                .post(api::create_registry_entry::<StudentGroups>),
        )
        .route(
            "/student-groups/pending",
            get(api::list_pending_registry_entries::<StudentGroups>),
        )
        .route(
            "/student-groups/{id}",
            put(api::update_registry_entry::<StudentGroups>)
                .delete(api::delete_registry_entry::<StudentGroups>),
        )
        .route(
            "/student-groups/{id}/approve",
            put(api::approve_registry_entry::<StudentGroups>),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::admin_auth_layer,
        ));

    let company_routes = Router::new()
        // Drives
        .route("/drives", get(api::list_drives).post(api::create_drive))
        .route(
            "/drives/{id}",
            get(api::get_drive)
                .put(api::update_drive)
                .delete(api::delete_drive),
        )
        .route("/drives/{id}/targets", put(api::replace_drive_targets))
        .route("/drives/{id}/submit", put(api::submit_drive))
        .route("/drives/{id}/status", put(api::update_drive_status))
        .route("/drives/{id}/duplicate", post(api::duplicate_drive))
        // Questions
        .route(
            "/drives/{id}/questions",
            get(api::list_questions).post(api::add_question),
        )
        .route("/drives/{id}/questions/bulk", post(api::add_questions_bulk))
        // Students
        .route(
            "/drives/{id}/students",
            get(api::list_students).post(api::register_students),
        )
        // Target selection
        .route(
            "/colleges",
            get(api::list_approved_registry_entries::<Colleges>),
        )
        .route(
            "/student-groups",
            get(api::list_approved_registry_entries::<StudentGroups>),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::company_auth_layer,
        ));

    // Health check (no auth required)
    let health_routes = Router::new().route("/health", get(health_check));

    Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api/admin", admin_routes)
        .nest("/api/company", company_routes)
        .merge(health_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests;
