//! College and student-group endpoints.
//!
//! The handlers are generic over a [`RegistryKind`] so one set serves both registries.

use axum::{
    extract::{Path, State},
    Json,
};

use super::{success, ApiResult};
use crate::models::{
    CreateRegistryEntryRequest, Registry, RegistryEntry, UpdateRegistryEntryRequest,
};
use crate::AppState;

/// Selects the registry a generic handler works on.
pub trait RegistryKind: Send + Sync + 'static {
    const REGISTRY: Registry;
}

pub struct Colleges;

impl RegistryKind for Colleges {
    const REGISTRY: Registry = Registry::College;
}

pub struct StudentGroups;

impl RegistryKind for StudentGroups {
    const REGISTRY: Registry = Registry::StudentGroup;
}

/// GET /api/admin/{colleges,student-groups} - All entries.
pub async fn list_registry_entries<R: RegistryKind>(
    State(state): State<AppState>,
) -> ApiResult<Vec<RegistryEntry>> {
    success(state.repo.list_registry(R::REGISTRY, None).await?)
}

/// GET /api/admin/{colleges,student-groups}/pending - Entries awaiting approval.
pub async fn list_pending_registry_entries<R: RegistryKind>(
    State(state): State<AppState>,
) -> ApiResult<Vec<RegistryEntry>> {
    success(state.repo.list_registry(R::REGISTRY, Some(false)).await?)
}

/// GET /api/company/{colleges,student-groups} - Approved entries for target selection.
pub async fn list_approved_registry_entries<R: RegistryKind>(
    State(state): State<AppState>,
) -> ApiResult<Vec<RegistryEntry>> {
    success(state.repo.list_registry(R::REGISTRY, Some(true)).await?)
}

/// POST /api/admin/{colleges,student-groups} - Admin-created entries are approved.
pub async fn create_registry_entry<R: RegistryKind>(
    State(state): State<AppState>,
    Json(request): Json<CreateRegistryEntryRequest>,
) -> ApiResult<RegistryEntry> {
    success(
        state
            .repo
            .create_registry_entry(R::REGISTRY, &request.name, true)
            .await?,
    )
}

/// PUT /api/admin/{colleges,student-groups}/:id
pub async fn update_registry_entry<R: RegistryKind>(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(request): Json<UpdateRegistryEntryRequest>,
) -> ApiResult<RegistryEntry> {
    success(
        state
            .repo
            .update_registry_entry(R::REGISTRY, id, &request)
            .await?,
    )
}

/// PUT /api/admin/{colleges,student-groups}/:id/approve
pub async fn approve_registry_entry<R: RegistryKind>(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<RegistryEntry> {
    success(state.repo.approve_registry_entry(R::REGISTRY, id).await?)
}

/// DELETE /api/admin/{colleges,student-groups}/:id
pub async fn delete_registry_entry<R: RegistryKind>(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<()> {
    state.repo.delete_registry_entry(R::REGISTRY, id).await?;
    tracing::info!(id, registry = R::REGISTRY.table(), "Deleted registry entry");
    success(())
}
