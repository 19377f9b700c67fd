//! Handlers for page CRUD, version history and restore.
//!
//! Handlers only adapt HTTP to the page lifecycle: authentication, access
//! checks, root-prop translation and the homepage guard all run inside
//! [`pagesync_core::lifecycle::PageLifecycle`].

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

use pagesync_core::request::{
    CreatePageRequest, GetPageQuery, ListPagesQuery, ListVersionsQuery, UpdatePageRequest,
};
use pagesync_core::types::DbId;

use crate::error::AppResult;
use crate::extract::{AppJson, AppPath, AppQuery};
use crate::middleware::auth::MaybeAuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/* --------------------------------------------------------------------------
Page CRUD
-------------------------------------------------------------------------- */

/// GET /pages
///
/// List pages of the configured collection, paged and sorted.
pub async fn list_pages(
    auth: MaybeAuthUser,
    State(state): State<AppState>,
    AppQuery(params): AppQuery<ListPagesQuery>,
) -> AppResult<impl IntoResponse> {
    let result = state.pages.list_pages(auth.actor(), &params).await?;
    Ok(Json(DataResponse { data: result }))
}

/// POST /pages
///
/// Create a page. Lands in Draft unless the body sets `status: published`.
pub async fn create_page(
    auth: MaybeAuthUser,
    State(state): State<AppState>,
    AppJson(input): AppJson<CreatePageRequest>,
) -> AppResult<impl IntoResponse> {
    let page = state.pages.create_page(auth.actor(), input).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: page })))
}

/// GET /pages/{id}
///
/// The published copy, or the working copy with `?draft=true`.
pub async fn get_page(
    auth: MaybeAuthUser,
    State(state): State<AppState>,
    AppPath(id): AppPath<DbId>,
    AppQuery(params): AppQuery<GetPageQuery>,
) -> AppResult<impl IntoResponse> {
    let page = state.pages.get_page(auth.actor(), id, params.draft).await?;
    Ok(Json(DataResponse { data: page }))
}

/// PATCH /pages/{id}
///
/// Apply a partial update through the page update protocol.
pub async fn update_page(
    auth: MaybeAuthUser,
    State(state): State<AppState>,
    AppPath(id): AppPath<DbId>,
    AppJson(input): AppJson<UpdatePageRequest>,
) -> AppResult<impl IntoResponse> {
    let page = state.pages.update_page(auth.actor(), id, input).await?;
    Ok(Json(DataResponse { data: page }))
}

/// DELETE /pages/{id}
///
/// Delete a page and its version history. Returns the deleted document.
pub async fn delete_page(
    auth: MaybeAuthUser,
    State(state): State<AppState>,
    AppPath(id): AppPath<DbId>,
) -> AppResult<impl IntoResponse> {
    let page = state.pages.delete_page(auth.actor(), id).await?;
    Ok(Json(DataResponse { data: page }))
}

/* --------------------------------------------------------------------------
Versions
-------------------------------------------------------------------------- */

/// GET /pages/{id}/versions
///
/// Version snapshots of a page, newest first.
pub async fn list_versions(
    auth: MaybeAuthUser,
    State(state): State<AppState>,
    AppPath(id): AppPath<DbId>,
    AppQuery(params): AppQuery<ListVersionsQuery>,
) -> AppResult<impl IntoResponse> {
    let versions = state.pages.list_versions(auth.actor(), id, &params).await?;
    Ok(Json(DataResponse { data: versions }))
}

/// POST /pages/{id}/versions/{version_id}/restore
///
/// Replace the page's working copy with a stored snapshot.
pub async fn restore_version(
    auth: MaybeAuthUser,
    State(state): State<AppState>,
    AppPath((id, version_id)): AppPath<(DbId, DbId)>,
) -> AppResult<impl IntoResponse> {
    let page = state
        .pages
        .restore_version(auth.actor(), id, version_id)
        .await?;
    Ok(Json(DataResponse { data: page }))
}
