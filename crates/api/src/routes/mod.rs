pub mod health;
pub mod pages;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /pages                                       list, create
/// /pages/{id}                                  get, update, delete
/// /pages/{id}/versions                         version history
/// /pages/{id}/versions/{version_id}/restore    restore (POST)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new().nest("/pages", pages::router())
}
