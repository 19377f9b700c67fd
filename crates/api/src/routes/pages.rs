//! Route definitions for pages.
//!
//! Registered under `/pages`.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::pages;
use crate::state::AppState;

/// Page routes, registered as `/pages`.
///
/// ```text
/// GET    /                                   list_pages
/// POST   /                                   create_page
/// GET    /{id}?draft=bool                    get_page
/// PATCH  /{id}                               update_page
/// DELETE /{id}                               delete_page
/// GET    /{id}/versions                      list_versions
/// POST   /{id}/versions/{version_id}/restore restore_version
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(pages::list_pages).post(pages::create_page))
        .route(
            "/{id}",
            get(pages::get_page)
                .patch(pages::update_page)
                .delete(pages::delete_page),
        )
        .route("/{id}/versions", get(pages::list_versions))
        .route(
            "/{id}/versions/{version_id}/restore",
            post(pages::restore_version),
        )
}
