//! HTTP-level integration tests for the page endpoints.
//!
//! Runs the full router on the in-memory store. Covers create/update,
//! draft and published copies, the homepage conflict and swap flow,
//! version history and restore, and the error envelope for each failure.

mod common;

use axum::http::StatusCode;
use common::{
    admin_token, body_json, delete_auth, editor_token, get, get_auth, patch_json_auth,
    post_auth, post_json, post_json_auth, viewer_token,
};
use serde_json::json;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Create a page as admin and return its JSON document.
async fn create_page(app: axum::Router, body: serde_json::Value) -> serde_json::Value {
    let response = post_json_auth(app, "/api/v1/pages", body, &admin_token()).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await["data"].clone()
}

fn page_uri(id: &serde_json::Value) -> String {
    format!("/api/v1/pages/{}", id.as_i64().unwrap())
}

// ---------------------------------------------------------------------------
// Create
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_create_page_defaults_to_draft() {
    let app = common::build_test_app();

    let page = create_page(app, json!({"title": "About", "slug": "about"})).await;

    assert_eq!(page["title"], "About");
    assert_eq!(page["slug"], "about");
    assert_eq!(page["status"], "draft");
    assert_eq!(page["collection"], "pages");
    assert!(page["id"].is_i64());
    assert!(page["createdAt"].is_string());
}

#[tokio::test]
async fn test_create_page_missing_title_is_400() {
    let app = common::build_test_app();

    let response = post_json_auth(
        app,
        "/api/v1/pages",
        json!({"slug": "about"}),
        &admin_token(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["code"], "VALIDATION_ERROR");
    assert_eq!(json["field"], "title");
}

#[tokio::test]
async fn test_create_page_unknown_key_is_400() {
    let app = common::build_test_app();

    let response = post_json_auth(
        app,
        "/api/v1/pages",
        json!({"title": "About", "slug": "about", "owner": 9}),
        &admin_token(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["code"], "VALIDATION_ERROR");
    assert_eq!(json["field"], "body");
}

#[tokio::test]
async fn test_duplicate_slug_is_409() {
    let app = common::build_test_app();
    create_page(app.clone(), json!({"title": "About", "slug": "about"})).await;

    let response = post_json_auth(
        app,
        "/api/v1/pages",
        json!({"title": "About again", "slug": "about"}),
        &admin_token(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::CONFLICT);
    let json = body_json(response).await;
    assert_eq!(json["code"], "DUPLICATE_FIELD");
    assert_eq!(json["field"], "slug");
}

// ---------------------------------------------------------------------------
// Authentication and access
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_missing_token_is_401() {
    let app = common::build_test_app();

    let body = json!({"title": "A", "slug": "a"});
    let response = post_json(app.clone(), "/api/v1/pages", body).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["code"], "UNAUTHORIZED");

    let response = get(app, "/api/v1/pages").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_invalid_token_is_401() {
    let app = common::build_test_app();

    let response = get_auth(app, "/api/v1/pages", "not-a-jwt").await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = body_json(response).await;
    assert_eq!(json["code"], "UNAUTHORIZED");
    assert_eq!(json["error"], "Invalid or expired token");
}

#[tokio::test]
async fn test_viewer_reads_but_cannot_write() {
    let app = common::build_test_app();
    let page = create_page(app.clone(), json!({"title": "About", "slug": "about"})).await;

    let response = get_auth(app.clone(), &page_uri(&page["id"]), &viewer_token()).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = post_json_auth(
        app.clone(),
        "/api/v1/pages",
        json!({"title": "Blog", "slug": "blog"}),
        &viewer_token(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_json(response).await["code"], "FORBIDDEN");

    let response = delete_auth(app, &page_uri(&page["id"]), &editor_token()).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_publish_restricted_to_publish_roles() {
    let mut config = common::test_config();
    config.publish_roles = vec!["admin".to_string()];
    let app = common::build_test_app_with(config);

    let response = post_json_auth(
        app.clone(),
        "/api/v1/pages",
        json!({"title": "News", "slug": "news", "status": "published"}),
        &editor_token(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = post_json_auth(
        app.clone(),
        "/api/v1/pages",
        json!({"title": "News", "slug": "news"}),
        &editor_token(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let page = body_json(response).await["data"].clone();

    let response = patch_json_auth(
        app,
        &page_uri(&page["id"]),
        json!({"status": "published"}),
        &admin_token(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["status"], "published");
}

// ---------------------------------------------------------------------------
// Draft and published copies
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_draft_edit_keeps_published_copy() {
    let app = common::build_test_app();
    let page = create_page(
        app.clone(),
        json!({"title": "Home", "slug": "home", "status": "published"}),
    )
    .await;
    assert_eq!(page["status"], "published");
    let uri = page_uri(&page["id"]);

    let response = patch_json_auth(
        app.clone(),
        &uri,
        json!({"title": "Home (draft)"}),
        &admin_token(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["status"], "draft");

    let published = body_json(get_auth(app.clone(), &uri, &viewer_token()).await).await;
    assert_eq!(published["data"]["title"], "Home");
    assert_eq!(published["data"]["status"], "published");

    let working = body_json(
        get_auth(app, &format!("{uri}?draft=true"), &viewer_token()).await,
    )
    .await;
    assert_eq!(working["data"]["title"], "Home (draft)");
}

#[tokio::test]
async fn test_root_props_fill_structured_fields() {
    let app = common::build_test_app();
    let page = create_page(app.clone(), json!({"title": "Home", "slug": "home"})).await;

    let response = patch_json_auth(
        app,
        &page_uri(&page["id"]),
        json!({
            "editorContent": {
                "root": {"props": {
                    "title": "  Welcome  ",
                    "metaTitle": "Welcome!",
                    "noIndex": "true"
                }},
                "content": []
            }
        }),
        &admin_token(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let data = body_json(response).await["data"].clone();
    assert_eq!(data["title"], "Welcome");
    assert_eq!(data["meta"]["title"], "Welcome!");
    assert_eq!(data["meta"]["noIndex"], true);
}

#[tokio::test]
async fn test_failed_transform_is_422() {
    let app = common::build_test_app();
    let page = create_page(app.clone(), json!({"title": "Home", "slug": "home"})).await;
    let uri = page_uri(&page["id"]);

    let response = patch_json_auth(
        app.clone(),
        &uri,
        json!({
            "title": "Changed",
            "editorContent": {"root": {"props": {"conversionValue": "lots"}}}
        }),
        &admin_token(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let json = body_json(response).await;
    assert_eq!(json["code"], "TRANSFORM_ERROR");
    assert_eq!(json["field"], "conversionValue");

    let stored = body_json(
        get_auth(app, &format!("{uri}?draft=true"), &admin_token()).await,
    )
    .await;
    assert_eq!(stored["data"]["title"], "Home");
}

// ---------------------------------------------------------------------------
// Homepage
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_homepage_conflict_then_swap() {
    let app = common::build_test_app();
    let about = create_page(
        app.clone(),
        json!({"title": "About", "slug": "about", "isHomepage": true}),
    )
    .await;
    let home = create_page(app.clone(), json!({"title": "Home", "slug": "home"})).await;

    let response = patch_json_auth(
        app.clone(),
        &page_uri(&home["id"]),
        json!({"isHomepage": true}),
        &admin_token(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let json = body_json(response).await;
    assert_eq!(json["code"], "HOMEPAGE_CONFLICT");
    assert_eq!(json["field"], "isHomepage");
    assert_eq!(json["conflict"]["existing"]["slug"], "about");
    assert_eq!(json["conflict"]["existing"]["id"], about["id"]);

    let response = patch_json_auth(
        app.clone(),
        &page_uri(&home["id"]),
        json!({"isHomepage": true, "swapHomepage": true}),
        &admin_token(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["isHomepage"], true);

    let previous = body_json(
        get_auth(app, &format!("{}?draft=true", page_uri(&about["id"])), &admin_token()).await,
    )
    .await;
    assert_eq!(previous["data"]["isHomepage"], false);
}

// ---------------------------------------------------------------------------
// Listing
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_list_pages_filters_and_sorts() {
    let app = common::build_test_app();
    create_page(app.clone(), json!({"title": "Blog", "slug": "blog"})).await;
    create_page(
        app.clone(),
        json!({"title": "About", "slug": "about", "status": "published"}),
    )
    .await;
    create_page(app.clone(), json!({"title": "Contact", "slug": "contact"})).await;

    let json = body_json(
        get_auth(app.clone(), "/api/v1/pages?sort=slug", &viewer_token()).await,
    )
    .await;
    assert_eq!(json["data"]["totalDocs"], 3);
    let slugs: Vec<&str> = json["data"]["docs"]
        .as_array()
        .unwrap()
        .iter()
        .map(|doc| doc["slug"].as_str().unwrap())
        .collect();
    assert_eq!(slugs, vec!["about", "blog", "contact"]);

    let json = body_json(
        get_auth(app.clone(), "/api/v1/pages?status=published", &viewer_token()).await,
    )
    .await;
    assert_eq!(json["data"]["totalDocs"], 1);
    assert_eq!(json["data"]["docs"][0]["slug"], "about");

    let json = body_json(
        get_auth(app.clone(), "/api/v1/pages?limit=2&page=2&sort=slug", &viewer_token()).await,
    )
    .await;
    assert_eq!(json["data"]["docs"].as_array().unwrap().len(), 1);
    assert_eq!(json["data"]["hasPrevPage"], true);
    assert_eq!(json["data"]["hasNextPage"], false);

    let response = get_auth(app, "/api/v1/pages?sort=-secret", &viewer_token()).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["field"], "sort");
}

#[tokio::test]
async fn test_non_numeric_id_is_400() {
    let app = common::build_test_app();

    let response = get_auth(app, "/api/v1/pages/abc", &viewer_token()).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["field"], "path");
}

// ---------------------------------------------------------------------------
// Versions
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_versions_and_restore() {
    let app = common::build_test_app();
    let page = create_page(
        app.clone(),
        json!({"title": "First", "slug": "home", "fields": {"pageLayout": "wide"}}),
    )
    .await;
    let uri = page_uri(&page["id"]);

    let response = patch_json_auth(
        app.clone(),
        &uri,
        json!({"title": "Second", "fields": {"pageLayout": "narrow"}}),
        &admin_token(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let versions = body_json(
        get_auth(app.clone(), &format!("{uri}/versions"), &viewer_token()).await,
    )
    .await;
    let docs = versions["data"]["docs"].as_array().unwrap().clone();
    assert_eq!(docs.len(), 2);
    assert_eq!(docs[0]["versionedFields"]["title"], "Second");
    assert_eq!(docs[1]["versionedFields"]["title"], "First");

    let oldest_first = body_json(
        get_auth(app.clone(), &format!("{uri}/versions?sort=createdAt"), &viewer_token()).await,
    )
    .await;
    assert_eq!(oldest_first["data"]["docs"][0]["versionedFields"]["title"], "First");

    let response =
        get_auth(app.clone(), &format!("{uri}/versions?sort=title"), &viewer_token()).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["field"], "sort");

    let oldest = docs[1]["id"].as_i64().unwrap();
    let response = post_auth(
        app.clone(),
        &format!("{uri}/versions/{oldest}/restore"),
        &editor_token(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let restored = body_json(response).await["data"].clone();
    assert_eq!(restored["title"], "First");
    assert_eq!(restored["pageLayout"], "wide");

    let response = post_auth(app, &format!("{uri}/versions/9999/restore"), &editor_token()).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        body_json(response).await["error"],
        "PageVersion with id 9999 not found"
    );
}

// ---------------------------------------------------------------------------
// Delete
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_delete_page_returns_document() {
    let app = common::build_test_app();
    let page = create_page(app.clone(), json!({"title": "Old", "slug": "old"})).await;
    let uri = page_uri(&page["id"]);

    let response = delete_auth(app.clone(), &uri, &admin_token()).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["slug"], "old");

    let response = get_auth(app.clone(), &uri, &admin_token()).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["code"], "NOT_FOUND");

    let response = delete_auth(app, &uri, &admin_token()).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
