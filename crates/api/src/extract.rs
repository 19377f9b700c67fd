//! Body, query and path extractors whose rejections use the API error shape.
//!
//! Axum's stock extractors answer malformed input with plain-text bodies;
//! these wrap them so every failure comes back as `{ "error", "code" }`.

use axum::extract::FromRequest;
use axum::extract::FromRequestParts;

use crate::error::AppError;

/// JSON body extractor. Unknown keys and type mismatches become a
/// `VALIDATION_ERROR` on field `body`.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);

/// Query string extractor.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct AppQuery<T>(pub T);

/// Path parameter extractor.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct AppPath<T>(pub T);
