//! Typed request bodies and query parameters for page operations.
//!
//! Requests are deserialized strictly (unknown keys are rejected) and then
//! checked with [`validator`]. Validation failures are reported as a
//! field-scoped [`CoreError::Validation`].

use serde::Deserialize;
use serde_json::{Map, Value};
use validator::{Validate, ValidationError, ValidationErrors};

use crate::error::CoreError;
use crate::page::{self, EditorContent, PageStatus};
use crate::pagination::{clamp_limit, clamp_page, DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT};
use crate::store::{FieldRef, Sort, VersionOrder, Where};

fn title_rule(title: &str) -> Result<(), ValidationError> {
    page::validate_title(title).map_err(into_validation_error)
}

fn slug_rule(slug: &str) -> Result<(), ValidationError> {
    page::validate_slug(slug).map_err(into_validation_error)
}

fn into_validation_error(err: CoreError) -> ValidationError {
    let message = match err {
        CoreError::Validation { message, .. } => message,
        other => other.to_string(),
    };
    ValidationError::new("invalid").with_message(message.into())
}

/// Collapse `validator` output into a single field-scoped error. Fields are
/// reported in name order so the outcome is deterministic.
fn first_error(errors: ValidationErrors) -> CoreError {
    let field_errors = errors.field_errors();
    let mut fields: Vec<_> = field_errors.into_iter().collect();
    fields.sort_by(|a, b| a.0.cmp(&b.0));

    match fields.into_iter().next() {
        Some((field, errs)) => {
            let message = errs
                .first()
                .and_then(|err| err.message.as_ref().map(|m| m.to_string()))
                .unwrap_or_else(|| format!("Invalid value for '{field}'"));
            CoreError::validation(field.to_string(), message)
        }
        None => CoreError::validation("body", "Invalid request"),
    }
}

/// Fields shared by create and update bodies.
pub trait PageBody {
    fn explicit_fields(&self) -> Map<String, Value>;
    fn editor_content(&self) -> Option<&EditorContent>;
    fn swap_homepage(&self) -> bool;
}

/// Body of `POST /pages`.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreatePageRequest {
    #[validate(required(message = "Title is required"), custom(function = "title_rule"))]
    pub title: Option<String>,
    #[validate(required(message = "Slug is required"), custom(function = "slug_rule"))]
    pub slug: Option<String>,
    pub status: Option<PageStatus>,
    pub fields: Option<Map<String, Value>>,
    pub is_homepage: Option<bool>,
    pub editor_content: Option<EditorContent>,
    #[serde(default)]
    pub swap_homepage: bool,
}

impl CreatePageRequest {
    pub fn check(&self) -> Result<(), CoreError> {
        self.validate().map_err(first_error)
    }

    pub fn publishing(&self) -> bool {
        self.status == Some(PageStatus::Published)
    }
}

/// Body of `PATCH /pages/{id}`. Every member is optional.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdatePageRequest {
    #[validate(custom(function = "title_rule"))]
    pub title: Option<String>,
    #[validate(custom(function = "slug_rule"))]
    pub slug: Option<String>,
    pub status: Option<PageStatus>,
    pub fields: Option<Map<String, Value>>,
    pub is_homepage: Option<bool>,
    pub editor_content: Option<EditorContent>,
    #[serde(default)]
    pub swap_homepage: bool,
}

impl UpdatePageRequest {
    pub fn check(&self) -> Result<(), CoreError> {
        self.validate().map_err(first_error)
    }

    pub fn publishing(&self) -> bool {
        self.status == Some(PageStatus::Published)
    }
}

macro_rules! impl_page_body {
    ($ty:ty) => {
        impl PageBody for $ty {
            fn explicit_fields(&self) -> Map<String, Value> {
                let mut fields = self.fields.clone().unwrap_or_default();
                if let Some(is_homepage) = self.is_homepage {
                    fields.insert(page::HOMEPAGE_FIELD.to_string(), Value::Bool(is_homepage));
                }
                fields
            }

            fn editor_content(&self) -> Option<&EditorContent> {
                self.editor_content.as_ref()
            }

            fn swap_homepage(&self) -> bool {
                self.swap_homepage
            }
        }
    };
}

impl_page_body!(CreatePageRequest);
impl_page_body!(UpdatePageRequest);

/// Query string of `GET /pages`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListPagesQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub sort: Option<String>,
    pub status: Option<PageStatus>,
}

impl ListPagesQuery {
    pub fn page(&self) -> i64 {
        clamp_page(self.page)
    }

    pub fn limit(&self) -> i64 {
        clamp_limit(self.limit, DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT)
    }

    pub fn sort(&self) -> Result<Sort, CoreError> {
        self.sort.as_deref().map(Sort::parse).unwrap_or(Ok(Sort::default()))
    }

    pub fn filter(&self) -> Where {
        match self.status {
            Some(status) => Where::eq(FieldRef::Status, status.as_str()),
            None => Where::all(),
        }
    }
}

/// Query string of `GET /pages/{id}/versions`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListVersionsQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    /// `createdAt` or `-createdAt`; newest first when absent.
    pub sort: Option<String>,
}

impl ListVersionsQuery {
    pub fn order(&self) -> Result<VersionOrder, CoreError> {
        self.sort
            .as_deref()
            .map(VersionOrder::parse)
            .unwrap_or(Ok(VersionOrder::NewestFirst))
    }

    pub fn page(&self) -> i64 {
        clamp_page(self.page)
    }

    pub fn limit(&self) -> i64 {
        clamp_limit(self.limit, DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT)
    }
}

/// Query string of `GET /pages/{id}`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GetPageQuery {
    #[serde(default)]
    pub draft: bool,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
