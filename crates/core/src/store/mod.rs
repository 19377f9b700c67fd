//! Document store contract consumed by the page lifecycle.
//!
//! The store owns persistence, draft/published copies, and version
//! snapshots. It does not decide the homepage invariant itself; callers go
//! through [`crate::homepage::HomepageGuard`] before any write that sets the
//! flag and pass the pages it must take the flag from in
//! [`WriteContext::release_homepage`]. The store clears them in the same
//! commit as the write.

pub mod memory;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Value};

use crate::error::CoreError;
use crate::field_path::get_nested_value;
use crate::page::{NewPage, PageData, PageDocument, PageWrite};
use crate::pagination::Paginated;
use crate::types::{DbId, Timestamp};

pub use memory::MemoryStore;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{entity} with id {id} not found")]
    NotFound { entity: &'static str, id: DbId },

    #[error("Duplicate value '{value}' for unique field '{field}'")]
    UniqueViolation { field: String, value: String },

    #[error("Store backend error: {0}")]
    Backend(String),
}

impl From<StoreError> for CoreError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { entity, id } => CoreError::NotFound { entity, id },
            StoreError::UniqueViolation { field, .. } if field == crate::page::HOMEPAGE_FIELD => {
                CoreError::Conflict {
                    field,
                    message: "Another page was marked as the homepage concurrently".into(),
                }
            }
            StoreError::UniqueViolation { field, value } => {
                CoreError::DuplicateField { field, value }
            }
            StoreError::Backend(msg) => {
                tracing::error!(error = %msg, "Document store error");
                CoreError::Internal(msg)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// A filterable member of a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldRef {
    Id,
    Title,
    Slug,
    Status,
    /// Dot path into the structured fields.
    Field(String),
}

impl FieldRef {
    fn value_of(&self, doc: &PageDocument) -> Option<Value> {
        match self {
            FieldRef::Id => Some(json!(doc.id)),
            FieldRef::Title => Some(json!(doc.data.title)),
            FieldRef::Slug => Some(json!(doc.data.slug)),
            FieldRef::Status => Some(json!(doc.data.status.as_str())),
            FieldRef::Field(path) => get_nested_value(&doc.data.fields, path).cloned(),
        }
    }
}

/// Filter tree for [`DocumentStore::find`].
#[derive(Debug, Clone, PartialEq)]
pub enum Where {
    Equals(FieldRef, Value),
    /// Also matches documents where the member is absent.
    NotEquals(FieldRef, Value),
    /// Matches when every clause matches; an empty list matches everything.
    And(Vec<Where>),
}

impl Where {
    pub fn all() -> Self {
        Where::And(Vec::new())
    }

    pub fn eq(field: FieldRef, value: impl Into<Value>) -> Self {
        Where::Equals(field, value.into())
    }

    pub fn ne(field: FieldRef, value: impl Into<Value>) -> Self {
        Where::NotEquals(field, value.into())
    }

    pub fn and(self, other: Where) -> Self {
        match self {
            Where::And(mut clauses) => {
                clauses.push(other);
                Where::And(clauses)
            }
            first => Where::And(vec![first, other]),
        }
    }

    /// Evaluate the filter against a document in memory.
    pub fn matches(&self, doc: &PageDocument) -> bool {
        match self {
            Where::Equals(field, value) => field.value_of(doc).as_ref() == Some(value),
            Where::NotEquals(field, value) => field.value_of(doc).as_ref() != Some(value),
            Where::And(clauses) => clauses.iter().all(|clause| clause.matches(doc)),
        }
    }
}

/// Sortable page members.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    CreatedAt,
    UpdatedAt,
    Title,
    Slug,
}

impl SortField {
    pub fn as_str(self) -> &'static str {
        match self {
            SortField::CreatedAt => "createdAt",
            SortField::UpdatedAt => "updatedAt",
            SortField::Title => "title",
            SortField::Slug => "slug",
        }
    }
}

/// Sort order for page listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sort {
    pub field: SortField,
    pub descending: bool,
}

impl Default for Sort {
    fn default() -> Self {
        Sort {
            field: SortField::UpdatedAt,
            descending: true,
        }
    }
}

impl Sort {
    /// Parse `field` or `-field` (descending).
    pub fn parse(raw: &str) -> Result<Self, CoreError> {
        let (descending, name) = match raw.strip_prefix('-') {
            Some(name) => (true, name),
            None => (false, raw),
        };
        let field = match name {
            "createdAt" => SortField::CreatedAt,
            "updatedAt" => SortField::UpdatedAt,
            "title" => SortField::Title,
            "slug" => SortField::Slug,
            other => {
                return Err(CoreError::validation(
                    "sort",
                    format!(
                        "Invalid sort field '{other}'. \
                         Must be one of: createdAt, updatedAt, title, slug"
                    ),
                ))
            }
        };
        Ok(Sort { field, descending })
    }
}

/// Order for version listings, by creation time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum VersionOrder {
    #[default]
    NewestFirst,
    OldestFirst,
}

impl VersionOrder {
    /// Parse `createdAt` (oldest first) or `-createdAt` (newest first).
    pub fn parse(raw: &str) -> Result<Self, CoreError> {
        match raw {
            "-createdAt" => Ok(VersionOrder::NewestFirst),
            "createdAt" => Ok(VersionOrder::OldestFirst),
            other => Err(CoreError::validation(
                "sort",
                format!("Invalid version sort '{other}'. Must be createdAt or -createdAt"),
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// Writes and versions
// ---------------------------------------------------------------------------

/// Per-write context passed through to the store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteContext {
    /// A tag on the writes that clear a previous homepage holder. No store
    /// re-runs the guard, so nothing is skipped by it; it marks those writes
    /// for store-side hooks and logs.
    pub skip_homepage_guard: bool,
    /// Pages to take the homepage flag from, on both their working and
    /// published copies, in the same commit as this write. A pending draft
    /// on such a page stays unpublished.
    pub release_homepage: Vec<DbId>,
}

impl WriteContext {
    pub fn guarded() -> Self {
        Self::default()
    }

    pub fn skip_homepage_guard() -> Self {
        Self {
            skip_homepage_guard: true,
            ..Self::default()
        }
    }

    /// A write that becomes the homepage in place of `holders`.
    pub fn releasing(holders: Vec<DbId>) -> Self {
        Self {
            release_homepage: holders,
            ..Self::default()
        }
    }
}

/// An immutable snapshot of a page's working copy.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionSnapshot {
    pub id: DbId,
    pub parent_id: DbId,
    pub versioned_fields: PageData,
    pub created_at: Timestamp,
    pub autosave: bool,
}

// ---------------------------------------------------------------------------
// Contract
// ---------------------------------------------------------------------------

/// Persistence operations the page lifecycle relies on.
///
/// Every successful `create`, `update` and `restore_version` records a
/// [`VersionSnapshot`] of the resulting working copy. A write with
/// `draft = true` leaves the working copy in `Draft` and does not touch the
/// published copy; `draft = false` marks it `Published` and copies it over
/// the published copy.
///
/// `create` and `update` honour [`WriteContext::release_homepage`]: either
/// the release and the write both commit, or neither does.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// List working copies matching `filter`.
    async fn find(
        &self,
        collection: &str,
        filter: &Where,
        page: i64,
        limit: i64,
        sort: Sort,
    ) -> Result<Paginated<PageDocument>, StoreError>;

    /// List published copies matching `filter`. Never-published pages are
    /// not included.
    async fn find_published(
        &self,
        collection: &str,
        filter: &Where,
        page: i64,
        limit: i64,
        sort: Sort,
    ) -> Result<Paginated<PageDocument>, StoreError>;

    /// Fetch the working copy (`draft = true`) or the published copy,
    /// falling back to the working copy for never-published pages.
    async fn find_by_id(
        &self,
        collection: &str,
        id: DbId,
        draft: bool,
    ) -> Result<Option<PageDocument>, StoreError>;

    async fn create(
        &self,
        collection: &str,
        data: NewPage,
        draft: bool,
        context: WriteContext,
    ) -> Result<PageDocument, StoreError>;

    async fn update(
        &self,
        collection: &str,
        id: DbId,
        data: PageWrite,
        draft: bool,
        context: WriteContext,
    ) -> Result<PageDocument, StoreError>;

    /// Delete a page and its snapshots, returning the deleted working copy.
    async fn delete(&self, collection: &str, id: DbId) -> Result<PageDocument, StoreError>;

    async fn find_versions(
        &self,
        collection: &str,
        parent_id: DbId,
        order: VersionOrder,
        page: i64,
        limit: i64,
    ) -> Result<Paginated<VersionSnapshot>, StoreError>;

    async fn find_version(
        &self,
        collection: &str,
        version_id: DbId,
    ) -> Result<Option<VersionSnapshot>, StoreError>;

    /// Replace the parent's working copy with the snapshot's fields. A
    /// published snapshot also becomes the published copy.
    async fn restore_version(
        &self,
        collection: &str,
        version_id: DbId,
    ) -> Result<PageDocument, StoreError>;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
