//! Page document model, editor content tree, and field validation.
//!
//! A page is serialized with its structured `fields` flattened into the top
//! level, so a stored page reads
//! `{ id, title, slug, status, isHomepage, meta: {...}, editorContent, ... }`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::CoreError;
use crate::field_path::{deep_merge, get_nested_value};
use crate::types::{DbId, Timestamp};

/// Structured field holding the homepage flag.
pub const HOMEPAGE_FIELD: &str = "isHomepage";

/// Maximum title length in characters.
pub const MAX_TITLE_LEN: usize = 200;

/// Maximum slug length in characters.
pub const MAX_SLUG_LEN: usize = 200;

/// Top-level keys owned by the document itself. They never live inside
/// `fields`, otherwise the flattened serialization would emit duplicates.
pub const RESERVED_KEYS: &[&str] = &[
    "id",
    "collection",
    "title",
    "slug",
    "status",
    "editorContent",
    "createdAt",
    "updatedAt",
];

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Draft/publish state of a page's working copy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageStatus {
    #[default]
    Draft,
    Published,
}

impl PageStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PageStatus::Draft => "draft",
            PageStatus::Published => "published",
        }
    }

    /// Parse the stored lowercase representation.
    pub fn parse(value: &str) -> Result<Self, CoreError> {
        match value {
            "draft" => Ok(PageStatus::Draft),
            "published" => Ok(PageStatus::Published),
            other => Err(CoreError::validation(
                "status",
                format!("Invalid status '{other}'. Must be one of: draft, published"),
            )),
        }
    }

    /// The status a write leaves behind for the given draft flag.
    pub fn for_draft(draft: bool) -> Self {
        if draft {
            PageStatus::Draft
        } else {
            PageStatus::Published
        }
    }
}

impl std::fmt::Display for PageStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Editor content
// ---------------------------------------------------------------------------

/// Root node of the editor tree; its props are page-level settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EditorRoot {
    #[serde(default)]
    pub props: Map<String, Value>,
}

/// A single block placed on the page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentItem {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub props: Map<String, Value>,
}

impl ContentItem {
    /// The block's `props.id`, when it is a string.
    pub fn id(&self) -> Option<&str> {
        self.props.get("id").and_then(Value::as_str)
    }
}

/// The visual editor's content tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EditorContent {
    #[serde(default)]
    pub root: EditorRoot,
    #[serde(default)]
    pub content: Vec<ContentItem>,
    #[serde(default)]
    pub zones: BTreeMap<String, Vec<ContentItem>>,
}

/// A block id that appears more than once in the same list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateBlockId {
    /// `None` for the main content list, otherwise the zone name.
    pub zone: Option<String>,
    pub id: String,
}

impl EditorContent {
    /// Block ids repeated within their containing list. Duplicates across
    /// different lists are allowed.
    pub fn duplicate_ids(&self) -> Vec<DuplicateBlockId> {
        let mut duplicates = duplicates_in(None, &self.content);
        for (zone, items) in &self.zones {
            duplicates.extend(duplicates_in(Some(zone), items));
        }
        duplicates
    }
}

fn duplicates_in(zone: Option<&String>, items: &[ContentItem]) -> Vec<DuplicateBlockId> {
    let mut seen = std::collections::HashSet::new();
    let mut reported = std::collections::HashSet::new();
    let mut duplicates = Vec::new();
    for id in items.iter().filter_map(ContentItem::id) {
        if !seen.insert(id) && reported.insert(id) {
            duplicates.push(DuplicateBlockId {
                zone: zone.cloned(),
                id: id.to_string(),
            });
        }
    }
    duplicates
}

// ---------------------------------------------------------------------------
// Documents
// ---------------------------------------------------------------------------

/// The versioned part of a page: everything except identity and timestamps.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageData {
    pub title: String,
    pub slug: String,
    #[serde(default)]
    pub status: PageStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub editor_content: Option<EditorContent>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl PageData {
    pub fn is_homepage(&self) -> bool {
        get_nested_value(&self.fields, HOMEPAGE_FIELD) == Some(&Value::Bool(true))
    }

    /// Apply a partial write: title/slug/editor content replace, fields
    /// deep-merge.
    pub fn apply(&mut self, write: PageWrite) {
        if let Some(title) = write.title {
            self.title = title;
        }
        if let Some(slug) = write.slug {
            self.slug = slug;
        }
        if let Some(editor_content) = write.editor_content {
            self.editor_content = Some(editor_content);
        }
        deep_merge(&mut self.fields, strip_reserved(write.fields));
    }
}

/// A stored page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageDocument {
    pub id: DbId,
    pub collection: String,
    #[serde(flatten)]
    pub data: PageData,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl PageDocument {
    pub fn to_ref(&self) -> PageRef {
        PageRef {
            id: self.id,
            title: self.data.title.clone(),
            slug: self.data.slug.clone(),
        }
    }

    pub fn status(&self) -> PageStatus {
        self.data.status
    }

    pub fn is_homepage(&self) -> bool {
        self.data.is_homepage()
    }
}

/// Identity of a page, as carried by conflict errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRef {
    pub id: DbId,
    pub title: String,
    pub slug: String,
}

/// Input for creating a page in a store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewPage {
    pub title: String,
    pub slug: String,
    pub fields: Map<String, Value>,
    pub editor_content: Option<EditorContent>,
}

impl NewPage {
    /// The working copy a store persists for this page.
    pub fn into_data(self, status: PageStatus) -> PageData {
        PageData {
            title: self.title,
            slug: self.slug,
            status,
            editor_content: self.editor_content,
            fields: strip_reserved(self.fields),
        }
    }
}

/// A partial update sent to a store. Absent members are left untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageWrite {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub fields: Map<String, Value>,
    pub editor_content: Option<EditorContent>,
}

impl PageWrite {
    /// A write that only touches structured fields.
    pub fn fields(fields: Map<String, Value>) -> Self {
        Self {
            fields,
            ..Self::default()
        }
    }

    /// Route a document-shaped patch: `title` and `slug` strings become
    /// top-level members, everything else stays a field patch.
    pub fn from_patch(mut patch: Map<String, Value>) -> Self {
        let title = take_string(&mut patch, "title");
        let slug = take_string(&mut patch, "slug");
        Self {
            title,
            slug,
            fields: strip_reserved(patch),
            editor_content: None,
        }
    }

    /// Whether applying this write leaves the homepage flag set.
    pub fn sets_homepage(&self) -> bool {
        get_nested_value(&self.fields, HOMEPAGE_FIELD) == Some(&Value::Bool(true))
    }
}

fn take_string(patch: &mut Map<String, Value>, key: &str) -> Option<String> {
    match patch.remove(key)? {
        Value::String(s) => Some(s),
        _ => None,
    }
}

fn strip_reserved(mut fields: Map<String, Value>) -> Map<String, Value> {
    fields.retain(|key, _| !RESERVED_KEYS.contains(&key.as_str()));
    fields
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validate a page title (non-blank, at most [`MAX_TITLE_LEN`] chars).
pub fn validate_title(title: &str) -> Result<(), CoreError> {
    if title.trim().is_empty() {
        return Err(CoreError::validation("title", "Title must not be empty"));
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(CoreError::validation(
            "title",
            format!("Title must be at most {MAX_TITLE_LEN} characters"),
        ));
    }
    Ok(())
}

/// Validate a page slug (non-empty, lowercase alphanumeric and hyphens).
pub fn validate_slug(slug: &str) -> Result<(), CoreError> {
    if slug.is_empty() {
        return Err(CoreError::validation("slug", "Slug must not be empty"));
    }
    if slug.len() > MAX_SLUG_LEN {
        return Err(CoreError::validation(
            "slug",
            format!("Slug must be at most {MAX_SLUG_LEN} characters"),
        ));
    }
    if !slug
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return Err(CoreError::validation(
            "slug",
            "Slug must contain only lowercase alphanumeric characters and hyphens",
        ));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
