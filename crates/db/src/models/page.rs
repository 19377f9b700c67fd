//! Page row model.

use pagesync_core::page::{EditorContent, PageData, PageDocument, PageStatus};
use pagesync_core::store::StoreError;
use pagesync_core::types::{DbId, Timestamp};
use serde_json::{Map, Value};
use sqlx::FromRow;

/// A row from the `pages` table.
#[derive(Debug, Clone, FromRow)]
pub struct PageRow {
    pub id: DbId,
    pub collection: String,
    pub title: String,
    pub slug: String,
    pub status: String,
    pub fields: Value,
    pub editor_content: Option<Value>,
    pub published_data: Option<Value>,
    pub published_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Column values for writing a working copy.
#[derive(Debug, Clone)]
pub struct PageColumns {
    pub title: String,
    pub slug: String,
    pub status: &'static str,
    pub fields: Value,
    pub editor_content: Option<Value>,
}

impl PageColumns {
    pub fn from_data(data: &PageData) -> Result<Self, StoreError> {
        let editor_content = data
            .editor_content
            .as_ref()
            .map(serde_json::to_value)
            .transpose()
            .map_err(|e| StoreError::Backend(format!("Failed to encode editor content: {e}")))?;
        Ok(Self {
            title: data.title.clone(),
            slug: data.slug.clone(),
            status: data.status.as_str(),
            fields: Value::Object(data.fields.clone()),
            editor_content,
        })
    }
}

impl PageRow {
    /// The working copy.
    pub fn working_data(&self) -> Result<PageData, StoreError> {
        let editor_content = self
            .editor_content
            .clone()
            .map(serde_json::from_value::<EditorContent>)
            .transpose()
            .map_err(|e| corrupt(self.id, "editor_content", e))?;
        let fields = match &self.fields {
            Value::Object(map) => map.clone(),
            Value::Null => Map::new(),
            other => {
                return Err(StoreError::Backend(format!(
                    "Page {} has non-object fields: {other}",
                    self.id
                )))
            }
        };
        Ok(PageData {
            title: self.title.clone(),
            slug: self.slug.clone(),
            status: PageStatus::parse(&self.status)
                .map_err(|e| StoreError::Backend(format!("Page {}: {e}", self.id)))?,
            editor_content,
            fields,
        })
    }

    pub fn into_working(self) -> Result<PageDocument, StoreError> {
        let data = self.working_data()?;
        Ok(PageDocument {
            id: self.id,
            collection: self.collection,
            data,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }

    /// The published copy, or the working copy when the page was never
    /// published.
    pub fn into_published_or_working(self) -> Result<PageDocument, StoreError> {
        let Some(published) = self.published_data.clone() else {
            return self.into_working();
        };
        let data: PageData =
            serde_json::from_value(published).map_err(|e| corrupt(self.id, "published_data", e))?;
        Ok(PageDocument {
            id: self.id,
            collection: self.collection,
            data,
            created_at: self.created_at,
            updated_at: self.published_at.unwrap_or(self.updated_at),
        })
    }
}

/// Serialize a full page snapshot (working or published copy) as stored in
/// JSONB columns.
pub fn encode_data(data: &PageData) -> Result<Value, StoreError> {
    serde_json::to_value(data)
        .map_err(|e| StoreError::Backend(format!("Failed to encode page data: {e}")))
}

pub(crate) fn corrupt(id: DbId, column: &str, err: serde_json::Error) -> StoreError {
    StoreError::Backend(format!("Row {id} has malformed {column}: {err}"))
}
