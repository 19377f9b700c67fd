//! Page version row model.

use pagesync_core::page::PageData;
use pagesync_core::store::{StoreError, VersionSnapshot};
use pagesync_core::types::{DbId, Timestamp};
use serde_json::Value;
use sqlx::FromRow;

use super::page::corrupt;

/// A row from the `page_versions` table.
#[derive(Debug, Clone, FromRow)]
pub struct PageVersionRow {
    pub id: DbId,
    pub parent_id: DbId,
    pub versioned_fields: Value,
    pub autosave: bool,
    pub created_at: Timestamp,
}

impl PageVersionRow {
    pub fn into_snapshot(self) -> Result<VersionSnapshot, StoreError> {
        let versioned_fields: PageData = serde_json::from_value(self.versioned_fields)
            .map_err(|e| corrupt(self.id, "versioned_fields", e))?;
        Ok(VersionSnapshot {
            id: self.id,
            parent_id: self.parent_id,
            versioned_fields,
            created_at: self.created_at,
            autosave: self.autosave,
        })
    }
}
