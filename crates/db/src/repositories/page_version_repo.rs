//! Repository for the `page_versions` table.

use pagesync_core::types::DbId;
use serde_json::Value;
use sqlx::PgConnection;

use crate::models::page_version::PageVersionRow;

/// Column list for page_versions queries.
const COLUMNS: &str = "v.id, v.parent_id, v.versioned_fields, v.autosave, v.created_at";

/// Provides operations for page version snapshots.
pub struct PageVersionRepo;

impl PageVersionRepo {
    /// Record a snapshot of a page's working copy.
    pub async fn create(
        conn: &mut PgConnection,
        parent_id: DbId,
        versioned_fields: &Value,
        autosave: bool,
    ) -> Result<PageVersionRow, sqlx::Error> {
        sqlx::query_as::<_, PageVersionRow>(
            "INSERT INTO page_versions (parent_id, versioned_fields, autosave)
             VALUES ($1, $2, $3)
             RETURNING id, parent_id, versioned_fields, autosave, created_at",
        )
        .bind(parent_id)
        .bind(versioned_fields)
        .bind(autosave)
        .fetch_one(&mut *conn)
        .await
    }

    /// Find a version whose page belongs to `collection`.
    pub async fn find_by_id(
        conn: &mut PgConnection,
        collection: &str,
        id: DbId,
    ) -> Result<Option<PageVersionRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM page_versions v
             JOIN pages p ON p.id = v.parent_id
             WHERE v.id = $1 AND p.collection = $2"
        );
        sqlx::query_as::<_, PageVersionRow>(&query)
            .bind(id)
            .bind(collection)
            .fetch_optional(&mut *conn)
            .await
    }

    /// Count versions of a page within `collection`.
    pub async fn count_for_parent(
        conn: &mut PgConnection,
        collection: &str,
        parent_id: DbId,
    ) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM page_versions v
             JOIN pages p ON p.id = v.parent_id
             WHERE v.parent_id = $1 AND p.collection = $2",
        )
        .bind(parent_id)
        .bind(collection)
        .fetch_one(&mut *conn)
        .await?;
        Ok(count)
    }

    /// List versions of a page, newest or oldest first.
    pub async fn list_for_parent(
        conn: &mut PgConnection,
        collection: &str,
        parent_id: DbId,
        newest_first: bool,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<PageVersionRow>, sqlx::Error> {
        let direction = if newest_first { "DESC" } else { "ASC" };
        let query = format!(
            "SELECT {COLUMNS} FROM page_versions v
             JOIN pages p ON p.id = v.parent_id
             WHERE v.parent_id = $1 AND p.collection = $2
             ORDER BY v.created_at {direction}, v.id {direction}
             LIMIT $3 OFFSET $4"
        );
        sqlx::query_as::<_, PageVersionRow>(&query)
            .bind(parent_id)
            .bind(collection)
            .bind(limit)
            .bind(offset)
            .fetch_all(&mut *conn)
            .await
    }
}
