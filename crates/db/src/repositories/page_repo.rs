//! Repository for the `pages` table.

use pagesync_core::store::{Sort, Where};
use pagesync_core::types::DbId;
use serde_json::Value;
use sqlx::{PgConnection, Postgres, QueryBuilder};

use crate::models::page::{PageColumns, PageRow};
use crate::query::{push_order_by, push_where, PageCopy};

/// Column list for pages queries.
const COLUMNS: &str = "id, collection, title, slug, status, fields, editor_content, \
    published_data, published_at, created_at, updated_at";

/// Provides CRUD operations for pages.
pub struct PageRepo;

impl PageRepo {
    /// Insert a page. `published` is the published copy when the page is
    /// created published.
    pub async fn create(
        conn: &mut PgConnection,
        collection: &str,
        columns: &PageColumns,
        published: Option<&Value>,
    ) -> Result<PageRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO pages
                (collection, title, slug, status, fields, editor_content,
                 published_data, published_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7,
                     CASE WHEN $7::jsonb IS NULL THEN NULL ELSE NOW() END)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, PageRow>(&query)
            .bind(collection)
            .bind(&columns.title)
            .bind(&columns.slug)
            .bind(columns.status)
            .bind(&columns.fields)
            .bind(&columns.editor_content)
            .bind(published)
            .fetch_one(&mut *conn)
            .await
    }

    /// Find a page by ID within a collection.
    pub async fn find_by_id(
        conn: &mut PgConnection,
        collection: &str,
        id: DbId,
    ) -> Result<Option<PageRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM pages WHERE id = $1 AND collection = $2");
        sqlx::query_as::<_, PageRow>(&query)
            .bind(id)
            .bind(collection)
            .fetch_optional(&mut *conn)
            .await
    }

    /// Find a page by ID and lock the row until the transaction ends.
    pub async fn find_by_id_for_update(
        conn: &mut PgConnection,
        collection: &str,
        id: DbId,
    ) -> Result<Option<PageRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM pages WHERE id = $1 AND collection = $2 FOR UPDATE"
        );
        sqlx::query_as::<_, PageRow>(&query)
            .bind(id)
            .bind(collection)
            .fetch_optional(&mut *conn)
            .await
    }

    /// Count pages in a collection whose `copy` matches `filter`.
    pub async fn count(
        conn: &mut PgConnection,
        collection: &str,
        filter: &Where,
        copy: PageCopy,
    ) -> Result<i64, sqlx::Error> {
        let mut builder =
            QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM pages WHERE collection = ");
        builder.push_bind(collection.to_string());
        push_copy_filter(&mut builder, filter, copy);

        let (count,): (i64,) = builder.build_query_as().fetch_one(&mut *conn).await?;
        Ok(count)
    }

    /// List pages in a collection whose `copy` matches `filter`, sorted and
    /// paged.
    pub async fn list(
        conn: &mut PgConnection,
        collection: &str,
        filter: &Where,
        copy: PageCopy,
        sort: Sort,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<PageRow>, sqlx::Error> {
        let mut builder = QueryBuilder::<Postgres>::new(format!(
            "SELECT {COLUMNS} FROM pages WHERE collection = "
        ));
        builder.push_bind(collection.to_string());
        push_copy_filter(&mut builder, filter, copy);
        push_order_by(&mut builder, sort, copy);
        builder.push(" LIMIT ");
        builder.push_bind(limit);
        builder.push(" OFFSET ");
        builder.push_bind(offset);

        builder.build_query_as::<PageRow>().fetch_all(&mut *conn).await
    }

    /// Overwrite the working copy. A `published` value also replaces the
    /// published copy; `None` leaves it as it was.
    pub async fn update(
        conn: &mut PgConnection,
        id: DbId,
        columns: &PageColumns,
        published: Option<&Value>,
    ) -> Result<PageRow, sqlx::Error> {
        let query = format!(
            "UPDATE pages SET
                title = $1,
                slug = $2,
                status = $3,
                fields = $4,
                editor_content = $5,
                published_data = COALESCE($6, published_data),
                published_at = CASE WHEN $6::jsonb IS NULL THEN published_at ELSE NOW() END,
                updated_at = NOW()
             WHERE id = $7
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, PageRow>(&query)
            .bind(&columns.title)
            .bind(&columns.slug)
            .bind(columns.status)
            .bind(&columns.fields)
            .bind(&columns.editor_content)
            .bind(published)
            .bind(id)
            .fetch_one(&mut *conn)
            .await
    }

    /// Set `isHomepage` to false on the published copy, leaving the working
    /// copy and `published_at` alone. Returns whether a flag was cleared.
    pub async fn clear_published_homepage(
        conn: &mut PgConnection,
        id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE pages
             SET published_data = jsonb_set(published_data, '{isHomepage}', 'false'::jsonb)
             WHERE id = $1 AND published_data -> 'isHomepage' = 'true'::jsonb",
        )
        .bind(id)
        .execute(&mut *conn)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete a page. Its versions go with it (`ON DELETE CASCADE`).
    pub async fn delete(
        conn: &mut PgConnection,
        collection: &str,
        id: DbId,
    ) -> Result<Option<PageRow>, sqlx::Error> {
        let query =
            format!("DELETE FROM pages WHERE id = $1 AND collection = $2 RETURNING {COLUMNS}");
        sqlx::query_as::<_, PageRow>(&query)
            .bind(id)
            .bind(collection)
            .fetch_optional(&mut *conn)
            .await
    }
}

fn push_copy_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: &Where, copy: PageCopy) {
    if copy == PageCopy::Published {
        builder.push(" AND published_data IS NOT NULL");
    }
    builder.push(" AND ");
    push_where(builder, filter, copy);
}
