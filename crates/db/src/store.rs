//! Postgres implementation of the core [`DocumentStore`] contract.
//!
//! Every write runs in one transaction: lock or insert the page row, release
//! any previous homepage holders named in the write context, write the
//! working copy (and the published copy when not a draft), then record a
//! version snapshot. A failure anywhere rolls the whole write back, releases
//! included.

use async_trait::async_trait;
use pagesync_core::page::{
    NewPage, PageData, PageDocument, PageStatus, PageWrite, HOMEPAGE_FIELD,
};
use pagesync_core::pagination::{page_offset, Paginated};
use pagesync_core::store::{
    DocumentStore, Sort, StoreError, VersionOrder, VersionSnapshot, Where, WriteContext,
};
use pagesync_core::types::DbId;
use serde_json::Value;
use sqlx::PgConnection;

use crate::models::page::{encode_data, PageColumns, PageRow};
use crate::query::PageCopy;
use crate::repositories::{PageRepo, PageVersionRepo};
use crate::DbPool;

/// Unique constraint on `(collection, slug)`.
const SLUG_CONSTRAINT: &str = "uq_pages_collection_slug";

/// Partial unique index allowing one homepage per collection.
const HOMEPAGE_CONSTRAINT: &str = "uq_pages_homepage";

/// Document store backed by the `pages` and `page_versions` tables.
#[derive(Debug, Clone)]
pub struct PgDocumentStore {
    pool: DbPool,
}

impl PgDocumentStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn find_copies(
        &self,
        collection: &str,
        filter: &Where,
        copy: PageCopy,
        page: i64,
        limit: i64,
        sort: Sort,
    ) -> Result<Paginated<PageDocument>, StoreError> {
        let mut conn = self.pool.acquire().await.map_err(backend)?;
        let total = PageRepo::count(&mut conn, collection, filter, copy)
            .await
            .map_err(backend)?;
        let rows = PageRepo::list(
            &mut conn,
            collection,
            filter,
            copy,
            sort,
            limit,
            page_offset(page, limit),
        )
        .await
        .map_err(backend)?;

        let docs = rows
            .into_iter()
            .map(|row| match copy {
                PageCopy::Working => row.into_working(),
                PageCopy::Published => row.into_published_or_working(),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Paginated::new(docs, total, page, limit))
    }
}

/// Map a sqlx error raised while writing a page with `slug`.
fn write_error(err: sqlx::Error, slug: &str) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.code().as_deref() == Some("23505") {
            match db_err.constraint() {
                Some(SLUG_CONSTRAINT) => {
                    return StoreError::UniqueViolation {
                        field: "slug".into(),
                        value: slug.to_string(),
                    }
                }
                Some(HOMEPAGE_CONSTRAINT) => {
                    return StoreError::UniqueViolation {
                        field: HOMEPAGE_FIELD.into(),
                        value: "true".into(),
                    }
                }
                _ => {}
            }
        }
    }
    backend(err)
}

fn backend(err: sqlx::Error) -> StoreError {
    StoreError::Backend(err.to_string())
}

fn page_not_found(id: DbId) -> StoreError {
    StoreError::NotFound { entity: "Page", id }
}

/// Write `data` as the working copy of a locked page row and snapshot it.
async fn commit(
    conn: &mut PgConnection,
    row: &PageRow,
    mut data: PageData,
    draft: bool,
) -> Result<PageDocument, StoreError> {
    data.status = PageStatus::for_draft(draft);
    let columns = PageColumns::from_data(&data)?;
    let encoded = encode_data(&data)?;
    let published = (!draft).then_some(&encoded);

    let updated = PageRepo::update(conn, row.id, &columns, published)
        .await
        .map_err(|e| write_error(e, &data.slug))?;
    PageVersionRepo::create(conn, row.id, &encoded, false)
        .await
        .map_err(backend)?;

    updated.into_working()
}

/// Take the homepage flag from every holder inside the caller's
/// transaction. Runs before the write that claims the flag so the partial
/// unique index never sees two holders.
///
/// A flagged working copy is committed with the flag off and its status
/// kept; the published copy is cleared in place so a pending draft stays
/// unpublished.
async fn release_homepage(
    conn: &mut PgConnection,
    collection: &str,
    holders: &[DbId],
) -> Result<(), StoreError> {
    for &id in holders {
        let row = PageRepo::find_by_id_for_update(conn, collection, id)
            .await
            .map_err(backend)?
            .ok_or_else(|| page_not_found(id))?;

        let mut data = row.working_data()?;
        if data.is_homepage() {
            data.fields.insert(HOMEPAGE_FIELD.to_string(), Value::Bool(false));
            let draft = data.status != PageStatus::Published;
            commit(conn, &row, data, draft).await?;
        }
        let published_cleared = PageRepo::clear_published_homepage(conn, id)
            .await
            .map_err(backend)?;

        tracing::debug!(
            page_id = id,
            collection,
            published_cleared,
            skip_homepage_guard = true,
            "Homepage flag released"
        );
    }
    Ok(())
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn find(
        &self,
        collection: &str,
        filter: &Where,
        page: i64,
        limit: i64,
        sort: Sort,
    ) -> Result<Paginated<PageDocument>, StoreError> {
        self.find_copies(collection, filter, PageCopy::Working, page, limit, sort)
            .await
    }

    async fn find_published(
        &self,
        collection: &str,
        filter: &Where,
        page: i64,
        limit: i64,
        sort: Sort,
    ) -> Result<Paginated<PageDocument>, StoreError> {
        self.find_copies(collection, filter, PageCopy::Published, page, limit, sort)
            .await
    }

    async fn find_by_id(
        &self,
        collection: &str,
        id: DbId,
        draft: bool,
    ) -> Result<Option<PageDocument>, StoreError> {
        let mut conn = self.pool.acquire().await.map_err(backend)?;
        let row = PageRepo::find_by_id(&mut conn, collection, id)
            .await
            .map_err(backend)?;
        row.map(|row| {
            if draft {
                row.into_working()
            } else {
                row.into_published_or_working()
            }
        })
        .transpose()
    }

    async fn create(
        &self,
        collection: &str,
        data: NewPage,
        draft: bool,
        context: WriteContext,
    ) -> Result<PageDocument, StoreError> {
        let data = data.into_data(PageStatus::for_draft(draft));
        let columns = PageColumns::from_data(&data)?;
        let encoded = encode_data(&data)?;
        let published = (!draft).then_some(&encoded);

        let mut tx = self.pool.begin().await.map_err(backend)?;
        release_homepage(&mut tx, collection, &context.release_homepage).await?;
        let row = PageRepo::create(&mut tx, collection, &columns, published)
            .await
            .map_err(|e| write_error(e, &data.slug))?;
        PageVersionRepo::create(&mut tx, row.id, &encoded, false)
            .await
            .map_err(backend)?;
        tx.commit().await.map_err(backend)?;

        tracing::debug!(
            page_id = row.id,
            collection,
            draft,
            released = context.release_homepage.len(),
            "Page row inserted"
        );
        row.into_working()
    }

    async fn update(
        &self,
        collection: &str,
        id: DbId,
        data: PageWrite,
        draft: bool,
        context: WriteContext,
    ) -> Result<PageDocument, StoreError> {
        let mut tx = self.pool.begin().await.map_err(backend)?;
        let row = PageRepo::find_by_id_for_update(&mut tx, collection, id)
            .await
            .map_err(backend)?
            .ok_or_else(|| page_not_found(id))?;

        let mut next = row.working_data()?;
        next.apply(data);
        release_homepage(&mut tx, collection, &context.release_homepage).await?;
        let page = commit(&mut tx, &row, next, draft).await?;
        tx.commit().await.map_err(backend)?;

        tracing::debug!(
            page_id = id,
            collection,
            draft,
            skip_homepage_guard = context.skip_homepage_guard,
            released = context.release_homepage.len(),
            "Page row updated"
        );
        Ok(page)
    }

    async fn delete(&self, collection: &str, id: DbId) -> Result<PageDocument, StoreError> {
        let mut conn = self.pool.acquire().await.map_err(backend)?;
        PageRepo::delete(&mut conn, collection, id)
            .await
            .map_err(backend)?
            .ok_or_else(|| page_not_found(id))?
            .into_working()
    }

    async fn find_versions(
        &self,
        collection: &str,
        parent_id: DbId,
        order: VersionOrder,
        page: i64,
        limit: i64,
    ) -> Result<Paginated<VersionSnapshot>, StoreError> {
        let mut conn = self.pool.acquire().await.map_err(backend)?;
        let total = PageVersionRepo::count_for_parent(&mut conn, collection, parent_id)
            .await
            .map_err(backend)?;
        let rows = PageVersionRepo::list_for_parent(
            &mut conn,
            collection,
            parent_id,
            order == VersionOrder::NewestFirst,
            limit,
            page_offset(page, limit),
        )
        .await
        .map_err(backend)?;

        let docs = rows
            .into_iter()
            .map(|row| row.into_snapshot())
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Paginated::new(docs, total, page, limit))
    }

    async fn find_version(
        &self,
        collection: &str,
        version_id: DbId,
    ) -> Result<Option<VersionSnapshot>, StoreError> {
        let mut conn = self.pool.acquire().await.map_err(backend)?;
        PageVersionRepo::find_by_id(&mut conn, collection, version_id)
            .await
            .map_err(backend)?
            .map(|row| row.into_snapshot())
            .transpose()
    }

    async fn restore_version(
        &self,
        collection: &str,
        version_id: DbId,
    ) -> Result<PageDocument, StoreError> {
        let mut tx = self.pool.begin().await.map_err(backend)?;
        let snapshot = PageVersionRepo::find_by_id(&mut tx, collection, version_id)
            .await
            .map_err(backend)?
            .ok_or(StoreError::NotFound {
                entity: "PageVersion",
                id: version_id,
            })?
            .into_snapshot()?;
        let row = PageRepo::find_by_id_for_update(&mut tx, collection, snapshot.parent_id)
            .await
            .map_err(backend)?
            .ok_or_else(|| page_not_found(snapshot.parent_id))?;

        let draft = snapshot.versioned_fields.status != PageStatus::Published;
        let page = commit(&mut tx, &row, snapshot.versioned_fields, draft).await?;
        tx.commit().await.map_err(backend)?;

        tracing::debug!(
            page_id = row.id,
            version_id,
            collection,
            "Page row restored from version"
        );
        Ok(page)
    }
}
