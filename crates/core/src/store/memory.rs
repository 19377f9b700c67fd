//! In-process [`DocumentStore`] used by tests and local tooling.
//!
//! Slug uniqueness is enforced per collection. Homepage releases named in a
//! [`WriteContext`] are applied under the same lock as the write they ride
//! on. The guard's read is not, so two concurrent swaps can still both see
//! a vacant homepage.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use tokio::sync::RwLock;

use super::{
    DocumentStore, Sort, SortField, StoreError, VersionOrder, VersionSnapshot, Where, WriteContext,
};
use crate::page::{NewPage, PageData, PageDocument, PageStatus, PageWrite, HOMEPAGE_FIELD};
use crate::pagination::Paginated;
use crate::types::DbId;

/// A write observed by the store, kept for inspection in tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedWrite {
    pub id: DbId,
    pub draft: bool,
    pub context: WriteContext,
}

#[derive(Debug, Clone)]
struct StoredPage {
    working: PageDocument,
    published: Option<PageDocument>,
}

#[derive(Debug, Default)]
struct State {
    next_page_id: DbId,
    next_version_id: DbId,
    pages: BTreeMap<DbId, StoredPage>,
    versions: Vec<VersionSnapshot>,
    writes: Vec<RecordedWrite>,
}

impl State {
    fn page_mut(&mut self, collection: &str, id: DbId) -> Result<&mut StoredPage, StoreError> {
        self.pages
            .get_mut(&id)
            .filter(|page| page.working.collection == collection)
            .ok_or(StoreError::NotFound { entity: "Page", id })
    }

    fn ensure_unique_slug(
        &self,
        collection: &str,
        slug: &str,
        except: Option<DbId>,
    ) -> Result<(), StoreError> {
        let taken = self.pages.values().any(|page| {
            page.working.collection == collection
                && page.working.data.slug == slug
                && Some(page.working.id) != except
        });
        if taken {
            return Err(StoreError::UniqueViolation {
                field: "slug".into(),
                value: slug.to_string(),
            });
        }
        Ok(())
    }

    fn snapshot(&mut self, parent_id: DbId, data: &PageData) {
        self.next_version_id += 1;
        self.versions.push(VersionSnapshot {
            id: self.next_version_id,
            parent_id,
            versioned_fields: data.clone(),
            created_at: Utc::now(),
            autosave: false,
        });
    }

    /// Commit `data` as the working copy of `id`, publishing it when
    /// `draft` is false, and snapshot the result.
    fn commit(
        &mut self,
        collection: &str,
        id: DbId,
        mut data: PageData,
        draft: bool,
    ) -> Result<PageDocument, StoreError> {
        data.status = PageStatus::for_draft(draft);
        let page = self.page_mut(collection, id)?;
        page.working.data = data;
        page.working.updated_at = Utc::now();
        if !draft {
            page.published = Some(page.working.clone());
        }
        let working = page.working.clone();
        self.snapshot(id, &working.data);
        Ok(working)
    }

    /// Take the homepage flag from every holder. All holders are looked up
    /// before the first change.
    ///
    /// A flagged working copy is committed with the flag off and its status
    /// kept. A flagged published copy is cleared in place, so a pending
    /// draft is never published by a release.
    fn release_homepage(&mut self, collection: &str, holders: &[DbId]) -> Result<(), StoreError> {
        for &id in holders {
            self.page_mut(collection, id)?;
        }
        for &id in holders {
            let page = self.page_mut(collection, id)?;
            if let Some(published) = page.published.as_mut().filter(|doc| doc.is_homepage()) {
                published
                    .data
                    .fields
                    .insert(HOMEPAGE_FIELD.to_string(), Value::Bool(false));
            }
            if !page.working.is_homepage() {
                continue;
            }
            let mut next = page.working.data.clone();
            next.fields.insert(HOMEPAGE_FIELD.to_string(), Value::Bool(false));
            let draft = next.status != PageStatus::Published;
            self.writes.push(RecordedWrite {
                id,
                draft,
                context: WriteContext::skip_homepage_guard(),
            });
            self.commit(collection, id, next, draft)?;
        }
        Ok(())
    }
}

/// Thread-safe in-memory document store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every update issued so far, in order, releases included.
    pub async fn recorded_writes(&self) -> Vec<RecordedWrite> {
        self.state.read().await.writes.clone()
    }
}

fn select<'a>(
    docs: impl Iterator<Item = &'a PageDocument>,
    collection: &str,
    filter: &Where,
    page: i64,
    limit: i64,
    sort: Sort,
) -> Paginated<PageDocument> {
    let mut matches: Vec<PageDocument> = docs
        .filter(|doc| doc.collection == collection && filter.matches(doc))
        .cloned()
        .collect();
    matches.sort_by(|a, b| compare(a, b, sort));
    Paginated::from_all(matches, page, limit)
}

fn compare(a: &PageDocument, b: &PageDocument, sort: Sort) -> Ordering {
    let ordering = match sort.field {
        SortField::CreatedAt => a.created_at.cmp(&b.created_at),
        SortField::UpdatedAt => a.updated_at.cmp(&b.updated_at),
        SortField::Title => a.data.title.cmp(&b.data.title),
        SortField::Slug => a.data.slug.cmp(&b.data.slug),
    }
    .then(a.id.cmp(&b.id));
    if sort.descending {
        ordering.reverse()
    } else {
        ordering
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn find(
        &self,
        collection: &str,
        filter: &Where,
        page: i64,
        limit: i64,
        sort: Sort,
    ) -> Result<Paginated<PageDocument>, StoreError> {
        let state = self.state.read().await;
        let working = state.pages.values().map(|stored| &stored.working);
        Ok(select(working, collection, filter, page, limit, sort))
    }

    async fn find_published(
        &self,
        collection: &str,
        filter: &Where,
        page: i64,
        limit: i64,
        sort: Sort,
    ) -> Result<Paginated<PageDocument>, StoreError> {
        let state = self.state.read().await;
        let published = state.pages.values().filter_map(|stored| stored.published.as_ref());
        Ok(select(published, collection, filter, page, limit, sort))
    }

    async fn find_by_id(
        &self,
        collection: &str,
        id: DbId,
        draft: bool,
    ) -> Result<Option<PageDocument>, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .pages
            .get(&id)
            .filter(|page| page.working.collection == collection)
            .map(|page| match (&page.published, draft) {
                (Some(published), false) => published.clone(),
                _ => page.working.clone(),
            }))
    }

    async fn create(
        &self,
        collection: &str,
        data: NewPage,
        draft: bool,
        context: WriteContext,
    ) -> Result<PageDocument, StoreError> {
        let mut state = self.state.write().await;
        state.ensure_unique_slug(collection, &data.slug, None)?;
        state.release_homepage(collection, &context.release_homepage)?;

        state.next_page_id += 1;
        let id = state.next_page_id;
        let now = Utc::now();
        let working = PageDocument {
            id,
            collection: collection.to_string(),
            data: data.into_data(PageStatus::for_draft(draft)),
            created_at: now,
            updated_at: now,
        };
        let published = (!draft).then(|| working.clone());
        state.snapshot(id, &working.data);
        state.pages.insert(
            id,
            StoredPage {
                working: working.clone(),
                published,
            },
        );
        Ok(working)
    }

    async fn update(
        &self,
        collection: &str,
        id: DbId,
        data: PageWrite,
        draft: bool,
        context: WriteContext,
    ) -> Result<PageDocument, StoreError> {
        let mut state = self.state.write().await;
        let mut next = state.page_mut(collection, id)?.working.data.clone();
        next.apply(data);
        state.ensure_unique_slug(collection, &next.slug, Some(id))?;
        state.release_homepage(collection, &context.release_homepage)?;
        state.writes.push(RecordedWrite { id, draft, context });
        state.commit(collection, id, next, draft)
    }

    async fn delete(&self, collection: &str, id: DbId) -> Result<PageDocument, StoreError> {
        let mut state = self.state.write().await;
        state.page_mut(collection, id)?;
        let removed = state
            .pages
            .remove(&id)
            .ok_or(StoreError::NotFound { entity: "Page", id })?;
        state.versions.retain(|version| version.parent_id != id);
        Ok(removed.working)
    }

    async fn find_versions(
        &self,
        collection: &str,
        parent_id: DbId,
        order: VersionOrder,
        page: i64,
        limit: i64,
    ) -> Result<Paginated<VersionSnapshot>, StoreError> {
        let state = self.state.read().await;
        let in_collection = state
            .pages
            .get(&parent_id)
            .is_some_and(|stored| stored.working.collection == collection);
        let mut versions: Vec<VersionSnapshot> = if in_collection {
            state
                .versions
                .iter()
                .filter(|version| version.parent_id == parent_id)
                .cloned()
                .collect()
        } else {
            Vec::new()
        };
        versions.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        if order == VersionOrder::NewestFirst {
            versions.reverse();
        }
        Ok(Paginated::from_all(versions, page, limit))
    }

    async fn find_version(
        &self,
        collection: &str,
        version_id: DbId,
    ) -> Result<Option<VersionSnapshot>, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .versions
            .iter()
            .find(|version| version.id == version_id)
            .filter(|version| {
                state
                    .pages
                    .get(&version.parent_id)
                    .is_some_and(|stored| stored.working.collection == collection)
            })
            .cloned())
    }

    async fn restore_version(
        &self,
        collection: &str,
        version_id: DbId,
    ) -> Result<PageDocument, StoreError> {
        let mut state = self.state.write().await;
        let snapshot = state
            .versions
            .iter()
            .find(|version| version.id == version_id)
            .cloned()
            .ok_or(StoreError::NotFound {
                entity: "PageVersion",
                id: version_id,
            })?;
        let parent_id = snapshot.parent_id;
        state.page_mut(collection, parent_id)?;
        state.ensure_unique_slug(collection, &snapshot.versioned_fields.slug, Some(parent_id))?;
        let draft = snapshot.versioned_fields.status != PageStatus::Published;
        state.commit(collection, parent_id, snapshot.versioned_fields, draft)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use serde_json::{json, Map, Value};

    use super::*;
    use crate::store::FieldRef;

    fn new_page(title: &str, slug: &str) -> NewPage {
        NewPage {
            title: title.into(),
            slug: slug.into(),
            ..NewPage::default()
        }
    }

    fn fields(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    async fn create(
        store: &MemoryStore,
        collection: &str,
        page: NewPage,
        draft: bool,
    ) -> Result<PageDocument, StoreError> {
        store.create(collection, page, draft, WriteContext::guarded()).await
    }

    fn homepage(title: &str, slug: &str) -> NewPage {
        NewPage {
            fields: fields(json!({"isHomepage": true})),
            ..new_page(title, slug)
        }
    }

    fn title(title: &str) -> PageWrite {
        PageWrite {
            title: Some(title.into()),
            ..PageWrite::default()
        }
    }

    #[tokio::test]
    async fn create_defaults_to_draft_and_snapshots() {
        let store = MemoryStore::new();
        let page = create(&store, "pages", new_page("Home", "home"), true).await.unwrap();

        assert_eq!(page.status(), PageStatus::Draft);
        let versions = store
            .find_versions("pages", page.id, VersionOrder::NewestFirst, 1, 10)
            .await
            .unwrap();
        assert_eq!(versions.total_docs, 1);
        assert_eq!(versions.docs[0].versioned_fields, page.data);
    }

    #[tokio::test]
    async fn duplicate_slug_is_rejected_per_collection() {
        let store = MemoryStore::new();
        create(&store, "pages", new_page("A", "same"), true).await.unwrap();

        let err = create(&store, "pages", new_page("B", "same"), true).await.unwrap_err();
        assert_matches!(err, StoreError::UniqueViolation { ref field, .. } if field == "slug");

        assert!(create(&store, "posts", new_page("C", "same"), true).await.is_ok());
    }

    #[tokio::test]
    async fn draft_write_keeps_published_copy() {
        let store = MemoryStore::new();
        let page = create(&store, "pages", new_page("Live", "live"), false).await.unwrap();

        store
            .update(
                "pages",
                page.id,
                PageWrite {
                    title: Some("Work in progress".into()),
                    ..PageWrite::default()
                },
                true,
                WriteContext::guarded(),
            )
            .await
            .unwrap();

        let working = store.find_by_id("pages", page.id, true).await.unwrap().unwrap();
        let published = store.find_by_id("pages", page.id, false).await.unwrap().unwrap();
        assert_eq!(working.data.title, "Work in progress");
        assert_eq!(working.status(), PageStatus::Draft);
        assert_eq!(published.data.title, "Live");
        assert_eq!(published.status(), PageStatus::Published);
    }

    #[tokio::test]
    async fn never_published_page_falls_back_to_working_copy() {
        let store = MemoryStore::new();
        let page = create(&store, "pages", new_page("Draft", "draft"), true).await.unwrap();
        let fetched = store.find_by_id("pages", page.id, false).await.unwrap().unwrap();
        assert_eq!(fetched, page);
    }

    #[tokio::test]
    async fn find_filters_sorts_and_paginates() {
        let store = MemoryStore::new();
        for slug in ["c", "a", "b"] {
            create(&store, "pages", new_page(slug, slug), true).await.unwrap();
        }
        let a = store
            .find("pages", &Where::eq(FieldRef::Slug, "a"), 1, 10, Sort::default())
            .await
            .unwrap();
        store
            .update(
                "pages",
                a.docs[0].id,
                PageWrite::fields(fields(json!({"isHomepage": true}))),
                true,
                WriteContext::guarded(),
            )
            .await
            .unwrap();

        let sorted = store
            .find("pages", &Where::all(), 1, 2, Sort::parse("slug").unwrap())
            .await
            .unwrap();
        let slugs: Vec<_> = sorted.docs.iter().map(|d| d.data.slug.as_str()).collect();
        assert_eq!(slugs, vec!["a", "b"]);
        assert_eq!(sorted.total_docs, 3);
        assert!(sorted.has_next_page);

        let homepages = store
            .find(
                "pages",
                &Where::eq(FieldRef::Field("isHomepage".into()), true),
                1,
                10,
                Sort::default(),
            )
            .await
            .unwrap();
        assert_eq!(homepages.total_docs, 1);
        assert_eq!(homepages.docs[0].data.slug, "a");
    }

    #[tokio::test]
    async fn update_records_context() {
        let store = MemoryStore::new();
        let page = create(&store, "pages", new_page("A", "a"), true).await.unwrap();
        store
            .update(
                "pages",
                page.id,
                PageWrite::default(),
                true,
                WriteContext::skip_homepage_guard(),
            )
            .await
            .unwrap();

        assert_eq!(
            store.recorded_writes().await,
            vec![RecordedWrite {
                id: page.id,
                draft: true,
                context: WriteContext::skip_homepage_guard(),
            }]
        );
    }

    #[tokio::test]
    async fn restore_replaces_working_copy_and_keeps_history() {
        let store = MemoryStore::new();
        let page = create(&store, "pages", new_page("First", "first"), true).await.unwrap();
        let first_version = store
            .find_versions("pages", page.id, VersionOrder::NewestFirst, 1, 10)
            .await
            .unwrap()
            .docs[0]
            .clone();

        store
            .update(
                "pages",
                page.id,
                PageWrite {
                    title: Some("Second".into()),
                    fields: fields(json!({"meta": {"title": "x"}})),
                    ..PageWrite::default()
                },
                true,
                WriteContext::guarded(),
            )
            .await
            .unwrap();

        let restored = store.restore_version("pages", first_version.id).await.unwrap();
        assert_eq!(restored.data, first_version.versioned_fields);

        let history = store
            .find_versions("pages", page.id, VersionOrder::NewestFirst, 1, 10)
            .await
            .unwrap();
        assert_eq!(history.total_docs, 3);
        assert_eq!(history.docs[0].versioned_fields.title, "First");
    }

    #[tokio::test]
    async fn delete_removes_page_and_versions() {
        let store = MemoryStore::new();
        let page = create(&store, "pages", new_page("Gone", "gone"), true).await.unwrap();
        let version_id = store
            .find_versions("pages", page.id, VersionOrder::NewestFirst, 1, 1)
            .await
            .unwrap()
            .docs[0]
            .id;

        store.delete("pages", page.id).await.unwrap();

        assert!(store.find_by_id("pages", page.id, true).await.unwrap().is_none());
        assert!(store.find_version("pages", version_id).await.unwrap().is_none());
        assert_matches!(
            store.delete("pages", page.id).await,
            Err(StoreError::NotFound { entity: "Page", .. })
        );
    }

    #[tokio::test]
    async fn other_collection_is_invisible() {
        let store = MemoryStore::new();
        let page = create(&store, "pages", new_page("A", "a"), true).await.unwrap();
        assert!(store.find_by_id("posts", page.id, true).await.unwrap().is_none());
        assert_matches!(
            store
                .update("posts", page.id, PageWrite::default(), true, WriteContext::guarded())
                .await,
            Err(StoreError::NotFound { .. })
        );
    }

    // -----------------------------------------------------------------------
    // Homepage release
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn find_published_skips_never_published_pages() {
        let store = MemoryStore::new();
        create(&store, "pages", homepage("Live", "live"), false).await.unwrap();
        create(&store, "pages", homepage("Draft", "draft"), true).await.unwrap();

        let published = store
            .find_published("pages", &Where::all(), 1, 10, Sort::default())
            .await
            .unwrap();
        assert_eq!(published.total_docs, 1);
        assert_eq!(published.docs[0].data.slug, "live");
    }

    #[tokio::test]
    async fn release_clears_both_copies_without_publishing_draft() {
        let store = MemoryStore::new();
        let about = create(&store, "pages", homepage("About", "about"), false).await.unwrap();
        store
            .update("pages", about.id, title("About v2"), true, WriteContext::guarded())
            .await
            .unwrap();
        let home = create(&store, "pages", new_page("Home", "home"), true).await.unwrap();

        store
            .update(
                "pages",
                home.id,
                PageWrite::fields(fields(json!({"isHomepage": true}))),
                false,
                WriteContext::releasing(vec![about.id]),
            )
            .await
            .unwrap();

        let working = store.find_by_id("pages", about.id, true).await.unwrap().unwrap();
        let published = store.find_by_id("pages", about.id, false).await.unwrap().unwrap();
        assert!(!working.is_homepage());
        assert_eq!(working.status(), PageStatus::Draft);
        assert_eq!(working.data.title, "About v2");
        assert!(!published.is_homepage());
        assert_eq!(published.data.title, "About");

        let writes = store.recorded_writes().await;
        assert_eq!(writes.len(), 3);
        assert_eq!(
            writes[1],
            RecordedWrite {
                id: about.id,
                draft: true,
                context: WriteContext::skip_homepage_guard(),
            }
        );
        assert_eq!(writes[2].id, home.id);
    }

    #[tokio::test]
    async fn rejected_write_leaves_holder_in_place() {
        let store = MemoryStore::new();
        let about = create(&store, "pages", homepage("About", "about"), false).await.unwrap();
        create(&store, "pages", new_page("X", "x"), true).await.unwrap();
        let home = create(&store, "pages", new_page("Home", "home"), true).await.unwrap();

        let err = store
            .update(
                "pages",
                home.id,
                PageWrite {
                    slug: Some("x".into()),
                    fields: fields(json!({"isHomepage": true})),
                    ..PageWrite::default()
                },
                false,
                WriteContext::releasing(vec![about.id]),
            )
            .await
            .unwrap_err();
        assert_matches!(err, StoreError::UniqueViolation { ref field, .. } if field == "slug");

        let working = store.find_by_id("pages", about.id, true).await.unwrap().unwrap();
        let published = store.find_by_id("pages", about.id, false).await.unwrap().unwrap();
        assert!(working.is_homepage());
        assert!(published.is_homepage());
        assert!(store.recorded_writes().await.is_empty());
    }

    #[tokio::test]
    async fn release_of_missing_holder_rejects_the_create() {
        let store = MemoryStore::new();
        let err = store
            .create(
                "pages",
                homepage("Home", "home"),
                false,
                WriteContext::releasing(vec![404]),
            )
            .await
            .unwrap_err();
        assert_matches!(err, StoreError::NotFound { id: 404, .. });
        assert!(store
            .find("pages", &Where::all(), 1, 10, Sort::default())
            .await
            .unwrap()
            .docs
            .is_empty());
    }
}
