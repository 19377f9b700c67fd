//! Page lifecycle: the create/update protocol and the draft/publish state
//! machine.
//!
//! Update protocol, in order:
//!
//! 1. authenticate
//! 2. authorize edit, then publish when the edit publishes
//! 3. translate editor root props into a structured-field patch
//! 4. merge the patch with the explicit request members (explicit wins)
//! 5. reject a slug taken by another page, then run the homepage guard
//!    when the merged write sets the flag
//! 6. commit with `draft = !publishing`, releasing previous homepage
//!    holders in the same commit
//! 7. return the committed document
//!
//! A failure at any step aborts the operation before the commit.

use std::sync::Arc;

use serde_json::Map;

use crate::access::{Actor, PageAccess};
use crate::error::CoreError;
use crate::field_path::deep_merge;
use crate::homepage::{HomepageGuard, HomepageSwap};
use crate::page::{
    validate_slug, validate_title, EditorContent, NewPage, PageDocument, PageStatus, PageWrite,
};
use crate::pagination::Paginated;
use crate::request::{
    CreatePageRequest, ListPagesQuery, ListVersionsQuery, PageBody, UpdatePageRequest,
};
use crate::root_props::RootPropsTranslator;
use crate::store::{DocumentStore, FieldRef, Sort, VersionSnapshot, Where};
use crate::types::DbId;

/// Default collection name for pages.
pub const DEFAULT_COLLECTION: &str = "pages";

/// Orchestrates every page operation for one collection.
#[derive(Clone)]
pub struct PageLifecycle {
    store: Arc<dyn DocumentStore>,
    access: Arc<dyn PageAccess>,
    translator: Arc<RootPropsTranslator>,
    collection: String,
}

impl PageLifecycle {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        access: Arc<dyn PageAccess>,
        translator: RootPropsTranslator,
        collection: impl Into<String>,
    ) -> Self {
        Self {
            store,
            access,
            translator: Arc::new(translator),
            collection: collection.into(),
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    pub async fn list_pages(
        &self,
        actor: Option<&Actor>,
        query: &ListPagesQuery,
    ) -> Result<Paginated<PageDocument>, CoreError> {
        let actor = authenticate(actor)?;
        self.access.can_list(actor).require()?;
        let sort = query.sort()?;

        Ok(self
            .store
            .find(&self.collection, &query.filter(), query.page(), query.limit(), sort)
            .await?)
    }

    pub async fn get_page(
        &self,
        actor: Option<&Actor>,
        id: DbId,
        draft: bool,
    ) -> Result<PageDocument, CoreError> {
        let actor = authenticate(actor)?;
        self.access.can_view(actor, Some(id)).require()?;
        self.find_existing(id, draft).await
    }

    pub async fn list_versions(
        &self,
        actor: Option<&Actor>,
        id: DbId,
        query: &ListVersionsQuery,
    ) -> Result<Paginated<VersionSnapshot>, CoreError> {
        let actor = authenticate(actor)?;
        self.access.can_view(actor, Some(id)).require()?;
        let order = query.order()?;
        self.find_existing(id, true).await?;

        Ok(self
            .store
            .find_versions(&self.collection, id, order, query.page(), query.limit())
            .await?)
    }

    // -----------------------------------------------------------------------
    // Writes
    // -----------------------------------------------------------------------

    pub async fn create_page(
        &self,
        actor: Option<&Actor>,
        body: CreatePageRequest,
    ) -> Result<PageDocument, CoreError> {
        let actor = authenticate(actor)?;
        self.access.can_create(actor).require()?;
        let publishing = body.publishing();
        if publishing {
            self.access.can_publish(actor, None).require()?;
        }
        body.check()?;

        let write = self.build_write(&body)?;
        self.ensure_slug_free(write.slug.as_deref(), None).await?;
        let swap = self.guard_homepage(None, &write, body.swap_homepage()).await?;

        let new_page = NewPage {
            title: write.title.unwrap_or_default(),
            slug: write.slug.unwrap_or_default(),
            fields: write.fields,
            editor_content: write.editor_content,
        };
        let page = self
            .store
            .create(&self.collection, new_page, !publishing, swap.write_context())
            .await?;

        tracing::info!(
            user_id = actor.user_id,
            page_id = page.id,
            collection = %self.collection,
            slug = %page.data.slug,
            status = %page.status(),
            homepage_swapped = matches!(swap, HomepageSwap::Swap { .. }),
            "Page created"
        );
        Ok(page)
    }

    pub async fn update_page(
        &self,
        actor: Option<&Actor>,
        id: DbId,
        body: UpdatePageRequest,
    ) -> Result<PageDocument, CoreError> {
        // 1-2b.
        let actor = authenticate(actor)?;
        self.access.can_edit(actor, Some(id)).require()?;
        let publishing = body.publishing();
        if publishing {
            self.access.can_publish(actor, Some(id)).require()?;
        }
        body.check()?;
        self.find_existing(id, true).await?;

        // 3-4.
        let write = self.build_write(&body)?;

        // 5.
        self.ensure_slug_free(write.slug.as_deref(), Some(id)).await?;
        let swap = self.guard_homepage(Some(id), &write, body.swap_homepage()).await?;

        // 6-7.
        let context = swap.write_context();
        let page = self
            .store
            .update(&self.collection, id, write, !publishing, context)
            .await?;

        tracing::info!(
            user_id = actor.user_id,
            page_id = page.id,
            collection = %self.collection,
            status = %page.status(),
            homepage_swapped = matches!(swap, HomepageSwap::Swap { .. }),
            "Page updated"
        );
        Ok(page)
    }

    pub async fn delete_page(
        &self,
        actor: Option<&Actor>,
        id: DbId,
    ) -> Result<PageDocument, CoreError> {
        let actor = authenticate(actor)?;
        self.access.can_delete(actor, Some(id)).require()?;

        let page = self.store.delete(&self.collection, id).await?;

        tracing::info!(
            user_id = actor.user_id,
            page_id = id,
            collection = %self.collection,
            slug = %page.data.slug,
            "Page deleted"
        );
        Ok(page)
    }

    /// Replace the working copy of `id` with a stored snapshot.
    ///
    /// The snapshot is written back as-is: no root-prop translation and no
    /// homepage guard.
    pub async fn restore_version(
        &self,
        actor: Option<&Actor>,
        id: DbId,
        version_id: DbId,
    ) -> Result<PageDocument, CoreError> {
        let actor = authenticate(actor)?;
        self.access.can_edit(actor, Some(id)).require()?;

        let snapshot = self
            .store
            .find_version(&self.collection, version_id)
            .await?
            .filter(|snapshot| snapshot.parent_id == id)
            .ok_or(CoreError::NotFound {
                entity: "PageVersion",
                id: version_id,
            })?;
        if snapshot.versioned_fields.status == PageStatus::Published {
            self.access.can_publish(actor, Some(id)).require()?;
        }

        let page = self
            .store
            .restore_version(&self.collection, version_id)
            .await?;

        tracing::info!(
            user_id = actor.user_id,
            page_id = id,
            version_id,
            collection = %self.collection,
            status = %page.status(),
            "Page restored from version"
        );
        Ok(page)
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    async fn find_existing(&self, id: DbId, draft: bool) -> Result<PageDocument, CoreError> {
        self.store
            .find_by_id(&self.collection, id, draft)
            .await?
            .ok_or(CoreError::NotFound { entity: "Page", id })
    }

    /// Steps 3-4: translate root props and lay the explicit members over the
    /// translated patch.
    fn build_write<B>(&self, body: &B) -> Result<PageWrite, CoreError>
    where
        B: PageBody + ExplicitMembers,
    {
        let mut patch = Map::new();
        if let Some(content) = body.editor_content() {
            warn_on_duplicate_ids(content);
            patch = self.translator.translate(&content.root.props)?;
        }
        deep_merge(&mut patch, body.explicit_fields());

        let mut write = PageWrite::from_patch(patch);
        if let Some(title) = body.explicit_title() {
            write.title = Some(title.to_string());
        }
        if let Some(slug) = body.explicit_slug() {
            write.slug = Some(slug.to_string());
        }
        write.editor_content = body.editor_content().cloned();

        // Translated values skip request validation; check what will be stored.
        if let Some(title) = &write.title {
            validate_title(title)?;
        }
        if let Some(slug) = &write.slug {
            validate_slug(slug)?;
        }
        Ok(write)
    }

    /// Slugs are unique per collection. Checked before the homepage guard so
    /// a clash is reported without planning a swap.
    async fn ensure_slug_free(
        &self,
        slug: Option<&str>,
        except: Option<DbId>,
    ) -> Result<(), CoreError> {
        let Some(slug) = slug else {
            return Ok(());
        };
        let mut filter = Where::eq(FieldRef::Slug, slug);
        if let Some(id) = except {
            filter = filter.and(Where::ne(FieldRef::Id, id));
        }
        let taken = self
            .store
            .find(&self.collection, &filter, 1, 1, Sort::default())
            .await?;
        if taken.total_docs > 0 {
            return Err(CoreError::DuplicateField {
                field: "slug".into(),
                value: slug.to_string(),
            });
        }
        Ok(())
    }

    /// The single entry point into the homepage invariant for every write.
    async fn guard_homepage(
        &self,
        target_id: Option<DbId>,
        write: &PageWrite,
        swap_requested: bool,
    ) -> Result<HomepageSwap, CoreError> {
        HomepageGuard::prepare_homepage_swap(
            self.store.as_ref(),
            &self.collection,
            target_id,
            write.sets_homepage(),
            swap_requested,
        )
        .await
    }
}

/// Top-level members a request sets explicitly; they win over translated
/// root props.
trait ExplicitMembers {
    fn explicit_title(&self) -> Option<&str>;
    fn explicit_slug(&self) -> Option<&str>;
}

impl ExplicitMembers for CreatePageRequest {
    fn explicit_title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    fn explicit_slug(&self) -> Option<&str> {
        self.slug.as_deref()
    }
}

impl ExplicitMembers for UpdatePageRequest {
    fn explicit_title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    fn explicit_slug(&self) -> Option<&str> {
        self.slug.as_deref()
    }
}

fn authenticate(actor: Option<&Actor>) -> Result<&Actor, CoreError> {
    actor.ok_or_else(|| CoreError::Unauthorized("Authentication required".into()))
}

fn warn_on_duplicate_ids(content: &EditorContent) {
    for duplicate in content.duplicate_ids() {
        tracing::warn!(
            block_id = %duplicate.id,
            zone = duplicate.zone.as_deref().unwrap_or("content"),
            "Duplicate block id in editor content"
        );
    }
}
