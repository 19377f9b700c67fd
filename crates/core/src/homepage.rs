//! The "at most one homepage per collection" invariant.
//!
//! The homepage is not a stored singleton; it is whichever page carries
//! `isHomepage = true` on its working or its published copy. Every write
//! path that can set the flag calls [`HomepageGuard::prepare_homepage_swap`]
//! before committing and hands [`HomepageSwap::write_context`] to the store,
//! which clears the previous holders in the same commit.

use std::collections::BTreeMap;

use crate::error::CoreError;
use crate::page::{PageRef, HOMEPAGE_FIELD};
use crate::store::{DocumentStore, FieldRef, Sort, Where, WriteContext};
use crate::types::DbId;

/// Upper bound on holders looked up per copy. More than one holder only
/// exists after an unguarded race; all of them are released.
const MAX_HOLDERS: i64 = 50;

/// What the guard decided.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HomepageSwap {
    /// The write does not set the flag; nothing was queried.
    NotRequested,
    /// No other page holds the flag.
    Vacant,
    /// These pages hold the flag and must give it up with the write.
    Swap { previous: Vec<PageRef> },
}

impl HomepageSwap {
    /// The context the write must be committed with.
    pub fn write_context(&self) -> WriteContext {
        match self {
            HomepageSwap::Swap { previous } => {
                WriteContext::releasing(previous.iter().map(|holder| holder.id).collect())
            }
            HomepageSwap::NotRequested | HomepageSwap::Vacant => WriteContext::guarded(),
        }
    }
}

pub struct HomepageGuard;

impl HomepageGuard {
    /// Check whether `target_id` (`None` for a page not yet created) may
    /// become the homepage of `collection`.
    ///
    /// Holders are looked up among working and published copies, so a page
    /// whose live copy is the homepage still counts while a draft edit is
    /// pending. With `swap_requested` every holder is returned for release;
    /// without it the first one is reported as
    /// [`CoreError::HomepageConflict`]. Nothing is written here.
    pub async fn prepare_homepage_swap(
        store: &dyn DocumentStore,
        collection: &str,
        target_id: Option<DbId>,
        intended_is_homepage: bool,
        swap_requested: bool,
    ) -> Result<HomepageSwap, CoreError> {
        if !intended_is_homepage {
            return Ok(HomepageSwap::NotRequested);
        }

        let mut filter = Where::eq(FieldRef::Field(HOMEPAGE_FIELD.into()), true);
        if let Some(id) = target_id {
            filter = filter.and(Where::ne(FieldRef::Id, id));
        }
        let working = store
            .find(collection, &filter, 1, MAX_HOLDERS, Sort::default())
            .await?
            .docs;
        let published = store
            .find_published(collection, &filter, 1, MAX_HOLDERS, Sort::default())
            .await?
            .docs;

        let mut holders = BTreeMap::new();
        for doc in working.into_iter().chain(published) {
            holders.entry(doc.id).or_insert_with(|| doc.to_ref());
        }
        let previous: Vec<PageRef> = holders.into_values().collect();

        let Some(first) = previous.first() else {
            return Ok(HomepageSwap::Vacant);
        };

        if !swap_requested {
            tracing::warn!(
                collection,
                target_id,
                holder_id = first.id,
                holder_slug = %first.slug,
                "Homepage already held by another page"
            );
            return Err(CoreError::HomepageConflict {
                existing: first.clone(),
            });
        }

        tracing::info!(
            collection,
            target_id,
            previous_ids = ?previous.iter().map(|holder| holder.id).collect::<Vec<_>>(),
            "Homepage flag will move off previous holders"
        );
        Ok(HomepageSwap::Swap { previous })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
