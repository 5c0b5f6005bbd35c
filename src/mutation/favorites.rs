use super::engine::{LocalChange, MutationOutcome, OptimisticStore};
use crate::api::ListingsApi;
use crate::error::ApiResult;
use crate::models::Identity;
use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use tracing::info;

pub const FAVORITES_FAILED: &str = "Could not update favorites.";

/// Flip one listing's membership
struct FavoriteToggle {
    listing_id: String,
    was_favorite: bool,
}

impl LocalChange<HashSet<String>> for FavoriteToggle {
    /// Whether the listing is a favorite after the change
    type Confirmed = bool;

    fn apply(&mut self, ids: &mut HashSet<String>) -> bool {
        self.was_favorite = !ids.insert(self.listing_id.clone());
        if self.was_favorite {
            ids.remove(&self.listing_id);
        }
        true
    }

    fn revert(self, ids: &mut HashSet<String>) {
        if self.was_favorite {
            ids.insert(self.listing_id);
        } else {
            ids.remove(&self.listing_id);
        }
    }
}

/// The current user's favorite listings
pub struct Favorites {
    api: Arc<dyn ListingsApi>,
    store: OptimisticStore<HashSet<String>>,
}

impl Favorites {
    pub fn new(api: Arc<dyn ListingsApi>) -> Self {
        Self {
            api,
            store: OptimisticStore::new("favorites"),
        }
    }

    pub fn contains(&self, listing_id: &str) -> bool {
        self.store.read(|ids| ids.contains(listing_id))
    }

    pub fn ids(&self) -> HashSet<String> {
        self.store.snapshot()
    }

    pub fn len(&self) -> usize {
        self.store.read(HashSet::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn last_error(&self) -> Option<String> {
        self.store.last_error()
    }

    /// Toggle `listing_id`. Membership flips immediately; the returned
    /// future saves or deletes it remotely and flips it back on failure.
    pub fn toggle(
        &self,
        listing_id: &str,
    ) -> impl Future<Output = MutationOutcome<bool>> + Send + '_ {
        let api = Arc::clone(&self.api);
        let change = FavoriteToggle {
            listing_id: listing_id.to_string(),
            was_favorite: false,
        };

        self.store
            .mutate(change, FAVORITES_FAILED, move |change: &FavoriteToggle, identity: Identity| {
                let listing_id = change.listing_id.clone();
                let adding = !change.was_favorite;
                async move {
                    let result = if adding {
                        api.save_listing(&identity, &listing_id).await
                    } else {
                        api.delete_saved_listing(&identity, &listing_id).await
                    };
                    result.map(|_| adding)
                }
            })
    }

    /// Drop every favorite and scope the set to `identity`
    pub fn reset(&self, identity: Option<Identity>) {
        self.store.reset(identity);
    }

    /// Replace the set with the backend's saved listings
    pub async fn refresh(&self) -> ApiResult<usize> {
        let Some((identity, epoch)) = self.store.scope() else {
            return Ok(0);
        };
        let ids: HashSet<String> = self.api.saved_listings(&identity).await?.into_iter().collect();
        let loaded = ids.len();
        if self.store.load(epoch, ids) {
            info!("Loaded {} favorites", loaded);
        }
        Ok(loaded)
    }
}
