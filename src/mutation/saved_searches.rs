use super::engine::{LocalChange, MutationOutcome, OptimisticStore};
use crate::api::ListingsApi;
use crate::codec::{to_persisted_filters, NewSavedSearch, Page};
use crate::error::ApiResult;
use crate::models::{FilterState, Identity, SavedSearch};
use chrono::Utc;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

pub const SAVE_SEARCH_FAILED: &str = "Could not save this search.";
pub const DELETE_SEARCH_FAILED: &str = "Could not delete saved search.";

/// Id prefix of entries the backend has not created yet
const PLACEHOLDER_PREFIX: &str = "pending-";

/// Prepend a placeholder until the backend answers with the real record
struct CreateSearch {
    placeholder: SavedSearch,
    body: NewSavedSearch,
}

impl LocalChange<Vec<SavedSearch>> for CreateSearch {
    type Confirmed = SavedSearch;

    fn apply(&mut self, searches: &mut Vec<SavedSearch>) -> bool {
        searches.insert(0, self.placeholder.clone());
        true
    }

    fn revert(self, searches: &mut Vec<SavedSearch>) {
        searches.retain(|s| s.id != self.placeholder.id);
    }

    fn confirm(self, searches: &mut Vec<SavedSearch>, created: &SavedSearch) {
        if let Some(slot) = searches.iter_mut().find(|s| s.id == self.placeholder.id) {
            *slot = created.clone();
        }
    }
}

/// Remove an entry, remembering where it was
struct DeleteSearch {
    search_id: String,
    removed: Option<(usize, SavedSearch)>,
}

impl LocalChange<Vec<SavedSearch>> for DeleteSearch {
    type Confirmed = ();

    fn apply(&mut self, searches: &mut Vec<SavedSearch>) -> bool {
        // The backend has no record to delete until the create lands
        if self.search_id.starts_with(PLACEHOLDER_PREFIX) {
            debug!("Saved search {} is still being created", self.search_id);
            return false;
        }
        match searches.iter().position(|s| s.id == self.search_id) {
            Some(idx) => {
                self.removed = Some((idx, searches.remove(idx)));
                true
            }
            None => false,
        }
    }

    fn revert(self, searches: &mut Vec<SavedSearch>) {
        if let Some((idx, search)) = self.removed {
            searches.insert(idx.min(searches.len()), search);
        }
    }
}

/// The current user's saved searches, newest first
pub struct SavedSearches {
    api: Arc<dyn ListingsApi>,
    store: OptimisticStore<Vec<SavedSearch>>,
    page: Page,
    next_placeholder: AtomicU64,
}

impl SavedSearches {
    pub fn new(api: Arc<dyn ListingsApi>, page_size: u32) -> Self {
        Self {
            api,
            store: OptimisticStore::new("saved searches"),
            page: Page::first(page_size),
            next_placeholder: AtomicU64::new(1),
        }
    }

    pub fn list(&self) -> Vec<SavedSearch> {
        self.store.snapshot()
    }

    pub fn get(&self, search_id: &str) -> Option<SavedSearch> {
        self.store
            .read(|searches| searches.iter().find(|s| s.id == search_id).cloned())
    }

    pub fn last_error(&self) -> Option<String> {
        self.store.last_error()
    }

    /// Save `filters` as a new search. The entry shows up at the top of the
    /// list immediately and is replaced by the backend's record once
    /// created. Filters with neither free text nor a location are skipped.
    pub fn create(
        &self,
        filters: &FilterState,
        send_email: bool,
    ) -> impl Future<Output = MutationOutcome<SavedSearch>> + Send + '_ {
        let pending = match NewSavedSearch::from_filters(filters, send_email) {
            Some(body) => {
                let now = Utc::now();
                let n = self.next_placeholder.fetch_add(1, Ordering::Relaxed);
                let placeholder = SavedSearch {
                    id: format!("{}{}", PLACEHOLDER_PREFIX, n),
                    query: body.query.clone(),
                    email_alerts_enabled: send_email,
                    filters: Some(to_persisted_filters(filters)),
                    created_at: Some(now),
                    updated_at: Some(now),
                };
                let api = Arc::clone(&self.api);
                Some(self.store.mutate(
                    CreateSearch { placeholder, body },
                    SAVE_SEARCH_FAILED,
                    move |change: &CreateSearch, identity: Identity| {
                        let body = change.body.clone();
                        let snapshot = change.placeholder.filters.clone();
                        async move {
                            api.create_saved_search(&identity, &body)
                                .await
                                .map(|mut created| {
                                    if created.filters.is_none() {
                                        created.filters = snapshot;
                                    }
                                    created
                                })
                        }
                    },
                ))
            }
            None => {
                debug!("Search has no text to be saved under, skipping");
                None
            }
        };

        async move {
            match pending {
                Some(mutation) => mutation.await,
                None => MutationOutcome::Skipped,
            }
        }
    }

    /// Remove a saved search. It disappears immediately and comes back at
    /// the same position if the backend refuses. Entries still waiting on
    /// their create are left alone.
    pub fn delete(&self, search_id: &str) -> impl Future<Output = MutationOutcome<()>> + Send + '_ {
        let api = Arc::clone(&self.api);
        let change = DeleteSearch {
            search_id: search_id.to_string(),
            removed: None,
        };

        self.store.mutate(
            change,
            DELETE_SEARCH_FAILED,
            move |change: &DeleteSearch, identity: Identity| {
                let search_id = change.search_id.clone();
                async move { api.delete_saved_search(&identity, &search_id).await }
            },
        )
    }

    pub fn reset(&self, identity: Option<Identity>) {
        self.store.reset(identity);
    }

    /// Replace the list with the backend's first page
    pub async fn refresh(&self) -> ApiResult<usize> {
        let Some((identity, epoch)) = self.store.scope() else {
            return Ok(0);
        };
        let searches = self.api.saved_searches(&identity, self.page).await?;
        let loaded = searches.len();
        if self.store.load(epoch, searches) {
            info!("Loaded {} saved searches", loaded);
        }
        Ok(loaded)
    }
}
