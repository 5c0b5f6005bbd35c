use crate::api::ListingsApi;
use crate::codec::{
    encode_to_api_params, encode_to_url_params, parse_query_string, to_query_string, Page,
    QueryPairs,
};
use crate::models::{FilterState, Property, SavedSearch};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub const LISTINGS_FAILED: &str = "Could not load listings from API.";

/// Listings fetched per search unless told otherwise
pub const DEFAULT_PAGE_SIZE: u32 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchStatus {
    Idle,
    Loading,
    Ready,
    Error,
}

/// Everything a results page renders
#[derive(Debug, Clone, PartialEq)]
pub struct SearchView {
    pub filters: FilterState,
    /// Current URL query parameters, foreign keys included
    pub url_params: QueryPairs,
    pub status: SearchStatus,
    pub results: Vec<Property>,
    pub error: Option<String>,
}

/// How one fetch ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome {
    Ready { count: usize },
    Failed { message: String },
    /// A newer fetch started, or the session was closed, before this one
    /// could be shown
    Superseded,
}

/// The one "current search" of a results page.
///
/// Every filter change rewrites the URL parameters, moves to `Loading` and
/// starts a fetch. Only the most recently started fetch may update the
/// results: older ones are cancelled, and if one still completes its
/// response is dropped.
pub struct SearchSession {
    api: Arc<dyn ListingsApi>,
    defaults: FilterState,
    page: Page,
    view: watch::Sender<SearchView>,
    generation: AtomicU64,
    in_flight: Mutex<CancellationToken>,
    shutdown: CancellationToken,
}

impl SearchSession {
    pub fn new(api: Arc<dyn ListingsApi>, defaults: FilterState) -> Self {
        Self::from_url(api, defaults, "")
    }

    /// Seed the filters from a URL query string. The URL is read only
    /// here; afterwards the session writes to it.
    pub fn from_url(api: Arc<dyn ListingsApi>, defaults: FilterState, query: &str) -> Self {
        let previous = parse_query_string(query);
        let filters = crate::codec::decode_from_url_params(&previous, &defaults);
        let url_params = encode_to_url_params(&filters, &previous);
        debug!("Search session starts from {:?}", filters);

        let (view, _) = watch::channel(SearchView {
            filters,
            url_params,
            status: SearchStatus::Idle,
            results: Vec::new(),
            error: None,
        });
        let shutdown = CancellationToken::new();

        Self {
            api,
            defaults,
            page: Page::first(DEFAULT_PAGE_SIZE),
            view,
            generation: AtomicU64::new(0),
            in_flight: Mutex::new(shutdown.child_token()),
            shutdown,
        }
    }

    pub fn with_page(mut self, page: Page) -> Self {
        self.page = page;
        self
    }

    pub fn filters(&self) -> FilterState {
        self.view.borrow().filters.clone()
    }

    pub fn view(&self) -> SearchView {
        self.view.borrow().clone()
    }

    pub fn status(&self) -> SearchStatus {
        self.view.borrow().status
    }

    pub fn results(&self) -> Vec<Property> {
        self.view.borrow().results.clone()
    }

    pub fn error(&self) -> Option<String> {
        self.view.borrow().error.clone()
    }

    /// The URL query string to show for the current filters
    pub fn url_query(&self) -> String {
        to_query_string(&self.view.borrow().url_params)
    }

    pub fn subscribe(&self) -> watch::Receiver<SearchView> {
        self.view.subscribe()
    }

    /// Replace the filters and search again
    pub fn set_filters(
        &self,
        filters: FilterState,
    ) -> impl Future<Output = SearchOutcome> + Send + '_ {
        self.start(Some(filters))
    }

    /// Edit the filters in place and search again
    pub fn update(
        &self,
        edit: impl FnOnce(&mut FilterState),
    ) -> impl Future<Output = SearchOutcome> + Send + '_ {
        let mut filters = self.filters();
        edit(&mut filters);
        self.start(Some(filters))
    }

    pub fn set_free_text(&self, text: &str) -> impl Future<Output = SearchOutcome> + Send + '_ {
        let text = text.to_string();
        self.update(move |filters| filters.free_text = text)
    }

    /// Load a saved search's filters, overwriting all current ones. Searches
    /// without usable filters fall back to their query as free text.
    pub fn select_saved_search(
        &self,
        search: &SavedSearch,
    ) -> impl Future<Output = SearchOutcome> + Send + '_ {
        let filters = match &search.filters {
            Some(saved) => saved.hydrate(&search.query, &self.defaults),
            None => self.defaults.clone().with_free_text(search.query.clone()),
        };
        info!("Selected saved search '{}'", search.query);
        self.start(Some(filters))
    }

    /// Search again with the current filters
    pub fn refresh(&self) -> impl Future<Output = SearchOutcome> + Send + '_ {
        self.start(None)
    }

    /// Cancel the in-flight fetch; later fetches end as superseded and
    /// leave the view alone
    pub fn close(&self) {
        self.shutdown.cancel();
        self.view.send_if_modified(|view| {
            self.generation.fetch_add(1, Ordering::SeqCst);
            if view.status != SearchStatus::Loading {
                return false;
            }
            view.status = SearchStatus::Idle;
            true
        });
        debug!("Search session closed");
    }

    /// Synchronous half of a filter change: write the URL, enter `Loading`
    /// and retire the previous fetch.
    fn start(&self, filters: Option<FilterState>) -> impl Future<Output = SearchOutcome> + Send + '_ {
        let token = {
            let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
            in_flight.cancel();
            *in_flight = self.shutdown.child_token();
            in_flight.clone()
        };

        let mut generation = 0;
        let mut params = QueryPairs::new();
        let started = self.view.send_if_modified(|view| {
            // A closed session never goes back to Loading
            if self.shutdown.is_cancelled() {
                return false;
            }
            generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
            if let Some(filters) = filters {
                view.url_params = encode_to_url_params(&filters, &view.url_params);
                view.filters = filters;
            }
            view.status = SearchStatus::Loading;
            view.error = None;
            params = encode_to_api_params(&view.filters, self.page);
            true
        });
        if !started {
            debug!("Ignoring search on a closed session");
        }

        self.fetch(generation, token, params)
    }

    async fn fetch(
        &self,
        generation: u64,
        token: CancellationToken,
        params: QueryPairs,
    ) -> SearchOutcome {
        debug!("Search #{} with {:?}", generation, params);
        let result = tokio::select! {
            biased;
            _ = token.cancelled() => {
                debug!("Search #{} cancelled", generation);
                return SearchOutcome::Superseded;
            }
            result = self.api.search_listings(&params) => result,
        };

        let outcome = match result {
            Ok(results) => {
                let count = results.len();
                let committed = self.commit(generation, |view| {
                    view.status = SearchStatus::Ready;
                    view.results = results;
                    view.error = None;
                });
                committed.then_some(SearchOutcome::Ready { count })
            }
            Err(e) if e.is_cancelled() => None,
            Err(e) => {
                warn!("Failed to load listings: {}", e);
                let committed = self.commit(generation, |view| {
                    view.status = SearchStatus::Error;
                    view.results.clear();
                    view.error = Some(LISTINGS_FAILED.to_string());
                });
                committed.then(|| SearchOutcome::Failed {
                    message: LISTINGS_FAILED.to_string(),
                })
            }
        };

        match outcome {
            Some(outcome) => {
                info!("Search #{} finished: {:?}", generation, outcome);
                outcome
            }
            None => {
                debug!("Dropping stale response of search #{}", generation);
                SearchOutcome::Superseded
            }
        }
    }

    /// Apply `change` only if `generation` is still the latest fetch
    fn commit(&self, generation: u64, change: impl FnOnce(&mut SearchView)) -> bool {
        self.view.send_if_modified(|view| {
            if self.generation.load(Ordering::SeqCst) != generation {
                return false;
            }
            change(view);
            true
        })
    }
}

impl Drop for SearchSession {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
