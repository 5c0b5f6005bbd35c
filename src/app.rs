//! Process-wide state of the home search client.

use crate::api::{HttpApi, ListingsApi};
use crate::autocomplete::Autocomplete;
use crate::codec::{Page, QueryPairs};
use crate::config::Config;
use crate::error::{ApiError, ApiResult};
use crate::models::{Credential, Identity, OpenHouse, Property, SavedSearch};
use crate::mutation::{Favorites, MutationOutcome, SavedSearches};
use crate::session::{AuthSession, SearchSession};
use anyhow::Result;
use std::future::Future;
use std::sync::Arc;
use tracing::{info, warn};

/// A listing with everything its detail page shows
#[derive(Debug, Clone, PartialEq)]
pub struct ListingDetail {
    pub property: Property,
    /// Media images, or the listing's own when there are none
    pub gallery: Vec<String>,
    pub open_houses: Vec<OpenHouse>,
}

/// Owns the authenticated identity and everything scoped to it.
///
/// Favorites and saved searches belong to one identity. Logging in,
/// logging out or restoring a session clears both before anything is
/// fetched for the new identity.
pub struct HomeSearch {
    api: Arc<dyn ListingsApi>,
    config: Config,
    auth: AuthSession,
    favorites: Favorites,
    saved_searches: SavedSearches,
}

impl HomeSearch {
    pub fn new(api: Arc<dyn ListingsApi>, config: Config) -> Self {
        Self {
            auth: AuthSession::new(Arc::clone(&api)),
            favorites: Favorites::new(Arc::clone(&api)),
            saved_searches: SavedSearches::new(Arc::clone(&api), config.saved_search_page),
            api,
            config,
        }
    }

    /// Talk to the backend at `config.api_base_url`
    pub fn connect(config: Config) -> Result<Self> {
        let api = HttpApi::new(&config)?;
        info!("Using backend at {}", api.base_url());
        Ok(Self::new(Arc::new(api), config))
    }

    pub fn api(&self) -> Arc<dyn ListingsApi> {
        Arc::clone(&self.api)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn auth(&self) -> &AuthSession {
        &self.auth
    }

    pub fn favorites(&self) -> &Favorites {
        &self.favorites
    }

    pub fn saved_searches(&self) -> &SavedSearches {
        &self.saved_searches
    }

    pub fn identity(&self) -> Option<Identity> {
        self.auth.identity()
    }

    /// A search session seeded from `url_query`
    pub fn search_session(&self, url_query: &str) -> SearchSession {
        SearchSession::from_url(self.api(), self.config.default_filters(), url_query)
    }

    pub fn autocomplete(&self) -> Autocomplete {
        Autocomplete::new(
            self.api(),
            self.config.autocomplete_delay,
            self.config.autocomplete_limit,
        )
    }

    /// Log in and scope user data to the new identity. A failed login
    /// leaves nobody logged in; one overtaken by a later login or logout
    /// changes nothing.
    pub async fn login(&self, username: &str, password: &str) -> ApiResult<Identity> {
        let result = self.auth.login(username, password).await;
        self.settle_identity(result).await
    }

    pub async fn restore_session(&self, credential: Credential) -> ApiResult<Identity> {
        let result = self.auth.restore(credential).await;
        self.settle_identity(result).await
    }

    pub async fn logout(&self) {
        self.auth.logout();
        self.apply_identity(None).await;
    }

    async fn settle_identity(&self, result: ApiResult<Identity>) -> ApiResult<Identity> {
        match result {
            Ok(identity) if self.identity().as_ref() != Some(&identity) => {
                info!("User {} was logged out before their data loaded", identity.user_id);
                Err(ApiError::Cancelled)
            }
            Ok(identity) => {
                self.apply_identity(Some(identity.clone())).await;
                Ok(identity)
            }
            Err(e) if e.is_cancelled() => Err(e),
            Err(e) => {
                self.apply_identity(None).await;
                Err(e)
            }
        }
    }

    /// Scope favorites and saved searches to `identity`. Both are cleared
    /// before this first yields; the new identity's data is then loaded.
    pub async fn apply_identity(&self, identity: Option<Identity>) {
        match &identity {
            Some(identity) => info!("Switching to user {}", identity.user_id),
            None => info!("Clearing user data"),
        }
        self.favorites.reset(identity.clone());
        self.saved_searches.reset(identity.clone());

        if identity.is_none() {
            return;
        }

        let (favorites, searches) =
            tokio::join!(self.favorites.refresh(), self.saved_searches.refresh());
        if let Err(e) = favorites {
            warn!("Failed to load saved listings: {}", e);
        }
        if let Err(e) = searches {
            warn!("Failed to load saved searches: {}", e);
        }
    }

    pub fn toggle_favorite(
        &self,
        listing_id: &str,
    ) -> impl Future<Output = MutationOutcome<bool>> + Send + '_ {
        self.favorites.toggle(listing_id)
    }

    /// Save the session's current filters as a new saved search
    pub fn save_current_search(
        &self,
        session: &SearchSession,
        send_email: bool,
    ) -> impl Future<Output = MutationOutcome<SavedSearch>> + Send + '_ {
        self.saved_searches.create(&session.filters(), send_email)
    }

    pub fn delete_saved_search(
        &self,
        search_id: &str,
    ) -> impl Future<Output = MutationOutcome<()>> + Send + '_ {
        self.saved_searches.delete(search_id)
    }

    /// Listing, gallery and open houses; `None` if the listing is gone.
    /// Media and open houses are optional extras and never fail the call.
    pub async fn listing_detail(&self, listing_id: &str) -> ApiResult<Option<ListingDetail>> {
        let Some(property) = self.api.listing(listing_id).await? else {
            info!("Listing {} not found", listing_id);
            return Ok(None);
        };

        let (media, open_houses) = tokio::join!(
            self.api.listing_media(listing_id),
            self.api.listing_open_houses(listing_id)
        );
        let media = media.unwrap_or_else(|e| {
            warn!("Failed to load media for listing {}: {}", listing_id, e);
            Vec::new()
        });
        let open_houses = open_houses.unwrap_or_else(|e| {
            warn!("Failed to load open houses for listing {}: {}", listing_id, e);
            Vec::new()
        });

        Ok(Some(ListingDetail {
            gallery: property.gallery(&media),
            property,
            open_houses,
        }))
    }

    pub async fn latest_open_houses(&self, page: Page) -> ApiResult<Vec<OpenHouse>> {
        self.api.latest_open_houses(page).await
    }

    /// Up to `count` other listings for sale
    pub async fn similar_listings(&self, listing_id: &str, count: u32) -> ApiResult<Vec<Property>> {
        let params: QueryPairs = vec![
            ("status_name".to_string(), "for_sale".to_string()),
            ("limit".to_string(), count.saturating_add(1).to_string()),
        ];
        let listings = self.api.search_listings(&params).await?;
        Ok(listings
            .into_iter()
            .filter(|p| p.id != listing_id)
            .take(count as usize)
            .collect())
    }
}
