use crate::codec::{NewSavedSearch, Page, QueryPairs};
use crate::error::ApiResult;
use crate::models::{Credential, Identity, OpenHouse, Property, SavedSearch};
use async_trait::async_trait;

/// Everything the sync layer needs from the listings backend.
///
/// Implementations return normalized models; a non-success status is an
/// error. Authenticated calls take the [`Identity`] whose credential is
/// sent as a bearer token.
#[async_trait]
pub trait ListingsApi: Send + Sync {
    /// `GET /listings` with already encoded filter parameters
    async fn search_listings(&self, params: &QueryPairs) -> ApiResult<Vec<Property>>;

    /// `GET /listings/{id}`; `None` when the backend has no such listing
    async fn listing(&self, listing_id: &str) -> ApiResult<Option<Property>>;

    /// `GET /listings/{id}/media`, image URLs in display order
    async fn listing_media(&self, listing_id: &str) -> ApiResult<Vec<String>>;

    async fn listing_open_houses(&self, listing_id: &str) -> ApiResult<Vec<OpenHouse>>;

    async fn latest_open_houses(&self, page: Page) -> ApiResult<Vec<OpenHouse>>;

    /// `GET /listings/autocomplete?search_term=..`
    async fn autocomplete(&self, term: &str) -> ApiResult<Vec<String>>;

    /// Listing ids the user has saved
    async fn saved_listings(&self, identity: &Identity) -> ApiResult<Vec<String>>;

    async fn save_listing(&self, identity: &Identity, listing_id: &str) -> ApiResult<()>;

    async fn delete_saved_listing(&self, identity: &Identity, listing_id: &str) -> ApiResult<()>;

    async fn saved_searches(&self, identity: &Identity, page: Page) -> ApiResult<Vec<SavedSearch>>;

    async fn create_saved_search(
        &self,
        identity: &Identity,
        search: &NewSavedSearch,
    ) -> ApiResult<SavedSearch>;

    async fn delete_saved_search(&self, identity: &Identity, search_id: &str) -> ApiResult<()>;

    /// `POST /token` with form-encoded credentials
    async fn login(&self, username: &str, password: &str) -> ApiResult<Credential>;

    /// `GET /users/me`
    async fn current_user(&self, credential: &Credential) -> ApiResult<Identity>;
}
