use crate::api::traits::ListingsApi;
use crate::codec::{NewSavedSearch, Page, QueryPairs};
use crate::config::Config;
use crate::error::{ApiError, ApiResult};
use crate::models::{Credential, Identity, OpenHouse, Property, SavedSearch};
use crate::normalize;
use anyhow::Context;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde_json::{json, Value};
use tracing::{debug, warn};

/// [`ListingsApi`] over HTTP
pub struct HttpApi {
    client: Client,
    base_url: String,
}

impl HttpApi {
    /// Create a client for the backend configured in `config`
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .user_agent(concat!("housing-sync/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn page_pairs(page: Page) -> QueryPairs {
        let mut pairs = QueryPairs::new();
        if let Some(limit) = page.limit {
            pairs.push(("limit".to_string(), limit.to_string()));
        }
        if let Some(offset) = page.offset {
            pairs.push(("offset".to_string(), offset.to_string()));
        }
        pairs
    }

    async fn send(&self, path: &str, request: RequestBuilder) -> ApiResult<Response> {
        debug!("Requesting {}", path);

        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED {
            warn!("{} rejected the credential", path);
            return Err(ApiError::Unauthorized);
        }
        if !status.is_success() {
            warn!("{} returned status: {}", path, status);
            return Err(ApiError::Status {
                status: status.as_u16(),
                path: path.to_string(),
            });
        }
        Ok(response)
    }

    async fn read_json(response: Response) -> ApiResult<Value> {
        let body = response.text().await?;
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&body)?)
    }

    async fn get_json(
        &self,
        path: &str,
        query: &[(String, String)],
        credential: Option<&Credential>,
    ) -> ApiResult<Value> {
        let mut request = self.client.get(self.url(path)).query(query);
        if let Some(credential) = credential {
            request = request.bearer_auth(credential.as_str());
        }
        let response = self.send(path, request).await?;
        Self::read_json(response).await
    }
}

#[async_trait]
impl ListingsApi for HttpApi {
    async fn search_listings(&self, params: &QueryPairs) -> ApiResult<Vec<Property>> {
        let raw = self.get_json("/listings", params, None).await?;
        let listings = normalize::normalize_listings(&raw);
        debug!("Fetched {} listings", listings.len());
        Ok(listings)
    }

    async fn listing(&self, listing_id: &str) -> ApiResult<Option<Property>> {
        match self
            .get_json(&format!("/listings/{}", listing_id), &[], None)
            .await
        {
            Ok(raw) => Ok(Some(normalize::normalize_listing(&raw))),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn listing_media(&self, listing_id: &str) -> ApiResult<Vec<String>> {
        let raw = self
            .get_json(&format!("/listings/{}/media", listing_id), &[], None)
            .await?;
        Ok(normalize::normalize_media(&raw))
    }

    async fn listing_open_houses(&self, listing_id: &str) -> ApiResult<Vec<OpenHouse>> {
        let raw = self
            .get_json(&format!("/listings/{}/open/houses", listing_id), &[], None)
            .await?;
        Ok(normalize::normalize_open_houses(&raw))
    }

    async fn latest_open_houses(&self, page: Page) -> ApiResult<Vec<OpenHouse>> {
        let raw = self
            .get_json("/listings/open/houses", &Self::page_pairs(page), None)
            .await?;
        Ok(normalize::normalize_open_houses(&raw))
    }

    async fn autocomplete(&self, term: &str) -> ApiResult<Vec<String>> {
        let query = [("search_term".to_string(), term.to_string())];
        let raw = self
            .get_json("/listings/autocomplete", &query, None)
            .await?;
        Ok(normalize::normalize_suggestions(&raw, usize::MAX))
    }

    async fn saved_listings(&self, identity: &Identity) -> ApiResult<Vec<String>> {
        let path = format!("/users/{}/saved-listings", identity.user_id);
        let raw = self
            .get_json(&path, &[], Some(&identity.credential))
            .await?;
        Ok(normalize::normalize_saved_listing_ids(&raw))
    }

    async fn save_listing(&self, identity: &Identity, listing_id: &str) -> ApiResult<()> {
        let path = format!("/users/{}/saved-listings", identity.user_id);
        let request = self
            .client
            .post(self.url(&path))
            .bearer_auth(identity.credential.as_str())
            .json(&json!({ "listing_id": listing_id }));
        self.send(&path, request).await?;
        Ok(())
    }

    async fn delete_saved_listing(&self, identity: &Identity, listing_id: &str) -> ApiResult<()> {
        let path = format!("/users/{}/saved-listings/{}", identity.user_id, listing_id);
        let request = self
            .client
            .delete(self.url(&path))
            .bearer_auth(identity.credential.as_str());
        self.send(&path, request).await?;
        Ok(())
    }

    async fn saved_searches(&self, identity: &Identity, page: Page) -> ApiResult<Vec<SavedSearch>> {
        let path = format!("/users/{}/searches", identity.user_id);
        let raw = self
            .get_json(&path, &Self::page_pairs(page), Some(&identity.credential))
            .await?;
        Ok(normalize::normalize_saved_searches(&raw))
    }

    async fn create_saved_search(
        &self,
        identity: &Identity,
        search: &NewSavedSearch,
    ) -> ApiResult<SavedSearch> {
        let path = format!("/users/{}/searches", identity.user_id);
        let request = self
            .client
            .post(self.url(&path))
            .bearer_auth(identity.credential.as_str())
            .json(search);
        let response = self.send(&path, request).await?;
        let raw = Self::read_json(response).await?;
        Ok(normalize::normalize_saved_search(&raw))
    }

    async fn delete_saved_search(&self, identity: &Identity, search_id: &str) -> ApiResult<()> {
        let path = format!("/users/{}/searches/{}", identity.user_id, search_id);
        let request = self
            .client
            .delete(self.url(&path))
            .bearer_auth(identity.credential.as_str());
        self.send(&path, request).await?;
        Ok(())
    }

    async fn login(&self, username: &str, password: &str) -> ApiResult<Credential> {
        let request = self
            .client
            .post(self.url("/token"))
            .form(&[("username", username), ("password", password)]);
        let response = self.send("/token", request).await?;
        let raw = Self::read_json(response).await?;
        normalize::normalize_token(&raw)
            .ok_or_else(|| ApiError::Decode("token response has no access_token".to_string()))
    }

    async fn current_user(&self, credential: &Credential) -> ApiResult<Identity> {
        let raw = self.get_json("/users/me", &[], Some(credential)).await?;
        normalize::normalize_identity(&raw, credential.clone())
            .ok_or_else(|| ApiError::Decode("user has no numeric user_id".to_string()))
    }
}
