//! In-memory backend for driving the sync layer in tests.

#![allow(dead_code)]

use async_trait::async_trait;
use housing_sync::codec::{NewSavedSearch, Page, QueryPairs};
use housing_sync::models::{Credential, Identity, OpenHouse, Property, SavedSearch};
use housing_sync::normalize::normalize_listing;
use housing_sync::{ApiError, ApiResult, ListingsApi};
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;

pub fn property(id: &str, address: &str) -> Property {
    normalize_listing(&json!({ "id": id, "street_address": address, "list_price": 4_500_000 }))
}

pub fn identity(user_id: &str) -> Identity {
    Identity {
        user_id: user_id.to_string(),
        username: Some(format!("user{}", user_id)),
        credential: Credential::new(format!("token-{}", user_id)),
    }
}

pub fn saved_search(id: &str, query: &str) -> SavedSearch {
    SavedSearch {
        id: id.to_string(),
        query: query.to_string(),
        email_alerts_enabled: false,
        filters: None,
        created_at: None,
        updated_at: None,
    }
}

fn param<'a>(params: &'a QueryPairs, key: &str) -> &'a str {
    params
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
        .unwrap_or("")
}

/// Scriptable [`ListingsApi`]. Searches are answered by free text; gates
/// hold a call until the test releases it.
#[derive(Default)]
pub struct FakeApi {
    results: Mutex<HashMap<String, Vec<Property>>>,
    search_gates: Mutex<HashMap<String, oneshot::Receiver<()>>>,
    mutation_gate: Mutex<Option<oneshot::Receiver<()>>>,
    login_gate: Mutex<Option<oneshot::Receiver<()>>>,
    suggestions: Mutex<Vec<String>>,
    saved_listings: Mutex<HashMap<String, Vec<String>>>,
    saved_searches: Mutex<HashMap<String, Vec<SavedSearch>>>,
    users: Mutex<HashMap<String, Identity>>,
    fail_searches: AtomicBool,
    fail_mutations: AtomicBool,
    fail_autocomplete: AtomicBool,
    next_search_id: AtomicU64,
    calls: Mutex<Vec<String>>,
    search_params: Mutex<Vec<QueryPairs>>,
    created: Mutex<Vec<NewSavedSearch>>,
}

impl FakeApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_starting_with(&self, prefix: &str) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| c.starts_with(prefix))
            .collect()
    }

    pub fn search_params(&self) -> Vec<QueryPairs> {
        self.search_params.lock().unwrap().clone()
    }

    pub fn created(&self) -> Vec<NewSavedSearch> {
        self.created.lock().unwrap().clone()
    }

    pub fn set_results(&self, free_text: &str, results: Vec<Property>) {
        self.results
            .lock()
            .unwrap()
            .insert(free_text.to_string(), results);
    }

    /// Hold the next search for `free_text` until the sender fires
    pub fn gate_search(&self, free_text: &str) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.search_gates
            .lock()
            .unwrap()
            .insert(free_text.to_string(), rx);
        tx
    }

    /// Hold the next mutation until the sender fires
    pub fn gate_mutation(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        *self.mutation_gate.lock().unwrap() = Some(rx);
        tx
    }

    /// Hold the next login until the sender fires
    pub fn gate_login(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        *self.login_gate.lock().unwrap() = Some(rx);
        tx
    }

    pub fn set_suggestions(&self, suggestions: &[&str]) {
        *self.suggestions.lock().unwrap() = suggestions.iter().map(|s| s.to_string()).collect();
    }

    pub fn set_saved_listings(&self, user_id: &str, ids: &[&str]) {
        self.saved_listings.lock().unwrap().insert(
            user_id.to_string(),
            ids.iter().map(|s| s.to_string()).collect(),
        );
    }

    pub fn set_saved_searches(&self, user_id: &str, searches: Vec<SavedSearch>) {
        self.saved_searches
            .lock()
            .unwrap()
            .insert(user_id.to_string(), searches);
    }

    /// Accept `credential` for `identity` on `/users/me`
    pub fn add_user(&self, identity: Identity) {
        self.users
            .lock()
            .unwrap()
            .insert(identity.credential.as_str().to_string(), identity);
    }

    pub fn fail_searches(&self, fail: bool) {
        self.fail_searches.store(fail, Ordering::SeqCst);
    }

    pub fn fail_mutations(&self, fail: bool) {
        self.fail_mutations.store(fail, Ordering::SeqCst);
    }

    pub fn fail_autocomplete(&self, fail: bool) {
        self.fail_autocomplete.store(fail, Ordering::SeqCst);
    }

    async fn mutation_result(&self) -> ApiResult<()> {
        let gate = self.mutation_gate.lock().unwrap().take();
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        if self.fail_mutations.load(Ordering::SeqCst) {
            Err(ApiError::Status {
                status: 500,
                path: "/users".to_string(),
            })
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl ListingsApi for FakeApi {
    async fn search_listings(&self, params: &QueryPairs) -> ApiResult<Vec<Property>> {
        let free_text = param(params, "free_text_search").to_string();
        self.record(format!("search {}", free_text));
        self.search_params.lock().unwrap().push(params.clone());

        let gate = self.search_gates.lock().unwrap().remove(&free_text);
        if let Some(gate) = gate {
            let _ = gate.await;
        }

        if self.fail_searches.load(Ordering::SeqCst) {
            return Err(ApiError::Status {
                status: 503,
                path: "/listings".to_string(),
            });
        }
        Ok(self
            .results
            .lock()
            .unwrap()
            .get(&free_text)
            .cloned()
            .unwrap_or_default())
    }

    async fn listing(&self, listing_id: &str) -> ApiResult<Option<Property>> {
        self.record(format!("listing {}", listing_id));
        Ok(self
            .results
            .lock()
            .unwrap()
            .values()
            .flatten()
            .find(|p| p.id == listing_id)
            .cloned())
    }

    async fn listing_media(&self, listing_id: &str) -> ApiResult<Vec<String>> {
        self.record(format!("media {}", listing_id));
        Ok(Vec::new())
    }

    async fn listing_open_houses(&self, listing_id: &str) -> ApiResult<Vec<OpenHouse>> {
        self.record(format!("open_houses {}", listing_id));
        Err(ApiError::Status {
            status: 500,
            path: format!("/listings/{}/open/houses", listing_id),
        })
    }

    async fn latest_open_houses(&self, _page: Page) -> ApiResult<Vec<OpenHouse>> {
        Ok(Vec::new())
    }

    async fn autocomplete(&self, term: &str) -> ApiResult<Vec<String>> {
        self.record(format!("autocomplete {}", term));
        if self.fail_autocomplete.load(Ordering::SeqCst) {
            return Err(ApiError::Status {
                status: 500,
                path: "/listings/autocomplete".to_string(),
            });
        }
        Ok(self.suggestions.lock().unwrap().clone())
    }

    async fn saved_listings(&self, identity: &Identity) -> ApiResult<Vec<String>> {
        self.record(format!("saved_listings {}", identity.user_id));
        Ok(self
            .saved_listings
            .lock()
            .unwrap()
            .get(&identity.user_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn save_listing(&self, identity: &Identity, listing_id: &str) -> ApiResult<()> {
        self.record(format!("save_listing {}/{}", identity.user_id, listing_id));
        self.mutation_result().await
    }

    async fn delete_saved_listing(&self, identity: &Identity, listing_id: &str) -> ApiResult<()> {
        self.record(format!("delete_saved_listing {}/{}", identity.user_id, listing_id));
        self.mutation_result().await
    }

    async fn saved_searches(&self, identity: &Identity, _page: Page) -> ApiResult<Vec<SavedSearch>> {
        self.record(format!("saved_searches {}", identity.user_id));
        Ok(self
            .saved_searches
            .lock()
            .unwrap()
            .get(&identity.user_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn create_saved_search(
        &self,
        identity: &Identity,
        search: &NewSavedSearch,
    ) -> ApiResult<SavedSearch> {
        self.record(format!("create_saved_search {}", identity.user_id));
        self.created.lock().unwrap().push(search.clone());
        self.mutation_result().await?;
        let id = self.next_search_id.fetch_add(1, Ordering::SeqCst) + 100;
        Ok(saved_search(&id.to_string(), &search.query))
    }

    async fn delete_saved_search(&self, identity: &Identity, search_id: &str) -> ApiResult<()> {
        self.record(format!("delete_saved_search {}/{}", identity.user_id, search_id));
        self.mutation_result().await
    }

    async fn login(&self, username: &str, password: &str) -> ApiResult<Credential> {
        self.record(format!("login {}", username));
        let gate = self.login_gate.lock().unwrap().take();
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        let found = self
            .users
            .lock()
            .unwrap()
            .values()
            .find(|i| i.username.as_deref() == Some(username) && password == "secret")
            .map(|i| i.credential.clone());
        found.ok_or(ApiError::Unauthorized)
    }

    async fn current_user(&self, credential: &Credential) -> ApiResult<Identity> {
        self.record("current_user".to_string());
        self.users
            .lock()
            .unwrap()
            .get(credential.as_str())
            .cloned()
            .ok_or(ApiError::Unauthorized)
    }
}
