use crate::api::ListingsApi;
use crate::error::{ApiError, ApiResult};
use crate::models::{Credential, Identity};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

pub const SESSION_EXPIRED: &str = "Session expired. Please log in again.";
pub const LOGIN_FAILED: &str = "Could not log in.";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuthState {
    pub identity: Option<Identity>,
    pub loading: bool,
    pub error: Option<String>,
}

/// Owns the credential and the identity it resolves to
pub struct AuthSession {
    api: Arc<dyn ListingsApi>,
    state: watch::Sender<AuthState>,
    attempt: AtomicU64,
}

impl AuthSession {
    pub fn new(api: Arc<dyn ListingsApi>) -> Self {
        let (state, _) = watch::channel(AuthState::default());
        Self {
            api,
            state,
            attempt: AtomicU64::new(0),
        }
    }

    pub fn state(&self) -> AuthState {
        self.state.borrow().clone()
    }

    pub fn identity(&self) -> Option<Identity> {
        self.state.borrow().identity.clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    /// Exchange username and password for a credential, then resolve it.
    ///
    /// Ends with [`ApiError::Cancelled`] when a later login or logout
    /// happened meanwhile; the state is then left to that newer call.
    pub async fn login(&self, username: &str, password: &str) -> ApiResult<Identity> {
        let attempt = self.begin();
        info!("Logging in as {}", username);

        let credential = match self.api.login(username, password).await {
            Ok(credential) => credential,
            Err(e) => {
                warn!("Login failed: {}", e);
                return self.finish(attempt, Err(e), LOGIN_FAILED);
            }
        };

        let result = self.api.current_user(&credential).await;
        if let Err(e) = &result {
            warn!("Could not resolve user after login: {}", e);
        }
        self.finish(attempt, result, LOGIN_FAILED)
    }

    /// Resolve a stored credential. A rejected credential clears the
    /// session and asks the user to log in again.
    pub async fn restore(&self, credential: Credential) -> ApiResult<Identity> {
        let attempt = self.begin();

        let result = self.api.current_user(&credential).await;
        match &result {
            Ok(identity) => info!("Restored session for user {}", identity.user_id),
            Err(e) => warn!("Stored credential no longer valid: {}", e),
        }
        self.finish(attempt, result, SESSION_EXPIRED)
    }

    pub fn logout(&self) {
        self.attempt.fetch_add(1, Ordering::SeqCst);
        self.state.send_replace(AuthState::default());
        info!("Logged out");
    }

    fn begin(&self) -> u64 {
        let attempt = self.attempt.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.send_modify(|state| {
            state.loading = true;
            state.error = None;
        });
        attempt
    }

    /// Record the result of `attempt` unless a later login or logout
    /// happened meanwhile, in which case the caller gets `Cancelled`
    fn finish(
        &self,
        attempt: u64,
        result: ApiResult<Identity>,
        failure_message: &str,
    ) -> ApiResult<Identity> {
        let (identity, error) = match &result {
            Ok(identity) => (Some(identity.clone()), None),
            Err(_) => (None, Some(failure_message.to_string())),
        };
        let current = self.state.send_if_modified(|state| {
            if self.attempt.load(Ordering::SeqCst) != attempt {
                return false;
            }
            *state = AuthState {
                identity,
                loading: false,
                error,
            };
            true
        });

        if current {
            result
        } else {
            debug!("Dropping result of superseded login #{}", attempt);
            Err(ApiError::Cancelled)
        }
    }
}
