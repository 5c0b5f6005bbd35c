//! Debounced location suggestions.
//!
//! Every keystroke supersedes the previous one: its timer and any request
//! it already issued are cancelled, and a superseded request never
//! publishes suggestions.

use crate::api::ListingsApi;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// What became of one keystroke
#[derive(Debug, Clone, PartialEq)]
pub enum SuggestOutcome {
    /// Suggestions were fetched and published
    Ready(Vec<String>),
    /// The input was blank; suggestions were cleared without a request
    Cleared,
    /// A newer keystroke (or `close`) took over before this one finished
    Superseded,
    /// The request failed; suggestions were cleared
    Failed,
}

struct Inner {
    api: Arc<dyn ListingsApi>,
    delay: Duration,
    limit: usize,
    shutdown: CancellationToken,
    current: Mutex<CancellationToken>,
    suggestions: watch::Sender<Vec<String>>,
}

/// Suggestion box state for one text input. Cheap to clone; clones share
/// the same suggestions and cancel each other's requests.
#[derive(Clone)]
pub struct Autocomplete {
    inner: Arc<Inner>,
}

impl Autocomplete {
    pub fn new(api: Arc<dyn ListingsApi>, delay: Duration, limit: usize) -> Self {
        let shutdown = CancellationToken::new();
        let (suggestions, _) = watch::channel(Vec::new());
        Self {
            inner: Arc::new(Inner {
                api,
                delay,
                limit,
                current: Mutex::new(shutdown.child_token()),
                shutdown,
                suggestions,
            }),
        }
    }

    pub fn suggestions(&self) -> Vec<String> {
        self.inner.suggestions.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Vec<String>> {
        self.inner.suggestions.subscribe()
    }

    /// Register a keystroke. The previous keystroke is cancelled right
    /// away; the returned future waits out the delay, then fetches.
    pub fn input(&self, text: &str) -> impl Future<Output = SuggestOutcome> + Send + 'static {
        let inner = Arc::clone(&self.inner);
        let term = text.trim().to_string();
        let token = inner.supersede();

        if term.is_empty() {
            inner.publish(&token, Vec::new());
        }

        async move {
            if term.is_empty() {
                return SuggestOutcome::Cleared;
            }

            tokio::select! {
                biased;
                _ = token.cancelled() => return SuggestOutcome::Superseded,
                _ = tokio::time::sleep(inner.delay) => {}
            }

            debug!("Fetching suggestions for '{}'", term);
            let result = tokio::select! {
                biased;
                _ = token.cancelled() => return SuggestOutcome::Superseded,
                result = inner.api.autocomplete(&term) => result,
            };

            match result {
                Ok(mut found) => {
                    found.truncate(inner.limit);
                    if inner.publish(&token, found.clone()) {
                        SuggestOutcome::Ready(found)
                    } else {
                        SuggestOutcome::Superseded
                    }
                }
                Err(e) if e.is_cancelled() => SuggestOutcome::Superseded,
                Err(e) => {
                    warn!("Autocomplete for '{}' failed: {}", term, e);
                    if inner.publish(&token, Vec::new()) {
                        SuggestOutcome::Failed
                    } else {
                        SuggestOutcome::Superseded
                    }
                }
            }
        }
    }

    /// Cancel whatever is pending and ignore all later input
    pub fn close(&self) {
        self.inner.shutdown.cancel();
    }
}

impl Inner {
    fn current(&self) -> MutexGuard<'_, CancellationToken> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn supersede(&self) -> CancellationToken {
        let mut current = self.current();
        current.cancel();
        *current = self.shutdown.child_token();
        current.clone()
    }

    /// Publish unless `token` has been superseded. The check and the write
    /// happen under the same lock as `supersede`.
    fn publish(&self, token: &CancellationToken, suggestions: Vec<String>) -> bool {
        let _current = self.current();
        if token.is_cancelled() {
            return false;
        }
        self.suggestions.send_replace(suggestions);
        true
    }
}
