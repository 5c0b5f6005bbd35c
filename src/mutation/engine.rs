//! Local-first mutations with rollback.
//!
//! A change is applied to the local state synchronously, the remote call is
//! issued afterwards, and the change is reverted if that call fails. The
//! state is scoped to one identity: switching identity clears it and bumps
//! an epoch, so late results from the previous identity are ignored.

use crate::error::ApiError;
use crate::models::Identity;
use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, warn};

/// What happened to a mutation request
#[derive(Debug, Clone, PartialEq)]
pub enum MutationOutcome<T> {
    /// The backend accepted the change; the local state already reflects it
    Committed(T),
    /// The backend rejected the change and the local state was restored
    Reverted { message: String },
    /// Nothing to do: no credential, or the change was a no-op
    Skipped,
}

impl<T> MutationOutcome<T> {
    pub fn is_committed(&self) -> bool {
        matches!(self, MutationOutcome::Committed(_))
    }
}

/// A reversible edit of the local state `S`
pub trait LocalChange<S>: Sized + Send {
    /// What a successful remote call yields
    type Confirmed: Send;

    /// Apply the edit. Returning `false` means nothing changed and no remote
    /// call will be made.
    fn apply(&mut self, state: &mut S) -> bool;

    /// Undo exactly what `apply` did
    fn revert(self, state: &mut S);

    /// Reconcile with the backend's answer
    fn confirm(self, _state: &mut S, _confirmed: &Self::Confirmed) {}
}

struct Scope<S> {
    identity: Option<Identity>,
    epoch: u64,
    state: S,
    last_error: Option<String>,
}

/// Identity-scoped state that is only changed through [`mutate`](Self::mutate),
/// [`reset`](Self::reset) and [`load`](Self::load).
pub struct OptimisticStore<S> {
    label: &'static str,
    scope: Mutex<Scope<S>>,
}

impl<S: Default + Clone + Send> OptimisticStore<S> {
    pub fn new(label: &'static str) -> Self {
        Self {
            label,
            scope: Mutex::new(Scope {
                identity: None,
                epoch: 0,
                state: S::default(),
                last_error: None,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Scope<S>> {
        self.scope.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn snapshot(&self) -> S {
        self.lock().state.clone()
    }

    pub fn read<R>(&self, f: impl FnOnce(&S) -> R) -> R {
        f(&self.lock().state)
    }

    pub fn identity(&self) -> Option<Identity> {
        self.lock().identity.clone()
    }

    /// Current identity and epoch, for loading fresh state
    pub fn scope(&self) -> Option<(Identity, u64)> {
        let scope = self.lock();
        scope.identity.clone().map(|identity| (identity, scope.epoch))
    }

    pub fn last_error(&self) -> Option<String> {
        self.lock().last_error.clone()
    }

    pub fn clear_error(&self) {
        self.lock().last_error = None;
    }

    /// Switch to `identity` and drop all local state, unconditionally.
    /// Returns the new epoch.
    pub fn reset(&self, identity: Option<Identity>) -> u64 {
        let mut scope = self.lock();
        scope.identity = identity;
        scope.epoch += 1;
        scope.state = S::default();
        scope.last_error = None;
        debug!("{} reset, epoch {}", self.label, scope.epoch);
        scope.epoch
    }

    /// Replace the state with a server copy fetched during `epoch`.
    /// Returns `false` (and does nothing) if the identity changed since.
    pub fn load(&self, epoch: u64, state: S) -> bool {
        let mut scope = self.lock();
        if scope.epoch != epoch {
            debug!("Dropping stale {} load from epoch {}", self.label, epoch);
            return false;
        }
        scope.state = state;
        true
    }

    /// Apply `change` now, then run `remote` and revert on failure.
    /// `failure_message` is what the user sees when a change is reverted.
    ///
    /// The local edit happens before this returns; only the remote call
    /// and its bookkeeping happen when the returned future is awaited.
    pub fn mutate<'a, C, F, Fut>(
        &'a self,
        mut change: C,
        failure_message: &'static str,
        remote: F,
    ) -> impl Future<Output = MutationOutcome<C::Confirmed>> + Send + 'a
    where
        C: LocalChange<S> + 'a,
        F: FnOnce(&C, Identity) -> Fut + 'a,
        Fut: Future<Output = Result<C::Confirmed, ApiError>> + Send + 'a,
        S: 'a,
    {
        let started = {
            let mut scope = self.lock();
            match scope.identity.clone() {
                None => {
                    warn!("No credential available, skipping {} change", self.label);
                    None
                }
                Some(identity) => {
                    if change.apply(&mut scope.state) {
                        scope.last_error = None;
                        Some((identity, scope.epoch))
                    } else {
                        debug!("{} change was a no-op", self.label);
                        None
                    }
                }
            }
        };
        let pending = started.map(|(identity, epoch)| (remote(&change, identity), epoch));

        async move {
            let Some((call, epoch)) = pending else {
                return MutationOutcome::Skipped;
            };

            match call.await {
                Ok(confirmed) => {
                    {
                        let mut scope = self.lock();
                        if scope.epoch == epoch {
                            change.confirm(&mut scope.state, &confirmed);
                        }
                    }
                    MutationOutcome::Committed(confirmed)
                }
                Err(e) => {
                    warn!("{} change failed, reverting: {}", self.label, e);
                    {
                        let mut scope = self.lock();
                        if scope.epoch == epoch {
                            change.revert(&mut scope.state);
                            scope.last_error = Some(failure_message.to_string());
                        }
                    }
                    MutationOutcome::Reverted {
                        message: failure_message.to_string(),
                    }
                }
            }
        }
    }
}
