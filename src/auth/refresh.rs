//! Single-flight coordination of access token renewal.
//!
//! When several requests observe an expired access token at once, exactly
//! one of them (the initiator) performs the refresh; the others queue behind
//! it and are released, in the order they queued, with the same outcome.
//!
//! # State Machine
//!
//! ```text
//!            renew() while Idle
//!   Idle  ------------------------->  Refreshing { waiters }
//!    ^                                     |
//!    |     refresh settled, or initiator   |  renew() while Refreshing:
//!    +---- dropped before settling --------+  waiter queued
//! ```
//!
//! The state lives behind a [`std::sync::Mutex`] that is never held across
//! an `.await`.

use std::future::Future;
use std::sync::{Mutex, PoisonError};

use tokio::sync::oneshot;

use crate::auth::token_store::TokenStore;

/// The result of a renewal, shared by the initiator and every waiter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// A new access token is available.
    Renewed(String),
    /// The session could not be renewed and has been cleared.
    Expired,
}

#[derive(Debug, Default)]
enum CoordinatorState {
    #[default]
    Idle,
    Refreshing {
        waiters: Vec<oneshot::Sender<RefreshOutcome>>,
    },
}

enum Role {
    Initiator,
    Waiter(oneshot::Receiver<RefreshOutcome>),
    AlreadySettled(RefreshOutcome),
}

/// Ensures at most one refresh is in flight per session.
///
/// # Example
///
/// ```rust
/// use chirp_sdk::auth::{RefreshCoordinator, RefreshOutcome};
/// use chirp_sdk::{Credentials, TokenStore};
///
/// # tokio_test::block_on(async {
/// let store = TokenStore::in_memory();
/// store.save(&Credentials::new("old", Some("r".into())), None).unwrap();
///
/// let coordinator = RefreshCoordinator::new(store.clone());
/// let outcome = coordinator
///     .renew("old", || async {
///         store.update_access_token("new").unwrap();
///         RefreshOutcome::Renewed("new".to_string())
///     })
///     .await;
///
/// assert_eq!(outcome, RefreshOutcome::Renewed("new".to_string()));
/// assert!(!coordinator.is_refreshing());
/// # });
/// ```
#[derive(Debug)]
pub struct RefreshCoordinator {
    state: Mutex<CoordinatorState>,
    store: TokenStore,
}

// Verify RefreshCoordinator is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<RefreshCoordinator>();
};

impl RefreshCoordinator {
    /// Creates an idle coordinator that reads the current token from `store`.
    #[must_use]
    pub fn new(store: TokenStore) -> Self {
        Self {
            state: Mutex::new(CoordinatorState::Idle),
            store,
        }
    }

    /// Returns `true` while a refresh is in flight.
    #[must_use]
    pub fn is_refreshing(&self) -> bool {
        matches!(*self.lock(), CoordinatorState::Refreshing { .. })
    }

    /// Returns the number of callers queued behind the current refresh.
    #[must_use]
    pub fn waiting(&self) -> usize {
        match &*self.lock() {
            CoordinatorState::Idle => 0,
            CoordinatorState::Refreshing { waiters } => waiters.len(),
        }
    }

    /// Obtains a fresh access token for a caller whose request was rejected
    /// while presenting `stale_token`.
    ///
    /// - If the stored token already differs from `stale_token`, another
    ///   caller has renewed it; that token is returned without refreshing.
    /// - If no token is stored, the session already ended and the outcome is
    ///   [`RefreshOutcome::Expired`] without refreshing.
    /// - If a refresh is in flight, the caller queues and receives its outcome.
    /// - Otherwise the caller becomes the initiator and runs `refresh`. The
    ///   future is expected to update or clear the token store itself.
    ///
    /// If the initiator is dropped before settling, the coordinator returns
    /// to idle and queued callers re-enter `renew`.
    pub async fn renew<F, Fut>(&self, stale_token: &str, refresh: F) -> RefreshOutcome
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = RefreshOutcome>,
    {
        loop {
            match self.begin(stale_token) {
                Role::AlreadySettled(outcome) => {
                    tracing::debug!(?outcome, "Session already settled by another request");
                    return outcome;
                }
                Role::Waiter(rx) => {
                    if let Ok(outcome) = rx.await {
                        return outcome;
                    }
                    tracing::debug!("Refresh initiator went away; re-entering renewal");
                }
                Role::Initiator => break,
            }
        }

        let guard = SettleGuard {
            coordinator: self,
            armed: true,
        };
        let outcome = refresh().await;
        guard.settle(&outcome);
        outcome
    }

    fn begin(&self, stale_token: &str) -> Role {
        let mut state = self.lock();
        match &mut *state {
            CoordinatorState::Refreshing { waiters } => {
                let (tx, rx) = oneshot::channel();
                waiters.push(tx);
                tracing::debug!(queued = waiters.len(), "Queued behind in-flight refresh");
                Role::Waiter(rx)
            }
            CoordinatorState::Idle => {
                match self.store.access_token() {
                    None => return Role::AlreadySettled(RefreshOutcome::Expired),
                    Some(current) if current != stale_token => {
                        return Role::AlreadySettled(RefreshOutcome::Renewed(current));
                    }
                    Some(_) => {}
                }
                *state = CoordinatorState::Refreshing {
                    waiters: Vec::new(),
                };
                Role::Initiator
            }
        }
    }

    fn take_waiters(&self) -> Vec<oneshot::Sender<RefreshOutcome>> {
        let mut state = self.lock();
        match std::mem::take(&mut *state) {
            CoordinatorState::Idle => Vec::new(),
            CoordinatorState::Refreshing { waiters } => waiters,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, CoordinatorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Returns the coordinator to idle on every exit path of the initiator.
struct SettleGuard<'a> {
    coordinator: &'a RefreshCoordinator,
    armed: bool,
}

impl SettleGuard<'_> {
    fn settle(mut self, outcome: &RefreshOutcome) {
        self.armed = false;
        let waiters = self.coordinator.take_waiters();
        tracing::debug!(released = waiters.len(), "Releasing queued requests");
        for waiter in waiters {
            // A waiter that stopped listening is simply skipped
            let _ = waiter.send(outcome.clone());
        }
    }
}

impl Drop for SettleGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            // Dropping the senders wakes every waiter with a closed channel
            drop(self.coordinator.take_waiters());
        }
    }
}
