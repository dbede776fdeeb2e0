//! Persistent holder of the current session.
//!
//! The [`TokenStore`] maps a [`Session`] onto three slots of a
//! [`SlotStorage`], named after the configured [`StorageNamespace`]:
//!
//! | Slot                    | Content                          |
//! |-------------------------|----------------------------------|
//! | `{ns}_access_token`     | access token                     |
//! | `{ns}_refresh_token`    | refresh token                    |
//! | `{ns}_user`             | cached identity as JSON          |
//!
//! # Example
//!
//! ```rust
//! use chirp_sdk::{Credentials, TokenStore};
//!
//! let store = TokenStore::in_memory();
//! store
//!     .save(&Credentials::new("a1", Some("r1".to_string())), None)
//!     .unwrap();
//!
//! store.update_tokens("a2", None).unwrap();
//! assert_eq!(store.access_token().as_deref(), Some("a2"));
//! assert_eq!(store.refresh_token().as_deref(), Some("r1"));
//!
//! store.clear().unwrap();
//! assert!(!store.load().is_authenticated());
//! ```
//!
//! # Session Generations
//!
//! Every [`TokenStore::save`] and [`TokenStore::clear`] starts a new
//! [`SessionGeneration`]. Work that outlives a single call, such as a token
//! refresh, captures the generation first and writes back with one of the
//! `*_if_current` methods, which do nothing once the session was replaced.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::auth::session::{Credentials, Session, UserProfile};
use crate::auth::storage::{MemoryStorage, SlotStorage, StorageError};
use crate::config::StorageNamespace;

#[derive(Clone, Debug)]
struct SlotKeys {
    access_token: String,
    refresh_token: String,
    user: String,
}

impl SlotKeys {
    fn for_namespace(namespace: &StorageNamespace) -> Self {
        let ns = namespace.as_ref();
        Self {
            access_token: format!("{ns}_access_token"),
            refresh_token: format!("{ns}_refresh_token"),
            user: format!("{ns}_user"),
        }
    }
}

/// Identifies one logged-in (or logged-out) session of a [`TokenStore`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SessionGeneration(u64);

/// Reads and writes the session held in a [`SlotStorage`].
///
/// Cloning a `TokenStore` yields a handle to the same underlying storage and
/// the same [`SessionGeneration`] counter.
///
/// # Thread Safety
///
/// `TokenStore` is `Send + Sync`; concurrent access is serialized by the
/// storage backend.
#[derive(Clone, Debug)]
pub struct TokenStore {
    storage: Arc<dyn SlotStorage>,
    keys: SlotKeys,
    generation: Arc<Mutex<u64>>,
}

// Verify TokenStore is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<TokenStore>();
};

impl TokenStore {
    /// Creates a store over `storage` using `namespace` for slot names.
    #[must_use]
    pub fn new(storage: Arc<dyn SlotStorage>, namespace: &StorageNamespace) -> Self {
        Self {
            storage,
            keys: SlotKeys::for_namespace(namespace),
            generation: Arc::new(Mutex::new(0)),
        }
    }

    /// Creates a store over fresh [`MemoryStorage`] with the default namespace.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStorage::new()), &StorageNamespace::default())
    }

    /// Returns the slot names used by this store, in
    /// access/refresh/identity order.
    #[must_use]
    pub fn slot_names(&self) -> [&str; 3] {
        [
            self.keys.access_token.as_str(),
            self.keys.refresh_token.as_str(),
            self.keys.user.as_str(),
        ]
    }

    /// Loads the persisted session.
    ///
    /// Never fails. A missing access token yields [`Session::empty`] even if
    /// other slots are populated. A corrupt identity slot loads as `None`.
    /// An unreadable backend yields an empty session.
    #[must_use]
    pub fn load(&self) -> Session {
        let keys = self.slot_names();
        let slots = match self.storage.get_many(&keys) {
            Ok(slots) => slots,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read session storage");
                return Session::empty();
            }
        };
        let [access_token, refresh_token, user] = <[Option<String>; 3]>::try_from(slots)
            .unwrap_or_default()
            .map(|slot| slot.filter(|v| !v.is_empty()));

        let Some(access_token) = access_token else {
            return Session::empty();
        };

        let identity = user.and_then(|raw| {
            serde_json::from_str::<UserProfile>(&raw)
                .map_err(|e| {
                    tracing::warn!(slot = %self.keys.user, error = %e, "Ignoring corrupt stored identity");
                })
                .ok()
        });

        Session::new(Credentials::new(access_token, refresh_token), identity)
    }

    /// Persists credentials and identity, replacing any previous session.
    ///
    /// An absent refresh token or identity removes the corresponding slot.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the session cannot be persisted.
    pub fn save(
        &self,
        credentials: &Credentials,
        identity: Option<&UserProfile>,
    ) -> Result<(), StorageError> {
        let user = identity.map(serde_json::to_string).transpose()?;
        let mut generation = self.lock_generation();
        self.write(&[
            (&self.keys.access_token, Some(credentials.access_token.clone())),
            (&self.keys.refresh_token, credentials.refresh_token.clone()),
            (&self.keys.user, user),
        ])?;
        *generation += 1;
        Ok(())
    }

    /// Replaces only the access token.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the token cannot be persisted.
    pub fn update_access_token(&self, access_token: &str) -> Result<(), StorageError> {
        self.write(&[(&self.keys.access_token, Some(access_token.to_string()))])
    }

    /// Replaces the access token and, when given, the refresh token.
    ///
    /// `None` keeps the stored refresh token.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the tokens cannot be persisted.
    pub fn update_tokens(
        &self,
        access_token: &str,
        refresh_token: Option<&str>,
    ) -> Result<(), StorageError> {
        match refresh_token {
            Some(refresh) => self.write(&[
                (&self.keys.access_token, Some(access_token.to_string())),
                (&self.keys.refresh_token, Some(refresh.to_string())),
            ]),
            None => self.update_access_token(access_token),
        }
    }

    /// Removes every slot of the session.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the slots cannot be removed.
    pub fn clear(&self) -> Result<(), StorageError> {
        let mut generation = self.lock_generation();
        self.clear_slots()?;
        *generation += 1;
        Ok(())
    }

    /// Returns the current session generation.
    #[must_use]
    pub fn generation(&self) -> SessionGeneration {
        SessionGeneration(*self.lock_generation())
    }

    /// Like [`TokenStore::update_tokens`], but only while `generation` is
    /// current.
    ///
    /// Returns `false`, writing nothing, if the session was saved or cleared
    /// since `generation` was taken.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the tokens cannot be persisted.
    pub fn update_tokens_if_current(
        &self,
        generation: SessionGeneration,
        access_token: &str,
        refresh_token: Option<&str>,
    ) -> Result<bool, StorageError> {
        let current = self.lock_generation();
        if *current != generation.0 {
            return Ok(false);
        }
        self.update_tokens(access_token, refresh_token)?;
        Ok(true)
    }

    /// Replaces the cached identity of a live session, only while
    /// `generation` is current.
    ///
    /// Returns `false`, writing nothing, if the session was replaced or no
    /// access token is stored. Tokens are left untouched.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the identity cannot be persisted.
    pub fn update_identity_if_current(
        &self,
        generation: SessionGeneration,
        identity: &UserProfile,
    ) -> Result<bool, StorageError> {
        let user = serde_json::to_string(identity)?;
        let current = self.lock_generation();
        if *current != generation.0 || self.access_token().is_none() {
            return Ok(false);
        }
        self.write(&[(&self.keys.user, Some(user))])?;
        Ok(true)
    }

    /// Clears the session only while `generation` is current.
    ///
    /// Returns `false`, removing nothing, if the session was replaced.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the slots cannot be removed.
    pub fn clear_if_current(&self, generation: SessionGeneration) -> Result<bool, StorageError> {
        let mut current = self.lock_generation();
        if *current != generation.0 {
            return Ok(false);
        }
        self.clear_slots()?;
        *current += 1;
        Ok(true)
    }

    /// Returns the stored access token.
    #[must_use]
    pub fn access_token(&self) -> Option<String> {
        self.read_slot(&self.keys.access_token)
    }

    /// Returns the stored refresh token.
    #[must_use]
    pub fn refresh_token(&self) -> Option<String> {
        self.read_slot(&self.keys.refresh_token)
    }

    /// Returns the cached identity.
    #[must_use]
    pub fn identity(&self) -> Option<UserProfile> {
        self.load().identity
    }

    fn clear_slots(&self) -> Result<(), StorageError> {
        self.write(&[
            (&self.keys.access_token, None),
            (&self.keys.refresh_token, None),
            (&self.keys.user, None),
        ])
    }

    fn lock_generation(&self) -> MutexGuard<'_, u64> {
        self.generation.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn read_slot(&self, key: &str) -> Option<String> {
        match self.storage.get(key) {
            Ok(value) => value.filter(|v| !v.is_empty()),
            Err(e) => {
                tracing::warn!(slot = key, error = %e, "Failed to read session storage");
                None
            }
        }
    }

    fn write(&self, changes: &[(&String, Option<String>)]) -> Result<(), StorageError> {
        let changes: Vec<_> = changes
            .iter()
            .map(|(key, value)| (key.as_str(), value.clone()))
            .collect();
        self.storage.write(&changes).map_err(|e| {
            tracing::warn!(error = %e, "Failed to persist session");
            e
        })
    }
}
