//! Session state and authenticated dispatch for the Chirp SDK.
//!
//! This module owns everything between "a caller wants a resource" and "a
//! transport sends bytes": where the session is kept, how expired access
//! tokens are renewed, and how failures are reported.
//!
//! # Overview
//!
//! - [`Session`], [`Credentials`], [`UserProfile`]: The persisted session
//! - [`TokenStore`]: Reads and writes the session in a [`SlotStorage`]
//! - [`MemoryStorage`], [`FileStorage`]: Storage backends
//! - [`RefreshCoordinator`]: Single-flight token renewal
//! - [`SessionGateway`]: Bearer attachment, renewal on `401`, single replay
//! - [`GatewayError`]: The error taxonomy seen by callers
//!
//! # Renewal
//!
//! Access tokens expire quickly. When a request is rejected with `401`, the
//! gateway renews the token with the stored refresh token and replays the
//! request once. Concurrent rejections share one renewal:
//!
//! ```rust,ignore
//! let gateway = Arc::new(SessionGateway::new(transport, store));
//!
//! // Five concurrent requests with an expired token produce one refresh call.
//! let results = futures::future::join_all((0..5).map(|_| gateway.send(&request))).await;
//! ```
//!
//! # Example
//!
//! ```rust
//! use chirp_sdk::{Credentials, TokenStore};
//!
//! let store = TokenStore::in_memory();
//! store.save(&Credentials::new("access", Some("refresh".into())), None).unwrap();
//! assert!(store.load().is_authenticated());
//! ```

mod gateway;
mod refresh;
pub mod session;
mod storage;
mod token_store;

pub use gateway::{GatewayError, SessionExpiredHook, SessionGateway};
pub use refresh::{RefreshCoordinator, RefreshOutcome};
pub use session::{Credentials, Session, UserProfile};
pub use storage::{FileStorage, MemoryStorage, SlotChange, SlotStorage, StorageError};
pub use token_store::{SessionGeneration, TokenStore};
