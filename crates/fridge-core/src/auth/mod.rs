//! Authentication module for managing user sessions and credentials.
//!
//! This module provides:
//! - `SessionStore`: the current credential pair, persisted across restarts
//! - `SessionStorage`: pluggable durable key/value backends (file, keychain, memory)
//! - `RefreshCoordinator`: single-flight exchange of the refresh token for a new pair
//!
//! A refresh failure of any kind clears the session.

pub mod credentials;
pub mod refresh;
pub mod session;
pub mod storage;

pub use credentials::KeyringStorage;
pub use refresh::{RefreshCoordinator, RefreshError};
pub use session::{SessionSnapshot, SessionStore, TokenPair, User};
pub use storage::{FileStorage, MemoryStorage, SessionStorage, StorageError};
