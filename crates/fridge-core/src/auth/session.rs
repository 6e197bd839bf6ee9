use std::fmt;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::storage::{SessionStorage, StorageError};

/// Storage key for the serialized credential pair
pub const TOKENS_KEY: &str = "tokens";

/// Storage key for the username shown for the session
pub const USERNAME_KEY: &str = "username";

/// Name shown when a session has credentials but no stored username
const DEFAULT_USERNAME: &str = "User";

/// Access and refresh credentials issued together by the backend.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    #[serde(rename = "accessToken")]
    pub access_token: String,
    #[serde(rename = "refreshToken")]
    pub refresh_token: String,
}

impl TokenPair {
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
        }
    }

    /// Both tokens present and non-empty
    pub fn is_well_formed(&self) -> bool {
        !self.access_token.is_empty() && !self.refresh_token.is_empty()
    }
}

// Tokens never end up in logs
impl fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenPair")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub username: String,
}

/// Read-only view of the session for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub authenticated: bool,
    pub user: Option<User>,
}

#[derive(Default)]
struct SessionState {
    user: Option<User>,
    credentials: Option<TokenPair>,
    // Username recorded by set_username, kept even if persisting it failed
    pending_username: Option<String>,
}

/// Holds the current credential pair and keeps it in durable storage.
///
/// The session is authenticated exactly when a credential pair is held.
/// All reads are synchronous and never touch the network.
pub struct SessionStore {
    storage: Box<dyn SessionStorage>,
    state: RwLock<SessionState>,
}

impl SessionStore {
    /// Create an unauthenticated store; call `restore` to load a saved session.
    pub fn new(storage: impl SessionStorage + 'static) -> Self {
        Self::from_boxed(Box::new(storage))
    }

    pub fn from_boxed(storage: Box<dyn SessionStorage>) -> Self {
        Self {
            storage,
            state: RwLock::new(SessionState::default()),
        }
    }

    /// Load a previously persisted session.
    ///
    /// Returns true when both the credential pair and the username were
    /// found and the pair is well formed. Anything else leaves the session
    /// unauthenticated.
    pub fn restore(&self) -> bool {
        let restored = match self.load_persisted() {
            Ok(restored) => restored,
            Err(err) => {
                warn!(error = %err, "Failed to read persisted session");
                None
            }
        };

        let mut state = self.write_state();
        match restored {
            Some((pair, username)) => {
                info!(username = %username, "Restored session");
                state.credentials = Some(pair);
                state.user = Some(User { username });
                true
            }
            None => {
                debug!("No persisted session to restore");
                *state = SessionState::default();
                false
            }
        }
    }

    fn load_persisted(&self) -> Result<Option<(TokenPair, String)>, StorageError> {
        let Some(raw) = self.storage.get(TOKENS_KEY)? else {
            return Ok(None);
        };
        let Some(username) = self.storage.get(USERNAME_KEY)? else {
            return Ok(None);
        };
        let pair: TokenPair = serde_json::from_str(&raw)?;
        if !pair.is_well_formed() {
            warn!("Persisted credentials are incomplete, ignoring");
            return Ok(None);
        }
        Ok(Some((pair, username)))
    }

    /// Record the username to attach to the next login.
    ///
    /// The name is remembered in memory before it is persisted, so the
    /// next `login` attaches it even when the storage write fails.
    pub fn set_username(&self, username: &str) -> Result<(), StorageError> {
        self.write_state().pending_username = Some(username.to_string());
        self.storage.set(USERNAME_KEY, username)
    }

    /// Install a new credential pair and mark the session authenticated.
    ///
    /// The in-memory session is updated even if persisting fails, so the
    /// pair stays usable for this process; the storage error is returned.
    pub fn login(&self, pair: TokenPair) -> Result<(), StorageError> {
        let pending = self.write_state().pending_username.take();
        let username = match pending {
            Some(name) => name,
            None => match self.storage.get(USERNAME_KEY) {
                Ok(Some(name)) => name,
                Ok(None) => DEFAULT_USERNAME.to_string(),
                Err(err) => {
                    warn!(error = %err, "Failed to read stored username");
                    self.current_username()
                        .unwrap_or_else(|| DEFAULT_USERNAME.to_string())
                }
            },
        };
        let serialized = serde_json::to_string(&pair)?;

        {
            let mut state = self.write_state();
            state.credentials = Some(pair);
            state.user = Some(User {
                username: username.clone(),
            });
        }
        debug!(username = %username, "Session authenticated");

        self.storage.set(TOKENS_KEY, &serialized)?;
        self.storage.set(USERNAME_KEY, &username)?;
        Ok(())
    }

    /// Clear the session and its persisted state. Safe to call repeatedly.
    pub fn logout(&self) {
        let was_authenticated = {
            let mut state = self.write_state();
            let was = state.credentials.is_some();
            *state = SessionState::default();
            was
        };

        for key in [TOKENS_KEY, USERNAME_KEY] {
            if let Err(err) = self.storage.remove(key) {
                warn!(key, error = %err, "Failed to remove persisted session value");
            }
        }

        if was_authenticated {
            info!("Session cleared");
        }
    }

    /// Current access token, or `None` when unauthenticated.
    pub fn access_token(&self) -> Option<String> {
        self.read_state()
            .credentials
            .as_ref()
            .map(|pair| pair.access_token.clone())
    }

    /// Only the refresh coordinator reads the refresh token.
    pub(crate) fn refresh_token(&self) -> Option<String> {
        self.read_state()
            .credentials
            .as_ref()
            .map(|pair| pair.refresh_token.clone())
            .filter(|token| !token.is_empty())
    }

    pub fn is_authenticated(&self) -> bool {
        self.read_state().credentials.is_some()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let state = self.read_state();
        SessionSnapshot {
            authenticated: state.credentials.is_some(),
            user: state.user.clone(),
        }
    }

    fn current_username(&self) -> Option<String> {
        self.read_state().user.as_ref().map(|u| u.username.clone())
    }

    fn read_state(&self) -> RwLockReadGuard<'_, SessionState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, SessionState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::storage::MemoryStorage;

    fn pair(access: &str, refresh: &str) -> TokenPair {
        TokenPair::new(access, refresh)
    }

    #[test]
    fn test_login_then_logout() {
        let store = SessionStore::new(MemoryStorage::new());
        assert!(!store.is_authenticated());
        assert_eq!(store.access_token(), None);

        store.set_username("alice").unwrap();
        store.login(pair("a1", "r1")).unwrap();

        let snapshot = store.snapshot();
        assert!(snapshot.authenticated);
        assert_eq!(snapshot.user.unwrap().username, "alice");
        assert_eq!(store.access_token().as_deref(), Some("a1"));
        assert_eq!(store.refresh_token().as_deref(), Some("r1"));

        store.logout();
        assert!(!store.is_authenticated());
        assert_eq!(store.access_token(), None);
        assert_eq!(store.refresh_token(), None);
        assert_eq!(store.snapshot().user, None);

        // Idempotent
        store.logout();
        assert!(!store.is_authenticated());
    }

    #[test]
    fn test_restore_after_restart() {
        let storage = MemoryStorage::new();
        let first = SessionStore::new(storage.clone());
        first.set_username("bob").unwrap();
        first.login(pair("a1", "r1")).unwrap();
        drop(first);

        let second = SessionStore::new(storage.clone());
        assert!(!second.is_authenticated());
        assert!(second.restore());
        assert!(second.restore(), "restore should be idempotent");
        assert_eq!(second.access_token().as_deref(), Some("a1"));
        assert_eq!(
            second.snapshot(),
            SessionSnapshot {
                authenticated: true,
                user: Some(User {
                    username: "bob".to_string()
                }),
            }
        );
    }

    #[test]
    fn test_login_without_username_uses_default() {
        let storage = MemoryStorage::new();
        let store = SessionStore::new(storage.clone());
        store.login(pair("a1", "r1")).unwrap();
        assert_eq!(store.snapshot().user.unwrap().username, "User");

        let restarted = SessionStore::new(storage);
        assert!(restarted.restore());
    }

    #[test]
    fn test_restore_requires_both_keys() {
        let storage = MemoryStorage::new();
        storage
            .set(TOKENS_KEY, r#"{"accessToken":"a1","refreshToken":"r1"}"#)
            .unwrap();
        let store = SessionStore::new(storage.clone());
        assert!(!store.restore());

        storage.remove(TOKENS_KEY).unwrap();
        storage.set(USERNAME_KEY, "carol").unwrap();
        assert!(!store.restore());
        assert!(!store.is_authenticated());
    }

    #[test]
    fn test_restore_ignores_corrupt_or_partial_pair() {
        let storage = MemoryStorage::new();
        storage.set(USERNAME_KEY, "dave").unwrap();

        storage.set(TOKENS_KEY, "{not json").unwrap();
        let store = SessionStore::new(storage.clone());
        assert!(!store.restore());

        storage
            .set(TOKENS_KEY, r#"{"accessToken":"a1","refreshToken":""}"#)
            .unwrap();
        assert!(!store.restore());
        assert_eq!(store.access_token(), None);
    }

    #[test]
    fn test_logout_erases_persisted_state() {
        let storage = MemoryStorage::new();
        let store = SessionStore::new(storage.clone());
        store.set_username("erin").unwrap();
        store.login(pair("a1", "r1")).unwrap();
        store.logout();

        assert_eq!(storage.get(TOKENS_KEY).unwrap(), None);
        assert_eq!(storage.get(USERNAME_KEY).unwrap(), None);
        assert!(!SessionStore::new(storage).restore());
    }

    /// Reads succeed and find nothing; every write fails.
    struct ReadOnlyStorage;

    impl SessionStorage for ReadOnlyStorage {
        fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
            Ok(None)
        }
        fn set(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
            Err(std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only").into())
        }
        fn remove(&self, _key: &str) -> Result<(), StorageError> {
            Ok(())
        }
    }

    #[test]
    fn test_failed_persist_keeps_session_for_this_process() {
        let store = SessionStore::new(ReadOnlyStorage);
        assert!(store.set_username("frank").is_err());
        assert!(matches!(store.login(pair("a1", "r1")), Err(StorageError::Io(_))));

        assert!(store.is_authenticated());
        assert_eq!(store.access_token().as_deref(), Some("a1"));
        assert_eq!(store.snapshot().user.unwrap().username, "frank");
    }

    #[test]
    fn test_token_pair_debug_is_redacted() {
        let rendered = format!("{:?}", pair("secret-access", "secret-refresh"));
        assert!(!rendered.contains("secret"));
    }
}
