//! Single-flight credential refresh.
//!
//! At most one backend refresh is outstanding at a time. Callers arriving
//! while it runs share its result instead of starting their own, and the
//! shared handle is dropped as soon as the backend call settles so that a
//! later expiry starts a fresh cycle.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::future::{BoxFuture, FutureExt, Shared};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::api::{ApiError, AuthApi};

use super::session::SessionStore;

/// Why a refresh could not produce a new access token.
///
/// Every variant means the session has already been logged out.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RefreshError {
    #[error("No refresh token available")]
    NoRefreshToken,

    #[error("Invalid refresh response: {0}")]
    InvalidResponse(String),

    #[error("Refresh request failed: {0}")]
    Transport(String),
}

impl From<ApiError> for RefreshError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Application(message) | ApiError::InvalidResponse(message) => {
                RefreshError::InvalidResponse(message)
            }
            other => RefreshError::Transport(other.to_string()),
        }
    }
}

type RefreshHandle = Shared<BoxFuture<'static, Result<String, RefreshError>>>;

struct Inner {
    session: Arc<SessionStore>,
    auth: AuthApi,
    in_flight: Mutex<Option<RefreshHandle>>,
}

/// Exchanges the session's refresh token for a new credential pair.
/// Clone is cheap; clones share the in-flight refresh.
#[derive(Clone)]
pub struct RefreshCoordinator {
    inner: Arc<Inner>,
}

impl RefreshCoordinator {
    pub fn new(session: Arc<SessionStore>, auth: AuthApi) -> Self {
        Self {
            inner: Arc::new(Inner {
                session,
                auth,
                in_flight: Mutex::new(None),
            }),
        }
    }

    /// Obtain a new access token, joining a refresh already underway.
    ///
    /// On success the session holds the new pair. On any failure the
    /// session has been logged out.
    pub async fn refresh(&self) -> Result<String, RefreshError> {
        self.acquire().await
    }

    /// Whether a backend refresh is outstanding right now.
    pub fn is_refreshing(&self) -> bool {
        self.inner.slot().is_some()
    }

    /// Return the in-flight handle, creating it if none exists.
    ///
    /// Check and set happen under one lock that is never held across an
    /// await point.
    fn acquire(&self) -> RefreshHandle {
        let mut slot = self.inner.slot();
        if let Some(handle) = slot.as_ref() {
            debug!("Joining in-flight token refresh");
            return handle.clone();
        }

        let inner = Arc::clone(&self.inner);
        // Runs on its own task so the refresh completes even if every waiter is dropped
        let task = tokio::spawn(async move {
            let result = inner.exchange().await;
            inner.slot().take();
            result
        });

        let inner = Arc::clone(&self.inner);
        let handle = async move {
            match task.await {
                Ok(result) => result,
                Err(err) => {
                    warn!(error = %err, "Token refresh task aborted");
                    inner.slot().take();
                    inner.session.logout();
                    Err(RefreshError::Transport(format!("refresh task aborted: {err}")))
                }
            }
        }
        .boxed()
        .shared();

        *slot = Some(handle.clone());
        handle
    }
}

impl Inner {
    fn slot(&self) -> MutexGuard<'_, Option<RefreshHandle>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn exchange(&self) -> Result<String, RefreshError> {
        let Some(refresh_token) = self.session.refresh_token() else {
            warn!("No refresh token in session, logging out");
            self.session.logout();
            return Err(RefreshError::NoRefreshToken);
        };

        info!("Refreshing access token");
        match self.auth.refresh(&refresh_token).await {
            Ok(pair) => {
                let access_token = pair.access_token.clone();
                if let Err(err) = self.session.login(pair) {
                    warn!(error = %err, "Failed to persist refreshed credentials");
                }
                debug!("Token refresh succeeded");
                Ok(access_token)
            }
            Err(err) => {
                let err = RefreshError::from(err);
                warn!(error = %err, "Token refresh failed, logging out");
                self.session.logout();
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::session::TokenPair;
    use crate::auth::storage::MemoryStorage;

    #[test]
    fn test_refresh_error_mapping() {
        assert_eq!(
            RefreshError::from(ApiError::Application("expired".into())),
            RefreshError::InvalidResponse("expired".into())
        );
        assert_eq!(
            RefreshError::from(ApiError::InvalidResponse("missing tokens".into())),
            RefreshError::InvalidResponse("missing tokens".into())
        );
        assert!(matches!(
            RefreshError::from(ApiError::ServerError("boom".into())),
            RefreshError::Transport(_)
        ));
    }

    #[tokio::test]
    async fn test_refresh_without_refresh_token_logs_out() {
        let session = Arc::new(SessionStore::new(MemoryStorage::new()));
        let auth = AuthApi::new(reqwest::Client::new(), "http://127.0.0.1:9");
        let coordinator = RefreshCoordinator::new(Arc::clone(&session), auth);

        assert_eq!(coordinator.refresh().await, Err(RefreshError::NoRefreshToken));
        assert!(!session.is_authenticated());
        assert!(!coordinator.is_refreshing());
    }

    #[tokio::test]
    async fn test_transport_failure_logs_out() {
        let session = Arc::new(SessionStore::new(MemoryStorage::new()));
        session.login(TokenPair::new("a1", "r1")).unwrap();
        // Nothing listens on the discard port
        let auth = AuthApi::new(reqwest::Client::new(), "http://127.0.0.1:9");
        let coordinator = RefreshCoordinator::new(Arc::clone(&session), auth);

        let result = coordinator.refresh().await;
        assert!(matches!(result, Err(RefreshError::Transport(_))));
        assert!(!session.is_authenticated());
        assert!(!coordinator.is_refreshing());
    }
}
