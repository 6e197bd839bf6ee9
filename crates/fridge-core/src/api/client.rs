//! API client for communicating with the Fridge Tracker REST API.
//!
//! This module provides the `ApiClient` struct, which sends every request
//! with the session's current bearer token and recovers from an expired
//! token by refreshing once and replaying the request.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{header, Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::auth::{RefreshCoordinator, SessionStore, TokenPair};
use crate::config::Config;
use crate::models::ApiErrorResponse;

use super::{ApiError, AuthApi, RequestContext, RequestSpec};

// ============================================================================
// Constants
// ============================================================================

/// Maximum number of retries for rate-limited (429) requests.
const MAX_RATE_LIMIT_RETRIES: u32 = 3;

/// Initial backoff delay in milliseconds for rate limiting.
const INITIAL_BACKOFF_MS: u64 = 1000;

/// Authenticated API client.
/// Clone is cheap - reqwest::Client and the session are shared.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    session: Arc<SessionStore>,
    auth: AuthApi,
    refresher: RefreshCoordinator,
    rate_limit_backoff: Duration,
}

impl ApiClient {
    /// Create a client for the configured backend.
    pub fn new(config: &Config, session: Arc<SessionStore>) -> Result<Self, ApiError> {
        let client = Client::builder().timeout(config.request_timeout()).build()?;
        Ok(Self::with_client(client, &config.api_base_url, session))
    }

    /// Create a client around an existing connection pool.
    pub fn with_client(client: Client, base_url: &str, session: Arc<SessionStore>) -> Self {
        let base_url = base_url.trim_end_matches('/').to_string();
        let auth = AuthApi::new(client.clone(), base_url.clone());
        let refresher = RefreshCoordinator::new(Arc::clone(&session), auth.clone());
        Self {
            client,
            base_url,
            session,
            auth,
            refresher,
            rate_limit_backoff: Duration::from_millis(INITIAL_BACKOFF_MS),
        }
    }

    /// Override the first 429 backoff delay; later retries double it.
    pub fn with_rate_limit_backoff(mut self, backoff: Duration) -> Self {
        self.rate_limit_backoff = backoff;
        self
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    pub fn refresher(&self) -> &RefreshCoordinator {
        &self.refresher
    }

    // ===== Session Operations =====

    /// Log in and install the returned credentials in the session.
    ///
    /// Only the backend call can fail this; a session that cannot be
    /// persisted is still installed for this process and logged.
    pub async fn login(&self, username: &str, password: &str) -> Result<(), ApiError> {
        let pair = self.auth.login(username, password).await?;
        self.install_session(username, pair);
        info!(username, "Logged in");
        Ok(())
    }

    /// Create an account; the backend logs the new user in directly.
    pub async fn register(
        &self,
        username: &str,
        password: &str,
        password_confirmation: &str,
    ) -> Result<(), ApiError> {
        let pair = self
            .auth
            .register(username, password, password_confirmation)
            .await?;
        self.install_session(username, pair);
        info!(username, "Registered and logged in");
        Ok(())
    }

    fn install_session(&self, username: &str, pair: TokenPair) {
        if let Err(err) = self.session.set_username(username) {
            warn!(error = %err, "Failed to persist username");
        }
        if let Err(err) = self.session.login(pair) {
            warn!(error = %err, "Failed to persist session, it will not survive a restart");
        }
    }

    /// Tell the backend the session is over, then clear it locally.
    /// The local session is cleared even if the backend call fails.
    pub async fn logout(&self) {
        if self.session.is_authenticated() {
            if let Err(err) = self.send(&RequestSpec::post("/auth/logout")).await {
                warn!(error = %err, "Backend logout failed");
            }
        }
        self.session.logout();
    }

    // ===== Request Execution =====

    /// Send a request, refreshing the credential and replaying once on
    /// 401/403. Returns the successful response or the final error.
    pub async fn execute(&self, spec: &RequestSpec) -> Result<Response, ApiError> {
        self.execute_with(spec, RequestContext::new()).await
    }

    pub(crate) async fn execute_with(
        &self,
        spec: &RequestSpec,
        mut ctx: RequestContext,
    ) -> Result<Response, ApiError> {
        loop {
            let token = match ctx.credential() {
                Some(token) => Some(token.to_string()),
                None => self.session.access_token(),
            };
            let response = self.dispatch(spec, token.as_deref()).await?;
            let status = response.status();

            if !is_auth_failure(status) {
                return Self::check_response(response).await;
            }
            if ctx.is_retry() {
                debug!(path = spec.path(), status = %status, "Authorization failed after refresh, giving up");
                return Self::check_response(response).await;
            }

            let body = response.text().await.unwrap_or_default();
            debug!(path = spec.path(), status = %status, "Authorization failed, refreshing credentials");

            match self.refresher.refresh().await {
                Ok(fresh) => ctx = ctx.retry_with(fresh),
                Err(err) => {
                    warn!(path = spec.path(), error = %err, "Credential refresh failed");
                    return Err(ApiError::from_status(status, &body));
                }
            }
        }
    }

    /// Send a request and decode its JSON body.
    pub async fn fetch<T: DeserializeOwned>(&self, spec: &RequestSpec) -> Result<T, ApiError> {
        let response = self.execute(spec).await?;
        let text = response.text().await?;
        decode_body(spec.path(), &text)
    }

    /// Send a request whose response body carries no data.
    pub async fn send(&self, spec: &RequestSpec) -> Result<(), ApiError> {
        let response = self.execute(spec).await?;
        let text = response.text().await?;
        if let Ok(value) = serde_json::from_str::<Value>(&text) {
            if let Some(app_error) = ApiErrorResponse::detect(&value) {
                return Err(ApiError::Application(app_error.message));
            }
        }
        Ok(())
    }

    /// One attempt at the wire, backing off on 429.
    async fn dispatch(&self, spec: &RequestSpec, token: Option<&str>) -> Result<Response, ApiError> {
        let url = format!("{}{}", self.base_url, spec.path());
        let mut retries = 0;
        let mut backoff = self.rate_limit_backoff;

        loop {
            let mut request = self.client.request(spec.method().clone(), &url);
            if let Some(token) = token {
                request = request.header(header::AUTHORIZATION, format!("Bearer {}", token));
            }
            if let Some(body) = spec.body() {
                request = request.json(body);
            }

            debug!(method = %spec.method(), url = %url, authenticated = token.is_some(), "Sending request");
            let response = request.send().await?;

            if response.status() != StatusCode::TOO_MANY_REQUESTS || retries >= MAX_RATE_LIMIT_RETRIES {
                return Ok(response);
            }

            retries += 1;
            warn!(url = %url, retry = retries, backoff_ms = backoff.as_millis() as u64, "Rate limited, backing off");
            tokio::time::sleep(backoff).await;
            backoff *= 2; // Exponential backoff
        }
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: Response) -> Result<Response, ApiError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }
}

fn is_auth_failure(status: StatusCode) -> bool {
    status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN
}

/// Decode a successful body, surfacing application errors first.
fn decode_body<T: DeserializeOwned>(path: &str, text: &str) -> Result<T, ApiError> {
    let value: Value = serde_json::from_str(text).map_err(|e| {
        ApiError::InvalidResponse(format!("Failed to parse JSON response from {}: {}", path, e))
    })?;
    if let Some(app_error) = ApiErrorResponse::detect(&value) {
        return Err(ApiError::Application(app_error.message));
    }
    serde_json::from_value(value).map_err(|e| {
        ApiError::InvalidResponse(format!("Unexpected response shape from {}: {}", path, e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Item;

    #[test]
    fn test_is_auth_failure() {
        assert!(is_auth_failure(StatusCode::UNAUTHORIZED));
        assert!(is_auth_failure(StatusCode::FORBIDDEN));
        assert!(!is_auth_failure(StatusCode::NOT_FOUND));
        assert!(!is_auth_failure(StatusCode::OK));
    }

    #[test]
    fn test_decode_body() {
        let items: Vec<Item> =
            decode_body("/items", r#"[{"id":"1","name":"Milk","createdOn":"2025-01-01"}]"#).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name, "Milk");

        let err = decode_body::<Vec<Item>>("/items", r#"{"message":"Not allowed","code":1}"#).unwrap_err();
        assert!(matches!(err, ApiError::Application(ref m) if m == "Not allowed"));

        let err = decode_body::<Vec<Item>>("/items", "").unwrap_err();
        assert!(matches!(err, ApiError::InvalidResponse(_)));
    }
}
