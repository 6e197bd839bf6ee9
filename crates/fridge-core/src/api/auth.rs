//! Unauthenticated credential exchanges with the `/auth` endpoints.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::auth::TokenPair;
use crate::models::ApiErrorResponse;

use super::ApiError;

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Debug, Serialize)]
struct RegisterRequest<'a> {
    username: &'a str,
    password: &'a str,
    #[serde(rename = "passwordConfirmation")]
    password_confirmation: &'a str,
}

#[derive(Debug, Serialize)]
struct RefreshRequest<'a> {
    #[serde(rename = "refreshToken")]
    refresh_token: &'a str,
}

#[derive(Debug, Deserialize)]
struct AuthResponse {
    tokens: Option<AuthTokens>,
}

#[derive(Debug, Deserialize)]
struct AuthTokens {
    #[serde(rename = "accessToken")]
    access_token: Option<String>,
    #[serde(rename = "refreshToken")]
    refresh_token: Option<String>,
}

/// Client for the login, register and refresh endpoints.
///
/// These calls never carry a bearer token and are never retried, so the
/// refresh coordinator can use them without re-entering the interceptor.
#[derive(Clone)]
pub struct AuthApi {
    client: Client,
    base_url: String,
}

impl AuthApi {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<TokenPair, ApiError> {
        self.exchange("/auth/login", &LoginRequest { username, password })
            .await
    }

    pub async fn register(
        &self,
        username: &str,
        password: &str,
        password_confirmation: &str,
    ) -> Result<TokenPair, ApiError> {
        let body = RegisterRequest {
            username,
            password,
            password_confirmation,
        };
        self.exchange("/auth/register", &body).await
    }

    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, ApiError> {
        self.exchange("/auth/refresh", &RefreshRequest { refresh_token })
            .await
    }

    async fn exchange<B: Serialize>(&self, path: &str, body: &B) -> Result<TokenPair, ApiError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(url = %url, "Sending credential exchange");

        let response = self.client.post(&url).json(body).send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(ApiError::from_status(status, &text));
        }
        parse_token_response(&text)
    }
}

/// Validate an auth payload: reject application errors, then require both
/// tokens to be present and non-empty.
pub(crate) fn parse_token_response(text: &str) -> Result<TokenPair, ApiError> {
    let body: Value = serde_json::from_str(text)
        .map_err(|e| ApiError::InvalidResponse(format!("Malformed auth response: {}", e)))?;

    if let Some(app_error) = ApiErrorResponse::detect(&body) {
        return Err(ApiError::Application(app_error.message));
    }

    let parsed: AuthResponse = serde_json::from_value(body)
        .map_err(|e| ApiError::InvalidResponse(format!("Malformed auth response: {}", e)))?;

    match parsed.tokens {
        Some(AuthTokens {
            access_token: Some(access),
            refresh_token: Some(refresh),
        }) if !access.is_empty() && !refresh.is_empty() => Ok(TokenPair::new(access, refresh)),
        _ => Err(ApiError::InvalidResponse(
            "Response missing tokens structure".to_string(),
        )),
    }
}
