use reqwest::Method;
use serde::Serialize;
use serde_json::Value;

use super::ApiError;

/// Everything needed to (re)build an outgoing request.
#[derive(Debug, Clone)]
pub struct RequestSpec {
    method: Method,
    path: String,
    body: Option<Value>,
}

impl RequestSpec {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Attach a JSON body.
    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self, ApiError> {
        let value = serde_json::to_value(body).map_err(|e| ApiError::Encode(e.to_string()))?;
        self.body = Some(value);
        Ok(self)
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn body(&self) -> Option<&Value> {
        self.body.as_ref()
    }
}

/// Per-attempt state carried alongside a `RequestSpec`.
///
/// The original attempt has no marker and draws its credential from the
/// session. The single replay after a refresh carries the marker and the
/// refreshed token; it is never refreshed again.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    retried: bool,
    credential: Option<String>,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// The replay of this request, authorized with `token`.
    pub(crate) fn retry_with(self, token: String) -> Self {
        Self {
            retried: true,
            credential: Some(token),
        }
    }

    pub fn is_retry(&self) -> bool {
        self.retried
    }

    pub(crate) fn credential(&self) -> Option<&str> {
        self.credential.as_deref()
    }
}
