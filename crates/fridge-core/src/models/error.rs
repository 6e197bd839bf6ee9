use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Application error code used by the backend for failed operations.
pub const APPLICATION_ERROR_CODE: i64 = 1;

/// Error payload returned by the backend instead of the expected body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    pub message: String,
    pub code: i64,
}

impl ApiErrorResponse {
    /// Recognize an application error in a decoded response body.
    ///
    /// Only bodies whose `code` is a number equal to 1 qualify; a missing
    /// or non-string `message` is tolerated and reported as empty.
    pub fn detect(body: &Value) -> Option<Self> {
        let code = body.get("code")?.as_i64()?;
        if code != APPLICATION_ERROR_CODE {
            return None;
        }
        let message = body
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        Some(Self { message, code })
    }
}
