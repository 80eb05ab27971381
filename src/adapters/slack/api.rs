//! Response envelope shared by every Slack Web API method.

use reqwest::Response;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::ports::TransportError;

/// `{"ok": bool, "error": "...", ...method fields}`
#[derive(Debug, Deserialize)]
pub(crate) struct ApiResponse<T> {
    pub ok: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(flatten)]
    pub body: Option<T>,
}

impl<T> ApiResponse<T> {
    /// The method fields, or the API's error code when `ok` is false.
    pub fn into_result(self) -> Result<T, String> {
        if !self.ok {
            return Err(self.error.unwrap_or_else(|| "unknown_error".to_string()));
        }
        self.body.ok_or_else(|| "missing_fields".to_string())
    }
}

/// Reads a Web API response body, mapping transport and API failures.
pub(crate) async fn read_response<T: DeserializeOwned>(response: Response) -> Result<T, TransportError> {
    let status = response.status();
    if !status.is_success() {
        return Err(TransportError::Http(format!("status {}", status)));
    }

    let body: ApiResponse<T> = response
        .json()
        .await
        .map_err(|e| TransportError::InvalidResponse(e.to_string()))?;

    body.into_result().map_err(TransportError::Api)
}

/// Placeholder body for methods whose fields are not needed.
#[derive(Debug, Deserialize)]
pub(crate) struct Empty {}
