// 📡 Handler Client
// Talks to the request handler over HTTP; knows nothing of the model

use crate::receipt::Receipt;
use crate::upload::EncodedUpload;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

pub const DEFAULT_SERVER_URL: &str = "http://localhost:3000";

/// Shown when the server's reply carries no usable message
pub const UNKNOWN_ERROR_MESSAGE: &str = "An unknown error occurred.";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ParseBody<'a> {
    image_base64: &'a str,
    mime_type: &'a str,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ReceiptClient {
    http: reqwest::Client,
    base_url: String,
}

impl ReceiptClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        ReceiptClient {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn parse_url(&self) -> String {
        format!("{}/api/parse", self.base_url)
    }

    /// One request, one outcome. Errors come back as display-ready text.
    pub async fn analyze(&self, upload: &EncodedUpload) -> Result<Receipt, String> {
        debug!(bytes = upload.size, mime = %upload.mime_type, "Sending receipt to server");

        let body = ParseBody {
            image_base64: &upload.data_base64,
            mime_type: &upload.mime_type,
        };

        let response = self
            .http
            .post(self.parse_url())
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "Could not reach server");
                format!("Could not reach the server: {}", e)
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<ErrorBody>()
                .await
                .ok()
                .and_then(|b| b.error)
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| UNKNOWN_ERROR_MESSAGE.to_string());
            warn!(%status, "Server rejected receipt");
            return Err(message);
        }

        response
            .json::<Receipt>()
            .await
            .map_err(|e| format!("Server reply was not a receipt: {}", e))
    }
}

impl Default for ReceiptClient {
    fn default() -> Self {
        Self::new(DEFAULT_SERVER_URL)
    }
}
