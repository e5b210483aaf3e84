// 🤖 Model Gateway
// One outbound generateContent call per receipt, constrained by the extraction schema

use crate::config::GatewayConfig;
use crate::credentials::{Credential, CredentialChain, CredentialProvider};
use crate::error::ExtractionError;
use crate::receipt::Receipt;
use crate::schema::ExtractionSchema;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{error, info};

pub const EXTRACTION_INSTRUCTION: &str = "Analyze the receipt image and extract the store name, \
transaction date, total amount, and a list of all purchased items including their name, quantity, \
and price. Please format the date as YYYY-MM-DD.";

pub const DEFAULT_MIME_TYPE: &str = "image/jpeg";

// ============================================================================
// INPUT
// ============================================================================

/// Image payload, already base64-encoded
#[derive(Debug, Clone, PartialEq)]
pub struct InlineImage {
    pub mime_type: String,
    pub data_base64: String,
}

/// What to extract from: an image, OCR text, or both
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractionInput {
    pub ocr_text: Option<String>,
    pub image: Option<InlineImage>,
}

impl ExtractionInput {
    /// Raw image bytes
    pub fn image(bytes: &[u8], mime_type: impl Into<String>) -> Self {
        Self::image_base64(STANDARD.encode(bytes), mime_type)
    }

    pub fn image_base64(data_base64: impl Into<String>, mime_type: impl Into<String>) -> Self {
        ExtractionInput {
            ocr_text: None,
            image: Some(InlineImage {
                mime_type: mime_type.into(),
                data_base64: data_base64.into(),
            }),
        }
    }

    pub fn ocr_text(text: impl Into<String>) -> Self {
        ExtractionInput {
            ocr_text: Some(text.into()),
            image: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.ocr_text.is_none() && self.image.is_none()
    }

    /// Parts of the single user turn: instruction, OCR text, image
    fn parts(&self) -> Vec<Value> {
        let mut parts = vec![json!({ "text": EXTRACTION_INSTRUCTION })];

        if let Some(text) = &self.ocr_text {
            parts.push(json!({ "text": format!("OCR:\n{}", text) }));
        }

        if let Some(image) = &self.image {
            parts.push(json!({
                "inlineData": { "mimeType": image.mime_type, "data": image.data_base64 }
            }));
        }

        parts
    }
}

// ============================================================================
// EXTRACTOR TRAIT
// ============================================================================

/// ReceiptExtractor - the seam between the request handler and the model.
#[async_trait]
pub trait ReceiptExtractor: Send + Sync {
    async fn extract(&self, input: ExtractionInput) -> Result<Receipt, ExtractionError>;
}

// ============================================================================
// RESPONSE TYPES
// ============================================================================

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

impl GenerateContentResponse {
    /// Concatenated text of the first candidate
    fn text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let text: String = content.parts.iter().filter_map(|p| p.text.as_deref()).collect();

        if text.trim().is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

// ============================================================================
// GATEWAY
// ============================================================================

pub struct ModelGateway {
    http: reqwest::Client,
    config: GatewayConfig,
    schema: ExtractionSchema,
    provider: Arc<dyn CredentialProvider>,
}

impl ModelGateway {
    /// Build a gateway, selecting credentials up front.
    /// Fails with `Configuration` if nothing usable is configured.
    pub fn connect(config: GatewayConfig) -> Result<Self, ExtractionError> {
        let provider = CredentialChain::from_config(&config).select()?;
        Ok(Self::with_provider(config, provider))
    }

    pub fn with_provider(config: GatewayConfig, provider: Arc<dyn CredentialProvider>) -> Self {
        ModelGateway {
            http: reqwest::Client::new(),
            config,
            schema: ExtractionSchema::receipt(),
            provider,
        }
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Request body for one extraction
    pub fn build_request(&self, input: &ExtractionInput) -> Value {
        json!({
            "contents": [{ "role": "user", "parts": input.parts() }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": self.schema.to_response_schema(),
            }
        })
    }

    fn endpoint(&self, credential: &Credential) -> String {
        match credential {
            Credential::ApiKey(_) => format!(
                "{}/v1beta/models/{}:generateContent",
                self.config.api_base.trim_end_matches('/'),
                self.config.model
            ),
            Credential::Bearer { project_id, .. } => format!(
                "{}/v1/projects/{}/locations/{}/publishers/google/models/{}:generateContent",
                self.config.vertex_base_url(),
                project_id,
                self.config.vertex_location,
                self.config.model
            ),
        }
    }

    /// Parse and shallow-validate the model's JSON text
    pub fn parse_receipt(&self, text: &str) -> Result<Receipt, ExtractionError> {
        let value: Value =
            serde_json::from_str(text.trim()).map_err(|e| ExtractionError::Parse(e.to_string()))?;

        self.schema.validate_shape(&value).map_err(|errors| {
            let fields: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            ExtractionError::ShapeMismatch(fields.join("; "))
        })?;

        serde_json::from_value(value).map_err(|e| ExtractionError::ShapeMismatch(e.to_string()))
    }

    async fn call_model(&self, input: &ExtractionInput) -> Result<Receipt, ExtractionError> {
        let credential = self.provider.credential(&self.http).await?;
        let url = self.endpoint(&credential);
        let body = self.build_request(input);

        let request = match &credential {
            Credential::ApiKey(key) => self.http.post(&url).header("x-goog-api-key", key.expose()),
            Credential::Bearer { token, .. } => self.http.post(&url).bearer_auth(token.expose()),
        };

        let response = request.json(&body).send().await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ExtractionError::Transport(format!(
                "model returned {}: {}",
                status, text
            )));
        }

        let reply: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| ExtractionError::Parse(format!("unreadable model reply: {}", e)))?;

        let text = reply
            .text()
            .ok_or_else(|| ExtractionError::Parse("model reply contained no text".to_string()))?;

        self.parse_receipt(&text)
    }
}

#[async_trait]
impl ReceiptExtractor for ModelGateway {
    async fn extract(&self, input: ExtractionInput) -> Result<Receipt, ExtractionError> {
        info!(
            model = %self.config.model,
            has_image = input.image.is_some(),
            has_ocr_text = input.ocr_text.is_some(),
            "Extracting receipt"
        );

        match self.call_model(&input).await {
            Ok(receipt) => {
                info!(
                    store = %receipt.store_name,
                    items = receipt.items.len(),
                    "Receipt extracted"
                );
                Ok(receipt)
            }
            Err(e) => {
                error!(kind = e.kind().name(), error = %e, "Error parsing receipt");
                Err(e)
            }
        }
    }
}
