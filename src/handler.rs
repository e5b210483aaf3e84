// 🌐 Request Handler
// POST /api/parse - image or OCR text in, receipt JSON out

use crate::error::{ApiError, ApiResult};
use crate::gateway::{ExtractionInput, InlineImage, ReceiptExtractor, DEFAULT_MIME_TYPE};
use crate::receipt::Receipt;
use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, State},
    http::{
        header::{
            ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
        },
        HeaderValue, StatusCode,
    },
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use base64::{engine::general_purpose::STANDARD, Engine};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// 10 MiB image after base64 expansion, plus room for the JSON envelope
pub const BODY_LIMIT: usize = 15 * 1024 * 1024;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    extractor: Arc<dyn ReceiptExtractor>,
}

impl AppState {
    pub fn new(extractor: Arc<dyn ReceiptExtractor>) -> Self {
        AppState { extractor }
    }
}

// ============================================================================
// REQUEST BODY
// ============================================================================

/// `{ocrText}` or `{imageBase64, mimeType}`; both may be present
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParseRequest {
    pub ocr_text: Option<String>,
    pub image_base64: Option<String>,
    pub mime_type: Option<String>,
}

impl ParseRequest {
    pub fn into_input(self) -> ApiResult<ExtractionInput> {
        let ocr_text = self.ocr_text.filter(|t| !t.trim().is_empty());

        let image = match self.image_base64.filter(|d| !d.trim().is_empty()) {
            Some(data) => {
                let (url_mime, data) = split_data_url(data.trim());
                let mime_type = self
                    .mime_type
                    .filter(|m| !m.is_empty())
                    .or(url_mime)
                    .unwrap_or_else(|| DEFAULT_MIME_TYPE.to_string());

                STANDARD
                    .decode(&data)
                    .map_err(|e| ApiError::BadRequest(format!("imageBase64 is not valid base64: {}", e)))?;

                Some(InlineImage {
                    mime_type,
                    data_base64: data,
                })
            }
            None => None,
        };

        let input = ExtractionInput { ocr_text, image };
        if input.is_empty() {
            return Err(ApiError::BadRequest(
                "Provide either ocrText or imageBase64".to_string(),
            ));
        }

        Ok(input)
    }
}

/// Accept `data:<mime>;base64,<payload>` as well as a bare payload
fn split_data_url(data: &str) -> (Option<String>, String) {
    if let Some(rest) = data.strip_prefix("data:") {
        if let Some((meta, payload)) = rest.split_once(',') {
            let mime = meta.trim_end_matches(";base64");
            let mime = (!mime.is_empty()).then(|| mime.to_string());
            return (mime, payload.to_string());
        }
    }
    (None, data.to_string())
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(json!({ "status": "ok", "version": crate::VERSION }))
}

/// OPTIONS /api/parse - Pre-flight
async fn preflight() -> StatusCode {
    StatusCode::NO_CONTENT
}

/// POST /api/parse - Extract a receipt
async fn parse_receipt(State(state): State<AppState>, body: Bytes) -> ApiResult<Json<Receipt>> {
    let request: ParseRequest = if body.iter().all(u8::is_ascii_whitespace) {
        ParseRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| ApiError::BadRequest(format!("Body is not valid JSON: {}", e)))?
    };

    let input = request.into_input().map_err(|e| {
        warn!(error = %e, "Rejected parse request");
        e
    })?;

    let receipt = state.extractor.extract(input).await?;
    info!(store = %receipt.store_name, "Parse request complete");

    Ok(Json(receipt))
}

// ============================================================================
// Router
// ============================================================================

/// Build the router. CORS headers go on every response, pre-flight or not.
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/parse", post(parse_receipt).options(preflight))
        .with_state(state);

    Router::new()
        .nest("/api", api_routes)
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
        .layer(SetResponseHeaderLayer::overriding(
            ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static("GET,POST,OPTIONS"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static("Content-Type,Authorization"),
        ))
        .layer(TraceLayer::new_for_http())
}
