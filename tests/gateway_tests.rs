//! Model gateway against a mocked model API and token endpoint

use base64::{engine::general_purpose::STANDARD, Engine};
use receipt_scanner::{
    ErrorKind, ExtractionInput, GatewayConfig, ModelGateway, ReceiptExtractor,
};
use serde_json::{json, Value};
use wiremock::matchers::{body_partial_json, body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const API_PATH: &str = "/v1beta/models/gemini-2.5-flash:generateContent";
const VERTEX_PATH: &str =
    "/v1/projects/receipts-test/locations/us-central1/publishers/google/models/gemini-2.5-flash:generateContent";

const TEST_PRIVATE_KEY: &str = include_str!("fixtures/test_service_account_key.pem");

/// A generateContent reply whose only text part is `text`
fn model_reply(text: &str) -> Value {
    json!({
        "candidates": [{
            "content": { "role": "model", "parts": [{ "text": text }] },
            "finishReason": "STOP"
        }]
    })
}

fn acme_json() -> String {
    json!({
        "storeName": "Acme Mart",
        "transactionDate": "2024-03-02",
        "total": 12.5,
        "items": [{ "name": "Milk", "quantity": 2, "price": 3.25 }]
    })
    .to_string()
}

fn api_key_gateway(server: &MockServer) -> ModelGateway {
    let config = GatewayConfig::default()
        .with_api_key("test-key")
        .with_api_base(server.uri());
    ModelGateway::connect(config).unwrap()
}

fn service_account_blob(token_uri: &str) -> String {
    let key = json!({
        "type": "service_account",
        "project_id": "receipts-test",
        "client_email": "scanner@receipts-test.iam.gserviceaccount.com",
        "private_key": TEST_PRIVATE_KEY,
        "token_uri": token_uri,
    });
    STANDARD.encode(key.to_string())
}

#[tokio::test]
async fn test_api_key_extraction() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(API_PATH))
        .and(header("x-goog-api-key", "test-key"))
        .and(body_partial_json(json!({
            "generationConfig": { "responseMimeType": "application/json" }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(model_reply(&acme_json())))
        .expect(1)
        .mount(&server)
        .await;

    let receipt = api_key_gateway(&server)
        .extract(ExtractionInput::image(b"fake-jpeg-bytes", "image/jpeg"))
        .await
        .unwrap();

    assert_eq!(receipt.store_name, "Acme Mart");
    assert_eq!(receipt.transaction_date, "2024-03-02");
    assert!(receipt.total.is_finite());
    assert_eq!(receipt.items.len(), 1);
    assert_eq!(receipt.items[0].quantity, 2);
    assert!(receipt.items[0].price.is_finite());
}

#[tokio::test]
async fn test_request_carries_image_and_schema() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(API_PATH))
        .and(body_partial_json(json!({
            "contents": [{
                "role": "user",
                "parts": [
                    { "text": receipt_scanner::gateway::EXTRACTION_INSTRUCTION },
                    { "inlineData": { "mimeType": "image/png", "data": "aGVsbG8=" } }
                ]
            }],
            "generationConfig": {
                "responseSchema": {
                    "type": "OBJECT",
                    "required": ["storeName", "transactionDate", "total", "items"]
                }
            }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(model_reply(&acme_json())))
        .expect(1)
        .mount(&server)
        .await;

    let result = api_key_gateway(&server)
        .extract(ExtractionInput::image_base64("aGVsbG8=", "image/png"))
        .await;

    assert!(result.is_ok());
}

#[tokio::test]
async fn test_ocr_text_part() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(API_PATH))
        .and(body_string_contains("OCR:\\nMILK 2 x 3.25"))
        .respond_with(ResponseTemplate::new(200).set_body_json(model_reply(&acme_json())))
        .expect(1)
        .mount(&server)
        .await;

    let result = api_key_gateway(&server)
        .extract(ExtractionInput::ocr_text("MILK 2 x 3.25"))
        .await;

    assert!(result.is_ok());
}

#[tokio::test]
async fn test_empty_items_is_valid() {
    let server = MockServer::start().await;
    let text = r#"{"storeName":"Corner Shop","transactionDate":"2024-01-01","total":0,"items":[]}"#;

    Mock::given(method("POST"))
        .and(path(API_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(model_reply(text)))
        .mount(&server)
        .await;

    let receipt = api_key_gateway(&server)
        .extract(ExtractionInput::ocr_text("x"))
        .await
        .unwrap();

    assert!(receipt.items.is_empty());
    assert_eq!(receipt.total, 0.0);
}

#[tokio::test]
async fn test_malformed_json_is_parse_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(API_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(model_reply("{\"storeName\": \"Acme")))
        .mount(&server)
        .await;

    let err = api_key_gateway(&server)
        .extract(ExtractionInput::ocr_text("x"))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Parse);
}

#[tokio::test]
async fn test_missing_field_is_shape_mismatch() {
    let server = MockServer::start().await;
    let text = r#"{"storeName":"Acme Mart","total":12.5,"items":[]}"#;

    Mock::given(method("POST"))
        .and(path(API_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(model_reply(text)))
        .mount(&server)
        .await;

    let err = api_key_gateway(&server)
        .extract(ExtractionInput::ocr_text("x"))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::ShapeMismatch);
    assert!(err.to_string().contains("transactionDate"));
}

#[tokio::test]
async fn test_no_candidates_is_parse_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(API_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "candidates": [] })))
        .mount(&server)
        .await;

    let err = api_key_gateway(&server)
        .extract(ExtractionInput::ocr_text("x"))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Parse);
}

#[tokio::test]
async fn test_model_error_status_is_transport_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(API_PATH))
        .respond_with(ResponseTemplate::new(403).set_body_string("API key not valid"))
        .expect(1) // single attempt, no retry
        .mount(&server)
        .await;

    let err = api_key_gateway(&server)
        .extract(ExtractionInput::ocr_text("x"))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Transport);
    assert!(err.to_string().contains("403"));
}

#[tokio::test]
async fn test_unreachable_model_is_transport_error() {
    let config = GatewayConfig::default()
        .with_api_key("k")
        .with_api_base("http://127.0.0.1:9");
    let gateway = ModelGateway::connect(config).unwrap();

    let err = gateway.extract(ExtractionInput::ocr_text("x")).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Transport);
}

#[tokio::test]
async fn test_service_account_flow() {
    let server = MockServer::start().await;
    let scratch = tempfile::tempdir().unwrap();

    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=urn%3Aietf%3Aparams%3Aoauth%3Agrant-type%3Ajwt-bearer"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "ya29.test-token",
            "expires_in": 3600,
            "token_type": "Bearer"
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path(VERTEX_PATH))
        .and(header("authorization", "Bearer ya29.test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(model_reply(&acme_json())))
        .expect(1)
        .mount(&server)
        .await;

    let config = GatewayConfig::default()
        .with_service_account(service_account_blob(&format!("{}/token", server.uri())))
        .with_vertex_base(server.uri())
        .with_scratch_dir(scratch.path());
    let gateway = ModelGateway::connect(config).unwrap();
    assert_eq!(gateway.provider_name(), "service-account");

    let receipt = gateway
        .extract(ExtractionInput::image(b"img", "image/jpeg"))
        .await
        .unwrap();

    assert_eq!(receipt.store_name, "Acme Mart");
    // Scratch file is gone once the exchange is done
    assert_eq!(std::fs::read_dir(scratch.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_rejected_token_exchange_is_transport_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({ "error": "invalid_grant" })))
        .mount(&server)
        .await;

    let config = GatewayConfig::default()
        .with_service_account(service_account_blob(&format!("{}/token", server.uri())))
        .with_vertex_base(server.uri());
    let gateway = ModelGateway::connect(config).unwrap();

    let err = gateway.extract(ExtractionInput::ocr_text("x")).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Transport);
    assert!(err.to_string().contains("invalid_grant"));
}
