// 🔑 Credential Providers
// An ordered chain of providers; the first configured one is used

use crate::config::GatewayConfig;
use crate::error::ExtractionError;
use crate::secret::Secret;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
pub const CLOUD_PLATFORM_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;

// ============================================================================
// CREDENTIAL
// ============================================================================

/// A usable credential for one model call
#[derive(Debug, Clone)]
pub enum Credential {
    /// Sent as `x-goog-api-key`
    ApiKey(Secret),

    /// OAuth access token for the project-scoped endpoint
    Bearer { token: Secret, project_id: String },
}

// ============================================================================
// PROVIDER TRAIT
// ============================================================================

/// CredentialProvider - one way of producing a credential.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    fn name(&self) -> &'static str;

    /// Whether the configuration carries what this provider needs
    fn is_configured(&self) -> bool;

    /// Offline check that the configuration is usable
    fn validate(&self) -> Result<(), ExtractionError>;

    /// Produce a credential for one call
    async fn credential(&self, http: &reqwest::Client) -> Result<Credential, ExtractionError>;
}

// ============================================================================
// API KEY PROVIDER
// ============================================================================

pub struct ApiKeyProvider {
    key: Option<Secret>,
}

impl ApiKeyProvider {
    pub fn new(key: Option<Secret>) -> Self {
        ApiKeyProvider { key }
    }
}

#[async_trait]
impl CredentialProvider for ApiKeyProvider {
    fn name(&self) -> &'static str {
        "api-key"
    }

    fn is_configured(&self) -> bool {
        self.key.as_ref().is_some_and(|k| !k.is_empty())
    }

    fn validate(&self) -> Result<(), ExtractionError> {
        if self.is_configured() {
            Ok(())
        } else {
            Err(ExtractionError::Configuration("API key is empty".to_string()))
        }
    }

    async fn credential(&self, _http: &reqwest::Client) -> Result<Credential, ExtractionError> {
        self.key
            .clone()
            .map(Credential::ApiKey)
            .ok_or_else(|| ExtractionError::Configuration("API key is not set".to_string()))
    }
}

// ============================================================================
// SERVICE ACCOUNT PROVIDER
// ============================================================================

/// The fields of a service-account key file that the token exchange needs
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    pub project_id: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Materializes a base64 service-account blob and trades it for an access token.
pub struct ServiceAccountProvider {
    blob_b64: Option<Secret>,
    scratch_dir: PathBuf,
}

impl ServiceAccountProvider {
    pub fn new(blob_b64: Option<Secret>, scratch_dir: impl Into<PathBuf>) -> Self {
        ServiceAccountProvider {
            blob_b64,
            scratch_dir: scratch_dir.into(),
        }
    }

    fn decode_blob(&self) -> Result<Vec<u8>, ExtractionError> {
        let blob = self.blob_b64.as_ref().ok_or_else(|| {
            ExtractionError::Configuration("service-account blob is not set".to_string())
        })?;

        STANDARD.decode(blob.expose().trim()).map_err(|e| {
            ExtractionError::Configuration(format!("service-account blob is not valid base64: {}", e))
        })
    }

    fn parse_key(bytes: &[u8]) -> Result<ServiceAccountKey, ExtractionError> {
        serde_json::from_slice(bytes).map_err(|e| {
            ExtractionError::Configuration(format!("service-account blob is not a valid key file: {}", e))
        })
    }

    /// Write the decoded blob to a scratch file and read the key back from it.
    /// The file is removed when this returns.
    fn materialize(&self) -> Result<ServiceAccountKey, ExtractionError> {
        let bytes = self.decode_blob()?;

        let scratch_err =
            |e: std::io::Error| ExtractionError::Configuration(format!("cannot materialize credentials: {}", e));

        let mut file = tempfile::Builder::new()
            .prefix("gcp-sa-")
            .suffix(".json")
            .tempfile_in(&self.scratch_dir)
            .map_err(scratch_err)?;
        file.write_all(&bytes).map_err(scratch_err)?;
        file.flush().map_err(scratch_err)?;

        debug!(path = %file.path().display(), "Materialized service-account credentials");

        let contents = std::fs::read(file.path()).map_err(scratch_err)?;
        Self::parse_key(&contents)
    }

    fn sign_assertion(key: &ServiceAccountKey) -> Result<String, ExtractionError> {
        let iat = chrono::Utc::now().timestamp();
        let claims = AssertionClaims {
            iss: &key.client_email,
            scope: CLOUD_PLATFORM_SCOPE,
            aud: &key.token_uri,
            iat,
            exp: iat + ASSERTION_LIFETIME_SECS,
        };

        let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes()).map_err(|e| {
            ExtractionError::Configuration(format!("service-account private key is unusable: {}", e))
        })?;

        jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &encoding_key)
            .map_err(|e| ExtractionError::Configuration(format!("cannot sign token request: {}", e)))
    }
}

#[async_trait]
impl CredentialProvider for ServiceAccountProvider {
    fn name(&self) -> &'static str {
        "service-account"
    }

    fn is_configured(&self) -> bool {
        self.blob_b64.as_ref().is_some_and(|b| !b.is_empty())
    }

    fn validate(&self) -> Result<(), ExtractionError> {
        let bytes = self.decode_blob()?;
        Self::parse_key(&bytes).map(|_| ())
    }

    async fn credential(&self, http: &reqwest::Client) -> Result<Credential, ExtractionError> {
        let key = self.materialize()?;
        let assertion = Self::sign_assertion(&key)?;

        let response = http
            .post(&key.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ExtractionError::Transport(format!(
                "token exchange failed ({}): {}",
                status, body
            )));
        }

        let token: TokenResponse = response.json().await?;
        debug!(client_email = %key.client_email, "Obtained access token");

        Ok(Credential::Bearer {
            token: Secret::new(token.access_token),
            project_id: key.project_id,
        })
    }
}

// ============================================================================
// CREDENTIAL CHAIN
// ============================================================================

/// Ordered list of providers. Selection is deterministic: the first
/// configured provider wins and later providers are never consulted.
pub struct CredentialChain {
    providers: Vec<Arc<dyn CredentialProvider>>,
}

impl CredentialChain {
    pub fn new(providers: Vec<Arc<dyn CredentialProvider>>) -> Self {
        CredentialChain { providers }
    }

    /// API key first, then service account
    pub fn from_config(config: &GatewayConfig) -> Self {
        CredentialChain::new(vec![
            Arc::new(ApiKeyProvider::new(config.api_key.clone())),
            Arc::new(ServiceAccountProvider::new(
                config.service_account_b64.clone(),
                config.scratch_dir.clone(),
            )),
        ])
    }

    pub fn provider_names(&self) -> Vec<&'static str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// Pick and validate a provider; fails before any network call
    pub fn select(&self) -> Result<Arc<dyn CredentialProvider>, ExtractionError> {
        let provider = self
            .providers
            .iter()
            .find(|p| p.is_configured())
            .cloned()
            .ok_or_else(|| {
                ExtractionError::Configuration(format!(
                    "no credentials configured (tried: {})",
                    self.provider_names().join(", ")
                ))
            })?;

        provider.validate()?;
        info!(provider = provider.name(), "Selected credential provider");

        Ok(provider)
    }
}
