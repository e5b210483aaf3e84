// ⚙️ Gateway Configuration
// Built once at startup and passed explicitly into the gateway

use crate::secret::Secret;
use std::path::PathBuf;

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_VERTEX_LOCATION: &str = "us-central1";

// Environment variable names
pub const ENV_API_KEY: &str = "API_KEY";
pub const ENV_GEMINI_API_KEY: &str = "GEMINI_API_KEY";
pub const ENV_SERVICE_ACCOUNT: &str = "GOOGLE_CREDENTIALS_BASE64";
pub const ENV_MODEL: &str = "RECEIPT_MODEL";
pub const ENV_API_BASE: &str = "GEMINI_API_BASE";
pub const ENV_VERTEX_BASE: &str = "VERTEX_API_BASE";
pub const ENV_VERTEX_LOCATION: &str = "VERTEX_LOCATION";
pub const ENV_SCRATCH_DIR: &str = "RECEIPT_SCRATCH_DIR";

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Model name, e.g. "gemini-2.5-flash"
    pub model: String,

    /// Base URL for API-key requests
    pub api_base: String,

    /// Base URL for service-account requests.
    /// `None` means `https://{location}-aiplatform.googleapis.com`.
    pub vertex_base: Option<String>,

    pub vertex_location: String,

    /// Direct API key (preferred)
    pub api_key: Option<Secret>,

    /// Base64-encoded service-account JSON
    pub service_account_b64: Option<Secret>,

    /// Where service-account blobs are materialized
    pub scratch_dir: PathBuf,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        GatewayConfig {
            model: DEFAULT_MODEL.to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
            vertex_base: None,
            vertex_location: DEFAULT_VERTEX_LOCATION.to_string(),
            api_key: None,
            service_account_b64: None,
            scratch_dir: std::env::temp_dir(),
        }
    }
}

impl GatewayConfig {
    /// Read configuration from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read configuration through an arbitrary variable lookup.
    ///
    /// Empty values count as unset. `API_KEY` wins over `GEMINI_API_KEY`.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let defaults = GatewayConfig::default();

        GatewayConfig {
            model: get(ENV_MODEL).unwrap_or(defaults.model),
            api_base: get(ENV_API_BASE).unwrap_or(defaults.api_base),
            vertex_base: get(ENV_VERTEX_BASE),
            vertex_location: get(ENV_VERTEX_LOCATION).unwrap_or(defaults.vertex_location),
            api_key: get(ENV_API_KEY).or_else(|| get(ENV_GEMINI_API_KEY)).map(Secret::new),
            service_account_b64: get(ENV_SERVICE_ACCOUNT).map(Secret::new),
            scratch_dir: get(ENV_SCRATCH_DIR)
                .map(PathBuf::from)
                .unwrap_or(defaults.scratch_dir),
        }
    }

    /// Builder: set API key
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(Secret::new(key));
        self
    }

    /// Builder: set service-account blob
    pub fn with_service_account(mut self, blob_b64: impl Into<String>) -> Self {
        self.service_account_b64 = Some(Secret::new(blob_b64));
        self
    }

    /// Builder: set model
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Builder: point API-key requests somewhere else
    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into();
        self
    }

    /// Builder: point service-account requests somewhere else
    pub fn with_vertex_base(mut self, base: impl Into<String>) -> Self {
        self.vertex_base = Some(base.into());
        self
    }

    /// Builder: set scratch directory
    pub fn with_scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = dir.into();
        self
    }

    pub fn vertex_base_url(&self) -> String {
        match &self.vertex_base {
            Some(base) => base.trim_end_matches('/').to_string(),
            None => format!("https://{}-aiplatform.googleapis.com", self.vertex_location),
        }
    }
}
