// Receipt Scanner - Core Library
// Exposes all modules for use in the terminal client, API server, and tests

pub mod receipt;
pub mod schema;      // Shape Layer - extraction schema
pub mod error;
pub mod secret;
pub mod config;
pub mod credentials; // Ordered credential providers
pub mod gateway;     // Model Gateway - one call to the hosted model
pub mod client;
pub mod upload;
pub mod render;
pub mod controller;  // Idle → Loading → {Result, Error}
pub mod logging;

#[cfg(feature = "server")]
pub mod handler;

// Re-export commonly used types
pub use receipt::{Receipt, ReceiptItem};
pub use schema::{ExtractionSchema, FieldDefinition, FieldType, ValidationError, ValidationResult};
pub use error::{ApiError, ApiResult, ErrorKind, ExtractionError, USER_FACING_MESSAGE};
pub use secret::Secret;
pub use config::GatewayConfig;
pub use credentials::{
    ApiKeyProvider, Credential, CredentialChain, CredentialProvider, ServiceAccountProvider,
};
pub use gateway::{ExtractionInput, InlineImage, ModelGateway, ReceiptExtractor};
pub use client::ReceiptClient;
pub use upload::{encode_file, EncodedUpload, PreviewRef};
pub use render::{format_currency, format_date, quantity_label, ItemRow, ReceiptView};
pub use controller::{UploadController, UploadJob, ViewState};

#[cfg(feature = "server")]
pub use handler::{build_router, AppState};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
