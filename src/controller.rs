// 🔁 Upload/View Controller
// Idle → Loading → {Result, Error}, and back to Idle on reset

use crate::client::ReceiptClient;
use crate::receipt::Receipt;
use crate::upload::{encode_file, normalize_selection, PreviewRef};
use std::path::PathBuf;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Default)]
pub enum ViewState {
    /// Upload affordance shown
    #[default]
    Idle,
    /// One request in flight; uploads disabled
    Loading { preview: PreviewRef },
    Result { receipt: Receipt, preview: PreviewRef },
    Error { message: String },
}

impl ViewState {
    pub fn name(&self) -> &str {
        match self {
            ViewState::Idle => "Idle",
            ViewState::Loading { .. } => "Loading",
            ViewState::Result { .. } => "Result",
            ViewState::Error { .. } => "Error",
        }
    }
}

/// The work started by an accepted selection
#[derive(Debug, Clone)]
pub struct UploadJob {
    pub preview: PreviewRef,
}

impl UploadJob {
    /// Encode the file and make the single request
    pub async fn run(&self, client: &ReceiptClient) -> Result<Receipt, String> {
        let encoded = encode_file(&self.preview.path)?;
        client.analyze(&encoded).await
    }
}

#[derive(Debug, Default)]
pub struct UploadController {
    state: ViewState,
}

impl UploadController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    /// Only the idle screen offers the upload control
    pub fn can_upload(&self) -> bool {
        matches!(self.state, ViewState::Idle)
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.state, ViewState::Loading { .. })
    }

    pub fn preview(&self) -> Option<&PreviewRef> {
        match &self.state {
            ViewState::Loading { preview } | ViewState::Result { preview, .. } => Some(preview),
            _ => None,
        }
    }

    pub fn receipt(&self) -> Option<&Receipt> {
        match &self.state {
            ViewState::Result { receipt, .. } => Some(receipt),
            _ => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match &self.state {
            ViewState::Error { message } => Some(message),
            _ => None,
        }
    }

    /// Raw selection text from the path box or a drop. Empty selections
    /// and selections made while not idle are ignored.
    pub fn select(&mut self, raw: &str) -> Option<UploadJob> {
        let path = normalize_selection(raw)?;
        self.select_path(path)
    }

    pub fn select_path(&mut self, path: PathBuf) -> Option<UploadJob> {
        if !self.can_upload() {
            debug!(state = self.state.name(), "Ignoring selection");
            return None;
        }

        let preview = PreviewRef::new(path);
        info!(file = %preview.file_name(), %preview, "Upload accepted");

        self.state = ViewState::Loading {
            preview: preview.clone(),
        };

        Some(UploadJob { preview })
    }

    /// Apply the outcome of the in-flight job. Ignored unless loading.
    pub fn finish(&mut self, outcome: Result<Receipt, String>) {
        let preview = match std::mem::take(&mut self.state) {
            ViewState::Loading { preview } => preview,
            other => {
                debug!(state = other.name(), "Ignoring outcome");
                self.state = other;
                return;
            }
        };

        self.state = match outcome {
            Ok(receipt) => ViewState::Result { receipt, preview },
            Err(message) => {
                let message = if message.trim().is_empty() {
                    crate::client::UNKNOWN_ERROR_MESSAGE.to_string()
                } else {
                    message
                };
                ViewState::Error { message }
            }
        };

        info!(state = self.state.name(), "Upload finished");
    }

    /// "Scan New" / "Try Again"
    pub fn reset(&mut self) {
        if self.is_loading() {
            return;
        }
        self.state = ViewState::Idle;
    }
}
