// 📤 Upload Preparation
// File selection, type/size checks, and transport encoding

use base64::{engine::general_purpose::STANDARD, Engine};
use std::fmt;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// 10 MiB
pub const MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

pub const SUPPORTED_TYPES_LABEL: &str = "PNG, JPG, or WEBP (max. 10MB)";

/// Image types the upload control accepts
pub fn mime_type_for(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_lowercase();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "webp" => Some("image/webp"),
        _ => None,
    }
}

// ============================================================================
// SELECTION
// ============================================================================

/// Turn raw selection text (typed path or dropped file) into a path.
///
/// Terminals paste dropped files as a path that may be quoted or have
/// escaped spaces. Returns `None` for an empty selection.
pub fn normalize_selection(raw: &str) -> Option<PathBuf> {
    let trimmed = raw.trim();
    let unquoted = trimmed
        .strip_prefix('\'')
        .and_then(|s| s.strip_suffix('\''))
        .or_else(|| trimmed.strip_prefix('"').and_then(|s| s.strip_suffix('"')))
        .unwrap_or(trimmed);

    let unquoted = unquoted.strip_prefix("file://").unwrap_or(unquoted);
    let path = unquoted.replace("\\ ", " ");

    if path.trim().is_empty() {
        None
    } else {
        Some(PathBuf::from(path))
    }
}

// ============================================================================
// PREVIEW REFERENCE
// ============================================================================

/// Local, ephemeral handle on the chosen file, shown while loading and
/// alongside the result. Dropped on error or reset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewRef {
    pub id: Uuid,
    pub path: PathBuf,
}

impl PreviewRef {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        PreviewRef {
            id: Uuid::new_v4(),
            path: path.into(),
        }
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

impl fmt::Display for PreviewRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "preview:{}", self.id)
    }
}

// ============================================================================
// ENCODING
// ============================================================================

/// A file ready for the wire
#[derive(Debug, Clone)]
pub struct EncodedUpload {
    pub mime_type: String,
    pub data_base64: String,
    /// Size in bytes before encoding
    pub size: u64,
}

/// Read and base64-encode the file. Messages are display-ready.
pub fn encode_file(path: &Path) -> Result<EncodedUpload, String> {
    let mime_type = mime_type_for(path).ok_or_else(|| {
        format!("Unsupported file type. Please choose a {}", SUPPORTED_TYPES_LABEL)
    })?;

    let metadata = std::fs::metadata(path)
        .map_err(|e| format!("Could not read {}: {}", path.display(), e))?;

    if !metadata.is_file() {
        return Err(format!("{} is not a file", path.display()));
    }
    if metadata.len() == 0 {
        return Err("The selected file is empty.".to_string());
    }
    if metadata.len() > MAX_UPLOAD_BYTES {
        return Err("The selected file is larger than 10MB.".to_string());
    }

    let bytes =
        std::fs::read(path).map_err(|e| format!("Could not read {}: {}", path.display(), e))?;

    Ok(EncodedUpload {
        mime_type: mime_type.to_string(),
        data_base64: STANDARD.encode(&bytes),
        size: bytes.len() as u64,
    })
}
