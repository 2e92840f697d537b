//! Error types for the edgequake-contacts library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`ContactsError`] — **Fatal**: the run cannot proceed or its result
//!   cannot be saved (input folder missing, provider not configured, the
//!   workbook could not be written). Returned as `Err(ContactsError)` from
//!   the top-level `run*` functions.
//!
//! * [`ImageError`] — **Non-fatal**: a single image failed (unreadable file,
//!   API error, reply without JSON) but the rest of the batch is fine. Stored
//!   in [`crate::output::BatchOutput::failures`]; the image simply yields no
//!   row in the spreadsheet.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the edgequake-contacts library.
#[derive(Debug, Error)]
pub enum ContactsError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input folder was not found at the given path.
    #[error("Image folder not found: '{path}'\nCheck the path exists and is readable.")]
    FolderNotFound { path: PathBuf },

    /// The input path exists but is a regular file.
    #[error("'{path}' is not a directory\nPass the folder that contains the images.")]
    NotADirectory { path: PathBuf },

    /// Process does not have read permission on the folder.
    #[error("Permission denied listing '{path}'\nTry: chmod +rx {path:?}")]
    PermissionDenied { path: PathBuf },

    /// Listing the folder failed for another reason.
    #[error("Failed to list image folder '{path}': {source}")]
    FolderReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── LLM errors ────────────────────────────────────────────────────────
    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    // ── Export errors ─────────────────────────────────────────────────────
    /// The spreadsheet could not be built or written. All extracted records
    /// of the run are lost from the caller's perspective.
    #[error("Failed to write spreadsheet '{path}': {detail}")]
    ExportFailed { path: PathBuf, detail: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single image.
///
/// The batch continues with the next image; the failed one is left out of
/// the result set without a placeholder row.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum ImageError {
    /// File missing, unreadable, or not a decodable image.
    #[error("{path}: cannot read image: {detail}")]
    ImageRead { path: PathBuf, detail: String },

    /// The inference call failed or returned no message content.
    #[error("{path}: inference failed: {detail}")]
    Inference { path: PathBuf, detail: String },

    /// The inference call did not answer in time.
    #[error("{path}: inference timed out after {secs}s")]
    Timeout { path: PathBuf, secs: u64 },

    /// The model reply contains no brace-delimited object.
    #[error("{path}: no JSON object found in model reply")]
    NoJsonFound { path: PathBuf, reply: String },

    /// The reply parsed to an object with no keys.
    #[error("{path}: model reply holds an empty JSON object")]
    EmptyRecord { path: PathBuf, reply: String },

    /// The recovered candidate is not valid JSON.
    #[error("{path}: could not convert reply to JSON: {detail}")]
    JsonParse {
        path: PathBuf,
        detail: String,
        reply: String,
    },
}

impl ImageError {
    /// Path of the image this error belongs to.
    pub fn path(&self) -> &std::path::Path {
        match self {
            ImageError::ImageRead { path, .. }
            | ImageError::Inference { path, .. }
            | ImageError::Timeout { path, .. }
            | ImageError::NoJsonFound { path, .. }
            | ImageError::EmptyRecord { path, .. }
            | ImageError::JsonParse { path, .. } => path,
        }
    }

    /// Raw model reply, for errors raised after the model answered.
    pub fn raw_reply(&self) -> Option<&str> {
        match self {
            ImageError::NoJsonFound { reply, .. }
            | ImageError::EmptyRecord { reply, .. }
            | ImageError::JsonParse { reply, .. } => Some(reply),
            _ => None,
        }
    }

    /// Whether the failure happened at the remote inference boundary.
    pub fn is_inference(&self) -> bool {
        matches!(self, ImageError::Inference { .. } | ImageError::Timeout { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn export_failed_display() {
        let e = ContactsError::ExportFailed {
            path: PathBuf::from("customer_info.xlsx"),
            detail: "Permission denied".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("customer_info.xlsx"), "got: {msg}");
        assert!(msg.contains("Permission denied"), "got: {msg}");
    }

    #[test]
    fn timeout_display() {
        let e = ImageError::Timeout {
            path: PathBuf::from("images/card.png"),
            secs: 30,
        };
        assert!(e.to_string().contains("30s"));
        assert!(e.is_inference());
    }

    #[test]
    fn parse_error_keeps_reply() {
        let e = ImageError::JsonParse {
            path: PathBuf::from("a.jpg"),
            detail: "EOF while parsing".into(),
            reply: "{\"Name\": ".into(),
        };
        assert_eq!(e.raw_reply(), Some("{\"Name\": "));
        assert_eq!(e.path(), std::path::Path::new("a.jpg"));
        assert!(!e.is_inference());
    }

    #[test]
    fn empty_record_keeps_reply() {
        let e = ImageError::EmptyRecord {
            path: PathBuf::from("blank.png"),
            reply: "{}".into(),
        };
        assert_eq!(e.raw_reply(), Some("{}"));
        assert!(e.to_string().contains("empty JSON object"));
    }

    #[test]
    fn image_read_has_no_reply() {
        let e = ImageError::ImageRead {
            path: PathBuf::from("broken.png"),
            detail: "unexpected EOF".into(),
        };
        assert!(e.raw_reply().is_none());
        assert!(e.to_string().contains("broken.png"));
    }
}
