//! Error types for the edgequake-doctext library.
//!
//! Failures are split by how far they are allowed to travel:
//!
//! * [`DocTextError`]: **Fatal** for the call that returned it: invalid
//!   configuration, an input whose extension is not supported, a panicked
//!   worker task. Returned as `Err(DocTextError)`.
//!
//! * [`ExtractionFailure`]: **Non-fatal**: one page could not be recognised,
//!   one PDF could not be rasterised, one Word file could not be parsed. The
//!   extraction still yields a (possibly empty) string and the failure is
//!   stored in [`crate::output::Extraction::failures`].
//!
//! * [`OcrError`] and [`WriteError`] describe a single engine call or a single
//!   output write. The dispatcher and batch coordinator fold them into
//!   [`ExtractionFailure`] and [`crate::output::ItemStatus`] respectively.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Fatal errors returned by the edgequake-doctext library.
#[derive(Debug, Error)]
pub enum DocTextError {
    /// The file has no extension, or one outside the configured set.
    #[error("Unsupported file type for '{path}': expected one of {allowed}")]
    UnsupportedExtension { path: PathBuf, allowed: String },

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\
Set PDFIUM_LIB_PATH=/path/to/libpdfium or place the library next to the binary."
    )]
    PdfiumBindingFailed(String),

    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal extraction failure for one input (or one page of it).
///
/// Every variant degrades to empty text for the scope it names; the rest of
/// the document and the rest of the batch are unaffected.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExtractionFailure {
    /// The PDF could not be turned into page images at all.
    #[error("rasterisation failed: {detail}")]
    Rasterization { detail: String },

    /// OCR failed for one page (1-indexed). Images count as page 1.
    #[error("page {page}: recognition failed: {detail}")]
    Recognition { page: usize, detail: String },

    /// A Word or plain-text file could not be decoded.
    #[error("structured read failed: {detail}")]
    StructuredRead { detail: String },

    /// An image input could not be decoded into a raster.
    #[error("image decode failed: {detail}")]
    ImageDecode { detail: String },
}

impl ExtractionFailure {
    /// Short machine-friendly label, matching the serialised `kind` tag.
    pub fn kind(&self) -> &'static str {
        match self {
            ExtractionFailure::Rasterization { .. } => "rasterization",
            ExtractionFailure::Recognition { .. } => "recognition",
            ExtractionFailure::StructuredRead { .. } => "structured_read",
            ExtractionFailure::ImageDecode { .. } => "image_decode",
        }
    }
}

/// Failure of a single OCR engine invocation.
#[derive(Debug, Error)]
pub enum OcrError {
    /// The engine binary could not be started (usually not installed).
    #[error("could not start OCR engine '{binary}': {source}")]
    EngineUnavailable {
        binary: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The engine ran but exited unsuccessfully.
    #[error("OCR engine exited with status {code}: {stderr}")]
    EngineFailed { code: i32, stderr: String },

    /// The page image could not be encoded for the engine.
    #[error("could not encode image for OCR: {0}")]
    Encode(#[from] image::ImageError),

    /// Piping data to or from the engine failed.
    #[error("OCR engine I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The call did not finish within the configured timeout.
    #[error("OCR timed out after {secs}s")]
    Timeout { secs: u64 },
}

/// Failure to persist one output document.
#[derive(Debug, Error)]
pub enum WriteError {
    /// The output directory could not be created or used.
    #[error("Failed to prepare output directory '{path}': {source}")]
    Directory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The document package could not be assembled.
    #[error("Failed to build document for '{path}': {detail}")]
    Package { path: PathBuf, detail: String },

    /// The finished document could not be written or moved into place.
    #[error("Failed to write output file '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_extension_display() {
        let e = DocTextError::UnsupportedExtension {
            path: PathBuf::from("notes.odt"),
            allowed: "pdf, txt".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("notes.odt"), "got: {msg}");
        assert!(msg.contains("pdf, txt"), "got: {msg}");
    }

    #[test]
    fn recognition_failure_display_names_page() {
        let f = ExtractionFailure::Recognition {
            page: 3,
            detail: "exit 1".into(),
        };
        assert!(f.to_string().contains("page 3"));
        assert_eq!(f.kind(), "recognition");
    }

    #[test]
    fn failure_serialises_with_kind_tag() {
        let f = ExtractionFailure::StructuredRead {
            detail: "invalid utf-8".into(),
        };
        let json = serde_json::to_value(&f).unwrap();
        assert_eq!(json["kind"], "structured_read");
        assert_eq!(json["detail"], "invalid utf-8");
    }

    #[test]
    fn ocr_timeout_display() {
        let e = OcrError::Timeout { secs: 120 };
        assert!(e.to_string().contains("120s"));
    }
}
