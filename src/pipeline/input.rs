//! Input validation: turn a path on disk into an [`InputDocument`].
//!
//! The upload layer hands over files whose extension has already been
//! checked, but this crate re-validates at its own boundary: an
//! `InputDocument` can only be built for a supported, allowed extension, so
//! the dispatcher's `match` on [`DocumentKind`] is exhaustive by construction.

use crate::config::{ExtractionConfig, OUTPUT_SUFFIX};
use crate::error::DocTextError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// The declared format of an input, derived from its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    /// Paged document; text is recovered by rasterising and OCR.
    Pdf,
    /// Word document; paragraph text is read directly.
    Docx,
    /// UTF-8 plain text, read verbatim.
    Text,
    /// JPEG raster (`.jpg` or `.jpeg`).
    Jpeg,
    /// PNG raster.
    Png,
}

impl DocumentKind {
    /// Every supported kind, in dispatch-table order.
    pub const ALL: [DocumentKind; 5] = [
        DocumentKind::Pdf,
        DocumentKind::Docx,
        DocumentKind::Text,
        DocumentKind::Jpeg,
        DocumentKind::Png,
    ];

    /// Map a file extension (without the dot, any case) to a kind.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => Some(DocumentKind::Pdf),
            "docx" => Some(DocumentKind::Docx),
            "txt" => Some(DocumentKind::Text),
            "jpg" | "jpeg" => Some(DocumentKind::Jpeg),
            "png" => Some(DocumentKind::Png),
            _ => None,
        }
    }

    /// Extensions that map to this kind.
    pub fn extensions(self) -> &'static [&'static str] {
        match self {
            DocumentKind::Pdf => &["pdf"],
            DocumentKind::Docx => &["docx"],
            DocumentKind::Text => &["txt"],
            DocumentKind::Jpeg => &["jpg", "jpeg"],
            DocumentKind::Png => &["png"],
        }
    }
}

/// One validated input file. Immutable once built.
///
/// Serializes as its path. Deserializing re-validates the extension, so a
/// stored kind can never disagree with the file name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "PathBuf", into = "PathBuf")]
pub struct InputDocument {
    path: PathBuf,
    kind: DocumentKind,
}

impl InputDocument {
    /// Validate `path` against every supported kind.
    pub fn new(path: impl Into<PathBuf>) -> Result<Self, DocTextError> {
        Self::with_allowed(path, &ExtractionConfig::default())
    }

    /// Validate `path` against the kinds allowed by `config`.
    pub fn with_allowed(
        path: impl Into<PathBuf>,
        config: &ExtractionConfig,
    ) -> Result<Self, DocTextError> {
        let path = path.into();
        let kind = path
            .extension()
            .and_then(|e| e.to_str())
            .and_then(DocumentKind::from_extension)
            .filter(|k| config.allowed_kinds.contains(k));

        match kind {
            Some(kind) => {
                debug!("Accepted {} as {:?}", path.display(), kind);
                Ok(Self { path, kind })
            }
            None => Err(DocTextError::UnsupportedExtension {
                path,
                allowed: config.allowed_extensions_display(),
            }),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn kind(&self) -> DocumentKind {
        self.kind
    }

    /// File name for display and reporting.
    pub fn name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }

    /// Output document path: `<stem>_extracted_text.docx`, in `output_dir`
    /// when given, otherwise next to the input.
    pub fn output_path(&self, output_dir: Option<&Path>) -> PathBuf {
        let stem = self
            .path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let file_name = format!("{stem}{OUTPUT_SUFFIX}");

        match output_dir {
            Some(dir) => dir.join(file_name),
            None => match self.path.parent() {
                Some(parent) => parent.join(file_name),
                None => PathBuf::from(file_name),
            },
        }
    }
}

impl TryFrom<PathBuf> for InputDocument {
    type Error = DocTextError;

    fn try_from(path: PathBuf) -> Result<Self, Self::Error> {
        Self::new(path)
    }
}

impl From<InputDocument> for PathBuf {
    fn from(doc: InputDocument) -> Self {
        doc.path
    }
}
