//! Configuration types for batch text extraction.
//!
//! All pipeline behaviour is controlled through [`ExtractionConfig`], built via
//! its [`ExtractionConfigBuilder`]. The recognition language, tool locations
//! and rendering resolution are deployment settings: they are fixed for the
//! lifetime of a pipeline and injected at construction, never read from
//! process-wide state.

use crate::error::DocTextError;
use crate::pipeline::input::DocumentKind;
use crate::progress::ProgressCallback;
use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;

/// Heading label written at the top of every output document.
pub const HEADING: &str = "Extracted Text";

/// Suffix appended to the input stem to form the output file name.
pub const OUTPUT_SUFFIX: &str = "_extracted_text.docx";

/// Configuration for a batch extraction run.
///
/// Built via [`ExtractionConfig::builder()`] or using
/// [`ExtractionConfig::default()`].
///
/// # Example
/// ```rust
/// use edgequake_doctext::ExtractionConfig;
///
/// let config = ExtractionConfig::builder()
///     .dpi(300)
///     .ocr_language("fra")
///     .concurrency(2)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ExtractionConfig {
    /// Rendering DPI used when rasterising each PDF page. Range: 72–600. Default: 300.
    ///
    /// 300 DPI is what tesseract is trained around; lower values lose accents
    /// and punctuation on body text.
    pub dpi: u32,

    /// Maximum rendered image dimension (width or height) in pixels. Default: 10 000.
    ///
    /// Keeps an A0 poster at 300 DPI from allocating gigabytes of pixels.
    /// Regular office pages (A4, Letter) stay well under this cap.
    pub max_rendered_pixels: u32,

    /// Tesseract language code, e.g. `"fra"`, `"eng"`, `"fra+eng"`. Default: `"fra"`.
    pub ocr_language: String,

    /// Tesseract executable. Default: `tesseract` resolved via `PATH`.
    pub tesseract_path: PathBuf,

    /// Directory holding the `*.traineddata` files. Default: tesseract's own.
    pub tessdata_dir: Option<PathBuf>,

    /// Explicit pdfium shared library. Default: `./`, then the system library.
    pub pdfium_library_path: Option<PathBuf>,

    /// Per-page (or per-image) OCR timeout in seconds. Default: 120.
    pub ocr_timeout_secs: u64,

    /// Whole-document rasterisation timeout in seconds. Default: 300.
    pub render_timeout_secs: u64,

    /// Number of inputs processed at once. Default: 1 (strictly sequential).
    ///
    /// Pages of one PDF are always recognised in order, one at a time; only
    /// whole inputs run side by side. Outcomes keep submission order either way.
    pub concurrency: usize,

    /// Directory for output documents. Default: `None`, next to each input.
    pub output_dir: Option<PathBuf>,

    /// Input kinds accepted by the batch. Default: every [`DocumentKind`].
    pub allowed_kinds: BTreeSet<DocumentKind>,

    /// Optional per-item progress callback.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            dpi: 300,
            max_rendered_pixels: 10_000,
            ocr_language: "fra".to_string(),
            tesseract_path: PathBuf::from("tesseract"),
            tessdata_dir: None,
            pdfium_library_path: None,
            ocr_timeout_secs: 120,
            render_timeout_secs: 300,
            concurrency: 1,
            output_dir: None,
            allowed_kinds: DocumentKind::ALL.iter().copied().collect(),
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ExtractionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractionConfig")
            .field("dpi", &self.dpi)
            .field("max_rendered_pixels", &self.max_rendered_pixels)
            .field("ocr_language", &self.ocr_language)
            .field("tesseract_path", &self.tesseract_path)
            .field("tessdata_dir", &self.tessdata_dir)
            .field("pdfium_library_path", &self.pdfium_library_path)
            .field("ocr_timeout_secs", &self.ocr_timeout_secs)
            .field("render_timeout_secs", &self.render_timeout_secs)
            .field("concurrency", &self.concurrency)
            .field("output_dir", &self.output_dir)
            .field("allowed_kinds", &self.allowed_kinds)
            .field(
                "progress_callback",
                &self
                    .progress_callback
                    .as_ref()
                    .map(|_| "<dyn BatchProgressCallback>"),
            )
            .finish()
    }
}

impl ExtractionConfig {
    /// Create a new builder for `ExtractionConfig`.
    pub fn builder() -> ExtractionConfigBuilder {
        ExtractionConfigBuilder {
            config: Self::default(),
        }
    }

    /// Comma-separated list of accepted extensions, for error messages.
    pub fn allowed_extensions_display(&self) -> String {
        self.allowed_kinds
            .iter()
            .flat_map(|k| k.extensions().iter().copied())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Builder for [`ExtractionConfig`].
#[derive(Debug)]
pub struct ExtractionConfigBuilder {
    config: ExtractionConfig,
}

impl ExtractionConfigBuilder {
    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi.clamp(72, 600);
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn ocr_language(mut self, lang: impl Into<String>) -> Self {
        self.config.ocr_language = lang.into();
        self
    }

    pub fn tesseract_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.tesseract_path = path.into();
        self
    }

    pub fn tessdata_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.tessdata_dir = Some(dir.into());
        self
    }

    pub fn pdfium_library_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_library_path = Some(path.into());
        self
    }

    pub fn ocr_timeout_secs(mut self, secs: u64) -> Self {
        self.config.ocr_timeout_secs = secs;
        self
    }

    pub fn render_timeout_secs(mut self, secs: u64) -> Self {
        self.config.render_timeout_secs = secs;
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = Some(dir.into());
        self
    }

    pub fn allowed_kinds(mut self, kinds: impl IntoIterator<Item = DocumentKind>) -> Self {
        self.config.allowed_kinds = kinds.into_iter().collect();
        self
    }

    /// Attach a progress callback to receive per-item events.
    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ExtractionConfig, DocTextError> {
        let c = &self.config;
        if c.dpi < 72 || c.dpi > 600 {
            return Err(DocTextError::InvalidConfig(format!(
                "DPI must be 72–600, got {}",
                c.dpi
            )));
        }
        if c.ocr_language.trim().is_empty() {
            return Err(DocTextError::InvalidConfig(
                "OCR language must not be empty".into(),
            ));
        }
        if c.ocr_timeout_secs == 0 || c.render_timeout_secs == 0 {
            return Err(DocTextError::InvalidConfig(
                "Timeouts must be ≥ 1 second".into(),
            ));
        }
        if c.allowed_kinds.is_empty() {
            return Err(DocTextError::InvalidConfig(
                "At least one input kind must be allowed".into(),
            ));
        }
        Ok(self.config)
    }
}
