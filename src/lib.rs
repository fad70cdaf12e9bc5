//! # edgequake-doctext
//!
//! Batch text extraction from PDF, Word, plain-text and image files, with
//! every result written back out as a small Word document.
//!
//! ## Pipeline Overview
//!
//! ```text
//! batch of paths
//!  │
//!  ├─ 1. Input     validate extension → DocumentKind (pdf, docx, txt, jpg/jpeg, png)
//!  ├─ 2. Dispatch  route by kind
//!  │     ├─ pdf        rasterise pages via pdfium, OCR each page with tesseract
//!  │     ├─ jpg/png    OCR the image directly
//!  │     └─ docx/txt   read the stored text, no OCR
//!  ├─ 3. Write     "<stem>_extracted_text.docx": Title heading + one body paragraph
//!  └─ 4. Report    ordered per-input outcome (written / degraded / write failed / skipped)
//! ```
//!
//! Failures never abort a batch. A page that cannot be recognised contributes
//! empty text; a document that cannot be read at all still gets an output
//! with an empty body; a write failure is recorded against that input only.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_doctext::{BatchCoordinator, ExtractionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ExtractionConfig::builder()
//!         .ocr_language("fra")
//!         .output_dir("out")
//!         .build()?;
//!     let coordinator = BatchCoordinator::new(config);
//!     let outcome = coordinator
//!         .process_paths(&["scan.pdf", "letter.docx", "IMG_0042.JPG"])
//!         .await;
//!     for item in &outcome.items {
//!         println!("{} → {:?}", item.input.display(), item.status);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## External engines
//!
//! PDF rendering needs a pdfium shared library (`PDFIUM_LIB_PATH`, a copy in
//! the working directory, or a system install). OCR needs the `tesseract`
//! binary and the traineddata for the configured language. Neither is needed
//! for Word or plain-text inputs. [`check_engines`] reports what is missing.
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `doctext` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! edgequake-doctext = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod batch;
pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use batch::{check_engines, BatchCoordinator, EngineReport, EngineStatus};
pub use config::{ExtractionConfig, ExtractionConfigBuilder, HEADING, OUTPUT_SUFFIX};
pub use error::{DocTextError, ExtractionFailure, OcrError, WriteError};
pub use output::{BatchOutcome, Extraction, ItemOutcome, ItemStatus};
pub use pipeline::dispatch::ExtractionDispatcher;
pub use pipeline::input::{DocumentKind, InputDocument};
pub use pipeline::ocr::{Recognizer, TesseractRecognizer};
pub use pipeline::render::{PageImage, PageRasterizer, PdfiumRasterizer, RenderedPages};
pub use pipeline::writer::ResultWriter;
pub use progress::{BatchProgressCallback, NoopProgressCallback, ProgressCallback};
