//! Pipeline stages for batch text extraction.
//!
//! Each submodule implements exactly one step, so each can be tested alone
//! and the OCR engine or renderer can be swapped without touching the rest.
//!
//! ## Data Flow
//!
//! ```text
//!                     ┌─ pdf ──────▶ render ──▶ encode ──▶ ocr ──▶ postprocess ─┐
//! input ──▶ dispatch ─┼─ jpg/png ──────────────▶ encode ──▶ ocr ──▶ postprocess ─┼──▶ writer
//!                     └─ docx/txt ─▶ structured ────────────────────────────────┘
//! ```
//!
//! 1. [`input`]: validate the extension into a closed [`input::DocumentKind`]
//! 2. [`dispatch`]: route by kind; folds every failure into the result
//! 3. [`render`]: rasterise PDF pages; runs in `spawn_blocking` because
//!    pdfium is not async-safe
//! 4. [`encode`]: PNG-encode a raster for the OCR engine's stdin
//! 5. [`ocr`]: drive the tesseract child process
//! 6. [`structured`]: read Word paragraphs or plain text directly
//! 7. [`postprocess`]: strip engine artefacts and XML-invalid characters
//! 8. [`writer`]: atomically write the heading + body `.docx`
//!
//! [`docx`] is the WordprocessingML codec shared by `structured` and `writer`.

pub mod dispatch;
pub mod docx;
pub mod encode;
pub mod input;
pub mod ocr;
pub mod postprocess;
pub mod render;
pub mod structured;
pub mod writer;
