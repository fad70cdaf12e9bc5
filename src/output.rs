//! Result types: per-input extraction and per-batch outcome.
//!
//! Everything here is `Serialize` so the CLI can emit the whole outcome with
//! `--json` and host applications can store it as-is.

use crate::error::ExtractionFailure;
use crate::pipeline::input::DocumentKind;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// The text recovered from one input.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Extraction {
    /// Extracted text. Empty when nothing could be recovered.
    pub text: String,

    /// Pages passed to OCR: PDF page count, 1 for an image, 0 otherwise.
    pub pages: usize,

    /// Non-fatal failures hit along the way, in the order they occurred.
    pub failures: Vec<ExtractionFailure>,
}

impl Extraction {
    /// `true` when part or all of the input could not be read.
    ///
    /// Distinguishes "the document is genuinely empty" from "extraction
    /// failed": both can produce an empty `text`.
    pub fn is_degraded(&self) -> bool {
        !self.failures.is_empty()
    }
}

/// Terminal state of one batch item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ItemStatus {
    /// Extracted cleanly and written.
    Written,

    /// Written, but with empty or partial text because extraction failed
    /// somewhere. See [`ItemOutcome::failures`].
    Degraded,

    /// Extraction ran but the output document could not be written.
    WriteFailed { detail: String },

    /// Never dispatched: the file's extension is not accepted.
    Skipped { reason: String },
}

/// Outcome of one input in a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemOutcome {
    /// Input path as submitted.
    pub input: PathBuf,

    /// Output document path; `None` for skipped items.
    pub output: Option<PathBuf>,

    /// Input kind; `None` for skipped items.
    pub kind: Option<DocumentKind>,

    pub status: ItemStatus,

    /// Characters of extracted text.
    pub chars: usize,

    pub failures: Vec<ExtractionFailure>,

    /// Wall-clock time spent on this item.
    pub duration_ms: u64,
}

impl ItemOutcome {
    /// `true` when an output document now exists for this input.
    pub fn is_written(&self) -> bool {
        matches!(self.status, ItemStatus::Written | ItemStatus::Degraded)
    }
}

/// Ordered outcomes for a whole batch, plus summary counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchOutcome {
    /// One entry per submitted input, in submission order.
    pub items: Vec<ItemOutcome>,

    /// Wall-clock time for the whole batch.
    pub total_duration_ms: u64,
}

impl BatchOutcome {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Items with an output document (clean or degraded).
    pub fn written(&self) -> usize {
        self.items.iter().filter(|i| i.is_written()).count()
    }

    pub fn degraded(&self) -> usize {
        self.count(|s| matches!(s, ItemStatus::Degraded))
    }

    pub fn write_failed(&self) -> usize {
        self.count(|s| matches!(s, ItemStatus::WriteFailed { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|s| matches!(s, ItemStatus::Skipped { .. }))
    }

    /// `true` when every item produced an output document.
    pub fn all_written(&self) -> bool {
        self.written() == self.items.len()
    }

    fn count(&self, pred: impl Fn(&ItemStatus) -> bool) -> usize {
        self.items.iter().filter(|i| pred(&i.status)).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(status: ItemStatus) -> ItemOutcome {
        ItemOutcome {
            input: PathBuf::from("in.txt"),
            output: Some(PathBuf::from("in_extracted_text.docx")),
            kind: Some(DocumentKind::Text),
            status,
            chars: 0,
            failures: Vec::new(),
            duration_ms: 0,
        }
    }

    #[test]
    fn empty_extraction_without_failures_is_not_degraded() {
        assert!(!Extraction::default().is_degraded());
    }

    #[test]
    fn batch_counts() {
        let outcome = BatchOutcome {
            items: vec![
                item(ItemStatus::Written),
                item(ItemStatus::Degraded),
                item(ItemStatus::WriteFailed {
                    detail: "disk full".into(),
                }),
                item(ItemStatus::Skipped {
                    reason: "odt".into(),
                }),
            ],
            total_duration_ms: 5,
        };
        assert_eq!(outcome.len(), 4);
        assert_eq!(outcome.written(), 2);
        assert_eq!(outcome.degraded(), 1);
        assert_eq!(outcome.write_failed(), 1);
        assert_eq!(outcome.skipped(), 1);
        assert!(!outcome.all_written());
    }

    #[test]
    fn status_serialises_with_tag() {
        let json = serde_json::to_value(item(ItemStatus::WriteFailed {
            detail: "disk full".into(),
        }))
        .unwrap();
        assert_eq!(json["status"]["status"], "write_failed");
        assert_eq!(json["status"]["detail"], "disk full");
        assert_eq!(json["kind"], "text");
    }
}
