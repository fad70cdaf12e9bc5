//! Batch entry points: extract and write every input, in order.
//!
//! The coordinator owns the only cross-input state there is, the outcome
//! accumulator. Each input goes through dispatch then write exactly once;
//! nothing an input does can stop the ones after it.
//!
//! With `concurrency == 1` inputs run strictly one after another. Above that,
//! inputs run side by side, except that inputs sharing an output path are
//! kept in submission order so the later one is the file left on disk.
//! Outcomes are reported in submission order either way.

use crate::config::ExtractionConfig;
use crate::error::DocTextError;
use crate::output::{BatchOutcome, ItemOutcome, ItemStatus};
use crate::pipeline::dispatch::ExtractionDispatcher;
use crate::pipeline::input::InputDocument;
use crate::pipeline::ocr::TesseractRecognizer;
use crate::pipeline::render::bind_pdfium;
use crate::pipeline::writer::ResultWriter;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn};

/// One batch slot: a validated input, or a path that was rejected up front.
#[derive(Debug, Clone)]
enum Entry {
    Doc(InputDocument),
    Skip { path: PathBuf, reason: String },
}

/// Runs batches through an [`ExtractionDispatcher`] and a [`ResultWriter`].
pub struct BatchCoordinator {
    config: ExtractionConfig,
    dispatcher: ExtractionDispatcher,
    writer: ResultWriter,
}

impl BatchCoordinator {
    /// Coordinator with the pdfium + tesseract engines from `config`.
    pub fn new(config: ExtractionConfig) -> Self {
        let dispatcher = ExtractionDispatcher::new(&config);
        Self::with_dispatcher(config, dispatcher)
    }

    /// Coordinator around a caller-built dispatcher (custom or mock engines).
    pub fn with_dispatcher(config: ExtractionConfig, dispatcher: ExtractionDispatcher) -> Self {
        Self {
            config,
            dispatcher,
            writer: ResultWriter::new(),
        }
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    /// Process already-validated inputs.
    pub async fn process_batch(&self, docs: &[InputDocument]) -> BatchOutcome {
        let entries: Vec<Entry> = docs.iter().cloned().map(Entry::Doc).collect();
        self.run(&entries).await
    }

    /// Validate and process paths. Paths whose extension is not accepted are
    /// recorded as [`ItemStatus::Skipped`] in their slot; the rest of the
    /// batch still runs.
    pub async fn process_paths<P: AsRef<Path>>(&self, paths: &[P]) -> BatchOutcome {
        let entries: Vec<Entry> = paths
            .iter()
            .map(|p| {
                let path = p.as_ref();
                match InputDocument::with_allowed(path, &self.config) {
                    Ok(doc) => Entry::Doc(doc),
                    Err(e) => Entry::Skip {
                        path: path.to_path_buf(),
                        reason: e.to_string(),
                    },
                }
            })
            .collect();
        self.run(&entries).await
    }

    async fn run(&self, entries: &[Entry]) -> BatchOutcome {
        let start = Instant::now();
        let total = entries.len();
        info!(
            "Starting batch: {} inputs, concurrency {}",
            total, self.config.concurrency
        );
        if let Some(ref cb) = self.config.progress_callback {
            cb.on_batch_start(total);
        }

        // Grouping also warns about inputs that collide on an output path.
        let groups = self.group_by_output(entries);

        let items = if self.config.concurrency <= 1 {
            self.process_sequential(entries).await
        } else {
            self.process_concurrent(entries, groups).await
        };

        let outcome = BatchOutcome {
            items,
            total_duration_ms: start.elapsed().as_millis() as u64,
        };

        info!(
            "Batch complete: {}/{} written ({} degraded), {} write failures, {} skipped, {}ms",
            outcome.written(),
            total,
            outcome.degraded(),
            outcome.write_failed(),
            outcome.skipped(),
            outcome.total_duration_ms
        );
        if let Some(ref cb) = self.config.progress_callback {
            cb.on_batch_complete(&outcome);
        }
        outcome
    }

    /// Partition entry indices by output path, in order of first appearance.
    /// Skipped entries each get a group of their own.
    fn group_by_output(&self, entries: &[Entry]) -> Vec<Vec<usize>> {
        let mut groups: Vec<Vec<usize>> = Vec::new();
        let mut by_output: HashMap<PathBuf, usize> = HashMap::new();

        for (index, entry) in entries.iter().enumerate() {
            let Entry::Doc(doc) = entry else {
                groups.push(vec![index]);
                continue;
            };
            let output = doc.output_path(self.config.output_dir.as_deref());
            let key = collision_key(&output);
            match by_output.get(&key) {
                Some(&g) => {
                    warn!(
                        "{} and {} both write {}; the later input wins",
                        entry_name(&entries[groups[g][0]]),
                        doc.name(),
                        output.display()
                    );
                    groups[g].push(index);
                }
                None => {
                    by_output.insert(key, groups.len());
                    groups.push(vec![index]);
                }
            }
        }
        groups
    }

    async fn process_sequential(&self, entries: &[Entry]) -> Vec<ItemOutcome> {
        let total = entries.len();
        let mut items = Vec::with_capacity(total);
        for (index, entry) in entries.iter().enumerate() {
            items.push(self.process_one(index, total, entry).await);
        }
        items
    }

    async fn process_concurrent(
        &self,
        entries: &[Entry],
        groups: Vec<Vec<usize>>,
    ) -> Vec<ItemOutcome> {
        let total = entries.len();
        let mut indexed: Vec<(usize, ItemOutcome)> = stream::iter(groups.into_iter().map(
            |group| async move {
                // Same output path: strictly in submission order.
                let mut done = Vec::with_capacity(group.len());
                for index in group {
                    let item = self.process_one(index, total, &entries[index]).await;
                    done.push((index, item));
                }
                done
            },
        ))
        .buffer_unordered(self.config.concurrency)
        .flat_map(stream::iter)
        .collect()
        .await;

        // Restore submission order.
        indexed.sort_by_key(|(index, _)| *index);
        indexed.into_iter().map(|(_, item)| item).collect()
    }

    async fn process_one(&self, index: usize, total: usize, entry: &Entry) -> ItemOutcome {
        let start = Instant::now();
        if let Some(ref cb) = self.config.progress_callback {
            cb.on_item_start(index, total, &entry_name(entry));
        }

        let item = match entry {
            Entry::Skip { path, reason } => {
                warn!("Skipping {}: {}", path.display(), reason);
                ItemOutcome {
                    input: path.clone(),
                    output: None,
                    kind: None,
                    status: ItemStatus::Skipped {
                        reason: reason.clone(),
                    },
                    chars: 0,
                    failures: Vec::new(),
                    duration_ms: start.elapsed().as_millis() as u64,
                }
            }
            Entry::Doc(doc) => self.extract_and_write(doc, start).await,
        };

        if let Some(ref cb) = self.config.progress_callback {
            cb.on_item_complete(index, total, &item);
        }
        item
    }

    async fn extract_and_write(&self, doc: &InputDocument, start: Instant) -> ItemOutcome {
        let output = doc.output_path(self.config.output_dir.as_deref());
        let extraction = self.dispatcher.extract(doc).await;

        let status = match self.writer.write(&extraction.text, &output).await {
            Ok(()) if extraction.is_degraded() => ItemStatus::Degraded,
            Ok(()) => ItemStatus::Written,
            Err(e) => {
                warn!("{}: {}", doc.name(), e);
                ItemStatus::WriteFailed {
                    detail: e.to_string(),
                }
            }
        };

        ItemOutcome {
            input: doc.path().to_path_buf(),
            output: Some(output),
            kind: Some(doc.kind()),
            status,
            chars: extraction.text.chars().count(),
            failures: extraction.failures,
            duration_ms: start.elapsed().as_millis() as u64,
        }
    }
}

/// Lexically normalised absolute form of `path`, so `a.pdf`, `./a.pdf` and
/// `d/../a.pdf` compare equal. Symlinks are not resolved.
fn collision_key(path: &Path) -> PathBuf {
    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    let mut key = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !key.pop() {
                    key.push(component);
                }
            }
            other => key.push(other),
        }
    }
    key
}

fn entry_name(entry: &Entry) -> String {
    match entry {
        Entry::Doc(doc) => doc.name(),
        Entry::Skip { path, .. } => path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string()),
    }
}

/// Availability of one external engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EngineStatus {
    pub available: bool,
    /// Version banner when available, otherwise the reason it is not.
    pub detail: String,
}

/// Result of [`check_engines`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EngineReport {
    pub ocr: EngineStatus,
    pub pdf_renderer: EngineStatus,
}

impl EngineReport {
    pub fn all_available(&self) -> bool {
        self.ocr.available && self.pdf_renderer.available
    }
}

/// Check that the OCR engine starts and that pdfium can be bound.
///
/// Does not touch any input; use it at startup to fail fast on a broken
/// deployment instead of degrading every PDF and image in the first batch.
pub async fn check_engines(config: &ExtractionConfig) -> Result<EngineReport, DocTextError> {
    let ocr = match TesseractRecognizer::new(config).version().await {
        Ok(version) => EngineStatus {
            available: true,
            detail: version,
        },
        Err(e) => EngineStatus {
            available: false,
            detail: e.to_string(),
        },
    };

    let library = config.pdfium_library_path.clone();
    let bound = tokio::task::spawn_blocking(move || bind_pdfium(library.as_deref()).map(|_| ()))
        .await
        .map_err(|e| DocTextError::Internal(format!("pdfium check panicked: {e}")))?;
    let pdf_renderer = match bound {
        Ok(()) => EngineStatus {
            available: true,
            detail: match config.pdfium_library_path {
                Some(ref p) => format!("pdfium bound from {}", p.display()),
                None => "pdfium bound".to_string(),
            },
        },
        Err(e) => EngineStatus {
            available: false,
            detail: e.to_string(),
        },
    };

    Ok(EngineReport { ocr, pdf_renderer })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coordinator(config: ExtractionConfig) -> BatchCoordinator {
        BatchCoordinator::new(config)
    }

    #[test]
    fn duplicate_stems_share_a_group() {
        let c = coordinator(ExtractionConfig::default());
        let entries: Vec<Entry> = ["d/a.pdf", "d/b.txt", "d/a.txt", "d/c.png"]
            .iter()
            .map(|p| Entry::Doc(InputDocument::new(p).unwrap()))
            .collect();
        assert_eq!(
            c.group_by_output(&entries),
            vec![vec![0, 2], vec![1], vec![3]]
        );
    }

    #[test]
    fn equivalent_spellings_of_a_path_share_a_group() {
        let c = coordinator(ExtractionConfig::default());
        let entries: Vec<Entry> = ["a.pdf", "./a.txt", "d/../a.png", "b.txt"]
            .iter()
            .map(|p| Entry::Doc(InputDocument::new(p).unwrap()))
            .collect();
        assert_eq!(c.group_by_output(&entries), vec![vec![0, 1, 2], vec![3]]);
    }

    #[test]
    fn collision_key_folds_dot_segments() {
        assert_eq!(
            collision_key(Path::new("/srv/in/./x/../a_extracted_text.docx")),
            PathBuf::from("/srv/in/a_extracted_text.docx")
        );
        assert_eq!(collision_key(Path::new("a.docx")), collision_key(Path::new("./a.docx")));
    }

    #[test]
    fn output_dir_collapses_stems_across_directories() {
        let c = coordinator(ExtractionConfig::builder().output_dir("out").build().unwrap());
        let entries: Vec<Entry> = ["x/a.txt", "y/a.txt"]
            .iter()
            .map(|p| Entry::Doc(InputDocument::new(p).unwrap()))
            .collect();
        assert_eq!(c.group_by_output(&entries), vec![vec![0, 1]]);
    }

    #[test]
    fn skipped_entries_stand_alone() {
        let c = coordinator(ExtractionConfig::default());
        let entries = vec![
            Entry::Skip {
                path: "a.odt".into(),
                reason: "unsupported".into(),
            },
            Entry::Skip {
                path: "a.odt".into(),
                reason: "unsupported".into(),
            },
        ];
        assert_eq!(c.group_by_output(&entries), vec![vec![0], vec![1]]);
    }

    #[tokio::test]
    async fn empty_batch_is_empty_outcome() {
        let c = coordinator(ExtractionConfig::default());
        let outcome = c.process_batch(&[]).await;
        assert!(outcome.is_empty());
        assert!(outcome.all_written());
    }

    #[tokio::test]
    async fn check_engines_reports_missing_ocr_binary() {
        let config = ExtractionConfig::builder()
            .tesseract_path("/definitely/not/a/tesseract")
            .build()
            .unwrap();
        let report = check_engines(&config).await.unwrap();
        assert!(!report.ocr.available);
        assert!(!report.all_available());
    }
}
