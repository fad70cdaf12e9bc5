//! Progress-callback trait for per-item batch events.
//!
//! Inject an [`Arc<dyn BatchProgressCallback>`] via
//! [`crate::config::ExtractionConfigBuilder::progress_callback`] to receive
//! events as the coordinator works through the batch. Callers can forward
//! them to a progress bar, a channel or a job record without the library
//! knowing which.
//!
//! # Example
//!
//! ```rust
//! use edgequake_doctext::{BatchProgressCallback, ExtractionConfig, ItemOutcome};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     done: AtomicUsize,
//! }
//!
//! impl BatchProgressCallback for CountingCallback {
//!     fn on_item_complete(&self, index: usize, total: usize, outcome: &ItemOutcome) {
//!         self.done.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("{}/{} {}", index + 1, total, outcome.input.display());
//!     }
//! }
//!
//! let config = ExtractionConfig::builder()
//!     .progress_callback(Arc::new(CountingCallback { done: AtomicUsize::new(0) }))
//!     .build()
//!     .unwrap();
//! ```

use crate::output::{BatchOutcome, ItemOutcome};
use std::sync::Arc;

/// Called by the batch coordinator as it processes each input.
///
/// All methods default to no-ops. With `concurrency > 1`, `on_item_start`
/// and `on_item_complete` may be called from several tasks at once and out
/// of index order; protect shared state accordingly.
pub trait BatchProgressCallback: Send + Sync {
    /// Called once before the first item.
    fn on_batch_start(&self, total: usize) {
        let _ = total;
    }

    /// Called before an item is dispatched.
    ///
    /// # Arguments
    /// * `index`: 0-based position in the batch
    /// * `total`: batch size
    /// * `name`:  input file name
    fn on_item_start(&self, index: usize, total: usize, name: &str) {
        let _ = (index, total, name);
    }

    /// Called when an item reaches a terminal state, skipped items included.
    fn on_item_complete(&self, index: usize, total: usize, outcome: &ItemOutcome) {
        let _ = (index, total, outcome);
    }

    /// Called once after every item has been attempted.
    fn on_batch_complete(&self, outcome: &BatchOutcome) {
        let _ = outcome;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl BatchProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ExtractionConfig`].
pub type ProgressCallback = Arc<dyn BatchProgressCallback>;
