//! Progress-callback trait for normalisation and generation events.
//!
//! Inject an [`Arc<dyn GenerationProgressCallback>`] via
//! [`crate::config::StudyConfigBuilder::progress_callback`] to follow a run:
//! files being read, files rejected, the model call starting and ending.
//!
//! # Example
//!
//! ```rust
//! use smartlearn::{GenerationProgressCallback, StudyConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct RejectCounter(AtomicUsize);
//!
//! impl GenerationProgressCallback for RejectCounter {
//!     fn on_file_rejected(&self, name: &str, error: &str) {
//!         self.0.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("skipped {name}: {error}");
//!     }
//! }
//!
//! let config = StudyConfig::builder()
//!     .progress_callback(Arc::new(RejectCounter(AtomicUsize::new(0))))
//!     .build()
//!     .unwrap();
//! ```

use crate::pipeline::input::InputKind;
use crate::pipeline::llm::GenerationStats;
use std::sync::Arc;

/// Called by the pipeline as it normalises inputs and calls the model.
///
/// Files are read concurrently, so `on_file_ready` and `on_file_rejected`
/// may fire from different tasks. All methods default to no-ops.
pub trait GenerationProgressCallback: Send + Sync {
    /// Called once before any input is read.
    fn on_normalize_start(&self, total_inputs: usize) {
        let _ = total_inputs;
    }

    /// Called when an input has been normalised.
    fn on_file_ready(&self, name: &str, kind: InputKind) {
        let _ = (name, kind);
    }

    /// Called when an input could not be normalised and is left out.
    fn on_file_rejected(&self, name: &str, error: &str) {
        let _ = (name, error);
    }

    /// Called just before the model request is sent.
    ///
    /// # Arguments
    /// * `parts` — number of content parts in the request
    fn on_generation_start(&self, parts: usize) {
        let _ = parts;
    }

    /// Called when the model reply parsed into learning material.
    fn on_generation_complete(&self, stats: &GenerationStats) {
        let _ = stats;
    }

    /// Called when the model call failed (with the diagnostic cause).
    fn on_generation_failed(&self, error: &str) {
        let _ = error;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl GenerationProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::StudyConfig`].
pub type ProgressCallback = Arc<dyn GenerationProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct TrackingCallback {
        ready: AtomicUsize,
        rejected: AtomicUsize,
        parts: AtomicUsize,
        failures: AtomicUsize,
    }

    impl GenerationProgressCallback for TrackingCallback {
        fn on_file_ready(&self, _name: &str, _kind: InputKind) {
            self.ready.fetch_add(1, Ordering::SeqCst);
        }

        fn on_file_rejected(&self, _name: &str, _error: &str) {
            self.rejected.fetch_add(1, Ordering::SeqCst);
        }

        fn on_generation_start(&self, parts: usize) {
            self.parts.store(parts, Ordering::SeqCst);
        }

        fn on_generation_failed(&self, _error: &str) {
            self.failures.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_normalize_start(2);
        cb.on_file_ready("a.pdf", InputKind::Pdf);
        cb.on_file_rejected("b.docx", "broken");
        cb.on_generation_start(3);
        cb.on_generation_complete(&GenerationStats::default());
        cb.on_generation_failed("timeout");
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback::default();
        tracker.on_file_ready("a.pdf", InputKind::Pdf);
        tracker.on_file_ready("b.txt", InputKind::Text);
        tracker.on_file_rejected("c.docx", "broken");
        tracker.on_generation_start(3);
        tracker.on_generation_failed("timeout");

        assert_eq!(tracker.ready.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.rejected.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.parts.load(Ordering::SeqCst), 3);
        assert_eq!(tracker.failures.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn arc_dyn_callback_works() {
        let cb: ProgressCallback = Arc::new(NoopProgressCallback);
        cb.on_normalize_start(1);
    }
}
