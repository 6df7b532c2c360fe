//! Progress-callback trait for stage-level run events.
//!
//! Inject an [`Arc<dyn SummaryProgressCallback>`] via
//! [`crate::config::SummaryConfigBuilder::progress_callback`] to be told when
//! each of the four pipeline stages starts and finishes, and when each
//! figure file lands on disk. The CLI uses it to drive a spinner; a library
//! caller might forward it to a log or a UI.
//!
//! # Example
//!
//! ```rust
//! use paper2slide::{Stage, SummaryConfig, SummaryProgressCallback};
//! use std::sync::Arc;
//!
//! struct PrintStages;
//!
//! impl SummaryProgressCallback for PrintStages {
//!     fn on_stage_complete(&self, stage: Stage, elapsed_ms: u64) {
//!         eprintln!("{stage} done in {elapsed_ms}ms");
//!     }
//! }
//!
//! let config = SummaryConfig::builder()
//!     .progress_callback(Arc::new(PrintStages))
//!     .build()
//!     .unwrap();
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// The four pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    /// Query arXiv and download the PDF.
    Fetch,
    /// Find marked figure objects and write the intermediate PDF.
    Extract,
    /// Write one PDF per figure.
    Split,
    /// Render the slide sources from templates.
    Compose,
}

impl Stage {
    /// All stages in the order a run executes them.
    pub const ALL: [Stage; 4] = [Stage::Fetch, Stage::Extract, Stage::Split, Stage::Compose];
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Fetch => "fetch",
            Stage::Extract => "extract",
            Stage::Split => "split",
            Stage::Compose => "compose",
        };
        f.write_str(name)
    }
}

/// Called by the pipeline as a run progresses.
///
/// Stages run one after another on the caller's task, but the PDF stages
/// execute on tokio's blocking pool, so implementations must be
/// `Send + Sync`. All methods default to no-ops.
pub trait SummaryProgressCallback: Send + Sync {
    /// Called before a stage begins.
    fn on_stage_start(&self, stage: Stage) {
        let _ = stage;
    }

    /// Called after a stage finished successfully.
    ///
    /// # Arguments
    /// * `stage`     : the stage that finished
    /// * `elapsed_ms`: wall-clock time spent in the stage
    fn on_stage_complete(&self, stage: Stage, elapsed_ms: u64) {
        let _ = (stage, elapsed_ms);
    }

    /// Called after each `figure_<n>.pdf` is written.
    ///
    /// # Arguments
    /// * `figure_num`: 1-indexed figure number
    /// * `total`     : number of figures being written
    /// * `path`      : the file just written
    fn on_figure_written(&self, figure_num: usize, total: usize, path: &Path) {
        let _ = (figure_num, total, path);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl SummaryProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::SummaryConfig`].
pub type ProgressCallback = Arc<dyn SummaryProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct TrackingCallback {
        started: Mutex<Vec<Stage>>,
        completed: Mutex<Vec<Stage>>,
        figures: AtomicUsize,
    }

    impl SummaryProgressCallback for TrackingCallback {
        fn on_stage_start(&self, stage: Stage) {
            self.started.lock().unwrap().push(stage);
        }

        fn on_stage_complete(&self, stage: Stage, _elapsed_ms: u64) {
            self.completed.lock().unwrap().push(stage);
        }

        fn on_figure_written(&self, _figure_num: usize, _total: usize, _path: &Path) {
            self.figures.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_stage_start(Stage::Fetch);
        cb.on_stage_complete(Stage::Fetch, 12);
        cb.on_figure_written(1, 3, Path::new("figures/figure_1.pdf"));
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback::default();
        for stage in Stage::ALL {
            tracker.on_stage_start(stage);
            tracker.on_stage_complete(stage, 1);
        }
        tracker.on_figure_written(1, 2, Path::new("figure_1.pdf"));
        tracker.on_figure_written(2, 2, Path::new("figure_2.pdf"));

        assert_eq!(*tracker.started.lock().unwrap(), Stage::ALL.to_vec());
        assert_eq!(*tracker.completed.lock().unwrap(), Stage::ALL.to_vec());
        assert_eq!(tracker.figures.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn stage_display_is_lowercase() {
        assert_eq!(Stage::Extract.to_string(), "extract");
        assert_eq!(Stage::Compose.to_string(), "compose");
    }
}
