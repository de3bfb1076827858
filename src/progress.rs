//! Progress-callback trait for pipeline stage events.
//!
//! Inject an [`Arc<dyn GenerationProgressCallback>`] via
//! [`crate::config::GenerationConfigBuilder::progress_callback`] to receive
//! events as the pipeline moves through its stages. Callers can forward them
//! to a terminal spinner, a channel, or a UI status line without the library
//! knowing how the host application communicates.
//!
//! # Example
//!
//! ```rust
//! use edgequake_infographic::{GenerationConfig, GenerationProgressCallback, Stage};
//! use std::sync::Arc;
//!
//! struct PrintStages;
//!
//! impl GenerationProgressCallback for PrintStages {
//!     fn on_stage_start(&self, stage: Stage) {
//!         eprintln!("{}", stage.label());
//!     }
//! }
//!
//! let config = GenerationConfig::builder()
//!     .progress_callback(Arc::new(PrintStages))
//!     .build()
//!     .unwrap();
//! ```

use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A pipeline stage, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stage {
    Summarize,
    Icons,
    Compose,
    Capture,
    Export,
}

impl Stage {
    /// Short status line shown while the stage runs.
    pub fn label(self) -> &'static str {
        match self {
            Stage::Summarize => "Analyzing text...",
            Stage::Icons => "Generating visual assets...",
            Stage::Compose => "Composing final infographic...",
            Stage::Capture => "Capturing image...",
            Stage::Export => "Writing output...",
        }
    }
}

/// Called by the pipeline as it runs.
///
/// Implementations must be `Send + Sync`: icon requests may complete
/// concurrently. All methods default to no-ops so callers only override what
/// they care about.
pub trait GenerationProgressCallback: Send + Sync {
    /// Called when a stage begins.
    fn on_stage_start(&self, stage: Stage) {
        let _ = stage;
    }

    /// Called when a stage finishes successfully.
    fn on_stage_complete(&self, stage: Stage, duration_ms: u64) {
        let _ = (stage, duration_ms);
    }

    /// Called after each AI icon arrives.
    ///
    /// # Arguments
    /// * `index` — 0-based insight index
    /// * `total` — number of icons requested
    fn on_icon_complete(&self, index: usize, total: usize) {
        let _ = (index, total);
    }

    /// Called when an AI icon fails after retries.
    fn on_icon_error(&self, index: usize, total: usize, error: &str) {
        let _ = (index, total, error);
    }

    /// Called when the pipeline falls back to a non-AI path.
    fn on_fallback(&self, stage: Stage, reason: &str) {
        let _ = (stage, reason);
    }

    /// Called once after the last stage.
    fn on_generation_complete(&self, insight_count: usize, total_duration_ms: u64) {
        let _ = (insight_count, total_duration_ms);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl GenerationProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::GenerationConfig`].
pub type ProgressCallback = Arc<dyn GenerationProgressCallback>;
