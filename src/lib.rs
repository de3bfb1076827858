//! # edgequake-infographic
//!
//! Turn a block of text (an article, a transcript, meeting notes) into a
//! styled vertical infographic: a title, up to four insights, one icon per
//! insight, exported as PNG, PDF or SVG.
//!
//! ## Pipeline Overview
//!
//! ```text
//! text
//!  │
//!  ├─ 1. Summarize  LLM (edgequake-llm) → title + insights
//!  │                 └─ fallback: deterministic local segmenter
//!  ├─ 2. Icons      Gemini Imagen, one request per insight
//!  │                 └─ fallback: four built-in SVG icons
//!  ├─ 3. Compose    1080×1920 SVG render tree for the chosen style
//!  ├─ 4. Capture    in-process resvg at 2× (or an external rsvg-convert)
//!  └─ 5. Export     PNG, single-page PDF (pdfium) or raw SVG
//! ```
//!
//! The local segmenter ([`segment`]) is pure and total: every input string,
//! including the empty one, yields a valid [`SummaryResult`]. That is what
//! lets the default `Auto` modes run with no API key at all.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_infographic::{generate_to_file, GenerationConfig, StylePreset};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // AI stages are used when GEMINI_API_KEY (or another provider key) is set
//!     let config = GenerationConfig::builder()
//!         .style(StylePreset::ModernDark)
//!         .build()?;
//!     let text = std::fs::read_to_string("notes.txt")?;
//!     let stats = generate_to_file(&text, "notes.png", &config).await?;
//!     eprintln!("{} insights in {}ms", stats.insight_count, stats.total_duration_ms);
//!     Ok(())
//! }
//! ```
//!
//! Segmentation alone needs no runtime:
//!
//! ```rust
//! let summary = edgequake_infographic::segment("Launch Plan\n\nShip the beta.\n\nCollect feedback.");
//! assert_eq!(summary.title, "Launch Plan");
//! assert_eq!(summary.insights.len(), 2);
//! ```
//!
//! ## Feature Flags
//!
//! | Feature   | Default | Description |
//! |-----------|---------|-------------|
//! | `cli`     | on      | Enables the `infographic` binary (clap + anyhow + tracing-subscriber + indicatif) |
//! | `bundled` | off     | Embeds the pdfium library in the binary for offline PDF export |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! edgequake-infographic = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod generate;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod style;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{GenerationConfig, GenerationConfigBuilder, IconMode, SummarizerMode};
pub use error::{IconError, InfographicError};
pub use generate::{generate, generate_sync, generate_to_file, generate_to_file_as, summarize};
pub use output::{
    GenerationStats, IconArtifact, IconSource, InfographicOutput, InsightRecord, SummaryResult,
    SummarySource,
};
pub use pipeline::capture::{CommandRasterizer, Rasterizer, ResvgRasterizer};
pub use pipeline::export::ExportFormat;
pub use pipeline::icons::{fallback_icons, IconGenerator, ImagenIconGenerator};
pub use pipeline::segment::{segment, segment_with_limit};
pub use pipeline::summarize::{LlmSummarizer, LocalSummarizer, Summarizer};
pub use progress::{GenerationProgressCallback, NoopProgressCallback, ProgressCallback, Stage};
pub use style::StylePreset;
