//! Result types produced by the generation pipeline.
//!
//! [`SummaryResult`] is the structured content of an infographic and the
//! only value the local segmenter produces. [`InfographicOutput`] bundles it
//! with the icon artifacts, the render tree and the captured image so the
//! caller owns every intermediate product of one run.

use crate::error::IconError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::DynamicImage;
use serde::{Deserialize, Serialize};

/// One infographic content block.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InsightRecord {
    /// Short headline shown next to the icon.
    pub title: String,
    /// One or more sentences under the headline. May be empty.
    pub description: String,
    /// Icon keyword for AI image prompts. Always empty for local segmentation.
    #[serde(default)]
    pub keyword: String,
}

impl InsightRecord {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            keyword: String::new(),
        }
    }

    /// Keyword to use in an icon prompt: the AI keyword, else the title.
    pub fn icon_keyword(&self) -> &str {
        let k = self.keyword.trim();
        if k.is_empty() {
            self.title.trim()
        } else {
            k
        }
    }
}

/// Title plus an ordered list of at most four insights.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SummaryResult {
    pub title: String,
    pub insights: Vec<InsightRecord>,
}

/// Where the summary came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SummarySource {
    Ai,
    Local,
}

/// Where the icons came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IconSource {
    Ai,
    Fallback,
}

/// An encoded icon image (PNG from the image API, SVG for built-in icons).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IconArtifact {
    pub mime_type: String,
    pub data: Vec<u8>,
}

impl IconArtifact {
    pub fn new(mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data,
        }
    }

    /// `data:<mime>;base64,<payload>` suitable for an SVG `<image href>`.
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, STANDARD.encode(&self.data))
    }
}

/// Timing and provenance for one pipeline run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerationStats {
    pub summary_source: Option<SummarySource>,
    pub icon_source: Option<IconSource>,
    pub insight_count: usize,
    pub summarize_duration_ms: u64,
    pub icons_duration_ms: u64,
    pub capture_duration_ms: u64,
    pub total_duration_ms: u64,
    /// Icon failures that were replaced with built-in icons.
    pub icon_errors: Vec<IconError>,
    /// Human-readable notes about fallbacks taken during the run.
    pub warnings: Vec<String>,
}

/// Everything produced by a full pipeline run.
#[derive(Debug, Clone)]
pub struct InfographicOutput {
    pub summary: SummaryResult,
    /// One icon per insight, same order.
    pub icons: Vec<IconArtifact>,
    /// The SVG render tree handed to the rasterizer.
    pub svg: String,
    /// Captured raster image. `None` when capture was skipped (SVG export).
    pub image: Option<DynamicImage>,
    pub stats: GenerationStats,
}
