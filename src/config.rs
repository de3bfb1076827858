//! Configuration types for infographic generation.
//!
//! All pipeline behaviour is controlled through [`GenerationConfig`], built
//! via its [`GenerationConfigBuilder`]. Collaborators (LLM provider,
//! summarizer, icon generator, rasterizer) can be injected as trait objects;
//! when they are not, the pipeline builds the default implementation from
//! the remaining fields.

use crate::error::InfographicError;
use crate::pipeline::capture::Rasterizer;
use crate::pipeline::icons::IconGenerator;
use crate::pipeline::segment::MAX_INSIGHTS;
use crate::pipeline::summarize::Summarizer;
use crate::progress::ProgressCallback;
use crate::style::StylePreset;
use edgequake_llm::LLMProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Default LLM model for the summarization stage.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Default Imagen model for icon generation.
pub const DEFAULT_IMAGE_MODEL: &str = "imagen-4.0-generate-001";

/// Configuration for one infographic generation.
///
/// # Example
/// ```rust
/// use edgequake_infographic::{GenerationConfig, StylePreset, SummarizerMode};
///
/// let config = GenerationConfig::builder()
///     .style(StylePreset::ModernDark)
///     .summarizer(SummarizerMode::Local)
///     .max_insights(3)
///     .build()
///     .unwrap();
/// assert_eq!(config.max_insights, 3);
/// ```
#[derive(Clone)]
pub struct GenerationConfig {
    /// Visual theme. Default: [`StylePreset::Corporate`].
    pub style: StylePreset,

    /// How the title and insights are produced. Default: [`SummarizerMode::Auto`].
    pub summarizer: SummarizerMode,

    /// Where icon images come from. Default: [`IconMode::Auto`].
    pub icons: IconMode,

    /// Maximum insights per infographic. Range: 1–4. Default: 4.
    pub max_insights: usize,

    /// LLM model identifier for summarization. If None, uses [`DEFAULT_MODEL`].
    pub model: Option<String>,

    /// LLM provider name (e.g. "gemini", "openai", "anthropic").
    /// If None, the provider is auto-detected from the environment.
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Pre-constructed summarizer. Takes precedence over every LLM setting.
    pub summarizer_impl: Option<Arc<dyn Summarizer>>,

    /// Pre-constructed icon generator. Takes precedence over `api_key`.
    pub icon_generator: Option<Arc<dyn IconGenerator>>,

    /// Pre-constructed rasterizer. Takes precedence over `rasterizer_command`.
    pub rasterizer: Option<Arc<dyn Rasterizer>>,

    /// Gemini API key for Imagen icon requests. Falls back to `GEMINI_API_KEY`.
    pub api_key: Option<String>,

    /// Imagen model for icons. Default: [`DEFAULT_IMAGE_MODEL`].
    pub image_model: String,

    /// Sampling temperature for summarization. Default: 0.2.
    pub temperature: f32,

    /// Maximum tokens the LLM may generate for the summary. Default: 2048.
    pub max_tokens: usize,

    /// Retries per AI request on transient failure. Default: 3.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds, doubled per attempt. Default: 500.
    pub retry_backoff_ms: u64,

    /// Icon requests in flight at once. `1` issues them sequentially. Default: 4.
    pub icon_concurrency: usize,

    /// Per-request timeout for AI calls in seconds. Default: 60.
    pub api_timeout_secs: u64,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Raster scale relative to the 1080×1920 canvas. Range: 0.5–4. Default: 2.
    pub scale: f32,

    /// External program used to rasterize the SVG render tree (any tool
    /// accepting `rsvg-convert` flags). None renders in-process with resvg.
    pub rasterizer_command: Option<String>,

    /// Optional progress callback for stage-level events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            style: StylePreset::default(),
            summarizer: SummarizerMode::default(),
            icons: IconMode::default(),
            max_insights: MAX_INSIGHTS,
            model: None,
            provider_name: None,
            provider: None,
            summarizer_impl: None,
            icon_generator: None,
            rasterizer: None,
            api_key: None,
            image_model: DEFAULT_IMAGE_MODEL.to_string(),
            temperature: 0.2,
            max_tokens: 2048,
            max_retries: 3,
            retry_backoff_ms: 500,
            icon_concurrency: 4,
            api_timeout_secs: 60,
            download_timeout_secs: 120,
            scale: 2.0,
            rasterizer_command: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for GenerationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenerationConfig")
            .field("style", &self.style)
            .field("summarizer", &self.summarizer)
            .field("icons", &self.icons)
            .field("max_insights", &self.max_insights)
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("summarizer_impl", &self.summarizer_impl.as_ref().map(|_| "<dyn Summarizer>"))
            .field("icon_generator", &self.icon_generator.as_ref().map(|_| "<dyn IconGenerator>"))
            .field("rasterizer", &self.rasterizer.as_ref().map(|_| "<dyn Rasterizer>"))
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("image_model", &self.image_model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("max_retries", &self.max_retries)
            .field("icon_concurrency", &self.icon_concurrency)
            .field("scale", &self.scale)
            .field("rasterizer_command", &self.rasterizer_command)
            .finish()
    }
}

impl GenerationConfig {
    /// Create a new builder for `GenerationConfig`.
    pub fn builder() -> GenerationConfigBuilder {
        GenerationConfigBuilder {
            config: Self::default(),
        }
    }

    /// The API key from config, else `GEMINI_API_KEY`, else `GOOGLE_API_KEY`.
    ///
    /// Blank values at any level are skipped.
    pub fn resolved_api_key(&self) -> Option<String> {
        let non_blank = |k: &String| !k.trim().is_empty();
        self.api_key
            .clone()
            .filter(non_blank)
            .or_else(|| std::env::var("GEMINI_API_KEY").ok().filter(non_blank))
            .or_else(|| std::env::var("GOOGLE_API_KEY").ok().filter(non_blank))
    }
}

/// Upper bound for `max_retries`.
pub const MAX_RETRIES_LIMIT: u32 = 10;

/// Retry delay before `attempt` (1-based): `base * 2^(attempt-1)`,
/// saturating rather than overflowing.
pub(crate) fn backoff_ms(base: u64, attempt: u32) -> u64 {
    let factor = 2u64
        .checked_pow(attempt.saturating_sub(1))
        .unwrap_or(u64::MAX);
    base.saturating_mul(factor)
}

/// Builder for [`GenerationConfig`].
#[derive(Debug)]
pub struct GenerationConfigBuilder {
    config: GenerationConfig,
}

impl GenerationConfigBuilder {
    pub fn style(mut self, style: StylePreset) -> Self {
        self.config.style = style;
        self
    }

    pub fn summarizer(mut self, mode: SummarizerMode) -> Self {
        self.config.summarizer = mode;
        self
    }

    pub fn icons(mut self, mode: IconMode) -> Self {
        self.config.icons = mode;
        self
    }

    pub fn max_insights(mut self, n: usize) -> Self {
        self.config.max_insights = n;
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn summarizer_impl(mut self, summarizer: Arc<dyn Summarizer>) -> Self {
        self.config.summarizer_impl = Some(summarizer);
        self
    }

    pub fn icon_generator(mut self, generator: Arc<dyn IconGenerator>) -> Self {
        self.config.icon_generator = Some(generator);
        self
    }

    pub fn rasterizer(mut self, rasterizer: Arc<dyn Rasterizer>) -> Self {
        self.config.rasterizer = Some(rasterizer);
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    pub fn image_model(mut self, model: impl Into<String>) -> Self {
        self.config.image_model = model.into();
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn icon_concurrency(mut self, n: usize) -> Self {
        self.config.icon_concurrency = n.max(1);
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn scale(mut self, scale: f32) -> Self {
        self.config.scale = scale;
        self
    }

    pub fn rasterizer_command(mut self, cmd: impl Into<String>) -> Self {
        self.config.rasterizer_command = Some(cmd.into());
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<GenerationConfig, InfographicError> {
        let c = &self.config;
        if c.max_insights == 0 || c.max_insights > MAX_INSIGHTS {
            return Err(InfographicError::InvalidConfig(format!(
                "max_insights must be 1–{MAX_INSIGHTS}, got {}",
                c.max_insights
            )));
        }
        if !(0.5..=4.0).contains(&c.scale) {
            return Err(InfographicError::InvalidConfig(format!(
                "scale must be 0.5–4.0, got {}",
                c.scale
            )));
        }
        if c.max_retries > MAX_RETRIES_LIMIT {
            return Err(InfographicError::InvalidConfig(format!(
                "max_retries must be at most {MAX_RETRIES_LIMIT}, got {}",
                c.max_retries
            )));
        }
        if matches!(c.rasterizer_command.as_deref(), Some(cmd) if cmd.trim().is_empty()) {
            return Err(InfographicError::InvalidConfig(
                "rasterizer command must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// How the summarization stage runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SummarizerMode {
    /// AI when a provider is available, local segmentation otherwise or on
    /// failure. (default)
    #[default]
    Auto,
    /// AI only; failures are fatal.
    Ai,
    /// Local segmentation only; never touches the network.
    Local,
}

/// Where icon images come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum IconMode {
    /// Imagen when an API key is present, built-in icons otherwise or on
    /// failure. (default)
    #[default]
    Auto,
    /// Imagen only; failures are fatal.
    Ai,
    /// Built-in icons only.
    Fallback,
}

impl FromStr for SummarizerMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "auto" => Ok(SummarizerMode::Auto),
            "ai" => Ok(SummarizerMode::Ai),
            "local" => Ok(SummarizerMode::Local),
            other => Err(format!("unknown summarizer mode '{other}' (auto, ai, local)")),
        }
    }
}

impl FromStr for IconMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "auto" => Ok(IconMode::Auto),
            "ai" => Ok(IconMode::Ai),
            "fallback" | "builtin" => Ok(IconMode::Fallback),
            other => Err(format!("unknown icon mode '{other}' (auto, ai, fallback)")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = GenerationConfig::default();
        assert_eq!(c.max_insights, 4);
        assert_eq!(c.style, StylePreset::Corporate);
        assert_eq!(c.summarizer, SummarizerMode::Auto);
        assert_eq!(c.icons, IconMode::Auto);
        assert_eq!(c.scale, 2.0);
        assert!(c.rasterizer_command.is_none());
    }

    #[test]
    fn build_rejects_bad_max_insights() {
        assert!(GenerationConfig::builder().max_insights(0).build().is_err());
        assert!(GenerationConfig::builder().max_insights(5).build().is_err());
        assert!(GenerationConfig::builder().max_insights(1).build().is_ok());
    }

    #[test]
    fn build_rejects_bad_scale() {
        let err = GenerationConfig::builder().scale(10.0).build().unwrap_err();
        assert!(err.to_string().contains("scale"));
    }

    #[test]
    fn builder_clamps() {
        let c = GenerationConfig::builder()
            .icon_concurrency(0)
            .temperature(9.0)
            .build()
            .unwrap();
        assert_eq!(c.icon_concurrency, 1);
        assert_eq!(c.temperature, 2.0);
    }

    #[test]
    fn debug_redacts_api_key() {
        let c = GenerationConfig::builder().api_key("secret-key").build().unwrap();
        let dbg = format!("{c:?}");
        assert!(!dbg.contains("secret-key"));
        assert!(dbg.contains("<redacted>"));
    }

    #[test]
    fn explicit_api_key_wins() {
        let c = GenerationConfig::builder().api_key("abc").build().unwrap();
        assert_eq!(c.resolved_api_key().as_deref(), Some("abc"));
    }

    #[test]
    fn blank_api_key_falls_through_to_env() {
        let c = GenerationConfig::builder().api_key("  ").build().unwrap();
        let env = std::env::var("GEMINI_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| std::env::var("GOOGLE_API_KEY").ok().filter(|k| !k.trim().is_empty()));
        assert_eq!(c.resolved_api_key(), env);
    }

    #[test]
    fn build_rejects_excessive_retries() {
        let err = GenerationConfig::builder().max_retries(1000).build().unwrap_err();
        assert!(err.to_string().contains("max_retries"));
        assert!(GenerationConfig::builder()
            .max_retries(MAX_RETRIES_LIMIT)
            .build()
            .is_ok());
    }

    #[test]
    fn build_rejects_blank_rasterizer_command() {
        assert!(GenerationConfig::builder().rasterizer_command(" ").build().is_err());
        let c = GenerationConfig::builder()
            .rasterizer_command("rsvg-convert")
            .build()
            .unwrap();
        assert_eq!(c.rasterizer_command.as_deref(), Some("rsvg-convert"));
    }

    #[test]
    fn backoff_doubles_and_saturates() {
        assert_eq!(backoff_ms(500, 1), 500);
        assert_eq!(backoff_ms(500, 2), 1000);
        assert_eq!(backoff_ms(500, 4), 4000);
        assert_eq!(backoff_ms(500, 64), u64::MAX);
        assert_eq!(backoff_ms(500, u32::MAX), u64::MAX);
    }

    #[test]
    fn parse_modes() {
        assert_eq!("LOCAL".parse::<SummarizerMode>(), Ok(SummarizerMode::Local));
        assert_eq!("builtin".parse::<IconMode>(), Ok(IconMode::Fallback));
        assert!("sometimes".parse::<IconMode>().is_err());
    }
}
