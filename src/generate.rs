//! Pipeline entry points.
//!
//! [`generate`] runs every stage and hands back all intermediate products;
//! [`generate_to_file`] additionally exports to PNG, PDF or SVG. Each stage
//! resolves its collaborator from [`GenerationConfig`]: an injected trait
//! object wins, otherwise the default implementation is built from the
//! remaining fields.
//!
//! In the `Auto` modes a failing AI stage is not fatal. The summarizer falls
//! back to the local segmenter and the icon stage to the built-in icons;
//! each fallback is logged, reported through the progress callback and
//! recorded in [`GenerationStats::warnings`].

use crate::config::{GenerationConfig, IconMode, SummarizerMode};
use crate::error::InfographicError;
use crate::output::{
    GenerationStats, IconArtifact, IconSource, InfographicOutput, SummaryResult, SummarySource,
};
use crate::pipeline::capture::{CommandRasterizer, Rasterizer, ResvgRasterizer};
use crate::pipeline::export::{self, ExportFormat};
use crate::pipeline::icons::{fallback_icons, IconGenerator, ImagenIconGenerator};
use crate::pipeline::layout;
use crate::pipeline::summarize::{
    provider_available, resolve_provider, LlmSummarizer, LocalSummarizer, Summarizer,
};
use crate::progress::Stage;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Turn `text` into an infographic.
///
/// Runs summarize → icons → compose → capture and returns every product.
/// Nothing is written to disk.
///
/// # Errors
/// Only fatal errors: an explicit `Ai` mode that fails, or a capture
/// failure. `Auto` modes degrade instead of failing.
///
/// # Example
/// ```rust,no_run
/// use edgequake_infographic::{generate, GenerationConfig, SummarizerMode, IconMode};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = GenerationConfig::builder()
///     .summarizer(SummarizerMode::Local)
///     .icons(IconMode::Fallback)
///     .build()?;
/// let output = generate("Title\n\nFirst point.\n\nSecond point.", &config).await?;
/// println!("{}", output.svg.len());
/// # Ok(())
/// # }
/// ```
pub async fn generate(
    text: impl AsRef<str>,
    config: &GenerationConfig,
) -> Result<InfographicOutput, InfographicError> {
    run(text.as_ref(), config, true).await
}

/// Generate and write to `output_path`; the format comes from the extension
/// (`.png`, `.pdf`, `.svg`), defaulting to PNG.
pub async fn generate_to_file(
    text: impl AsRef<str>,
    output_path: impl AsRef<Path>,
    config: &GenerationConfig,
) -> Result<GenerationStats, InfographicError> {
    let path = output_path.as_ref();
    let format = ExportFormat::from_path(path).unwrap_or_default();
    generate_to_file_as(text, path, format, config).await
}

/// Generate and write to `output_path` in an explicit format.
///
/// SVG output skips the capture stage, so no rasterizer is needed.
pub async fn generate_to_file_as(
    text: impl AsRef<str>,
    output_path: impl AsRef<Path>,
    format: ExportFormat,
    config: &GenerationConfig,
) -> Result<GenerationStats, InfographicError> {
    let path = output_path.as_ref();
    let total_start = Instant::now();
    let output = run(text.as_ref(), config, format.needs_capture()).await?;

    stage_start(config, Stage::Export);
    let export_start = Instant::now();
    match (format, output.image.as_ref()) {
        (ExportFormat::Svg, _) => export::write_svg(&output.svg, path).await?,
        (ExportFormat::Png, Some(img)) => export::write_png(img, path).await?,
        (ExportFormat::Pdf, Some(img)) => export::write_pdf(img, path).await?,
        (_, None) => {
            return Err(InfographicError::Internal(
                "raster export requested but capture was skipped".into(),
            ))
        }
    }
    stage_complete(config, Stage::Export, export_start);

    let mut stats = output.stats;
    stats.total_duration_ms = total_start.elapsed().as_millis() as u64;
    info!(
        "Infographic written to {} ({}, {}ms)",
        path.display(),
        format,
        stats.total_duration_ms
    );
    Ok(stats)
}

/// Synchronous wrapper around [`generate`].
///
/// Creates a temporary tokio runtime internally.
pub fn generate_sync(
    text: impl AsRef<str>,
    config: &GenerationConfig,
) -> Result<InfographicOutput, InfographicError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| InfographicError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(generate(text, config))
}

/// Run only the summarization stage.
///
/// With [`SummarizerMode::Local`] this never touches the network.
pub async fn summarize(
    text: impl AsRef<str>,
    config: &GenerationConfig,
) -> Result<SummaryResult, InfographicError> {
    let mut stats = GenerationStats::default();
    summarize_stage(text.as_ref(), config, &mut stats).await
}

// ── Stages ───────────────────────────────────────────────────────────────

async fn run(
    text: &str,
    config: &GenerationConfig,
    capture: bool,
) -> Result<InfographicOutput, InfographicError> {
    let total_start = Instant::now();
    let mut stats = GenerationStats::default();
    info!(
        "Generating infographic: {} chars, style {}",
        text.chars().count(),
        config.style
    );

    // ── Step 1: Summarize ────────────────────────────────────────────────
    stage_start(config, Stage::Summarize);
    let started = Instant::now();
    let summary = summarize_stage(text, config, &mut stats).await?;
    stats.summarize_duration_ms = stage_complete(config, Stage::Summarize, started);
    stats.insight_count = summary.insights.len();

    // ── Step 2: Icons ────────────────────────────────────────────────────
    stage_start(config, Stage::Icons);
    let started = Instant::now();
    let icons = icons_stage(&summary, config, &mut stats).await?;
    stats.icons_duration_ms = stage_complete(config, Stage::Icons, started);

    // ── Step 3: Compose ──────────────────────────────────────────────────
    stage_start(config, Stage::Compose);
    let started = Instant::now();
    let svg = layout::render_tree(&summary, config.style, &icons);
    stage_complete(config, Stage::Compose, started);

    // ── Step 4: Capture ──────────────────────────────────────────────────
    let image = if capture {
        stage_start(config, Stage::Capture);
        let started = Instant::now();
        let rasterizer = rasterizer_for(config);
        debug!("Capturing with {}", rasterizer.name());
        let image = rasterizer.rasterize(&svg, config.scale).await?;
        stats.capture_duration_ms = stage_complete(config, Stage::Capture, started);
        Some(image)
    } else {
        debug!("Capture skipped");
        None
    };

    stats.total_duration_ms = total_start.elapsed().as_millis() as u64;
    info!(
        "Generation complete: {} insights, {}ms total",
        stats.insight_count, stats.total_duration_ms
    );
    if let Some(ref cb) = config.progress_callback {
        cb.on_generation_complete(stats.insight_count, stats.total_duration_ms);
    }

    Ok(InfographicOutput {
        summary,
        icons,
        svg,
        image,
        stats,
    })
}

async fn summarize_stage(
    text: &str,
    config: &GenerationConfig,
    stats: &mut GenerationStats,
) -> Result<SummaryResult, InfographicError> {
    let local = LocalSummarizer::new(config.max_insights);

    let summary = match config.summarizer {
        SummarizerMode::Local => {
            stats.summary_source = Some(SummarySource::Local);
            local.summarize(text).await?
        }
        SummarizerMode::Ai => {
            let summarizer = ai_summarizer(config)?;
            info!("Summarizing with {}", summarizer.name());
            stats.summary_source = Some(SummarySource::Ai);
            summarizer.summarize(text).await?
        }
        SummarizerMode::Auto => {
            let attempt = if config.summarizer_impl.is_some() || provider_available(config) {
                match ai_summarizer(config) {
                    Ok(summarizer) => {
                        info!("Summarizing with {}", summarizer.name());
                        summarizer.summarize(text).await
                    }
                    Err(e) => Err(e),
                }
            } else {
                debug!("No LLM provider configured; using local segmentation");
                Err(InfographicError::MissingCredentials {
                    stage: "AI summarization",
                })
            };

            match attempt {
                Ok(summary) => {
                    stats.summary_source = Some(SummarySource::Ai);
                    summary
                }
                Err(e) => {
                    if !matches!(e, InfographicError::MissingCredentials { .. }) {
                        fallback(config, stats, Stage::Summarize, &format!("AI summary failed: {e}"));
                    }
                    stats.summary_source = Some(SummarySource::Local);
                    local.summarize(text).await?
                }
            }
        }
    };

    // Injected summarizers may not honour the cap.
    let mut summary = summary;
    summary.insights.truncate(config.max_insights);
    debug!(
        "Summary: \"{}\" with {} insights",
        summary.title,
        summary.insights.len()
    );
    Ok(summary)
}

async fn icons_stage(
    summary: &SummaryResult,
    config: &GenerationConfig,
    stats: &mut GenerationStats,
) -> Result<Vec<IconArtifact>, InfographicError> {
    let insights = &summary.insights;
    if insights.is_empty() {
        return Ok(Vec::new());
    }

    match config.icons {
        IconMode::Fallback => {
            stats.icon_source = Some(IconSource::Fallback);
            Ok(fallback_icons(insights.len()))
        }
        IconMode::Ai => {
            let generator = icon_generator(config)?;
            info!("Generating {} icons with {}", insights.len(), generator.name());
            let icons = generator.generate(insights, config.style).await?;
            if icons.len() != insights.len() {
                return Err(InfographicError::IconGenerationFailed {
                    detail: format!("expected {} icons, got {}", insights.len(), icons.len()),
                });
            }
            stats.icon_source = Some(IconSource::Ai);
            Ok(icons)
        }
        IconMode::Auto => {
            let generator = match icon_generator(config) {
                Ok(g) => g,
                Err(e) => {
                    debug!("AI icons unavailable ({e}); using built-in icons");
                    stats.icon_source = Some(IconSource::Fallback);
                    return Ok(fallback_icons(insights.len()));
                }
            };

            info!("Generating {} icons with {}", insights.len(), generator.name());
            let results = generator.generate_each(insights, config.style).await;
            let mut icons = Vec::with_capacity(results.len());
            for result in results {
                match result {
                    Ok(icon) => icons.push(icon),
                    Err(e) => stats.icon_errors.push(e),
                }
            }

            if stats.icon_errors.is_empty() && icons.len() == insights.len() {
                stats.icon_source = Some(IconSource::Ai);
                Ok(icons)
            } else {
                let reason = if stats.icon_errors.is_empty() {
                    format!(
                        "{} returned {} icons for {} insights; using built-in icons",
                        generator.name(),
                        icons.len(),
                        insights.len()
                    )
                } else {
                    format!(
                        "{} of {} icons failed; using built-in icons",
                        stats.icon_errors.len(),
                        insights.len()
                    )
                };
                fallback(config, stats, Stage::Icons, &reason);
                stats.icon_source = Some(IconSource::Fallback);
                Ok(fallback_icons(insights.len()))
            }
        }
    }
}

// ── Collaborator resolution ──────────────────────────────────────────────

fn ai_summarizer(config: &GenerationConfig) -> Result<Arc<dyn Summarizer>, InfographicError> {
    if let Some(ref s) = config.summarizer_impl {
        return Ok(Arc::clone(s));
    }
    let provider = resolve_provider(config)?;
    Ok(Arc::new(LlmSummarizer::new(provider, config)))
}

fn icon_generator(config: &GenerationConfig) -> Result<Arc<dyn IconGenerator>, InfographicError> {
    if let Some(ref g) = config.icon_generator {
        return Ok(Arc::clone(g));
    }
    let key = config
        .resolved_api_key()
        .ok_or(InfographicError::MissingCredentials {
            stage: "AI icon generation",
        })?;
    Ok(Arc::new(ImagenIconGenerator::new(key, config)?))
}

fn rasterizer_for(config: &GenerationConfig) -> Arc<dyn Rasterizer> {
    if let Some(ref r) = config.rasterizer {
        return Arc::clone(r);
    }
    match config.rasterizer_command {
        Some(ref program) => Arc::new(CommandRasterizer::new(program.clone())),
        None => Arc::new(ResvgRasterizer::new()),
    }
}

// ── Progress helpers ─────────────────────────────────────────────────────

fn stage_start(config: &GenerationConfig, stage: Stage) {
    debug!("{}", stage.label());
    if let Some(ref cb) = config.progress_callback {
        cb.on_stage_start(stage);
    }
}

fn stage_complete(config: &GenerationConfig, stage: Stage, started: Instant) -> u64 {
    let ms = started.elapsed().as_millis() as u64;
    if let Some(ref cb) = config.progress_callback {
        cb.on_stage_complete(stage, ms);
    }
    ms
}

fn fallback(config: &GenerationConfig, stats: &mut GenerationStats, stage: Stage, reason: &str) {
    warn!("{reason}");
    if let Some(ref cb) = config.progress_callback {
        cb.on_fallback(stage, reason);
    }
    stats.warnings.push(reason.to_string());
}
