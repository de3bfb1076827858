//! CLI binary for edgequake-infographic.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `GenerationConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_infographic::pipeline::input::resolve_text;
use edgequake_infographic::{
    generate_to_file_as, summarize, ExportFormat, GenerationConfig, GenerationProgressCallback,
    IconMode, IconSource, ProgressCallback, Stage, StylePreset, SummarizerMode, SummaryResult,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress: one spinner showing the current stage, with a log line
/// per finished stage and per icon.
struct CliProgressCallback {
    bar: ProgressBar,
    icons_done: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed:.dim}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(TICKS),
        );
        bar.set_prefix("Infographic");
        bar.set_message("Starting…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            icons_done: AtomicUsize::new(0),
        })
    }
}

impl GenerationProgressCallback for CliProgressCallback {
    fn on_stage_start(&self, stage: Stage) {
        self.bar.set_message(stage.label());
    }

    fn on_stage_complete(&self, stage: Stage, duration_ms: u64) {
        self.bar.println(format!(
            "  {} {:<10} {}",
            green("✓"),
            format!("{stage:?}"),
            dim(&format!("{:.1}s", duration_ms as f64 / 1000.0)),
        ));
    }

    fn on_icon_complete(&self, _index: usize, total: usize) {
        let done = self.icons_done.fetch_add(1, Ordering::SeqCst) + 1;
        self.bar
            .set_message(format!("Generating visual assets... {done}/{total}"));
    }

    fn on_icon_error(&self, index: usize, total: usize, error: &str) {
        // Truncate very long error messages to keep output tidy.
        let msg: String = if error.chars().count() > 80 {
            let mut s: String = error.chars().take(79).collect();
            s.push('\u{2026}');
            s
        } else {
            error.to_string()
        };
        self.bar.println(format!(
            "  {} Icon {:>2}/{:<2}  {}",
            red("✗"),
            index + 1,
            total,
            red(&msg)
        ));
    }

    fn on_fallback(&self, _stage: Stage, reason: &str) {
        self.bar.println(format!("  {} {}", cyan("⚠"), reason));
    }

    fn on_generation_complete(&self, _insight_count: usize, _total_duration_ms: u64) {
        self.bar.finish_and_clear();
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Local segmentation + built-in icons (no API key needed)
  infographic notes.txt --summarizer local --icons fallback -o notes.png

  # AI summary and icons, dark theme, PDF output
  export GEMINI_API_KEY=...
  infographic transcript.txt --style modern-dark -o transcript.pdf

  # From stdin, SVG output
  pbpaste | infographic - -o summary.svg

  # Rasterize with librsvg instead of the built-in renderer
  infographic notes.txt --rasterizer rsvg-convert -o notes.png

  # Only print the structured summary
  infographic notes.txt --summary-only --json

  # From a URL, sequential icon requests for free-tier keys
  infographic https://example.com/article.txt --icon-concurrency 1

STYLES:
  corporate (default), colorful-social, minimalist, modern-dark,
  fresh-clean, geometric

INPUT FORMAT (local segmentation):
  The first non-empty line becomes the title. Blank-line separated
  paragraphs become insights (headline = first 6 words); without blank
  lines, each remaining line becomes one insight. At most 4 insights.

ENVIRONMENT VARIABLES:
  GEMINI_API_KEY          Google Gemini key (summary + Imagen icons)
  OPENAI_API_KEY          OpenAI key (summary only)
  ANTHROPIC_API_KEY       Anthropic key (summary only)
  EDGEQUAKE_LLM_PROVIDER  Override provider (gemini, openai, anthropic, ollama)
  EDGEQUAKE_MODEL         Override model ID
  PDFIUM_LIB_PATH         Path to an existing libpdfium (PDF export)

SETUP:
  PNG and PDF output render in-process with system fonts; installing
  Inter, Poppins or Source Serif 4 gives the closest match to the styles.
  PDFium (~30 MB) is downloaded automatically on the first PDF export.
"#;

/// Turn text into a styled vertical infographic.
#[derive(Parser, Debug)]
#[command(
    name = "infographic",
    version,
    about = "Turn text into a styled vertical infographic (PNG, PDF or SVG)",
    long_about = "Summarize a text file, URL or stdin into a title and up to four key insights, \
pair each insight with an icon and render a 1080×1920 infographic. Uses an LLM and Gemini Imagen \
when API keys are available, and a deterministic local segmenter with built-in icons otherwise.",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Text file path, HTTP/HTTPS URL, or `-` for stdin.
    #[arg(default_value = "-")]
    input: String,

    /// Output file (.png, .pdf or .svg). Default: infographic.<format>.
    #[arg(short, long, env = "INFOGRAPHIC_OUTPUT")]
    output: Option<PathBuf>,

    /// Output format; overrides the output file extension.
    #[arg(long, env = "INFOGRAPHIC_FORMAT", value_enum)]
    format: Option<FormatArg>,

    /// Visual style preset.
    #[arg(short, long, env = "INFOGRAPHIC_STYLE", value_enum, default_value = "corporate")]
    style: StyleArg,

    /// Summarizer: auto (AI if configured, else local), ai, local.
    #[arg(long, env = "INFOGRAPHIC_SUMMARIZER", value_enum, default_value = "auto")]
    summarizer: SummarizerArg,

    /// Icons: auto (Imagen if a key is set, else built-in), ai, fallback.
    #[arg(long, env = "INFOGRAPHIC_ICONS", value_enum, default_value = "auto")]
    icons: IconArg,

    /// Maximum number of insights (1–4).
    #[arg(long, env = "INFOGRAPHIC_MAX_INSIGHTS", default_value_t = 4,
          value_parser = clap::value_parser!(u8).range(1..=4))]
    max_insights: u8,

    /// LLM model ID for the summary (default: gemini-2.5-flash).
    #[arg(long, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    /// LLM provider: gemini, openai, anthropic, ollama, azure.
    #[arg(long, env = "EDGEQUAKE_PROVIDER")]
    provider: Option<String>,

    /// Gemini API key for Imagen icons.
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Imagen model ID.
    #[arg(long, env = "INFOGRAPHIC_IMAGE_MODEL", default_value = "imagen-4.0-generate-001")]
    image_model: String,

    /// Concurrent icon requests (1 = sequential).
    #[arg(long, env = "INFOGRAPHIC_ICON_CONCURRENCY", default_value_t = 4)]
    icon_concurrency: usize,

    /// Capture scale factor (0.5–4.0).
    #[arg(long, env = "INFOGRAPHIC_SCALE", default_value_t = 2.0)]
    scale: f32,

    /// External SVG rasterizer command (must accept rsvg-convert flags).
    /// Default: built-in resvg renderer.
    #[arg(long, env = "INFOGRAPHIC_RASTERIZER")]
    rasterizer: Option<String>,

    /// Max LLM output tokens.
    #[arg(long, env = "INFOGRAPHIC_MAX_TOKENS", default_value_t = 2048)]
    max_tokens: usize,

    /// LLM temperature (0.0–2.0).
    #[arg(long, env = "INFOGRAPHIC_TEMPERATURE", default_value_t = 0.2)]
    temperature: f32,

    /// Retries per AI request (0–10).
    #[arg(long, env = "INFOGRAPHIC_MAX_RETRIES", default_value_t = 3,
          value_parser = clap::value_parser!(u32).range(0..=10))]
    max_retries: u32,

    /// Print the summary only; no icons, no rendering.
    #[arg(long)]
    summary_only: bool,

    /// With --summary-only: print JSON instead of text.
    #[arg(long, env = "INFOGRAPHIC_JSON")]
    json: bool,

    /// Disable progress spinner.
    #[arg(long, env = "INFOGRAPHIC_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "INFOGRAPHIC_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "INFOGRAPHIC_QUIET")]
    quiet: bool,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "INFOGRAPHIC_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Per-request AI timeout in seconds.
    #[arg(long, env = "INFOGRAPHIC_API_TIMEOUT", default_value_t = 60)]
    api_timeout: u64,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum StyleArg {
    Corporate,
    ColorfulSocial,
    Minimalist,
    ModernDark,
    FreshClean,
    Geometric,
}

impl From<StyleArg> for StylePreset {
    fn from(v: StyleArg) -> Self {
        match v {
            StyleArg::Corporate => StylePreset::Corporate,
            StyleArg::ColorfulSocial => StylePreset::ColorfulSocial,
            StyleArg::Minimalist => StylePreset::Minimalist,
            StyleArg::ModernDark => StylePreset::ModernDark,
            StyleArg::FreshClean => StylePreset::FreshClean,
            StyleArg::Geometric => StylePreset::Geometric,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum SummarizerArg {
    Auto,
    Ai,
    Local,
}

impl From<SummarizerArg> for SummarizerMode {
    fn from(v: SummarizerArg) -> Self {
        match v {
            SummarizerArg::Auto => SummarizerMode::Auto,
            SummarizerArg::Ai => SummarizerMode::Ai,
            SummarizerArg::Local => SummarizerMode::Local,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum IconArg {
    Auto,
    Ai,
    Fallback,
}

impl From<IconArg> for IconMode {
    fn from(v: IconArg) -> Self {
        match v {
            IconArg::Auto => IconMode::Auto,
            IconArg::Ai => IconMode::Ai,
            IconArg::Fallback => IconMode::Fallback,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum FormatArg {
    Png,
    Pdf,
    Svg,
}

impl From<FormatArg> for ExportFormat {
    fn from(v: FormatArg) -> Self {
        match v {
            FormatArg::Png => ExportFormat::Png,
            FormatArg::Pdf => ExportFormat::Pdf,
            FormatArg::Svg => ExportFormat::Svg,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner provides the feedback that matters; keep library INFO logs
    // out of its way unless --verbose is set.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.summary_only;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Read input ───────────────────────────────────────────────────────
    let text = resolve_text(&cli.input, cli.download_timeout)
        .await
        .with_context(|| format!("Failed to read input '{}'", cli.input))?;

    // ── Summary-only mode ────────────────────────────────────────────────
    if cli.summary_only {
        let config = build_config(&cli, None)?;
        let summary = summarize(&text, &config)
            .await
            .context("Summarization failed")?;
        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&summary).context("Failed to serialise summary")?
            );
        } else {
            print_summary(&summary);
        }
        return Ok(());
    }

    // ── Resolve output ───────────────────────────────────────────────────
    let format: ExportFormat = match (cli.format, cli.output.as_deref()) {
        (Some(f), _) => f.into(),
        (None, Some(path)) => ExportFormat::from_path(path).unwrap_or_default(),
        (None, None) => ExportFormat::Png,
    };
    let output_path = cli
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(format!("infographic.{}", format.extension())));

    if format == ExportFormat::Pdf {
        ensure_pdf_engine(cli.quiet)?;
    }

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn GenerationProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb)?;

    // ── Run generation ───────────────────────────────────────────────────
    let stats = generate_to_file_as(&text, &output_path, format, &config)
        .await
        .context("Infographic generation failed")?;

    if !cli.quiet {
        let icons = match stats.icon_source {
            Some(IconSource::Ai) => "AI icons",
            Some(IconSource::Fallback) => "built-in icons",
            None => "no icons",
        };
        eprintln!(
            "{}  {} insights  {}  {}ms  →  {}",
            if stats.warnings.is_empty() {
                green("✔")
            } else {
                cyan("⚠")
            },
            stats.insight_count,
            dim(icons),
            stats.total_duration_ms,
            bold(&output_path.display().to_string()),
        );
        if !show_progress {
            for warning in &stats.warnings {
                eprintln!("   {} {}", cyan("⚠"), warning);
            }
        }
    }

    Ok(())
}

/// Map CLI args to `GenerationConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<GenerationConfig> {
    let mut builder = GenerationConfig::builder()
        .style(cli.style.into())
        .summarizer(cli.summarizer.into())
        .icons(cli.icons.into())
        .max_insights(cli.max_insights as usize)
        .image_model(cli.image_model.clone())
        .icon_concurrency(cli.icon_concurrency)
        .scale(cli.scale)
        .max_tokens(cli.max_tokens)
        .temperature(cli.temperature)
        .max_retries(cli.max_retries)
        .download_timeout_secs(cli.download_timeout)
        .api_timeout_secs(cli.api_timeout);

    if let Some(ref model) = cli.model {
        builder = builder.model(model.clone());
    }
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider.clone());
    }
    if let Some(ref key) = cli.api_key {
        builder = builder.api_key(key.clone());
    }
    if let Some(ref cmd) = cli.rasterizer {
        builder = builder.rasterizer_command(cmd.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

fn print_summary(summary: &SummaryResult) {
    println!("{}", bold(&summary.title));
    for (i, insight) in summary.insights.iter().enumerate() {
        println!();
        println!("{} {}", cyan(&format!("{}.", i + 1)), bold(&insight.title));
        if !insight.description.is_empty() {
            println!("   {}", insight.description);
        }
    }
}

/// Make sure pdfium is present before the pipeline starts, so the first
/// download shows its own progress bar instead of stalling the spinner.
fn ensure_pdf_engine(quiet: bool) -> Result<()> {
    #[cfg(feature = "bundled")]
    {
        let _ = quiet;
        tokio::task::block_in_place(|| pdfium_auto::ensure_pdfium_bundled())
            .context("Failed to extract bundled PDFium engine")?;
    }

    #[cfg(not(feature = "bundled"))]
    if !pdfium_auto::is_pdfium_cached() {
        if quiet {
            tokio::task::block_in_place(|| pdfium_auto::ensure_pdfium_library(None))
                .context("Failed to download PDFium engine")?;
        } else {
            let dl_bar = ProgressBar::new(0);
            dl_bar.set_style(
                ProgressStyle::with_template(
                    "{spinner:.cyan} {prefix:.bold}  \
                     [{bar:42.green/238}] {bytes}/{total_bytes}  ETA {eta_precise}",
                )
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("█▉▊▋▌▍▎▏  ")
                .tick_strings(TICKS),
            );
            dl_bar.set_prefix("PDF engine");
            dl_bar.enable_steady_tick(Duration::from_millis(80));

            let bar = dl_bar.clone();
            tokio::task::block_in_place(|| {
                pdfium_auto::ensure_pdfium_library(Some(&|downloaded, total| {
                    if let Some(t) = total {
                        if bar.length().unwrap_or(0) != t {
                            bar.set_length(t);
                        }
                    }
                    bar.set_position(downloaded);
                }))
            })
            .context("Failed to download PDFium engine")?;

            dl_bar.finish_with_message("ready ✓");
        }
    }

    Ok(())
}
