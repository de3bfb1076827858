//! Integration tests for the generation pipeline.
//!
//! Collaborators are replaced with in-memory mocks, so these run offline.
//! The test at the bottom drives the real providers and is gated behind
//! `E2E_ENABLED`.
//!
//! Run the live test with:
//!   E2E_ENABLED=1 GEMINI_API_KEY=... cargo test --test pipeline -- --nocapture

use async_trait::async_trait;
use edgequake_infographic::{
    fallback_icons, generate, generate_sync, generate_to_file, generate_to_file_as, segment,
    summarize, ExportFormat, GenerationConfig, GenerationProgressCallback, IconArtifact, IconError,
    IconGenerator, IconMode, IconSource, InfographicError, InsightRecord, Rasterizer, Stage,
    StylePreset, SummarizerMode, SummarySource,
};
use image::{DynamicImage, Rgba, RgbaImage};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

const NOTES: &str = "Team Offsite Recap\n\n\
We agreed to ship the mobile beta before the end of the quarter.\n\n\
Support tickets dropped by a third after the new onboarding flow.\n\n\
Hiring will focus on two senior backend engineers.";

// ── Mocks ────────────────────────────────────────────────────────────────────

/// Returns a solid image sized like the canvas at the requested scale.
#[derive(Default)]
struct MockRasterizer {
    calls: AtomicUsize,
}

#[async_trait]
impl Rasterizer for MockRasterizer {
    fn name(&self) -> &str {
        "mock"
    }

    async fn rasterize(&self, svg: &str, scale: f32) -> Result<DynamicImage, InfographicError> {
        assert!(svg.starts_with("<svg"));
        self.calls.fetch_add(1, Ordering::SeqCst);
        let w = (108.0 * scale) as u32;
        let h = (192.0 * scale) as u32;
        Ok(DynamicImage::ImageRgba8(RgbaImage::from_pixel(
            w,
            h,
            Rgba([255, 255, 255, 255]),
        )))
    }
}

/// Succeeds for every insight index not listed in `fail`.
struct MockIcons {
    fail: Vec<usize>,
}

#[async_trait]
impl IconGenerator for MockIcons {
    fn name(&self) -> &str {
        "mock-icons"
    }

    async fn generate_each(
        &self,
        insights: &[InsightRecord],
        _style: StylePreset,
    ) -> Vec<Result<IconArtifact, IconError>> {
        (0..insights.len())
            .map(|i| {
                if self.fail.contains(&i) {
                    Err(IconError::MissingImage { index: i })
                } else {
                    Ok(IconArtifact::new("image/png", vec![i as u8]))
                }
            })
            .collect()
    }
}

#[derive(Default)]
struct RecordingProgress {
    events: Mutex<Vec<String>>,
}

impl GenerationProgressCallback for RecordingProgress {
    fn on_stage_start(&self, stage: Stage) {
        self.events.lock().unwrap().push(format!("start:{stage:?}"));
    }

    fn on_fallback(&self, stage: Stage, _reason: &str) {
        self.events.lock().unwrap().push(format!("fallback:{stage:?}"));
    }

    fn on_generation_complete(&self, insight_count: usize, _total_duration_ms: u64) {
        self.events
            .lock()
            .unwrap()
            .push(format!("complete:{insight_count}"));
    }
}

fn offline_config() -> edgequake_infographic::GenerationConfigBuilder {
    GenerationConfig::builder()
        .summarizer(SummarizerMode::Local)
        .icons(IconMode::Fallback)
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn generate_offline_produces_every_product() {
    let rasterizer = Arc::new(MockRasterizer::default());
    let config = offline_config()
        .rasterizer(rasterizer.clone())
        .scale(2.0)
        .build()
        .unwrap();

    let output = generate(NOTES, &config).await.unwrap();

    assert_eq!(output.summary.title, "Team Offsite Recap");
    assert_eq!(output.summary.insights.len(), 3);
    assert_eq!(output.summary.insights[0].title, "We agreed to ship the mobile...");
    assert_eq!(output.icons, fallback_icons(3));
    assert!(output.svg.contains("Hiring will focus"));
    let image = output.image.expect("captured image");
    assert_eq!((image.width(), image.height()), (216, 384));
    assert_eq!(rasterizer.calls.load(Ordering::SeqCst), 1);

    assert_eq!(output.stats.summary_source, Some(SummarySource::Local));
    assert_eq!(output.stats.icon_source, Some(IconSource::Fallback));
    assert_eq!(output.stats.insight_count, 3);
    assert!(output.stats.warnings.is_empty());
}

#[tokio::test]
async fn svg_export_skips_capture() {
    let rasterizer = Arc::new(MockRasterizer::default());
    let config = offline_config()
        .style(StylePreset::ModernDark)
        .rasterizer(rasterizer.clone())
        .build()
        .unwrap();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("recap.svg");

    let stats = generate_to_file(NOTES, &path, &config).await.unwrap();

    let svg = std::fs::read_to_string(&path).unwrap();
    assert!(svg.starts_with("<svg"));
    assert!(svg.contains("#111827"));
    assert_eq!(stats.capture_duration_ms, 0);
    assert_eq!(rasterizer.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn png_export_writes_captured_image() {
    let config = offline_config()
        .rasterizer(Arc::new(MockRasterizer::default()))
        .scale(1.0)
        .build()
        .unwrap();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out").join("recap.png");

    generate_to_file(NOTES, &path, &config).await.unwrap();

    let img = image::open(&path).unwrap();
    assert_eq!((img.width(), img.height()), (108, 192));
}

#[tokio::test]
async fn explicit_format_overrides_extension() {
    let config = offline_config().build().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("recap.out");

    generate_to_file_as(NOTES, &path, ExportFormat::Svg, &config)
        .await
        .unwrap();

    assert!(std::fs::read_to_string(&path).unwrap().ends_with("</svg>"));
}

#[tokio::test]
async fn ai_icons_are_used_when_all_succeed() {
    let config = GenerationConfig::builder()
        .summarizer(SummarizerMode::Local)
        .icon_generator(Arc::new(MockIcons { fail: vec![] }))
        .rasterizer(Arc::new(MockRasterizer::default()))
        .build()
        .unwrap();

    let output = generate(NOTES, &config).await.unwrap();

    assert_eq!(output.stats.icon_source, Some(IconSource::Ai));
    let bytes: Vec<u8> = output.icons.iter().map(|i| i.data[0]).collect();
    assert_eq!(bytes, vec![0, 1, 2]);
}

#[tokio::test]
async fn auto_icons_fall_back_when_one_fails() {
    let progress = Arc::new(RecordingProgress::default());
    let config = GenerationConfig::builder()
        .summarizer(SummarizerMode::Local)
        .icon_generator(Arc::new(MockIcons { fail: vec![1] }))
        .rasterizer(Arc::new(MockRasterizer::default()))
        .progress_callback(progress.clone())
        .build()
        .unwrap();

    let output = generate(NOTES, &config).await.unwrap();

    assert_eq!(output.stats.icon_source, Some(IconSource::Fallback));
    assert_eq!(output.icons, fallback_icons(3));
    assert_eq!(output.stats.icon_errors.len(), 1);
    assert_eq!(output.stats.warnings.len(), 1);
    assert!(progress
        .events
        .lock()
        .unwrap()
        .contains(&"fallback:Icons".to_string()));
}

#[tokio::test]
async fn ai_icon_mode_fails_hard() {
    let config = GenerationConfig::builder()
        .summarizer(SummarizerMode::Local)
        .icons(IconMode::Ai)
        .icon_generator(Arc::new(MockIcons { fail: vec![0, 2] }))
        .rasterizer(Arc::new(MockRasterizer::default()))
        .build()
        .unwrap();

    let err = generate(NOTES, &config).await.unwrap_err();
    match err {
        InfographicError::IconGenerationFailed { detail } => {
            assert!(detail.contains("Icon 0"));
            assert!(detail.contains("Icon 2"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn progress_reports_stages_in_order() {
    let progress = Arc::new(RecordingProgress::default());
    let config = offline_config()
        .rasterizer(Arc::new(MockRasterizer::default()))
        .progress_callback(progress.clone())
        .build()
        .unwrap();

    generate(NOTES, &config).await.unwrap();

    let events = progress.events.lock().unwrap().clone();
    assert_eq!(
        events,
        vec![
            "start:Summarize",
            "start:Icons",
            "start:Compose",
            "start:Capture",
            "complete:3",
        ]
    );
}

#[tokio::test]
async fn empty_input_renders_placeholder() {
    let config = offline_config()
        .rasterizer(Arc::new(MockRasterizer::default()))
        .build()
        .unwrap();

    let output = generate("   \n\n  ", &config).await.unwrap();

    assert_eq!(output.summary.title, "Your Title Here");
    assert_eq!(output.summary.insights.len(), 3);
    assert!(output.svg.contains("Your First Insight"));
}

#[tokio::test]
async fn injected_llm_provider_drives_the_summary() {
    let provider = edgequake_llm::MockProvider::new();
    provider
        .add_response(
            r#"{"sourceData":{"title":"Offsite Highlights"},"insights":[
                {"title":"Mobile beta this quarter","description":"Ship before the end of Q3.","icon_keyword":"rocket"},
                {"title":"Fewer tickets","description":"Onboarding cut support load.","icon_keyword":"chart"}]}"#,
        )
        .await;
    let config = GenerationConfig::builder()
        .provider(Arc::new(provider))
        .icons(IconMode::Fallback)
        .rasterizer(Arc::new(MockRasterizer::default()))
        .build()
        .unwrap();

    let output = generate(NOTES, &config).await.unwrap();

    assert_eq!(output.stats.summary_source, Some(SummarySource::Ai));
    assert_eq!(output.summary.title, "Offsite Highlights");
    assert_eq!(output.summary.insights[1].keyword, "chart");
    assert!(output.stats.warnings.is_empty());
}

#[tokio::test]
async fn unparseable_llm_reply_falls_back_to_segmenter() {
    let provider = edgequake_llm::MockProvider::new();
    provider.add_response("Sorry, I can't do that.").await;
    let config = offline_config()
        .summarizer(SummarizerMode::Auto)
        .provider(Arc::new(provider))
        .build()
        .unwrap();

    let summary = summarize(NOTES, &config).await.unwrap();

    assert_eq!(summary, segment(NOTES));
}

#[tokio::test]
async fn png_export_with_builtin_rasterizer() {
    let config = offline_config().scale(0.5).build().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("recap.png");

    let stats = generate_to_file(NOTES, &path, &config).await.unwrap();

    let img = image::open(&path).unwrap();
    assert_eq!((img.width(), img.height()), (540, 960));
    assert_eq!(stats.insight_count, 3);
}

#[test]
fn summarize_matches_segment_in_local_mode() {
    let config = offline_config().max_insights(2).build().unwrap();
    let summary = tokio_test::block_on(summarize(NOTES, &config)).unwrap();
    let expected = edgequake_infographic::segment_with_limit(NOTES, 2);
    assert_eq!(summary, expected);
    assert_eq!(segment(NOTES).insights.len(), 3);
}

#[test]
fn generate_sync_runs_without_runtime() {
    let config = offline_config()
        .rasterizer(Arc::new(MockRasterizer::default()))
        .build()
        .unwrap();
    let output = generate_sync("Title\nOne\nTwo", &config).unwrap();
    assert_eq!(output.summary.insights.len(), 2);
    assert!(output.summary.insights.iter().all(|i| i.description.is_empty()));
}

#[test]
fn invalid_config_is_rejected() {
    let err = GenerationConfig::builder().max_insights(5).build().unwrap_err();
    assert!(matches!(err, InfographicError::InvalidConfig(_)));
    let err = GenerationConfig::builder().scale(10.0).build().unwrap_err();
    assert!(err.to_string().contains("scale"));
}

// ── Live (E2E_ENABLED) ───────────────────────────────────────────────────────

#[tokio::test]
async fn live_ai_pipeline_to_png() {
    if std::env::var("E2E_ENABLED").is_err() {
        println!("SKIP — set E2E_ENABLED=1 (with GEMINI_API_KEY) to run");
        return;
    }
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();

    let config = GenerationConfig::builder()
        .summarizer(SummarizerMode::Ai)
        .icons(IconMode::Ai)
        .icon_concurrency(1)
        .build()
        .unwrap();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("live.png");

    let stats = generate_to_file(NOTES, &path, &config).await.unwrap();

    assert_eq!(stats.summary_source, Some(SummarySource::Ai));
    assert_eq!(stats.icon_source, Some(IconSource::Ai));
    assert!((1..=4).contains(&stats.insight_count));
    let img = image::open(&path).unwrap();
    assert_eq!((img.width(), img.height()), (2160, 3840));
}
