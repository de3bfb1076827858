//! Summarization: text → [`SummaryResult`] via an LLM, or locally.
//!
//! The [`Summarizer`] trait is the seam between the pipeline and whatever
//! produces the title and insights. Two implementations ship with the crate:
//!
//! * [`LlmSummarizer`] — asks an `edgequake-llm` provider for a JSON
//!   structure, with retry/backoff and a per-call timeout.
//! * [`LocalSummarizer`] — wraps [`crate::pipeline::segment`]; never fails.
//!
//! ## Retry Strategy
//!
//! Transport errors and timeouts are retried with exponential backoff
//! (`retry_backoff_ms * 2^(attempt-1)`). A response that arrives but does not
//! parse is returned as [`InfographicError::MalformedResponse`] immediately.

use crate::config::{backoff_ms, GenerationConfig, DEFAULT_MODEL};
use crate::error::InfographicError;
use crate::output::{InsightRecord, SummaryResult};
use crate::pipeline::segment;
use crate::prompts::{summary_user_message, SUMMARY_SYSTEM_PROMPT};
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, ProviderFactory};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{sleep, timeout, Duration};
use tracing::{debug, warn};

/// Produces the structured content of an infographic.
#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &str;

    /// Summarize `text` into a title and at most four insights.
    async fn summarize(&self, text: &str) -> Result<SummaryResult, InfographicError>;
}

/// Deterministic summarizer backed by the local segmenter.
#[derive(Debug, Clone)]
pub struct LocalSummarizer {
    max_insights: usize,
}

impl LocalSummarizer {
    pub fn new(max_insights: usize) -> Self {
        Self { max_insights }
    }
}

impl Default for LocalSummarizer {
    fn default() -> Self {
        Self::new(segment::MAX_INSIGHTS)
    }
}

#[async_trait]
impl Summarizer for LocalSummarizer {
    fn name(&self) -> &str {
        "local"
    }

    async fn summarize(&self, text: &str) -> Result<SummaryResult, InfographicError> {
        Ok(segment::segment_with_limit(text, self.max_insights))
    }
}

/// Summarizer that asks an LLM for the infographic JSON.
pub struct LlmSummarizer {
    provider: Arc<dyn LLMProvider>,
    temperature: f32,
    max_tokens: usize,
    max_retries: u32,
    retry_backoff_ms: u64,
    timeout_secs: u64,
    max_insights: usize,
}

impl LlmSummarizer {
    pub fn new(provider: Arc<dyn LLMProvider>, config: &GenerationConfig) -> Self {
        Self {
            provider,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            max_retries: config.max_retries,
            retry_backoff_ms: config.retry_backoff_ms,
            timeout_secs: config.api_timeout_secs,
            max_insights: config.max_insights,
        }
    }

    fn options(&self) -> CompletionOptions {
        CompletionOptions {
            temperature: Some(self.temperature),
            max_tokens: Some(self.max_tokens),
            ..Default::default()
        }
    }
}

#[async_trait]
impl Summarizer for LlmSummarizer {
    fn name(&self) -> &str {
        "llm"
    }

    async fn summarize(&self, text: &str) -> Result<SummaryResult, InfographicError> {
        if text.trim().is_empty() {
            return Err(InfographicError::EmptyInput);
        }

        let start = Instant::now();
        let messages = vec![
            ChatMessage::system(SUMMARY_SYSTEM_PROMPT),
            ChatMessage::user(summary_user_message(text)),
        ];
        let options = self.options();
        let mut last_err: Option<String> = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let backoff = backoff_ms(self.retry_backoff_ms, attempt);
                warn!(
                    "Summary: retry {}/{} after {}ms",
                    attempt, self.max_retries, backoff
                );
                sleep(Duration::from_millis(backoff)).await;
            }

            let call = self.provider.chat(&messages, Some(&options));
            match timeout(Duration::from_secs(self.timeout_secs), call).await {
                Ok(Ok(response)) => {
                    debug!(
                        "Summary: {} input tokens, {} output tokens, {:?}",
                        response.prompt_tokens,
                        response.completion_tokens,
                        start.elapsed()
                    );
                    return parse_summary_response(&response.content, self.max_insights);
                }
                Ok(Err(e)) => {
                    let err_msg = format!("{}", e);
                    warn!("Summary: attempt {} failed — {}", attempt + 1, err_msg);
                    last_err = Some(err_msg);
                }
                Err(_) => {
                    let err_msg = format!("timed out after {}s", self.timeout_secs);
                    warn!("Summary: attempt {} {}", attempt + 1, err_msg);
                    last_err = Some(err_msg);
                }
            }
        }

        Err(InfographicError::LlmApiError {
            message: last_err.unwrap_or_else(|| "Unknown error".to_string()),
        })
    }
}

// ── Response parsing ─────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct WireSummary {
    #[serde(rename = "sourceData")]
    source_data: Option<WireSource>,
    insights: Option<Vec<WireInsight>>,
}

#[derive(Debug, Deserialize)]
struct WireSource {
    #[serde(default)]
    title: String,
}

#[derive(Debug, Deserialize)]
struct WireInsight {
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    icon_keyword: String,
}

static RE_JSON_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```(?:json)?\s*\n(.*?)\n?```\s*$").unwrap());

/// Strip an outer ```` ```json ```` fence, if the model added one anyway.
fn strip_json_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    match RE_JSON_FENCE.captures(trimmed).and_then(|c| c.get(1)) {
        Some(m) => m.as_str().trim(),
        None => trimmed,
    }
}

/// Parse the model output into a [`SummaryResult`], capped to `max_insights`.
///
/// Accepts bare JSON, fenced JSON, or JSON surrounded by stray prose.
pub fn parse_summary_response(
    raw: &str,
    max_insights: usize,
) -> Result<SummaryResult, InfographicError> {
    let body = strip_json_fences(raw);
    let wire: WireSummary = match serde_json::from_str(body) {
        Ok(w) => w,
        Err(first_err) => {
            let (start, end) = match (body.find('{'), body.rfind('}')) {
                (Some(s), Some(e)) if s < e => (s, e),
                _ => {
                    return Err(InfographicError::MalformedResponse {
                        detail: first_err.to_string(),
                    })
                }
            };
            serde_json::from_str(&body[start..=end]).map_err(|e| {
                InfographicError::MalformedResponse {
                    detail: e.to_string(),
                }
            })?
        }
    };

    let (source, insights) = match (wire.source_data, wire.insights) {
        (Some(s), Some(i)) => (s, i),
        _ => {
            return Err(InfographicError::MalformedResponse {
                detail: "missing 'sourceData' or 'insights'".into(),
            })
        }
    };

    let limit = max_insights.clamp(1, segment::MAX_INSIGHTS);
    if insights.len() > limit {
        debug!("Summary: capping {} insights to {}", insights.len(), limit);
    }

    let title = match source.title.trim() {
        "" => segment::DEFAULT_TITLE.to_string(),
        t => t.to_string(),
    };

    Ok(SummaryResult {
        title,
        insights: insights
            .into_iter()
            .take(limit)
            .map(|w| InsightRecord {
                title: w.title.trim().to_string(),
                description: w.description.trim().to_string(),
                keyword: w.icon_keyword.trim().to_string(),
            })
            .collect(),
    })
}

// ── Provider resolution ──────────────────────────────────────────────────

const PROVIDER_KEY_VARS: [&str; 4] = [
    "GEMINI_API_KEY",
    "GOOGLE_API_KEY",
    "OPENAI_API_KEY",
    "ANTHROPIC_API_KEY",
];

/// Whether [`resolve_provider`] has anything to work with.
///
/// Used by [`crate::config::SummarizerMode::Auto`] to decide between the AI
/// and the local path without attempting a doomed network call.
pub fn provider_available(config: &GenerationConfig) -> bool {
    config.provider.is_some()
        || config.provider_name.is_some()
        || env_non_empty("EDGEQUAKE_LLM_PROVIDER")
        || PROVIDER_KEY_VARS.iter().any(|v| env_non_empty(v))
}

fn env_non_empty(var: &str) -> bool {
    std::env::var(var).map(|v| !v.trim().is_empty()).unwrap_or(false)
}

fn create_provider(provider_name: &str, model: &str) -> Result<Arc<dyn LLMProvider>, InfographicError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        InfographicError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

/// Resolve the LLM provider, from most-specific to least-specific:
///
/// 1. Pre-built provider (`config.provider`).
/// 2. Named provider + model (`config.provider_name`, `config.model`).
/// 3. `EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL` from the environment.
/// 4. Gemini when `GEMINI_API_KEY` is set (the same key drives icons).
/// 5. Full auto-detection via `ProviderFactory::from_env`.
pub fn resolve_provider(config: &GenerationConfig) -> Result<Arc<dyn LLMProvider>, InfographicError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);

    if let Some(ref name) = config.provider_name {
        return create_provider(name, model);
    }

    if let (Ok(prov), Ok(env_model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !env_model.is_empty() {
            return create_provider(&prov, &env_model);
        }
    }

    if env_non_empty("GEMINI_API_KEY") {
        return create_provider("gemini", model);
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| InfographicError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set GEMINI_API_KEY, OPENAI_API_KEY, or ANTHROPIC_API_KEY, or use --summarizer local.\n\
                Error: {}",
                e
            ),
        })?;

    Ok(llm_provider)
}

#[cfg(test)]
mod tests {
    use super::*;

    const GOOD: &str = r#"{"sourceData":{"title":"Remote Work Wins"},"insights":[
        {"title":"Focus time grows","description":"Fewer interruptions.","icon_keyword":"focus"},
        {"title":"Costs drop","description":"Less office space.","icon_keyword":"savings"}]}"#;

    #[test]
    fn parse_plain_json() {
        let s = parse_summary_response(GOOD, 4).unwrap();
        assert_eq!(s.title, "Remote Work Wins");
        assert_eq!(s.insights.len(), 2);
        assert_eq!(s.insights[0].keyword, "focus");
        assert_eq!(s.insights[1].description, "Less office space.");
    }

    #[test]
    fn parse_fenced_json() {
        let fenced = format!("```json\n{GOOD}\n```");
        assert_eq!(parse_summary_response(&fenced, 4).unwrap().insights.len(), 2);
    }

    #[test]
    fn parse_json_with_prose() {
        let chatty = format!("Sure! Here is the JSON:\n{GOOD}\nHope this helps.");
        assert_eq!(parse_summary_response(&chatty, 4).unwrap().title, "Remote Work Wins");
    }

    #[test]
    fn caps_insights() {
        let many = r#"{"sourceData":{"title":"T"},"insights":[
            {"title":"1","description":"","icon_keyword":""},
            {"title":"2","description":"","icon_keyword":""},
            {"title":"3","description":"","icon_keyword":""},
            {"title":"4","description":"","icon_keyword":""},
            {"title":"5","description":"","icon_keyword":""},
            {"title":"6","description":"","icon_keyword":""}]}"#;
        let s = parse_summary_response(many, 4).unwrap();
        let titles: Vec<&str> = s.insights.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, vec!["1", "2", "3", "4"]);
        assert_eq!(parse_summary_response(many, 2).unwrap().insights.len(), 2);
    }

    #[test]
    fn missing_fields_is_malformed() {
        let err = parse_summary_response(r#"{"insights":[]}"#, 4).unwrap_err();
        assert!(matches!(err, InfographicError::MalformedResponse { .. }));
        let err = parse_summary_response(r#"{"sourceData":{"title":"x"}}"#, 4).unwrap_err();
        assert!(matches!(err, InfographicError::MalformedResponse { .. }));
    }

    #[test]
    fn garbage_is_malformed() {
        let err = parse_summary_response("I cannot help with that.", 4).unwrap_err();
        assert!(matches!(err, InfographicError::MalformedResponse { .. }));
    }

    #[test]
    fn blank_title_gets_default() {
        let s = parse_summary_response(r#"{"sourceData":{"title":"  "},"insights":[]}"#, 4).unwrap();
        assert_eq!(s.title, segment::DEFAULT_TITLE);
    }

    #[tokio::test]
    async fn local_summarizer_matches_segment() {
        let text = "Title\n\nOne.\n\nTwo.";
        let s = LocalSummarizer::default().summarize(text).await.unwrap();
        assert_eq!(s, segment::segment(text));
        assert_eq!(LocalSummarizer::new(1).summarize(text).await.unwrap().insights.len(), 1);
    }

    // ── Scripted provider ────────────────────────────────────────────────

    use edgequake_llm::{LLMResponse, LlmError};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Fails the first `failures` chats, then answers with `reply`.
    struct Scripted {
        failures: usize,
        delay: Duration,
        reply: String,
        calls: AtomicUsize,
        temperatures: Mutex<Vec<Option<f32>>>,
    }

    impl Scripted {
        fn new(failures: usize, reply: &str) -> Arc<Self> {
            Arc::new(Self {
                failures,
                delay: Duration::ZERO,
                reply: reply.to_string(),
                calls: AtomicUsize::new(0),
                temperatures: Mutex::new(Vec::new()),
            })
        }

        fn slow(delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                failures: 0,
                delay,
                reply: GOOD.to_string(),
                calls: AtomicUsize::new(0),
                temperatures: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl LLMProvider for Scripted {
        fn name(&self) -> &str {
            "scripted"
        }

        fn model(&self) -> &str {
            "scripted-1"
        }

        fn max_context_length(&self) -> usize {
            8192
        }

        async fn complete(&self, _prompt: &str) -> edgequake_llm::Result<LLMResponse> {
            Err(LlmError::NotSupported("complete".into()))
        }

        async fn complete_with_options(
            &self,
            _prompt: &str,
            _options: &CompletionOptions,
        ) -> edgequake_llm::Result<LLMResponse> {
            Err(LlmError::NotSupported("complete".into()))
        }

        async fn chat(
            &self,
            messages: &[ChatMessage],
            options: Option<&CompletionOptions>,
        ) -> edgequake_llm::Result<LLMResponse> {
            assert_eq!(messages.len(), 2);
            self.temperatures
                .lock()
                .unwrap()
                .push(options.and_then(|o| o.temperature));
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            sleep(self.delay).await;
            if n < self.failures {
                Err(LlmError::NetworkError("connection reset".into()))
            } else {
                Ok(LLMResponse::new(self.reply.clone(), "scripted-1").with_usage(120, 40))
            }
        }
    }

    fn retrying_config() -> GenerationConfig {
        GenerationConfig::builder()
            .max_retries(2)
            .retry_backoff_ms(1)
            .api_timeout_secs(1)
            .temperature(0.3)
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn llm_retries_transient_failures() {
        let provider = Scripted::new(2, GOOD);
        let summarizer = LlmSummarizer::new(provider.clone(), &retrying_config());

        let summary = summarizer.summarize("Some notes").await.unwrap();

        assert_eq!(summary.title, "Remote Work Wins");
        assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
        assert!(provider
            .temperatures
            .lock()
            .unwrap()
            .iter()
            .all(|t| *t == Some(0.3)));
    }

    #[tokio::test]
    async fn llm_gives_up_after_max_retries() {
        let provider = Scripted::new(10, GOOD);
        let summarizer = LlmSummarizer::new(provider.clone(), &retrying_config());

        let err = summarizer.summarize("Some notes").await.unwrap_err();

        match err {
            InfographicError::LlmApiError { message } => {
                assert!(message.contains("connection reset"), "{message}")
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn llm_call_times_out() {
        let provider = Scripted::slow(Duration::from_millis(1500));
        let config = GenerationConfig::builder()
            .max_retries(0)
            .api_timeout_secs(1)
            .build()
            .unwrap();

        let err = LlmSummarizer::new(provider.clone(), &config)
            .summarize("Some notes")
            .await
            .unwrap_err();

        assert!(err.to_string().contains("timed out after 1s"), "{err}");
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn llm_malformed_reply_is_not_retried() {
        let provider = Scripted::new(0, "I cannot help with that.");
        let summarizer = LlmSummarizer::new(provider.clone(), &retrying_config());

        let err = summarizer.summarize("Some notes").await.unwrap_err();

        assert!(matches!(err, InfographicError::MalformedResponse { .. }));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn llm_rejects_blank_input_without_calling() {
        let provider = Scripted::new(0, GOOD);
        let summarizer = LlmSummarizer::new(provider.clone(), &retrying_config());

        let err = summarizer.summarize("  \n ").await.unwrap_err();

        assert!(matches!(err, InfographicError::EmptyInput));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn provider_available_with_injected_name() {
        let config = GenerationConfig::builder().provider_name("openai").build().unwrap();
        assert!(provider_available(&config));
    }
}
