//! Icon stage: one image per insight, from Imagen or the built-in set.
//!
//! [`IconGenerator`] is the seam for AI image providers. The shipped
//! implementation, [`ImagenIconGenerator`], calls the Gemini `:predict`
//! endpoint once per insight with the style's prompt template.
//!
//! ## Ordering and concurrency
//!
//! Requests run through `futures::stream::buffered`, which bounds the number
//! in flight to `icon_concurrency` while yielding results in insight order.
//! With `icon_concurrency = 1` the requests are strictly sequential, which
//! keeps free-tier keys under their per-minute quota.
//!
//! [`fallback_icons`] never fails: it cycles through four built-in SVG
//! icons.

use crate::config::{backoff_ms, GenerationConfig};
use crate::error::{IconError, InfographicError};
use crate::output::{IconArtifact, InsightRecord};
use crate::pipeline::encode::icon_from_base64;
use crate::progress::ProgressCallback;
use crate::style::StylePreset;
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use serde::Deserialize;
use serde_json::json;
use tokio::time::{sleep, Duration};
use tracing::{debug, info, warn};

/// Produces one icon per insight.
#[async_trait]
pub trait IconGenerator: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &str;

    /// Request every icon; each slot holds that insight's icon or its error.
    ///
    /// The returned vector has exactly `insights.len()` entries, in order.
    async fn generate_each(
        &self,
        insights: &[InsightRecord],
        style: StylePreset,
    ) -> Vec<Result<IconArtifact, IconError>>;

    /// All-or-nothing variant: fails if any icon is missing.
    async fn generate(
        &self,
        insights: &[InsightRecord],
        style: StylePreset,
    ) -> Result<Vec<IconArtifact>, InfographicError> {
        let results = self.generate_each(insights, style).await;
        let errors: Vec<String> = results
            .iter()
            .filter_map(|r| r.as_ref().err().map(|e| e.to_string()))
            .collect();
        if !errors.is_empty() {
            return Err(InfographicError::IconGenerationFailed {
                detail: errors.join("; "),
            });
        }
        Ok(results.into_iter().filter_map(Result::ok).collect())
    }
}

// ── Imagen ───────────────────────────────────────────────────────────────

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Longest `Retry-After` wait honoured before retrying a 429.
const MAX_RETRY_AFTER_SECS: u64 = 60;

/// Icon generator backed by the Gemini Imagen `:predict` endpoint.
pub struct ImagenIconGenerator {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
    concurrency: usize,
    max_retries: u32,
    retry_backoff_ms: u64,
    progress: Option<ProgressCallback>,
}

impl ImagenIconGenerator {
    pub fn new(api_key: impl Into<String>, config: &GenerationConfig) -> Result<Self, InfographicError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.api_timeout_secs))
            .build()
            .map_err(|e| InfographicError::Internal(format!("HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            model: config.image_model.clone(),
            base_url: GEMINI_BASE_URL.to_string(),
            concurrency: config.icon_concurrency.max(1),
            max_retries: config.max_retries,
            retry_backoff_ms: config.retry_backoff_ms,
            progress: config.progress_callback.clone(),
        })
    }

    /// Point the generator at a different host (proxies, test servers).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/v1beta/models/{}:predict", self.base_url, self.model)
    }

    /// One `:predict` call. `Ok(None)` means the API answered without an image.
    async fn request_icon(&self, prompt: &str) -> Result<Option<IconArtifact>, InfographicError> {
        let body = json!({
            "instances": [{ "prompt": prompt }],
            "parameters": {
                "sampleCount": 1,
                "aspectRatio": "1:1",
                "outputMimeType": "image/png",
            },
        });

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| InfographicError::IconGenerationFailed {
                detail: if e.is_timeout() {
                    "request timed out".to_string()
                } else {
                    e.to_string()
                },
            })?;

        let status = response.status();
        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok());
        let text = response
            .text()
            .await
            .map_err(|e| InfographicError::IconGenerationFailed {
                detail: e.to_string(),
            })?;

        if !status.is_success() {
            return Err(classify_http_error(status.as_u16(), &text, retry_after));
        }

        parse_prediction(&text)
    }

    async fn request_with_retry(&self, index: usize, prompt: &str) -> Result<IconArtifact, IconError> {
        let mut last_err = String::new();
        let mut retry_after: Option<u64> = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let backoff = match retry_after.take() {
                    Some(secs) => secs.min(MAX_RETRY_AFTER_SECS) * 1000,
                    None => backoff_ms(self.retry_backoff_ms, attempt),
                };
                warn!(
                    "Icon {}: retry {}/{} after {}ms",
                    index, attempt, self.max_retries, backoff
                );
                sleep(Duration::from_millis(backoff)).await;
            }

            match self.request_icon(prompt).await {
                Ok(Some(icon)) => {
                    debug!("Icon {}: {} bytes after {} retries", index, icon.data.len(), attempt);
                    return Ok(icon);
                }
                Ok(None) => {
                    warn!("Icon {}: response carried no image", index);
                    return Err(IconError::MissingImage { index });
                }
                Err(e) if e.is_transient() => {
                    warn!("Icon {}: attempt {} failed — {}", index, attempt + 1, e);
                    if let InfographicError::RateLimitExceeded {
                        retry_after_secs, ..
                    } = &e
                    {
                        retry_after = *retry_after_secs;
                    }
                    last_err = e.to_string();
                }
                Err(e) => {
                    warn!("Icon {}: permanent failure — {}", index, e);
                    return Err(IconError::RequestFailed {
                        index,
                        retries: attempt,
                        detail: e.to_string(),
                    });
                }
            }
        }

        Err(IconError::RequestFailed {
            index,
            retries: self.max_retries,
            detail: last_err,
        })
    }
}

#[async_trait]
impl IconGenerator for ImagenIconGenerator {
    fn name(&self) -> &str {
        "imagen"
    }

    async fn generate_each(
        &self,
        insights: &[InsightRecord],
        style: StylePreset,
    ) -> Vec<Result<IconArtifact, IconError>> {
        let total = insights.len();
        info!(
            "Requesting {} icons from {} (concurrency {})",
            total, self.model, self.concurrency
        );

        let prompts: Vec<(usize, String)> = insights
            .iter()
            .enumerate()
            .map(|(index, insight)| (index, style.icon_prompt(insight.icon_keyword())))
            .collect();

        stream::iter(prompts.into_iter().map(|(index, prompt)| async move {
            let result = self.request_with_retry(index, &prompt).await;
            if let Some(ref cb) = self.progress {
                match &result {
                    Ok(_) => cb.on_icon_complete(index, total),
                    Err(e) => cb.on_icon_error(index, total, &e.to_string()),
                }
            }
            result
        }))
        .buffered(self.concurrency)
        .collect()
        .await
    }
}

#[derive(Debug, Deserialize)]
struct PredictResponse {
    #[serde(default)]
    predictions: Vec<Prediction>,
}

#[derive(Debug, Deserialize)]
struct Prediction {
    #[serde(rename = "bytesBase64Encoded")]
    bytes_base64_encoded: Option<String>,
    #[serde(rename = "mimeType")]
    mime_type: Option<String>,
}

/// Extract the first image from a `:predict` response body.
///
/// A well-formed body with no image bytes (e.g. a safety-filtered prompt)
/// yields `Ok(None)`; retrying the same prompt will not change it.
fn parse_prediction(body: &str) -> Result<Option<IconArtifact>, InfographicError> {
    let parsed: PredictResponse =
        serde_json::from_str(body).map_err(|e| InfographicError::MalformedResponse {
            detail: format!("unreadable image response: {e}"),
        })?;

    let Some(prediction) = parsed
        .predictions
        .into_iter()
        .find(|p| p.bytes_base64_encoded.is_some())
    else {
        return Ok(None);
    };

    let mime = prediction.mime_type.as_deref().unwrap_or("image/png");
    icon_from_base64(prediction.bytes_base64_encoded.as_deref().unwrap_or_default(), mime).map(Some)
}

/// Map a non-2xx status to the matching error, using `error.message` when
/// the body carries one.
fn classify_http_error(status: u16, body: &str, retry_after: Option<u64>) -> InfographicError {
    let detail = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| format!("HTTP {status}"));

    match status {
        401 | 403 => InfographicError::AuthError {
            provider: "gemini".into(),
            detail,
        },
        429 => InfographicError::RateLimitExceeded {
            provider: "gemini".into(),
            retry_after_secs: retry_after,
        },
        400..=499 => InfographicError::MalformedResponse {
            detail: format!("image request rejected: {detail}"),
        },
        _ => InfographicError::IconGenerationFailed { detail },
    }
}

// ── Built-in icons ───────────────────────────────────────────────────────

const ICON_COLOR: &str = "#374151";

const FALLBACK_PATHS: [&str; 4] = [
    // Lightbulb / idea
    r#"<path d="M12 2.25a.75.75 0 0 1 .75.75v2.392a.75.75 0 0 1-1.5 0V3a.75.75 0 0 1 .75-.75ZM7.5 6a.75.75 0 0 0-.53 1.28L8.25 8.561a.75.75 0 1 0 1.06-1.06L8.03 6.22a.75.75 0 0 0-.53-.22ZM16.5 6a.75.75 0 0 0-.53.22l-1.22 1.22a.75.75 0 1 0 1.06 1.061l1.22-1.22a.75.75 0 0 0-.53-1.281ZM12 7.5a4.5 4.5 0 1 0 0 9 4.5 4.5 0 0 0 0-9ZM3.75 12a.75.75 0 0 0 0 1.5h2.392a.75.75 0 0 0 0-1.5H3.75ZM17.858 12a.75.75 0 0 0 0 1.5h2.392a.75.75 0 0 0 0-1.5h-2.392ZM7.5 18a.75.75 0 0 0-.53.22l-1.22 1.22a.75.75 0 1 0 1.06 1.06l1.22-1.22a.75.75 0 0 0-.53-1.28ZM16.5 18a.75.75 0 0 0-.53 1.28l1.22 1.22a.75.75 0 1 0 1.06-1.06l-1.22-1.22a.75.75 0 0 0-.53-.22ZM12 18.75a.75.75 0 0 1 .75.75v2.392a.75.75 0 0 1-1.5 0V19.5a.75.75 0 0 1 .75-.75Z"/>"#,
    // Arrow / process
    r#"<path fill-rule="evenodd" d="M16.28 11.47a.75.75 0 0 1 0 1.06l-7.5 7.5a.75.75 0 0 1-1.06-1.06L14.69 12 7.72 5.03a.75.75 0 0 1 1.06-1.06l7.5 7.5Z" clip-rule="evenodd"/>"#,
    // Flame / result
    r#"<path fill-rule="evenodd" d="M12.963 2.286a.75.75 0 0 0-1.071 1.052A11.202 11.202 0 0 1 11.25 10.5a1.5 1.5 0 0 1-3 0 1.5 1.5 0 0 0-3 0c0 .981.32 1.894.872 2.614.54.708 1.274 1.264 2.128 1.634a.75.75 0 1 0 .83-1.802c-.56-.26-1.06-.656-1.46-1.126a9.703 9.703 0 0 0-.572-2.344 1.5 1.5 0 0 1 3 0c0 .225.026.446.076.662a.75.75 0 0 0 1.43-.33A12.702 12.702 0 0 0 12.963 2.286Z" clip-rule="evenodd"/>"#,
    // Sun / data
    r#"<path d="M12 1.5a.75.75 0 0 1 .75.75V3a.75.75 0 0 1-1.5 0V2.25A.75.75 0 0 1 12 1.5ZM18.682 6.098a.75.75 0 0 1 1.06 1.06l-.707.707a.75.75 0 0 1-1.06-1.06l.707-.707ZM21.75 12a.75.75 0 0 1 .75.75v1.5a.75.75 0 0 1-1.5 0v-1.5a.75.75 0 0 1 .75-.75ZM18.682 17.902a.75.75 0 0 1 .707.707l-1.06 1.06a.75.75 0 1 1-1.06-1.06l1.06-1.06a.75.75 0 0 1 .353-.707ZM12 21.75a.75.75 0 0 1 .75.75v1.5a.75.75 0 0 1-1.5 0v-1.5a.75.75 0 0 1 .75-.75ZM5.318 17.902a.75.75 0 0 1 1.06.707l-.707 1.06a.75.75 0 0 1-1.06-1.06l.707-.707ZM2.25 12a.75.75 0 0 1 .75-.75h1.5a.75.75 0 0 1 0 1.5h-1.5a.75.75 0 0 1-.75-.75ZM5.318 6.098a.75.75 0 0 1 .707-.707l1.06 1.06a.75.75 0 1 1-1.06 1.06L5.318 6.098ZM12 6.75a5.25 5.25 0 1 0 0 10.5 5.25 5.25 0 0 0 0-10.5Z"/>"#,
];

/// Number of distinct built-in icons.
pub const FALLBACK_ICON_COUNT: usize = FALLBACK_PATHS.len();

/// The built-in icon for slot `index`, cycling through the set.
pub fn fallback_icon(index: usize) -> IconArtifact {
    let path = FALLBACK_PATHS[index % FALLBACK_ICON_COUNT];
    let svg = format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 24 24" fill="{ICON_COLOR}">{path}</svg>"#
    );
    IconArtifact::new("image/svg+xml", svg.into_bytes())
}

/// `count` built-in icons in cycling order.
pub fn fallback_icons(count: usize) -> Vec<IconArtifact> {
    (0..count).map(fallback_icon).collect()
}
