//! Error types for the edgequake-infographic library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`InfographicError`] — **Fatal**: the pipeline cannot produce an
//!   infographic (unreadable input, missing API key in an explicit AI mode,
//!   rasterizer not installed, output not writable). Returned as
//!   `Err(InfographicError)` from the top-level `generate*` functions.
//!
//! * [`IconError`] — **Non-fatal**: a single icon request failed. In
//!   [`crate::config::IconMode::Auto`] the pipeline swaps in the built-in
//!   icons and records the failure in [`crate::output::GenerationStats`].
//!
//! The local segmenter has no error type at all: it is total over every
//! input string, which is what makes it a safe fallback.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the edgequake-infographic library.
#[derive(Debug, Error)]
pub enum InfographicError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Text file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file was read but is not valid UTF-8 text.
    #[error("Input '{path}' is not valid UTF-8 text")]
    NotText { path: PathBuf },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    /// The AI summarizer was asked to analyse empty text.
    #[error("Input text is empty; the AI summarizer needs some text to analyse")]
    EmptyInput,

    // ── AI errors ─────────────────────────────────────────────────────────
    /// An AI stage was requested explicitly but no API key is available.
    #[error("{stage} requires an API key.\nSet GEMINI_API_KEY or pass --api-key.")]
    MissingCredentials { stage: &'static str },

    /// The configured LLM provider could not be initialised.
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// The LLM API returned an error after all retries.
    #[error("Failed to analyze text: {message}")]
    LlmApiError { message: String },

    /// The AI returned something that is not the expected JSON shape.
    #[error("Invalid response format from AI summarizer: {detail}")]
    MalformedResponse { detail: String },

    /// The image API did not return an image for one of the insights.
    #[error("Failed to generate infographic icons: {detail}")]
    IconGenerationFailed { detail: String },

    /// The image API rejected the credentials (401/403).
    #[error("Authentication error from provider '{provider}': {detail}")]
    AuthError { provider: String, detail: String },

    /// The image API returned HTTP 429.
    #[error("Rate limit exceeded for provider '{provider}'")]
    RateLimitExceeded {
        provider: String,
        retry_after_secs: Option<u64>,
    },

    // ── Capture errors ────────────────────────────────────────────────────
    /// The external SVG rasterizer could not be started.
    #[error(
        "SVG rasterizer '{program}' was not found.\n\
Install it, drop --rasterizer to use the built-in renderer, or write an .svg output instead."
    )]
    RasterizerNotFound { program: String },

    /// The rasterizer ran but did not produce a usable image.
    #[error("Failed to capture infographic: {detail}")]
    CaptureFailed { detail: String },

    // ── Output errors ─────────────────────────────────────────────────────
    /// Encoding the image into the export format failed.
    #[error("Failed to export {format}: {detail}")]
    ExportFailed { format: &'static str, detail: String },

    /// Could not create or write the output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Could not bind to a pdfium library for PDF export.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
PDFium is normally downloaded automatically on first PDF export.\n\
Set PDFIUM_LIB_PATH=/path/to/libpdfium to use an existing copy,\n\
or export to PNG instead."
    )]
    PdfEngine(String),

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl InfographicError {
    /// Whether retrying the same request could plausibly succeed.
    ///
    /// Authentication and shape errors are permanent; transport errors and
    /// rate limits are not.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            InfographicError::LlmApiError { .. }
                | InfographicError::IconGenerationFailed { .. }
                | InfographicError::RateLimitExceeded { .. }
                | InfographicError::DownloadTimeout { .. }
        )
    }
}

/// A non-fatal error for a single icon.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum IconError {
    /// The image request failed after retries.
    #[error("Icon {index}: request failed after {retries} retries: {detail}")]
    RequestFailed {
        index: usize,
        retries: u32,
        detail: String,
    },

    /// The API answered but no image bytes were present.
    #[error("Icon {index}: AI did not return an image")]
    MissingImage { index: usize },
}
