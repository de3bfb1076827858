//! Input resolution: turn a user-supplied path, URL or `-` into text.
//!
//! The segmenter and the AI summarizer both take a `&str`, so everything is
//! read fully into memory here. Files must be UTF-8; a leading byte-order
//! mark is dropped so it does not end up in the title.

use crate::error::InfographicError;
use std::path::PathBuf;
use tokio::io::AsyncReadExt;
use tracing::{debug, info};

/// Marker for "read from standard input".
pub const STDIN_MARKER: &str = "-";

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Read the text behind `input`.
///
/// * `-` reads standard input to EOF
/// * `http://` / `https://` downloads the body
/// * anything else is a local file path
pub async fn resolve_text(input: &str, timeout_secs: u64) -> Result<String, InfographicError> {
    let text = if input == STDIN_MARKER {
        read_stdin().await?
    } else if is_url(input) {
        download_text(input, timeout_secs).await?
    } else {
        read_local(input).await?
    };
    Ok(strip_bom(text))
}

async fn read_stdin() -> Result<String, InfographicError> {
    let mut bytes = Vec::new();
    tokio::io::stdin()
        .read_to_end(&mut bytes)
        .await
        .map_err(|e| InfographicError::Internal(format!("Failed to read stdin: {e}")))?;
    debug!("Read {} bytes from stdin", bytes.len());
    String::from_utf8(bytes).map_err(|_| InfographicError::NotText {
        path: PathBuf::from("<stdin>"),
    })
}

async fn read_local(path_str: &str) -> Result<String, InfographicError> {
    let path = PathBuf::from(path_str);

    let bytes = match tokio::fs::read(&path).await {
        Ok(b) => b,
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(InfographicError::PermissionDenied { path });
        }
        Err(_) => return Err(InfographicError::FileNotFound { path }),
    };

    debug!("Read {} bytes from {}", bytes.len(), path.display());
    String::from_utf8(bytes).map_err(|_| InfographicError::NotText { path })
}

async fn download_text(url: &str, timeout_secs: u64) -> Result<String, InfographicError> {
    info!("Downloading text from: {}", url);

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| InfographicError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let to_error = |e: reqwest::Error| {
        if e.is_timeout() {
            InfographicError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            InfographicError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    };

    let response = client.get(url).send().await.map_err(to_error)?;

    if !response.status().is_success() {
        return Err(InfographicError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let text = response.text().await.map_err(to_error)?;
    info!("Downloaded {} bytes", text.len());
    Ok(text)
}

fn strip_bom(text: String) -> String {
    match text.strip_prefix('\u{feff}') {
        Some(rest) => rest.to_string(),
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_is_url() {
        assert!(is_url("https://example.com/notes.txt"));
        assert!(is_url("http://example.com/notes.txt"));
        assert!(!is_url("/tmp/notes.txt"));
        assert!(!is_url("notes.txt"));
        assert!(!is_url("-"));
        assert!(!is_url(""));
    }

    #[test]
    fn bom_is_stripped() {
        assert_eq!(strip_bom("\u{feff}Title".into()), "Title");
        assert_eq!(strip_bom("Title".into()), "Title");
    }

    #[tokio::test]
    async fn reads_local_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "\u{feff}My Title\n\nBody text.").unwrap();
        let text = resolve_text(file.path().to_str().unwrap(), 5).await.unwrap();
        assert_eq!(text, "My Title\n\nBody text.");
    }

    #[tokio::test]
    async fn missing_file_is_reported() {
        let err = resolve_text("/definitely/not/here.txt", 5).await.unwrap_err();
        assert!(matches!(err, InfographicError::FileNotFound { .. }));
    }

    #[tokio::test]
    async fn binary_file_is_not_text() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&[0xff, 0xfe, 0x00, 0x9f]).unwrap();
        let err = resolve_text(file.path().to_str().unwrap(), 5).await.unwrap_err();
        assert!(matches!(err, InfographicError::NotText { .. }));
    }
}
