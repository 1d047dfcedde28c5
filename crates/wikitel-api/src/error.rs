//! Error types for the remote API surface.

use std::sync::Arc;

use thiserror::Error;

/// Failure talking to a wiki's action API.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("api returned non-success status {status}: {body}")]
    HttpStatus { status: u16, body: String },
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// Failure rendering one article to text. Every variant takes the same
/// fallback path in the session; the split exists for logs and tests.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("siteinfo fetch failed: {0}")]
    SharedApi(Arc<ApiError>),
    #[error("no article named \"{title}\"")]
    MissingArticle { title: String },
    #[error("output sink error: {0}")]
    Io(#[from] std::io::Error),
}

pub(crate) fn truncate_for_error(body: &str, max_chars: usize) -> String {
    if body.chars().count() <= max_chars {
        return body.to_string();
    }
    body.chars().take(max_chars).collect()
}
