//! Article rendering: title in, plain-text stream out.
//!
//! The conversion service is a seam (`ArticleRenderer`); the shipped
//! implementation pulls plain-text extracts from the action API and writes
//! them to the sink in chunks. The shared siteinfo handle is awaited first,
//! so metadata failures surface on the same fallback path as a render
//! failure.

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::debug;

use crate::error::{truncate_for_error, ApiError, RenderError};
use crate::siteinfo::SharedSiteInfo;

/// Renders one article into an output sink. Implementations must write
/// incrementally and report failure distinctly from success; the caller
/// treats a missing article and a transport error identically.
#[async_trait]
pub trait ArticleRenderer: Send + Sync {
    async fn render(
        &self,
        domain: &str,
        title: &str,
        sink: &mut (dyn AsyncWrite + Send + Unpin),
        siteinfo: SharedSiteInfo,
    ) -> Result<(), RenderError>;
}

#[derive(Debug, Clone, Deserialize)]
struct ExtractResponse {
    #[serde(default)]
    query: Option<ExtractQuery>,
}

#[derive(Debug, Clone, Deserialize)]
struct ExtractQuery {
    #[serde(default)]
    pages: HashMap<String, ExtractPage>,
}

#[derive(Debug, Clone, Deserialize)]
struct ExtractPage {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    missing: Option<serde_json::Value>,
    #[serde(default)]
    extract: Option<String>,
}

/// Plain-text renderer backed by the TextExtracts API.
#[derive(Clone)]
pub struct ExtractRenderer {
    http: reqwest::Client,
    api_base: Option<String>,
}

impl ExtractRenderer {
    pub fn new(http: reqwest::Client) -> Self {
        Self {
            http,
            api_base: None,
        }
    }

    /// Route every request to a fixed base URL instead of
    /// `https://{domain}`; used against mock servers.
    pub fn with_api_base(http: reqwest::Client, api_base: impl Into<String>) -> Self {
        Self {
            http,
            api_base: Some(api_base.into()),
        }
    }

    fn api_url(&self, domain: &str) -> String {
        match &self.api_base {
            Some(base) => format!("{}/w/api.php", base.trim_end_matches('/')),
            None => format!("https://{domain}/w/api.php"),
        }
    }
}

#[async_trait]
impl ArticleRenderer for ExtractRenderer {
    async fn render(
        &self,
        domain: &str,
        title: &str,
        sink: &mut (dyn AsyncWrite + Send + Unpin),
        siteinfo: SharedSiteInfo,
    ) -> Result<(), RenderError> {
        let siteinfo = siteinfo.await.map_err(RenderError::SharedApi)?;

        let response = self
            .http
            .get(self.api_url(domain))
            .query(&[
                ("action", "query"),
                ("format", "json"),
                ("prop", "extracts"),
                ("explaintext", "1"),
                ("redirects", "1"),
                ("titles", title),
            ])
            .send()
            .await
            .map_err(ApiError::from)?;
        let status = response.status();
        let body = response.text().await.map_err(ApiError::from)?;
        if !status.is_success() {
            return Err(ApiError::HttpStatus {
                status: status.as_u16(),
                body: truncate_for_error(&body, 200),
            }
            .into());
        }

        let payload: ExtractResponse = serde_json::from_str(&body).map_err(ApiError::from)?;
        let page = payload
            .query
            .and_then(|query| query.pages.into_values().next())
            .ok_or_else(|| RenderError::MissingArticle {
                title: title.to_string(),
            })?;
        if page.missing.is_some() {
            return Err(RenderError::MissingArticle {
                title: title.to_string(),
            });
        }
        let extract = page
            .extract
            .filter(|text| !text.trim().is_empty())
            .ok_or_else(|| RenderError::MissingArticle {
                title: title.to_string(),
            })?;
        let canonical_title = page.title.unwrap_or_else(|| title.to_string());
        debug!(domain, title = canonical_title.as_str(), "rendering extract");

        sink.write_all(canonical_title.as_bytes()).await?;
        sink.write_all(b"\n\n").await?;
        sink.write_all(extract.trim_end().as_bytes()).await?;
        sink.write_all(b"\n").await?;
        if let Some(wiki) = siteinfo.for_server(domain) {
            let general = &wiki.general;
            if !general.server_name.is_empty() && general.article_path.contains("$1") {
                let slug = canonical_title.replace(' ', "_");
                let path = general.article_path.replace("$1", &slug);
                let footer = format!("\nRetrieved from https://{}{}\n", general.server_name, path);
                sink.write_all(footer.as_bytes()).await?;
            }
        }
        sink.flush().await?;
        Ok(())
    }
}
