//! Prefix search against a wiki's action API.
//!
//! The `prefixsearch` generator returns `query.pages` as a map keyed by
//! opaque page id; relevance order lives in each page's `index` field, so
//! hits are reordered by index rather than trusted in map order.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::error::{truncate_for_error, ApiError};

/// One prefix-search candidate: a real page title plus its relevance rank
/// (lower index = better match).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    pub title: String,
    pub index: i64,
}

/// Seam for the remote search call so completion and resolution can be
/// exercised against fakes.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    async fn prefix_search(
        &self,
        domain: &str,
        term: &str,
        limit: u32,
    ) -> Result<Vec<SearchHit>, ApiError>;
}

#[derive(Debug, Clone, Deserialize)]
struct PrefixSearchResponse {
    #[serde(default)]
    query: Option<PrefixSearchQuery>,
    #[serde(default)]
    error: Option<ApiErrorPayload>,
}

#[derive(Debug, Clone, Deserialize)]
struct PrefixSearchQuery {
    #[serde(default)]
    pages: HashMap<String, PrefixSearchPage>,
}

#[derive(Debug, Clone, Deserialize)]
struct PrefixSearchPage {
    title: String,
    #[serde(default)]
    index: i64,
}

#[derive(Debug, Clone, Deserialize)]
struct ApiErrorPayload {
    #[serde(default)]
    code: String,
    #[serde(default)]
    info: String,
}

/// Production search provider over the action API.
#[derive(Clone)]
pub struct HttpSearchProvider {
    http: reqwest::Client,
    api_base: Option<String>,
}

impl HttpSearchProvider {
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
impl SearchProvider for HttpSearchProvider {
    async fn prefix_search(
        &self,
        domain: &str,
        term: &str,
        limit: u32,
    ) -> Result<Vec<SearchHit>, ApiError> {
        let limit = limit.to_string();
        let response = self
            .http
            .get(self.api_url(domain))
            .query(&[
                ("action", "query"),
                ("format", "json"),
                ("prop", "pageprops"),
                ("generator", "prefixsearch"),
                ("ppprop", "displaytitle"),
                ("gpssearch", term),
                ("gpsnamespace", "0"),
                ("gpslimit", limit.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(ApiError::HttpStatus {
                status: status.as_u16(),
                body: truncate_for_error(&body, 200),
            });
        }

        let payload: PrefixSearchResponse = serde_json::from_str(&body)?;
        if let Some(error) = payload.error {
            return Err(ApiError::InvalidResponse(format!(
                "{}: {}",
                error.code, error.info
            )));
        }

        let mut hits: Vec<SearchHit> = payload
            .query
            .map(|query| {
                query
                    .pages
                    .into_values()
                    .map(|page| SearchHit {
                        title: page.title,
                        index: page.index,
                    })
                    .collect()
            })
            .unwrap_or_default();
        hits.sort_by(|left, right| {
            left.index
                .cmp(&right.index)
                .then_with(|| left.title.cmp(&right.title))
        });
        debug!(domain, term, hits = hits.len(), "prefix search completed");
        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use httpmock::prelude::*;
    use serde_json::json;

    use super::*;

    fn provider(server: &MockServer) -> HttpSearchProvider {
        let http = reqwest::Client::new();
        HttpSearchProvider::with_api_base(http, server.base_url())
    }

    #[tokio::test]
    async fn unit_prefix_search_orders_hits_by_index() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/w/api.php")
                .query_param("gpssearch", "madr")
                .query_param("gpslimit", "6");
            then.status(200).body(
                json!({
                    "query": {
                        "pages": {
                            "3771": {"pageid": 3771, "title": "Madrigal", "index": 3},
                            "41188263": {"pageid": 41188263, "title": "Madras", "index": 2},
                            "17333": {"pageid": 17333, "title": "Madrid", "index": 1}
                        }
                    }
                })
                .to_string(),
            );
        });

        let hits = provider(&server)
            .prefix_search("en.wikipedia.org", "madr", 6)
            .await
            .expect("search");
        mock.assert();
        let titles: Vec<&str> = hits.iter().map(|hit| hit.title.as_str()).collect();
        assert_eq!(titles, ["Madrid", "Madras", "Madrigal"]);
    }

    #[tokio::test]
    async fn unit_prefix_search_empty_query_yields_no_hits() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/w/api.php");
            then.status(200).body(json!({"batchcomplete": ""}).to_string());
        });

        let hits = provider(&server)
            .prefix_search("en.wikipedia.org", "zzzz", 6)
            .await
            .expect("search");
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn unit_prefix_search_surfaces_api_error_payload() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/w/api.php");
            then.status(200).body(
                json!({"error": {"code": "badvalue", "info": "Unrecognized value"}})
                    .to_string(),
            );
        });

        let error = provider(&server)
            .prefix_search("en.wikipedia.org", "x", 6)
            .await
            .expect_err("should fail");
        assert!(matches!(error, ApiError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn unit_prefix_search_rejects_non_success_status() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/w/api.php");
            then.status(503).body("upstream sad");
        });

        let error = provider(&server)
            .prefix_search("en.wikipedia.org", "x", 6)
            .await
            .expect_err("should fail");
        assert!(matches!(error, ApiError::HttpStatus { status: 503, .. }));
    }

    #[tokio::test]
    async fn unit_prefix_search_rejects_malformed_json() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/w/api.php");
            then.status(200).body("<html>not json</html>");
        });

        let error = provider(&server)
            .prefix_search("en.wikipedia.org", "x", 6)
            .await
            .expect_err("should fail");
        assert!(matches!(error, ApiError::Serde(_)));
    }
}
