//! Siteinfo metadata and its process-wide single-flight cache.
//!
//! The cache hands out shared fetch handles keyed by wiki set: concurrent
//! requesters for the same key await one underlying fetch, and a completed
//! handle keeps serving its result for the life of the process. Entries are
//! never evicted; the key space is bounded by the distinct domain sets ever
//! selected.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::future::{BoxFuture, FutureExt, Shared};
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::debug;

use wikitel_core::{wiki_set_key, WikiDescriptor};

use crate::error::{truncate_for_error, ApiError};

/// `general` section of a wiki's siteinfo payload.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SiteInfoGeneral {
    #[serde(rename = "sitename", default)]
    pub site_name: String,
    #[serde(rename = "servername", default)]
    pub server_name: String,
    #[serde(rename = "articlepath", default)]
    pub article_path: String,
    #[serde(default)]
    pub lang: String,
}

/// Metadata for one wiki of a set.
#[derive(Debug, Clone)]
pub struct WikiSiteInfo {
    pub base_url: String,
    pub general: SiteInfoGeneral,
}

/// Metadata for an ordered wiki set, resolved once per cache key.
#[derive(Debug, Clone)]
pub struct SiteInfo {
    pub wikis: Vec<WikiSiteInfo>,
}

impl SiteInfo {
    /// The set member whose canonical server name matches `domain`.
    pub fn for_server(&self, domain: &str) -> Option<&WikiSiteInfo> {
        self.wikis
            .iter()
            .find(|wiki| wiki.general.server_name == domain)
    }
}

/// Seam for the remote siteinfo call.
#[async_trait]
pub trait SiteInfoFetcher: Send + Sync {
    async fn fetch(&self, wikis: &[WikiDescriptor]) -> Result<SiteInfo, ApiError>;
}

/// A lazily-resolved, shareable handle to one siteinfo fetch. Cloning is
/// cheap; every clone observes the same pending or completed result.
pub type SharedSiteInfo = Shared<BoxFuture<'static, Result<Arc<SiteInfo>, Arc<ApiError>>>>;

#[derive(Debug, Clone, Deserialize)]
struct SiteInfoResponse {
    #[serde(default)]
    query: Option<SiteInfoQuery>,
}

#[derive(Debug, Clone, Deserialize)]
struct SiteInfoQuery {
    #[serde(default)]
    general: Option<SiteInfoGeneral>,
}

/// Production fetcher over the action API. One attempt per wiki, no retry
/// chatter in the logs.
#[derive(Clone)]
pub struct HttpSiteInfoFetcher {
    http: reqwest::Client,
}

impl HttpSiteInfoFetcher {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }
}

#[async_trait]
impl SiteInfoFetcher for HttpSiteInfoFetcher {
    async fn fetch(&self, wikis: &[WikiDescriptor]) -> Result<SiteInfo, ApiError> {
        let mut resolved = Vec::with_capacity(wikis.len());
        for wiki in wikis {
            let url = format!("{}/api.php", wiki.base_url.trim_end_matches('/'));
            let response = self
                .http
                .get(url)
                .query(&[
                    ("action", "query"),
                    ("format", "json"),
                    ("meta", "siteinfo"),
                    ("siprop", "general|namespaces"),
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
            let payload: SiteInfoResponse = serde_json::from_str(&body)?;
            let general = payload
                .query
                .and_then(|query| query.general)
                .ok_or_else(|| {
                    ApiError::InvalidResponse("siteinfo response missing query.general".to_string())
                })?;
            resolved.push(WikiSiteInfo {
                base_url: wiki.base_url.clone(),
                general,
            });
        }
        Ok(SiteInfo { wikis: resolved })
    }
}

/// Keyed memoization of siteinfo fetches with request coalescing: for a
/// given key at most one in-flight or completed fetch exists process-wide.
pub struct SiteInfoCache {
    fetcher: Arc<dyn SiteInfoFetcher>,
    entries: Mutex<HashMap<String, SharedSiteInfo>>,
}

impl SiteInfoCache {
    pub fn new(fetcher: Arc<dyn SiteInfoFetcher>) -> Self {
        Self {
            fetcher,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Return the shared handle for this wiki set, creating it on first
    /// miss. The handle may still be in flight; awaiting a clone never
    /// issues a second fetch for the same key.
    pub async fn get_or_fetch(&self, wikis: &[WikiDescriptor]) -> SharedSiteInfo {
        let key = wiki_set_key(wikis);
        let mut entries = self.entries.lock().await;
        if let Some(handle) = entries.get(&key) {
            return handle.clone();
        }
        debug!(key = key.as_str(), "siteinfo cache miss, starting fetch");
        let fetcher = Arc::clone(&self.fetcher);
        let wikis = wikis.to_vec();
        let handle = async move {
            fetcher
                .fetch(&wikis)
                .await
                .map(Arc::new)
                .map_err(Arc::new)
        }
        .boxed()
        .shared();
        entries.insert(key, handle.clone());
        handle
    }

    /// Number of distinct wiki sets seen so far.
    pub async fn entry_count(&self) -> usize {
        self.entries.lock().await.len()
    }
}
