//! MediaWiki action API surface: prefix search, siteinfo metadata with a
//! process-wide single-flight cache, and plain-text article rendering.

pub mod error;
pub mod render;
pub mod search;
pub mod siteinfo;

pub use error::{ApiError, RenderError};
pub use render::{ArticleRenderer, ExtractRenderer};
pub use search::{HttpSearchProvider, SearchHit, SearchProvider};
pub use siteinfo::{
    HttpSiteInfoFetcher, SharedSiteInfo, SiteInfo, SiteInfoCache, SiteInfoFetcher,
    SiteInfoGeneral, WikiSiteInfo,
};

/// Build the shared HTTP client every remote call goes through. The
/// User-Agent identifies the service and the local account, as the wiki
/// API etiquette asks for.
pub fn build_http_client() -> Result<reqwest::Client, ApiError> {
    let mut headers = reqwest::header::HeaderMap::new();
    if let Ok(value) = reqwest::header::HeaderValue::from_str(&default_user_agent()) {
        headers.insert(reqwest::header::USER_AGENT, value);
    }
    let client = reqwest::Client::builder()
        .default_headers(headers)
        .timeout(std::time::Duration::from_secs(30))
        .build()?;
    Ok(client)
}

fn default_user_agent() -> String {
    let user = std::env::var("USER")
        .or_else(|_| std::env::var("LOGNAME"))
        .unwrap_or_else(|_| "unknown".to_string());
    format!("wikitel/{}/{}", env!("CARGO_PKG_VERSION"), user)
}

#[cfg(test)]
mod tests {
    use super::default_user_agent;

    #[test]
    fn unit_user_agent_names_service_and_version() {
        let agent = default_user_agent();
        assert!(agent.starts_with("wikitel/"));
        assert_eq!(agent.matches('/').count(), 2);
    }
}
