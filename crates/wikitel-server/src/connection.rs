//! One accepted connection, end to end: negotiation, banner, prompt loop.

use anyhow::Result;
use tracing::debug;

use tokio::io::{AsyncRead, AsyncWrite};
use wikitel_core::PROMPT;
use wikitel_session::{complete_input, Session, SessionContext, SessionOutcome};

use crate::telnet::{TelnetEvent, TelnetStream};

/// Drive one connection until the client quits, disconnects, or the
/// transport fails. Errors here end only this session.
pub async fn handle_connection<S>(stream: S, ctx: SessionContext) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    let mut telnet = TelnetStream::new(stream);
    telnet.negotiate().await?;

    let banner = ctx.welcome.snapshot();
    telnet.write_str(&banner).await?;

    let mut session = Session::new();
    loop {
        telnet.write_str(PROMPT).await?;
        loop {
            match telnet.next_event().await? {
                TelnetEvent::Line(line) => {
                    let outcome = session
                        .handle_line(&line, &ctx, telnet.sink_mut())
                        .await?;
                    if outcome == SessionOutcome::Closed {
                        return Ok(());
                    }
                    break;
                }
                TelnetEvent::Tab(partial) => {
                    let candidates =
                        complete_input(ctx.search.as_ref(), session.domain(), &partial).await;
                    if candidates.len() == 1 {
                        telnet.replace_line(&candidates[0]).await?;
                    } else {
                        let mut listing = String::from("\r\n");
                        for candidate in &candidates {
                            listing.push_str(candidate);
                            listing.push_str("\r\n");
                        }
                        telnet.write_str(&listing).await?;
                        telnet.redraw(PROMPT).await?;
                    }
                }
                TelnetEvent::Eof => {
                    debug!("client disconnected");
                    return Ok(());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;

    use async_trait::async_trait;
    use tokio::io::{duplex, AsyncReadExt, AsyncWriteExt};

    use wikitel_api::{
        ApiError, ArticleRenderer, RenderError, SearchHit, SearchProvider, SharedSiteInfo,
        SiteInfo, SiteInfoCache, SiteInfoFetcher,
    };
    use wikitel_session::WelcomeBanner;

    use super::*;

    struct EmptySiteInfo;

    #[async_trait]
    impl SiteInfoFetcher for EmptySiteInfo {
        async fn fetch(
            &self,
            _wikis: &[wikitel_core::WikiDescriptor],
        ) -> Result<SiteInfo, ApiError> {
            Ok(SiteInfo { wikis: Vec::new() })
        }
    }

    struct FixedSearch {
        hits: Vec<SearchHit>,
    }

    #[async_trait]
    impl SearchProvider for FixedSearch {
        async fn prefix_search(
            &self,
            _domain: &str,
            _term: &str,
            _limit: u32,
        ) -> Result<Vec<SearchHit>, ApiError> {
            Ok(self.hits.clone())
        }
    }

    struct PageTable {
        pages: HashMap<String, String>,
    }

    #[async_trait]
    impl ArticleRenderer for PageTable {
        async fn render(
            &self,
            _domain: &str,
            title: &str,
            sink: &mut (dyn tokio::io::AsyncWrite + Send + Unpin),
            siteinfo: SharedSiteInfo,
        ) -> Result<(), RenderError> {
            let _ = siteinfo.await;
            match self.pages.get(title) {
                Some(body) => {
                    sink.write_all(body.as_bytes()).await?;
                    sink.flush().await?;
                    Ok(())
                }
                None => Err(RenderError::MissingArticle {
                    title: title.to_string(),
                }),
            }
        }
    }

    fn test_context(pages: &[(&str, &str)], hits: Vec<SearchHit>) -> SessionContext {
        SessionContext {
            renderer: Arc::new(PageTable {
                pages: pages
                    .iter()
                    .map(|(title, body)| (title.to_string(), body.to_string()))
                    .collect(),
            }),
            search: Arc::new(FixedSearch { hits }),
            siteinfo: Arc::new(SiteInfoCache::new(Arc::new(EmptySiteInfo))),
            welcome: Arc::new(WelcomeBanner::new()),
        }
    }

    async fn read_available(client: &mut (impl AsyncReadExt + Unpin)) -> String {
        let mut collected = Vec::new();
        let mut buf = [0u8; 4096];
        loop {
            match tokio::time::timeout(
                std::time::Duration::from_millis(100),
                client.read(&mut buf),
            )
            .await
            {
                Ok(Ok(0)) | Err(_) => break,
                Ok(Ok(count)) => collected.extend_from_slice(&buf[..count]),
                Ok(Err(error)) => panic!("read failed: {error}"),
            }
        }
        String::from_utf8_lossy(&collected).into_owned()
    }

    #[tokio::test]
    async fn integration_connection_shows_banner_renders_article_and_quits() {
        let ctx = test_context(&[("Paris", "Paris\n\nCapital of France.\n")], Vec::new());
        let (mut client, server) = duplex(16 * 1024);
        let task = tokio::spawn(handle_connection(server, ctx));

        client.write_all(b"Paris\r\n").await.expect("write");
        client.write_all(b":quit\r\n").await.expect("write");

        let transcript = read_available(&mut client).await;
        assert!(transcript.contains("The Free Encyclopedia"));
        assert!(transcript.contains(">>> "));
        assert!(transcript.contains("Capital of France."));
        assert!(transcript.contains("Bye!"));

        task.await.expect("join").expect("connection");
    }

    #[tokio::test]
    async fn integration_tab_with_single_candidate_completes_in_place() {
        let ctx = test_context(&[("Paris", "Paris\n\nBody.\n")], Vec::new());
        let (mut client, server) = duplex(16 * 1024);
        let task = tokio::spawn(handle_connection(server, ctx));

        client.write_all(b":q\t\r\n").await.expect("write");

        let transcript = read_available(&mut client).await;
        assert!(transcript.contains(":quit"));
        assert!(transcript.contains("Bye!"));

        task.await.expect("join").expect("connection");
    }

    #[tokio::test]
    async fn integration_tab_with_multiple_candidates_lists_and_reprompts() {
        let hits = vec![
            SearchHit {
                title: "Paris".to_string(),
                index: 1,
            },
            SearchHit {
                title: "Paris Commune".to_string(),
                index: 2,
            },
        ];
        let ctx = test_context(&[], hits);
        let (mut client, server) = duplex(16 * 1024);
        let task = tokio::spawn(handle_connection(server, ctx));

        client.write_all(b"Par\t").await.expect("write");
        let listing = read_available(&mut client).await;
        assert!(listing.contains("Paris\r\n"));
        assert!(listing.contains("Paris Commune\r\n"));
        // Prompt and the partial input are redrawn after the listing.
        assert!(listing.ends_with(">>> Par"));

        client.write_all(&[0x04]).await.expect("write");
        task.await.expect("join").expect("connection");
    }

    #[tokio::test]
    async fn integration_eof_closes_the_connection_cleanly() {
        let ctx = test_context(&[], Vec::new());
        let (mut client, server) = duplex(16 * 1024);
        let task = tokio::spawn(handle_connection(server, ctx));

        let _ = read_available(&mut client).await;
        drop(client);

        task.await.expect("join").expect("connection");
    }
}
