//! The per-connection state machine.
//!
//! One `Session` per accepted connection, owned exclusively by its handler
//! task. Each trimmed input line is a command, a quit, or an article
//! request; article requests render through the shared siteinfo handle and
//! fall back to title resolution on failure. Lines are handled strictly one
//! at a time per session.

use std::sync::Arc;

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::debug;

use wikitel_api::{ArticleRenderer, SearchProvider, SiteInfoCache};
use wikitel_core::{parse_command, SessionCommand, WikiDescriptor, DEFAULT_DOMAIN, SEPARATOR};

use crate::resolve::resolve_title;
use crate::welcome::WelcomeBanner;

/// Collaborators shared by every session. Cheap to clone.
#[derive(Clone)]
pub struct SessionContext {
    pub renderer: Arc<dyn ArticleRenderer>,
    pub search: Arc<dyn SearchProvider>,
    pub siteinfo: Arc<SiteInfoCache>,
    pub welcome: Arc<WelcomeBanner>,
}

/// What the connection loop should do after one line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    Continue,
    Closed,
}

/// State owned by one connection.
#[derive(Debug)]
pub struct Session {
    domain: String,
}

impl Session {
    pub fn new() -> Self {
        Self {
            domain: DEFAULT_DOMAIN.to_string(),
        }
    }

    /// Wiki all article requests currently go to.
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Handle one input line, writing any response to `out`. Transport
    /// write failures propagate and end only this session.
    pub async fn handle_line<W>(
        &mut self,
        line: &str,
        ctx: &SessionContext,
        out: &mut W,
    ) -> std::io::Result<SessionOutcome>
    where
        W: AsyncWrite + Send + Unpin,
    {
        let line = line.trim();
        if line.is_empty() {
            return Ok(SessionOutcome::Continue);
        }

        match parse_command(line) {
            Some(SessionCommand::UseDomain(domain)) => {
                self.domain = domain;
                let ack = format!("Using {} for future articles.\n", self.domain);
                out.write_all(ack.as_bytes()).await?;
                out.flush().await?;
                return Ok(SessionOutcome::Continue);
            }
            Some(SessionCommand::Quit) => {
                out.write_all(b"Bye!\n").await?;
                out.flush().await?;
                return Ok(SessionOutcome::Closed);
            }
            None => {}
        }

        let wikis = vec![WikiDescriptor::for_domain(&self.domain)];
        let siteinfo = ctx.siteinfo.get_or_fetch(&wikis).await;
        match ctx
            .renderer
            .render(&self.domain, line, &mut *out, siteinfo.clone())
            .await
        {
            Ok(()) => {}
            Err(error) => {
                debug!(domain = self.domain.as_str(), title = line, %error,
                    "render failed, attempting resolution");
                let recovered =
                    match resolve_title(ctx.search.as_ref(), &self.domain, line).await {
                        Some(resolved) => match ctx
                            .renderer
                            .render(&self.domain, &resolved, &mut *out, siteinfo)
                            .await
                        {
                            Ok(()) => true,
                            Err(error) => {
                                debug!(domain = self.domain.as_str(),
                                    resolved = resolved.as_str(), %error,
                                    "resolved render failed");
                                false
                            }
                        },
                        None => false,
                    };
                if !recovered {
                    // Report against the title the user actually typed.
                    out.write_all(not_found_message(line).as_bytes()).await?;
                }
            }
        }

        out.write_all(SEPARATOR.as_bytes()).await?;
        out.flush().await?;
        Ok(SessionOutcome::Continue)
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

fn not_found_message(title: &str) -> String {
    format!(
        "Sorry! Could not fetch \"{title}\" for you.\n\
         No worries. There are lots of other pages to read.\n\
         Pick a different title.\n"
    )
}
