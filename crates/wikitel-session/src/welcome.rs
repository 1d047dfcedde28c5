//! Shared welcome banner with periodic background refresh.
//!
//! The banner is the rendered text of a fixed well-known article, recomputed
//! every six hours and swapped atomically. Sessions read the live snapshot
//! at connection time; a refresh never disturbs a session in progress. If
//! the very first computation fails, a bundled static banner is substituted;
//! later failures keep the previous value.

use std::io::Cursor;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use wikitel_api::{ArticleRenderer, SiteInfoCache};
use wikitel_core::{WikiDescriptor, DEFAULT_DOMAIN};

/// Article rendered as the greeting for new connections.
pub const WELCOME_TITLE: &str = "Wikipedia";

/// Wall-clock period between banner recomputations.
pub const WELCOME_REFRESH_INTERVAL: Duration = Duration::from_secs(6 * 60 * 60);

const FALLBACK_BANNER: &str = include_str!("../assets/welcome-banner.txt");

/// Outcome of one refresh attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WelcomeRefreshReport {
    pub reason_code: String,
    pub banner_chars: usize,
}

/// Process-wide banner snapshot. Readers never block the refresher and
/// always observe a complete value.
pub struct WelcomeBanner {
    banner: ArcSwap<String>,
    applied_once: AtomicBool,
}

impl WelcomeBanner {
    /// Starts on the bundled fallback so a connection racing the first
    /// refresh never sees an empty greeting.
    pub fn new() -> Self {
        Self {
            banner: ArcSwap::from_pointee(FALLBACK_BANNER.to_string()),
            applied_once: AtomicBool::new(false),
        }
    }

    /// Current banner; lock-free.
    pub fn snapshot(&self) -> Arc<String> {
        self.banner.load_full()
    }

    /// Recompute the banner once: render the welcome article into a buffer,
    /// strip the redundant leading title line, swap the remainder in.
    pub async fn refresh_once(
        &self,
        renderer: &dyn ArticleRenderer,
        siteinfo: &SiteInfoCache,
    ) -> WelcomeRefreshReport {
        let wikis = vec![WikiDescriptor::for_domain(DEFAULT_DOMAIN)];
        let handle = siteinfo.get_or_fetch(&wikis).await;
        let mut sink = Cursor::new(Vec::new());
        match renderer
            .render(DEFAULT_DOMAIN, WELCOME_TITLE, &mut sink, handle)
            .await
        {
            Ok(()) => {
                let rendered = String::from_utf8_lossy(sink.get_ref()).into_owned();
                let banner = strip_leading_title_line(&rendered).to_string();
                let banner_chars = banner.chars().count();
                self.banner.store(Arc::new(banner));
                self.applied_once.store(true, Ordering::SeqCst);
                debug!(banner_chars, "welcome banner refreshed");
                WelcomeRefreshReport {
                    reason_code: "banner_rendered".to_string(),
                    banner_chars,
                }
            }
            Err(error) => {
                let first_attempt = !self.applied_once.swap(true, Ordering::SeqCst);
                warn!(%error, first_attempt, "welcome banner refresh failed");
                if first_attempt {
                    self.banner.store(Arc::new(FALLBACK_BANNER.to_string()));
                    WelcomeRefreshReport {
                        reason_code: "banner_fallback_applied".to_string(),
                        banner_chars: FALLBACK_BANNER.chars().count(),
                    }
                } else {
                    WelcomeRefreshReport {
                        reason_code: "banner_refresh_failed_kept_previous".to_string(),
                        banner_chars: self.snapshot().chars().count(),
                    }
                }
            }
        }
    }
}

impl Default for WelcomeBanner {
    fn default() -> Self {
        Self::new()
    }
}

/// Drop the leading `<title>\n` line the renderer emits; the greeting
/// shouldn't start with the article's own name.
fn strip_leading_title_line(raw: &str) -> &str {
    let title_len = raw
        .find(char::is_whitespace)
        .unwrap_or(raw.len());
    if title_len == 0 {
        return raw;
    }
    let after = &raw[title_len..];
    let stripped = after.trim_start_matches(['\r', '\n']);
    if stripped.len() == after.len() {
        // Title not followed by a newline; leave the text alone.
        return raw;
    }
    stripped
}

/// Lifecycle handle for the background refresh loop.
#[derive(Debug)]
pub struct WelcomeRefreshHandle {
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl WelcomeRefreshHandle {
    pub async fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

/// Spawn the refresh loop. The first tick fires immediately, so the startup
/// computation happens here too; session activity never triggers one.
pub fn start_welcome_refresh_runtime(
    banner: Arc<WelcomeBanner>,
    renderer: Arc<dyn ArticleRenderer>,
    siteinfo: Arc<SiteInfoCache>,
    interval: Duration,
) -> WelcomeRefreshHandle {
    let interval = interval.max(Duration::from_millis(1));
    let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();
    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let report = banner.refresh_once(renderer.as_ref(), siteinfo.as_ref()).await;
                    debug!(reason_code = report.reason_code.as_str(), "welcome refresh tick");
                }
                _ = &mut shutdown_rx => {
                    break;
                }
            }
        }
    });

    WelcomeRefreshHandle {
        shutdown_tx: Some(shutdown_tx),
        task: Some(task),
    }
}
