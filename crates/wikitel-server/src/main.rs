//! Telnet-facing Wikipedia reader service.

mod connection;
mod telnet;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use wikitel_api::{
    build_http_client, ExtractRenderer, HttpSearchProvider, HttpSiteInfoFetcher, SiteInfoCache,
};
use wikitel_session::{
    start_welcome_refresh_runtime, SessionContext, WelcomeBanner, WELCOME_REFRESH_INTERVAL,
};

use crate::connection::handle_connection;

#[derive(Debug, Parser)]
#[command(name = "wikitel", about = "Wikipedia over telnet", version)]
struct Cli {
    /// TCP port to listen on.
    #[arg(long, env = "WIKITEL_PORT", default_value_t = wikitel_core::DEFAULT_PORT)]
    port: u16,

    /// Address to bind.
    #[arg(long, env = "WIKITEL_BIND", default_value = "0.0.0.0")]
    bind: String,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

/// Port binding fails for reasons the operator fixes differently; make the
/// privileged-port case explicit instead of echoing a bare errno.
fn classify_bind_error(error: &std::io::Error, addr: &str) -> String {
    match error.kind() {
        std::io::ErrorKind::PermissionDenied => {
            format!("binding {addr} requires elevated privileges (low ports are restricted)")
        }
        std::io::ErrorKind::AddrInUse => {
            format!("{addr} is already in use by another process")
        }
        _ => format!("failed to bind {addr}: {error}"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let http = build_http_client().context("building HTTP client")?;
    let ctx = SessionContext {
        renderer: Arc::new(ExtractRenderer::new(http.clone())),
        search: Arc::new(HttpSearchProvider::new(http.clone())),
        siteinfo: Arc::new(SiteInfoCache::new(Arc::new(HttpSiteInfoFetcher::new(http)))),
        welcome: Arc::new(WelcomeBanner::new()),
    };

    let mut refresh = start_welcome_refresh_runtime(
        Arc::clone(&ctx.welcome),
        Arc::clone(&ctx.renderer),
        Arc::clone(&ctx.siteinfo),
        WELCOME_REFRESH_INTERVAL,
    );

    let addr = format!("{}:{}", cli.bind, cli.port);
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(error) => {
            let reason = classify_bind_error(&error, &addr);
            error!(%reason, "startup failed");
            refresh.shutdown().await;
            anyhow::bail!(reason);
        }
    };

    info!(addr = addr.as_str(), "listening");
    if cli.port == 23 {
        info!("connect with: telnet localhost");
    } else {
        info!(port = cli.port, "connect with: telnet localhost <port>");
    }

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                match accepted {
                    Ok((stream, peer)) => {
                        info!(%peer, "connection accepted");
                        let ctx = ctx.clone();
                        tokio::spawn(async move {
                            if let Err(error) = handle_connection(stream, ctx).await {
                                warn!(%peer, %error, "session ended with error");
                            } else {
                                info!(%peer, "session closed");
                            }
                        });
                    }
                    Err(error) => {
                        warn!(%error, "accept failed");
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("shutdown signal received");
                break;
            }
        }
    }

    refresh.shutdown().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::classify_bind_error;

    #[test]
    fn unit_classify_bind_error_names_privileged_ports() {
        let denied = std::io::Error::from(std::io::ErrorKind::PermissionDenied);
        let message = classify_bind_error(&denied, "0.0.0.0:23");
        assert!(message.contains("elevated privileges"));

        let in_use = std::io::Error::from(std::io::ErrorKind::AddrInUse);
        assert!(classify_bind_error(&in_use, "0.0.0.0:1081").contains("already in use"));
    }
}
