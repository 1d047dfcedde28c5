//! Per-connection session logic and the shared welcome banner.
//!
//! A `Session` owns one connection's state (the selected wiki domain) and
//! turns each input line into a command, an article render, or a fallback
//! resolution. Completion and resolution share the same prefix-search
//! primitive; the welcome banner is a process-wide snapshot refreshed on a
//! fixed schedule, independent of session activity.

pub mod complete;
pub mod resolve;
pub mod session;
pub mod welcome;


pub use complete::complete_input;
pub use resolve::resolve_title;
pub use session::{Session, SessionContext, SessionOutcome};
pub use welcome::{
    start_welcome_refresh_runtime, WelcomeBanner, WelcomeRefreshHandle, WelcomeRefreshReport,
    WELCOME_REFRESH_INTERVAL, WELCOME_TITLE,
};
