//! Pure leaf helpers shared across wikitel crates.
//!
//! Title normalization, session command parsing, the static completion
//! roster, and wiki-set cache key derivation. No I/O lives here.

pub mod commands;
pub mod normalize;

pub use commands::{parse_command, SessionCommand};
pub use normalize::normalize_title;

/// Domain every new session starts on.
pub const DEFAULT_DOMAIN: &str = "en.wikipedia.org";

/// Listen port when none is given on the command line.
pub const DEFAULT_PORT: u16 = 1081;

/// Prompt written before each input line.
pub const PROMPT: &str = ">>> ";

/// Separator appended after each rendered article or failure notice.
/// A richer ANSI separator caused boldface glitches on some terminals,
/// so a single newline it is.
pub const SEPARATOR: &str = "\n";

/// Result count requested from prefix search for completion and resolution.
pub const SEARCH_LIMIT: u32 = 6;

const COMMAND_ROSTER_DOMAINS: [&str; 10] = [
    "en.wikipedia.org",
    "es.wikipedia.org",
    "ja.wikipedia.org",
    "de.wikipedia.org",
    "ru.wikipedia.org",
    "fr.wikipedia.org",
    "it.wikipedia.org",
    "pt.wikipedia.org",
    "zh.wikipedia.org",
    "pl.wikipedia.org",
];

/// Fixed command strings offered by tab completion: `:quit` plus one
/// `:use <domain>` entry per well-known wiki.
pub fn static_commands() -> Vec<String> {
    let mut commands = Vec::with_capacity(COMMAND_ROSTER_DOMAINS.len() + 1);
    commands.push(":quit".to_string());
    for domain in COMMAND_ROSTER_DOMAINS {
        commands.push(format!(":use {domain}"));
    }
    commands
}

/// One remote wiki the metadata layer may be asked about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WikiDescriptor {
    pub base_url: String,
}

impl WikiDescriptor {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }

    /// Descriptor for a plain `<lang>.wikipedia.org`-style domain.
    pub fn for_domain(domain: &str) -> Self {
        Self {
            base_url: format!("https://{domain}/w"),
        }
    }
}

/// Deterministic cache key for an ordered wiki set: base URLs joined by
/// `|`, prefixed with `$` so an empty set never collides with a falsy key.
pub fn wiki_set_key(wikis: &[WikiDescriptor]) -> String {
    let mut key = String::from("$");
    for (position, wiki) in wikis.iter().enumerate() {
        if position > 0 {
            key.push('|');
        }
        key.push_str(&wiki.base_url);
    }
    key
}
