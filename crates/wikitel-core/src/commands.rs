//! Session command parsing.
//!
//! Lines that are not recognized here fall through to article-request
//! handling; parsing must therefore reject anything ambiguous instead of
//! guessing.

/// A recognized session command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    /// `:use <domain>` / `:host <domain>` — switch the active wiki.
    UseDomain(String),
    /// `:quit` — close the session.
    Quit,
}

/// Parse one trimmed input line. Keyword matching is case-insensitive;
/// the domain must be a single whitespace-free token ending in `.org`
/// (anything else is treated as an article title by the caller).
pub fn parse_command(line: &str) -> Option<SessionCommand> {
    if line == ":quit" {
        return Some(SessionCommand::Quit);
    }

    let rest = line.strip_prefix(':')?;
    let mut parts = rest.split_whitespace();
    let keyword = parts.next()?;
    if !keyword.eq_ignore_ascii_case("use") && !keyword.eq_ignore_ascii_case("host") {
        return None;
    }
    let domain = parts.next()?;
    if parts.next().is_some() {
        return None;
    }
    if !is_plausible_domain(domain) {
        return None;
    }
    Some(SessionCommand::UseDomain(domain.to_string()))
}

fn is_plausible_domain(token: &str) -> bool {
    token.len() > ".org".len() && token.ends_with(".org") && !token.contains(char::is_whitespace)
}

#[cfg(test)]
mod tests {
    use super::{parse_command, SessionCommand};

    #[test]
    fn unit_parse_quit_is_exact() {
        assert_eq!(parse_command(":quit"), Some(SessionCommand::Quit));
        assert_eq!(parse_command(":QUIT"), None);
        assert_eq!(parse_command(":quit now"), None);
    }

    #[test]
    fn unit_parse_use_and_host_switch_domain() {
        assert_eq!(
            parse_command(":use es.wikipedia.org"),
            Some(SessionCommand::UseDomain("es.wikipedia.org".to_string()))
        );
        assert_eq!(
            parse_command(":host de.wikipedia.org"),
            Some(SessionCommand::UseDomain("de.wikipedia.org".to_string()))
        );
        assert_eq!(
            parse_command(":USE fr.wikipedia.org"),
            Some(SessionCommand::UseDomain("fr.wikipedia.org".to_string()))
        );
    }

    #[test]
    fn unit_parse_rejects_malformed_domains() {
        // These all fall through to article handling.
        assert_eq!(parse_command(":use"), None);
        assert_eq!(parse_command(":use example.com"), None);
        assert_eq!(parse_command(":use .org"), None);
        assert_eq!(parse_command(":use two tokens.org"), None);
        assert_eq!(parse_command("use en.wikipedia.org"), None);
        assert_eq!(parse_command("Madrid"), None);
    }
}
