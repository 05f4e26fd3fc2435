//! Command parsing.
//!
//! A command line is split on whitespace. The first token, lowercased, is
//! the keyword; the rest are arguments. Unknown keywords parse into
//! `Command::Unrecognized` so the dispatcher can answer them like any
//! other command.

use std::fmt;

/// Keywords that end the session (matched case-insensitively).
pub const QUIT_SYNONYMS: [&str; 4] = ["quit", "exit", "sair", "bye"];

/// Returns true if the whole line is a quit synonym.
///
/// This is an exact token match: `quit now` is not a quit.
pub fn is_quit(line: &str) -> bool {
    let line = line.trim();
    QUIT_SYNONYMS
        .iter()
        .any(|synonym| line.eq_ignore_ascii_case(synonym))
}

/// A parsed command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// List available commands
    Help,

    /// Server status and counters
    Status,

    /// Connected users
    Users,

    /// Simulated connectivity test; no packet is ever sent
    Ping {
        /// Target host (defaults to `google.com` when rendered)
        host: Option<String>,
    },

    /// Server date and time
    Time,

    /// The caller's own session
    Whoami,

    /// Server uptime
    Uptime,

    /// One of the quit synonyms
    Quit,

    /// Any other keyword (lowercased)
    Unrecognized(String),
}

impl Command {
    /// Parses a command line.
    ///
    /// Returns `None` for an empty or all-whitespace line.
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        if is_quit(line) {
            return Some(Self::Quit);
        }

        let mut tokens = line.split_whitespace();
        let keyword = tokens.next()?.to_lowercase();

        let command = match keyword.as_str() {
            "help" => Self::Help,
            "status" => Self::Status,
            "users" => Self::Users,
            "ping" => Self::Ping {
                host: tokens.next().map(str::to_string),
            },
            "time" => Self::Time,
            "whoami" => Self::Whoami,
            "uptime" => Self::Uptime,
            _ => Self::Unrecognized(keyword),
        };

        Some(command)
    }

    /// The keyword this command was parsed from.
    pub fn keyword(&self) -> &str {
        match self {
            Self::Help => "help",
            Self::Status => "status",
            Self::Users => "users",
            Self::Ping { .. } => "ping",
            Self::Time => "time",
            Self::Whoami => "whoami",
            Self::Uptime => "uptime",
            Self::Quit => "quit",
            Self::Unrecognized(keyword) => keyword,
        }
    }

    pub fn is_quit(&self) -> bool {
        matches!(self, Self::Quit)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ping { host: Some(host) } => write!(f, "ping {host}"),
            other => write!(f, "{}", other.keyword()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_commands() {
        assert_eq!(Command::parse("help"), Some(Command::Help));
        assert_eq!(Command::parse("status"), Some(Command::Status));
        assert_eq!(Command::parse("users"), Some(Command::Users));
        assert_eq!(Command::parse("time"), Some(Command::Time));
        assert_eq!(Command::parse("whoami"), Some(Command::Whoami));
        assert_eq!(Command::parse("uptime"), Some(Command::Uptime));
    }

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!(Command::parse("HELP"), Some(Command::Help));
        assert_eq!(Command::parse("  WhoAmI  "), Some(Command::Whoami));
    }

    #[test]
    fn test_parse_ping_host() {
        assert_eq!(Command::parse("ping"), Some(Command::Ping { host: None }));
        assert_eq!(
            Command::parse("ping example.org extra"),
            Some(Command::Ping {
                host: Some("example.org".to_string())
            })
        );
    }

    #[test]
    fn test_ping_host_keeps_case() {
        assert_eq!(
            Command::parse("PING Example.ORG"),
            Some(Command::Ping {
                host: Some("Example.ORG".to_string())
            })
        );
    }

    #[test]
    fn test_parse_empty() {
        assert_eq!(Command::parse(""), None);
        assert_eq!(Command::parse(" \t "), None);
    }

    #[test]
    fn test_parse_unrecognized() {
        assert_eq!(
            Command::parse("foobar baz"),
            Some(Command::Unrecognized("foobar".to_string()))
        );
        assert_eq!(
            Command::parse("FooBar"),
            Some(Command::Unrecognized("foobar".to_string()))
        );
    }

    #[test]
    fn test_quit_synonyms() {
        for synonym in ["quit", "exit", "sair", "bye", "QUIT", "Sair", " bye "] {
            assert!(is_quit(synonym), "{synonym} should quit");
            assert_eq!(Command::parse(synonym), Some(Command::Quit));
        }
    }

    #[test]
    fn test_quit_is_exact_token() {
        assert!(!is_quit("quit now"));
        assert!(!is_quit("quitter"));
        assert_eq!(
            Command::parse("quit now"),
            Some(Command::Unrecognized("quit".to_string()))
        );
    }

    #[test]
    fn test_keyword_and_display() {
        assert_eq!(Command::Unrecognized("xyz".to_string()).keyword(), "xyz");
        assert_eq!(
            Command::Ping {
                host: Some("h".to_string())
            }
            .to_string(),
            "ping h"
        );
        assert_eq!(Command::Time.to_string(), "time");
        assert!(Command::Quit.is_quit());
        assert!(!Command::Help.is_quit());
    }
}
