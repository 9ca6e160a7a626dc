//! Command grammar for lines typed in the COMMAND phase.
//!
//! ```text
//! help | pend | quit
//! chat <name>
//! hist <count> <name>      count: digits only, at most 10
//! ```
//!
//! Anything else is [`Command::Bad`]. Names are non-empty ASCII
//! alphanumeric strings.

use crate::constants::MAX_HIST_COUNT;

/// A parsed command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Show the local help listing.
    Help,
    /// List users with messages waiting.
    Pend,
    /// End the session.
    Quit,
    /// Open a chat with the named user.
    Chat(String),
    /// Show up to `count` latest messages exchanged with `name`.
    Hist { count: usize, name: String },
    /// Line did not match the grammar.
    Bad,
}

impl Command {
    /// Parse one line of user input.
    pub fn parse(line: &str) -> Self {
        match split_words(line).as_slice() {
            ["help"] => Self::Help,
            ["pend"] => Self::Pend,
            ["quit"] => Self::Quit,
            ["chat", name] if is_valid_user_name(name) => Self::Chat((*name).to_string()),
            ["hist", count, name] if is_valid_user_name(name) => match parse_count(count) {
                Some(count) => Self::Hist {
                    count,
                    name: (*name).to_string(),
                },
                None => Self::Bad,
            },
            _ => Self::Bad,
        }
    }

    /// Short verb used in log lines.
    pub fn verb(&self) -> &'static str {
        match self {
            Self::Help => "help",
            Self::Pend => "pend",
            Self::Quit => "quit",
            Self::Chat(_) => "chat",
            Self::Hist { .. } => "hist",
            Self::Bad => "bad",
        }
    }
}

/// Split on whitespace, dropping empty tokens.
pub fn split_words(line: &str) -> Vec<&str> {
    line.split_whitespace().collect()
}

/// Non-empty and ASCII alphanumeric only.
pub fn is_valid_user_name(name: &str) -> bool {
    !name.is_empty() && name.bytes().all(|b| b.is_ascii_alphanumeric())
}

/// Opponent name from a line already matched as `chat <name>`.
pub fn parse_chat_command(line: &str) -> String {
    split_words(line).get(1).copied().unwrap_or_default().to_string()
}

/// Count and name from a line already matched as `hist <count> <name>`.
pub fn parse_hist_command(line: &str) -> (usize, String) {
    let words = split_words(line);
    let count = words
        .get(1)
        .and_then(|c| c.parse().ok())
        .unwrap_or_default();
    let name = words.get(2).copied().unwrap_or_default().to_string();
    (count, name)
}

fn parse_count(word: &str) -> Option<usize> {
    if word.is_empty() || !word.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    word.parse::<usize>().ok().filter(|n| *n <= MAX_HIST_COUNT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grammar_table() {
        let cases = [
            ("help", Command::Help),
            ("pend", Command::Pend),
            ("quit", Command::Quit),
            ("  quit  ", Command::Quit),
            ("chat bob", Command::Chat("bob".into())),
            ("chat\tbob", Command::Chat("bob".into())),
            (
                "hist 10 alice",
                Command::Hist {
                    count: 10,
                    name: "alice".into(),
                },
            ),
            (
                "hist 0 bob",
                Command::Hist {
                    count: 0,
                    name: "bob".into(),
                },
            ),
            (
                "hist 007 bob",
                Command::Hist {
                    count: 7,
                    name: "bob".into(),
                },
            ),
            ("hist 11 alice", Command::Bad),
            ("hist -1 alice", Command::Bad),
            ("hist 99999999999999999999999 alice", Command::Bad),
            ("hist 3", Command::Bad),
            ("chat bob!", Command::Bad),
            ("chat", Command::Bad),
            ("chat bob amy", Command::Bad),
            ("help me", Command::Bad),
            ("QUIT", Command::Bad),
            ("", Command::Bad),
            ("   ", Command::Bad),
        ];
        for (line, expected) in cases {
            assert_eq!(Command::parse(line), expected, "line {line:?}");
        }
    }

    #[test]
    fn test_user_name_validation() {
        assert!(is_valid_user_name("amy"));
        assert!(is_valid_user_name("Amy42"));
        assert!(!is_valid_user_name(""));
        assert!(!is_valid_user_name("amy bob"));
        assert!(!is_valid_user_name("amy_"));
        assert!(!is_valid_user_name("ámy"));
    }

    #[test]
    fn test_argument_extraction() {
        assert_eq!(parse_chat_command("chat  bob"), "bob");
        assert_eq!(parse_hist_command("hist 4 amy"), (4, "amy".to_string()));
    }

    #[test]
    fn test_split_drops_empty_tokens() {
        assert_eq!(split_words(" a \t b\r\n c "), vec!["a", "b", "c"]);
        assert!(split_words("").is_empty());
    }
}
