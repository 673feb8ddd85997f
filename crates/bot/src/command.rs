//! Prefix command parsing.

use thiserror::Error;

/// A recognised bot command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Summarize recent channel history, optionally limited to `limit` messages.
    Summarize { limit: Option<usize> },
    /// Summarize the bot's own message cache.
    SummarizeCache,
    /// Show usage.
    Help,
}

/// A command was recognised but its argument was not usable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("expected a positive message count, got {0:?}")]
    InvalidCount(String),
}

/// Parse `content` as a command under `prefix`.
///
/// Returns `Ok(None)` for ordinary chat and unknown commands.
pub fn parse(prefix: &str, content: &str) -> Result<Option<Command>, CommandError> {
    let Some(rest) = content.trim().strip_prefix(prefix) else {
        return Ok(None);
    };

    let mut words = rest.split_whitespace();
    let Some(name) = words.next() else {
        return Ok(None);
    };

    let command = match name {
        "summarize" | "sum" | "summary" => Command::Summarize {
            limit: words.next().map(parse_count).transpose()?,
        },
        "summarize_cache" | "sumcache" => Command::SummarizeCache,
        "help" => Command::Help,
        _ => return Ok(None),
    };
    Ok(Some(command))
}

fn parse_count(raw: &str) -> Result<usize, CommandError> {
    match raw.parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(CommandError::InvalidCount(raw.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_chat_is_not_a_command() {
        assert_eq!(parse("!", "hello everyone"), Ok(None));
        assert_eq!(parse("!", "!"), Ok(None));
        assert_eq!(parse("!", "!dance"), Ok(None));
    }

    #[test]
    fn summarize_and_aliases() {
        for text in ["!summarize", "!sum", "!summary", "  !summarize  "] {
            assert_eq!(parse("!", text), Ok(Some(Command::Summarize { limit: None })));
        }
        assert_eq!(
            parse("!", "!summarize 30"),
            Ok(Some(Command::Summarize { limit: Some(30) }))
        );
    }

    #[test]
    fn invalid_counts() {
        assert_eq!(
            parse("!", "!summarize lots"),
            Err(CommandError::InvalidCount("lots".into()))
        );
        assert!(parse("!", "!sum 0").is_err());
        assert!(parse("!", "!sum -5").is_err());
    }

    #[test]
    fn cache_and_help() {
        assert_eq!(parse("!", "!summarize_cache"), Ok(Some(Command::SummarizeCache)));
        assert_eq!(parse("!", "!sumcache"), Ok(Some(Command::SummarizeCache)));
        assert_eq!(parse("!", "!help"), Ok(Some(Command::Help)));
    }

    #[test]
    fn custom_prefix() {
        assert_eq!(parse("?", "?sumcache"), Ok(Some(Command::SummarizeCache)));
        assert_eq!(parse("?", "!sumcache"), Ok(None));
        assert_eq!(parse("bot ", "bot help"), Ok(Some(Command::Help)));
    }
}
