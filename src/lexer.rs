//! Splitting raw input lines into argument words.
//!
//! Tokenization is deliberately simple: words are separated by runs of spaces
//! and tabs, there is no quoting, no escaping and no substitution. The only
//! special character is a trailing `&`, which requests background execution.
//! Quoted phrases matter solely to the `alias` builtin, which re-joins them
//! with [`merge_quoted`] as a second pass over the raw words.

use crate::error::ShellError;

/// One parsed command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandLine {
    /// Argument words in input order, `&` already removed.
    pub argv: Vec<String>,
    /// Whether the line ended with `&`.
    pub background: bool,
}

impl CommandLine {
    /// True when the line held nothing but whitespace.
    pub fn is_empty(&self) -> bool {
        self.argv.is_empty()
    }
}

/// A run of words re-joined from a `"quoted phrase"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuotedPhrase {
    /// Phrase text with the surrounding quotes stripped, words joined by one space.
    pub text: String,
    /// How many raw words the phrase spanned.
    pub consumed: usize,
}

/// Tokenize one input line (without its trailing newline).
///
/// Lines longer than `max_len` bytes are rejected rather than truncated, so
/// that no part of a command is silently dropped.
pub fn split_line(line: &str, max_len: usize) -> Result<CommandLine, ShellError> {
    let line = line.trim_end_matches(['\n', '\r']);
    if line.len() > max_len {
        return Err(ShellError::LineTooLong {
            len: line.len(),
            max: max_len,
        });
    }

    let mut argv: Vec<String> = line
        .split([' ', '\t'])
        .filter(|word| !word.is_empty())
        .map(str::to_owned)
        .collect();

    let mut background = false;
    if let Some(last) = argv.last_mut() {
        if last == "&" {
            background = true;
            argv.pop();
        } else if let Some(stripped) = last.strip_suffix('&') {
            background = true;
            *last = stripped.to_owned();
        }
    }

    Ok(CommandLine { argv, background })
}

/// Re-join a phrase that starts with `"` at `words[0]` and ends at the first
/// word ending in `"`.
///
/// Returns `None` when `words` does not start with a quote or the quote is
/// never closed.
pub fn merge_quoted(words: &[String]) -> Option<QuotedPhrase> {
    let first = words.first()?.strip_prefix('"')?;

    let mut parts = Vec::new();
    for (i, word) in words.iter().enumerate() {
        let word = if i == 0 { first } else { word.as_str() };
        if let Some(last) = word.strip_suffix('"') {
            if !last.is_empty() {
                parts.push(last);
            }
            return Some(QuotedPhrase {
                text: parts.join(" "),
                consumed: i + 1,
            });
        }
        if !word.is_empty() {
            parts.push(word);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(line: &str) -> Vec<String> {
        line.split(' ').map(str::to_owned).collect()
    }

    #[test]
    fn collapses_runs_of_separators() {
        let cmd = split_line("echo a  b", 128).unwrap();
        assert_eq!(cmd.argv, vec!["echo", "a", "b"]);
        assert!(!cmd.background);

        let cmd = split_line("\t ls \t -l\t\n", 128).unwrap();
        assert_eq!(cmd.argv, vec!["ls", "-l"]);
    }

    #[test]
    fn trailing_ampersand_token_sets_background() {
        let cmd = split_line("sleep 5 &", 128).unwrap();
        assert_eq!(cmd.argv, vec!["sleep", "5"]);
        assert!(cmd.background);
    }

    #[test]
    fn abutting_ampersand_sets_background_without_corrupting_word() {
        let cmd = split_line("sleep 5&", 128).unwrap();
        assert_eq!(cmd.argv, vec!["sleep", "5"]);
        assert!(cmd.background);
    }

    #[test]
    fn whitespace_only_line_is_empty() {
        assert!(split_line("", 128).unwrap().is_empty());
        assert!(split_line("   \t  ", 128).unwrap().is_empty());
    }

    #[test]
    fn lone_ampersand_gives_empty_background_line() {
        let cmd = split_line("&", 128).unwrap();
        assert!(cmd.is_empty());
        assert!(cmd.background);
    }

    #[test]
    fn overlong_line_is_rejected() {
        let line = "x".repeat(129);
        assert_eq!(
            split_line(&line, 128),
            Err(ShellError::LineTooLong { len: 129, max: 128 })
        );
        assert!(split_line(&"x".repeat(128), 128).is_ok());
    }

    #[test]
    fn merges_quoted_phrase() {
        let phrase = merge_quoted(&words("\"ls -l\" list")).unwrap();
        assert_eq!(phrase.text, "ls -l");
        assert_eq!(phrase.consumed, 2);

        let phrase = merge_quoted(&words("\"ls\" l")).unwrap();
        assert_eq!(phrase.text, "ls");
        assert_eq!(phrase.consumed, 1);
    }

    #[test]
    fn unterminated_or_unquoted_phrase_is_none() {
        assert_eq!(merge_quoted(&words("\"ls -l list")), None);
        assert_eq!(merge_quoted(&words("ls -l")), None);
        assert_eq!(merge_quoted(&[]), None);
    }
}
