//! User-defined command aliases.
//!
//! An alias maps a single word to replacement text. Before a line is
//! dispatched its first word is looked up here and, when it names an alias,
//! replaced by the alias text split into words. Expansion happens exactly once:
//! the replacement is never looked up again, so aliases cannot refer to other
//! aliases or to themselves.

use crate::config::{MAX_ALIAS_COMMAND_LEN, MAX_ALIAS_NAME_LEN};
use crate::error::ShellError;
use crate::lexer::merge_quoted;
use std::io::{self, Write};

const NAME_FIRST_USAGE: &str = "alias name command [args...]";
const QUOTED_USAGE: &str = "alias \"command with spaces\" name";

#[derive(Debug, Clone, PartialEq, Eq)]
struct AliasEntry {
    name: String,
    command: String,
}

/// Bounded, insertion-ordered alias table.
#[derive(Debug, Clone)]
pub struct AliasStore {
    entries: Vec<AliasEntry>,
    capacity: usize,
}

/// A parsed `alias` definition request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasDefinition {
    pub name: String,
    pub command: String,
}

impl AliasDefinition {
    /// Parse the arguments of `alias` (the builtin name excluded).
    ///
    /// Two forms are accepted:
    /// - `alias <name> <word> <word> ...`
    /// - `alias "<quoted phrase>" <name>`
    pub fn parse(args: &[String]) -> Result<Self, ShellError> {
        match args.first() {
            Some(first) if first.starts_with('"') => Self::parse_quoted_form(args),
            Some(_) => Self::parse_name_first_form(args),
            None => Err(ShellError::Usage(NAME_FIRST_USAGE.to_string())),
        }
    }

    fn parse_quoted_form(args: &[String]) -> Result<Self, ShellError> {
        let usage = || ShellError::Usage(QUOTED_USAGE.to_string());
        let phrase = merge_quoted(args).ok_or_else(usage)?;
        match &args[phrase.consumed..] {
            [name] if !phrase.text.is_empty() => Ok(Self {
                name: name.clone(),
                command: phrase.text,
            }),
            _ => Err(usage()),
        }
    }

    fn parse_name_first_form(args: &[String]) -> Result<Self, ShellError> {
        match args {
            [name, words @ ..] if !words.is_empty() => Ok(Self {
                name: name.clone(),
                command: words.join(" "),
            }),
            _ => Err(ShellError::Usage(NAME_FIRST_USAGE.to_string())),
        }
    }
}

impl AliasStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            capacity,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up the replacement text of `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|entry| entry.name == name)
            .map(|entry| entry.command.as_str())
    }

    /// Insert `name`, or overwrite its text when it already exists.
    ///
    /// On any error the table is left unchanged.
    pub fn define(&mut self, name: &str, command: &str) -> Result<(), ShellError> {
        if name.is_empty() || command.is_empty() {
            return Err(ShellError::Usage(NAME_FIRST_USAGE.to_string()));
        }
        if name.len() > MAX_ALIAS_NAME_LEN {
            return Err(ShellError::TooLong {
                what: "alias name",
                max: MAX_ALIAS_NAME_LEN,
            });
        }
        if command.len() > MAX_ALIAS_COMMAND_LEN {
            return Err(ShellError::TooLong {
                what: "alias command",
                max: MAX_ALIAS_COMMAND_LEN,
            });
        }

        if let Some(entry) = self.entries.iter_mut().find(|entry| entry.name == name) {
            entry.command = command.to_string();
            return Ok(());
        }
        if self.entries.len() >= self.capacity {
            return Err(ShellError::TableFull("alias"));
        }
        self.entries.push(AliasEntry {
            name: name.to_string(),
            command: command.to_string(),
        });
        Ok(())
    }

    /// Delete `name` from the table.
    pub fn remove(&mut self, name: &str) -> Result<(), ShellError> {
        let index = self
            .entries
            .iter()
            .position(|entry| entry.name == name)
            .ok_or_else(|| ShellError::NotFound(format!("alias '{}' not found", name)))?;
        self.entries.remove(index);
        Ok(())
    }

    /// Iterate over `(name, command)` pairs in table order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|entry| (entry.name.as_str(), entry.command.as_str()))
    }

    /// Write one `name "command"` line per alias.
    pub fn write_listing(&self, out: &mut dyn Write) -> io::Result<()> {
        for (name, command) in self.iter() {
            writeln!(out, "{} \"{}\"", name, command)?;
        }
        Ok(())
    }

    /// Replace an aliased first word with its text, keeping the remaining words.
    pub fn expand(&self, argv: Vec<String>) -> Vec<String> {
        let Some(command) = argv.first().and_then(|first| self.get(first)) else {
            return argv;
        };
        tracing::debug!(alias = %argv[0], replacement = %command, "expanding alias");
        command
            .split_whitespace()
            .map(str::to_owned)
            .chain(argv.into_iter().skip(1))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(line: &str) -> Vec<String> {
        line.split_whitespace().map(str::to_owned).collect()
    }

    fn listing(store: &AliasStore) -> String {
        let mut out = Vec::new();
        store.write_listing(&mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn parses_name_first_form() {
        let def = AliasDefinition::parse(&args("ll ls -l")).unwrap();
        assert_eq!(def.name, "ll");
        assert_eq!(def.command, "ls -l");
    }

    #[test]
    fn parses_quoted_form() {
        let def = AliasDefinition::parse(&args("\"ls -l -a\" la")).unwrap();
        assert_eq!(def.name, "la");
        assert_eq!(def.command, "ls -l -a");

        let def = AliasDefinition::parse(&args("\"pwd\" here")).unwrap();
        assert_eq!(def.name, "here");
        assert_eq!(def.command, "pwd");
    }

    #[test]
    fn rejects_malformed_definitions() {
        for line in [
            "ll",
            "\"ls -l\"",
            "\"ls -l list",
            "\"ls -l\" list extra",
            "\"\" empty",
        ] {
            assert!(
                matches!(AliasDefinition::parse(&args(line)), Err(ShellError::Usage(_))),
                "accepted {line:?}"
            );
        }
        assert!(matches!(AliasDefinition::parse(&[]), Err(ShellError::Usage(_))));
    }

    #[test]
    fn redefining_updates_in_place() {
        let mut store = AliasStore::new(100);
        for text in ["ls", "ls -l", "ls -la"] {
            store.define("ll", text).unwrap();
        }
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("ll"), Some("ls -la"));
    }

    #[test]
    fn listing_keeps_insertion_order() {
        let mut store = AliasStore::new(100);
        store.define("a", "echo a").unwrap();
        store.define("b", "echo b").unwrap();
        store.define("c", "echo c").unwrap();
        store.define("a", "echo A").unwrap();
        store.remove("b").unwrap();
        store.define("d", "echo d").unwrap();

        assert_eq!(listing(&store), "a \"echo A\"\nc \"echo c\"\nd \"echo d\"\n");
    }

    #[test]
    fn removing_unknown_alias_is_not_found() {
        let mut store = AliasStore::new(100);
        store.define("ll", "ls -l").unwrap();
        assert!(matches!(store.remove("nope"), Err(ShellError::NotFound(_))));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn full_table_rejects_new_names_but_allows_updates() {
        let mut store = AliasStore::new(2);
        store.define("a", "x").unwrap();
        store.define("b", "y").unwrap();
        assert_eq!(store.define("c", "z"), Err(ShellError::TableFull("alias")));
        store.define("a", "w").unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.get("c"), None);
    }

    #[test]
    fn oversized_values_are_rejected() {
        let mut store = AliasStore::new(100);
        let long_name = "n".repeat(MAX_ALIAS_NAME_LEN + 1);
        let long_cmd = "c".repeat(MAX_ALIAS_COMMAND_LEN + 1);
        assert!(matches!(store.define(&long_name, "ls"), Err(ShellError::TooLong { .. })));
        assert!(matches!(store.define("x", &long_cmd), Err(ShellError::TooLong { .. })));
        assert!(store.is_empty());
    }

    #[test]
    fn expansion_prepends_alias_words() {
        let mut store = AliasStore::new(100);
        store.define("ll", "ls -l").unwrap();
        assert_eq!(store.expand(args("ll -a")), args("ls -l -a"));
        assert_eq!(store.expand(args("echo ll")), args("echo ll"));
    }

    #[test]
    fn expansion_is_single_level() {
        let mut store = AliasStore::new(100);
        store.define("a", "b one").unwrap();
        store.define("b", "echo two").unwrap();
        store.define("loop", "loop again").unwrap();
        assert_eq!(store.expand(args("a")), args("b one"));
        assert_eq!(store.expand(args("loop x")), args("loop again x"));
    }
}
