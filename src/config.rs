/// Maximum length of an alias name, in bytes.
pub const MAX_ALIAS_NAME_LEN: usize = 63;

/// Maximum length of the text an alias expands to, in bytes.
pub const MAX_ALIAS_COMMAND_LEN: usize = 255;

/// Tunables of an interpreter instance.
///
/// The binary fills this in from its command line flags; tests usually start
/// from [`ShellConfig::default`] and shrink the capacities.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellConfig {
    /// Text written before every read.
    pub prompt: String,
    /// Longest accepted input line in bytes. Longer lines are rejected.
    pub max_line: usize,
    /// Number of alias slots.
    pub alias_capacity: usize,
    /// Number of background job slots.
    pub job_capacity: usize,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            prompt: "jobshell: ".to_string(),
            max_line: 128,
            alias_capacity: 100,
            job_capacity: 100,
        }
    }
}
