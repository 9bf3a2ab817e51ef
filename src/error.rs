use thiserror::Error;

/// Everything that can go wrong while dispatching a single command line.
///
/// None of these are fatal to the interpreter: the offending command is
/// abandoned, a message is printed, and the loop goes on.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ShellError {
    /// A builtin (or a redirection) was invoked with malformed arguments.
    #[error("usage: {0}")]
    Usage(String),

    /// `unalias` or `fg` referenced something that does not exist.
    #[error("{0}")]
    NotFound(String),

    /// The alias table or the job table has no free slot left.
    #[error("{0} table full")]
    TableFull(&'static str),

    /// `exit` was requested while background jobs are still running.
    #[error("cannot exit, background processes are still running")]
    Busy,

    /// Process creation, waiting, or file setup failed.
    #[error("{context}: {reason}")]
    Resource { context: String, reason: String },

    /// No search path entry yields an executable program.
    #[error("command not found: {0}")]
    NotExecutable(String),

    /// A bounded string (alias name or alias text) exceeds its limit.
    #[error("{what} too long (max {max} bytes)")]
    TooLong { what: &'static str, max: usize },

    /// The input line exceeds the configured maximum; it is not executed.
    #[error("input line too long ({len} bytes, max {max}), ignored")]
    LineTooLong { len: usize, max: usize },
}

impl ShellError {
    pub(crate) fn resource(context: impl Into<String>, err: nix::Error) -> Self {
        ShellError::Resource {
            context: context.into(),
            reason: err.desc().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_are_human_readable() {
        assert_eq!(ShellError::TableFull("job").to_string(), "job table full");
        assert_eq!(
            ShellError::NotExecutable("frob".into()).to_string(),
            "command not found: frob"
        );
        assert_eq!(
            ShellError::resource("fork", nix::Error::EAGAIN).to_string(),
            format!("fork: {}", nix::Error::EAGAIN.desc())
        );
    }
}
