//! A small interactive shell with aliases and background jobs.
//!
//! Every input line is split into words, its first word is expanded if it
//! names an alias, and the result is either handled by one of the builtins
//! (`alias`, `unalias`, `fg`, `exit`) or launched as an external program found
//! through `PATH`. Programs run in the foreground unless the line ends with
//! `&`; simple `<`, `>`, `>>` and `2>` redirections are supported.
//!
//! The main entry point is [`Interpreter`]. The signal handlers that tie ^Z
//! and child termination to the interpreter state live in [`signals`] and must
//! be installed once by the embedding program.

pub mod alias;
mod builtin;
pub mod command;
pub mod config;
pub mod env;
pub mod error;
pub mod external;
mod interpreter;
pub mod jobs;
pub mod lexer;
pub mod signals;

/// Just a convenient re-export of the interactive command runner.
///
/// See [`Interpreter`] for the high-level API and examples.
pub use interpreter::Interpreter;

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::{Mutex, MutexGuard, OnceLock};

    /// Serializes tests that spawn or wait on children, since the foreground
    /// slot is process-wide and the child sweep collects any zombie.
    pub(crate) fn serial() -> MutexGuard<'static, ()> {
        static MUTEX: OnceLock<Mutex<()>> = OnceLock::new();
        MUTEX
            .get_or_init(|| Mutex::new(()))
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
