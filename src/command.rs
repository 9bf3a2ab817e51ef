use crate::env::Environment;
use crate::lexer::CommandLine;
use anyhow::Result;
use std::io::Write;

/// Conventional process exit code type used by this crate.
///
/// A value of 0 indicates success; any non-zero value indicates failure.
/// Children killed by a signal are reported as 128 + signal number.
pub type ExitCode = i32;

/// Object-safe trait for any command that can be dispatched by the shell.
///
/// Builtins get this through a blanket impl; external programs implement it
/// by forking a child.
pub trait ExecutableCommand {
    /// Executes the command.
    ///
    /// `stdout` and `stderr` are where the interpreter itself reports; spawned
    /// programs write to the process's real descriptors.
    fn execute(
        self: Box<Self>,
        stdout: &mut dyn Write,
        stderr: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<ExitCode>;
}

/// Factory that tries to create a command from a parsed, alias-expanded line.
///
/// Returns `None` when the factory doesn't recognize the command name.
pub trait CommandFactory {
    fn try_create(&self, env: &Environment, line: &CommandLine)
    -> Option<Box<dyn ExecutableCommand>>;
}
