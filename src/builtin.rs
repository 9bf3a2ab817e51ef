use crate::alias::AliasDefinition;
use crate::command::{CommandFactory, ExecutableCommand, ExitCode};
use crate::env::Environment;
use crate::error::ShellError;
use crate::interpreter::Factory;
use crate::lexer::CommandLine;
use crate::signals;
use anyhow::Result;
use argh::{EarlyExit, FromArgs};
use nix::unistd::Pid;
use regex::Regex;
use std::io::Write;
use std::sync::LazyLock;

/// Built-in commands known to the shell at compile time.
///
/// Builtins are parsed using the [`argh`] crate (`FromArgs`) and executed
/// directly in the interpreter, never in a child process.
pub(crate) trait BuiltinCommand: Sized + FromArgs {
    /// Canonical name of the command, e.g. "alias" or "fg".
    fn name() -> &'static str;

    /// Executes the command against the interpreter state.
    ///
    /// Errors are printed by the caller and turned into exit status 1.
    fn execute(self, stdout: &mut dyn Write, env: &mut Environment) -> Result<ExitCode>;
}

impl<T: BuiltinCommand> ExecutableCommand for T {
    fn execute(
        self: Box<Self>,
        stdout: &mut dyn Write,
        stderr: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<ExitCode> {
        match T::execute(*self, stdout, env) {
            Ok(x) => Ok(x),
            Err(e) => {
                writeln!(stderr, "jobshell: {}", e)?;
                Ok(1)
            }
        }
    }
}

struct InvalidArgs {
    output: String,
    is_error: bool,
}

impl ExecutableCommand for InvalidArgs {
    fn execute(
        self: Box<Self>,
        stdout: &mut dyn Write,
        stderr: &mut dyn Write,
        _env: &mut Environment,
    ) -> Result<ExitCode> {
        if self.is_error {
            writeln!(stderr, "{}", self.output.trim_end())?;
            Ok(1)
        } else {
            writeln!(stdout, "{}", self.output.trim_end())?;
            Ok(0)
        }
    }
}

impl<T: BuiltinCommand + 'static> CommandFactory for Factory<T> {
    fn try_create(
        &self,
        _env: &Environment,
        line: &CommandLine,
    ) -> Option<Box<dyn ExecutableCommand>> {
        let (name, args) = line.argv.split_first()?;
        if name != T::name() {
            return None;
        }
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        Some(match T::from_args(&[name.as_str()], &args) {
            Ok(cmd) => Box::new(cmd),
            Err(EarlyExit { output, status }) => Box::new(InvalidArgs {
                output,
                is_error: status.is_err(),
            }),
        })
    }
}

#[derive(FromArgs)]
/// Define or list command aliases.
/// Forms: `alias name word...`, `alias "phrase" name`, `alias`, `alias -l`.
pub struct Alias {
    #[argh(switch, short = 'l')]
    /// list every alias as `name "command"`.
    pub list: bool,

    #[argh(positional, greedy)]
    /// the alias definition; the name first, or a quoted phrase followed by the name.
    pub words: Vec<String>,
}

impl BuiltinCommand for Alias {
    fn name() -> &'static str {
        "alias"
    }

    fn execute(self, stdout: &mut dyn Write, env: &mut Environment) -> Result<ExitCode> {
        if self.words.is_empty() {
            env.aliases.write_listing(stdout)?;
            return Ok(0);
        }
        if self.list {
            return Err(ShellError::Usage("alias -l".to_string()).into());
        }
        let def = AliasDefinition::parse(&self.words)?;
        env.aliases.define(&def.name, &def.command)?;
        tracing::debug!(name = %def.name, command = %def.command, "alias defined");
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Remove an alias.
pub struct Unalias {
    #[argh(positional)]
    /// name of the alias to remove.
    pub name: Option<String>,
}

impl BuiltinCommand for Unalias {
    fn name() -> &'static str {
        "unalias"
    }

    fn execute(self, _stdout: &mut dyn Write, env: &mut Environment) -> Result<ExitCode> {
        let name = self
            .name
            .ok_or_else(|| ShellError::Usage("unalias name".to_string()))?;
        env.aliases.remove(&name)?;
        Ok(0)
    }
}

static JOB_SPEC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^%([0-9]+)$").expect("job spec pattern is valid"));

/// Parse a `%<pid>` job reference.
fn parse_job_spec(spec: &str) -> Result<Pid, ShellError> {
    let usage = || ShellError::Usage("fg %pid".to_string());
    let digits = JOB_SPEC
        .captures(spec)
        .and_then(|caps| caps.get(1))
        .ok_or_else(usage)?;
    match digits.as_str().parse::<i32>() {
        Ok(raw) if raw > 0 => Ok(Pid::from_raw(raw)),
        _ => Err(usage()),
    }
}

#[derive(FromArgs)]
/// Wait in the foreground for a running background job.
pub struct Fg {
    #[argh(positional)]
    /// the job as `%pid`.
    pub job: Option<String>,
}

impl BuiltinCommand for Fg {
    fn name() -> &'static str {
        "fg"
    }

    fn execute(self, _stdout: &mut dyn Write, env: &mut Environment) -> Result<ExitCode> {
        let spec = self
            .job
            .ok_or_else(|| ShellError::Usage("fg %pid".to_string()))?;
        let pid = parse_job_spec(&spec)?;
        if !env.jobs.claim(pid) {
            return Err(ShellError::NotFound(format!("no such background job: {}", pid)).into());
        }

        tracing::debug!(%pid, "bringing job to foreground");
        let status = signals::wait_foreground(pid);
        env.jobs.remove(pid);
        Ok(status?)
    }
}

#[derive(FromArgs)]
/// Exit the shell once no background job is left.
pub struct Exit {
    #[argh(positional, greedy)]
    /// ignored.
    pub _args: Vec<String>,
}

impl BuiltinCommand for Exit {
    fn name() -> &'static str {
        "exit"
    }

    fn execute(self, _stdout: &mut dyn Write, env: &mut Environment) -> Result<ExitCode> {
        env.jobs.reap_finished();
        if env.jobs.has_active() {
            return Err(ShellError::Busy.into());
        }
        env.should_exit = true;
        Ok(0)
    }
}
