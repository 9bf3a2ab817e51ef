use crate::command::{CommandFactory, ExitCode};
use crate::config::ShellConfig;
use crate::env::Environment;
use crate::lexer::{self, CommandLine};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::io::Write;

/// Factory allows creating instances of ExecutableCommand.
///
/// Only supports commands defined in this crate: the builtins and ExternalCommand.
pub(crate) struct Factory<T> {
    _phantom: std::marker::PhantomData<T>,
}

impl<T> Default for Factory<T> {
    fn default() -> Self {
        Self {
            _phantom: std::marker::PhantomData,
        }
    }
}

/// An interactive interpreter with builtins, aliases and background jobs.
///
/// Each line goes through tokenization, alias expansion and then the first
/// [`CommandFactory`] that recognizes it. See [`Interpreter::with_config`] for
/// the factories included out of the box.
///
/// Example
/// ```
/// use jobshell::Interpreter;
/// let mut sh = Interpreter::default();
/// let mut out = Vec::new();
/// let code = sh.execute_line("alias ll ls -l", &mut out, &mut std::io::sink()).unwrap();
/// assert_eq!(code, 0);
/// sh.execute_line("alias", &mut out, &mut std::io::sink()).unwrap();
/// assert_eq!(String::from_utf8(out).unwrap(), "ll \"ls -l\"\n");
/// ```
pub struct Interpreter {
    config: ShellConfig,
    env: Environment,
    commands: Vec<Box<dyn CommandFactory>>,
}

impl Interpreter {
    /// Create a new interpreter with a custom set of command factories.
    pub fn new(
        config: ShellConfig,
        env: Environment,
        commands: Vec<Box<dyn CommandFactory>>,
    ) -> Self {
        Self {
            config,
            env,
            commands,
        }
    }

    /// Create an interpreter with the default set of commands:
    /// - builtins: `alias`, `unalias`, `fg`, `exit`
    /// - external command launcher
    pub fn with_config(config: ShellConfig) -> Self {
        use crate::builtin::*;
        use crate::external::ExternalCommand;
        let env = Environment::new(&config);
        Self::new(
            config,
            env,
            vec![
                Box::new(Factory::<Alias>::default()),
                Box::new(Factory::<Unalias>::default()),
                Box::new(Factory::<Fg>::default()),
                Box::new(Factory::<Exit>::default()),
                Box::new(Factory::<ExternalCommand>::default()),
            ],
        )
    }

    pub fn env(&self) -> &Environment {
        &self.env
    }

    /// Dispatch an already tokenized line, after alias expansion.
    pub fn run(
        &mut self,
        line: &CommandLine,
        stdout: &mut dyn Write,
        stderr: &mut dyn Write,
    ) -> anyhow::Result<ExitCode> {
        for factory in &self.commands {
            if let Some(cmd) = factory.try_create(&self.env, line) {
                return cmd.execute(stdout, stderr, &mut self.env);
            }
        }
        Err(anyhow::anyhow!("command not found: {}", line.argv.join(" ")))
    }

    /// Tokenize, expand and dispatch one input line.
    ///
    /// Every dispatch failure is reported on `stderr` and turned into a
    /// non-zero status; only a failing write to `stderr` itself is returned
    /// as an error.
    pub fn execute_line(
        &mut self,
        line: &str,
        stdout: &mut dyn Write,
        stderr: &mut dyn Write,
    ) -> anyhow::Result<ExitCode> {
        let mut parsed = match lexer::split_line(line, self.config.max_line) {
            Ok(parsed) => parsed,
            Err(e) => {
                writeln!(stderr, "jobshell: {}", e)?;
                return Ok(1);
            }
        };
        if parsed.is_empty() {
            return Ok(0);
        }

        parsed.argv = self.env.aliases.expand(parsed.argv);
        tracing::trace!(argv = ?parsed.argv, background = parsed.background, "dispatching");

        match self.run(&parsed, stdout, stderr) {
            Ok(code) => Ok(code),
            Err(e) => {
                writeln!(stderr, "jobshell: {}", e)?;
                Ok(1)
            }
        }
    }

    /// Read-dispatch loop over standard input.
    ///
    /// Returns when end of input is reached or `exit` succeeds; a read
    /// failure is returned as an error.
    pub fn repl(&mut self) -> anyhow::Result<()> {
        let mut rl = DefaultEditor::new()?;

        while !self.env.should_exit {
            match rl.readline(&self.config.prompt) {
                Ok(line) => {
                    let mut stdout = std::io::stdout();
                    let mut stderr = std::io::stderr();
                    let code = self.execute_line(&line, &mut stdout, &mut stderr)?;
                    tracing::debug!(code, "line finished");
                    stdout.flush()?;
                }
                Err(ReadlineError::Interrupted) => continue,
                Err(ReadlineError::Eof) => break,
                Err(err) => return Err(anyhow::anyhow!("error reading the command: {}", err)),
            }
        }

        Ok(())
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::with_config(ShellConfig::default())
    }
}
