use crate::command::{CommandFactory, ExecutableCommand, ExitCode};
use crate::env::Environment;
use crate::error::ShellError;
use crate::interpreter::Factory;
use crate::lexer::CommandLine;
use crate::signals::{self, ChildStatusBlock, ForegroundGuard};
use anyhow::Result;
use nix::fcntl::{OFlag, open};
use nix::sys::stat::Mode;
use nix::unistd::{ForkResult, Pid, close, dup2, fork};
use std::ffi::{CString, OsStr, OsString};
use std::io::Write;
use std::os::unix::ffi::OsStrExt;
use std::os::unix::io::RawFd;
use std::path::PathBuf;

/// Where a command's standard streams should point.
///
/// Each kind is configured at most once; a repeated operator replaces the
/// earlier target.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Redirections {
    /// `< file`
    pub input: Option<String>,
    /// `> file` or `>> file`
    pub output: Option<String>,
    /// Whether `output` came from `>>`.
    pub append: bool,
    /// `2> file`
    pub error: Option<String>,
}

impl Redirections {
    /// Split redirection operators (and their file names) out of `tokens`.
    ///
    /// Operators are only recognized as standalone words. Returns the
    /// redirections and the argument vector that is left for the program.
    pub fn extract(tokens: &[String]) -> Result<(Self, Vec<String>), ShellError> {
        let mut redirections = Self::default();
        let mut argv = Vec::with_capacity(tokens.len());

        let mut iter = tokens.iter();
        while let Some(token) = iter.next() {
            let op = token.as_str();
            if !matches!(op, "<" | ">" | ">>" | "2>") {
                argv.push(token.clone());
                continue;
            }
            let file = iter
                .next()
                .ok_or_else(|| ShellError::Usage(format!("{} file", op)))?
                .clone();
            match op {
                "<" => redirections.input = Some(file),
                ">" | ">>" => {
                    redirections.output = Some(file);
                    redirections.append = op == ">>";
                }
                _ => redirections.error = Some(file),
            }
        }

        Ok((redirections, argv))
    }
}

/// Paths to try, in order, when executing `name`.
///
/// Names containing a path separator are used as they are; so are bare names
/// when there is no search path at all. Otherwise every search path entry is
/// joined with the name.
pub fn command_candidates(search_paths: Option<&OsStr>, name: &str) -> Vec<PathBuf> {
    if name.contains('/') {
        return vec![PathBuf::from(name)];
    }
    match search_paths {
        Some(paths) => std::env::split_paths(paths).map(|dir| dir.join(name)).collect(),
        None => vec![PathBuf::from(name)],
    }
}

fn c_string(bytes: &[u8]) -> Result<CString, ShellError> {
    CString::new(bytes)
        .map_err(|_| ShellError::Usage("arguments must not contain NUL bytes".into()))
}

struct PreparedRedirect {
    path: CString,
    flags: OFlag,
    target: RawFd,
    failure: Vec<u8>,
}

/// Everything the child needs, built before `fork` so that the child itself
/// only performs async-signal-safe calls.
struct LaunchPlan {
    // Owns the strings behind `argv_ptrs`.
    #[allow(dead_code)]
    argv: Vec<CString>,
    argv_ptrs: Vec<*const libc::c_char>,
    candidates: Vec<CString>,
    redirects: Vec<PreparedRedirect>,
    not_found: Vec<u8>,
}

impl LaunchPlan {
    fn new(
        argv: &[String],
        candidates: &[PathBuf],
        redirections: &Redirections,
    ) -> Result<Self, ShellError> {
        let argv = argv
            .iter()
            .map(|arg| c_string(arg.as_bytes()))
            .collect::<Result<Vec<_>, _>>()?;
        let mut argv_ptrs: Vec<*const libc::c_char> =
            argv.iter().map(|arg| arg.as_ptr()).collect();
        argv_ptrs.push(std::ptr::null());

        let candidates = candidates
            .iter()
            .map(|path| c_string(path.as_os_str().as_bytes()))
            .collect::<Result<Vec<_>, _>>()?;

        let write_flags = OFlag::O_WRONLY | OFlag::O_CREAT;
        let output_flags = if redirections.append {
            write_flags | OFlag::O_APPEND
        } else {
            write_flags | OFlag::O_TRUNC
        };
        let wanted = [
            (&redirections.input, OFlag::O_RDONLY, libc::STDIN_FILENO),
            (&redirections.output, output_flags, libc::STDOUT_FILENO),
            (&redirections.error, write_flags | OFlag::O_TRUNC, libc::STDERR_FILENO),
        ];
        let mut redirects = Vec::new();
        for (file, flags, target) in wanted {
            if let Some(file) = file {
                redirects.push(PreparedRedirect {
                    path: c_string(file.as_bytes())?,
                    flags,
                    target,
                    failure: format!("jobshell: {}: ", file).into_bytes(),
                });
            }
        }

        let not_found = match argv.first() {
            Some(name) => format!(
                "jobshell: {}\n",
                ShellError::NotExecutable(name.to_string_lossy().into_owned())
            ),
            None => String::new(),
        };

        Ok(Self {
            argv,
            argv_ptrs,
            candidates,
            redirects,
            not_found: not_found.into_bytes(),
        })
    }

    fn spawn(&self) -> Result<Pid, ShellError> {
        // SAFETY: the child branch only calls async-signal-safe functions on
        // data prepared before the fork, then execs or exits.
        match unsafe { fork() } {
            Ok(ForkResult::Parent { child }) => Ok(child),
            Ok(ForkResult::Child) => self.exec_child(),
            Err(e) => Err(ShellError::resource("fork", e)),
        }
    }

    fn exec_child(&self) -> ! {
        for redirect in &self.redirects {
            let mode = Mode::from_bits_truncate(0o644);
            let fd = match open(redirect.path.as_c_str(), redirect.flags, mode) {
                Ok(fd) => fd,
                Err(e) => child_fail(&redirect.failure, e),
            };
            if fd != redirect.target {
                if let Err(e) = dup2(fd, redirect.target) {
                    child_fail(&redirect.failure, e);
                }
                let _ = close(fd);
            }
        }

        signals::reset_in_child();

        for candidate in &self.candidates {
            // SAFETY: both pointers reference NUL-terminated strings owned by
            // `self`, and `argv_ptrs` ends with a null pointer.
            unsafe { libc::execv(candidate.as_ptr(), self.argv_ptrs.as_ptr()) };
        }

        write_stderr(&self.not_found);
        // SAFETY: `_exit` skips atexit handlers and buffered stdio of the parent image.
        unsafe { libc::_exit(127) }
    }
}

fn write_stderr(bytes: &[u8]) {
    // SAFETY: `bytes` is a valid buffer for its whole length.
    unsafe { libc::write(libc::STDERR_FILENO, bytes.as_ptr().cast(), bytes.len()) };
}

fn child_fail(prefix: &[u8], err: nix::Error) -> ! {
    write_stderr(prefix);
    write_stderr(err.desc().as_bytes());
    write_stderr(b"\n");
    // SAFETY: see `LaunchPlan::exec_child`.
    unsafe { libc::_exit(1) }
}

/// Command that is not a builtin: a program launched in a child process.
pub struct ExternalCommand {
    tokens: Vec<String>,
    background: bool,
    search_paths: Option<OsString>,
}

impl ExternalCommand {
    pub fn new(tokens: Vec<String>, background: bool, search_paths: Option<OsString>) -> Self {
        Self {
            tokens,
            background,
            search_paths,
        }
    }
}

impl CommandFactory for Factory<ExternalCommand> {
    fn try_create(
        &self,
        env: &Environment,
        line: &CommandLine,
    ) -> Option<Box<dyn ExecutableCommand>> {
        Some(Box::new(ExternalCommand::new(
            line.argv.clone(),
            line.background,
            env.get_var("PATH").map(OsString::from),
        )))
    }
}

impl ExecutableCommand for ExternalCommand {
    fn execute(
        self: Box<Self>,
        stdout: &mut dyn Write,
        stderr: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<ExitCode> {
        let (redirections, argv) = Redirections::extract(&self.tokens)?;
        let Some(name) = argv.first() else {
            return Ok(0);
        };
        let candidates = command_candidates(self.search_paths.as_deref(), name);
        let plan = LaunchPlan::new(&argv, &candidates, &redirections)?;

        let block = ChildStatusBlock::new()?;
        let pid = plan.spawn()?;
        tracing::debug!(%pid, program = %name, background = self.background, "spawned");

        if self.background {
            let registered = env.jobs.add(pid);
            drop(block);
            return match registered {
                Ok(()) => {
                    writeln!(stdout, "jobshell: background process started with PID: {}", pid)?;
                    Ok(0)
                }
                Err(e) => {
                    writeln!(stderr, "jobshell: {}, PID {} keeps running untracked", e, pid)?;
                    Ok(1)
                }
            };
        }

        // Published before unblocking so the child-status handler never
        // collects the child this thread is about to wait on.
        let _foreground = ForegroundGuard::new(pid);
        drop(block);
        Ok(signals::wait_published(pid)?)
    }
}
