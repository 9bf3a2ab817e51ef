//! Bridge between asynchronous signals and interpreter state.
//!
//! - `SIGTSTP` (^Z) terminates the current foreground child. Suspending jobs
//!   is not supported, so a stop request is turned into a kill.
//! - `SIGCHLD` reaps every terminated child except the one a foreground wait
//!   is responsible for, freeing its [`JobRegistry`] slot if it had one.
//! - `SIGINT` is ignored by the interpreter itself.
//!
//! Handlers only touch atomics and issue async-signal-safe syscalls.

use crate::command::ExitCode;
use crate::error::ShellError;
use crate::jobs::JobRegistry;
use nix::errno::Errno;
use nix::sys::signal::{
    self, SaFlags, SigAction, SigHandler, SigSet, Signal, kill, sigaction,
};
use nix::sys::wait::{Id, WaitPidFlag, WaitStatus, waitid, waitpid};
use nix::unistd::Pid;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::{Arc, OnceLock};

/// Pid of the child the interpreter is currently blocked on; 0 when none.
static FOREGROUND: AtomicI32 = AtomicI32::new(0);

static REGISTRY: OnceLock<Arc<JobRegistry>> = OnceLock::new();

extern "C" fn on_stop(_signal: libc::c_int) {
    let raw = FOREGROUND.load(Ordering::Acquire);
    if raw > 0 {
        let pid = Pid::from_raw(raw);
        let _ = kill(pid, Signal::SIGTERM);
        // The terminal may have stopped the child already; wake it so the
        // pending SIGTERM is delivered.
        let _ = kill(pid, Signal::SIGCONT);
    }
}

extern "C" fn on_child(_signal: libc::c_int) {
    if let Some(jobs) = REGISTRY.get() {
        reap_children(jobs);
    }
}

/// Collect every terminated child that nobody is waiting on.
///
/// Tracked jobs are reaped first. The remaining zombies are peeked at with
/// `WNOWAIT` and only collected when they are neither the published
/// foreground child nor a job claimed by `fg`; the sweep stops at the first
/// such child and its waiter runs the sweep again once it is done.
///
/// Async-signal-safe: no allocation, no locks, no logging.
pub(crate) fn reap_children(jobs: &JobRegistry) {
    jobs.reap_finished();

    let peek = WaitPidFlag::WEXITED | WaitPidFlag::WNOHANG | WaitPidFlag::WNOWAIT;
    while let Ok(status) = waitid(Id::All, peek) {
        let Some(pid) = status.pid() else {
            break;
        };
        if FOREGROUND.load(Ordering::Acquire) == pid.as_raw() || jobs.is_claimed(pid) {
            break;
        }
        match waitpid(pid, Some(WaitPidFlag::WNOHANG)) {
            Ok(WaitStatus::Exited(..) | WaitStatus::Signaled(..)) => jobs.remove(pid),
            _ => break,
        }
    }
}

/// Install the interpreter's signal dispositions.
///
/// `jobs` becomes the registry the child-status handler reaps into. The
/// handlers are process-wide, so only one registry can be installed; calling
/// this again with the same registry is a no-op for the registry slot, and
/// a different one is rejected.
pub fn install(jobs: Arc<JobRegistry>) -> Result<(), ShellError> {
    let installed = REGISTRY.get_or_init(|| Arc::clone(&jobs));
    if !Arc::ptr_eq(installed, &jobs) {
        return Err(ShellError::Resource {
            context: "signal handlers".into(),
            reason: "already installed for another job registry".into(),
        });
    }

    let stop = SigAction::new(
        SigHandler::Handler(on_stop),
        SaFlags::SA_RESTART,
        SigSet::empty(),
    );
    let child = SigAction::new(
        SigHandler::Handler(on_child),
        SaFlags::SA_RESTART | SaFlags::SA_NOCLDSTOP,
        SigSet::empty(),
    );
    // SAFETY: both handlers only perform atomic loads/stores and
    // async-signal-safe syscalls.
    unsafe {
        sigaction(Signal::SIGTSTP, &stop).map_err(|e| ShellError::resource("sigaction", e))?;
        sigaction(Signal::SIGCHLD, &child).map_err(|e| ShellError::resource("sigaction", e))?;
        signal::signal(Signal::SIGINT, SigHandler::SigIgn)
            .map_err(|e| ShellError::resource("signal", e))?;
    }
    tracing::debug!("signal handlers installed");
    Ok(())
}

/// Restore default dispositions in a freshly forked child.
///
/// Must stay async-signal-safe: it runs between `fork` and `exec`.
pub(crate) fn reset_in_child() {
    // SAFETY: installing SIG_DFL is always sound.
    unsafe {
        let _ = signal::signal(Signal::SIGINT, SigHandler::SigDfl);
        let _ = signal::signal(Signal::SIGTSTP, SigHandler::SigDfl);
        let _ = signal::signal(Signal::SIGCHLD, SigHandler::SigDfl);
    }
    let _ = child_status_set().thread_unblock();
}

fn child_status_set() -> SigSet {
    let mut set = SigSet::empty();
    set.add(Signal::SIGCHLD);
    set
}

/// Blocks `SIGCHLD` on the current thread until dropped.
///
/// Held across fork and job registration so a child that exits immediately
/// cannot be reaped before its pid is in the registry.
pub(crate) struct ChildStatusBlock(());

impl ChildStatusBlock {
    pub(crate) fn new() -> Result<Self, ShellError> {
        child_status_set()
            .thread_block()
            .map_err(|e| ShellError::resource("sigprocmask", e))?;
        Ok(Self(()))
    }
}

impl Drop for ChildStatusBlock {
    fn drop(&mut self) {
        let _ = child_status_set().thread_unblock();
    }
}

/// Publishes a pid in the foreground slot for as long as it lives.
pub struct ForegroundGuard(());

impl ForegroundGuard {
    pub fn new(pid: Pid) -> Self {
        FOREGROUND.store(pid.as_raw(), Ordering::Release);
        Self(())
    }
}

impl Drop for ForegroundGuard {
    fn drop(&mut self) {
        FOREGROUND.store(0, Ordering::Release);
    }
}

/// Current content of the foreground slot.
pub fn foreground() -> Option<Pid> {
    match FOREGROUND.load(Ordering::Acquire) {
        0 => None,
        raw => Some(Pid::from_raw(raw)),
    }
}

/// Block until `pid` terminates, with `pid` published as the foreground child.
pub fn wait_foreground(pid: Pid) -> Result<ExitCode, ShellError> {
    let _guard = ForegroundGuard::new(pid);
    wait_published(pid)
}

/// Like [`wait_foreground`], for a caller that already holds a
/// [`ForegroundGuard`] for `pid`.
pub(crate) fn wait_published(pid: Pid) -> Result<ExitCode, ShellError> {
    let code = loop {
        match waitpid(pid, None) {
            Ok(status @ (WaitStatus::Exited(..) | WaitStatus::Signaled(..))) => {
                tracing::debug!(%pid, ?status, "foreground child finished");
                break exit_code_of(status);
            }
            Ok(_) | Err(Errno::EINTR) => continue,
            Err(e) => return Err(ShellError::resource("waitpid", e)),
        }
    };
    // The child-status handler stops at the foreground child; pick up
    // whatever it left behind.
    if let Some(jobs) = REGISTRY.get() {
        reap_children(jobs);
    }
    Ok(code)
}

/// Shell-style exit code: the exit status, or 128 + signal number.
pub fn exit_code_of(status: WaitStatus) -> ExitCode {
    match status {
        WaitStatus::Exited(_, code) => code,
        WaitStatus::Signaled(_, signal, _) => 128 + signal as i32,
        _ => -1,
    }
}
