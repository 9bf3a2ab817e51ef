//! Registry of background jobs.
//!
//! The table is shared between the interpreter thread and the child-status
//! signal handler, so every slot is an atomic pid and every mutation is a
//! single compare-and-swap. Nothing here allocates after construction, which
//! keeps [`JobRegistry::reap_finished`] usable from inside a signal handler.
//!
//! Slot encoding: `0` is free, a positive value is a running background pid,
//! and a negative value `-pid` marks a job that `fg` is currently waiting on.
//! Claimed jobs are skipped by the reaper so only their waiter collects them.

use crate::error::ShellError;
use nix::errno::Errno;
use nix::sys::wait::{WaitPidFlag, WaitStatus, waitpid};
use nix::unistd::Pid;
use std::sync::atomic::{AtomicI32, Ordering};

const FREE: i32 = 0;

pub struct JobRegistry {
    slots: Box<[AtomicI32]>,
}

impl JobRegistry {
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: (0..capacity).map(|_| AtomicI32::new(FREE)).collect(),
        }
    }

    /// Track `pid` in the first free slot.
    ///
    /// A full table is reported to the caller; the process itself keeps
    /// running untracked.
    pub fn add(&self, pid: Pid) -> Result<(), ShellError> {
        let raw = pid.as_raw();
        for slot in self.slots.iter() {
            if slot
                .compare_exchange(FREE, raw, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                return Ok(());
            }
        }
        Err(ShellError::TableFull("job"))
    }

    /// Forget `pid`, whether running or claimed. Absent pids are ignored.
    pub fn remove(&self, pid: Pid) {
        let raw = pid.as_raw();
        for slot in self.slots.iter() {
            let current = slot.load(Ordering::Acquire);
            if (current == raw || current == -raw)
                && slot
                    .compare_exchange(current, FREE, Ordering::AcqRel, Ordering::Acquire)
                    .is_ok()
            {
                return;
            }
        }
    }

    /// True while at least one job occupies a slot.
    pub fn has_active(&self) -> bool {
        self.slots
            .iter()
            .any(|slot| slot.load(Ordering::Acquire) != FREE)
    }

    /// True when `pid` is a running background job.
    ///
    /// This is the plain lookup. `fg` goes through [`JobRegistry::claim`]
    /// instead, which checks membership and takes the job in one step.
    pub fn contains(&self, pid: Pid) -> bool {
        let raw = pid.as_raw();
        self.slots
            .iter()
            .any(|slot| slot.load(Ordering::Acquire) == raw)
    }

    /// Mark a running job as being waited on in the foreground.
    ///
    /// Returns `false` when `pid` is not a running background job.
    pub fn claim(&self, pid: Pid) -> bool {
        let raw = pid.as_raw();
        self.slots.iter().any(|slot| {
            slot.compare_exchange(raw, -raw, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
        })
    }

    /// True when `pid` is a job that `fg` is currently waiting on.
    pub fn is_claimed(&self, pid: Pid) -> bool {
        let raw = pid.as_raw();
        self.slots
            .iter()
            .any(|slot| slot.load(Ordering::Acquire) == -raw)
    }

    /// Pids of all tracked jobs, claimed ones included, in slot order.
    pub fn pids(&self) -> Vec<Pid> {
        self.slots
            .iter()
            .map(|slot| slot.load(Ordering::Acquire))
            .filter(|&raw| raw != FREE)
            .map(|raw| Pid::from_raw(raw.abs()))
            .collect()
    }

    /// Collect every running job that has terminated and free its slot.
    ///
    /// Never blocks and never allocates. Called from the child-status signal
    /// handler and, in tests, directly.
    pub fn reap_finished(&self) {
        for slot in self.slots.iter() {
            let raw = slot.load(Ordering::Acquire);
            if raw <= FREE {
                continue;
            }
            let finished = match waitpid(Pid::from_raw(raw), Some(WaitPidFlag::WNOHANG)) {
                Ok(WaitStatus::StillAlive) => false,
                Ok(_) => true,
                Err(Errno::ECHILD) => true,
                Err(_) => false,
            };
            if finished {
                let _ = slot.compare_exchange(raw, FREE, Ordering::AcqRel, Ordering::Acquire);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::serial;
    use std::process::Command;
    use std::thread;
    use std::time::{Duration, Instant};

    fn fake(pid: i32) -> Pid {
        Pid::from_raw(pid)
    }

    #[test]
    fn add_remove_and_membership() {
        let jobs = JobRegistry::new(4);
        assert!(!jobs.has_active());

        jobs.add(fake(1001)).unwrap();
        jobs.add(fake(1002)).unwrap();
        assert!(jobs.has_active());
        assert!(jobs.contains(fake(1001)));
        assert_eq!(jobs.pids(), vec![fake(1001), fake(1002)]);

        jobs.remove(fake(1001));
        assert!(!jobs.contains(fake(1001)));
        jobs.remove(fake(4242));
        assert_eq!(jobs.pids(), vec![fake(1002)]);

        jobs.remove(fake(1002));
        assert!(!jobs.has_active());
    }

    #[test]
    fn full_table_is_reported() {
        let jobs = JobRegistry::new(2);
        jobs.add(fake(1)).unwrap();
        jobs.add(fake(2)).unwrap();
        assert_eq!(jobs.add(fake(3)), Err(ShellError::TableFull("job")));
        assert!(!jobs.contains(fake(3)));

        jobs.remove(fake(1));
        jobs.add(fake(3)).unwrap();
        assert!(jobs.contains(fake(3)));
    }

    #[test]
    fn claimed_jobs_stay_active_but_are_not_claimable_twice() {
        let jobs = JobRegistry::new(2);
        jobs.add(fake(77)).unwrap();
        assert!(jobs.claim(fake(77)));
        assert!(!jobs.claim(fake(77)));
        assert!(!jobs.contains(fake(77)));
        assert!(jobs.is_claimed(fake(77)));
        assert!(jobs.has_active());

        jobs.remove(fake(77));
        assert!(!jobs.has_active());
        assert!(!jobs.claim(fake(78)));
    }

    #[test]
    fn finished_child_is_reaped() {
        let _lock = serial();
        let jobs = JobRegistry::new(4);
        let child = Command::new("true").spawn().expect("spawn true");
        let pid = Pid::from_raw(child.id() as i32);
        jobs.add(pid).unwrap();

        let deadline = Instant::now() + Duration::from_secs(10);
        while jobs.contains(pid) && Instant::now() < deadline {
            jobs.reap_finished();
            thread::sleep(Duration::from_millis(10));
        }
        assert!(!jobs.has_active());
    }

    #[test]
    fn claimed_job_is_left_to_its_waiter() {
        let _lock = serial();
        let jobs = JobRegistry::new(4);
        let child = Command::new("true").spawn().expect("spawn true");
        let pid = Pid::from_raw(child.id() as i32);
        jobs.add(pid).unwrap();
        assert!(jobs.claim(pid));

        jobs.reap_finished();
        assert!(jobs.has_active());
        assert!(matches!(
            waitpid(pid, None),
            Ok(WaitStatus::Exited(p, 0)) if p == pid
        ));
        jobs.remove(pid);
        assert!(!jobs.has_active());
    }
}
