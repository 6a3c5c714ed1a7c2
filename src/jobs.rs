//! Bookkeeping for detached (`&`) children.

use crate::error::{Result, ShellError};
use crate::external::SearchPath;
use crate::parser::Command;
use crate::pipeline::spawn_pipeline;
use nix::errno::Errno;
use nix::sys::wait::{WaitPidFlag, WaitStatus, waitpid};
use nix::unistd::Pid;
use std::collections::BTreeSet;
use std::io::{self, Write};
use std::path::Path;

/// Outcome of launching a segment in the background.
#[derive(Debug)]
pub struct Detached {
    /// Children now tracked as live jobs, one per spawned stage.
    pub pids: Vec<Pid>,
    /// Stages that could not be started.
    pub errors: Vec<ShellError>,
}

/// Set of background children that have not been reaped yet.
///
/// Only the control thread touches it: jobs are added on launch and removed
/// when a non-blocking wait observes their termination.
#[derive(Debug, Default)]
pub struct JobTracker {
    live: BTreeSet<Pid>,
}

impl JobTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn a pipeline and return without waiting for it.
    ///
    /// Every spawned stage becomes a live job. Per-stage failures are handed
    /// back for the caller to report; malformed redirections and pipe failures
    /// are returned as an error before anything starts.
    pub fn launch_detached(
        &mut self,
        stages: &[Command],
        search_path: &SearchPath,
        cwd: &Path,
    ) -> Result<Detached> {
        let mut spawned = spawn_pipeline(stages, search_path, cwd)?;
        let errors = std::mem::take(&mut spawned.errors);
        let pids = spawned.detach();
        for &pid in &pids {
            tracing::debug!(pid = pid.as_raw(), "background job started");
            self.track(pid);
        }
        Ok(Detached { pids, errors })
    }

    /// Start tracking `pid`. Returns `false` if it was already tracked.
    pub fn track(&mut self, pid: Pid) -> bool {
        self.live.insert(pid)
    }

    pub fn contains(&self, pid: Pid) -> bool {
        self.live.contains(&pid)
    }

    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    pub fn pids(&self) -> impl Iterator<Item = Pid> + '_ {
        self.live.iter().copied()
    }

    /// Collect every tracked child that has terminated, without blocking.
    ///
    /// Terminated jobs are removed, so each one is returned exactly once. Jobs
    /// that are still running (or merely stopped) stay tracked.
    pub fn reap_all_nonblocking(&mut self) -> Vec<Pid> {
        let mut done = Vec::new();
        for &pid in &self.live {
            match waitpid(pid, Some(WaitPidFlag::WNOHANG)) {
                Ok(WaitStatus::Exited(..)) | Ok(WaitStatus::Signaled(..)) => done.push(pid),
                Ok(_) => {}
                Err(Errno::ECHILD) => {
                    tracing::warn!(pid = pid.as_raw(), "background job vanished");
                    done.push(pid);
                }
                Err(e) => tracing::warn!(pid = pid.as_raw(), error = %e, "cannot poll background job"),
            }
        }
        for pid in &done {
            self.live.remove(pid);
            tracing::debug!(pid = pid.as_raw(), "background job reaped");
        }
        done
    }

    /// Reap and print a termination notice for every finished job.
    pub fn report_terminated(&mut self, out: &mut dyn Write) -> io::Result<Vec<Pid>> {
        let done = self.reap_all_nonblocking();
        for pid in &done {
            writeln!(out, "[Background process {} terminated]", pid)?;
        }
        out.flush()?;
        Ok(done)
    }
}
