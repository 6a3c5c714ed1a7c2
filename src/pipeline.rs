//! Spawning `|`-connected stages.
//!
//! For N stages the builder allocates exactly N-1 pipes up front, then spawns
//! one child per stage with stage i's stdout connected to stage i+1's stdin.
//! Every pipe end is created close-on-exec, so a child only ever keeps the two
//! descriptors installed as its fd 0/1; the parent drops its copy of each end as
//! soon as the owning stage has been spawned. Without that, a reader would never
//! see EOF while a stray write end stayed open somewhere.
//!
//! A single stage is the degenerate case and allocates no pipe at all.

use crate::command::ExitCode;
use crate::error::{Result, ShellError};
use crate::external::SearchPath;
use crate::parser::Command;
use crate::redirect::{Redirected, split_redirections};
use nix::errno::Errno;
use nix::fcntl::OFlag;
use nix::unistd::{Pid, pipe2};
use std::os::fd::OwnedFd;
use std::os::unix::process::CommandExt;
use std::path::Path;
use std::process::{self, Child, ExitStatus, Stdio};

/// Children of one pipeline that made it past spawning.
///
/// Stages that failed individually (missing program, unreadable redirection
/// target, failed spawn) are recorded in `errors` and have no child.
#[derive(Debug)]
pub struct Spawned {
    children: Vec<Child>,
    pub errors: Vec<ShellError>,
}

impl Spawned {
    pub fn pids(&self) -> Vec<Pid> {
        self.children
            .iter()
            .map(|c| Pid::from_raw(c.id() as i32))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Block until every child has exited.
    ///
    /// Every child is waited on even if waiting for an earlier one failed, so no
    /// zombie is left behind. Returns the exit code of the last spawned stage,
    /// or `None` when no stage was spawned.
    pub fn wait(&mut self) -> Result<Option<ExitCode>> {
        let mut last = None;
        let mut failure = None;
        for child in &mut self.children {
            match child.wait() {
                Ok(status) => {
                    let code = exit_code(status);
                    tracing::debug!(pid = child.id(), code, "child exited");
                    last = Some(code);
                }
                Err(e) => failure = Some(ShellError::Wait(e)),
            }
        }
        self.children.clear();
        match failure {
            Some(e) => Err(e),
            None => Ok(last),
        }
    }

    /// Give up ownership of the children without waiting for them.
    pub fn detach(self) -> Vec<Pid> {
        self.pids()
    }
}

/// Spawn every stage of a pipeline, connected through pipes.
///
/// Redirection syntax of every stage is checked before any pipe is created or
/// any child spawned, so malformed input never starts a program. A pipe
/// allocation failure is returned as an error before anything runs. A stage
/// whose program cannot be exec'd is skipped like an unresolved one. Only
/// running out of processes or memory stops the remaining stages; the children
/// already running are kept in the result so the caller can still wait for them.
pub fn spawn_pipeline(stages: &[Command], search_path: &SearchPath, cwd: &Path) -> Result<Spawned> {
    let stages = stages
        .iter()
        .map(|c| split_redirections(&c.argv))
        .collect::<std::result::Result<Vec<Redirected>, _>>()?;
    let n = stages.len();
    tracing::debug!(stages = n, "spawning pipeline");

    let mut readers: Vec<Option<OwnedFd>> = Vec::with_capacity(n);
    let mut writers: Vec<Option<OwnedFd>> = Vec::with_capacity(n);
    readers.push(None);
    for _ in 1..n {
        let (read, write) = pipe2(OFlag::O_CLOEXEC)?;
        readers.push(Some(read));
        writers.push(Some(write));
    }
    writers.push(None);

    let mut spawned = Spawned {
        children: Vec::with_capacity(n),
        errors: Vec::new(),
    };
    let wiring = stages.iter().zip(readers).zip(writers);
    for (i, ((stage, stdin), stdout)) in wiring.enumerate() {
        let mut cmd = match prepare_stage(stage, search_path, cwd, stdin, stdout) {
            Ok(cmd) => cmd,
            Err(e) => {
                tracing::debug!(stage = i, error = %e, "stage skipped");
                spawned.errors.push(e);
                continue;
            }
        };
        match cmd.spawn() {
            Ok(child) => {
                tracing::debug!(stage = i, pid = child.id(), program = %stage.argv[0], "spawned");
                spawned.children.push(child);
            }
            Err(source) => {
                let exhausted = is_resource_exhaustion(&source);
                tracing::debug!(stage = i, error = %source, exhausted, "spawn failed");
                spawned.errors.push(ShellError::Spawn {
                    program: cmd.get_program().into(),
                    source,
                });
                if exhausted {
                    break;
                }
            }
        }
    }
    Ok(spawned)
}

/// Whether a failed spawn means no further child can be created.
///
/// Exec-level failures (missing file, no permission, bad format) only affect
/// their own stage.
fn is_resource_exhaustion(err: &std::io::Error) -> bool {
    matches!(
        err.raw_os_error().map(Errno::from_raw),
        Some(Errno::EAGAIN | Errno::ENOMEM)
    )
}

/// Configure one stage: pipe wiring first, then redirections, then resolution.
///
/// The pipe ends are moved into the returned command and closed when it is
/// dropped, whether or not the stage ends up spawned.
fn prepare_stage(
    stage: &Redirected,
    search_path: &SearchPath,
    cwd: &Path,
    stdin: Option<OwnedFd>,
    stdout: Option<OwnedFd>,
) -> Result<process::Command> {
    let redirections = stage.redirections.open()?;
    let name = &stage.argv[0];
    let program = search_path.resolve(name)?;

    let mut cmd = process::Command::new(&program);
    cmd.arg0(name).args(&stage.argv[1..]).current_dir(cwd);
    if let Some(fd) = stdin {
        cmd.stdin(Stdio::from(fd));
    }
    if let Some(fd) = stdout {
        cmd.stdout(Stdio::from(fd));
    }
    redirections.apply(&mut cmd);
    Ok(cmd)
}

/// Shell-style exit code: the process's own code, or 128+N when killed by
/// signal N.
pub fn exit_code(exit_status: ExitStatus) -> ExitCode {
    match exit_status.code() {
        Some(x) => x,
        None => terminated_by_signal(exit_status),
    }
}

fn terminated_by_signal(exit_status: ExitStatus) -> ExitCode {
    use std::os::unix::process::ExitStatusExt;
    if let Some(signal) = exit_status.signal() {
        128 + signal
    } else if exit_status.core_dumped() {
        255
    } else {
        -1
    }
}
