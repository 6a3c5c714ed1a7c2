use crate::external::SearchPath;
use crate::history::History;
use crate::jobs::JobTracker;
use std::env as stdenv;
use std::path::PathBuf;

/// Mutable session state shared by every part of the engine.
///
/// The environment contains:
/// - `search_path`: directories used to resolve bare program names.
/// - `history`: the last accepted command lines, for `history` and `!n`.
/// - `jobs`: detached children that have not been reaped yet.
/// - `current_dir`: the working directory children are started in.
/// - `should_exit`: a flag the session loop checks after every line.
///
/// Nothing here is global: the interpreter owns one `Environment` and lends it
/// to each component, so tests can build as many sessions as they like.
#[derive(Debug)]
pub struct Environment {
    pub search_path: SearchPath,
    pub history: History,
    pub jobs: JobTracker,
    pub current_dir: PathBuf,
    pub should_exit: bool,
}

impl Environment {
    /// Fresh session state with the default search path, rooted at the
    /// process's current directory.
    pub fn new() -> Self {
        let current_dir = stdenv::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self {
            search_path: SearchPath::default(),
            history: History::new(),
            jobs: JobTracker::new(),
            current_dir,
            should_exit: false,
        }
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

/// Serializes tests that move the process working directory.
#[cfg(test)]
pub(crate) fn lock_current_dir() -> std::sync::MutexGuard<'static, ()> {
    use std::sync::{Mutex, OnceLock};
    static MUTEX: OnceLock<Mutex<()>> = OnceLock::new();
    MUTEX
        .get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|e| e.into_inner())
}
