//! Error taxonomy of the engine.
//!
//! Every failure the user can observe is reported the same way: one fixed
//! diagnostic line on standard error. The variants below only matter to callers
//! and to the log, never to the person at the prompt.

use std::io::{self, Write};
use std::path::PathBuf;
use thiserror::Error;

/// The one diagnostic every user-visible failure prints.
pub const ERROR_MESSAGE: &str = "An error has occurred\n";

/// Malformed input detected before anything is spawned.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    /// The line exceeds the fixed input buffer.
    #[error("input line longer than {max} bytes", max = crate::parser::MAX_INPUT_SIZE)]
    InputTooLong,
    /// `!` followed by something that is not a decimal number.
    #[error("bad history reference `{0}`")]
    BadHistoryIndex(String),
    /// `!n` with `n` zero or beyond the number of stored entries.
    #[error("history index {0} out of range")]
    HistoryOutOfRange(usize),
    /// More `|`-separated stages than a pipeline supports.
    #[error("pipeline has {0} stages, at most {max} are supported", max = crate::parser::MAX_PIPELINE_STAGES)]
    TooManyStages(usize),
    /// A `|` with nothing on one of its sides.
    #[error("empty pipeline stage")]
    EmptyStage,
    /// `<` or `>` as the last token of a command.
    #[error("`{0}` is missing a file name")]
    MissingRedirectTarget(char),
    /// The same redirection operator used twice in one command.
    #[error("`{0}` given more than once")]
    DuplicateRedirect(char),
    /// Nothing left to run once the redirections were stripped.
    #[error("empty command")]
    EmptyCommand,
}

/// Any failure the engine can report for one command line.
#[derive(Debug, Error)]
pub enum ShellError {
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("command not found: {0}")]
    NotFound(String),

    #[error("search path is empty, only built-ins can run")]
    PathCleared,

    #[error("cannot open {}: {source}", .path.display())]
    Redirect {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot create pipe: {0}")]
    Pipe(#[from] nix::Error),

    #[error("cannot spawn {}: {source}", .program.display())]
    Spawn {
        program: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot wait for child: {0}")]
    Wait(#[source] io::Error),

    #[error("{0:#}")]
    Builtin(anyhow::Error),

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl ShellError {
    /// Log the detailed cause and print the uniform diagnostic to `stderr`.
    pub fn report_to(&self, stderr: &mut dyn Write) {
        tracing::debug!(error = %self, "reporting failure");
        let _ = stderr.write_all(ERROR_MESSAGE.as_bytes());
        let _ = stderr.flush();
    }

    /// [`ShellError::report_to`] on the process's standard error.
    pub fn report(&self) {
        self.report_to(&mut io::stderr());
    }
}

/// Result type used throughout the engine.
pub type Result<T> = std::result::Result<T, ShellError>;
