//! The command execution engine of `gush`, a small POSIX shell.
//!
//! A raw input line flows through the [`parser`] (background segments, pipeline
//! stages, `!n` history recall), then either into an in-process built-in or into
//! the pipeline builder, which spawns one child per stage with its standard
//! streams wired to pipes and redirection targets. Detached children are tracked
//! by the background job tracker and reaped without blocking.
//!
//! All session state lives in an explicitly owned [`env::Environment`] so every
//! component can be exercised in isolation. The main entry point is
//! [`Interpreter`], which runs one line at a time or drives a whole interactive
//! or batch session.

mod builtin;
pub mod command;
pub mod env;
pub mod error;
pub mod external;
pub mod history;
mod interpreter;
pub mod jobs;
pub mod parser;
pub mod pipeline;
pub mod redirect;

/// Just a convenient re-export of the line-oriented command runner.
///
/// See [`Interpreter`] for the high-level API and examples.
pub use interpreter::Interpreter;
