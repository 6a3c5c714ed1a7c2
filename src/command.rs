use crate::env::Environment;
use crate::error::Result;
use std::io::Write;

/// Conventional process exit code type used by this crate.
///
/// A value of 0 indicates success; any non-zero value indicates failure.
/// Children killed by signal N are reported as 128+N, as POSIX shells do.
pub type ExitCode = i32;

/// Object-safe trait for any command that runs inside the shell process.
///
/// Implemented by built-ins via a blanket impl. Such commands never fork and
/// never see redirection; they write straight to the shell's own output.
pub trait ExecutableCommand {
    /// Executes the command.
    fn execute(self: Box<Self>, stdout: &mut dyn Write, env: &mut Environment) -> Result<ExitCode>;
}

/// Factory that tries to create an in-process command from a name and its
/// arguments.
///
/// Returns `None` when the factory doesn't recognize the `name`, in which case
/// the command is left to external execution.
pub trait CommandFactory {
    /// Attempt to create a command instance for the provided name and arguments.
    fn try_create(&self, name: &str, args: &[&str]) -> Option<Box<dyn ExecutableCommand>>;
}
