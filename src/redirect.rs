use crate::error::{ParseError, Result, ShellError};
use std::fs::{File, OpenOptions};
use std::os::unix::fs::OpenOptionsExt;
use std::path::PathBuf;
use std::process;

/// Permission bits for files created by `>`.
const OUTPUT_MODE: u32 = 0o644;

/// Stream targets requested by `<` and `>` in one command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Redirections {
    pub input: Option<PathBuf>,
    pub output: Option<PathBuf>,
}

/// A command's words with every redirection pair taken out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirected {
    pub argv: Vec<String>,
    pub redirections: Redirections,
}

/// Strip `<`/`>` operators and their file names from a word list.
///
/// Each operator may appear at most once and must be followed by a file name.
/// The remaining words keep their relative order and must not be empty.
pub fn split_redirections(argv: &[String]) -> std::result::Result<Redirected, ParseError> {
    let mut words = Vec::with_capacity(argv.len());
    let mut redirections = Redirections::default();
    let mut iter = argv.iter();
    while let Some(word) = iter.next() {
        let (op, slot) = match word.as_str() {
            "<" => ('<', &mut redirections.input),
            ">" => ('>', &mut redirections.output),
            _ => {
                words.push(word.clone());
                continue;
            }
        };
        let target = match iter.next() {
            Some(t) if t != "<" && t != ">" => t,
            _ => return Err(ParseError::MissingRedirectTarget(op)),
        };
        if slot.is_some() {
            return Err(ParseError::DuplicateRedirect(op));
        }
        *slot = Some(PathBuf::from(target));
    }
    if words.is_empty() {
        return Err(ParseError::EmptyCommand);
    }
    Ok(Redirected {
        argv: words,
        redirections,
    })
}

impl Redirections {
    pub fn is_empty(&self) -> bool {
        self.input.is_none() && self.output.is_none()
    }

    /// Open the `<` target read-only. It must already exist.
    pub fn open_input(&self) -> Result<Option<File>> {
        self.input
            .as_ref()
            .map(|path| {
                File::open(path).map_err(|source| ShellError::Redirect {
                    path: path.clone(),
                    source,
                })
            })
            .transpose()
    }

    /// Open the `>` target write-only, creating or truncating it.
    pub fn open_output(&self) -> Result<Option<File>> {
        self.output
            .as_ref()
            .map(|path| {
                OpenOptions::new()
                    .write(true)
                    .create(true)
                    .truncate(true)
                    .mode(OUTPUT_MODE)
                    .open(path)
                    .map_err(|source| ShellError::Redirect {
                        path: path.clone(),
                        source,
                    })
            })
            .transpose()
    }

    /// Open both targets, input first.
    pub fn open(&self) -> Result<OpenedRedirections> {
        Ok(OpenedRedirections {
            input: self.open_input()?,
            output: self.open_output()?,
        })
    }
}

/// Files opened for a command's `<`/`>`, waiting to be handed to its child.
#[derive(Debug, Default)]
pub struct OpenedRedirections {
    input: Option<File>,
    output: Option<File>,
}

impl OpenedRedirections {
    /// Point the child's standard streams at the opened files.
    ///
    /// The files only become fd 0/1 inside the child, between fork and exec; the
    /// shell's own streams never change. A stream configured earlier (a pipe
    /// end) is replaced, and so closed.
    pub fn apply(self, cmd: &mut process::Command) {
        if let Some(file) = self.input {
            cmd.stdin(file);
        }
        if let Some(file) = self.output {
            cmd.stdout(file);
        }
    }
}
