use std::collections::VecDeque;
use std::io::{self, Write};

/// Number of command lines the buffer keeps.
pub const HISTORY_CAPACITY: usize = 10;

/// Fixed-capacity record of previously accepted command lines.
///
/// Entries are kept in insertion order and addressed from 1. Once full, every
/// new entry evicts the oldest one.
#[derive(Debug, Clone, Default)]
pub struct History {
    entries: VecDeque<String>,
}

impl History {
    pub fn new() -> Self {
        Self {
            entries: VecDeque::with_capacity(HISTORY_CAPACITY),
        }
    }

    /// Record a command line, unless it is blank or a `history` invocation.
    ///
    /// Returns whether the line was stored.
    pub fn record(&mut self, line: &str) -> bool {
        let line = line.trim();
        match line.split_whitespace().next() {
            None | Some("history") => return false,
            Some(_) => {}
        }
        if self.entries.len() == HISTORY_CAPACITY {
            self.entries.pop_front();
        }
        self.entries.push_back(line.to_string());
        true
    }

    /// The `n`-th stored entry, 1-indexed.
    pub fn get(&self, n: usize) -> Option<&str> {
        n.checked_sub(1)
            .and_then(|i| self.entries.get(i))
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }

    /// Print every entry as `<index> <command>`.
    pub fn write_to(&self, out: &mut dyn Write) -> io::Result<()> {
        for (i, entry) in self.iter().enumerate() {
            writeln!(out, "{} {}", i + 1, entry)?;
        }
        Ok(())
    }
}
