//! Turns one raw input line into segments ready for dispatch.
//!
//! The grammar is deliberately small:
//!
//! ```text
//! line     := segment ('&' segment)*
//! segment  := stage ('|' stage)*        at most MAX_PIPELINE_STAGES stages
//! stage    := word+                     words are separated by whitespace
//! ```
//!
//! `&` binds loosest: every segment but the last runs in the background, the
//! last one in the foreground. A line whose first token is `!n` is first
//! replaced by the `n`-th history entry. There is no quoting and no expansion;
//! redirection operators stay in the word list and are handled per command by
//! [`crate::redirect`].

use crate::error::ParseError;
use crate::history::History;
use std::borrow::Cow;

/// Longest line the shell accepts, in bytes, without the trailing newline.
pub const MAX_INPUT_SIZE: usize = 1024;

/// Most commands one `|` chain may hold.
pub const MAX_PIPELINE_STAGES: usize = 5;

/// A program name followed by its arguments.
///
/// The vector is never empty once produced by the parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub argv: Vec<String>,
}

impl Command {
    pub fn new<I, S>(argv: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            argv: argv.into_iter().map(Into::into).collect(),
        }
    }

    pub fn name(&self) -> &str {
        self.argv.first().map(String::as_str).unwrap_or_default()
    }

    pub fn args(&self) -> &[String] {
        self.argv.get(1..).unwrap_or_default()
    }
}

/// One or more commands joined by `|`, in execution order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pipeline {
    pub stages: Vec<Command>,
}

/// A pipeline together with its wait policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub pipeline: Pipeline,
    pub background: bool,
}

/// Result of parsing one input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedLine {
    /// The line as it will run, after history substitution, trimmed.
    pub text: String,
    /// Whether `text` came from a `!n` recall and should be echoed.
    pub recalled: bool,
    pub segments: Vec<Segment>,
}

/// Parse a raw line read from the user or a batch file.
pub fn parse(raw: &str, history: &History) -> Result<ParsedLine, ParseError> {
    let line = raw.trim_end_matches(['\n', '\r']);
    if line.len() > MAX_INPUT_SIZE {
        return Err(ParseError::InputTooLong);
    }
    let expanded = expand_history(line, history)?;
    if expanded.len() > MAX_INPUT_SIZE {
        return Err(ParseError::InputTooLong);
    }
    let recalled = matches!(expanded, Cow::Owned(_));
    let segments = parse_segments(&expanded)?;
    Ok(ParsedLine {
        text: expanded.trim().to_string(),
        recalled,
        segments,
    })
}

/// Substitute a leading `!n` token with the `n`-th history entry.
///
/// Text following the `!n` token is appended to the recalled entry. Lines that
/// do not start with `!` are returned borrowed and untouched.
pub fn expand_history<'a>(line: &'a str, history: &History) -> Result<Cow<'a, str>, ParseError> {
    let Some(rest) = line.trim_start().strip_prefix('!') else {
        return Ok(Cow::Borrowed(line));
    };
    let (token, tail) = match rest.find(char::is_whitespace) {
        Some(i) => (&rest[..i], rest[i..].trim()),
        None => (rest, ""),
    };
    if token.is_empty() || !token.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ParseError::BadHistoryIndex(format!("!{}", token)));
    }
    let n: usize = token
        .parse()
        .map_err(|_| ParseError::BadHistoryIndex(format!("!{}", token)))?;
    let entry = history.get(n).ok_or(ParseError::HistoryOutOfRange(n))?;
    tracing::debug!(index = n, entry, "history recall");
    Ok(Cow::Owned(if tail.is_empty() {
        entry.to_string()
    } else {
        format!("{} {}", entry, tail)
    }))
}

/// Split a line on `&` into background and foreground segments.
///
/// Blank segments contribute nothing, so `sleep 5 &` yields a single
/// background segment.
pub fn parse_segments(line: &str) -> Result<Vec<Segment>, ParseError> {
    let parts: Vec<&str> = line.split('&').collect();
    let last = parts.len() - 1;
    let mut segments = Vec::new();
    for (i, part) in parts.into_iter().enumerate() {
        if part.trim().is_empty() {
            continue;
        }
        segments.push(Segment {
            pipeline: parse_pipeline(part)?,
            background: i != last,
        });
    }
    Ok(segments)
}

/// Split one segment on `|` and tokenize every stage on whitespace.
pub fn parse_pipeline(segment: &str) -> Result<Pipeline, ParseError> {
    let stages: Vec<&str> = segment.split('|').map(str::trim).collect();
    if stages.len() > MAX_PIPELINE_STAGES {
        return Err(ParseError::TooManyStages(stages.len()));
    }
    if stages.iter().any(|s| s.is_empty()) {
        return Err(ParseError::EmptyStage);
    }
    Ok(Pipeline {
        stages: stages
            .into_iter()
            .map(|s| Command::new(s.split_whitespace()))
            .collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(cmd: &Command) -> Vec<&str> {
        cmd.argv.iter().map(String::as_str).collect()
    }

    fn history_of(lines: &[&str]) -> History {
        let mut h = History::new();
        for l in lines {
            h.record(l);
        }
        h
    }

    #[test]
    fn test_simple_command_is_one_foreground_segment() {
        let parsed = parse("ls -l\t /tmp\n", &History::new()).unwrap();
        assert_eq!(parsed.text, "ls -l\t /tmp");
        assert!(!parsed.recalled);
        assert_eq!(parsed.segments.len(), 1);
        let seg = &parsed.segments[0];
        assert!(!seg.background);
        assert_eq!(seg.pipeline.stages.len(), 1);
        assert_eq!(argv(&seg.pipeline.stages[0]), ["ls", "-l", "/tmp"]);
    }

    #[test]
    fn test_every_segment_but_the_last_is_background() {
        let segs = parse_segments("sleep 1 & sleep 2 & echo done").unwrap();
        let flags: Vec<bool> = segs.iter().map(|s| s.background).collect();
        assert_eq!(flags, [true, true, false]);
    }

    #[test]
    fn test_trailing_ampersand_leaves_a_single_background_segment() {
        let segs = parse_segments("sleep 5 &").unwrap();
        assert_eq!(segs.len(), 1);
        assert!(segs[0].background);
    }

    #[test]
    fn test_blank_segments_are_skipped() {
        let segs = parse_segments("  &  & echo hi &   ").unwrap();
        assert_eq!(segs.len(), 1);
        assert_eq!(argv(&segs[0].pipeline.stages[0]), ["echo", "hi"]);
        assert!(segs[0].background);
        assert!(parse_segments("   ").unwrap().is_empty());
    }

    #[test]
    fn test_background_applies_to_a_whole_pipeline() {
        let segs = parse_segments("a | b & c").unwrap();
        assert_eq!(segs.len(), 2);
        assert!(segs[0].background);
        assert_eq!(segs[0].pipeline.stages.len(), 2);
        assert_eq!(argv(&segs[0].pipeline.stages[1]), ["b"]);
        assert!(!segs[1].background);
        assert_eq!(argv(&segs[1].pipeline.stages[0]), ["c"]);
    }

    #[test]
    fn test_redirection_tokens_stay_in_the_word_list() {
        let p = parse_pipeline("sort < in.txt | uniq > out.txt").unwrap();
        assert_eq!(argv(&p.stages[0]), ["sort", "<", "in.txt"]);
        assert_eq!(argv(&p.stages[1]), ["uniq", ">", "out.txt"]);
    }

    #[test]
    fn test_pipeline_stage_limits() {
        assert_eq!(parse_pipeline("a|b|c|d|e").unwrap().stages.len(), 5);
        assert_eq!(
            parse_pipeline("a|b|c|d|e|f"),
            Err(ParseError::TooManyStages(6))
        );
        assert_eq!(parse_pipeline("a | | b"), Err(ParseError::EmptyStage));
        assert_eq!(parse_pipeline("a |"), Err(ParseError::EmptyStage));
    }

    #[test]
    fn test_overlong_lines_are_rejected() {
        let line = "x".repeat(MAX_INPUT_SIZE + 1);
        assert_eq!(parse(&line, &History::new()), Err(ParseError::InputTooLong));
        let line = format!("{}\n", "x".repeat(MAX_INPUT_SIZE));
        assert!(parse(&line, &History::new()).is_ok());
    }

    #[test]
    fn test_recall_cannot_grow_past_the_limit() {
        let entry = format!("echo {}", "y".repeat(600));
        let h = history_of(&[entry.as_str()]);
        let line = format!("!1 {}", "z".repeat(600));
        assert!(line.len() <= MAX_INPUT_SIZE);
        assert_eq!(parse(&line, &h), Err(ParseError::InputTooLong));
        assert!(parse("!1", &h).is_ok());
    }

    #[test]
    fn test_history_recall_reproduces_the_entry() {
        let h = history_of(&["echo one", "ls -l | wc -l > count", "pwd"]);
        let parsed = parse("!2\n", &h).unwrap();
        assert!(parsed.recalled);
        assert_eq!(parsed.text, "ls -l | wc -l > count");
        let direct = parse("ls -l | wc -l > count", &h).unwrap();
        assert_eq!(parsed.segments, direct.segments);
    }

    #[test]
    fn test_history_recall_appends_trailing_words() {
        let h = history_of(&["ls"]);
        let parsed = parse("  !1 -a", &h).unwrap();
        assert_eq!(parsed.text, "ls -a");
    }

    #[test]
    fn test_history_recall_rejects_bad_indices() {
        let h = history_of(&["echo one", "echo two"]);
        assert_eq!(parse("!0", &h), Err(ParseError::HistoryOutOfRange(0)));
        assert_eq!(parse("!3", &h), Err(ParseError::HistoryOutOfRange(3)));
        assert_eq!(
            parse("!-1", &h),
            Err(ParseError::BadHistoryIndex("!-1".to_string()))
        );
        assert_eq!(
            parse("!", &h),
            Err(ParseError::BadHistoryIndex("!".to_string()))
        );
        assert_eq!(
            parse("!abc", &h),
            Err(ParseError::BadHistoryIndex("!abc".to_string()))
        );
    }

    #[test]
    fn test_bang_inside_a_line_is_an_ordinary_word() {
        let parsed = parse("echo !1", &History::new()).unwrap();
        assert!(!parsed.recalled);
        assert_eq!(argv(&parsed.segments[0].pipeline.stages[0]), ["echo", "!1"]);
    }
}
