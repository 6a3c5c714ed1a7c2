use crate::command::{CommandFactory, ExecutableCommand, ExitCode};
use crate::env::Environment;
use crate::error::{Result, ShellError};
use crate::parser::{self, Command, Segment};
use crate::pipeline::spawn_pipeline;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::io::{self, BufRead, Write};

/// Prompt shown before every interactive line.
pub const PROMPT: &str = "gush> ";

/// Factory allows creating instances of ExecutableCommand.
///
/// Only supports commands defined in this crate, i.e. built-ins.
pub(crate) struct Factory<T> {
    _phantom: std::marker::PhantomData<T>,
}

impl<T> Default for Factory<T> {
    fn default() -> Self {
        Self {
            _phantom: std::marker::PhantomData,
        }
    }
}

/// A line-oriented shell that runs built-ins in-process and everything else as
/// child processes.
///
/// The interpreter owns the session [`Environment`] and a list of
/// [`CommandFactory`] objects that are asked, by name, whether a command is a
/// built-in. See [`Default`] for the built-ins included out of the box.
///
/// Example
/// ```
/// use gush::Interpreter;
/// let mut sh = Interpreter::default();
/// let (mut out, mut err) = (Vec::new(), Vec::new());
/// sh.execute_line("path /bin /usr/bin", &mut out, &mut err);
/// assert!(err.is_empty());
/// ```
pub struct Interpreter {
    env: Environment,
    commands: Vec<Box<dyn CommandFactory>>,
}

impl Interpreter {
    /// Create a new interpreter with a custom set of built-in factories.
    pub fn new(commands: Vec<Box<dyn CommandFactory>>) -> Self {
        Self {
            env: Environment::new(),
            commands,
        }
    }

    pub fn env(&self) -> &Environment {
        &self.env
    }

    pub fn env_mut(&mut self) -> &mut Environment {
        &mut self.env
    }

    /// Whether an `exit` built-in has run.
    pub fn should_exit(&self) -> bool {
        self.env.should_exit
    }

    /// Run one line against the process's standard streams.
    pub fn run(&mut self, line: &str) -> ExitCode {
        let stdout = io::stdout();
        let stderr = io::stderr();
        self.execute_line(line, &mut stdout.lock(), &mut stderr.lock())
    }

    /// Parse one raw line and run its segments in order.
    ///
    /// Shell output (built-ins, history echo, job notices) goes to `stdout`;
    /// every failure prints the uniform diagnostic on `stderr`. A parse error
    /// abandons the whole line before anything runs. Returns the exit code of
    /// the last segment; it is never shown to the user.
    pub fn execute_line(&mut self, line: &str, stdout: &mut dyn Write, stderr: &mut dyn Write) -> ExitCode {
        let parsed = match parser::parse(line, &self.env.history) {
            Ok(parsed) => parsed,
            Err(e) => {
                ShellError::from(e).report_to(stderr);
                return 1;
            }
        };
        if parsed.segments.is_empty() {
            return 0;
        }
        if parsed.recalled {
            if let Err(e) = writeln!(stdout, "{}", parsed.text) {
                ShellError::from(e).report_to(stderr);
            }
        }
        self.env.history.record(&parsed.text);

        let mut last = 0;
        for segment in &parsed.segments {
            last = match self.dispatch(segment, stdout, stderr) {
                Ok(code) => code,
                Err(e) => {
                    e.report_to(stderr);
                    1
                }
            };
            self.reap_jobs(stdout, stderr);
            if self.env.should_exit {
                break;
            }
        }
        last
    }

    /// Run one segment: a lone built-in in-process, anything else as children.
    fn dispatch(&mut self, segment: &Segment, stdout: &mut dyn Write, stderr: &mut dyn Write) -> Result<ExitCode> {
        let stages = &segment.pipeline.stages;
        if let [command] = stages.as_slice() {
            if let Some(builtin) = self.find_builtin(command) {
                tracing::debug!(name = command.name(), "running built-in");
                return builtin.execute(stdout, &mut self.env);
            }
        }
        stdout.flush()?;

        let env = &mut self.env;
        if segment.background {
            let job = env
                .jobs
                .launch_detached(stages, &env.search_path, &env.current_dir)?;
            let failed = !job.errors.is_empty();
            for e in job.errors {
                e.report_to(stderr);
            }
            return Ok(if failed { 1 } else { 0 });
        }

        let mut spawned = spawn_pipeline(stages, &env.search_path, &env.current_dir)?;
        for e in &spawned.errors {
            e.report_to(stderr);
        }
        Ok(spawned.wait()?.unwrap_or(1))
    }

    fn find_builtin(&self, command: &Command) -> Option<Box<dyn ExecutableCommand>> {
        let args: Vec<&str> = command.args().iter().map(String::as_str).collect();
        self.commands
            .iter()
            .find_map(|factory| factory.try_create(command.name(), &args))
    }

    /// Print a notice for every background job that has finished.
    pub fn reap_jobs(&mut self, stdout: &mut dyn Write, stderr: &mut dyn Write) {
        if let Err(e) = self.env.jobs.report_terminated(stdout) {
            ShellError::from(e).report_to(stderr);
        }
    }

    /// Interactive Read-Eval-Print Loop.
    ///
    /// Returns when `exit` runs or input ends. Ctrl-C abandons the current line.
    pub fn repl(&mut self) -> rustyline::Result<()> {
        let mut rl = DefaultEditor::new()?;

        while !self.env.should_exit {
            self.reap_jobs(&mut io::stdout(), &mut io::stderr());
            match rl.readline(PROMPT) {
                Ok(line) => {
                    if !line.trim().is_empty() {
                        rl.add_history_entry(line.as_str())?;
                    }
                    self.run(&line);
                }
                Err(ReadlineError::Interrupted) => continue,
                Err(ReadlineError::Eof) => break,
                Err(err) => return Err(err),
            }
        }

        Ok(())
    }

    /// Run every line of a batch script, without a prompt.
    ///
    /// Stops early when `exit` runs. Only a failure to read the script itself
    /// is returned as an error.
    pub fn run_batch(
        &mut self,
        mut reader: impl BufRead,
        stdout: &mut dyn Write,
        stderr: &mut dyn Write,
    ) -> io::Result<()> {
        let mut buf = Vec::new();
        while !self.env.should_exit {
            buf.clear();
            if reader.read_until(b'\n', &mut buf)? == 0 {
                break;
            }
            self.reap_jobs(stdout, stderr);
            self.execute_line(&String::from_utf8_lossy(&buf), stdout, stderr);
        }
        Ok(())
    }
}

impl Default for Interpreter {
    /// Create an interpreter with the default set of built-ins:
    /// `exit`, `cd`, `pwd`, `history`, `kill`, `path` and `clear`.
    fn default() -> Self {
        use crate::builtin::*;
        Self::new(vec![
            Box::new(Factory::<Exit>::default()),
            Box::new(Factory::<Cd>::default()),
            Box::new(Factory::<Pwd>::default()),
            Box::new(Factory::<History>::default()),
            Box::new(Factory::<Kill>::default()),
            Box::new(Factory::<Path>::default()),
            Box::new(Factory::<Clear>::default()),
        ])
    }
}
