use anyhow::{Context, Result};
use argh::{EarlyExit, FromArgs};
use gush::Interpreter;
use gush::error::ERROR_MESSAGE;
use std::fs::File;
use std::io::{self, BufReader, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter, e.g. `GUSH_LOG=debug`.
const LOG_ENV: &str = "GUSH_LOG";

#[derive(FromArgs)]
/// A small shell. Reads commands from FILE when given, interactively otherwise.
struct Args {
    #[argh(positional)]
    /// script to run line by line instead of prompting
    batch_file: Option<PathBuf>,
}

fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("off"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn run(args: Args) -> Result<()> {
    let mut sh = Interpreter::default();
    match args.batch_file {
        Some(path) => {
            let file = File::open(&path)
                .with_context(|| format!("can't open batch file {}", path.display()))?;
            sh.run_batch(BufReader::new(file), &mut io::stdout(), &mut io::stderr())
                .with_context(|| format!("can't read batch file {}", path.display()))
        }
        None => sh.repl().context("line editor failed"),
    }
}

fn main() -> ExitCode {
    init_logging();

    let argv: Vec<String> = std::env::args().collect();
    let argv: Vec<&str> = argv.iter().map(String::as_str).collect();
    let (program, rest): (&str, &[&str]) = match argv.split_first() {
        Some((program, rest)) => (*program, rest),
        None => ("gush", &[]),
    };

    let args = match Args::from_args(&[program], rest) {
        Ok(args) => args,
        Err(EarlyExit { output, status }) => {
            return match status {
                Ok(()) => {
                    print!("{}", output);
                    ExitCode::SUCCESS
                }
                Err(()) => {
                    tracing::debug!(%output, "bad command line");
                    let _ = io::stderr().write_all(ERROR_MESSAGE.as_bytes());
                    ExitCode::FAILURE
                }
            };
        }
    };

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::debug!("{:#}", e);
            let _ = io::stderr().write_all(ERROR_MESSAGE.as_bytes());
            ExitCode::FAILURE
        }
    }
}
