use crate::repl::{self, Prompt};

use anyhow::{Context, Result};
use clap::Parser;
use plume_common::error::{report_err, ErrorS, SourceFiles};
use plume_interpreter::Session;
use reedline::Signal;
use termcolor::{ColorChoice, StandardStream};

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

/// The input contained a compile-time error.
const EX_DATAERR: u8 = 65;
/// A runtime fault stopped the program.
const EX_SOFTWARE: u8 = 70;
/// The input file could not be read.
const EX_IOERR: u8 = 74;

#[remain::sorted]
#[derive(Debug, Parser)]
#[clap(about, author, disable_help_subcommand = true, propagate_version = true, version)]
pub enum Cmd {
    /// Start an interactive session.
    Repl,
    /// Run a source file.
    Run { path: PathBuf },
}

impl Cmd {
    pub fn run(&self) -> Result<ExitCode> {
        match self {
            Cmd::Repl => repl(),
            Cmd::Run { path } => run(path),
        }
    }
}

fn repl() -> Result<ExitCode> {
    let mut editor = repl::editor().context("could not start editor")?;
    let mut session = Session::default();
    let stdout = io::stdout();

    loop {
        match editor.read_line(&Prompt) {
            Ok(Signal::Success(line)) => {
                let mut stdout = stdout.lock();
                let result = session.run(&line, &mut stdout);
                stdout.flush().context("could not flush stdout")?;
                if let Err(errors) = result {
                    report(session.files(), &errors)?;
                }
            }
            Ok(Signal::CtrlC) => {
                eprintln!("CTRL-C");
            }
            Ok(Signal::CtrlD) => {
                eprintln!("CTRL-D");
                break;
            }
            Err(e) => return Err(e).context("could not read from the terminal"),
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn run(path: &Path) -> Result<ExitCode> {
    tracing::debug!(path = %path.display(), "running file");
    let source = match fs::read_to_string(path) {
        Ok(source) => source,
        Err(e) => {
            let e = anyhow::Error::new(e).context(format!("could not read file: {}", path.display()));
            eprintln!("error: {e:?}");
            return Ok(ExitCode::from(EX_IOERR));
        }
    };

    let mut session = Session::default();
    let stdout = io::stdout();
    let mut stdout = stdout.lock();
    let result = session.run(&source, &mut stdout);
    stdout.flush().context("could not flush stdout")?;

    match result {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(errors) => {
            report(session.files(), &errors)?;
            let runtime = errors.iter().any(|e| e.error.is_runtime());
            Ok(ExitCode::from(if runtime { EX_SOFTWARE } else { EX_DATAERR }))
        }
    }
}

fn report(files: &SourceFiles, errors: &[ErrorS]) -> Result<()> {
    let mut stderr = StandardStream::stderr(ColorChoice::Auto);
    report_err(&mut stderr, files, errors).context("could not write diagnostics")
}
