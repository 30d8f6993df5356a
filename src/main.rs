mod cmd;
mod repl;

use crate::cmd::Cmd;

use clap::Parser;

use std::io;
use std::process::ExitCode;

fn main() -> ExitCode {
    human_panic::setup_panic!();
    init_tracing();

    match Cmd::parse().run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:?}");
            ExitCode::FAILURE
        }
    }
}

/// Logs go to stderr, and only when `RUST_LOG` is set.
fn init_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    if std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::registry()
            .with(fmt::layer().with_target(true).with_writer(io::stderr))
            .with(EnvFilter::from_default_env())
            .init();
    }
}
