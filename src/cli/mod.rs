//! Command-line interface for configmerge
//!
//! A single flat command: every positional argument is a source, merged in
//! order with later sources taking precedence.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{CommandFactory, Parser};
use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::error::Error;
use crate::load::Format;
use crate::merge::ListStrategy;

mod pipeline;
mod report;

const EXIT_FAILURE: u8 = 1;
const EXIT_USAGE: u8 = 2;

/// Merge layered configuration files into one document
#[derive(Parser, Debug)]
#[command(name = "configmerge")]
#[command(author, version, about, long_about = None)]
#[command(after_help = "Later sources override earlier ones. Use '-' to read a source from stdin.")]
pub struct Cli {
    /// Configuration sources, lowest precedence first
    #[arg(value_name = "SOURCE")]
    pub sources: Vec<String>,

    /// Output format; also used for stdin and files with unknown extensions
    #[arg(short, long, value_enum, env = "CONFIGMERGE_FORMAT")]
    pub format: Option<Format>,

    /// Parse every source as this format
    #[arg(long, value_enum, value_name = "FORMAT")]
    pub input_format: Option<Format>,

    /// Write the result to PATH instead of stdout
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Merge into the existing --output file instead of replacing it
    #[arg(short, long, requires = "output")]
    pub update: bool,

    /// Fail when a later source changes the type of a value
    #[arg(long, env = "CONFIGMERGE_STRICT")]
    pub strict: bool,

    /// How sequences at the same path are combined
    #[arg(
        long,
        value_enum,
        default_value_t = ListStrategy::Replace,
        env = "CONFIGMERGE_LIST_STRATEGY"
    )]
    pub list_strategy: ListStrategy,

    /// Set a value after all sources (repeatable); VALUE is read as YAML
    #[arg(short = 's', long = "set", value_name = "PATH=VALUE")]
    pub set: Vec<String>,

    /// Leave ${...} references untouched
    #[arg(long)]
    pub no_interpolate: bool,

    /// Do not report overridden values on stderr
    #[arg(short, long)]
    pub quiet: bool,

    /// Enable verbose logging (sets log level to DEBUG)
    #[arg(short, long)]
    pub verbose: bool,
}

pub fn run() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            // --help and --version land here too, with exit code 0.
            let _ = err.print();
            return ExitCode::from(u8::try_from(err.exit_code()).unwrap_or(EXIT_USAGE));
        }
    };

    // RUST_LOG in the environment always takes precedence; --verbose falls back to DEBUG.
    let filter = if cli.verbose {
        EnvFilter::from_default_env().add_directive(Level::DEBUG.into())
    } else {
        EnvFilter::from_default_env().add_directive(Level::WARN.into())
    };
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .try_init();

    if cli.sources.is_empty() && cli.set.is_empty() {
        return match Cli::command().print_help() {
            Ok(()) => ExitCode::SUCCESS,
            Err(_) => ExitCode::from(EXIT_FAILURE),
        };
    }

    match pipeline::run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            let usage = err.downcast_ref::<Error>().is_some_and(Error::is_usage);
            ExitCode::from(if usage { EXIT_USAGE } else { EXIT_FAILURE })
        }
    }
}
