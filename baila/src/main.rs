//! Baila CLI

use baila::error::{CompileError, report_error};
use baila::{Config, Error, Interpreter};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "baila", version, about = "Baila - a small scripting language")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a Baila source file
    Run {
        /// Source file to run
        file: PathBuf,
        /// Log interpreter events at debug level
        #[arg(long)]
        debug: bool,
        /// Maximum call depth before a StackOverflow error
        #[arg(long, value_name = "N")]
        max_depth: Option<usize>,
    },
    /// Lex and parse a source file without running it
    Check {
        /// Source file to check
        file: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Run {
            file,
            debug,
            max_depth,
        } => {
            init_tracing(debug);
            let mut config = Config {
                trace_calls: debug,
                ..Config::default()
            };
            if let Some(depth) = max_depth {
                config.max_call_depth = depth;
            }
            run_file(&file, config)
        }
        Command::Check { file } => {
            init_tracing(false);
            check_file(&file)
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

/// Log to stderr. `RUST_LOG` wins over the `--debug` default.
fn init_tracing(debug: bool) {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let default = if debug { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_level(true),
        )
        .with(filter)
        .init();
}

fn run_file(path: &Path, config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let source = std::fs::read_to_string(path)?;
    let filename = path.display().to_string();

    let mut interp = Interpreter::with_config(config);
    match baila::run_source(&mut interp, &source, &filename) {
        Ok(Some(value)) if !value.is_null() => {
            println!("{}", interp.stringify(&value)?);
            Ok(())
        }
        Ok(_) => Ok(()),
        Err(Error::Compile(e)) => report(&filename, &source, e),
        Err(Error::Runtime(e)) => Err(e.into()),
    }
}

fn check_file(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let source = std::fs::read_to_string(path)?;
    let filename = path.display().to_string();

    let parsed = baila::lexer::tokenize(&source, &filename).and_then(baila::parser::parse);
    match parsed {
        Ok(program) => {
            println!(
                "✓ {} parses successfully ({} statements)",
                filename,
                program.statements.len()
            );
            Ok(())
        }
        Err(e) => report(&filename, &source, e),
    }
}

/// Render a compile error with its source excerpt, then fail with it.
fn report(filename: &str, source: &str, error: CompileError) -> Result<(), Box<dyn std::error::Error>> {
    report_error(filename, source, &error)?;
    Err(error.into())
}
