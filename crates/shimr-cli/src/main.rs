//! Shim contract resolver CLI.
//!
//! Provides the `shimr` binary. A JSON manifest describes the types a front
//! end would have scanned plus the adaptation requests it found; `resolve`
//! runs the engine and prints every binding, `check` prints diagnostics only.
//!
//! Exit codes: 0 = success, 1 = internal resolver fault, 2 = the run
//! produced error diagnostics, 3 = the manifest could not be read or loaded.

mod error;
mod manifest;
mod report;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use shimr_resolve::Resolver;

use error::CliError;
use report::Report;

/// Environment variable naming the default manifest.
const MANIFEST_ENV: &str = "SHIMR_MANIFEST";

/// Shim contract resolver.
#[derive(Parser)]
#[command(name = "shimr", about = "Resolve shim contracts against their targets")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve all contracts and print the bindings.
    Resolve {
        /// Path to the manifest (default: $SHIMR_MANIFEST).
        #[arg(short, long)]
        manifest: Option<PathBuf>,

        /// Resolve contracts of each pass in parallel.
        #[arg(long)]
        parallel: bool,

        /// Output format.
        #[arg(short, long, value_enum, default_value_t = Format::Json)]
        format: Format,
    },
    /// Resolve and report diagnostics only.
    Check {
        /// Path to the manifest (default: $SHIMR_MANIFEST).
        #[arg(short, long)]
        manifest: Option<PathBuf>,

        /// Output format.
        #[arg(short, long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Json,
    Text,
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let exit_code = match cli.command {
        Commands::Resolve {
            manifest,
            parallel,
            format,
        } => run(manifest, parallel, format, false),
        Commands::Check { manifest, format } => run(manifest, false, format, true),
    };
    process::exit(exit_code);
}

fn manifest_path(flag: Option<PathBuf>) -> Result<PathBuf, CliError> {
    match flag {
        Some(path) => Ok(path),
        None => std::env::var(MANIFEST_ENV)
            .map(PathBuf::from)
            .map_err(|_| CliError::NoManifest),
    }
}

fn run(manifest: Option<PathBuf>, parallel: bool, format: Format, check_only: bool) -> i32 {
    match execute(manifest, parallel, check_only) {
        Ok(report) => {
            let output = match format {
                Format::Json => serde_json::to_string_pretty(&report).unwrap_or_else(|e| {
                    format!("{{\"error\": \"failed to serialize report: {}\"}}", e)
                }),
                Format::Text => report.to_text(),
            };
            println!("{}", output.trim_end());
            if report.has_errors() {
                2
            } else {
                0
            }
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            e.exit_code()
        }
    }
}

fn execute(manifest: Option<PathBuf>, parallel: bool, check_only: bool) -> Result<Report, CliError> {
    let path = manifest_path(manifest)?;
    let loaded = manifest::read(&path)?.load()?;

    let mut options = loaded.options;
    options.parallel |= parallel;

    let resolution = Resolver::new(&loaded.registry, options).resolve()?;
    let report = Report::build(&resolution, loaded.catalog.as_ref())?;
    Ok(if check_only {
        report.diagnostics_only()
    } else {
        report
    })
}
