//! Tether Gen - build-time generator for weak subscriber proxies.
//!
//! Reads subscriber declarations as JSON, validates them, and writes one
//! proxy source file per subscriber type. The `#[weak_subscriber]`
//! attribute does the same work inline; this binary serves builds that
//! scan sources themselves.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use tether_codegen::{DEFAULT_RUNTIME_PATH, EmitOptions, Placement};
use tether_telemetry::{LogConfig, LogFormat};

mod commands;

use commands::{check, generate, name};

/// Tether Gen - weak subscriber proxy generator
#[derive(Parser)]
#[command(name = "tether-gen")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format: compact (default), pretty or json
    #[arg(long, global = true, default_value = "compact", env = "TETHER_LOG_FORMAT")]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate proxy sources from a declarations file
    Generate {
        /// JSON array of subscriber declarations
        #[arg(short, long)]
        decls: PathBuf,

        /// Output directory; files land under their package path
        #[arg(short, long)]
        out: PathBuf,

        /// Where the generated files will be included from
        #[arg(long, value_enum, default_value_t = PlacementArg::Crate)]
        placement: PlacementArg,

        /// Path through which generated code reaches the runtime crate
        #[arg(long, default_value = DEFAULT_RUNTIME_PATH)]
        runtime_path: String,
    },

    /// Validate a declarations file without writing anything
    Check {
        /// JSON array of subscriber declarations
        #[arg(short, long)]
        decls: PathBuf,

        /// Where the generated files would be included from
        #[arg(long, value_enum, default_value_t = PlacementArg::Crate)]
        placement: PlacementArg,
    },

    /// Print the proxy type name derived for a subscriber type
    Name {
        /// Fully qualified subscriber type, e.g. `app::ui::Panel`
        qualified: String,

        /// Package (module path) of the type, e.g. `app::ui`
        #[arg(default_value = "")]
        package: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum PlacementArg {
    /// Same module as the subscriber type
    Module,
    /// Anywhere in the subscriber's crate
    Crate,
}

impl From<PlacementArg> for Placement {
    fn from(arg: PlacementArg) -> Self {
        match arg {
            PlacementArg::Module => Self::Module,
            PlacementArg::Crate => Self::Crate,
        }
    }
}

fn emit_options(placement: PlacementArg, runtime_path: Option<String>) -> EmitOptions {
    let options = EmitOptions {
        placement: placement.into(),
        ..EmitOptions::default()
    };
    match runtime_path {
        Some(path) => options.with_runtime_path(path),
        None => options,
    }
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "warn" };
    let log_config = LogConfig::new(level).with_format(cli.log_format);
    if let Err(e) = tether_telemetry::setup_logging(&log_config) {
        eprintln!("Failed to initialize logging: {e}");
    }

    let success = match cli.command {
        Commands::Generate {
            decls,
            out,
            placement,
            runtime_path,
        } => generate::run_generate(&decls, &out, emit_options(placement, Some(runtime_path)))?,
        Commands::Check { decls, placement } => {
            check::run_check(&decls, emit_options(placement, None))?
        },
        Commands::Name { qualified, package } => name::run_name(&qualified, &package)?,
    };

    Ok(if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
