//! Subcommand implementations.

pub(crate) mod check;
pub(crate) mod generate;
pub(crate) mod name;

use std::path::Path;

use anyhow::{Context, Result};
use tether_codegen::{Generator, GenerationReport};

/// Read `decls` and run the generator over it.
fn load_report(generator: &Generator, decls: &Path) -> Result<GenerationReport> {
    let json = std::fs::read_to_string(decls)
        .with_context(|| format!("Failed to read declarations from {}", decls.display()))?;
    generator
        .generate_json(&json)
        .with_context(|| format!("Invalid declarations file {}", decls.display()))
}

/// Print every diagnostic of `report` to stderr.
fn print_diagnostics(report: &GenerationReport) {
    for diagnostic in &report.diagnostics {
        eprintln!("{diagnostic}");
    }
}
