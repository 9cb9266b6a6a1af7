//! `tether-gen check`: validation only.

use std::path::Path;

use anyhow::Result;
use tether_codegen::{EmitOptions, Generator};

use super::{load_report, print_diagnostics};

/// Validate `decls`. Returns `false` when any declaration is invalid.
pub(crate) fn run_check(decls: &Path, options: EmitOptions) -> Result<bool> {
    let report = load_report(&Generator::new(options), decls)?;
    print_diagnostics(&report);

    println!(
        "{} proxies, {} errors, {} warnings",
        report.proxies.len(),
        report.errors().count(),
        report.warnings().count()
    );
    Ok(report.is_success())
}
