//! `tether-gen generate`: write proxy sources.

use std::path::Path;

use anyhow::{Context, Result};
use tether_codegen::{EmitOptions, Generator};
use tracing::info;

use super::{load_report, print_diagnostics};

/// Generate proxies for `decls` into `out`.
///
/// Proxies of valid declarations are written even when others fail.
/// Returns `false` when any declaration is invalid.
pub(crate) fn run_generate(decls: &Path, out: &Path, options: EmitOptions) -> Result<bool> {
    let report = load_report(&Generator::new(options), decls)?;
    print_diagnostics(&report);

    let written = report
        .write_to(out)
        .with_context(|| format!("Failed to write proxies to {}", out.display()))?;
    for path in &written {
        println!("wrote {}", path.display());
    }
    info!(
        written = written.len(),
        errors = report.errors().count(),
        warnings = report.warnings().count(),
        "Generation finished"
    );
    Ok(report.is_success())
}
