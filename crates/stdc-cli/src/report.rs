//! JSON sidecar for a finished conversion.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use stdc_format::ConversionReport;

pub fn write_report(path: &Path, report: &ConversionReport) -> Result<()> {
    let json = serde_json::to_string_pretty(report).context("Failed to serialize conversion report")?;
    fs::write(path, json + "\n")
        .with_context(|| format!("Failed to write report to {}", path.display()))?;
    tracing::info!("report written to {}", path.display());
    Ok(())
}
