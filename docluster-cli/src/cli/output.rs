//! Report files and the human-readable summary.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::Path;

use docluster_core::ClusteringReport;
use tracing::{info, instrument};

use super::commands::{CliError, ExecutionSummary};

/// Number of cluster sizes listed in the summary.
pub const TOP_CLUSTER_SIZES: usize = 10;

/// Writes `report` to `path` as pretty-printed JSON, creating parent
/// directories as needed.
///
/// # Errors
/// Returns [`CliError::Io`] when the file cannot be created or written and
/// [`CliError::Serialize`] when encoding fails.
#[instrument(name = "cli.write_report", err, skip(report), fields(path = %path.display()))]
pub fn write_report(path: &Path, report: &ClusteringReport) -> Result<(), CliError> {
    let io_error = |source| CliError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_error)?;
    }
    let mut writer = BufWriter::new(File::create(path).map_err(io_error)?);
    serde_json::to_writer_pretty(&mut writer, report).map_err(|source| CliError::Serialize {
        path: path.to_path_buf(),
        source,
    })?;
    writeln!(writer).map_err(io_error)?;
    writer.flush().map_err(io_error)?;
    info!("report written");
    Ok(())
}

/// Renders `summary` to `writer`.
///
/// A report that was not saved to a file is printed as JSON so stdout stays
/// machine-readable; otherwise a short human summary is printed.
///
/// # Errors
/// Returns [`io::Error`] if writing to the supplied writer fails.
pub fn render_summary(summary: &ExecutionSummary, mut writer: impl Write) -> io::Result<()> {
    match summary {
        ExecutionSummary::Report {
            report,
            output: None,
            ..
        } => {
            serde_json::to_writer_pretty(&mut writer, report.as_ref())?;
            writeln!(writer)
        }
        ExecutionSummary::Report {
            report,
            output: Some(path),
            viewer,
        } => {
            render_statistics(report, &mut writer)?;
            writeln!(writer)?;
            writeln!(writer, "results saved to: {}", path.display())?;
            if let Some(viewer) = viewer {
                writeln!(writer, "tree viewer saved to: {}", viewer.display())?;
            }
            Ok(())
        }
        ExecutionSummary::Viewer { output } => {
            writeln!(writer, "tree viewer saved to: {}", output.display())
        }
    }
}

fn render_statistics(report: &ClusteringReport, writer: &mut impl Write) -> io::Result<()> {
    writeln!(writer, "user: {}", report.user_id)?;
    writeln!(writer, "total documents: {}", report.total_documents)?;
    writeln!(writer, "total clusters: {}", report.total_clusters)?;
    writeln!(writer, "noise documents: {}", report.noise_count)?;
    if let Some(count) = report.multi_cluster_count {
        writeln!(writer, "multi-cluster documents: {count}")?;
    }

    let parameters = &report.parameters;
    writeln!(writer, "parameters:")?;
    writeln!(writer, "  min_cluster_size: {}", parameters.min_cluster_size)?;
    writeln!(writer, "  min_samples: {}", parameters.min_samples)?;
    writeln!(writer, "  metric: {}", parameters.metric)?;
    if let Some(threshold) = parameters.majority_threshold {
        writeln!(writer, "  majority_threshold: {threshold}")?;
    }

    let sizes = report.cluster_sizes();
    if sizes.is_empty() {
        return Ok(());
    }
    writeln!(writer, "cluster sizes:")?;
    for (rank, size) in sizes.iter().take(TOP_CLUSTER_SIZES).enumerate() {
        writeln!(writer, "  #{}: {size} documents", rank + 1)?;
    }
    let rest = sizes.len().saturating_sub(TOP_CLUSTER_SIZES);
    if rest > 0 {
        writeln!(writer, "  ... and {rest} more clusters")?;
    }
    Ok(())
}
