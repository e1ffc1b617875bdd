//! Self-contained HTML viewer for the cluster tree.
//!
//! The page embeds the report's `tree` and `clusters` objects as JavaScript
//! literals. Parent nodes list the documents of their exclusive clusters and
//! leaves list the documents of all their final clusters.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use docluster_core::ClusteringReport;
use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{info, instrument, warn};

const TEMPLATE: &str = include_str!("template.html");
const TREE_MARKER: &str = "__DOCLUSTER_TREE__";
const CLUSTERS_MARKER: &str = "__DOCLUSTER_CLUSTERS__";

/// Errors raised while rendering or writing the viewer.
#[derive(Debug, Error)]
pub enum ViewerError {
    /// The input report could not be read.
    #[error("failed to read `{path}`: {source}")]
    Read {
        /// Report path.
        path: PathBuf,
        /// Underlying operating system error.
        #[source]
        source: io::Error,
    },
    /// The input report is not valid JSON.
    #[error("invalid JSON in `{path}`: {source}")]
    Parse {
        /// Report path.
        path: PathBuf,
        /// Underlying decoder error.
        #[source]
        source: serde_json::Error,
    },
    /// The page could not be written.
    #[error("failed to write `{path}`: {source}")]
    Write {
        /// Destination path.
        path: PathBuf,
        /// Underlying operating system error.
        #[source]
        source: io::Error,
    },
    /// Embedded data could not be encoded.
    #[error("failed to encode viewer data: {0}")]
    Encode(#[from] serde_json::Error),
    /// The bundled template lacks a data marker.
    #[error("viewer template is missing the `{marker}` marker")]
    Template {
        /// The absent marker.
        marker: &'static str,
    },
}

impl ViewerError {
    /// Returns the stable machine-readable code for this error.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Read { .. } => "VIEWER_READ_FAILED",
            Self::Parse { .. } => "VIEWER_INVALID_REPORT",
            Self::Write { .. } => "VIEWER_WRITE_FAILED",
            Self::Encode(_) => "VIEWER_ENCODE_FAILED",
            Self::Template { .. } => "VIEWER_TEMPLATE_INVALID",
        }
    }
}

/// Encodes `value` for a `<script>` element.
///
/// `</` is written as `<\/` so no string in the data can close the element.
///
/// # Errors
/// Returns [`ViewerError::Encode`] if `value` cannot be serialised.
pub fn script_json(value: &Value) -> Result<String, ViewerError> {
    Ok(serde_json::to_string_pretty(value)?.replace("</", "<\\/"))
}

/// Renders the viewer page for a `tree` object and a `clusters` map.
///
/// # Errors
/// Returns [`ViewerError`] when encoding fails.
///
/// # Examples
/// ```
/// use docluster_cli::viewer::render_viewer;
/// use serde_json::json;
///
/// let html = render_viewer(&json!({"tree": []}), &json!({})).expect("renders");
/// assert!(html.starts_with("<!DOCTYPE html>"));
/// ```
pub fn render_viewer(tree: &Value, clusters: &Value) -> Result<String, ViewerError> {
    let (head, rest) = TEMPLATE
        .split_once(TREE_MARKER)
        .ok_or(ViewerError::Template {
            marker: TREE_MARKER,
        })?;
    let (middle, tail) = rest
        .split_once(CLUSTERS_MARKER)
        .ok_or(ViewerError::Template {
            marker: CLUSTERS_MARKER,
        })?;
    let tree_json = script_json(tree)?;
    let clusters_json = script_json(clusters)?;

    let mut page = String::with_capacity(TEMPLATE.len() + tree_json.len() + clusters_json.len());
    page.push_str(head);
    page.push_str(&tree_json);
    page.push_str(middle);
    page.push_str(&clusters_json);
    page.push_str(tail);
    Ok(page)
}

/// Picks the `tree` and `clusters` objects out of a report.
///
/// Missing sections are logged and replaced by empty objects so the page
/// still renders.
#[must_use]
pub fn viewer_data(report: &Value) -> (Value, Value) {
    let section = |name: &str| {
        report.get(name).cloned().unwrap_or_else(|| {
            warn!(section = name, "report section missing; the viewer will be empty");
            Value::Object(Map::new())
        })
    };
    (section("tree"), section("clusters"))
}

/// Renders and writes the viewer for a report held in memory.
///
/// # Errors
/// Returns [`ViewerError`] when encoding or writing fails.
pub fn write_report_viewer(report: &ClusteringReport, output: &Path) -> Result<(), ViewerError> {
    let value = serde_json::to_value(report)?;
    write_viewer(&value, output)
}

/// Reads a saved report from `input` and writes its viewer to `output`.
///
/// # Errors
/// Returns [`ViewerError::Read`] or [`ViewerError::Parse`] for an unreadable
/// report and [`ViewerError::Write`] when the page cannot be written.
#[instrument(
    name = "viewer.render_file",
    err,
    skip_all,
    fields(input = %input.display(), output = %output.display()),
)]
pub fn render_report_file(input: &Path, output: &Path) -> Result<(), ViewerError> {
    let raw = fs::read_to_string(input).map_err(|source| ViewerError::Read {
        path: input.to_path_buf(),
        source,
    })?;
    let report = parse_report(&raw).map_err(|source| ViewerError::Parse {
        path: input.to_path_buf(),
        source,
    })?;
    write_viewer(&report, output)
}

/// Parses a report without a nesting limit; deep cluster trees nest two JSON
/// levels per tree level.
fn parse_report(raw: &str) -> Result<Value, serde_json::Error> {
    let mut json = serde_json::Deserializer::from_str(raw);
    json.disable_recursion_limit();
    let report = Value::deserialize(serde_stacker::Deserializer::new(&mut json))?;
    json.end()?;
    Ok(report)
}

fn write_viewer(report: &Value, output: &Path) -> Result<(), ViewerError> {
    let (tree, clusters) = viewer_data(report);
    let page = render_viewer(&tree, &clusters)?;
    let write_error = |source| ViewerError::Write {
        path: output.to_path_buf(),
        source,
    };
    if let Some(parent) = output.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(write_error)?;
    }
    fs::write(output, page).map_err(write_error)?;
    info!(path = %output.display(), "tree viewer written");
    Ok(())
}
