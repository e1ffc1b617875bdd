//! Command-line interface for docluster.
//!
//! `documents` clusters pooled document vectors, `chunks` clusters chunk
//! vectors and places documents by majority vote, and `viewer` renders an
//! HTML tree viewer from a saved report.

mod commands;
mod output;

pub use commands::{
    ChunksCommand, Cli, CliError, ClusterArgs, Command, ExecutionSummary, MetricArg, StoreArgs,
    ViewerCommand, run_cli,
};
pub use output::{TOP_CLUSTER_SIZES, render_summary, write_report};
