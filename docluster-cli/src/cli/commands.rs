//! Command implementations and argument parsing for the docluster CLI.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};
use docluster_core::{
    ChunkStore, ClusteringReport, DEFAULT_BATCH_SIZE, DEFAULT_MAJORITY_THRESHOLD,
    DEFAULT_MIN_CLUSTER_SIZE, DEFAULT_MIN_SAMPLES, DoclusterError, HdbscanBackend,
    MetadataStore, Metric, PipelineConfig, PipelineConfigBuilder, run_chunk_pipeline,
    run_document_pipeline,
};
use docluster_providers_sqlite::SqliteMetadataStore;
use docluster_providers_weaviate::{
    DEFAULT_COLLECTION, DEFAULT_URL, StoreConfig, WeaviateChunkStore,
};
use thiserror::Error;
use tracing::{Span, field, info, instrument, warn};

use super::output::write_report;
use crate::viewer::{self, ViewerError};

const DEFAULT_DB_PATH: &str = "data/docluster.db";
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Top-level CLI options parsed by [`clap`].
#[derive(Debug, Parser, Clone)]
#[command(
    name = "docluster",
    about = "Cluster a user's documents by their chunk embeddings."
)]
pub struct Cli {
    /// Command to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// Supported CLI commands.
#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Cluster documents by the mean of their chunk embeddings.
    Documents(ClusterArgs),
    /// Cluster chunks and assign each document by majority vote.
    Chunks(ChunksCommand),
    /// Render an HTML tree viewer from a saved report.
    Viewer(ViewerCommand),
}

/// Options shared by the clustering commands.
#[derive(Debug, Args, Clone)]
pub struct ClusterArgs {
    /// User whose documents are clustered.
    pub user_id: String,

    /// Smallest group the backend reports as a cluster.
    #[arg(long, default_value_t = DEFAULT_MIN_CLUSTER_SIZE)]
    pub min_cluster_size: usize,

    /// Neighbourhood size used for core distances.
    #[arg(long, default_value_t = DEFAULT_MIN_SAMPLES)]
    pub min_samples: usize,

    /// Distance metric between embeddings.
    #[arg(long, value_enum, default_value_t = MetricArg::Manhattan)]
    pub metric: MetricArg,

    /// Attach the reconstructed cluster tree to the report.
    #[arg(long)]
    pub include_tree: bool,

    /// Write an HTML tree viewer to this path; implies `--include-tree`.
    #[arg(long, value_name = "PATH")]
    pub tree_viewer: Option<PathBuf>,

    /// Write the JSON report to this path instead of stdout.
    #[arg(long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Store connection options.
    #[command(flatten)]
    pub stores: StoreArgs,
}

/// Options accepted by the `chunks` command.
#[derive(Debug, Args, Clone)]
pub struct ChunksCommand {
    /// Options shared with `documents`.
    #[command(flatten)]
    pub cluster: ClusterArgs,

    /// Share of a document's chunks its primary cluster must hold.
    #[arg(long, default_value_t = DEFAULT_MAJORITY_THRESHOLD)]
    pub majority_threshold: f64,
}

/// Metadata and vector store settings.
#[derive(Debug, Args, Clone)]
pub struct StoreArgs {
    /// SQLite database holding the `documents` table.
    #[arg(long, value_name = "PATH", default_value = DEFAULT_DB_PATH)]
    pub db_path: PathBuf,

    /// Weaviate base URL.
    #[arg(long, env = "WEAVIATE_URL", default_value = DEFAULT_URL)]
    pub weaviate_url: String,

    /// Weaviate collection holding chunk objects.
    #[arg(long, default_value = DEFAULT_COLLECTION)]
    pub collection: String,

    /// Named vector space to read instead of the default vector. Required
    /// for collections that only define named vectors.
    #[arg(long)]
    pub vector_name: Option<String>,

    /// Document ids per vector store query.
    #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
    pub batch_size: usize,

    /// Worker threads for the clustering backend; `0` uses every core.
    #[arg(long, default_value_t = 0)]
    pub jobs: usize,

    /// Vector store request timeout in seconds.
    #[arg(long, value_name = "SECONDS", default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout: u64,
}

impl StoreArgs {
    fn weaviate_config(&self) -> StoreConfig {
        StoreConfig {
            url: self.weaviate_url.clone(),
            collection: self.collection.clone(),
            vector_name: self.vector_name.clone(),
            timeout: Duration::from_secs(self.timeout),
        }
    }
}

/// Options accepted by the `viewer` command.
#[derive(Debug, Args, Clone)]
pub struct ViewerCommand {
    /// Report previously written with `--output`.
    pub input: PathBuf,
    /// HTML file to create.
    pub output: PathBuf,
}

/// Distance metrics selectable on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MetricArg {
    /// Straight-line distance.
    Euclidean,
    /// Taxicab distance.
    Manhattan,
    /// One minus cosine similarity.
    Cosine,
}

impl From<MetricArg> for Metric {
    fn from(value: MetricArg) -> Self {
        match value {
            MetricArg::Euclidean => Self::Euclidean,
            MetricArg::Manhattan => Self::Manhattan,
            MetricArg::Cosine => Self::Cosine,
        }
    }
}

/// Errors surfaced while executing CLI commands.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration or pipeline failure.
    #[error(transparent)]
    Core(#[from] DoclusterError),
    /// Writing the report failed.
    #[error("failed to write `{path}`: {source}")]
    Io {
        /// Path that triggered the failure.
        path: PathBuf,
        /// Underlying operating system error.
        #[source]
        source: io::Error,
    },
    /// The report could not be encoded as JSON.
    #[error("failed to encode report for `{path}`: {source}")]
    Serialize {
        /// Destination of the report.
        path: PathBuf,
        /// Underlying encoder error.
        #[source]
        source: serde_json::Error,
    },
    /// Rendering the tree viewer failed.
    #[error(transparent)]
    Viewer(#[from] ViewerError),
}

impl CliError {
    /// Returns the stable machine-readable code for this error.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Core(error) => error.code().as_str(),
            Self::Io { .. } => "CLI_IO_FAILED",
            Self::Serialize { .. } => "CLI_SERIALIZE_FAILED",
            Self::Viewer(error) => error.code(),
        }
    }

    /// Returns the code of the failing store, when a store caused the error.
    #[must_use]
    pub const fn store_code(&self) -> Option<&'static str> {
        match self {
            Self::Core(DoclusterError::DocumentLookup { error, .. }) => {
                Some(error.code().as_str())
            }
            Self::Core(DoclusterError::VectorStore { error }) => Some(error.code().as_str()),
            _ => None,
        }
    }
}

/// Outcome of a successful command.
#[derive(Debug, Clone)]
pub enum ExecutionSummary {
    /// A clustering command finished.
    Report {
        /// The assembled report.
        report: Box<ClusteringReport>,
        /// Where the report was written, if not to stdout.
        output: Option<PathBuf>,
        /// Where the tree viewer was written, if requested.
        viewer: Option<PathBuf>,
    },
    /// The `viewer` command wrote an HTML page.
    Viewer {
        /// The page that was written.
        output: PathBuf,
    },
}

/// Executes the CLI command represented by `cli`.
///
/// # Errors
/// Returns [`CliError`] when validation, a store, the backend, or writing an
/// output file fails.
#[instrument(
    name = "cli.run",
    err,
    skip(cli),
    fields(command = field::Empty),
)]
pub fn run_cli(cli: Cli) -> Result<ExecutionSummary, CliError> {
    let span = Span::current();
    match cli.command {
        Command::Documents(args) => {
            span.record("command", field::display("documents"));
            run_clustering(ClusterMode::Documents, &args, None)
        }
        Command::Chunks(command) => {
            span.record("command", field::display("chunks"));
            run_clustering(
                ClusterMode::Chunks,
                &command.cluster,
                Some(command.majority_threshold),
            )
        }
        Command::Viewer(command) => {
            span.record("command", field::display("viewer"));
            viewer::render_report_file(&command.input, &command.output)?;
            Ok(ExecutionSummary::Viewer {
                output: command.output,
            })
        }
    }
}

/// Which pipeline a clustering command runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum ClusterMode {
    Documents,
    Chunks,
}

fn run_clustering(
    mode: ClusterMode,
    args: &ClusterArgs,
    majority_threshold: Option<f64>,
) -> Result<ExecutionSummary, CliError> {
    let config = pipeline_config(args, majority_threshold)?;
    let metadata = SqliteMetadataStore::new(&args.stores.db_path);
    let chunks = WeaviateChunkStore::new(args.stores.weaviate_config());
    execute_clustering(mode, args, &config, &metadata, &chunks)
}

/// Validates the clustering options into a [`PipelineConfig`].
///
/// `--tree-viewer` without `--include-tree` turns tree extraction on with a
/// warning.
pub(super) fn pipeline_config(
    args: &ClusterArgs,
    majority_threshold: Option<f64>,
) -> Result<PipelineConfig, DoclusterError> {
    let include_tree = args.include_tree || args.tree_viewer.is_some();
    if include_tree && !args.include_tree {
        warn!("--tree-viewer implies --include-tree; enabling tree extraction");
    }
    let mut builder = PipelineConfigBuilder::new(args.user_id.as_str())
        .with_min_cluster_size(args.min_cluster_size)
        .with_min_samples(args.min_samples)
        .with_metric(args.metric.into())
        .with_batch_size(args.stores.batch_size)
        .with_include_tree(include_tree);
    if let Some(threshold) = majority_threshold {
        builder = builder.with_majority_threshold(threshold);
    }
    builder.build()
}

#[instrument(
    name = "cli.cluster",
    err,
    skip(mode, args, config, metadata, chunks),
    fields(
        mode = ?mode,
        metadata_store = metadata.name(),
        chunk_store = chunks.name(),
        jobs = args.stores.jobs,
    ),
)]
pub(super) fn execute_clustering(
    mode: ClusterMode,
    args: &ClusterArgs,
    config: &PipelineConfig,
    metadata: &dyn MetadataStore,
    chunks: &dyn ChunkStore,
) -> Result<ExecutionSummary, CliError> {
    let backend = HdbscanBackend::new().with_jobs(args.stores.jobs);
    let report = match mode {
        ClusterMode::Documents => run_document_pipeline(config, metadata, chunks, &backend)?,
        ClusterMode::Chunks => run_chunk_pipeline(config, metadata, chunks, &backend)?,
    };

    if let Some(path) = &args.output {
        write_report(path, &report)?;
    }
    if let Some(path) = &args.tree_viewer {
        viewer::write_report_viewer(&report, path)?;
    }
    info!(
        documents = report.total_documents,
        clusters = report.total_clusters,
        noise = report.noise_count,
        "command completed"
    );
    Ok(ExecutionSummary::Report {
        report: Box::new(report),
        output: args.output.clone(),
        viewer: args.tree_viewer.clone(),
    })
}
