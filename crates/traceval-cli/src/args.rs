//! CLI argument definitions using clap

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "traceval")]
#[command(about = "traceval - traced dataset evaluation for LLM apps")]
#[command(version)]
pub struct Cli {
    /// Dataset/trace store endpoint
    #[arg(long, env = "TRACEVAL_ENDPOINT")]
    pub endpoint: Option<String>,

    /// Store API key (required for hosted endpoints)
    #[arg(long, env = "TRACEVAL_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Tenant id; resolved from the store's seeded tenant when omitted
    #[arg(long)]
    pub tenant_id: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Manage datasets in the store
    Datasets {
        #[command(subcommand)]
        action: DatasetAction,
    },
    /// Inspect dataset examples
    Examples {
        #[command(subcommand)]
        action: ExampleAction,
    },
    /// Evaluate a model against a dataset
    Run(RunArgs),
}

#[derive(Subcommand)]
pub enum DatasetAction {
    /// List datasets
    List {
        #[arg(long, default_value_t = 100)]
        limit: usize,
    },
    /// Create an empty dataset
    Create {
        name: String,
        #[arg(long, default_value = "")]
        description: String,
    },
    /// Delete a dataset by name
    Delete { name: String },
    /// Upload a CSV of examples as a new dataset
    Upload {
        file: PathBuf,
        #[arg(long, default_value = "")]
        description: String,
        /// Columns forming each example's input payload
        #[arg(long, value_delimiter = ',', required = true)]
        input_keys: Vec<String>,
        /// Columns forming each example's expected output
        #[arg(long, value_delimiter = ',')]
        output_keys: Vec<String>,
    },
}

#[derive(Subcommand)]
pub enum ExampleAction {
    /// List the examples of a dataset
    List { dataset: String },
}

#[derive(Args)]
pub struct RunArgs {
    /// Dataset to evaluate against
    pub dataset: String,

    /// Model name at the OpenAI-compatible endpoint
    #[arg(long)]
    pub model: String,

    /// Base URL of the model endpoint
    #[arg(long, env = "OPENAI_BASE_URL", default_value = "https://api.openai.com/v1")]
    pub model_url: String,

    /// API key for the model endpoint
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub model_api_key: Option<String>,

    /// Send each example's 'prompt' field to the completion API instead of
    /// treating its 'messages' field as a chat transcript
    #[arg(long)]
    pub completion: bool,

    /// Simultaneous evaluations
    #[arg(long, default_value_t = 5)]
    pub concurrency: usize,

    /// Times each example is evaluated
    #[arg(long, default_value_t = 1)]
    pub repetitions: usize,

    /// Session label to record traces under
    #[arg(long)]
    pub session: Option<String>,

    /// Evaluate one example at a time with a single tracer
    #[arg(long)]
    pub sequential: bool,

    /// Log per-example progress
    #[arg(long, short)]
    pub verbose: bool,

    /// Write the full result map as JSON to this file
    #[arg(long)]
    pub output: Option<PathBuf>,
}
