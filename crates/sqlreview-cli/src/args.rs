//! CLI argument definitions

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "sqlreview")]
#[command(author, version, about = "SQL change review tool")]
#[command(propagate_version = true)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output (repeat for more)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Review SQL scripts against the configured rules
    Check {
        /// SQL files to review (supports glob patterns)
        files: Vec<PathBuf>,

        /// Configuration file (defaults to the nearest sqlreview.toml)
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Database engine
        #[arg(short, long, env = "SQLREVIEW_ENGINE")]
        engine: Option<String>,

        /// DDL files describing the current schema
        #[arg(short, long = "schema", value_name = "FILE")]
        schema: Vec<PathBuf>,

        /// Directory containing schema DDL files
        #[arg(long = "schema-dir", value_name = "DIR")]
        schema_dir: Option<PathBuf>,

        /// Schema snapshot in JSON, as written by `sqlreview snapshot`
        #[arg(long, value_name = "FILE", conflicts_with_all = ["schema", "schema_dir"])]
        snapshot: Option<PathBuf>,

        /// Database the scripts run in
        #[arg(short, long)]
        database: Option<String>,

        /// Output format
        #[arg(short, long, value_enum)]
        format: Option<OutputFormat>,

        /// Rule types to disable (e.g. statement.select.no-select-all)
        #[arg(long, value_name = "RULE")]
        disable: Vec<String>,
    },

    /// List the rule types available for an engine
    Rules {
        /// Database engine
        #[arg(short, long, default_value = "mysql")]
        engine: String,
    },

    /// Build a schema snapshot from DDL and print it as JSON
    Snapshot {
        /// DDL files
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Database engine
        #[arg(short, long, default_value = "mysql")]
        engine: String,

        /// Database name recorded in the snapshot
        #[arg(short, long, default_value = "")]
        database: String,
    },

    /// Parse SQL and display statements with their node tags (for debugging)
    Parse {
        /// SQL file to parse
        file: PathBuf,

        /// Database engine
        #[arg(short, long, default_value = "mysql")]
        engine: String,
    },
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum, Default)]
pub enum OutputFormat {
    /// Human-readable output with colors
    #[default]
    Human,
    /// JSON output
    Json,
    /// SARIF output (for GitHub Code Scanning)
    Sarif,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Human => "human",
            OutputFormat::Json => "json",
            OutputFormat::Sarif => "sarif",
        }
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "human" => Ok(OutputFormat::Human),
            "json" => Ok(OutputFormat::Json),
            "sarif" => Ok(OutputFormat::Sarif),
            other => Err(format!(
                "Unknown output format: '{}'. Supported formats: human, json, sarif.",
                other
            )),
        }
    }
}
