//! Configuration file handling

use miette::{IntoDiagnostic, Result, WrapErr};
use serde::{Deserialize, Serialize};
use sqlreview_core::RuleConfig;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = "sqlreview.toml";

/// Configuration for sqlreview
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Database engine (mysql, tidb, mariadb, postgres)
    #[serde(default)]
    pub engine: Option<String>,

    /// Script file patterns to review
    #[serde(default)]
    pub files: Vec<String>,

    /// Schema DDL file paths or patterns
    #[serde(default)]
    pub schema: Vec<String>,

    /// Schema directory
    #[serde(default)]
    pub schema_dir: Option<String>,

    /// Schema snapshot JSON file
    #[serde(default)]
    pub snapshot: Option<String>,

    /// Database the scripts run in
    #[serde(default)]
    pub database: Option<String>,

    /// Output format (human, json, sarif)
    #[serde(default)]
    pub format: Option<String>,

    /// Rule types to disable (e.g., ["statement.select.no-select-all"])
    #[serde(default)]
    pub disable: Vec<String>,

    /// Cap on EXPLAIN calls per review
    #[serde(default)]
    pub max_explain_count: Option<usize>,

    /// Review policy
    #[serde(default)]
    pub rules: Vec<RuleConfig>,
}

/// Values given on the command line for `check`
#[derive(Debug, Default)]
pub struct CheckArgs<'a> {
    pub files: &'a [PathBuf],
    pub engine: Option<&'a str>,
    pub schema: &'a [PathBuf],
    pub schema_dir: Option<&'a Path>,
    pub snapshot: Option<&'a Path>,
    pub database: Option<&'a str>,
    pub format: Option<crate::args::OutputFormat>,
    pub disable: &'a [String],
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .into_diagnostic()
            .wrap_err_with(|| format!("failed to read {}", path.display()))?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        toml::from_str(contents).into_diagnostic()
    }

    /// Try to find and load sqlreview.toml in current directory or parent directories
    pub fn find_and_load() -> Result<Option<Self>> {
        let mut current_dir = std::env::current_dir().into_diagnostic()?;

        loop {
            let config_path = current_dir.join(CONFIG_FILE_NAME);
            if config_path.exists() {
                tracing::debug!(path = %config_path.display(), "loading configuration");
                return Ok(Some(Self::from_file(&config_path)?));
            }

            // Try parent directory
            if !current_dir.pop() {
                break;
            }
        }

        Ok(None)
    }

    /// Merge CLI arguments into configuration
    /// CLI arguments take precedence over config file values
    pub fn merge_with_args(mut self, args: &CheckArgs<'_>) -> Self {
        if !args.files.is_empty() {
            self.files = args.files.iter().map(|p| p.display().to_string()).collect();
        }

        if let Some(engine) = args.engine {
            self.engine = Some(engine.to_string());
        }

        if !args.schema.is_empty() {
            self.schema = args.schema.iter().map(|p| p.display().to_string()).collect();
        }

        if let Some(dir) = args.schema_dir {
            self.schema_dir = Some(dir.display().to_string());
        }

        if let Some(snapshot) = args.snapshot {
            self.snapshot = Some(snapshot.display().to_string());
        }

        if let Some(database) = args.database {
            self.database = Some(database.to_string());
        }

        if let Some(fmt) = args.format {
            self.format = Some(fmt.as_str().to_string());
        }

        if !args.disable.is_empty() {
            self.disable = args.disable.to_vec();
        }

        self
    }

    /// Configured rules minus the disabled ones.
    pub fn active_rules(&self) -> Vec<RuleConfig> {
        self.rules
            .iter()
            .filter(|rule| !self.disable.contains(&rule.rule_type))
            .cloned()
            .collect()
    }
}
