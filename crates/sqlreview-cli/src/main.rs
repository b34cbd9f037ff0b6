//! sqlreview CLI - SQL change review tool

mod args;
mod config;
mod output;

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use miette::{IntoDiagnostic, Result, WrapErr};
use sqlreview_core::ast::{self, Node, Visitor};
use sqlreview_core::parser::parse_script;
use sqlreview_core::{
    AdviceStatus, Engine, ReviewContext, ReviewError, Reviewer, RuleRegistry, SchemaSnapshot,
    SnapshotBuilder,
};

use crate::args::{Args, Command, OutputFormat};
use crate::config::{CheckArgs, Config};
use crate::output::OutputFormatter;

fn main() -> ExitCode {
    let args = Args::parse();

    let level = match (args.quiet, args.verbose) {
        (true, _) => tracing::Level::ERROR,
        (false, 0) => tracing::Level::WARN,
        (false, 1) => tracing::Level::DEBUG,
        (false, _) => tracing::Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .init();

    match run(args) {
        Ok(has_errors) => {
            if has_errors {
                ExitCode::from(1)
            } else {
                ExitCode::SUCCESS
            }
        }
        Err(e) => {
            eprintln!("Error: {:?}", e);
            ExitCode::from(2)
        }
    }
}

fn parse_engine(engine: &str) -> Result<Engine> {
    engine.parse().map_err(|e: String| miette::miette!(e))
}

/// Expand glob patterns; plain paths are kept as they are.
fn expand_patterns(patterns: &[String]) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for pattern in patterns {
        if pattern.contains('*') {
            for path in glob::glob(pattern).into_diagnostic()?.flatten() {
                paths.push(path);
            }
        } else {
            paths.push(PathBuf::from(pattern));
        }
    }
    Ok(paths)
}

fn read(path: &std::path::Path) -> Result<String> {
    fs::read_to_string(path)
        .into_diagnostic()
        .wrap_err_with(|| format!("failed to read {}", path.display()))
}

/// Snapshot from a JSON file, or replayed from schema DDL, if configured.
fn load_snapshot(config: &Config, engine: Engine) -> Result<Option<SchemaSnapshot>> {
    if let Some(path) = &config.snapshot {
        let content = read(std::path::Path::new(path))?;
        let snapshot: SchemaSnapshot = serde_json::from_str(&content)
            .into_diagnostic()
            .wrap_err_with(|| format!("invalid snapshot {}", path))?;
        return Ok(Some(snapshot));
    }

    let mut schema_files = expand_patterns(&config.schema)?;
    if let Some(dir) = &config.schema_dir {
        let pattern = format!("{}/**/*.sql", dir);
        for path in glob::glob(&pattern).into_diagnostic()?.flatten() {
            schema_files.push(path);
        }
    }
    if schema_files.is_empty() {
        return Ok(None);
    }

    let database = config.database.clone().unwrap_or_default();
    let mut builder = SnapshotBuilder::new(engine, database);
    for schema_file in &schema_files {
        builder.parse(&read(schema_file)?);
    }
    if !builder.errors().is_empty() {
        eprintln!(
            "Warning: skipped {} schema statement(s) that could not be parsed",
            builder.errors().len()
        );
    }
    if !builder.conflicts().is_empty() {
        eprintln!(
            "Warning: skipped {} schema statement(s) that conflict with earlier ones",
            builder.conflicts().len()
        );
    }
    Ok(Some(builder.build()))
}

fn run(args: Args) -> Result<bool> {
    match args.command {
        Command::Check {
            files,
            config: config_path,
            engine,
            schema,
            schema_dir,
            snapshot,
            database,
            format,
            disable,
        } => {
            // Load configuration
            let config = if let Some(path) = config_path {
                Config::from_file(&path)?
            } else {
                Config::find_and_load()?.unwrap_or_default()
            };

            // CLI takes precedence
            let config = config.merge_with_args(&CheckArgs {
                files: &files,
                engine: engine.as_deref(),
                schema: &schema,
                schema_dir: schema_dir.as_deref(),
                snapshot: snapshot.as_deref(),
                database: database.as_deref(),
                format,
                disable: &disable,
            });

            let engine = parse_engine(config.engine.as_deref().unwrap_or("mysql"))?;
            let output_format = match &config.format {
                Some(fmt) => fmt.parse().map_err(|e: String| miette::miette!(e))?,
                None => OutputFormat::Human,
            };

            let rules = config.active_rules();
            if rules.is_empty() {
                miette::bail!("No rules configured. Add [[rules]] entries to sqlreview.toml");
            }

            let query_files = expand_patterns(&config.files)?;
            if query_files.is_empty() {
                miette::bail!("No SQL files specified. Use positional arguments or configure in sqlreview.toml");
            }

            let mut context = ReviewContext::new(engine);
            if let Some(snapshot) = load_snapshot(&config, engine)? {
                context = context.with_snapshot(snapshot);
            }
            if let Some(database) = &config.database {
                context = context.with_current_database(database.clone());
            }
            if let Some(count) = config.max_explain_count {
                context = context.with_max_explain_count(count);
            }

            let registry = RuleRegistry::with_defaults();
            let reviewer = Reviewer::new(&registry, context);

            let mut total_errors = 0;
            let mut total_warnings = 0;
            for query_file in &query_files {
                let content = read(query_file)?;
                let advice = reviewer
                    .review(&content, &rules)
                    .map_err(miette::Report::new)?;

                if !advice.is_empty() {
                    let formatter =
                        OutputFormatter::new(output_format, query_file.display().to_string());
                    formatter.print_advice(&advice, &content);
                }
                for item in &advice {
                    match item.status {
                        AdviceStatus::Error => total_errors += 1,
                        AdviceStatus::Warn => total_warnings += 1,
                        AdviceStatus::Success => {}
                    }
                }
            }

            if !args.quiet {
                if total_errors > 0 || total_warnings > 0 {
                    eprintln!();
                    eprintln!(
                        "Found {} error(s), {} warning(s) in {} file(s)",
                        total_errors,
                        total_warnings,
                        query_files.len()
                    );
                } else {
                    eprintln!("All {} file(s) passed review", query_files.len());
                }
            }

            Ok(total_errors > 0)
        }

        Command::Rules { engine } => {
            let engine = parse_engine(&engine)?;
            let registry = RuleRegistry::with_defaults();
            for rule_type in registry.rule_types(engine) {
                println!("{}", rule_type);
            }
            Ok(false)
        }

        Command::Snapshot {
            files,
            engine,
            database,
        } => {
            let engine = parse_engine(&engine)?;
            let mut builder = SnapshotBuilder::new(engine, database);
            for file in &files {
                builder.parse(&read(file)?);
            }
            for error in builder.errors() {
                eprintln!("Skipped statement: {}", error);
            }
            for conflict in builder.conflicts() {
                eprintln!("Skipped statement: {}", conflict);
            }
            let snapshot = builder.build();
            println!(
                "{}",
                serde_json::to_string_pretty(&snapshot).into_diagnostic()?
            );
            Ok(false)
        }

        Command::Parse { file, engine } => {
            let engine = parse_engine(&engine)?;
            let content = read(&file)?;
            let statements = match parse_script(&content, engine) {
                Ok(statements) => statements,
                Err(e) => {
                    eprintln!("Parse error: {}", e);
                    return Ok(true);
                }
            };

            for (i, statement) in statements.iter().enumerate() {
                println!("Statement {} (line {}):", i + 1, statement.base_line + 1);
                let mut printer = TreePrinter::default();
                ast::walk(statement, &mut printer).map_err(miette::Report::new)?;
                println!();
            }
            Ok(false)
        }
    }
}

/// Prints the node tags of a statement as an indented tree
#[derive(Default)]
struct TreePrinter {
    depth: usize,
}

impl Visitor for TreePrinter {
    fn enter(&mut self, node: &Node<'_>) -> std::result::Result<(), ReviewError> {
        println!("{}{} (line {})", "  ".repeat(self.depth + 1), node.tag, node.line);
        self.depth += 1;
        Ok(())
    }

    fn exit(&mut self, _node: &Node<'_>) -> std::result::Result<(), ReviewError> {
        self.depth = self.depth.saturating_sub(1);
        Ok(())
    }
}
