//! sqlreview-core: SQL review rule engine
//!
//! Parses SQL scripts, walks every statement once, and lets a configurable
//! set of rules report advice (naming conventions, missing WHERE clauses,
//! backward-incompatible DDL, ...) with positions in the original script.
//! Rules may consult a schema snapshot and, for dry runs, a live executor.

pub mod advice;
pub mod ast;
pub mod checker;
pub mod code;
pub mod context;
pub mod dialect;
pub mod error;
pub mod executor;
pub mod naming;
pub mod parser;
pub mod review;
pub mod rule;
pub mod rules;
pub mod schema;
pub mod types;

pub use advice::{Advice, AdviceStatus, Position};
pub use checker::Checker;
pub use code::Code;
pub use context::ReviewContext;
pub use dialect::Engine;
pub use error::{ExecutorError, ReviewError, SyntaxError, WalkThroughError};
pub use executor::{CancelFlag, QueryExecutor};
pub use review::Reviewer;
pub use rule::{Rule, RuleConfig, RuleLevel, RuleRegistry, RuleType};
pub use schema::{QualifiedName, SchemaSnapshot, SnapshotBuilder};
