//! Review façade

use tracing::{debug, info};

use crate::advice::{sort_by_status, Advice, AdviceStatus, Position};
use crate::checker::Checker;
use crate::code::Code;
use crate::context::ReviewContext;
use crate::error::ReviewError;
use crate::parser::{parse_script, Statement};
use crate::rule::{RuleConfig, RuleRegistry};
use crate::schema::SnapshotBuilder;

/// Title of the advice returned for a script that does not parse
pub const SYNTAX_ERROR_TITLE: &str = "Syntax error";

/// Reviews SQL scripts against a policy
pub struct Reviewer<'r> {
    registry: &'r RuleRegistry,
    context: ReviewContext,
}

impl<'r> Reviewer<'r> {
    pub fn new(registry: &'r RuleRegistry, context: ReviewContext) -> Self {
        Self { registry, context }
    }

    pub fn context(&self) -> &ReviewContext {
        &self.context
    }

    /// Review `sql` with every applicable rule of `rules`.
    ///
    /// An empty result means no violations. A script that does not parse
    /// yields exactly one syntax-error advice and no rule runs; so does a
    /// script with a statement that cannot apply to the schema.
    pub fn review(&self, sql: &str, rules: &[RuleConfig]) -> Result<Vec<Advice>, ReviewError> {
        let statements = match parse_script(sql, self.context.engine) {
            Ok(statements) => statements,
            Err(err) => {
                debug!(line = err.line, "script does not parse");
                return Ok(vec![Advice::new(
                    AdviceStatus::Error,
                    Code::StatementSyntaxError,
                    SYNTAX_ERROR_TITLE,
                    err.message,
                    Position::line(err.line.max(1)),
                )]);
            }
        };

        let mut checker = Checker::new();
        for config in rules {
            if !config.applies_to(self.context.engine) {
                debug!(rule = %config.rule_type, "rule does not apply, skipping");
                continue;
            }
            if let Some(rule) = self.registry.build(config, &self.context)? {
                checker.register(rule);
            }
        }
        if checker.is_empty() {
            return Ok(Vec::new());
        }
        if let Some(advice) = self.walk_through(&statements) {
            return Ok(vec![advice]);
        }
        info!(
            statements = statements.len(),
            rules = checker.len(),
            engine = %self.context.engine,
            "reviewing script"
        );

        checker.check(&statements)?;
        let mut advice = checker.advice_list();
        sort_by_status(&mut advice);
        Ok(advice)
    }

    /// Replay the script on the known schema. The first statement that
    /// cannot apply is reported.
    fn walk_through(&self, statements: &[Statement]) -> Option<Advice> {
        let engine = self.context.engine;
        let mut builder = match &self.context.snapshot {
            Some(snapshot) => {
                let mut snapshot = (**snapshot).clone();
                if let Some(database) = &self.context.current_database {
                    snapshot.name = database.clone();
                }
                SnapshotBuilder::from_snapshot(engine, snapshot)
            }
            None => SnapshotBuilder::partial(
                engine,
                self.context.current_database().unwrap_or_default(),
            ),
        };

        for statement in statements {
            if let Err(err) = builder.apply(&statement.ast) {
                let line = statement.base_line + 1;
                debug!(line, error = %err, "statement conflicts with the schema");
                return Some(Advice::new(
                    AdviceStatus::Error,
                    err.code(),
                    err.title(),
                    err.to_string(),
                    Position::line(line),
                ));
            }
        }
        None
    }
}
