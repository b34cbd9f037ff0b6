//! Database-level rules

use std::sync::Arc;

use sqlparser::ast::{ObjectType, Statement};

use crate::ast::{object_base_name, Node};
use crate::code::Code;
use crate::context::ReviewContext;
use crate::error::ReviewError;
use crate::rule::{BaseRule, Rule, RuleConfig, RuleType};
use crate::schema::SchemaSnapshot;

/// DROP DATABASE is only allowed for the current database, and only once it
/// holds no tables.
pub struct DropEmptyDatabaseRule {
    base: BaseRule,
    current_database: Option<String>,
    snapshot: Option<Arc<SchemaSnapshot>>,
}

impl DropEmptyDatabaseRule {
    pub fn new(
        base: BaseRule,
        current_database: Option<String>,
        snapshot: Option<Arc<SchemaSnapshot>>,
    ) -> Self {
        Self {
            base,
            current_database,
            snapshot,
        }
    }

    pub fn build(config: &RuleConfig, ctx: &ReviewContext) -> Result<Box<dyn Rule>, ReviewError> {
        Ok(Box::new(Self::new(
            config.base_rule(),
            ctx.current_database().map(str::to_string),
            ctx.snapshot.clone(),
        )))
    }
}

impl Rule for DropEmptyDatabaseRule {
    fn name(&self) -> &'static str {
        RuleType::DatabaseDropEmptyDatabase.as_str()
    }

    fn on_enter(&mut self, node: &Node<'_>) -> Result<(), ReviewError> {
        let Some(Statement::Drop {
            object_type: ObjectType::Database,
            names,
            ..
        }) = node.statement()
        else {
            return Ok(());
        };

        for name in names {
            let database = object_base_name(name);
            if let Some(current) = &self.current_database {
                if !current.eq_ignore_ascii_case(&database) {
                    let content = format!(
                        "Database `{}` that is trying to be deleted is not the current database `{}`",
                        database, current
                    );
                    self.base.report(Code::NotCurrentDatabase, content, node);
                    continue;
                }
            }
            if self.snapshot.as_ref().is_some_and(|s| !s.has_no_table()) {
                let content = format!(
                    "Database `{}` is not allowed to drop if not empty",
                    database
                );
                self.base.report(Code::DatabaseNotEmpty, content, node);
            }
        }
        Ok(())
    }

    base_rule_accessors!();
}
