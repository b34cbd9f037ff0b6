//! Table-level rules

use std::sync::Arc;

use sqlparser::ast::{AlterTableOperation, ColumnOption, ObjectType, Statement, TableConstraint};

use super::table_name;
use crate::ast::{object_base_name, Node, NodeData, NodeTag};
use crate::code::Code;
use crate::context::ReviewContext;
use crate::error::ReviewError;
use crate::rule::payload::NumberPayload;
use crate::rule::{BaseRule, Rule, RuleConfig, RuleType};
use crate::schema::SchemaSnapshot;

/// Every table needs a primary key.
pub struct RequirePrimaryKeyRule {
    base: BaseRule,
    snapshot: Option<Arc<SchemaSnapshot>>,
}

impl RequirePrimaryKeyRule {
    pub fn new(base: BaseRule, snapshot: Option<Arc<SchemaSnapshot>>) -> Self {
        Self { base, snapshot }
    }

    pub fn build(config: &RuleConfig, ctx: &ReviewContext) -> Result<Box<dyn Rule>, ReviewError> {
        Ok(Box::new(Self::new(config.base_rule(), ctx.snapshot.clone())))
    }

    fn missing(&mut self, table: &str, node: &Node<'_>) {
        self.base.report(
            Code::TableNoPk,
            format!("Table `{}` requires PRIMARY KEY", table),
            node,
        );
    }

    /// Whether dropping `columns` removes every column of the snapshot's
    /// primary key.
    fn drops_primary_key(&self, table: &sqlparser::ast::ObjectName, columns: &[String]) -> bool {
        let Some(snapshot) = &self.snapshot else {
            return false;
        };
        let Some(pk) = snapshot
            .get_table(&table_name(table))
            .and_then(|t| t.primary_key())
        else {
            return false;
        };
        !pk.expressions.is_empty()
            && pk
                .expressions
                .iter()
                .all(|e| columns.iter().any(|c| c.eq_ignore_ascii_case(e)))
    }
}

impl Rule for RequirePrimaryKeyRule {
    fn name(&self) -> &'static str {
        RuleType::TableRequirePk.as_str()
    }

    fn on_enter(&mut self, node: &Node<'_>) -> Result<(), ReviewError> {
        let Some(statement) = node.statement() else {
            return Ok(());
        };
        match statement {
            Statement::CreateTable(create) if create.query.is_none() && create.like.is_none() => {
                let inline_pk = create.columns.iter().any(|c| {
                    c.options
                        .iter()
                        .any(|o| matches!(o.option, ColumnOption::Unique { is_primary: true, .. }))
                });
                let constraint_pk = create
                    .constraints
                    .iter()
                    .any(|c| matches!(c, TableConstraint::PrimaryKey { .. }));
                if !inline_pk && !constraint_pk {
                    self.missing(&object_base_name(&create.name), node);
                }
            }
            Statement::AlterTable {
                name, operations, ..
            } => {
                let dropped: Vec<String> = operations
                    .iter()
                    .filter_map(|op| match op {
                        AlterTableOperation::DropColumn { column_name, .. } => {
                            Some(column_name.value.clone())
                        }
                        _ => None,
                    })
                    .collect();
                let drops_pk = operations
                    .iter()
                    .any(|op| matches!(op, AlterTableOperation::DropPrimaryKey));
                let adds_pk = operations.iter().any(|op| {
                    matches!(
                        op,
                        AlterTableOperation::AddConstraint(TableConstraint::PrimaryKey { .. })
                    )
                });
                if !adds_pk && (drops_pk || self.drops_primary_key(name, &dropped)) {
                    self.missing(&object_base_name(name), node);
                }
            }
            _ => {}
        }
        Ok(())
    }

    base_rule_accessors!();
}

/// Foreign keys are not allowed.
pub struct NoForeignKeyRule {
    base: BaseRule,
}

impl NoForeignKeyRule {
    pub fn new(base: BaseRule) -> Self {
        Self { base }
    }

    pub fn build(config: &RuleConfig, _: &ReviewContext) -> Result<Box<dyn Rule>, ReviewError> {
        Ok(Box::new(Self::new(config.base_rule())))
    }
}

impl Rule for NoForeignKeyRule {
    fn name(&self) -> &'static str {
        RuleType::TableNoForeignKey.as_str()
    }

    fn on_enter(&mut self, node: &Node<'_>) -> Result<(), ReviewError> {
        let table = match node.data {
            NodeData::Constraint {
                table,
                constraint: TableConstraint::ForeignKey { .. },
            } => table,
            NodeData::Column { table, column }
                if column
                    .options
                    .iter()
                    .any(|o| matches!(o.option, ColumnOption::ForeignKey { .. })) =>
            {
                table
            }
            _ => return Ok(()),
        };
        self.base.report(
            Code::TableHasFk,
            format!(
                "Foreign key is not allowed in the table `{}`",
                object_base_name(table)
            ),
            node,
        );
        Ok(())
    }

    base_rule_accessors!();
}

/// DDL on tables larger than a row limit locks them for too long.
pub struct TableLimitSizeRule {
    base: BaseRule,
    max_rows: i64,
    snapshot: Option<Arc<SchemaSnapshot>>,
}

impl TableLimitSizeRule {
    pub fn new(base: BaseRule, max_rows: i64, snapshot: Option<Arc<SchemaSnapshot>>) -> Self {
        Self {
            base,
            max_rows,
            snapshot,
        }
    }

    pub fn build(config: &RuleConfig, ctx: &ReviewContext) -> Result<Box<dyn Rule>, ReviewError> {
        let payload: NumberPayload = config.decode_payload()?;
        Ok(Box::new(Self::new(
            config.base_rule(),
            payload.number,
            ctx.snapshot.clone(),
        )))
    }

    fn check(&mut self, table: &sqlparser::ast::ObjectName, node: &Node<'_>) {
        let Some(snapshot) = &self.snapshot else {
            return;
        };
        let Some(metadata) = snapshot.get_table(&table_name(table)) else {
            return;
        };
        if metadata.row_count > self.max_rows {
            let content = format!(
                "Apply DDL on large table `{}` ( {} rows ) will lock table for a long time",
                object_base_name(table),
                metadata.row_count
            );
            self.base.report(Code::TableExceedLimitSize, content, node);
        }
    }
}

impl Rule for TableLimitSizeRule {
    fn name(&self) -> &'static str {
        RuleType::TableLimitSize.as_str()
    }

    fn on_enter(&mut self, node: &Node<'_>) -> Result<(), ReviewError> {
        if !matches!(node.tag, NodeTag::AlterTable | NodeTag::DropTable) {
            return Ok(());
        }
        match node.statement() {
            Some(Statement::AlterTable { name, .. }) => self.check(name, node),
            Some(Statement::Drop {
                object_type: ObjectType::Table,
                names,
                ..
            }) => {
                for name in names {
                    self.check(name, node);
                }
            }
            _ => {}
        }
        Ok(())
    }

    base_rule_accessors!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::Engine;
    use crate::rule::RuleLevel;
    use crate::rules::test_support::{check, codes};
    use crate::schema::SnapshotBuilder;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn snapshot_context(ddl: &str) -> ReviewContext {
        let mut builder = SnapshotBuilder::new(Engine::MySql, "app");
        builder.parse(ddl);
        ReviewContext::new(Engine::MySql).with_snapshot(builder.build())
    }

    #[test]
    fn test_require_pk_on_create() {
        let advice = check(
            "CREATE TABLE a (id INT PRIMARY KEY);\nCREATE TABLE b (id INT, PRIMARY KEY (id));\nCREATE TABLE c (id INT);",
            RuleConfig::new(RuleType::TableRequirePk, RuleLevel::Error),
            &ReviewContext::new(Engine::MySql),
        );
        assert_eq!(codes(&advice), vec![601]);
        assert_eq!(advice[0].content, "Table `c` requires PRIMARY KEY");
        assert_eq!(advice[0].position.line, 3);
    }

    #[test]
    fn test_require_pk_on_drop_primary_key() {
        let advice = check(
            "ALTER TABLE a DROP PRIMARY KEY",
            RuleConfig::new(RuleType::TableRequirePk, RuleLevel::Error),
            &ReviewContext::new(Engine::MySql),
        );
        assert_eq!(codes(&advice), vec![601]);
    }

    #[test]
    fn test_require_pk_on_dropping_pk_column() {
        let context = snapshot_context("CREATE TABLE a (id INT PRIMARY KEY, v INT);");
        let advice = check(
            "ALTER TABLE a DROP COLUMN v;\nALTER TABLE a DROP COLUMN id;",
            RuleConfig::new(RuleType::TableRequirePk, RuleLevel::Error),
            &context,
        );
        assert_eq!(codes(&advice), vec![601]);
        assert_eq!(advice[0].position.line, 2);
    }

    #[test]
    fn test_no_foreign_key() {
        let advice = check(
            "CREATE TABLE a (id INT, b_id INT, FOREIGN KEY (b_id) REFERENCES b (id));\nALTER TABLE a ADD CONSTRAINT fk FOREIGN KEY (b_id) REFERENCES b (id);\nCREATE TABLE c (id INT);",
            RuleConfig::new(RuleType::TableNoForeignKey, RuleLevel::Warning),
            &ReviewContext::new(Engine::MySql),
        );
        assert_eq!(codes(&advice), vec![602, 602]);
        assert_eq!(advice[1].position.line, 2);
    }

    #[test]
    fn test_limit_size() {
        let mut snapshot = SchemaSnapshot::new("app");
        let schema = snapshot.schema_mut("");
        schema.tables.insert(
            "big".to_string(),
            crate::schema::TableMetadata {
                row_count: 5_000_000,
                ..Default::default()
            },
        );
        schema.tables.insert(
            "small".to_string(),
            crate::schema::TableMetadata {
                row_count: 10,
                ..Default::default()
            },
        );
        let context = ReviewContext::new(Engine::MySql).with_snapshot(snapshot);
        let advice = check(
            "ALTER TABLE small ADD COLUMN c INT;\nALTER TABLE big ADD COLUMN c INT;\nDROP TABLE big;\nDROP TABLE missing;",
            RuleConfig::new(RuleType::TableLimitSize, RuleLevel::Warning)
                .with_payload(json!({"number": 1000000})),
            &context,
        );
        assert_eq!(codes(&advice), vec![615, 615]);
        assert_eq!(advice[0].position.line, 2);
        assert!(advice[0].content.contains("( 5000000 rows )"));
    }

    #[test]
    fn test_limit_size_without_snapshot_finds_nothing() {
        let advice = check(
            "DROP TABLE big",
            RuleConfig::new(RuleType::TableLimitSize, RuleLevel::Warning)
                .with_payload(json!({"number": 1})),
            &ReviewContext::new(Engine::MySql),
        );
        assert!(advice.is_empty());
    }
}
