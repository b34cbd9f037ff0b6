//! Column definition rules

use std::collections::HashSet;
use std::sync::Arc;

use sqlparser::ast::{
    AlterColumnOperation, AlterTableOperation, ColumnOption, DataType, Ident, ObjectName,
    Statement, TableConstraint,
};

use super::{column_is_not_null, options_not_null, table_name};
use crate::ast::{object_base_name, Node, NodeData};
use crate::code::Code;
use crate::context::ReviewContext;
use crate::error::ReviewError;
use crate::rule::payload::{CommentConventionPayload, StringArrayPayload};
use crate::rule::{BaseRule, Rule, RuleConfig, RuleType};
use crate::schema::SchemaSnapshot;
use crate::types::{canonical_data_type, same_type};

/// A column as declared by a column definition or a MODIFY/CHANGE item
struct DeclaredColumn<'a> {
    name: &'a Ident,
    data_type: &'a DataType,
    not_null: bool,
    comment: Option<&'a str>,
}

fn comment_of<'a>(options: impl Iterator<Item = &'a ColumnOption>) -> Option<&'a str> {
    options.into_iter().find_map(|o| match o {
        ColumnOption::Comment(comment) => Some(comment.as_str()),
        _ => None,
    })
}

/// Columns a node declares, with the table they belong to.
fn declared_column<'a>(node: &Node<'a>) -> Option<(&'a ObjectName, DeclaredColumn<'a>)> {
    match node.data {
        NodeData::Column { table, column } => Some((
            table,
            DeclaredColumn {
                name: &column.name,
                data_type: &column.data_type,
                not_null: column_is_not_null(column),
                comment: comment_of(column.options.iter().map(|o| &o.option)),
            },
        )),
        NodeData::AlterOperation { table, operation } => match operation {
            AlterTableOperation::ModifyColumn {
                col_name,
                data_type,
                options,
                ..
            } => Some((
                table,
                DeclaredColumn {
                    name: col_name,
                    data_type,
                    not_null: options_not_null(options),
                    comment: comment_of(options.iter()),
                },
            )),
            AlterTableOperation::ChangeColumn {
                new_name,
                data_type,
                options,
                ..
            } => Some((
                table,
                DeclaredColumn {
                    name: new_name,
                    data_type,
                    not_null: options_not_null(options),
                    comment: comment_of(options.iter()),
                },
            )),
            _ => None,
        },
        _ => None,
    }
}

/// Columns named by a PRIMARY KEY constraint of the statement, lowercased.
fn primary_key_columns(statement: &Statement) -> HashSet<String> {
    let constraints: Vec<&TableConstraint> = match statement {
        Statement::CreateTable(create) => create.constraints.iter().collect(),
        Statement::AlterTable { operations, .. } => operations
            .iter()
            .filter_map(|op| match op {
                AlterTableOperation::AddConstraint(constraint) => Some(constraint),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    };
    constraints
        .into_iter()
        .filter_map(|c| match c {
            TableConstraint::PrimaryKey { columns, .. } => Some(columns),
            _ => None,
        })
        .flatten()
        .map(|column| column.value.to_lowercase())
        .collect()
}

/// Columns must be NOT NULL.
///
/// Primary key columns are implicitly NOT NULL, including those listed by a
/// PRIMARY KEY constraint of the same statement.
pub struct ColumnNoNullRule {
    base: BaseRule,
    primary_key: HashSet<String>,
}

impl ColumnNoNullRule {
    pub fn new(base: BaseRule) -> Self {
        Self {
            base,
            primary_key: HashSet::new(),
        }
    }

    pub fn build(config: &RuleConfig, _: &ReviewContext) -> Result<Box<dyn Rule>, ReviewError> {
        Ok(Box::new(Self::new(config.base_rule())))
    }

    fn report(&mut self, table: &ObjectName, column: &str, node: &Node<'_>) {
        let content = format!(
            "`{}`.`{}` cannot have NULL value",
            object_base_name(table),
            column
        );
        self.base.report(Code::ColumnCannotNull, content, node);
    }
}

impl Rule for ColumnNoNullRule {
    fn name(&self) -> &'static str {
        RuleType::ColumnNoNull.as_str()
    }

    fn on_enter(&mut self, node: &Node<'_>) -> Result<(), ReviewError> {
        if let Some(statement) = node.statement() {
            self.primary_key = primary_key_columns(statement);
            return Ok(());
        }
        if let NodeData::AlterOperation {
            table,
            operation:
                AlterTableOperation::AlterColumn {
                    column_name,
                    op: AlterColumnOperation::DropNotNull,
                },
        } = node.data
        {
            self.report(table, &column_name.value, node);
            return Ok(());
        }
        if let Some((table, column)) = declared_column(node) {
            let in_primary_key = self
                .primary_key
                .contains(&column.name.value.to_lowercase());
            if !column.not_null && !in_primary_key {
                self.report(table, &column.name.value, node);
            }
        }
        Ok(())
    }

    base_rule_accessors!();
}

/// Column types may not change compared to the snapshot.
pub struct DisallowChangeColumnTypeRule {
    base: BaseRule,
    snapshot: Option<Arc<SchemaSnapshot>>,
}

impl DisallowChangeColumnTypeRule {
    pub fn new(base: BaseRule, snapshot: Option<Arc<SchemaSnapshot>>) -> Self {
        Self { base, snapshot }
    }

    pub fn build(config: &RuleConfig, ctx: &ReviewContext) -> Result<Box<dyn Rule>, ReviewError> {
        Ok(Box::new(Self::new(config.base_rule(), ctx.snapshot.clone())))
    }

    /// Type recorded in the snapshot for the column, if known.
    fn current_type(&self, table: &ObjectName, column: &str) -> Option<String> {
        self.snapshot
            .as_ref()?
            .get_column(&table_name(table), column)
            .map(|c| c.column_type.clone())
    }
}

impl Rule for DisallowChangeColumnTypeRule {
    fn name(&self) -> &'static str {
        RuleType::ColumnDisallowChangeType.as_str()
    }

    fn on_enter(&mut self, node: &Node<'_>) -> Result<(), ReviewError> {
        let NodeData::AlterOperation { table, operation } = node.data else {
            return Ok(());
        };
        let (column, data_type) = match operation {
            AlterTableOperation::ModifyColumn {
                col_name,
                data_type,
                ..
            } => (col_name, data_type),
            AlterTableOperation::ChangeColumn {
                old_name,
                data_type,
                ..
            } => (old_name, data_type),
            AlterTableOperation::AlterColumn {
                column_name,
                op: AlterColumnOperation::SetDataType { data_type, .. },
            } => (column_name, data_type),
            _ => return Ok(()),
        };

        let Some(current) = self.current_type(table, &column.value) else {
            return Ok(());
        };
        let new_type = canonical_data_type(data_type);
        if !same_type(&current, &new_type) {
            let content = format!(
                "The type of `{}`.`{}` changes from \"{}\" to \"{}\"",
                object_base_name(table),
                column.value,
                current,
                new_type
            );
            self.base.report(Code::ChangeColumnType, content, node);
        }
        Ok(())
    }

    base_rule_accessors!();
}

/// Column comments are required and/or bounded in length.
pub struct ColumnCommentRule {
    base: BaseRule,
    required: bool,
    max_length: i64,
}

impl ColumnCommentRule {
    pub fn new(base: BaseRule, payload: &CommentConventionPayload) -> Self {
        Self {
            base,
            required: payload.required,
            max_length: payload.max_length,
        }
    }

    pub fn build(config: &RuleConfig, _: &ReviewContext) -> Result<Box<dyn Rule>, ReviewError> {
        let payload: CommentConventionPayload = config.decode_payload()?;
        Ok(Box::new(Self::new(config.base_rule(), &payload)))
    }
}

impl Rule for ColumnCommentRule {
    fn name(&self) -> &'static str {
        RuleType::ColumnComment.as_str()
    }

    fn on_enter(&mut self, node: &Node<'_>) -> Result<(), ReviewError> {
        let Some((table, column)) = declared_column(node) else {
            return Ok(());
        };
        let table = object_base_name(table);
        match column.comment {
            None | Some("") if self.required => {
                let content = format!(
                    "Column `{}`.`{}` requires comments",
                    table, column.name.value
                );
                self.base.report(Code::CommentEmpty, content, node);
            }
            Some(comment)
                if self.max_length > 0 && comment.chars().count() as i64 > self.max_length =>
            {
                let content = format!(
                    "The length of column `{}`.`{}` comment should be within {} characters",
                    table, column.name.value, self.max_length
                );
                self.base.report(Code::CommentTooLong, content, node);
            }
            _ => {}
        }
        Ok(())
    }

    base_rule_accessors!();
}

/// Column types on a deny list are rejected.
pub struct ColumnTypeDisallowListRule {
    base: BaseRule,
    /// Uppercased denied types
    denied: Vec<String>,
}

impl ColumnTypeDisallowListRule {
    pub fn new(base: BaseRule, list: &[String]) -> Self {
        Self {
            base,
            denied: list.iter().map(|t| t.trim().to_uppercase()).collect(),
        }
    }

    pub fn build(config: &RuleConfig, _: &ReviewContext) -> Result<Box<dyn Rule>, ReviewError> {
        let payload: StringArrayPayload = config.decode_payload()?;
        Ok(Box::new(Self::new(config.base_rule(), &payload.list)))
    }

    /// Matches either the full type text (`VARCHAR(255)`) or its name.
    fn is_denied(&self, data_type: &DataType) -> Option<String> {
        let full = data_type.to_string().to_uppercase();
        let name = full.split('(').next().unwrap_or_default().trim().to_string();
        self.denied
            .iter()
            .find(|d| **d == full || **d == name)
            .cloned()
    }
}

impl Rule for ColumnTypeDisallowListRule {
    fn name(&self) -> &'static str {
        RuleType::ColumnTypeDisallowList.as_str()
    }

    fn on_enter(&mut self, node: &Node<'_>) -> Result<(), ReviewError> {
        let (table, column, data_type) = match node.data {
            NodeData::AlterOperation {
                table,
                operation:
                    AlterTableOperation::AlterColumn {
                        column_name,
                        op: AlterColumnOperation::SetDataType { data_type, .. },
                    },
            } => (table, column_name, data_type),
            _ => match declared_column(node) {
                Some((table, column)) => (table, column.name, column.data_type),
                None => return Ok(()),
            },
        };
        if let Some(denied) = self.is_denied(data_type) {
            let content = format!(
                "Disallow column type {} but column `{}`.`{}` is",
                denied,
                object_base_name(table),
                column.value
            );
            self.base.report(Code::DisabledColumnType, content, node);
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

    fn mysql() -> ReviewContext {
        ReviewContext::new(Engine::MySql)
    }

    #[test]
    fn test_no_null() {
        let advice = check(
            "CREATE TABLE t (id INT PRIMARY KEY, a INT NOT NULL, b INT);\nALTER TABLE t MODIFY COLUMN a INT;",
            RuleConfig::new(RuleType::ColumnNoNull, RuleLevel::Warning),
            &mysql(),
        );
        let contents: Vec<&str> = advice.iter().map(|a| a.content.as_str()).collect();
        assert_eq!(
            contents,
            vec!["`t`.`b` cannot have NULL value", "`t`.`a` cannot have NULL value"]
        );
        assert_eq!(advice[1].position.line, 2);
    }

    #[test]
    fn test_no_null_skips_primary_key_constraint_columns() {
        let advice = check(
            "CREATE TABLE t (id INT, a INT, PRIMARY KEY (id));\n\
             ALTER TABLE u ADD COLUMN Id INT, ADD COLUMN b INT, ADD PRIMARY KEY (id);\n\
             ALTER TABLE v ADD COLUMN id INT;",
            RuleConfig::new(RuleType::ColumnNoNull, RuleLevel::Warning),
            &mysql(),
        );
        let contents: Vec<&str> = advice.iter().map(|a| a.content.as_str()).collect();
        assert_eq!(
            contents,
            vec![
                "`t`.`a` cannot have NULL value",
                "`u`.`b` cannot have NULL value",
                "`v`.`id` cannot have NULL value",
            ]
        );
    }

    #[test]
    fn test_no_null_postgres_drop_not_null() {
        let advice = check(
            "ALTER TABLE t ALTER COLUMN a DROP NOT NULL",
            RuleConfig::new(RuleType::ColumnNoNull, RuleLevel::Warning),
            &ReviewContext::new(Engine::Postgres),
        );
        assert_eq!(codes(&advice), vec![402]);
    }

    #[test]
    fn test_change_type_against_snapshot() {
        let mut builder = SnapshotBuilder::new(Engine::MySql, "app");
        builder.parse("CREATE TABLE t (a INT(11), b VARCHAR(20), c INT);");
        let context = mysql().with_snapshot(builder.build());
        let advice = check(
            "ALTER TABLE t MODIFY COLUMN a INTEGER;\nALTER TABLE t MODIFY COLUMN b VARCHAR(30);\nALTER TABLE t CHANGE COLUMN c d BIGINT;\nALTER TABLE t MODIFY COLUMN missing TEXT;",
            RuleConfig::new(RuleType::ColumnDisallowChangeType, RuleLevel::Error),
            &context,
        );
        assert_eq!(codes(&advice), vec![403, 403]);
        assert_eq!(advice[0].position.line, 2);
        assert_eq!(advice[1].position.line, 3);
    }

    #[test]
    fn test_change_type_without_snapshot_finds_nothing() {
        let advice = check(
            "ALTER TABLE t MODIFY COLUMN a BIGINT",
            RuleConfig::new(RuleType::ColumnDisallowChangeType, RuleLevel::Error),
            &mysql(),
        );
        assert!(advice.is_empty());
    }

    #[test]
    fn test_comment_required_and_length() {
        let advice = check(
            "CREATE TABLE t (\n  a INT COMMENT 'ok',\n  b INT,\n  c INT COMMENT 'far too long'\n)",
            RuleConfig::new(RuleType::ColumnComment, RuleLevel::Warning)
                .with_payload(json!({"required": true, "maxLength": 5})),
            &mysql(),
        );
        assert_eq!(codes(&advice), vec![1032, 1301]);
        assert_eq!(advice[0].content, "Column `t`.`b` requires comments");
    }

    #[test]
    fn test_type_disallow_list() {
        let advice = check(
            "CREATE TABLE t (a INT, b JSON, c BLOB);\nALTER TABLE t ADD COLUMN d INT;",
            RuleConfig::new(RuleType::ColumnTypeDisallowList, RuleLevel::Error)
                .with_payload(json!({"list": ["json", "BLOB"]})),
            &mysql(),
        );
        let contents: Vec<&str> = advice.iter().map(|a| a.content.as_str()).collect();
        assert_eq!(
            contents,
            vec![
                "Disallow column type JSON but column `t`.`b` is",
                "Disallow column type BLOB but column `t`.`c` is",
            ]
        );
    }
}
