//! Identifier naming conventions

use std::collections::HashMap;

use regex::Regex;
use sqlparser::ast::{AlterTableOperation, Expr, Statement, TableConstraint};

use super::join_idents;
use crate::ast::{object_base_name, Node, NodeData, NodeTag};
use crate::code::Code;
use crate::context::ReviewContext;
use crate::error::ReviewError;
use crate::naming::{
    anchored_regex, effective_max_length, NamingTemplate, COLUMN_LIST_TOKEN,
    REFERENCED_COLUMN_TOKEN, REFERENCED_TABLE_TOKEN, REFERENCING_COLUMN_TOKEN,
    REFERENCING_TABLE_TOKEN, TABLE_TOKEN,
};
use crate::rule::payload::NamingPayload;
use crate::rule::{BaseRule, Rule, RuleConfig, RuleType};

/// Table names must match a regex and stay within a length.
pub struct TableNamingRule {
    base: BaseRule,
    format: String,
    pattern: Regex,
    max_length: usize,
}

impl TableNamingRule {
    pub fn new(base: BaseRule, format: &str, max_length: usize) -> Result<Self, ReviewError> {
        Ok(Self {
            base,
            format: format.to_string(),
            pattern: anchored_regex(RuleType::NamingTable, format)?,
            max_length: effective_max_length(max_length),
        })
    }

    pub fn build(config: &RuleConfig, _: &ReviewContext) -> Result<Box<dyn Rule>, ReviewError> {
        let payload: NamingPayload = config.decode_payload()?;
        Ok(Box::new(Self::new(
            config.base_rule(),
            &payload.format,
            payload.max_length,
        )?))
    }

    fn check(&mut self, name: &str, node: &Node<'_>) {
        if !self.pattern.is_match(name) {
            let content = format!(
                "`{}` mismatches table naming convention, naming format should be {:?}",
                name, self.format
            );
            self.base
                .report(Code::NamingTableConventionMismatch, content, node);
        }
        if name.chars().count() > self.max_length {
            let content = format!(
                "`{}` mismatches table naming convention, its length should be within {} characters",
                name, self.max_length
            );
            self.base
                .report(Code::NamingTableConventionMismatch, content, node);
        }
    }
}

impl Rule for TableNamingRule {
    fn name(&self) -> &'static str {
        RuleType::NamingTable.as_str()
    }

    fn on_enter(&mut self, node: &Node<'_>) -> Result<(), ReviewError> {
        match (node.tag, node.data) {
            (NodeTag::CreateTable, NodeData::Statement { ast: Statement::CreateTable(create), .. }) => {
                self.check(&object_base_name(&create.name), node);
            }
            (
                NodeTag::AlterTableItem,
                NodeData::AlterOperation {
                    operation: AlterTableOperation::RenameTable { table_name },
                    ..
                },
            ) => {
                self.check(&object_base_name(table_name), node);
            }
            _ => {}
        }
        Ok(())
    }

    base_rule_accessors!();
}

/// Column names must match a regex and stay within a length.
pub struct ColumnNamingRule {
    base: BaseRule,
    format: String,
    pattern: Regex,
    max_length: usize,
}

impl ColumnNamingRule {
    pub fn new(base: BaseRule, format: &str, max_length: usize) -> Result<Self, ReviewError> {
        Ok(Self {
            base,
            format: format.to_string(),
            pattern: anchored_regex(RuleType::NamingColumn, format)?,
            max_length: effective_max_length(max_length),
        })
    }

    pub fn build(config: &RuleConfig, _: &ReviewContext) -> Result<Box<dyn Rule>, ReviewError> {
        let payload: NamingPayload = config.decode_payload()?;
        Ok(Box::new(Self::new(
            config.base_rule(),
            &payload.format,
            payload.max_length,
        )?))
    }

    fn check(&mut self, table: &str, column: &str, node: &Node<'_>) {
        if !self.pattern.is_match(column) {
            let content = format!(
                "`{}`.`{}` mismatches column naming convention, naming format should be {:?}",
                table, column, self.format
            );
            self.base
                .report(Code::NamingColumnConventionMismatch, content, node);
        }
        if column.chars().count() > self.max_length {
            let content = format!(
                "`{}`.`{}` mismatches column naming convention, its length should be within {} characters",
                table, column, self.max_length
            );
            self.base
                .report(Code::NamingColumnConventionMismatch, content, node);
        }
    }
}

impl Rule for ColumnNamingRule {
    fn name(&self) -> &'static str {
        RuleType::NamingColumn.as_str()
    }

    fn on_enter(&mut self, node: &Node<'_>) -> Result<(), ReviewError> {
        match node.data {
            NodeData::Column { table, column } => {
                self.check(&object_base_name(table), &column.name.value, node);
            }
            NodeData::AlterOperation { table, operation } => match operation {
                AlterTableOperation::RenameColumn {
                    new_column_name, ..
                } => {
                    self.check(&object_base_name(table), &new_column_name.value, node);
                }
                AlterTableOperation::ChangeColumn {
                    old_name, new_name, ..
                } if old_name.value != new_name.value => {
                    self.check(&object_base_name(table), &new_name.value, node);
                }
                _ => {}
            },
            _ => {}
        }
        Ok(())
    }

    base_rule_accessors!();
}

/// Which kind of index an [`IndexNamingRule`] polices
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexKind {
    Index,
    UniqueKey,
}

impl IndexKind {
    fn rule_type(&self) -> RuleType {
        match self {
            IndexKind::Index => RuleType::NamingIndexIdx,
            IndexKind::UniqueKey => RuleType::NamingIndexUk,
        }
    }

    fn code(&self) -> Code {
        match self {
            IndexKind::Index => Code::NamingIndexConventionMismatch,
            IndexKind::UniqueKey => Code::NamingUkConventionMismatch,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            IndexKind::Index => "Index",
            IndexKind::UniqueKey => "Unique key",
        }
    }
}

/// Index or unique key names must follow a `{{table}}`/`{{column_list}}`
/// template.
pub struct IndexNamingRule {
    base: BaseRule,
    kind: IndexKind,
    template: NamingTemplate,
}

/// An index found in the statement being walked
struct IndexDef {
    name: String,
    table: String,
    columns: Vec<String>,
}

impl IndexNamingRule {
    pub fn new(base: BaseRule, kind: IndexKind, payload: &NamingPayload) -> Result<Self, ReviewError> {
        Ok(Self {
            base,
            kind,
            template: NamingTemplate::parse(kind.rule_type(), payload)?,
        })
    }

    pub fn build_index(config: &RuleConfig, _: &ReviewContext) -> Result<Box<dyn Rule>, ReviewError> {
        let payload: NamingPayload = config.decode_payload()?;
        Ok(Box::new(Self::new(config.base_rule(), IndexKind::Index, &payload)?))
    }

    pub fn build_unique_key(
        config: &RuleConfig,
        _: &ReviewContext,
    ) -> Result<Box<dyn Rule>, ReviewError> {
        let payload: NamingPayload = config.decode_payload()?;
        Ok(Box::new(Self::new(
            config.base_rule(),
            IndexKind::UniqueKey,
            &payload,
        )?))
    }

    fn indexes(&self, node: &Node<'_>) -> Vec<IndexDef> {
        match node.data {
            NodeData::Statement {
                ast: Statement::CreateIndex(create),
                ..
            } => {
                let kind = if create.unique {
                    IndexKind::UniqueKey
                } else {
                    IndexKind::Index
                };
                match &create.name {
                    Some(name) if kind == self.kind => vec![IndexDef {
                        name: object_base_name(name),
                        table: object_base_name(&create.table_name),
                        columns: create
                            .columns
                            .iter()
                            .map(|c| match &c.expr {
                                Expr::Identifier(ident) => ident.value.clone(),
                                other => other.to_string(),
                            })
                            .collect(),
                    }],
                    _ => Vec::new(),
                }
            }
            NodeData::Constraint { table, constraint } => {
                let found = match (self.kind, constraint) {
                    (IndexKind::Index, TableConstraint::Index { name, columns, .. }) => {
                        name.as_ref().map(|n| (n.value.clone(), columns))
                    }
                    (
                        IndexKind::UniqueKey,
                        TableConstraint::Unique {
                            name,
                            index_name,
                            columns,
                            ..
                        },
                    ) => index_name
                        .as_ref()
                        .or(name.as_ref())
                        .map(|n| (n.value.clone(), columns)),
                    _ => None,
                };
                found
                    .map(|(name, columns)| IndexDef {
                        name,
                        table: object_base_name(table),
                        columns: columns.iter().map(|c| c.value.clone()).collect(),
                    })
                    .into_iter()
                    .collect()
            }
            _ => Vec::new(),
        }
    }
}

impl Rule for IndexNamingRule {
    fn name(&self) -> &'static str {
        self.kind.rule_type().as_str()
    }

    fn on_enter(&mut self, node: &Node<'_>) -> Result<(), ReviewError> {
        for index in self.indexes(node) {
            let values = HashMap::from([
                (TABLE_TOKEN, index.table.clone()),
                (COLUMN_LIST_TOKEN, index.columns.join("_")),
            ]);
            let pattern = match self.template.compile(&values) {
                Ok(pattern) => pattern,
                Err(err) => {
                    self.base.report_internal(
                        format!("Failed to compile naming template for `{}`: {}", index.name, err),
                        node,
                    );
                    continue;
                }
            };
            if !pattern.is_match(&index.name) {
                let content = format!(
                    "{} in table `{}` mismatches the naming convention, expect {:?} but found `{}`",
                    self.kind.label(),
                    index.table,
                    pattern.as_str(),
                    index.name
                );
                self.base.report(self.kind.code(), content, node);
            }
            if self.template.exceeds_length(&index.name) {
                let content = format!(
                    "{} `{}` in table `{}` mismatches the naming convention, its length should be within {} characters",
                    self.kind.label(),
                    index.name,
                    index.table,
                    self.template.max_length()
                );
                self.base.report(self.kind.code(), content, node);
            }
        }
        Ok(())
    }

    base_rule_accessors!();
}

/// Foreign key names must follow a referencing/referenced template.
pub struct ForeignKeyNamingRule {
    base: BaseRule,
    template: NamingTemplate,
}

impl ForeignKeyNamingRule {
    pub fn new(base: BaseRule, payload: &NamingPayload) -> Result<Self, ReviewError> {
        Ok(Self {
            base,
            template: NamingTemplate::parse(RuleType::NamingIndexFk, payload)?,
        })
    }

    pub fn build(config: &RuleConfig, _: &ReviewContext) -> Result<Box<dyn Rule>, ReviewError> {
        let payload: NamingPayload = config.decode_payload()?;
        Ok(Box::new(Self::new(config.base_rule(), &payload)?))
    }
}

impl Rule for ForeignKeyNamingRule {
    fn name(&self) -> &'static str {
        RuleType::NamingIndexFk.as_str()
    }

    fn on_enter(&mut self, node: &Node<'_>) -> Result<(), ReviewError> {
        let NodeData::Constraint {
            table,
            constraint:
                TableConstraint::ForeignKey {
                    name: Some(name),
                    columns,
                    foreign_table,
                    referred_columns,
                    ..
                },
        } = node.data
        else {
            return Ok(());
        };

        let table = object_base_name(table);
        let values = HashMap::from([
            (REFERENCING_TABLE_TOKEN, table.clone()),
            (REFERENCING_COLUMN_TOKEN, join_idents(columns)),
            (REFERENCED_TABLE_TOKEN, object_base_name(foreign_table)),
            (REFERENCED_COLUMN_TOKEN, join_idents(referred_columns)),
        ]);
        let pattern = match self.template.compile(&values) {
            Ok(pattern) => pattern,
            Err(err) => {
                self.base.report_internal(
                    format!("Failed to compile naming template for `{}`: {}", name.value, err),
                    node,
                );
                return Ok(());
            }
        };

        if !pattern.is_match(&name.value) {
            let content = format!(
                "Foreign key in table `{}` mismatches the naming convention, expect {:?} but found `{}`",
                table,
                pattern.as_str(),
                name.value
            );
            self.base
                .report(Code::NamingFkConventionMismatch, content, node);
        }
        if self.template.exceeds_length(&name.value) {
            let content = format!(
                "Foreign key `{}` in table `{}` mismatches the naming convention, its length should be within {} characters",
                name.value,
                table,
                self.template.max_length()
            );
            self.base
                .report(Code::NamingFkConventionMismatch, content, node);
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
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn config(rule_type: RuleType, payload: serde_json::Value) -> RuleConfig {
        RuleConfig::new(rule_type, RuleLevel::Warning).with_payload(payload)
    }

    fn mysql() -> ReviewContext {
        ReviewContext::new(Engine::MySql)
    }

    #[test]
    fn test_table_naming() {
        let advice = check(
            "CREATE TABLE good_name (a INT);\nCREATE TABLE BadName (a INT);\nALTER TABLE good_name RENAME TO Worse;",
            config(RuleType::NamingTable, json!({"format": "^[a-z_]+$"})),
            &mysql(),
        );
        assert_eq!(codes(&advice), vec![301, 301]);
        assert_eq!(advice[0].position.line, 2);
        assert!(advice[0].content.starts_with("`BadName` mismatches"));
        assert_eq!(advice[1].position.line, 3);
    }

    #[test]
    fn test_mysql_rename_table_naming() {
        let advice = check(
            "SELECT 1;\nRENAME TABLE a TO good_name, b TO BadName;",
            config(RuleType::NamingTable, json!({"format": "^[a-z_]+$"})),
            &mysql(),
        );
        assert_eq!(codes(&advice), vec![301]);
        assert!(advice[0].content.starts_with("`BadName` mismatches"));
        assert_eq!(advice[0].position.line, 2);
    }

    #[test]
    fn test_table_naming_length_is_independent() {
        let advice = check(
            "CREATE TABLE abcdefghij (a INT)",
            config(RuleType::NamingTable, json!({"format": "^[a-z]+$", "maxLength": 5})),
            &mysql(),
        );
        assert_eq!(advice.len(), 1);
        assert!(advice[0].content.contains("within 5 characters"));
    }

    #[test]
    fn test_invalid_table_regex_is_a_config_error() {
        let registry = crate::rule::RuleRegistry::with_defaults();
        let result = registry.build(
            &config(RuleType::NamingTable, json!({"format": "("})),
            &mysql(),
        );
        assert!(matches!(result, Err(ReviewError::InvalidRegex { .. })));
    }

    #[test]
    fn test_column_naming() {
        let advice = check(
            "CREATE TABLE t (good_col INT, BadCol INT);\nALTER TABLE t ADD COLUMN AlsoBad INT, RENAME COLUMN good_col TO Nope;",
            config(RuleType::NamingColumn, json!({"format": "^[a-z_]+$"})),
            &mysql(),
        );
        let contents: Vec<&str> = advice.iter().map(|a| a.content.as_str()).collect();
        assert_eq!(contents.len(), 3);
        assert!(contents[0].starts_with("`t`.`BadCol`"));
        assert!(contents[1].starts_with("`t`.`AlsoBad`"));
        assert!(contents[2].starts_with("`t`.`Nope`"));
    }

    #[test]
    fn test_index_naming_template() {
        let advice = check(
            "CREATE INDEX idx_orders_user_id ON orders (user_id);\nCREATE INDEX orders_by_user ON orders (user_id);\nCREATE UNIQUE INDEX whatever ON orders (code);",
            config(
                RuleType::NamingIndexIdx,
                json!({"format": "^idx_{{table}}_{{column_list}}$"}),
            ),
            &mysql(),
        );
        assert_eq!(codes(&advice), vec![303]);
        assert_eq!(advice[0].position.line, 2);
        assert!(advice[0].content.contains("but found `orders_by_user`"));
    }

    #[test]
    fn test_unique_key_naming_in_create_table() {
        let advice = check(
            "CREATE TABLE orders (\n  id INT,\n  code VARCHAR(20),\n  UNIQUE KEY code_uniq (code),\n  UNIQUE KEY uk_orders_id (id)\n)",
            config(RuleType::NamingIndexUk, json!({"format": "uk_{{table}}_{{column_list}}"})),
            &mysql(),
        );
        assert_eq!(codes(&advice), vec![304]);
        assert!(advice[0].content.starts_with("Unique key in table `orders`"));
    }

    #[test]
    fn test_unknown_template_token_fails_build() {
        let registry = crate::rule::RuleRegistry::with_defaults();
        let result = registry.build(
            &config(RuleType::NamingIndexUk, json!({"format": "uk_{{referenced_table}}"})),
            &mysql(),
        );
        assert!(matches!(
            result,
            Err(ReviewError::InvalidTemplateToken { .. })
        ));
    }

    #[test]
    fn test_foreign_key_naming() {
        let advice = check(
            "ALTER TABLE orders ADD CONSTRAINT fk_orders_user_id_users_id FOREIGN KEY (user_id) REFERENCES users (id);\nALTER TABLE orders ADD CONSTRAINT orders_users FOREIGN KEY (user_id) REFERENCES users (id);",
            config(
                RuleType::NamingIndexFk,
                json!({"format": "fk_{{referencing_table}}_{{referencing_column}}_{{referenced_table}}_{{referenced_column}}"}),
            ),
            &mysql(),
        );
        assert_eq!(codes(&advice), vec![305]);
        assert_eq!(advice[0].position.line, 2);
    }
}
