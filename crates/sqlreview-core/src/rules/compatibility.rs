//! Backward-incompatible schema changes

use sqlparser::ast::{
    AlterColumnOperation, AlterTableOperation, ObjectName, ObjectType, Statement, TableConstraint,
};

use super::table_name;
use crate::ast::Node;
use crate::code::Code;
use crate::context::ReviewContext;
use crate::error::ReviewError;
use crate::rule::{BaseRule, Rule, RuleConfig, RuleType};
use crate::schema::QualifiedName;

/// Flags DDL that can break existing data or application code: drops,
/// renames, new keys and constraints, column type changes.
///
/// ALTER TABLE and CREATE UNIQUE INDEX on the table created most recently in
/// the same script are exempt, since nothing can depend on it yet.
///
/// MySQL `ALTER CHECK ... ENFORCED` is not covered: the parser has no node
/// for it and rejects it as a syntax error.
pub struct BackwardCompatibilityRule {
    base: BaseRule,
    /// Most recent CREATE TABLE target, lowercased
    last_created_table: Option<QualifiedName>,
}

fn normalized(name: &ObjectName) -> QualifiedName {
    let name = table_name(name);
    QualifiedName {
        schema: name.schema.map(|s| s.to_lowercase()),
        name: name.name.to_lowercase(),
    }
}

fn alter_code(operation: &AlterTableOperation) -> Option<Code> {
    match operation {
        AlterTableOperation::RenameTable { .. } => Some(Code::CompatibilityRenameTable),
        AlterTableOperation::RenameColumn { .. } => Some(Code::CompatibilityRenameColumn),
        AlterTableOperation::DropColumn { .. } => Some(Code::CompatibilityDropColumn),
        AlterTableOperation::AddConstraint(constraint) => match constraint {
            TableConstraint::PrimaryKey { .. } => Some(Code::CompatibilityAddPrimaryKey),
            TableConstraint::Unique { .. } => Some(Code::CompatibilityAddUniqueKey),
            TableConstraint::ForeignKey { .. } => Some(Code::CompatibilityAddForeignKey),
            TableConstraint::Check { .. } => Some(Code::CompatibilityAddCheck),
            _ => None,
        },
        AlterTableOperation::ModifyColumn { .. } | AlterTableOperation::ChangeColumn { .. } => {
            Some(Code::CompatibilityAlterColumn)
        }
        AlterTableOperation::AlterColumn {
            op: AlterColumnOperation::SetDataType { .. },
            ..
        } => Some(Code::CompatibilityAlterColumn),
        _ => None,
    }
}

impl BackwardCompatibilityRule {
    pub fn new(base: BaseRule) -> Self {
        Self {
            base,
            last_created_table: None,
        }
    }

    pub fn build(config: &RuleConfig, _: &ReviewContext) -> Result<Box<dyn Rule>, ReviewError> {
        Ok(Box::new(Self::new(config.base_rule())))
    }

    fn is_last_created(&self, name: &ObjectName) -> bool {
        self.last_created_table.as_ref() == Some(&normalized(name))
    }

    fn code(&mut self, statement: &Statement) -> Option<Code> {
        match statement {
            Statement::CreateTable(create) => {
                self.last_created_table = Some(normalized(&create.name));
                None
            }
            Statement::Drop { object_type, .. } => match object_type {
                ObjectType::Database => Some(Code::CompatibilityDropDatabase),
                ObjectType::Schema => Some(Code::CompatibilityDropSchema),
                ObjectType::Table => Some(Code::CompatibilityDropTable),
                _ => None,
            },
            Statement::AlterTable {
                name, operations, ..
            } if !self.is_last_created(name) => operations.iter().find_map(alter_code),
            Statement::CreateIndex(create)
                if create.unique && !self.is_last_created(&create.table_name) =>
            {
                Some(Code::CompatibilityAddUniqueKey)
            }
            _ => None,
        }
    }
}

impl Rule for BackwardCompatibilityRule {
    fn name(&self) -> &'static str {
        RuleType::SchemaBackwardCompatibility.as_str()
    }

    fn on_enter(&mut self, node: &Node<'_>) -> Result<(), ReviewError> {
        let (Some(statement), Some(text)) = (node.statement(), node.statement_text()) else {
            return Ok(());
        };
        if let Some(code) = self.code(statement) {
            let content = format!(
                "\"{}\" may cause incompatibility with the existing data and code",
                text
            );
            self.base.report(code, content, node);
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

    fn run(sql: &str, engine: Engine) -> Vec<crate::advice::Advice> {
        check(
            sql,
            RuleConfig::new(RuleType::SchemaBackwardCompatibility, RuleLevel::Warning),
            &ReviewContext::new(engine),
        )
    }

    #[test]
    fn test_breaking_changes_are_flagged() {
        let sql = "DROP DATABASE d;\n\
                   DROP TABLE t;\n\
                   ALTER TABLE t RENAME TO u;\n\
                   ALTER TABLE t RENAME COLUMN a TO b;\n\
                   ALTER TABLE t DROP COLUMN a;\n\
                   ALTER TABLE t ADD PRIMARY KEY (id);\n\
                   ALTER TABLE t ADD UNIQUE KEY uk (a);\n\
                   ALTER TABLE t ADD CONSTRAINT fk FOREIGN KEY (a) REFERENCES s (id);\n\
                   ALTER TABLE t ADD CONSTRAINT ck CHECK (a > 0);\n\
                   ALTER TABLE t MODIFY COLUMN a BIGINT;\n\
                   CREATE UNIQUE INDEX uk_a ON t (a);\n\
                   ALTER TABLE t ADD COLUMN c INT;";
        let advice = run(sql, Engine::MySql);
        assert_eq!(
            codes(&advice),
            vec![101, 103, 102, 104, 105, 106, 107, 108, 109, 111, 107]
        );
        assert_eq!(
            advice[0].content,
            "\"DROP DATABASE d\" may cause incompatibility with the existing data and code"
        );
        let lines: Vec<usize> = advice.iter().map(|a| a.position.line).collect();
        assert_eq!(lines, (1..=11).collect::<Vec<_>>());
    }

    #[test]
    fn test_table_created_in_same_script_is_exempt() {
        let advice = run(
            "CREATE TABLE t (id INT);\nALTER TABLE t DROP COLUMN id;\nCREATE UNIQUE INDEX uk ON t (id);\nALTER TABLE other DROP COLUMN id;",
            Engine::MySql,
        );
        assert_eq!(codes(&advice), vec![105]);
        assert_eq!(advice[0].position.line, 4);
    }

    #[test]
    fn test_exemption_follows_latest_create() {
        let advice = run(
            "CREATE TABLE a (id INT);\nCREATE TABLE b (id INT);\nALTER TABLE a DROP COLUMN id;\nALTER TABLE b DROP COLUMN id;",
            Engine::MySql,
        );
        assert_eq!(codes(&advice), vec![105]);
        assert_eq!(advice[0].position.line, 3);
    }

    #[test]
    fn test_mysql_rename_table_statement() {
        let advice = run("RENAME TABLE a TO b, c TO d;", Engine::MySql);
        assert_eq!(codes(&advice), vec![102, 102]);
        assert_eq!(
            advice[0].content,
            "\"RENAME TABLE a TO b, c TO d\" may cause incompatibility with the existing data and code"
        );
    }

    #[test]
    fn test_check_enforcement_does_not_parse() {
        let sql = "ALTER TABLE t ALTER CHECK ck NOT ENFORCED";
        assert!(crate::parser::parse_script(sql, Engine::MySql).is_err());
    }

    #[test]
    fn test_postgres_schema_and_type_changes() {
        let advice = run(
            "DROP SCHEMA s;\nALTER TABLE t ALTER COLUMN a TYPE BIGINT;",
            Engine::Postgres,
        );
        assert_eq!(codes(&advice), vec![112, 111]);
    }
}
