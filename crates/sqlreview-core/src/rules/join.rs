//! Join column attribute consistency

use std::collections::HashMap;
use std::sync::Arc;

use sqlparser::ast::{BinaryOperator, Expr, TableFactor};

use super::table_name;
use crate::ast::{join_on, Node, NodeData, NodeTag};
use crate::code::Code;
use crate::context::ReviewContext;
use crate::error::ReviewError;
use crate::rule::{BaseRule, Rule, RuleConfig, RuleType};
use crate::schema::{ColumnMetadata, QualifiedName, SchemaSnapshot};
use crate::types::same_type;

/// Columns compared in a JOIN ... ON must share type, character set and
/// collation, or the join cannot use an index.
pub struct JoinStrictColumnAttrsRule {
    base: BaseRule,
    snapshot: Option<Arc<SchemaSnapshot>>,
    /// Lowercased alias (or table name) -> table, for the current statement
    tables: HashMap<String, QualifiedName>,
}

/// `qualifier.column` as written in the ON condition
struct ColumnRef {
    qualifier: String,
    column: String,
}

impl std::fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.qualifier, self.column)
    }
}

fn column_ref(expr: &Expr) -> Option<ColumnRef> {
    match expr {
        Expr::CompoundIdentifier(idents) if idents.len() >= 2 => {
            let column = &idents[idents.len() - 1];
            let qualifier = &idents[idents.len() - 2];
            Some(ColumnRef {
                qualifier: qualifier.value.clone(),
                column: column.value.clone(),
            })
        }
        Expr::Nested(inner) => column_ref(inner),
        _ => None,
    }
}

/// Column pairs compared with `=` in an ON condition, through AND.
fn equality_pairs(expr: &Expr, pairs: &mut Vec<(ColumnRef, ColumnRef)>) {
    match expr {
        Expr::BinaryOp {
            left,
            op: BinaryOperator::And,
            right,
        } => {
            equality_pairs(left, pairs);
            equality_pairs(right, pairs);
        }
        Expr::BinaryOp {
            left,
            op: BinaryOperator::Eq,
            right,
        } => {
            if let (Some(l), Some(r)) = (column_ref(left), column_ref(right)) {
                pairs.push((l, r));
            }
        }
        Expr::Nested(inner) => equality_pairs(inner, pairs),
        _ => {}
    }
}

fn same_attrs(a: &ColumnMetadata, b: &ColumnMetadata) -> bool {
    let eq_ignore_case = |x: &Option<String>, y: &Option<String>| match (x, y) {
        (Some(x), Some(y)) => x.eq_ignore_ascii_case(y),
        (None, None) => true,
        _ => false,
    };
    same_type(&a.column_type, &b.column_type)
        && eq_ignore_case(&a.character_set, &b.character_set)
        && eq_ignore_case(&a.collation, &b.collation)
}

impl JoinStrictColumnAttrsRule {
    pub fn new(base: BaseRule, snapshot: Option<Arc<SchemaSnapshot>>) -> Self {
        Self {
            base,
            snapshot,
            tables: HashMap::new(),
        }
    }

    pub fn build(config: &RuleConfig, ctx: &ReviewContext) -> Result<Box<dyn Rule>, ReviewError> {
        Ok(Box::new(Self::new(config.base_rule(), ctx.snapshot.clone())))
    }

    fn lookup(&self, column: &ColumnRef) -> Option<&ColumnMetadata> {
        let table = self.tables.get(&column.qualifier.to_lowercase())?;
        self.snapshot.as_ref()?.get_column(table, &column.column)
    }
}

impl Rule for JoinStrictColumnAttrsRule {
    fn name(&self) -> &'static str {
        RuleType::StatementJoinStrictColumnAttrs.as_str()
    }

    fn on_enter(&mut self, node: &Node<'_>) -> Result<(), ReviewError> {
        if node.tag.is_statement() {
            self.tables.clear();
            return Ok(());
        }
        if let NodeData::Table(TableFactor::Table { name, alias, .. }) = node.data {
            let table = table_name(name);
            let key = match alias {
                Some(alias) => alias.name.value.to_lowercase(),
                None => table.name.to_lowercase(),
            };
            self.tables.insert(key, table);
        }
        Ok(())
    }

    // The joined relation is registered by the time the join exits.
    fn on_exit(&mut self, node: &Node<'_>) -> Result<(), ReviewError> {
        if node.tag != NodeTag::Join || self.snapshot.is_none() {
            return Ok(());
        }
        let NodeData::Join(join) = node.data else {
            return Ok(());
        };
        let Some(on) = join_on(join) else {
            return Ok(());
        };

        let mut pairs = Vec::new();
        equality_pairs(on, &mut pairs);
        let mut mismatched = Vec::new();
        for (left, right) in pairs {
            let (Some(l), Some(r)) = (self.lookup(&left), self.lookup(&right)) else {
                continue;
            };
            if !same_attrs(l, r) {
                mismatched.push(format!(
                    "{} and {} column fields do not have the same attributes",
                    left, right
                ));
            }
        }
        for content in mismatched {
            self.base
                .report(Code::StatementJoinColumnAttrsNotMatch, content, node);
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

    fn context() -> ReviewContext {
        let mut builder = SnapshotBuilder::new(Engine::MySql, "app");
        builder.parse(
            "CREATE TABLE a (id INT, code VARCHAR(10) COLLATE utf8mb4_bin);\n\
             CREATE TABLE b (a_id INT(11), code VARCHAR(10), name VARCHAR(20));",
        );
        ReviewContext::new(Engine::MySql).with_snapshot(builder.build())
    }

    fn config() -> RuleConfig {
        RuleConfig::new(RuleType::StatementJoinStrictColumnAttrs, RuleLevel::Warning)
    }

    #[test]
    fn test_matching_columns_pass() {
        let advice = check(
            "SELECT * FROM a JOIN b ON a.id = b.a_id",
            config(),
            &context(),
        );
        assert!(advice.is_empty());
    }

    #[test]
    fn test_type_and_collation_mismatch() {
        let advice = check(
            "SELECT * FROM a JOIN b ON a.id = b.name;\nSELECT * FROM a x\nLEFT JOIN b y ON x.code = y.code AND x.id = y.a_id;",
            config(),
            &context(),
        );
        assert_eq!(codes(&advice), vec![226, 226]);
        assert_eq!(
            advice[0].content,
            "a.id and b.name column fields do not have the same attributes"
        );
        assert_eq!(
            advice[1].content,
            "x.code and y.code column fields do not have the same attributes"
        );
    }

    #[test]
    fn test_unknown_tables_and_missing_snapshot_are_ignored() {
        let advice = check(
            "SELECT * FROM a JOIN c ON a.id = c.id",
            config(),
            &context(),
        );
        assert!(advice.is_empty());

        let advice = check(
            "SELECT * FROM a JOIN b ON a.id = b.name",
            config(),
            &ReviewContext::new(Engine::MySql),
        );
        assert!(advice.is_empty());
    }
}
