//! DML statement rules
//!
//! Most of these are small state machines: a flag or counter is set when an
//! enclosing construct (the statement, a WHERE clause, an INSERT) is
//! entered, read by handlers of the nodes nested inside it, and cleared on
//! exit.

use sqlparser::ast::{BinaryOperator, Expr, ObjectName, OrderByExpr, Statement};

use crate::ast::{Node, NodeData, NodeTag};
use crate::code::Code;
use crate::context::ReviewContext;
use crate::error::ReviewError;
use crate::rule::{BaseRule, Rule, RuleConfig, RuleType};

/// Text of the statement being walked, recorded on the statement's enter.
fn record_statement(node: &Node<'_>, text: &mut String) {
    if let Some(statement_text) = node.statement_text() {
        text.clear();
        text.push_str(statement_text);
    }
}

/// UPDATE, DELETE and SELECT ... FROM need a WHERE clause.
pub struct RequireWhereRule {
    base: BaseRule,
    text: String,
}

impl RequireWhereRule {
    pub fn new(base: BaseRule) -> Self {
        Self {
            base,
            text: String::new(),
        }
    }

    pub fn build(config: &RuleConfig, _: &ReviewContext) -> Result<Box<dyn Rule>, ReviewError> {
        Ok(Box::new(Self::new(config.base_rule())))
    }

    fn report(&mut self, node: &Node<'_>) {
        let content = format!("\"{}\" requires WHERE clause", self.text);
        self.base.report(Code::StatementNoWhere, content, node);
    }
}

impl Rule for RequireWhereRule {
    fn name(&self) -> &'static str {
        RuleType::StatementRequireWhere.as_str()
    }

    fn on_enter(&mut self, node: &Node<'_>) -> Result<(), ReviewError> {
        record_statement(node, &mut self.text);
        match node.data {
            NodeData::Statement {
                ast: Statement::Update { selection, .. },
                ..
            } if selection.is_none() => self.report(node),
            NodeData::Statement {
                ast: Statement::Delete(delete),
                ..
            } if delete.selection.is_none() => self.report(node),
            NodeData::Select(select) if !select.from.is_empty() && select.selection.is_none() => {
                self.report(node)
            }
            _ => {}
        }
        Ok(())
    }

    base_rule_accessors!();
}

/// `SELECT *` is not allowed.
pub struct NoSelectAllRule {
    base: BaseRule,
    text: String,
}

impl NoSelectAllRule {
    pub fn new(base: BaseRule) -> Self {
        Self {
            base,
            text: String::new(),
        }
    }

    pub fn build(config: &RuleConfig, _: &ReviewContext) -> Result<Box<dyn Rule>, ReviewError> {
        Ok(Box::new(Self::new(config.base_rule())))
    }
}

impl Rule for NoSelectAllRule {
    fn name(&self) -> &'static str {
        RuleType::StatementNoSelectAll.as_str()
    }

    fn on_enter(&mut self, node: &Node<'_>) -> Result<(), ReviewError> {
        record_statement(node, &mut self.text);
        if node.tag == NodeTag::Wildcard {
            let content = format!("\"{}\" uses SELECT all", self.text);
            self.base.report(Code::StatementSelectAll, content, node);
        }
        Ok(())
    }

    base_rule_accessors!();
}

/// Function calls and arithmetic are not allowed in WHERE clauses, since
/// they keep indexes from being used.
pub struct WhereDisallowFunctionsRule {
    base: BaseRule,
    text: String,
    where_depth: usize,
    reported: bool,
}

fn is_calculation(expr: &Expr) -> bool {
    matches!(
        expr,
        Expr::BinaryOp {
            op: BinaryOperator::Plus
                | BinaryOperator::Minus
                | BinaryOperator::Multiply
                | BinaryOperator::Divide
                | BinaryOperator::Modulo
                | BinaryOperator::MyIntegerDivide
                | BinaryOperator::BitwiseAnd
                | BinaryOperator::BitwiseOr
                | BinaryOperator::BitwiseXor,
            ..
        }
    )
}

impl WhereDisallowFunctionsRule {
    pub fn new(base: BaseRule) -> Self {
        Self {
            base,
            text: String::new(),
            where_depth: 0,
            reported: false,
        }
    }

    pub fn build(config: &RuleConfig, _: &ReviewContext) -> Result<Box<dyn Rule>, ReviewError> {
        Ok(Box::new(Self::new(config.base_rule())))
    }
}

impl Rule for WhereDisallowFunctionsRule {
    fn name(&self) -> &'static str {
        RuleType::StatementWhereDisallowFunctionsAndCalculations.as_str()
    }

    fn on_enter(&mut self, node: &Node<'_>) -> Result<(), ReviewError> {
        if node.tag.is_statement() {
            record_statement(node, &mut self.text);
            self.where_depth = 0;
            self.reported = false;
            return Ok(());
        }
        match node.tag {
            NodeTag::WhereClause => self.where_depth += 1,
            NodeTag::FunctionCall | NodeTag::Expression if self.where_depth > 0 => {
                let offending = node.tag == NodeTag::FunctionCall
                    || node.expr().is_some_and(is_calculation);
                if offending && !self.reported {
                    self.reported = true;
                    let content = format!(
                        "Calculations and functions are disallowed in where clause, but \"{}\" uses",
                        self.text
                    );
                    self.base.report(
                        Code::StatementDisallowFunctionsAndCalculations,
                        content,
                        node,
                    );
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn on_exit(&mut self, node: &Node<'_>) -> Result<(), ReviewError> {
        if node.tag == NodeTag::WhereClause {
            self.where_depth = self.where_depth.saturating_sub(1);
        }
        Ok(())
    }

    base_rule_accessors!();
}

/// INSERT, UPDATE and DELETE must not use LIMIT.
pub struct DisallowLimitRule {
    base: BaseRule,
    text: String,
    /// Kind of DML statement being walked
    dml: Option<NodeTag>,
}

impl DisallowLimitRule {
    pub fn new(base: BaseRule) -> Self {
        Self {
            base,
            text: String::new(),
            dml: None,
        }
    }

    pub fn build(config: &RuleConfig, _: &ReviewContext) -> Result<Box<dyn Rule>, ReviewError> {
        Ok(Box::new(Self::new(config.base_rule())))
    }
}

impl Rule for DisallowLimitRule {
    fn name(&self) -> &'static str {
        RuleType::StatementDisallowLimit.as_str()
    }

    fn on_enter(&mut self, node: &Node<'_>) -> Result<(), ReviewError> {
        if node.tag.is_statement() {
            record_statement(node, &mut self.text);
            self.dml = node.tag.is_dml().then_some(node.tag);
            return Ok(());
        }
        if node.tag != NodeTag::LimitClause {
            return Ok(());
        }
        let code = match self.dml {
            Some(NodeTag::Insert) => Code::InsertUseLimit,
            Some(NodeTag::Update) => Code::UpdateUseLimit,
            Some(NodeTag::Delete) => Code::DeleteUseLimit,
            _ => return Ok(()),
        };
        let content = format!(
            "LIMIT clause is forbidden in INSERT, UPDATE and DELETE statement, but \"{}\" uses",
            self.text
        );
        self.base.report(code, content, node);
        Ok(())
    }

    fn on_exit(&mut self, node: &Node<'_>) -> Result<(), ReviewError> {
        if node.tag.is_statement() {
            self.dml = None;
        }
        Ok(())
    }

    base_rule_accessors!();
}

/// INSERT must list its target columns.
pub struct InsertMustSpecifyColumnRule {
    base: BaseRule,
}

impl InsertMustSpecifyColumnRule {
    pub fn new(base: BaseRule) -> Self {
        Self { base }
    }

    pub fn build(config: &RuleConfig, _: &ReviewContext) -> Result<Box<dyn Rule>, ReviewError> {
        Ok(Box::new(Self::new(config.base_rule())))
    }
}

impl Rule for InsertMustSpecifyColumnRule {
    fn name(&self) -> &'static str {
        RuleType::StatementInsertMustSpecifyColumn.as_str()
    }

    fn on_enter(&mut self, node: &Node<'_>) -> Result<(), ReviewError> {
        if let NodeData::Statement {
            ast: Statement::Insert(insert),
            text,
        } = node.data
        {
            if insert.columns.is_empty() {
                let content = format!(
                    "The INSERT statement must specify columns but \"{}\" does not",
                    text
                );
                self.base
                    .report(Code::InsertNotSpecifyColumn, content, node);
            }
        }
        Ok(())
    }

    base_rule_accessors!();
}

/// `INSERT ... SELECT ... ORDER BY RAND()` is not allowed.
pub struct InsertDisallowOrderByRandRule {
    base: BaseRule,
    text: String,
    in_insert: bool,
}

fn is_rand_call(item: &OrderByExpr) -> bool {
    match &item.expr {
        Expr::Function(function) => is_rand_name(&function.name),
        _ => false,
    }
}

fn is_rand_name(name: &ObjectName) -> bool {
    name.0
        .last()
        .is_some_and(|ident| ident.value.eq_ignore_ascii_case("rand"))
}

impl InsertDisallowOrderByRandRule {
    pub fn new(base: BaseRule) -> Self {
        Self {
            base,
            text: String::new(),
            in_insert: false,
        }
    }

    pub fn build(config: &RuleConfig, _: &ReviewContext) -> Result<Box<dyn Rule>, ReviewError> {
        Ok(Box::new(Self::new(config.base_rule())))
    }
}

impl Rule for InsertDisallowOrderByRandRule {
    fn name(&self) -> &'static str {
        RuleType::StatementInsertDisallowOrderByRand.as_str()
    }

    fn on_enter(&mut self, node: &Node<'_>) -> Result<(), ReviewError> {
        match node.data {
            NodeData::Statement { .. } => {
                record_statement(node, &mut self.text);
                self.in_insert = node.tag == NodeTag::Insert;
            }
            NodeData::OrderBy(items) if self.in_insert && items.iter().any(is_rand_call) => {
                let content = format!(
                    "\"{}\" uses ORDER BY RAND in the INSERT statement",
                    self.text
                );
                self.base.report(Code::InsertUseOrderByRand, content, node);
            }
            _ => {}
        }
        Ok(())
    }

    fn on_exit(&mut self, node: &Node<'_>) -> Result<(), ReviewError> {
        if node.tag == NodeTag::Insert {
            self.in_insert = false;
        }
        Ok(())
    }

    base_rule_accessors!();
}
