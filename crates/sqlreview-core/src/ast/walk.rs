//! Single-pass traversal
//!
//! Every node is announced to the [`Visitor`] twice: `enter` on the way down
//! and `exit` on the way back up, with its children visited in between.

use sqlparser::ast::{
    self, AlterTableOperation, Expr, FromTable, FunctionArg, FunctionArgExpr, FunctionArguments,
    GroupByExpr, ObjectName, OrderByExpr, Query, Select, SelectItem, SetExpr, Spanned,
    TableFactor, TableWithJoins,
};
use sqlparser::tokenizer::Span;

use super::{join_on, Node, NodeData, NodeTag};
use crate::error::ReviewError;
use crate::parser::Statement;

/// Receiver of traversal events
pub trait Visitor {
    fn enter(&mut self, node: &Node<'_>) -> Result<(), ReviewError>;
    fn exit(&mut self, node: &Node<'_>) -> Result<(), ReviewError>;
}

/// Walk one statement, depth first.
pub fn walk<V: Visitor>(statement: &Statement, visitor: &mut V) -> Result<(), ReviewError> {
    let mut walker = Walker {
        visitor,
        line: 1,
        first_column: statement.first_column,
    };
    walker.statement(statement)
}

struct Walker<'v, V> {
    visitor: &'v mut V,
    /// Line of the closest enclosing node, used when a node has no span.
    line: usize,
    /// Script columns preceding the statement's first line.
    first_column: usize,
}

fn leaf<W>(_: &mut W) -> Result<(), ReviewError> {
    Ok(())
}

impl<V: Visitor> Walker<'_, V> {
    fn visit<'a, F>(
        &mut self,
        tag: NodeTag,
        span: Span,
        data: NodeData<'a>,
        children: F,
    ) -> Result<(), ReviewError>
    where
        F: FnOnce(&mut Self) -> Result<(), ReviewError>,
    {
        let (line, column) = if span.start.line > 0 {
            let line = span.start.line as usize;
            let offset = if line == 1 { self.first_column } else { 0 };
            (line, Some(span.start.column as usize + offset))
        } else {
            (self.line, None)
        };
        let node = Node {
            tag,
            line,
            column,
            data,
        };

        self.visitor.enter(&node)?;
        let parent_line = std::mem::replace(&mut self.line, line);
        children(self)?;
        self.line = parent_line;
        self.visitor.exit(&node)
    }

    fn statement(&mut self, statement: &Statement) -> Result<(), ReviewError> {
        let ast = &statement.ast;
        self.visit(
            NodeTag::of_statement(ast),
            ast.span(),
            NodeData::Statement {
                ast,
                text: &statement.text,
            },
            |w| {
                w.statement_children(ast)?;
                if let Some(limit) = &statement.limit {
                    w.limit(limit)?;
                }
                Ok(())
            },
        )
    }

    fn statement_children(&mut self, statement: &ast::Statement) -> Result<(), ReviewError> {
        match statement {
            ast::Statement::CreateTable(create) => {
                for column in &create.columns {
                    self.visit(
                        NodeTag::ColumnDefinition,
                        column.span(),
                        NodeData::Column {
                            table: &create.name,
                            column,
                        },
                        leaf,
                    )?;
                }
                for constraint in &create.constraints {
                    self.visit(
                        NodeTag::TableConstraint,
                        constraint.span(),
                        NodeData::Constraint {
                            table: &create.name,
                            constraint,
                        },
                        leaf,
                    )?;
                }
                if let Some(query) = &create.query {
                    self.query(query)?;
                }
            }
            ast::Statement::AlterTable {
                name, operations, ..
            } => {
                for operation in operations {
                    self.alter_operation(name, operation)?;
                }
            }
            ast::Statement::CreateView { query, .. } => self.query(query)?,
            ast::Statement::Query(query) => self.query(query)?,
            ast::Statement::Insert(insert) => {
                if let Some(source) = &insert.source {
                    self.query(source)?;
                }
            }
            ast::Statement::Update {
                table,
                assignments,
                from,
                selection,
                ..
            } => {
                self.table_with_joins(table)?;
                for assignment in assignments {
                    self.expr(&assignment.value)?;
                }
                if let Some(from) = from {
                    self.table_with_joins(from)?;
                }
                if let Some(selection) = selection {
                    self.where_clause(selection)?;
                }
            }
            ast::Statement::Delete(delete) => {
                let tables = match &delete.from {
                    FromTable::WithFromKeyword(tables) | FromTable::WithoutKeyword(tables) => {
                        tables
                    }
                };
                for table in tables {
                    self.table_with_joins(table)?;
                }
                if let Some(using) = &delete.using {
                    for table in using {
                        self.table_with_joins(table)?;
                    }
                }
                if let Some(selection) = &delete.selection {
                    self.where_clause(selection)?;
                }
                if !delete.order_by.is_empty() {
                    self.order_by(&delete.order_by)?;
                }
                if let Some(limit) = &delete.limit {
                    self.limit(limit)?;
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn alter_operation(
        &mut self,
        table: &ObjectName,
        operation: &AlterTableOperation,
    ) -> Result<(), ReviewError> {
        self.visit(
            NodeTag::AlterTableItem,
            operation.span(),
            NodeData::AlterOperation { table, operation },
            |w| match operation {
                AlterTableOperation::AddColumn { column_def, .. } => w.visit(
                    NodeTag::ColumnDefinition,
                    column_def.span(),
                    NodeData::Column {
                        table,
                        column: column_def,
                    },
                    leaf,
                ),
                AlterTableOperation::AddConstraint(constraint) => w.visit(
                    NodeTag::TableConstraint,
                    constraint.span(),
                    NodeData::Constraint { table, constraint },
                    leaf,
                ),
                _ => Ok(()),
            },
        )
    }

    fn query(&mut self, query: &Query) -> Result<(), ReviewError> {
        self.visit(NodeTag::Query, query.span(), NodeData::Query(query), |w| {
            if let Some(with) = &query.with {
                for cte in &with.cte_tables {
                    w.query(&cte.query)?;
                }
            }
            w.set_expr(&query.body)?;
            if let Some(order_by) = &query.order_by {
                w.order_by(&order_by.exprs)?;
            }
            if let Some(limit) = &query.limit {
                w.limit(limit)?;
            }
            Ok(())
        })
    }

    fn set_expr(&mut self, body: &SetExpr) -> Result<(), ReviewError> {
        match body {
            SetExpr::Select(select) => self.select(select),
            SetExpr::Query(query) => self.query(query),
            SetExpr::SetOperation { left, right, .. } => {
                self.set_expr(left)?;
                self.set_expr(right)
            }
            SetExpr::Values(values) => {
                for row in &values.rows {
                    for expr in row {
                        self.expr(expr)?;
                    }
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn select(&mut self, select: &Select) -> Result<(), ReviewError> {
        self.visit(NodeTag::Select, select.span(), NodeData::Select(select), |w| {
            for item in &select.projection {
                w.select_item(item)?;
            }
            for table in &select.from {
                w.table_with_joins(table)?;
            }
            if let Some(selection) = &select.selection {
                w.where_clause(selection)?;
            }
            if let GroupByExpr::Expressions(exprs, _) = &select.group_by {
                for expr in exprs {
                    w.expr(expr)?;
                }
            }
            if let Some(having) = &select.having {
                w.expr(having)?;
            }
            Ok(())
        })
    }

    fn select_item(&mut self, item: &SelectItem) -> Result<(), ReviewError> {
        let tag = match item {
            SelectItem::Wildcard(_) | SelectItem::QualifiedWildcard(..) => NodeTag::Wildcard,
            _ => NodeTag::SelectField,
        };
        self.visit(tag, item.span(), NodeData::SelectItem(item), |w| match item {
            SelectItem::UnnamedExpr(expr) | SelectItem::ExprWithAlias { expr, .. } => w.expr(expr),
            _ => Ok(()),
        })
    }

    fn table_with_joins(&mut self, table: &TableWithJoins) -> Result<(), ReviewError> {
        self.table_factor(&table.relation)?;
        for join in &table.joins {
            self.visit(NodeTag::Join, join.span(), NodeData::Join(join), |w| {
                w.table_factor(&join.relation)?;
                if let Some(expr) = join_on(join) {
                    w.expr(expr)?;
                }
                Ok(())
            })?;
        }
        Ok(())
    }

    fn table_factor(&mut self, factor: &TableFactor) -> Result<(), ReviewError> {
        self.visit(
            NodeTag::TableReference,
            factor.span(),
            NodeData::Table(factor),
            |w| match factor {
                TableFactor::Derived { subquery, .. } => w.query(subquery),
                TableFactor::NestedJoin {
                    table_with_joins, ..
                } => w.table_with_joins(table_with_joins),
                _ => Ok(()),
            },
        )
    }

    fn where_clause(&mut self, selection: &Expr) -> Result<(), ReviewError> {
        self.visit(
            NodeTag::WhereClause,
            selection.span(),
            NodeData::Where(selection),
            |w| w.expr(selection),
        )
    }

    fn order_by(&mut self, exprs: &[OrderByExpr]) -> Result<(), ReviewError> {
        let span = exprs
            .first()
            .map(|e| e.expr.span())
            .unwrap_or_else(Span::empty);
        self.visit(NodeTag::OrderBy, span, NodeData::OrderBy(exprs), |w| {
            for item in exprs {
                w.expr(&item.expr)?;
            }
            Ok(())
        })
    }

    fn limit(&mut self, limit: &Expr) -> Result<(), ReviewError> {
        self.visit(
            NodeTag::LimitClause,
            limit.span(),
            NodeData::Limit(limit),
            |w| w.expr(limit),
        )
    }

    fn expr(&mut self, expr: &Expr) -> Result<(), ReviewError> {
        let tag = match expr {
            Expr::Function(_) => NodeTag::FunctionCall,
            _ => NodeTag::Expression,
        };
        self.visit(tag, expr.span(), NodeData::Expr(expr), |w| {
            w.expr_children(expr)
        })
    }

    fn expr_children(&mut self, expr: &Expr) -> Result<(), ReviewError> {
        match expr {
            Expr::BinaryOp { left, right, .. } => {
                self.expr(left)?;
                self.expr(right)
            }
            Expr::UnaryOp { expr, .. }
            | Expr::Nested(expr)
            | Expr::IsNull(expr)
            | Expr::IsNotNull(expr)
            | Expr::Cast { expr, .. } => self.expr(expr),
            Expr::InList { expr, list, .. } => {
                self.expr(expr)?;
                for item in list {
                    self.expr(item)?;
                }
                Ok(())
            }
            Expr::InSubquery { expr, subquery, .. } => {
                self.expr(expr)?;
                self.query(subquery)
            }
            Expr::Between {
                expr, low, high, ..
            } => {
                self.expr(expr)?;
                self.expr(low)?;
                self.expr(high)
            }
            Expr::Like { expr, pattern, .. } | Expr::ILike { expr, pattern, .. } => {
                self.expr(expr)?;
                self.expr(pattern)
            }
            Expr::Case {
                operand,
                conditions,
                results,
                else_result,
            } => {
                if let Some(operand) = operand {
                    self.expr(operand)?;
                }
                for e in conditions.iter().chain(results) {
                    self.expr(e)?;
                }
                if let Some(else_result) = else_result {
                    self.expr(else_result)?;
                }
                Ok(())
            }
            Expr::Subquery(query) | Expr::Exists { subquery: query, .. } => self.query(query),
            Expr::Function(func) => {
                if let FunctionArguments::List(list) = &func.args {
                    for arg in &list.args {
                        match arg {
                            FunctionArg::Unnamed(FunctionArgExpr::Expr(e))
                            | FunctionArg::Named {
                                arg: FunctionArgExpr::Expr(e),
                                ..
                            }
                            | FunctionArg::ExprNamed {
                                arg: FunctionArgExpr::Expr(e),
                                ..
                            } => self.expr(e)?,
                            _ => {}
                        }
                    }
                }
                Ok(())
            }
            Expr::Tuple(exprs) => {
                for e in exprs {
                    self.expr(e)?;
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }
}
