//! Tagged syntax-tree nodes
//!
//! Rules do not walk sqlparser's AST themselves. The [`walk`] module visits
//! every statement once and hands each rule a [`Node`]: a symbolic
//! [`NodeTag`] plus a borrowed view of the underlying AST piece and its local
//! line number.

mod walk;

use sqlparser::ast::{
    AlterTableOperation, ColumnDef, Expr, Join, JoinConstraint, JoinOperator, ObjectName,
    OrderByExpr, Query, Select, SelectItem, Statement, TableConstraint, TableFactor,
};

pub use walk::{walk, Visitor};

/// Grammar category of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeTag {
    // Statements
    CreateTable,
    AlterTable,
    DropTable,
    CreateIndex,
    DropIndex,
    CreateDatabase,
    DropDatabase,
    DropSchema,
    CreateView,
    Insert,
    Update,
    Delete,
    SelectStatement,
    Commit,
    OtherStatement,

    // DDL pieces
    AlterTableItem,
    ColumnDefinition,
    TableConstraint,

    // Query pieces
    Query,
    Select,
    SelectField,
    Wildcard,
    TableReference,
    Join,
    WhereClause,
    OrderBy,
    LimitClause,
    FunctionCall,
    Expression,
}

impl NodeTag {
    pub fn name(&self) -> &'static str {
        match self {
            NodeTag::CreateTable => "create-table",
            NodeTag::AlterTable => "alter-table",
            NodeTag::DropTable => "drop-table",
            NodeTag::CreateIndex => "create-index",
            NodeTag::DropIndex => "drop-index",
            NodeTag::CreateDatabase => "create-database",
            NodeTag::DropDatabase => "drop-database",
            NodeTag::DropSchema => "drop-schema",
            NodeTag::CreateView => "create-view",
            NodeTag::Insert => "insert",
            NodeTag::Update => "update",
            NodeTag::Delete => "delete",
            NodeTag::SelectStatement => "select-statement",
            NodeTag::Commit => "commit",
            NodeTag::OtherStatement => "other-statement",
            NodeTag::AlterTableItem => "alter-table-item",
            NodeTag::ColumnDefinition => "column-definition",
            NodeTag::TableConstraint => "table-constraint",
            NodeTag::Query => "query",
            NodeTag::Select => "select",
            NodeTag::SelectField => "select-field",
            NodeTag::Wildcard => "wildcard",
            NodeTag::TableReference => "table-reference",
            NodeTag::Join => "join",
            NodeTag::WhereClause => "where-clause",
            NodeTag::OrderBy => "order-by",
            NodeTag::LimitClause => "limit-clause",
            NodeTag::FunctionCall => "function-call",
            NodeTag::Expression => "expression",
        }
    }

    /// Tag of a statement root.
    pub fn of_statement(statement: &Statement) -> Self {
        use sqlparser::ast::ObjectType;

        match statement {
            Statement::CreateTable(_) => NodeTag::CreateTable,
            Statement::AlterTable { .. } => NodeTag::AlterTable,
            Statement::CreateIndex(_) => NodeTag::CreateIndex,
            Statement::CreateDatabase { .. } => NodeTag::CreateDatabase,
            Statement::CreateView { .. } => NodeTag::CreateView,
            Statement::Drop { object_type, .. } => match object_type {
                ObjectType::Table => NodeTag::DropTable,
                ObjectType::Index => NodeTag::DropIndex,
                ObjectType::Database => NodeTag::DropDatabase,
                ObjectType::Schema => NodeTag::DropSchema,
                _ => NodeTag::OtherStatement,
            },
            Statement::Insert(_) => NodeTag::Insert,
            Statement::Update { .. } => NodeTag::Update,
            Statement::Delete(_) => NodeTag::Delete,
            Statement::Query(_) => NodeTag::SelectStatement,
            Statement::Commit { .. } => NodeTag::Commit,
            _ => NodeTag::OtherStatement,
        }
    }

    pub fn is_statement(&self) -> bool {
        matches!(
            self,
            NodeTag::CreateTable
                | NodeTag::AlterTable
                | NodeTag::DropTable
                | NodeTag::CreateIndex
                | NodeTag::DropIndex
                | NodeTag::CreateDatabase
                | NodeTag::DropDatabase
                | NodeTag::DropSchema
                | NodeTag::CreateView
                | NodeTag::Insert
                | NodeTag::Update
                | NodeTag::Delete
                | NodeTag::SelectStatement
                | NodeTag::Commit
                | NodeTag::OtherStatement
        )
    }

    /// INSERT, UPDATE or DELETE.
    pub fn is_dml(&self) -> bool {
        matches!(self, NodeTag::Insert | NodeTag::Update | NodeTag::Delete)
    }
}

impl std::fmt::Display for NodeTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Borrowed AST payload of a node
#[derive(Debug, Clone, Copy)]
pub enum NodeData<'a> {
    Statement {
        ast: &'a Statement,
        text: &'a str,
    },
    AlterOperation {
        table: &'a ObjectName,
        operation: &'a AlterTableOperation,
    },
    /// A column definition inside CREATE TABLE or ALTER TABLE ... ADD COLUMN
    Column {
        table: &'a ObjectName,
        column: &'a ColumnDef,
    },
    Constraint {
        table: &'a ObjectName,
        constraint: &'a TableConstraint,
    },
    Query(&'a Query),
    Select(&'a Select),
    SelectItem(&'a SelectItem),
    Table(&'a TableFactor),
    Join(&'a Join),
    Where(&'a Expr),
    OrderBy(&'a [OrderByExpr]),
    Limit(&'a Expr),
    Expr(&'a Expr),
}

/// One visited node
#[derive(Debug, Clone, Copy)]
pub struct Node<'a> {
    pub tag: NodeTag,
    /// Line within the statement's own text (1-indexed)
    pub line: usize,
    pub column: Option<usize>,
    pub data: NodeData<'a>,
}

impl<'a> Node<'a> {
    pub fn statement(&self) -> Option<&'a Statement> {
        match self.data {
            NodeData::Statement { ast, .. } => Some(ast),
            _ => None,
        }
    }

    pub fn statement_text(&self) -> Option<&'a str> {
        match self.data {
            NodeData::Statement { text, .. } => Some(text),
            _ => None,
        }
    }

    pub fn expr(&self) -> Option<&'a Expr> {
        match self.data {
            NodeData::Expr(expr) | NodeData::Where(expr) | NodeData::Limit(expr) => Some(expr),
            _ => None,
        }
    }
}

/// Last identifier of a possibly qualified name, which is what naming
/// conventions apply to.
pub fn object_base_name(name: &ObjectName) -> String {
    name.0
        .last()
        .map(|ident| ident.value.clone())
        .unwrap_or_default()
}

/// The `ON` condition of a join, if it has one.
pub fn join_on(join: &Join) -> Option<&Expr> {
    let constraint = match &join.join_operator {
        JoinOperator::Inner(c)
        | JoinOperator::LeftOuter(c)
        | JoinOperator::RightOuter(c)
        | JoinOperator::FullOuter(c)
        | JoinOperator::LeftSemi(c)
        | JoinOperator::RightSemi(c)
        | JoinOperator::LeftAnti(c)
        | JoinOperator::RightAnti(c) => c,
        _ => return None,
    };
    match constraint {
        JoinConstraint::On(expr) => Some(expr),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::Engine;
    use crate::parser::parse_script;

    fn tag_of(sql: &str) -> NodeTag {
        let statements = parse_script(sql, Engine::MySql).unwrap();
        NodeTag::of_statement(&statements[0].ast)
    }

    #[test]
    fn test_statement_tags() {
        assert_eq!(tag_of("CREATE TABLE t (a INT)"), NodeTag::CreateTable);
        assert_eq!(tag_of("ALTER TABLE t ADD COLUMN b INT"), NodeTag::AlterTable);
        assert_eq!(tag_of("DROP TABLE t"), NodeTag::DropTable);
        assert_eq!(tag_of("DROP DATABASE d"), NodeTag::DropDatabase);
        assert_eq!(tag_of("INSERT INTO t VALUES (1)"), NodeTag::Insert);
        assert_eq!(tag_of("UPDATE t SET a = 1"), NodeTag::Update);
        assert_eq!(tag_of("DELETE FROM t"), NodeTag::Delete);
        assert_eq!(tag_of("SELECT 1"), NodeTag::SelectStatement);
        assert_eq!(tag_of("COMMIT"), NodeTag::Commit);
        assert!(NodeTag::Delete.is_statement());
        assert!(!NodeTag::WhereClause.is_statement());
    }

    #[test]
    fn test_tag_names_are_kebab_case() {
        assert_eq!(NodeTag::AlterTableItem.to_string(), "alter-table-item");
        assert_eq!(NodeTag::LimitClause.name(), "limit-clause");
    }
}
