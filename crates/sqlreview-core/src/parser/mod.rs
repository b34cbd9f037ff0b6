//! Script parsing
//!
//! Turns a multi-statement SQL script into [`Statement`]s that each carry
//! their own syntax tree and the line offset at which they start, which is
//! what every advice position is computed from.

mod split;

use sqlparser::ast::{self, AlterTableOperation, Expr};
use sqlparser::keywords::Keyword;
use sqlparser::parser::{Parser, ParserError};
use sqlparser::tokenizer::Token;
use tracing::debug;

use crate::dialect::Engine;
use crate::error::SyntaxError;

pub use split::{leading_trivia, split_statements, Chunk};

/// One parsed statement of a script
#[derive(Debug, Clone)]
pub struct Statement {
    /// Statement text as written, without leading comments, surrounding
    /// whitespace or `;`
    pub text: String,
    pub ast: ast::Statement,
    /// Number of lines preceding the statement within the script
    pub base_line: usize,
    /// Characters preceding the statement on its first line
    pub first_column: usize,
    /// `LIMIT` of a MySQL `UPDATE`, which the syntax tree has no room for
    pub limit: Option<Expr>,
}

/// Parse a script, failing on the first statement that does not parse.
pub fn parse_script(sql: &str, engine: Engine) -> Result<Vec<Statement>, SyntaxError> {
    let mut statements = Vec::new();
    for chunk in split_statements(sql, engine) {
        statements.extend(parse_chunk(sql, chunk, engine)?);
    }
    debug!(count = statements.len(), %engine, "parsed script");
    Ok(statements)
}

/// Parse a script, skipping statements that do not parse.
///
/// Schema dumps routinely contain statements the parser does not support
/// (procedures, triggers, engine-specific options); those are returned as
/// errors next to the statements that did parse.
pub fn parse_script_lenient(sql: &str, engine: Engine) -> (Vec<Statement>, Vec<SyntaxError>) {
    let mut statements = Vec::new();
    let mut errors = Vec::new();
    for chunk in split_statements(sql, engine) {
        match parse_chunk(sql, chunk, engine) {
            Ok(parsed) => statements.extend(parsed),
            Err(err) => errors.push(err),
        }
    }
    (statements, errors)
}

fn parse_chunk(sql: &str, chunk: Chunk, engine: Engine) -> Result<Vec<Statement>, SyntaxError> {
    let start = chunk.start + leading_trivia(&sql[chunk.start..chunk.end], engine);
    let text = sql[start..chunk.end].trim_end();
    if text.is_empty() {
        return Ok(Vec::new());
    }
    let base_line = sql[..start].matches('\n').count();
    let line_start = sql[..start].rfind('\n').map_or(0, |at| at + 1);
    let first_column = sql[line_start..start].chars().count();

    let parsed = parse_text(text, engine).map_err(|err| {
        let message = err.to_string();
        SyntaxError {
            line: base_line + reported_line(&message).unwrap_or(1),
            message,
        }
    })?;

    Ok(parsed
        .into_iter()
        .map(|(ast, limit)| Statement {
            text: text.to_string(),
            ast,
            base_line,
            first_column,
            limit,
        })
        .collect())
}

/// `Parser::parse_statements`, plus the MySQL forms sqlparser does not
/// accept: `UPDATE ... LIMIT n` and `RENAME TABLE a TO b, ...`.
fn parse_text(text: &str, engine: Engine) -> Result<Vec<(ast::Statement, Option<Expr>)>, ParserError> {
    let dialect = engine.parser_dialect();
    let mut parser = Parser::new(dialect.as_ref()).try_with_sql(text)?;
    let mysql = engine.is_mysql_family();
    let mut parsed = Vec::new();

    loop {
        while parser.consume_token(&Token::SemiColon) {}
        if parser.peek_token().token == Token::EOF {
            break;
        }

        if mysql && parser.parse_keywords(&[Keyword::RENAME, Keyword::TABLE]) {
            let renames = parser.parse_comma_separated(|p| {
                let from = p.parse_object_name(false)?;
                p.expect_keyword(Keyword::TO)?;
                let to = p.parse_object_name(false)?;
                Ok(rename_table(from, to))
            })?;
            parsed.extend(renames.into_iter().map(|ast| (ast, None)));
        } else {
            let statement = parser.parse_statement()?;
            let limit = if mysql
                && matches!(statement, ast::Statement::Update { .. })
                && parser.parse_keyword(Keyword::LIMIT)
            {
                Some(parser.parse_expr()?)
            } else {
                None
            };
            parsed.push((statement, limit));
        }

        match parser.peek_token().token {
            Token::EOF | Token::SemiColon => {}
            _ => return parser.expected("end of statement", parser.peek_token()),
        }
    }
    Ok(parsed)
}

/// `RENAME TABLE from TO to` as the equivalent `ALTER TABLE from RENAME TO to`.
fn rename_table(from: ast::ObjectName, to: ast::ObjectName) -> ast::Statement {
    ast::Statement::AlterTable {
        name: from,
        if_exists: false,
        only: false,
        operations: vec![AlterTableOperation::RenameTable { table_name: to }],
        location: None,
        on_cluster: None,
    }
}

/// Extract the `Line: N` location sqlparser appends to its error messages.
fn reported_line(message: &str) -> Option<usize> {
    let at = message.rfind("Line: ")?;
    let digits: String = message[at + "Line: ".len()..]
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok().filter(|line| *line > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_base_lines() {
        let sql = "CREATE TABLE t (a INT);\n\n-- note\nALTER TABLE t\n  ADD COLUMN b INT;\nSELECT 1";
        let statements = parse_script(sql, Engine::MySql).unwrap();
        let lines: Vec<usize> = statements.iter().map(|s| s.base_line).collect();
        assert_eq!(lines, vec![0, 3, 5]);
        assert!(statements[1].text.starts_with("ALTER TABLE t"));
    }

    #[test]
    fn test_leading_comments_are_not_part_of_the_text() {
        let sql = "-- hi\n/* block */ DELETE FROM t";
        let statements = parse_script(sql, Engine::MySql).unwrap();
        assert_eq!(statements[0].text, "DELETE FROM t");
        assert_eq!(statements[0].base_line, 1);
        assert_eq!(statements[0].first_column, 12);
    }

    #[test]
    fn test_first_column_of_mid_line_statement() {
        let statements = parse_script("SELECT 1; DELETE FROM t;", Engine::MySql).unwrap();
        let columns: Vec<usize> = statements.iter().map(|s| s.first_column).collect();
        assert_eq!(columns, vec![0, 10]);
    }

    #[test]
    fn test_mysql_update_limit() {
        let statements =
            parse_script("UPDATE t SET a = 1 WHERE b = 2 LIMIT 1;", Engine::MySql).unwrap();
        assert_eq!(statements.len(), 1);
        assert!(matches!(statements[0].ast, ast::Statement::Update { .. }));
        assert_eq!(statements[0].limit.as_ref().map(|e| e.to_string()), Some("1".to_string()));
    }

    #[test]
    fn test_update_limit_is_mysql_only() {
        let err = parse_script("UPDATE t SET a = 1 LIMIT 1", Engine::Postgres).unwrap_err();
        assert_eq!(err.line, 1);
    }

    #[test]
    fn test_mysql_rename_table() {
        let statements = parse_script("RENAME TABLE a TO b, c TO d;", Engine::MySql).unwrap();
        let renames: Vec<String> = statements.iter().map(|s| s.ast.to_string()).collect();
        assert_eq!(
            renames,
            vec!["ALTER TABLE a RENAME TO b", "ALTER TABLE c RENAME TO d"]
        );
    }

    #[test]
    fn test_comment_only_chunk_yields_nothing() {
        let sql = "SELECT 1;\n-- trailing comment\n";
        let statements = parse_script(sql, Engine::MySql).unwrap();
        assert_eq!(statements.len(), 1);
    }

    #[test]
    fn test_syntax_error_line_is_absolute() {
        let sql = "SELECT 1;\nSELECT 2;\nCREATE TABLE (;";
        let err = parse_script(sql, Engine::MySql).unwrap_err();
        assert_eq!(err.line, 3);
    }

    #[test]
    fn test_lenient_keeps_good_statements() {
        let sql = "CREATE TABLE a (id INT);\nTHIS IS NOT SQL;\nCREATE TABLE b (id INT);";
        let (statements, errors) = parse_script_lenient(sql, Engine::MySql);
        assert_eq!(statements.len(), 2);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].line, 2);
    }

    #[test]
    fn test_reported_line() {
        assert_eq!(
            reported_line("sql parser error: Expected: an SQL statement, found: x at Line: 3, Column: 1"),
            Some(3)
        );
        assert_eq!(reported_line("sql parser error: oops"), None);
    }
}
