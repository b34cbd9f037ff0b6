//! Statement splitter
//!
//! Finds the `;` boundaries of a script while skipping quoted literals,
//! comments and dollar-quoted bodies, so each statement can be parsed on its
//! own and keep track of where it started.

use crate::dialect::Engine;

/// Byte range of one statement (without its terminating `;`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk {
    pub start: usize,
    pub end: usize,
}

/// Split SQL text into statement ranges by semicolons.
pub fn split_statements(sql: &str, engine: Engine) -> Vec<Chunk> {
    let mut chunks = Vec::new();
    let mut start = 0;
    let bytes = sql.as_bytes();
    let len = bytes.len();
    let backslash_escapes = engine.is_mysql_family();
    let mut i = 0;

    while i < len {
        match bytes[i] {
            quote @ (b'\'' | b'"' | b'`') => {
                i = skip_quoted(bytes, i, quote, backslash_escapes && quote != b'`');
            }
            b'$' if engine == Engine::Postgres => {
                if let Some(tag_end) = find_dollar_tag_end(sql, i) {
                    let tag = &sql[i..=tag_end];
                    i = tag_end + 1;
                    match sql[i..].find(tag) {
                        Some(close_pos) => i += close_pos + tag.len(),
                        None => i = len,
                    }
                } else {
                    i += 1;
                }
            }
            b'-' if i + 1 < len && bytes[i + 1] == b'-' => {
                while i < len && bytes[i] != b'\n' {
                    i += 1;
                }
            }
            b'#' if engine.hash_comments() => {
                while i < len && bytes[i] != b'\n' {
                    i += 1;
                }
            }
            b'/' if i + 1 < len && bytes[i + 1] == b'*' => {
                i += 2;
                while i < len {
                    if i + 1 < len && bytes[i] == b'*' && bytes[i + 1] == b'/' {
                        i += 2;
                        break;
                    }
                    i += 1;
                }
            }
            b';' => {
                push_chunk(&mut chunks, sql, start, i);
                start = i + 1;
                i += 1;
            }
            _ => {
                i += 1;
            }
        }
    }

    push_chunk(&mut chunks, sql, start, len);
    chunks
}

/// Byte length of the whitespace and comments a statement starts with.
///
/// MySQL `/*! ... */` comments are executable and end the scan.
pub fn leading_trivia(text: &str, engine: Engine) -> usize {
    let bytes = text.as_bytes();
    let len = bytes.len();
    let mut i = 0;
    loop {
        while i < len && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        let rest = &text[i..];
        if rest.starts_with("--") || (engine.hash_comments() && rest.starts_with('#')) {
            i += rest.find('\n').unwrap_or(rest.len());
        } else if rest.starts_with("/*") && !rest.starts_with("/*!") {
            i += rest.find("*/").map_or(rest.len(), |end| end + 2);
        } else {
            return i;
        }
    }
}

fn push_chunk(chunks: &mut Vec<Chunk>, sql: &str, start: usize, end: usize) {
    if !sql[start..end].trim().is_empty() {
        chunks.push(Chunk { start, end });
    }
}

/// Returns the index just past the closing quote.
fn skip_quoted(bytes: &[u8], open: usize, quote: u8, backslash_escapes: bool) -> usize {
    let len = bytes.len();
    let mut i = open + 1;
    while i < len {
        let b = bytes[i];
        if backslash_escapes && b == b'\\' {
            i += 2;
            continue;
        }
        if b == quote {
            if i + 1 < len && bytes[i + 1] == quote {
                i += 2;
                continue;
            }
            return i + 1;
        }
        i += 1;
    }
    len
}

/// Find the end of a dollar-quote tag starting at position `start`.
fn find_dollar_tag_end(sql: &str, start: usize) -> Option<usize> {
    let bytes = sql.as_bytes();
    let len = bytes.len();
    let mut i = start + 1;
    if i < len && bytes[i] == b'$' {
        return Some(i);
    }
    while i < len && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
        i += 1;
    }
    if i < len && bytes[i] == b'$' && i > start + 1 {
        Some(i)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(sql: &str, engine: Engine) -> Vec<&str> {
        split_statements(sql, engine)
            .into_iter()
            .map(|c| sql[c.start..c.end].trim())
            .collect()
    }

    #[test]
    fn test_split_simple() {
        let sql = "CREATE TABLE a (id INT); CREATE TABLE b (id INT);";
        assert_eq!(
            texts(sql, Engine::MySql),
            vec!["CREATE TABLE a (id INT)", "CREATE TABLE b (id INT)"]
        );
    }

    #[test]
    fn test_split_ignores_semicolons_in_literals_and_comments() {
        let sql = "SELECT 'a;b', `c;d` FROM t -- x;y\n; # p;q\nSELECT 1 /* ; */";
        let parts = texts(sql, Engine::MySql);
        assert_eq!(parts.len(), 2);
        assert!(parts[0].starts_with("SELECT 'a;b'"));
        assert!(parts[1].ends_with("SELECT 1 /* ; */"));
    }

    #[test]
    fn test_split_mysql_backslash_escape() {
        let sql = r"INSERT INTO t VALUES ('it\'s; fine'); SELECT 1";
        assert_eq!(texts(sql, Engine::MySql).len(), 2);
    }

    #[test]
    fn test_split_dollar_quoted_body() {
        let sql = "CREATE FUNCTION f() RETURNS int AS $$ SELECT 1; $$ LANGUAGE sql; SELECT 2";
        assert_eq!(texts(sql, Engine::Postgres).len(), 2);
    }

    #[test]
    fn test_leading_trivia() {
        let text = "  -- a\n# b\n/* c */ SELECT 1";
        assert_eq!(&text[leading_trivia(text, Engine::MySql)..], "SELECT 1");
        assert_eq!(leading_trivia("/*!40101 SET x = 1 */", Engine::MySql), 0);
        assert_eq!(leading_trivia("# b\nSELECT 1", Engine::Postgres), 0);
        assert_eq!(leading_trivia("-- only", Engine::MySql), 7);
    }

    #[test]
    fn test_split_drops_blank_tail() {
        let sql = "SELECT 1;\n\n  ";
        assert_eq!(texts(sql, Engine::MySql), vec!["SELECT 1"]);
    }
}
