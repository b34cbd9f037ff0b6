//! Column type normalization
//!
//! Snapshots report types the way the server prints them (`int(11)`,
//! `bigint(20) unsigned`, `character varying(20)`), while DDL can spell the
//! same type many ways. Both sides are reduced to one canonical lowercase
//! form before they are compared.

use sqlparser::ast::DataType;

const INTEGER_TYPES: [&str; 5] = ["tinyint", "smallint", "mediumint", "int", "bigint"];

/// Canonical type string of a parsed data type.
pub fn canonical_data_type(data_type: &DataType) -> String {
    canonical_type(&data_type.to_string())
}

/// Whether two type strings denote the same type.
pub fn same_type(a: &str, b: &str) -> bool {
    canonical_type(a) == canonical_type(b)
}

/// Normalize a type string.
pub fn canonical_type(raw: &str) -> String {
    let text = collapse_whitespace(&raw.to_lowercase());
    let text = replace_multiword_names(&text);

    let (name, rest) = split_name(&text);
    let (args, suffix) = split_args(rest);

    let (name, mut args) = match name {
        "integer" | "int4" => ("int", args),
        "int8" => ("bigint", args),
        "int2" => ("smallint", args),
        "bool" | "boolean" => ("tinyint", None),
        "numeric" | "dec" | "fixed" => ("decimal", args),
        "real" | "float8" => ("double", args),
        "float4" => ("float", args),
        other => (other, args),
    };

    if INTEGER_TYPES.contains(&name) {
        // Display width carries no type information.
        args = None;
    }
    if name == "decimal" {
        args = Some(match args.as_deref() {
            None => "(10,0)".to_string(),
            Some(a) if !a.contains(',') => format!("{},0)", a.trim_end_matches(')')),
            Some(a) => a.to_string(),
        });
    }

    let mut modifiers: Vec<&str> = suffix
        .split_whitespace()
        .filter(|word| *word != "signed")
        .collect();
    modifiers.sort_unstable();
    modifiers.dedup();

    let mut out = String::from(name);
    if let Some(args) = args {
        out.push_str(&args);
    }
    for modifier in modifiers {
        out.push(' ');
        out.push_str(modifier);
    }
    out
}

fn collapse_whitespace(text: &str) -> String {
    let joined = text.split_whitespace().collect::<Vec<_>>().join(" ");
    joined
        .replace(" (", "(")
        .replace("( ", "(")
        .replace(" )", ")")
        .replace(", ", ",")
        .replace(" ,", ",")
}

fn replace_multiword_names(text: &str) -> String {
    const NAMES: [(&str, &str); 5] = [
        ("character varying", "varchar"),
        ("double precision", "double"),
        ("timestamp without time zone", "timestamp"),
        ("timestamp with time zone", "timestamptz"),
        ("character", "char"),
    ];
    for (long, short) in NAMES {
        if let Some(rest) = text.strip_prefix(long) {
            return format!("{}{}", short, rest);
        }
    }
    text.to_string()
}

fn split_name(text: &str) -> (&str, &str) {
    let end = text
        .find(|c: char| c == '(' || c == ' ')
        .unwrap_or(text.len());
    (&text[..end], &text[end..])
}

/// Split `(args) suffix` into its two parts.
fn split_args(rest: &str) -> (Option<String>, &str) {
    if !rest.starts_with('(') {
        return (None, rest.trim());
    }
    let mut depth = 0;
    for (i, c) in rest.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return (Some(rest[..=i].to_string()), rest[i + 1..].trim());
                }
            }
            _ => {}
        }
    }
    (Some(rest.to_string()), "")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_integer_display_width_is_ignored() {
        assert!(same_type("int", "int(11)"));
        assert!(same_type("INTEGER", "int"));
        assert!(same_type("bigint(20) unsigned", "BIGINT UNSIGNED"));
        assert!(!same_type("int unsigned", "int"));
    }

    #[test]
    fn test_synonyms() {
        assert!(same_type("bool", "tinyint(1)"));
        assert!(same_type("numeric(10,2)", "DECIMAL(10, 2)"));
        assert!(same_type("decimal", "decimal(10,0)"));
        assert!(same_type("decimal(8)", "decimal(8,0)"));
        assert!(same_type("character varying(45)", "varchar(45)"));
        assert!(same_type("double precision", "double"));
    }

    #[test]
    fn test_lengths_matter_for_strings() {
        assert!(!same_type("varchar(20)", "varchar(30)"));
        assert_eq!(canonical_type("VARCHAR(20)"), "varchar(20)");
    }

    #[test]
    fn test_canonical_data_type() {
        let sql = "CREATE TABLE t (a INT(11) UNSIGNED, b VARCHAR(20))";
        let statements = sqlparser::parser::Parser::parse_sql(
            &sqlparser::dialect::MySqlDialect {},
            sql,
        )
        .unwrap();
        let sqlparser::ast::Statement::CreateTable(create) = &statements[0] else {
            panic!("expected CREATE TABLE");
        };
        assert_eq!(canonical_data_type(&create.columns[0].data_type), "int unsigned");
        assert_eq!(canonical_data_type(&create.columns[1].data_type), "varchar(20)");
    }
}
