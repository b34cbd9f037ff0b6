//! Database engine support

use serde::{Deserialize, Serialize};
use sqlparser::dialect::{Dialect, MySqlDialect, PostgreSqlDialect};
use std::str::FromStr;

/// Database engines a review can target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Engine {
    #[default]
    #[serde(alias = "mysql8")]
    MySql,
    TiDb,
    MariaDb,
    #[serde(alias = "postgresql", alias = "pg")]
    Postgres,
}

impl Engine {
    pub const ALL: [Engine; 4] = [Engine::MySql, Engine::TiDb, Engine::MariaDb, Engine::Postgres];

    /// Get the sqlparser dialect for parsing
    pub fn parser_dialect(&self) -> Box<dyn Dialect> {
        match self {
            Engine::Postgres => Box::new(PostgreSqlDialect {}),
            Engine::MySql | Engine::TiDb | Engine::MariaDb => Box::new(MySqlDialect {}),
        }
    }

    /// Get default schema name for this engine
    pub fn default_schema(&self) -> &'static str {
        match self {
            Engine::Postgres => "public",
            Engine::MySql | Engine::TiDb | Engine::MariaDb => "",
        }
    }

    /// MySQL wire-compatible engines share most rules.
    pub fn is_mysql_family(&self) -> bool {
        matches!(self, Engine::MySql | Engine::TiDb | Engine::MariaDb)
    }

    /// `#` starts a line comment.
    pub fn hash_comments(&self) -> bool {
        self.is_mysql_family()
    }
}

impl FromStr for Engine {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mysql" | "mysql8" => Ok(Engine::MySql),
            "tidb" => Ok(Engine::TiDb),
            "mariadb" => Ok(Engine::MariaDb),
            "postgresql" | "postgres" | "pg" => Ok(Engine::Postgres),
            _ => Err(format!(
                "Unknown engine: '{}'. Supported engines: mysql, tidb, mariadb, postgres.",
                s
            )),
        }
    }
}

impl std::fmt::Display for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Engine::MySql => write!(f, "mysql"),
            Engine::TiDb => write!(f, "tidb"),
            Engine::MariaDb => write!(f, "mariadb"),
            Engine::Postgres => write!(f, "postgres"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_from_str() {
        assert_eq!("MySQL".parse::<Engine>(), Ok(Engine::MySql));
        assert_eq!("pg".parse::<Engine>(), Ok(Engine::Postgres));
        assert!("sqlite".parse::<Engine>().is_err());
    }

    #[test]
    fn test_engine_deserialize_alias() {
        let engine: Engine = serde_json::from_str("\"postgresql\"").unwrap();
        assert_eq!(engine, Engine::Postgres);
        let engine: Engine = serde_json::from_str("\"tidb\"").unwrap();
        assert_eq!(engine, Engine::TiDb);
    }
}
