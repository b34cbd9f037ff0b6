//! Schema snapshot - point-in-time view of a database's structure

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Metadata of one database: schema name -> table name -> table.
///
/// MySQL-family databases have a single schema keyed by the empty string.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaSnapshot {
    /// Database name
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub character_set: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collation: Option<String>,
    #[serde(default)]
    pub schemas: IndexMap<String, SchemaMetadata>,
}

impl SchemaSnapshot {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn database_name(&self) -> &str {
        &self.name
    }

    /// True when no schema holds any table.
    pub fn has_no_table(&self) -> bool {
        self.schemas.values().all(|s| s.tables.is_empty())
    }

    /// Resolve a schema by name, or the default schema when `name` is `None`
    /// (or names the database itself, as `db.table` does in MySQL).
    pub fn schema(&self, name: Option<&str>) -> Option<&SchemaMetadata> {
        if let Some(name) = name {
            if let Some(schema) = find_ignore_case(&self.schemas, name) {
                return Some(schema);
            }
            if !name.eq_ignore_ascii_case(&self.name) {
                return None;
            }
        }
        self.schemas
            .get("")
            .or_else(|| self.schemas.get("public"))
            .or_else(|| {
                if self.schemas.len() == 1 {
                    self.schemas.values().next()
                } else {
                    None
                }
            })
    }

    /// Get or create a schema
    pub fn schema_mut(&mut self, name: &str) -> &mut SchemaMetadata {
        self.schemas.entry(name.to_string()).or_default()
    }

    /// Look up a table by name
    pub fn get_table(&self, name: &QualifiedName) -> Option<&TableMetadata> {
        self.schema(name.schema.as_deref())
            .and_then(|schema| schema.get_table(&name.name))
    }

    /// Look up a column of a table
    pub fn get_column(&self, table: &QualifiedName, column: &str) -> Option<&ColumnMetadata> {
        self.get_table(table).and_then(|t| t.get_column(column))
    }

    /// Look up an index of a table
    pub fn get_index(&self, table: &QualifiedName, index: &str) -> Option<&IndexMetadata> {
        self.get_table(table).and_then(|t| t.get_index(index))
    }
}

fn find_ignore_case<'m, V>(map: &'m IndexMap<String, V>, key: &str) -> Option<&'m V> {
    map.get(key).or_else(|| {
        map.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v)
    })
}

/// A database schema (namespace)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaMetadata {
    #[serde(default)]
    pub tables: IndexMap<String, TableMetadata>,
}

impl SchemaMetadata {
    pub fn get_table(&self, name: &str) -> Option<&TableMetadata> {
        find_ignore_case(&self.tables, name)
    }

    /// Key under which `name` is stored, if present.
    pub fn table_key(&self, name: &str) -> Option<String> {
        self.tables
            .keys()
            .find(|k| k.eq_ignore_ascii_case(name))
            .cloned()
    }
}

/// Qualified name (schema.table or just table)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QualifiedName {
    pub schema: Option<String>,
    pub name: String,
}

impl QualifiedName {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            schema: None,
            name: name.into(),
        }
    }

    pub fn with_schema(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            schema: Some(schema.into()),
            name: name.into(),
        }
    }

    /// Parse from a dotted name like "schema.table" or just "table"
    pub fn parse(s: &str) -> Self {
        match s.split_once('.') {
            Some((schema, name)) => Self::with_schema(schema, name),
            None => Self::new(s),
        }
    }

    /// Convert a parsed object name, keeping its last two parts.
    pub fn from_object_name(name: &sqlparser::ast::ObjectName) -> Self {
        match name.0.as_slice() {
            [table] => Self::new(&table.value),
            [.., schema, table] => Self::with_schema(&schema.value, &table.value),
            [] => Self::new(String::new()),
        }
    }
}

impl std::fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.schema {
            Some(schema) => write!(f, "{}.{}", schema, self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

/// Table metadata
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableMetadata {
    #[serde(default)]
    pub columns: Vec<ColumnMetadata>,
    #[serde(default)]
    pub indexes: Vec<IndexMetadata>,
    #[serde(default)]
    pub row_count: i64,
    #[serde(default)]
    pub data_size: i64,
}

impl TableMetadata {
    /// Get a column by name
    pub fn get_column(&self, name: &str) -> Option<&ColumnMetadata> {
        // Case-insensitive lookup
        self.columns
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }

    pub fn get_column_mut(&mut self, name: &str) -> Option<&mut ColumnMetadata> {
        self.columns
            .iter_mut()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }

    pub fn get_index(&self, name: &str) -> Option<&IndexMetadata> {
        self.indexes
            .iter()
            .find(|i| i.name.eq_ignore_ascii_case(name))
    }

    pub fn primary_key(&self) -> Option<&IndexMetadata> {
        self.indexes.iter().find(|i| i.primary)
    }
}

/// Column metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnMetadata {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: String,
    #[serde(default = "default_nullable")]
    pub nullable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub character_set: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

fn default_nullable() -> bool {
    true
}

impl ColumnMetadata {
    pub fn new(name: impl Into<String>, column_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            column_type: column_type.into(),
            nullable: true,
            character_set: None,
            collation: None,
            comment: None,
        }
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }
}

/// Index metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexMetadata {
    pub name: String,
    #[serde(default)]
    pub unique: bool,
    #[serde(default)]
    pub primary: bool,
    /// Indexed columns or expressions
    #[serde(default)]
    pub expressions: Vec<String>,
}
