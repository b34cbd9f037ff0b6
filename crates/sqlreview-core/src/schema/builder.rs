//! Snapshot builder - replays DDL into a SchemaSnapshot
//!
//! Every statement is checked against the state replayed so far. Creating a
//! table that already exists or dropping a column that does not is reported
//! as a [`WalkThroughError`]. A partial builder does not know the tables the
//! database already has: it tracks them from their first reference and never
//! reports them missing.

use std::collections::HashSet;

use sqlparser::ast::{
    AlterColumnOperation, AlterTableOperation, ColumnDef, ColumnOption, ColumnOptionDef,
    CreateIndex, CreateTable, DataType, Expr, Ident, Insert, MySQLColumnPosition, ObjectName,
    ObjectType, Statement, TableConstraint,
};
use tracing::{debug, warn};

use crate::ast::object_base_name;
use crate::dialect::Engine;
use crate::error::{SyntaxError, WalkThroughError};
use crate::parser::parse_script_lenient;
use crate::schema::{
    ColumnMetadata, IndexMetadata, QualifiedName, SchemaSnapshot, TableMetadata,
};
use crate::types::canonical_data_type;

const PRIMARY_KEY_NAME: &str = "PRIMARY";

/// Builder for constructing a snapshot from schema DDL
pub struct SnapshotBuilder {
    engine: Engine,
    snapshot: SchemaSnapshot,
    errors: Vec<SyntaxError>,
    conflicts: Vec<WalkThroughError>,
    /// Whether the snapshot lists every table of the database
    complete: bool,
    /// Tables known only by reference, as (schema, lowercase name)
    partial_tables: HashSet<(String, String)>,
    deleted: bool,
}

/// A table resolved within the snapshot
struct TableRef {
    schema: String,
    name: String,
    complete: bool,
}

impl SnapshotBuilder {
    /// Builder for a database that starts out empty.
    pub fn new(engine: Engine, database: impl Into<String>) -> Self {
        Self::from_snapshot(engine, SchemaSnapshot::new(database))
    }

    /// Builder continuing from a snapshot that lists every table.
    pub fn from_snapshot(engine: Engine, snapshot: SchemaSnapshot) -> Self {
        Self {
            engine,
            snapshot,
            errors: Vec::new(),
            conflicts: Vec::new(),
            complete: true,
            partial_tables: HashSet::new(),
            deleted: false,
        }
    }

    /// Builder for a database whose existing tables are unknown.
    pub fn partial(engine: Engine, database: impl Into<String>) -> Self {
        Self {
            complete: false,
            ..Self::new(engine, database)
        }
    }

    /// Replay a DDL script. Statements that fail to parse or conflict with
    /// the state so far are skipped and kept.
    pub fn parse(&mut self, sql: &str) -> &mut Self {
        let (statements, errors) = parse_script_lenient(sql, self.engine);
        for error in &errors {
            debug!(line = error.line, "skipping unparseable schema statement");
        }
        self.errors.extend(errors);
        for statement in &statements {
            if let Err(err) = self.apply(&statement.ast) {
                warn!(
                    line = statement.base_line + 1,
                    error = %err,
                    "skipping conflicting schema statement"
                );
                self.conflicts.push(err);
            }
        }
        self
    }

    /// Statements skipped so far
    pub fn errors(&self) -> &[SyntaxError] {
        &self.errors
    }

    pub fn conflicts(&self) -> &[WalkThroughError] {
        &self.conflicts
    }

    /// Consume the builder and return the snapshot
    pub fn build(self) -> SchemaSnapshot {
        self.snapshot
    }

    /// Apply one statement, or report why it cannot apply.
    ///
    /// A statement that fails may leave part of its changes applied.
    pub fn apply(&mut self, statement: &Statement) -> Result<(), WalkThroughError> {
        if self.deleted {
            return Err(WalkThroughError::DatabaseIsDeleted(
                self.snapshot.name.clone(),
            ));
        }
        match statement {
            Statement::CreateTable(create) => self.create_table(create),
            Statement::CreateIndex(index) => self.create_index(index),
            Statement::AlterTable {
                name,
                if_exists,
                operations,
                ..
            } => self.alter_table(name, *if_exists, operations),
            Statement::Drop {
                object_type,
                if_exists,
                names,
                ..
            } => self.drop(*object_type, *if_exists, names),
            Statement::CreateDatabase { db_name, .. } => {
                Err(WalkThroughError::AccessOtherDatabase {
                    current: self.snapshot.name.clone(),
                    target: object_base_name(db_name),
                })
            }
            Statement::Insert(insert) => self.check_insert(insert),
            _ => Ok(()),
        }
    }

    fn schema_name(&self, name: &QualifiedName) -> String {
        match &name.schema {
            Some(schema) if !schema.eq_ignore_ascii_case(&self.snapshot.name) => schema.clone(),
            _ => self.engine.default_schema().to_string(),
        }
    }

    /// MySQL names qualify tables by database.
    fn check_database(&self, name: &QualifiedName) -> Result<(), WalkThroughError> {
        let current = &self.snapshot.name;
        match &name.schema {
            Some(database)
                if self.engine.is_mysql_family()
                    && !current.is_empty()
                    && !database.eq_ignore_ascii_case(current) =>
            {
                Err(WalkThroughError::AccessOtherDatabase {
                    current: current.clone(),
                    target: database.clone(),
                })
            }
            _ => Ok(()),
        }
    }

    fn table_key(&self, schema: &str, name: &str) -> Option<String> {
        self.snapshot
            .schemas
            .get(schema)
            .and_then(|s| s.table_key(name))
    }

    fn find_table(&mut self, name: &ObjectName) -> Result<TableRef, WalkThroughError> {
        let qualified = QualifiedName::from_object_name(name);
        self.check_database(&qualified)?;
        let schema = self.schema_name(&qualified);
        let name = match self.table_key(&schema, &qualified.name) {
            Some(key) => key,
            None if self.complete => return Err(WalkThroughError::TableNotExists(qualified.name)),
            None => {
                self.snapshot
                    .schema_mut(&schema)
                    .tables
                    .insert(qualified.name.clone(), TableMetadata::default());
                self.partial_tables
                    .insert(partial_key(&schema, &qualified.name));
                qualified.name
            }
        };
        let complete = !self.partial_tables.contains(&partial_key(&schema, &name));
        Ok(TableRef {
            schema,
            name,
            complete,
        })
    }

    fn table_mut(&mut self, table: &TableRef) -> &mut TableMetadata {
        self.snapshot
            .schema_mut(&table.schema)
            .tables
            .entry(table.name.clone())
            .or_default()
    }

    fn editor<'a>(&'a mut self, table: &'a TableRef) -> TableEditor<'a> {
        TableEditor {
            name: &table.name,
            complete: table.complete,
            table: self.table_mut(table),
        }
    }

    fn remove_table(&mut self, schema: &str, name: &str) -> Option<TableMetadata> {
        self.partial_tables.remove(&partial_key(schema, name));
        let key = self.table_key(schema, name)?;
        self.snapshot.schema_mut(schema).tables.shift_remove(&key)
    }

    fn create_table(&mut self, create: &CreateTable) -> Result<(), WalkThroughError> {
        let qualified = QualifiedName::from_object_name(&create.name);
        self.check_database(&qualified)?;
        let schema = self.schema_name(&qualified);
        if self.table_key(&schema, &qualified.name).is_some() {
            if create.if_not_exists {
                return Ok(());
            }
            return Err(WalkThroughError::TableExists(qualified.name));
        }

        let (metadata, complete) = match &create.like {
            Some(like) => {
                let source = self.find_table(like)?;
                (self.table_mut(&source).clone(), source.complete)
            }
            None => (TableMetadata::default(), create.query.is_none()),
        };
        self.snapshot
            .schema_mut(&schema)
            .tables
            .insert(qualified.name.clone(), metadata);
        if !complete {
            self.partial_tables
                .insert(partial_key(&schema, &qualified.name));
        }

        let table = TableRef {
            schema,
            name: qualified.name,
            complete,
        };
        let mut editor = self.editor(&table);
        for column in &create.columns {
            editor.create_column(column, None, None)?;
        }
        for constraint in &create.constraints {
            editor.create_constraint(constraint)?;
        }
        Ok(())
    }

    fn create_index(&mut self, create: &CreateIndex) -> Result<(), WalkThroughError> {
        let table = self.find_table(&create.table_name)?;
        let mut editor = self.editor(&table);
        let name = create
            .name
            .as_ref()
            .map(object_base_name)
            .unwrap_or_default();
        if create.if_not_exists && editor.table.get_index(&name).is_some() {
            return Ok(());
        }

        let mut expressions = Vec::with_capacity(create.columns.len());
        for column in &create.columns {
            match &column.expr {
                Expr::Identifier(ident) => expressions.push(editor.key_column(&ident.value, false)?),
                expr => expressions.push(expr.to_string()),
            }
        }
        editor.create_index(IndexMetadata {
            name,
            unique: create.unique,
            primary: false,
            expressions,
        })
    }

    fn alter_table(
        &mut self,
        name: &ObjectName,
        if_exists: bool,
        operations: &[AlterTableOperation],
    ) -> Result<(), WalkThroughError> {
        let mut table = match self.find_table(name) {
            Err(WalkThroughError::TableNotExists(_)) if if_exists => return Ok(()),
            result => result?,
        };

        for operation in operations {
            if let AlterTableOperation::RenameTable { table_name } = operation {
                match self.rename_table(&table, table_name)? {
                    Some(renamed) => table = renamed,
                    None => return Ok(()),
                }
                continue;
            }
            self.editor(&table).alter(operation)?;
        }
        Ok(())
    }

    /// Rename `table`, or drop it when it moves to another database.
    fn rename_table(
        &mut self,
        table: &TableRef,
        new_name: &ObjectName,
    ) -> Result<Option<TableRef>, WalkThroughError> {
        let target = QualifiedName::from_object_name(new_name);
        let schema = match &target.schema {
            Some(_) if self.check_database(&target).is_err() => {
                self.remove_table(&table.schema, &table.name);
                return Ok(None);
            }
            Some(_) => self.schema_name(&target),
            None => table.schema.clone(),
        };

        let same_table = schema == table.schema && target.name.eq_ignore_ascii_case(&table.name);
        if !same_table && self.table_key(&schema, &target.name).is_some() {
            return Err(WalkThroughError::TableExists(target.name));
        }

        let metadata = self
            .remove_table(&table.schema, &table.name)
            .unwrap_or_default();
        self.snapshot
            .schema_mut(&schema)
            .tables
            .insert(target.name.clone(), metadata);
        if !table.complete {
            self.partial_tables.insert(partial_key(&schema, &target.name));
        }
        Ok(Some(TableRef {
            schema,
            name: target.name,
            complete: table.complete,
        }))
    }

    fn drop(
        &mut self,
        object_type: ObjectType,
        if_exists: bool,
        names: &[ObjectName],
    ) -> Result<(), WalkThroughError> {
        match object_type {
            ObjectType::Table => names
                .iter()
                .try_for_each(|name| self.drop_table(name, if_exists)),
            ObjectType::Index => {
                for name in names {
                    self.drop_index(name);
                }
                Ok(())
            }
            ObjectType::Database => names.iter().try_for_each(|name| self.drop_database(name)),
            ObjectType::Schema if self.engine.is_mysql_family() => {
                names.iter().try_for_each(|name| self.drop_database(name))
            }
            _ => Ok(()),
        }
    }

    fn drop_table(&mut self, name: &ObjectName, if_exists: bool) -> Result<(), WalkThroughError> {
        let qualified = QualifiedName::from_object_name(name);
        self.check_database(&qualified)?;
        let schema = self.schema_name(&qualified);
        match self.table_key(&schema, &qualified.name) {
            Some(key) => {
                self.remove_table(&schema, &key);
                Ok(())
            }
            None if if_exists || !self.complete => Ok(()),
            None => Err(WalkThroughError::TableNotExists(qualified.name)),
        }
    }

    fn drop_index(&mut self, name: &ObjectName) {
        let qualified = QualifiedName::from_object_name(name);
        let schema = self.schema_name(&qualified);
        if let Some(schema) = self.snapshot.schemas.get_mut(&schema) {
            for table in schema.tables.values_mut() {
                table
                    .indexes
                    .retain(|i| !i.name.eq_ignore_ascii_case(&qualified.name));
            }
        }
    }

    fn drop_database(&mut self, name: &ObjectName) -> Result<(), WalkThroughError> {
        let target = object_base_name(name);
        if self.snapshot.name.is_empty() {
            self.snapshot.name = target;
        } else if !self.snapshot.name.eq_ignore_ascii_case(&target) {
            return Err(WalkThroughError::AccessOtherDatabase {
                current: self.snapshot.name.clone(),
                target,
            });
        }
        self.deleted = true;
        Ok(())
    }

    fn check_insert(&mut self, insert: &Insert) -> Result<(), WalkThroughError> {
        let table = self.find_table(&insert.table_name)?;
        if !table.complete {
            return Ok(());
        }
        let metadata = self.table_mut(&table);
        match insert
            .columns
            .iter()
            .find(|c| metadata.get_column(&c.value).is_none())
        {
            Some(column) => Err(WalkThroughError::ColumnNotExists {
                table: table.name.clone(),
                column: column.value.clone(),
            }),
            None => Ok(()),
        }
    }
}

fn partial_key(schema: &str, name: &str) -> (String, String) {
    (schema.to_string(), name.to_lowercase())
}

/// Changes to one table. Checks for missing columns only apply when the
/// table is complete.
struct TableEditor<'a> {
    name: &'a str,
    complete: bool,
    table: &'a mut TableMetadata,
}

impl TableEditor<'_> {
    fn alter(&mut self, operation: &AlterTableOperation) -> Result<(), WalkThroughError> {
        match operation {
            AlterTableOperation::AddColumn {
                if_not_exists,
                column_def,
                column_position,
                ..
            } => {
                if *if_not_exists && self.table.get_column(&column_def.name.value).is_some() {
                    return Ok(());
                }
                self.create_column(column_def, column_position.as_ref(), None)
            }
            AlterTableOperation::DropColumn {
                column_name,
                if_exists,
                ..
            } => self.drop_column(&column_name.value, *if_exists),
            AlterTableOperation::RenameColumn {
                old_column_name,
                new_column_name,
            } => self.rename_column(&old_column_name.value, &new_column_name.value),
            AlterTableOperation::ModifyColumn {
                col_name,
                data_type,
                options,
                column_position,
            } => self.change_column(col_name, col_name, data_type, options, column_position.as_ref()),
            AlterTableOperation::ChangeColumn {
                old_name,
                new_name,
                data_type,
                options,
                column_position,
            } => self.change_column(old_name, new_name, data_type, options, column_position.as_ref()),
            AlterTableOperation::AlterColumn { column_name, op } => {
                self.alter_column(&column_name.value, op)
            }
            AlterTableOperation::AddConstraint(constraint) => self.create_constraint(constraint),
            AlterTableOperation::DropPrimaryKey => self.drop_primary_key(),
            AlterTableOperation::DropConstraint { name, .. } => {
                self.table
                    .indexes
                    .retain(|i| !i.name.eq_ignore_ascii_case(&name.value));
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn column_not_exists(&self, column: &str) -> WalkThroughError {
        WalkThroughError::ColumnNotExists {
            table: self.name.to_string(),
            column: column.to_string(),
        }
    }

    fn column_index(&self, name: &str) -> Option<usize> {
        self.table
            .columns
            .iter()
            .position(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// Insert a column at `position`, or at `slot` when none is given.
    fn create_column(
        &mut self,
        column: &ColumnDef,
        position: Option<&MySQLColumnPosition>,
        slot: Option<usize>,
    ) -> Result<(), WalkThroughError> {
        if self.table.get_column(&column.name.value).is_some() {
            return Err(WalkThroughError::ColumnExists {
                table: self.name.to_string(),
                column: column.name.value.clone(),
            });
        }

        let at = match position {
            Some(_) if !self.complete => self.table.columns.len(),
            Some(MySQLColumnPosition::First) => 0,
            Some(MySQLColumnPosition::After(after)) => match self.column_index(&after.value) {
                Some(i) => i + 1,
                None => return Err(self.column_not_exists(&after.value)),
            },
            None => slot.unwrap_or(self.table.columns.len()),
        };

        let (metadata, index) = column_metadata(column);
        self.table.columns.insert(at, metadata);
        match index {
            Some(index) => self.create_index(index),
            None => Ok(()),
        }
    }

    fn drop_column(&mut self, name: &str, if_exists: bool) -> Result<(), WalkThroughError> {
        let Some(at) = self.column_index(name) else {
            if self.complete && !if_exists {
                return Err(self.column_not_exists(name));
            }
            return Ok(());
        };
        if self.complete && self.table.columns.len() == 1 {
            return Err(WalkThroughError::DropAllColumns(self.name.to_string()));
        }

        self.table.columns.remove(at);
        for index in &mut self.table.indexes {
            index.expressions.retain(|e| !e.eq_ignore_ascii_case(name));
        }
        self.table.indexes.retain(|i| !i.expressions.is_empty());
        Ok(())
    }

    /// MODIFY and CHANGE: replace the definition, keeping the column's place.
    fn change_column(
        &mut self,
        old_name: &Ident,
        new_name: &Ident,
        data_type: &DataType,
        options: &[ColumnOption],
        position: Option<&MySQLColumnPosition>,
    ) -> Result<(), WalkThroughError> {
        let slot = self.column_index(&old_name.value);
        match slot {
            Some(at) => {
                self.table.columns.remove(at);
            }
            None if self.complete => return Err(self.column_not_exists(&old_name.value)),
            None => {}
        }
        self.rename_in_indexes(&old_name.value, &new_name.value);

        let column = ColumnDef {
            name: new_name.clone(),
            data_type: data_type.clone(),
            collation: None,
            options: options
                .iter()
                .map(|option| ColumnOptionDef {
                    name: None,
                    option: option.clone(),
                })
                .collect(),
        };
        self.create_column(&column, position, slot)
    }

    fn rename_column(&mut self, old_name: &str, new_name: &str) -> Result<(), WalkThroughError> {
        if self.complete && self.table.get_column(old_name).is_none() {
            return Err(self.column_not_exists(old_name));
        }
        if !old_name.eq_ignore_ascii_case(new_name) && self.table.get_column(new_name).is_some() {
            return Err(WalkThroughError::ColumnExists {
                table: self.name.to_string(),
                column: new_name.to_string(),
            });
        }

        match self.table.get_column_mut(old_name) {
            Some(column) => column.name = new_name.to_string(),
            None => self.table.columns.push(ColumnMetadata::new(new_name, "")),
        }
        self.rename_in_indexes(old_name, new_name);
        Ok(())
    }

    /// Postgres `ALTER COLUMN`
    fn alter_column(&mut self, name: &str, op: &AlterColumnOperation) -> Result<(), WalkThroughError> {
        let Some(column) = self.table.get_column_mut(name) else {
            if self.complete {
                return Err(self.column_not_exists(name));
            }
            return Ok(());
        };
        match op {
            AlterColumnOperation::SetNotNull => column.nullable = false,
            AlterColumnOperation::DropNotNull => column.nullable = true,
            AlterColumnOperation::SetDataType { data_type, .. } => {
                column.column_type = canonical_data_type(data_type);
            }
            _ => {}
        }
        Ok(())
    }

    fn rename_in_indexes(&mut self, old_name: &str, new_name: &str) {
        for index in &mut self.table.indexes {
            for expression in &mut index.expressions {
                if expression.eq_ignore_ascii_case(old_name) {
                    *expression = new_name.to_string();
                }
            }
        }
    }

    /// Canonical key column name; primary key columns become NOT NULL.
    fn key_column(&mut self, name: &str, primary: bool) -> Result<String, WalkThroughError> {
        match self.table.get_column_mut(name) {
            Some(column) => {
                if primary {
                    column.nullable = false;
                }
                Ok(column.name.clone())
            }
            None if self.complete => Err(self.column_not_exists(name)),
            None => Ok(name.to_string()),
        }
    }

    fn create_constraint(&mut self, constraint: &TableConstraint) -> Result<(), WalkThroughError> {
        let Some(mut index) = constraint_index(constraint) else {
            return Ok(());
        };
        let mut expressions = Vec::with_capacity(index.expressions.len());
        for column in &index.expressions {
            expressions.push(self.key_column(column, index.primary)?);
        }
        index.expressions = expressions;
        self.create_index(index)
    }

    fn create_index(&mut self, mut index: IndexMetadata) -> Result<(), WalkThroughError> {
        if index.primary {
            if self.table.primary_key().is_some() {
                return Err(WalkThroughError::PrimaryKeyExists(self.name.to_string()));
            }
        } else if index.name.is_empty() {
            index.name = self.generated_index_name(&index.expressions);
        } else if self.table.get_index(&index.name).is_some() {
            return Err(WalkThroughError::IndexExists {
                table: self.name.to_string(),
                index: index.name,
            });
        }
        self.table.indexes.push(index);
        Ok(())
    }

    /// First key column, suffixed `_2`, `_3`, ... until unused.
    fn generated_index_name(&self, expressions: &[String]) -> String {
        let base = expressions.first().cloned().unwrap_or_default();
        let mut name = base.clone();
        let mut suffix = 1;
        while self.table.get_index(&name).is_some() {
            suffix += 1;
            name = format!("{}_{}", base, suffix);
        }
        name
    }

    fn drop_primary_key(&mut self) -> Result<(), WalkThroughError> {
        if self.complete && self.table.primary_key().is_none() {
            return Err(WalkThroughError::PrimaryKeyNotExists(self.name.to_string()));
        }
        self.table.indexes.retain(|i| !i.primary);
        Ok(())
    }
}

/// Column metadata plus the index an inline PRIMARY KEY / UNIQUE creates.
/// Inline unique indexes are left unnamed.
fn column_metadata(column: &ColumnDef) -> (ColumnMetadata, Option<IndexMetadata>) {
    let mut metadata = ColumnMetadata::new(&column.name.value, canonical_data_type(&column.data_type));
    metadata.collation = column.collation.as_ref().map(|c| c.to_string());
    let mut index = None;

    for option in &column.options {
        match &option.option {
            ColumnOption::Null => metadata.nullable = true,
            ColumnOption::NotNull => metadata.nullable = false,
            ColumnOption::CharacterSet(name) => metadata.character_set = Some(name.to_string()),
            ColumnOption::Comment(comment) => metadata.comment = Some(comment.clone()),
            ColumnOption::Unique { is_primary, .. } => {
                if *is_primary {
                    metadata.nullable = false;
                }
                index = Some(IndexMetadata {
                    name: if *is_primary {
                        PRIMARY_KEY_NAME.to_string()
                    } else {
                        String::new()
                    },
                    unique: true,
                    primary: *is_primary,
                    expressions: vec![column.name.value.clone()],
                });
            }
            _ => {}
        }
    }

    (metadata, index)
}

/// Index a constraint creates; unnamed indexes get an empty name.
fn constraint_index(constraint: &TableConstraint) -> Option<IndexMetadata> {
    let idents = |columns: &[Ident]| -> Vec<String> {
        columns.iter().map(|c| c.value.clone()).collect()
    };
    match constraint {
        TableConstraint::PrimaryKey { columns, .. } => Some(IndexMetadata {
            name: PRIMARY_KEY_NAME.to_string(),
            unique: true,
            primary: true,
            expressions: idents(columns),
        }),
        TableConstraint::Unique {
            name,
            index_name,
            columns,
            ..
        } => Some(IndexMetadata {
            name: index_name
                .as_ref()
                .or(name.as_ref())
                .map(|n| n.value.clone())
                .unwrap_or_default(),
            unique: true,
            primary: false,
            expressions: idents(columns),
        }),
        TableConstraint::Index { name, columns, .. } => Some(IndexMetadata {
            name: name.as_ref().map(|n| n.value.clone()).unwrap_or_default(),
            unique: false,
            primary: false,
            expressions: idents(columns),
        }),
        _ => None,
    }
}
