//! Built-in rules

/// `base()`/`base_mut()` for rules that keep their [`BaseRule`](crate::rule::BaseRule)
/// in a field named `base`.
macro_rules! base_rule_accessors {
    () => {
        fn base(&self) -> &$crate::rule::BaseRule {
            &self.base
        }

        fn base_mut(&mut self) -> &mut $crate::rule::BaseRule {
            &mut self.base
        }
    };
}

mod column;
mod compatibility;
mod database;
mod dry_run;
mod join;
mod naming;
mod statement;
mod table;

use sqlparser::ast::{ColumnDef, ColumnOption, Ident, ObjectName};

use crate::schema::QualifiedName;

pub use column::{
    ColumnCommentRule, ColumnNoNullRule, ColumnTypeDisallowListRule, DisallowChangeColumnTypeRule,
};
pub use compatibility::BackwardCompatibilityRule;
pub use database::DropEmptyDatabaseRule;
pub use dry_run::DmlDryRunRule;
pub use join::JoinStrictColumnAttrsRule;
pub use naming::{
    ColumnNamingRule, ForeignKeyNamingRule, IndexKind, IndexNamingRule, TableNamingRule,
};
pub use statement::{
    DisallowLimitRule, InsertDisallowOrderByRandRule, InsertMustSpecifyColumnRule,
    NoSelectAllRule, RequireWhereRule, WhereDisallowFunctionsRule,
};
pub use table::{NoForeignKeyRule, RequirePrimaryKeyRule, TableLimitSizeRule};

fn join_idents(idents: &[Ident]) -> String {
    idents
        .iter()
        .map(|i| i.value.as_str())
        .collect::<Vec<_>>()
        .join("_")
}

fn table_name(name: &ObjectName) -> QualifiedName {
    QualifiedName::from_object_name(name)
}

/// Column declared NOT NULL, directly or through an inline PRIMARY KEY.
fn column_is_not_null(column: &ColumnDef) -> bool {
    column.options.iter().any(|o| {
        matches!(
            o.option,
            ColumnOption::NotNull | ColumnOption::Unique { is_primary: true, .. }
        )
    })
}

fn options_not_null(options: &[ColumnOption]) -> bool {
    options.iter().any(|o| {
        matches!(
            o,
            ColumnOption::NotNull | ColumnOption::Unique { is_primary: true, .. }
        )
    })
}
