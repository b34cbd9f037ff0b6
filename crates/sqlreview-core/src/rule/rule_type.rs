use std::str::FromStr;

use crate::error::ReviewError;

/// Identifier of a built-in rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RuleType {
    NamingTable,
    NamingColumn,
    NamingIndexIdx,
    NamingIndexUk,
    NamingIndexFk,
    TableRequirePk,
    TableNoForeignKey,
    TableLimitSize,
    ColumnNoNull,
    ColumnDisallowChangeType,
    ColumnComment,
    ColumnTypeDisallowList,
    StatementRequireWhere,
    StatementNoSelectAll,
    StatementWhereDisallowFunctionsAndCalculations,
    StatementDisallowLimit,
    StatementInsertMustSpecifyColumn,
    StatementInsertDisallowOrderByRand,
    StatementJoinStrictColumnAttrs,
    StatementDmlDryRun,
    SchemaBackwardCompatibility,
    DatabaseDropEmptyDatabase,
}

impl RuleType {
    pub const ALL: [RuleType; 22] = [
        RuleType::NamingTable,
        RuleType::NamingColumn,
        RuleType::NamingIndexIdx,
        RuleType::NamingIndexUk,
        RuleType::NamingIndexFk,
        RuleType::TableRequirePk,
        RuleType::TableNoForeignKey,
        RuleType::TableLimitSize,
        RuleType::ColumnNoNull,
        RuleType::ColumnDisallowChangeType,
        RuleType::ColumnComment,
        RuleType::ColumnTypeDisallowList,
        RuleType::StatementRequireWhere,
        RuleType::StatementNoSelectAll,
        RuleType::StatementWhereDisallowFunctionsAndCalculations,
        RuleType::StatementDisallowLimit,
        RuleType::StatementInsertMustSpecifyColumn,
        RuleType::StatementInsertDisallowOrderByRand,
        RuleType::StatementJoinStrictColumnAttrs,
        RuleType::StatementDmlDryRun,
        RuleType::SchemaBackwardCompatibility,
        RuleType::DatabaseDropEmptyDatabase,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RuleType::NamingTable => "naming.table",
            RuleType::NamingColumn => "naming.column",
            RuleType::NamingIndexIdx => "naming.index.idx",
            RuleType::NamingIndexUk => "naming.index.uk",
            RuleType::NamingIndexFk => "naming.index.fk",
            RuleType::TableRequirePk => "table.require-pk",
            RuleType::TableNoForeignKey => "table.no-foreign-key",
            RuleType::TableLimitSize => "table.limit-size",
            RuleType::ColumnNoNull => "column.no-null",
            RuleType::ColumnDisallowChangeType => "column.disallow-change-type",
            RuleType::ColumnComment => "column.comment",
            RuleType::ColumnTypeDisallowList => "column.type-disallow-list",
            RuleType::StatementRequireWhere => "statement.where.require",
            RuleType::StatementNoSelectAll => "statement.select.no-select-all",
            RuleType::StatementWhereDisallowFunctionsAndCalculations => {
                "statement.where.disallow-functions-and-calculations"
            }
            RuleType::StatementDisallowLimit => "statement.disallow-limit",
            RuleType::StatementInsertMustSpecifyColumn => "statement.insert.must-specify-column",
            RuleType::StatementInsertDisallowOrderByRand => {
                "statement.insert.disallow-order-by-rand"
            }
            RuleType::StatementJoinStrictColumnAttrs => "statement.join-strict-column-attrs",
            RuleType::StatementDmlDryRun => "statement.dml-dry-run",
            RuleType::SchemaBackwardCompatibility => "schema.backward-compatibility",
            RuleType::DatabaseDropEmptyDatabase => "database.drop-empty-database",
        }
    }
}

impl FromStr for RuleType {
    type Err = ReviewError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RuleType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| ReviewError::UnknownRuleType(s.to_string()))
    }
}

impl std::fmt::Display for RuleType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_type_parses_back() {
        for rule_type in RuleType::ALL {
            assert_eq!(rule_type.as_str().parse::<RuleType>().ok(), Some(rule_type));
        }
        assert!("naming.bogus".parse::<RuleType>().is_err());
    }
}
