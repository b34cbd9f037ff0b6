//! Advice codes

use serde::{Serialize, Serializer};

/// Numeric identifier attached to every advice.
///
/// The integer values are stable and are what gets serialized, so downstream
/// consumers can key on them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Code {
    Ok,
    Internal,
    NotFound,
    Unsupported,

    CompatibilityDropDatabase,
    CompatibilityRenameTable,
    CompatibilityDropTable,
    CompatibilityRenameColumn,
    CompatibilityDropColumn,
    CompatibilityAddPrimaryKey,
    CompatibilityAddUniqueKey,
    CompatibilityAddForeignKey,
    CompatibilityAddCheck,
    CompatibilityAlterColumn,
    CompatibilityDropSchema,

    StatementSyntaxError,
    StatementNoWhere,
    StatementSelectAll,
    StatementDmlDryRunFailed,
    StatementJoinColumnAttrsNotMatch,
    StatementDisallowFunctionsAndCalculations,

    NamingTableConventionMismatch,
    NamingColumnConventionMismatch,
    NamingIndexConventionMismatch,
    NamingUkConventionMismatch,
    NamingFkConventionMismatch,

    ColumnNotExists,
    ColumnCannotNull,
    ChangeColumnType,
    ColumnExists,
    DropAllColumns,
    DisabledColumnType,
    CommentEmpty,
    CommentTooLong,

    TableNoPk,
    TableHasFk,
    TableNotExists,
    TableExists,
    TableExceedLimitSize,

    DatabaseNotEmpty,
    NotCurrentDatabase,
    DatabaseIsDeleted,

    IndexExists,
    PrimaryKeyExists,
    PrimaryKeyNotExists,

    UpdateUseLimit,
    InsertUseLimit,
    DeleteUseLimit,
    InsertNotSpecifyColumn,
    InsertUseOrderByRand,
}

impl Code {
    pub fn value(&self) -> i32 {
        match self {
            Code::Ok => 0,
            Code::Internal => 1,
            Code::NotFound => 2,
            Code::Unsupported => 3,

            Code::CompatibilityDropDatabase => 101,
            Code::CompatibilityRenameTable => 102,
            Code::CompatibilityDropTable => 103,
            Code::CompatibilityRenameColumn => 104,
            Code::CompatibilityDropColumn => 105,
            Code::CompatibilityAddPrimaryKey => 106,
            Code::CompatibilityAddUniqueKey => 107,
            Code::CompatibilityAddForeignKey => 108,
            Code::CompatibilityAddCheck => 109,
            Code::CompatibilityAlterColumn => 111,
            Code::CompatibilityDropSchema => 112,

            Code::StatementSyntaxError => 201,
            Code::StatementNoWhere => 202,
            Code::StatementSelectAll => 203,
            Code::StatementDmlDryRunFailed => 208,
            Code::StatementJoinColumnAttrsNotMatch => 226,
            Code::StatementDisallowFunctionsAndCalculations => 234,

            Code::NamingTableConventionMismatch => 301,
            Code::NamingColumnConventionMismatch => 302,
            Code::NamingIndexConventionMismatch => 303,
            Code::NamingUkConventionMismatch => 304,
            Code::NamingFkConventionMismatch => 305,

            Code::ColumnCannotNull => 402,
            Code::ChangeColumnType => 403,
            Code::ColumnNotExists => 405,
            Code::ColumnExists => 412,
            Code::DropAllColumns => 413,
            Code::DisabledColumnType => 414,
            Code::CommentEmpty => 1032,
            Code::CommentTooLong => 1301,

            Code::TableNoPk => 601,
            Code::TableHasFk => 602,
            Code::TableNotExists => 604,
            Code::TableExists => 607,
            Code::TableExceedLimitSize => 615,

            Code::DatabaseNotEmpty => 701,
            Code::NotCurrentDatabase => 702,
            Code::DatabaseIsDeleted => 703,

            Code::IndexExists => 805,
            Code::PrimaryKeyExists => 806,
            Code::PrimaryKeyNotExists => 808,

            Code::UpdateUseLimit => 1102,
            Code::InsertUseLimit => 1103,
            Code::DeleteUseLimit => 1106,
            Code::InsertNotSpecifyColumn => 1107,
            Code::InsertUseOrderByRand => 1108,
        }
    }
}

impl std::fmt::Display for Code {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.value())
    }
}

impl Serialize for Code {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i32(self.value())
    }
}
