//! Rule registry
//!
//! Maps an (engine, rule type) pair to the factory that builds the rule.
//! A rule type missing for an engine simply does not run for that engine.

use std::collections::HashMap;

use tracing::{trace, warn};

use super::{Rule, RuleConfig, RuleType};
use crate::context::ReviewContext;
use crate::dialect::Engine;
use crate::error::ReviewError;
use crate::rules::{
    BackwardCompatibilityRule, ColumnCommentRule, ColumnNamingRule, ColumnNoNullRule,
    ColumnTypeDisallowListRule, DisallowChangeColumnTypeRule, DisallowLimitRule, DmlDryRunRule,
    DropEmptyDatabaseRule, ForeignKeyNamingRule, IndexNamingRule, InsertDisallowOrderByRandRule,
    InsertMustSpecifyColumnRule, JoinStrictColumnAttrsRule, NoForeignKeyRule, NoSelectAllRule,
    RequirePrimaryKeyRule, RequireWhereRule, TableLimitSizeRule, TableNamingRule,
    WhereDisallowFunctionsRule,
};

/// Builds a rule instance from its configuration
pub type RuleFactory = fn(&RuleConfig, &ReviewContext) -> Result<Box<dyn Rule>, ReviewError>;

#[derive(Default)]
pub struct RuleRegistry {
    factories: HashMap<(Engine, RuleType), RuleFactory>,
}

impl RuleRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every built-in rule.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();

        let common: [(RuleType, RuleFactory); 18] = [
            (RuleType::NamingTable, TableNamingRule::build),
            (RuleType::NamingColumn, ColumnNamingRule::build),
            (RuleType::NamingIndexIdx, IndexNamingRule::build_index),
            (RuleType::NamingIndexUk, IndexNamingRule::build_unique_key),
            (RuleType::NamingIndexFk, ForeignKeyNamingRule::build),
            (RuleType::TableRequirePk, RequirePrimaryKeyRule::build),
            (RuleType::TableNoForeignKey, NoForeignKeyRule::build),
            (RuleType::TableLimitSize, TableLimitSizeRule::build),
            (RuleType::ColumnNoNull, ColumnNoNullRule::build),
            (
                RuleType::ColumnDisallowChangeType,
                DisallowChangeColumnTypeRule::build,
            ),
            (RuleType::ColumnTypeDisallowList, ColumnTypeDisallowListRule::build),
            (RuleType::StatementRequireWhere, RequireWhereRule::build),
            (RuleType::StatementNoSelectAll, NoSelectAllRule::build),
            (
                RuleType::StatementWhereDisallowFunctionsAndCalculations,
                WhereDisallowFunctionsRule::build,
            ),
            (
                RuleType::StatementInsertMustSpecifyColumn,
                InsertMustSpecifyColumnRule::build,
            ),
            (
                RuleType::StatementJoinStrictColumnAttrs,
                JoinStrictColumnAttrsRule::build,
            ),
            (RuleType::StatementDmlDryRun, DmlDryRunRule::build),
            (
                RuleType::SchemaBackwardCompatibility,
                BackwardCompatibilityRule::build,
            ),
        ];
        for engine in Engine::ALL {
            for (rule_type, factory) in common {
                registry.register(engine, rule_type, factory);
            }
        }

        // MySQL syntax only
        let mysql_family: [(RuleType, RuleFactory); 4] = [
            (RuleType::ColumnComment, ColumnCommentRule::build),
            (RuleType::StatementDisallowLimit, DisallowLimitRule::build),
            (
                RuleType::StatementInsertDisallowOrderByRand,
                InsertDisallowOrderByRandRule::build,
            ),
            (
                RuleType::DatabaseDropEmptyDatabase,
                DropEmptyDatabaseRule::build,
            ),
        ];
        for engine in Engine::ALL.into_iter().filter(Engine::is_mysql_family) {
            for (rule_type, factory) in mysql_family {
                registry.register(engine, rule_type, factory);
            }
        }

        registry
    }

    /// Register (or replace) the factory for one engine and rule type.
    pub fn register(&mut self, engine: Engine, rule_type: RuleType, factory: RuleFactory) {
        trace!(%engine, rule = rule_type.as_str(), "registering rule");
        self.factories.insert((engine, rule_type), factory);
    }

    pub fn get(&self, engine: Engine, rule_type: RuleType) -> Option<RuleFactory> {
        self.factories.get(&(engine, rule_type)).copied()
    }

    /// Rule types available for `engine`, sorted.
    pub fn rule_types(&self, engine: Engine) -> Vec<RuleType> {
        let mut types: Vec<RuleType> = self
            .factories
            .keys()
            .filter(|(e, _)| *e == engine)
            .map(|(_, t)| *t)
            .collect();
        types.sort();
        types
    }

    /// Build the rule described by `config` for the context's engine.
    ///
    /// Unknown rule types and types without an implementation for the engine
    /// are skipped with a warning. Payload and template problems are errors.
    pub fn build(
        &self,
        config: &RuleConfig,
        context: &ReviewContext,
    ) -> Result<Option<Box<dyn Rule>>, ReviewError> {
        let rule_type: RuleType = match config.rule_type.parse() {
            Ok(rule_type) => rule_type,
            Err(err) => {
                warn!(error = %err, "skipping rule");
                return Ok(None);
            }
        };
        let Some(factory) = self.get(context.engine, rule_type) else {
            warn!(
                engine = %context.engine,
                rule = rule_type.as_str(),
                "rule is not implemented for this engine, skipping"
            );
            return Ok(None);
        };
        factory(config, context).map(Some)
    }
}
