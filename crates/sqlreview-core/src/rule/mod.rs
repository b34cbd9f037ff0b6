//! Rule contract
//!
//! A rule is a stateful visitor bound to one review concern. It keeps its
//! configuration (fixed at construction) apart from its scratch state (reset
//! or overwritten as statements are walked) and reports findings as
//! [`Advice`].

pub mod payload;
pub mod registry;
mod rule_type;

use serde::{Deserialize, Serialize};

use crate::advice::{Advice, AdviceStatus, Position};
use crate::ast::Node;
use crate::code::Code;
use crate::dialect::Engine;
use crate::error::ReviewError;

pub use registry::{RuleFactory, RuleRegistry};
pub use rule_type::RuleType;

/// Capability every rule implements
pub trait Rule {
    /// Rule type identifier, e.g. `naming.table`
    fn name(&self) -> &'static str;

    fn on_enter(&mut self, node: &Node<'_>) -> Result<(), ReviewError>;

    fn on_exit(&mut self, _node: &Node<'_>) -> Result<(), ReviewError> {
        Ok(())
    }

    fn base(&self) -> &BaseRule;

    fn base_mut(&mut self) -> &mut BaseRule;

    fn set_base_line(&mut self, base_line: usize) {
        self.base_mut().base_line = base_line;
    }

    fn add_advice(&mut self, advice: Advice) {
        self.base_mut().advice.push(advice);
    }

    fn advice_list(&self) -> &[Advice] {
        &self.base().advice
    }
}

/// State shared by all rules: severity, title, line offset and findings
#[derive(Debug, Clone)]
pub struct BaseRule {
    level: AdviceStatus,
    title: String,
    base_line: usize,
    advice: Vec<Advice>,
}

impl BaseRule {
    pub fn new(level: AdviceStatus, title: impl Into<String>) -> Self {
        Self {
            level,
            title: title.into(),
            base_line: 0,
            advice: Vec::new(),
        }
    }

    pub fn level(&self) -> AdviceStatus {
        self.level
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn base_line(&self) -> usize {
        self.base_line
    }

    /// Absolute position of a node of the statement currently being walked.
    pub fn position(&self, node: &Node<'_>) -> Position {
        Position {
            line: self.base_line + node.line,
            column: node.column,
        }
    }

    /// Absolute position of a statement-local line.
    pub fn position_at(&self, local_line: usize) -> Position {
        Position::line(self.base_line + local_line.max(1))
    }

    /// Build an advice carrying this rule's level and title.
    pub fn advice(&self, code: Code, content: impl Into<String>, position: Position) -> Advice {
        Advice::new(self.level, code, self.title.clone(), content, position)
    }

    /// Record a finding located at `node`.
    pub fn report(&mut self, code: Code, content: impl Into<String>, node: &Node<'_>) {
        let advice = self.advice(code, content, self.position(node));
        self.advice.push(advice);
    }

    /// Record an `Internal` finding, e.g. a naming template that failed to
    /// compile for this identifier.
    pub fn report_internal(&mut self, content: impl Into<String>, node: &Node<'_>) {
        let position = self.position(node);
        self.advice.push(Advice::new(
            AdviceStatus::Error,
            Code::Internal,
            self.title.clone(),
            content,
            position,
        ));
    }
}

/// Configured severity of a rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleLevel {
    Error,
    #[default]
    #[serde(alias = "warn")]
    Warning,
    Disabled,
}

impl RuleLevel {
    /// Advice status for findings of an enabled rule.
    pub fn status(&self) -> Option<AdviceStatus> {
        match self {
            RuleLevel::Error => Some(AdviceStatus::Error),
            RuleLevel::Warning => Some(AdviceStatus::Warn),
            RuleLevel::Disabled => None,
        }
    }
}

/// One entry of a review policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleConfig {
    #[serde(rename = "type")]
    pub rule_type: String,
    #[serde(default)]
    pub level: RuleLevel,
    /// Restrict the rule to one engine
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engine: Option<Engine>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
}

impl RuleConfig {
    pub fn new(rule_type: RuleType, level: RuleLevel) -> Self {
        Self {
            rule_type: rule_type.as_str().to_string(),
            level,
            engine: None,
            title: None,
            payload: None,
        }
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = Some(payload);
        self
    }

    pub fn with_engine(mut self, engine: Engine) -> Self {
        self.engine = Some(engine);
        self
    }

    /// Title used on every advice; defaults to the rule type.
    pub fn title(&self) -> String {
        self.title.clone().unwrap_or_else(|| self.rule_type.clone())
    }

    /// Base state for a rule built from this entry.
    pub fn base_rule(&self) -> BaseRule {
        BaseRule::new(
            self.level.status().unwrap_or(AdviceStatus::Warn),
            self.title(),
        )
    }

    /// Whether this entry applies when reviewing for `engine`.
    pub fn applies_to(&self, engine: Engine) -> bool {
        self.level != RuleLevel::Disabled && self.engine.map_or(true, |e| e == engine)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{NodeData, NodeTag};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_position_adds_base_line() {
        let mut base = BaseRule::new(AdviceStatus::Warn, "t");
        base.base_line = 5;
        let expr = sqlparser::ast::Expr::Value(sqlparser::ast::Value::Null);
        let node = Node {
            tag: NodeTag::Expression,
            line: 3,
            column: None,
            data: NodeData::Expr(&expr),
        };
        assert_eq!(base.position(&node), Position::line(8));
    }

    #[test]
    fn test_rule_config_from_toml_like_json() {
        let config: RuleConfig = serde_json::from_value(serde_json::json!({
            "type": "naming.table",
            "level": "error",
            "payload": {"format": "^[a-z_]+$", "maxLength": 64}
        }))
        .unwrap();
        assert_eq!(config.rule_type, "naming.table");
        assert_eq!(config.level, RuleLevel::Error);
        assert_eq!(config.title(), "naming.table");
        assert!(config.applies_to(Engine::Postgres));
    }

    #[test]
    fn test_disabled_and_engine_bound_rules_do_not_apply() {
        let disabled = RuleConfig::new(RuleType::TableRequirePk, RuleLevel::Disabled);
        assert!(!disabled.applies_to(Engine::MySql));

        let pg_only =
            RuleConfig::new(RuleType::TableRequirePk, RuleLevel::Error).with_engine(Engine::Postgres);
        assert!(!pg_only.applies_to(Engine::MySql));
        assert!(pg_only.applies_to(Engine::Postgres));
    }
}
