//! Dispatch engine
//!
//! The [`Checker`] owns the rules of one review and walks each statement
//! exactly once, forwarding every enter/exit event to every rule in
//! registration order.

use tracing::debug;

use crate::advice::Advice;
use crate::ast::{self, Node, NodeTag, Visitor};
use crate::error::ReviewError;
use crate::parser::Statement;
use crate::rule::Rule;

#[derive(Default)]
pub struct Checker {
    rules: Vec<Box<dyn Rule>>,
    base_line: usize,
}

impl Checker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, rule: Box<dyn Rule>) {
        self.rules.push(rule);
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn base_line(&self) -> usize {
        self.base_line
    }

    pub fn set_base_line(&mut self, base_line: usize) {
        self.base_line = base_line;
        for rule in &mut self.rules {
            rule.set_base_line(base_line);
        }
    }

    /// Walk one statement.
    pub fn walk(&mut self, statement: &Statement) -> Result<(), ReviewError> {
        self.set_base_line(statement.base_line);
        debug!(
            base_line = statement.base_line,
            tag = %NodeTag::of_statement(&statement.ast),
            rules = self.rules.len(),
            "walking statement"
        );
        ast::walk(statement, self)
    }

    /// Walk every statement in order.
    pub fn check(&mut self, statements: &[Statement]) -> Result<(), ReviewError> {
        for statement in statements {
            self.walk(statement)?;
        }
        Ok(())
    }

    /// Advice of every rule, in registration order.
    pub fn advice_list(&self) -> Vec<Advice> {
        self.rules
            .iter()
            .flat_map(|rule| rule.advice_list().iter().cloned())
            .collect()
    }
}

impl Visitor for Checker {
    fn enter(&mut self, node: &Node<'_>) -> Result<(), ReviewError> {
        for rule in &mut self.rules {
            rule.on_enter(node)?;
        }
        Ok(())
    }

    fn exit(&mut self, node: &Node<'_>) -> Result<(), ReviewError> {
        for rule in &mut self.rules {
            rule.on_exit(node)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::advice::AdviceStatus;
    use crate::code::Code;
    use crate::dialect::Engine;
    use crate::parser::parse_script;
    use crate::rule::BaseRule;
    use pretty_assertions::assert_eq;

    /// Reports every node with the given tag.
    struct TagRule {
        base: BaseRule,
        tag: NodeTag,
    }

    impl TagRule {
        fn boxed(title: &str, tag: NodeTag) -> Box<dyn Rule> {
            Box::new(Self {
                base: BaseRule::new(AdviceStatus::Warn, title),
                tag,
            })
        }
    }

    impl Rule for TagRule {
        fn name(&self) -> &'static str {
            "test.tag"
        }

        fn on_enter(&mut self, node: &Node<'_>) -> Result<(), ReviewError> {
            if node.tag == self.tag {
                self.base.report(Code::Ok, node.tag.name(), node);
            }
            Ok(())
        }

        fn base(&self) -> &BaseRule {
            &self.base
        }

        fn base_mut(&mut self) -> &mut BaseRule {
            &mut self.base
        }
    }

    /// Aborts on the first statement.
    struct FailingRule {
        base: BaseRule,
    }

    impl Rule for FailingRule {
        fn name(&self) -> &'static str {
            "test.fail"
        }

        fn on_enter(&mut self, _node: &Node<'_>) -> Result<(), ReviewError> {
            Err(ReviewError::MalformedTree("boom".to_string()))
        }

        fn base(&self) -> &BaseRule {
            &self.base
        }

        fn base_mut(&mut self) -> &mut BaseRule {
            &mut self.base
        }
    }

    fn run(sql: &str, rules: Vec<Box<dyn Rule>>) -> Vec<Advice> {
        let statements = parse_script(sql, Engine::MySql).unwrap();
        let mut checker = Checker::new();
        for rule in rules {
            checker.register(rule);
        }
        checker.check(&statements).unwrap();
        checker.advice_list()
    }

    #[test]
    fn test_advice_in_registration_order() {
        let advice = run(
            "DELETE FROM t WHERE a = 1;\nUPDATE t SET a = 2 WHERE b = 3;",
            vec![
                TagRule::boxed("second", NodeTag::Update),
                TagRule::boxed("first", NodeTag::WhereClause),
            ],
        );
        let titles: Vec<&str> = advice.iter().map(|a| a.title.as_str()).collect();
        assert_eq!(titles, vec!["second", "first", "first"]);
    }

    #[test]
    fn test_positions_include_base_line() {
        let advice = run(
            "SELECT 1;\n\n\nDELETE FROM t\n\nWHERE a = 1;",
            vec![TagRule::boxed("where", NodeTag::WhereClause)],
        );
        assert_eq!(advice.len(), 1);
        // base line 3 + local line 3
        assert_eq!(advice[0].position.line, 6);
    }

    #[test]
    fn test_fresh_checkers_are_idempotent() {
        let sql = "UPDATE t SET a = 1;\nDELETE FROM t;";
        let first = run(sql, vec![TagRule::boxed("x", NodeTag::TableReference)]);
        let second = run(sql, vec![TagRule::boxed("x", NodeTag::TableReference)]);
        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
    }

    #[test]
    fn test_rule_error_aborts_walk() {
        let statements = parse_script("SELECT 1", Engine::MySql).unwrap();
        let mut checker = Checker::new();
        checker.register(Box::new(FailingRule {
            base: BaseRule::new(AdviceStatus::Error, "fail"),
        }));
        assert!(checker.check(&statements).is_err());
    }
}
