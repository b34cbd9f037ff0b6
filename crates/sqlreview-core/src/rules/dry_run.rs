//! EXPLAIN-based dry run of DML statements

use std::sync::Arc;

use tracing::debug;

use crate::ast::Node;
use crate::code::Code;
use crate::context::ReviewContext;
use crate::dialect::Engine;
use crate::error::{ExecutorError, ReviewError};
use crate::executor::{CancelFlag, QueryExecutor};
use crate::rule::{BaseRule, Rule, RuleConfig, RuleType};

/// Runs `EXPLAIN` for each INSERT, UPDATE and DELETE through the executor,
/// up to a fixed number of calls per review, and reports statements the
/// database rejects.
///
/// Without an executor the rule finds nothing.
pub struct DmlDryRunRule {
    base: BaseRule,
    engine: Engine,
    executor: Option<Arc<dyn QueryExecutor>>,
    cancel: CancelFlag,
    max_explain_count: usize,
    explain_count: usize,
}

impl DmlDryRunRule {
    pub fn new(base: BaseRule, context: &ReviewContext) -> Self {
        Self {
            base,
            engine: context.engine,
            executor: context.executor.clone(),
            cancel: context.cancel.clone(),
            max_explain_count: context.max_explain_count,
            explain_count: 0,
        }
    }

    pub fn build(config: &RuleConfig, ctx: &ReviewContext) -> Result<Box<dyn Rule>, ReviewError> {
        Ok(Box::new(Self::new(config.base_rule(), ctx)))
    }

    /// Number of EXPLAIN calls issued so far.
    pub fn explain_count(&self) -> usize {
        self.explain_count
    }
}

impl Rule for DmlDryRunRule {
    fn name(&self) -> &'static str {
        RuleType::StatementDmlDryRun.as_str()
    }

    fn on_enter(&mut self, node: &Node<'_>) -> Result<(), ReviewError> {
        if !node.tag.is_dml() {
            return Ok(());
        }
        let (Some(executor), Some(text)) = (self.executor.clone(), node.statement_text()) else {
            return Ok(());
        };
        if self.explain_count >= self.max_explain_count {
            debug!(
                max = self.max_explain_count,
                "dry-run cap reached, skipping statement"
            );
            return Ok(());
        }
        if self.cancel.is_cancelled() {
            debug!("review cancelled, skipping dry run");
            return Ok(());
        }

        self.explain_count += 1;
        debug!(count = self.explain_count, "explaining statement");
        match executor.query(&self.cancel, self.engine, &format!("EXPLAIN {}", text)) {
            Ok(_) => {}
            Err(ExecutorError::Cancelled) => {
                debug!("dry run cancelled");
            }
            Err(err) => {
                let content = format!("\"{}\" dry runs failed: {}", text, err);
                self.base
                    .report(Code::StatementDmlDryRunFailed, content, node);
            }
        }
        Ok(())
    }

    base_rule_accessors!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::Row;
    use crate::rule::RuleLevel;
    use crate::rules::test_support::{check, codes};
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;

    /// Records every query; fails the ones mentioning `missing`.
    #[derive(Default)]
    struct FakeExecutor {
        queries: Mutex<Vec<String>>,
    }

    impl QueryExecutor for FakeExecutor {
        fn query(
            &self,
            cancel: &CancelFlag,
            _engine: Engine,
            sql: &str,
        ) -> Result<Vec<Row>, ExecutorError> {
            if cancel.is_cancelled() {
                return Err(ExecutorError::Cancelled);
            }
            self.queries.lock().unwrap().push(sql.to_string());
            if sql.contains("missing") {
                Err(ExecutorError::Query("Table 'app.missing' doesn't exist".to_string()))
            } else {
                Ok(vec![vec!["1".to_string()]])
            }
        }
    }

    fn config() -> RuleConfig {
        RuleConfig::new(RuleType::StatementDmlDryRun, RuleLevel::Error)
    }

    #[test]
    fn test_failed_explain_becomes_advice() {
        let executor = Arc::new(FakeExecutor::default());
        let context = ReviewContext::new(Engine::MySql).with_executor(executor.clone());
        let advice = check(
            "SELECT 1;\nINSERT INTO t (a) VALUES (1);\nDELETE FROM missing WHERE a = 1;",
            config(),
            &context,
        );
        assert_eq!(codes(&advice), vec![208]);
        assert_eq!(advice[0].position.line, 3);
        assert_eq!(
            *executor.queries.lock().unwrap(),
            vec![
                "EXPLAIN INSERT INTO t (a) VALUES (1)".to_string(),
                "EXPLAIN DELETE FROM missing WHERE a = 1".to_string(),
            ]
        );
    }

    #[test]
    fn test_explain_calls_stop_at_cap() {
        let executor = Arc::new(FakeExecutor::default());
        let context = ReviewContext::new(Engine::MySql)
            .with_executor(executor.clone())
            .with_max_explain_count(2);
        let sql = "UPDATE t SET a = 1 WHERE b = 1;\n".repeat(5);
        let advice = check(&sql, config(), &context);
        assert!(advice.is_empty());
        assert_eq!(executor.queries.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_cancelled_review_issues_no_calls() {
        let executor = Arc::new(FakeExecutor::default());
        let cancel = CancelFlag::new();
        cancel.cancel();
        let context = ReviewContext::new(Engine::MySql)
            .with_executor(executor.clone())
            .with_cancel(cancel);
        let advice = check("DELETE FROM missing WHERE a = 1", config(), &context);
        assert!(advice.is_empty());
        assert!(executor.queries.lock().unwrap().is_empty());
    }

    #[test]
    fn test_without_executor_finds_nothing() {
        let advice = check(
            "DELETE FROM missing WHERE a = 1",
            config(),
            &ReviewContext::new(Engine::MySql),
        );
        assert!(advice.is_empty());
    }
}
