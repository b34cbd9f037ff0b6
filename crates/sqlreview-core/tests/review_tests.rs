// Integration tests for the review pipeline
use std::sync::{Arc, Mutex};

use pretty_assertions::assert_eq;
use serde_json::json;
use sqlreview_core::executor::Row;
use sqlreview_core::{
    Advice, AdviceStatus, CancelFlag, Code, Engine, ExecutorError, QueryExecutor, ReviewContext,
    ReviewError, Reviewer, RuleConfig, RuleLevel, RuleRegistry, RuleType, SnapshotBuilder,
};

fn review(sql: &str, context: ReviewContext, rules: &[RuleConfig]) -> Vec<Advice> {
    let registry = RuleRegistry::with_defaults();
    Reviewer::new(&registry, context).review(sql, rules).unwrap()
}

fn mysql() -> ReviewContext {
    ReviewContext::new(Engine::MySql)
}

#[test]
fn test_clean_script_yields_no_advice() {
    let rules = [
        RuleConfig::new(RuleType::TableNoForeignKey, RuleLevel::Warning),
        RuleConfig::new(RuleType::NamingTable, RuleLevel::Error)
            .with_payload(json!({"format": "^[a-z_]+$"})),
    ];
    let advice = review(
        "CREATE TABLE t (a INT); ALTER TABLE t ADD COLUMN b INT UNSIGNED;",
        mysql(),
        &rules,
    );
    assert!(advice.is_empty(), "Expected no advice: {:?}", advice);
}

#[test]
fn test_positions_are_absolute() {
    let rules = [RuleConfig::new(RuleType::StatementRequireWhere, RuleLevel::Warning)];
    let sql = "-- cleanup\nUPDATE t SET a = 1 WHERE id = 1;\n\n\nDELETE\nFROM t;\n";
    let advice = review(sql, mysql(), &rules);
    assert_eq!(advice.len(), 1);
    assert_eq!(advice[0].position.line, 5);
    assert_eq!(advice[0].code.value(), 202);
}

#[test]
fn test_many_rules_share_one_walk() {
    let rules = [
        RuleConfig::new(RuleType::StatementRequireWhere, RuleLevel::Error),
        RuleConfig::new(RuleType::StatementNoSelectAll, RuleLevel::Warning),
        RuleConfig::new(RuleType::StatementInsertMustSpecifyColumn, RuleLevel::Warning),
        RuleConfig::new(RuleType::StatementDisallowLimit, RuleLevel::Warning),
    ];
    let sql = "SELECT * FROM t;\nINSERT INTO t VALUES (1);\nDELETE FROM t WHERE id = 1 LIMIT 1;";
    let advice = review(sql, mysql(), &rules);
    let summary: Vec<(AdviceStatus, i32, usize)> = advice
        .iter()
        .map(|a| (a.status, a.code.value(), a.position.line))
        .collect();
    assert_eq!(
        summary,
        vec![
            (AdviceStatus::Error, 202, 1),
            (AdviceStatus::Warn, 203, 1),
            (AdviceStatus::Warn, 1107, 2),
            (AdviceStatus::Warn, 1106, 3),
        ]
    );
}

#[test]
fn test_review_is_idempotent() {
    let rules = [
        RuleConfig::new(RuleType::SchemaBackwardCompatibility, RuleLevel::Warning),
        RuleConfig::new(RuleType::ColumnNoNull, RuleLevel::Warning),
    ];
    let sql = "CREATE TABLE t (a INT);\nALTER TABLE t ADD COLUMN b INT;\nALTER TABLE u DROP COLUMN c;";
    let first = review(sql, mysql(), &rules);
    let second = review(sql, mysql(), &rules);
    assert_eq!(first, second);
    assert_eq!(first.len(), 3);
}

#[test]
fn test_snapshot_backed_rules() {
    let mut builder = SnapshotBuilder::new(Engine::MySql, "shop");
    builder.parse(
        "CREATE TABLE orders (id BIGINT PRIMARY KEY, user_id INT(11), note VARCHAR(20));\n\
         CREATE TABLE users (id INT, name VARCHAR(20));",
    );
    assert!(builder.errors().is_empty());
    let context = mysql().with_snapshot(builder.build());

    let rules = [
        RuleConfig::new(RuleType::ColumnDisallowChangeType, RuleLevel::Error),
        RuleConfig::new(RuleType::StatementJoinStrictColumnAttrs, RuleLevel::Warning),
        RuleConfig::new(RuleType::DatabaseDropEmptyDatabase, RuleLevel::Error),
    ];
    let sql = "ALTER TABLE orders MODIFY COLUMN user_id INTEGER;\n\
               ALTER TABLE orders MODIFY COLUMN note VARCHAR(20);\n\
               SELECT o.id FROM orders o JOIN users u ON o.user_id = u.name WHERE o.id = 1;\n\
               DROP DATABASE shop;";
    let advice = review(sql, context, &rules);
    let codes: Vec<Code> = advice.iter().map(|a| a.code).collect();
    assert_eq!(
        codes,
        vec![
            Code::ChangeColumnType,
            Code::DatabaseNotEmpty,
            Code::StatementJoinColumnAttrsNotMatch,
        ]
    );
}

#[test]
fn test_schema_conflicts_stop_the_review() {
    let mut builder = SnapshotBuilder::new(Engine::MySql, "shop");
    builder.parse("CREATE TABLE orders (id BIGINT PRIMARY KEY, note VARCHAR(20));");
    let snapshot = builder.build();
    let rules = [RuleConfig::new(RuleType::StatementRequireWhere, RuleLevel::Warning)];

    let cases = [
        ("DELETE FROM orders;\nALTER TABLE orders ADD COLUMN note TEXT;", 412, 2),
        ("DELETE FROM orders;\nALTER TABLE orders DROP COLUMN total;", 405, 2),
        ("CREATE TABLE orders (id INT);", 607, 1),
        ("ALTER TABLE users ADD COLUMN a INT;", 604, 1),
        ("ALTER TABLE crm.orders ADD COLUMN a INT;", 702, 1),
        ("DROP DATABASE shop;\nDELETE FROM orders;", 703, 2),
        ("ALTER TABLE orders ADD PRIMARY KEY (note);", 806, 1),
    ];
    for (sql, code, line) in cases {
        let advice = review(sql, mysql().with_snapshot(snapshot.clone()), &rules);
        let summary: Vec<(AdviceStatus, i32, usize)> = advice
            .iter()
            .map(|a| (a.status, a.code.value(), a.position.line))
            .collect();
        assert_eq!(summary, vec![(AdviceStatus::Error, code, line)], "{}", sql);
    }

    // Without a snapshot only tables the script creates are checked.
    let advice = review(
        "ALTER TABLE users ADD COLUMN a INT;\nCREATE TABLE t (a INT);\nALTER TABLE t DROP COLUMN b;",
        mysql(),
        &rules,
    );
    assert_eq!(advice.len(), 1);
    assert_eq!(advice[0].content, "Column `b` does not exist in table `t`");
    assert_eq!(advice[0].position.line, 3);
}

#[test]
fn test_engine_bound_and_unsupported_rules_are_skipped() {
    let rules = [
        RuleConfig::new(RuleType::StatementRequireWhere, RuleLevel::Error)
            .with_engine(Engine::MySql),
        RuleConfig::new(RuleType::StatementDisallowLimit, RuleLevel::Error),
    ];
    let advice = review(
        "DELETE FROM t",
        ReviewContext::new(Engine::Postgres),
        &rules,
    );
    assert!(advice.is_empty());
}

#[test]
fn test_invalid_template_fails_before_walking() {
    let registry = RuleRegistry::with_defaults();
    let rules = [RuleConfig::new(RuleType::NamingIndexIdx, RuleLevel::Error)
        .with_payload(json!({"format": "idx_{{referencing_table}}"}))];
    let err = Reviewer::new(&registry, mysql())
        .review("CREATE INDEX whatever ON t (a)", &rules)
        .unwrap_err();
    assert!(matches!(err, ReviewError::InvalidTemplateToken { .. }));
}

/// Rejects every statement touching `ghost`.
struct GhostExecutor {
    calls: Mutex<usize>,
}

impl QueryExecutor for GhostExecutor {
    fn query(&self, _: &CancelFlag, _: Engine, sql: &str) -> Result<Vec<Row>, ExecutorError> {
        *self.calls.lock().unwrap() += 1;
        if sql.contains("ghost") {
            Err(ExecutorError::Query("no such table: ghost".to_string()))
        } else {
            Ok(Vec::new())
        }
    }
}

#[test]
fn test_dry_run_through_reviewer() {
    let executor = Arc::new(GhostExecutor {
        calls: Mutex::new(0),
    });
    let context = mysql()
        .with_executor(executor.clone())
        .with_max_explain_count(3);
    let rules = [RuleConfig::new(RuleType::StatementDmlDryRun, RuleLevel::Error)];
    let sql = "UPDATE ghost SET a = 1 WHERE b = 2;\n".repeat(4);
    let advice = review(&sql, context, &rules);
    assert_eq!(advice.len(), 3);
    assert_eq!(*executor.calls.lock().unwrap(), 3);
    assert!(advice[0].content.ends_with("dry runs failed: no such table: ghost"));
}
