//! Advice (review finding) types

use serde::Serialize;

use crate::code::Code;

/// Severity of an advice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AdviceStatus {
    Success,
    Warn,
    Error,
}

impl AdviceStatus {
    /// Sort key: errors first, then warnings, then successes.
    pub fn priority(&self) -> u8 {
        match self {
            AdviceStatus::Error => 0,
            AdviceStatus::Warn => 1,
            AdviceStatus::Success => 2,
        }
    }
}

impl std::fmt::Display for AdviceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AdviceStatus::Success => write!(f, "success"),
            AdviceStatus::Warn => write!(f, "warning"),
            AdviceStatus::Error => write!(f, "error"),
        }
    }
}

/// Location of an advice within the reviewed script
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Position {
    /// Line number (1-indexed, absolute within the script)
    pub line: usize,
    /// Column number (1-indexed), when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<usize>,
}

impl Position {
    pub fn line(line: usize) -> Self {
        Self { line, column: None }
    }

    pub fn with_column(mut self, column: usize) -> Self {
        self.column = Some(column);
        self
    }
}

/// A single review finding
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Advice {
    pub status: AdviceStatus,
    pub code: Code,
    pub title: String,
    pub content: String,
    pub position: Position,
}

impl Advice {
    pub fn new(
        status: AdviceStatus,
        code: Code,
        title: impl Into<String>,
        content: impl Into<String>,
        position: Position,
    ) -> Self {
        Self {
            status,
            code,
            title: title.into(),
            content: content.into(),
            position,
        }
    }
}

/// Stable sort that puts errors ahead of warnings.
pub fn sort_by_status(advice: &mut [Advice]) {
    advice.sort_by_key(|a| a.status.priority());
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn advice(status: AdviceStatus, content: &str) -> Advice {
        Advice::new(status, Code::Ok, "t", content, Position::line(1))
    }

    #[test]
    fn test_sort_is_stable_within_status() {
        let mut list = vec![
            advice(AdviceStatus::Warn, "w1"),
            advice(AdviceStatus::Error, "e1"),
            advice(AdviceStatus::Warn, "w2"),
            advice(AdviceStatus::Error, "e2"),
        ];
        sort_by_status(&mut list);
        let order: Vec<&str> = list.iter().map(|a| a.content.as_str()).collect();
        assert_eq!(order, vec!["e1", "e2", "w1", "w2"]);
    }

    #[test]
    fn test_advice_json_shape() {
        let a = Advice::new(
            AdviceStatus::Error,
            Code::TableNoPk,
            "table.require-pk",
            "Table `t` requires PRIMARY KEY",
            Position::line(3).with_column(1),
        );
        let value = serde_json::to_value(&a).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "status": "error",
                "code": 601,
                "title": "table.require-pk",
                "content": "Table `t` requires PRIMARY KEY",
                "position": {"line": 3, "column": 1}
            })
        );
    }
}
