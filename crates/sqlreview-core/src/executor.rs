//! Live-database access used by dry-run checks

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::dialect::Engine;
use crate::error::ExecutorError;

/// One result row, rendered as text
pub type Row = Vec<String>;

/// Runs SQL against a live connection.
///
/// Implementations should honor `cancel` and return
/// [`ExecutorError::Cancelled`] once it is set.
pub trait QueryExecutor: Send + Sync {
    fn query(&self, cancel: &CancelFlag, engine: Engine, sql: &str)
        -> Result<Vec<Row>, ExecutorError>;
}

/// Cooperative cancellation shared by everything serving one review request
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_is_shared_between_clones() {
        let flag = CancelFlag::new();
        let clone = flag.clone();
        assert!(!clone.is_cancelled());
        flag.cancel();
        assert!(clone.is_cancelled());
    }
}
