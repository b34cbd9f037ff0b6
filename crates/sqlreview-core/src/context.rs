//! Per-request review context

use std::sync::Arc;

use crate::dialect::Engine;
use crate::executor::{CancelFlag, QueryExecutor};
use crate::schema::SchemaSnapshot;

/// Default cap on EXPLAIN calls per review request.
pub const DEFAULT_MAX_EXPLAIN_COUNT: usize = 10;

/// Everything rules may consult besides the statements themselves.
///
/// The snapshot and executor are shared read-only between all rules of a
/// request.
#[derive(Clone)]
pub struct ReviewContext {
    pub engine: Engine,
    pub snapshot: Option<Arc<SchemaSnapshot>>,
    pub executor: Option<Arc<dyn QueryExecutor>>,
    pub cancel: CancelFlag,
    pub max_explain_count: usize,
    /// Database the script runs in; defaults to the snapshot's name.
    pub current_database: Option<String>,
}

impl ReviewContext {
    pub fn new(engine: Engine) -> Self {
        Self {
            engine,
            snapshot: None,
            executor: None,
            cancel: CancelFlag::new(),
            max_explain_count: DEFAULT_MAX_EXPLAIN_COUNT,
            current_database: None,
        }
    }

    pub fn with_snapshot(mut self, snapshot: SchemaSnapshot) -> Self {
        self.snapshot = Some(Arc::new(snapshot));
        self
    }

    pub fn with_executor(mut self, executor: Arc<dyn QueryExecutor>) -> Self {
        self.executor = Some(executor);
        self
    }

    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_max_explain_count(mut self, count: usize) -> Self {
        self.max_explain_count = count;
        self
    }

    pub fn with_current_database(mut self, database: impl Into<String>) -> Self {
        self.current_database = Some(database.into());
        self
    }

    pub fn current_database(&self) -> Option<&str> {
        self.current_database
            .as_deref()
            .or_else(|| self.snapshot.as_ref().map(|s| s.database_name()))
    }
}

impl std::fmt::Debug for ReviewContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReviewContext")
            .field("engine", &self.engine)
            .field("snapshot", &self.snapshot.as_ref().map(|s| s.database_name()))
            .field("executor", &self.executor.is_some())
            .field("cancelled", &self.cancel.is_cancelled())
            .field("max_explain_count", &self.max_explain_count)
            .field("current_database", &self.current_database)
            .finish()
    }
}
