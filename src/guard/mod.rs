//! Read-only execution guard.
//!
//! Every statement passes [`check_read_only`] before any connection is
//! opened. Accepted statements run through a [`QueryRunner`] under a single
//! timeout and come back fully materialized, or not at all.

mod read_only;

pub use read_only::{check_read_only, GuardMode, DENIED_KEYWORDS};

use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::backend::{BackendError, QueryRunner};
use crate::result::TabularResult;

#[derive(Debug, Error)]
pub enum GuardError {
    #[error("statement rejected: {0}")]
    Rejected(String),

    #[error("statement failed: {0}")]
    Execution(#[source] BackendError),

    #[error("statement exceeded the {0} second timeout")]
    Timeout(u64),
}

impl From<BackendError> for GuardError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::Timeout(secs) => GuardError::Timeout(secs),
            other => GuardError::Execution(other),
        }
    }
}

/// Screens and runs ad-hoc statements against one backend.
#[derive(Clone)]
pub struct ExecutionGuard {
    runner: Arc<dyn QueryRunner>,
    timeout: Duration,
    mode: GuardMode,
}

impl ExecutionGuard {
    pub fn new(runner: Arc<dyn QueryRunner>, timeout: Duration) -> Self {
        Self {
            runner,
            timeout,
            mode: GuardMode::default(),
        }
    }

    pub fn with_mode(mut self, mode: GuardMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn mode(&self) -> GuardMode {
        self.mode
    }

    pub async fn execute(&self, sql: &str) -> Result<TabularResult, GuardError> {
        if let Err(err) = check_read_only(sql, self.mode) {
            warn!(error = %err, "statement rejected");
            return Err(err);
        }
        debug!(%sql, "executing statement");

        let started = Instant::now();
        let outcome = tokio::time::timeout(self.timeout, self.runner.run(sql, self.timeout)).await;
        let result = match outcome {
            Ok(Ok(result)) => result,
            Ok(Err(err)) => {
                warn!(error = %err, "statement failed");
                return Err(err.into());
            }
            Err(_) => {
                warn!(timeout_secs = self.timeout.as_secs(), "statement timed out");
                return Err(GuardError::Timeout(self.timeout.as_secs()));
            }
        };

        info!(
            rows = result.row_count(),
            columns = result.column_count(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "statement executed"
        );
        Ok(result)
    }
}
