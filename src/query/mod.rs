//! Query execution with a preferred and a fallback read path.
//!
//! [`QueryExecutor`] runs a query through its preferred backend and, when the
//! failure is eligible under the configured [`FallbackPolicy`], runs the
//! identical query once more through the fallback backend. The second attempt
//! starts only after the first has failed.

pub mod sql;

use crate::config::FallbackPolicy;
use crate::error::QueryResult;
use arrow::record_batch::RecordBatch;
use log::{debug, warn};
use std::time::Instant;

/// A source of tabular query results
#[allow(async_fn_in_trait)]
pub trait QueryBackend {
    /// Short name used in log messages
    fn label(&self) -> &str;

    /// Run a query and return the whole result set as one batch
    async fn fetch(&self, sql: &str) -> QueryResult<RecordBatch>;
}

impl<T: QueryBackend> QueryBackend for &T {
    fn label(&self) -> &str {
        (**self).label()
    }

    async fn fetch(&self, sql: &str) -> QueryResult<RecordBatch> {
        (**self).fetch(sql).await
    }
}

/// Runs queries with a single fallback attempt
#[derive(Debug)]
pub struct QueryExecutor<P, F> {
    preferred: P,
    fallback: F,
    policy: FallbackPolicy,
}

impl<P: QueryBackend, F: QueryBackend> QueryExecutor<P, F> {
    /// Create an executor from a preferred and a fallback backend
    #[must_use]
    pub const fn new(preferred: P, fallback: F, policy: FallbackPolicy) -> Self {
        Self {
            preferred,
            fallback,
            policy,
        }
    }

    /// The fallback policy in effect
    #[must_use]
    pub const fn policy(&self) -> FallbackPolicy {
        self.policy
    }

    /// Run a query, falling back once on an eligible failure
    ///
    /// If the fallback also fails, its error is returned.
    pub async fn run(&self, sql: &str) -> QueryResult<RecordBatch> {
        let start = Instant::now();
        match self.preferred.fetch(sql).await {
            Ok(batch) => {
                debug!(
                    "{} returned {} rows in {:?}",
                    self.preferred.label(),
                    batch.num_rows(),
                    start.elapsed()
                );
                Ok(batch)
            }
            Err(error) if self.policy.should_fall_back(&error) => {
                warn!(
                    "{} failed ({error}), retrying with {}",
                    self.preferred.label(),
                    self.fallback.label()
                );
                let start = Instant::now();
                let batch = self.fallback.fetch(sql).await?;
                debug!(
                    "{} returned {} rows in {:?}",
                    self.fallback.label(),
                    batch.num_rows(),
                    start.elapsed()
                );
                Ok(batch)
            }
            Err(error) => Err(error),
        }
    }
}
