//! Freshness checking against the target database

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::classify::{ErrorClass, ErrorClassifier, PgErrorClassifier};
use crate::config::MonitorEntry;

/// Result of evaluating one monitor entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckOutcome {
    /// At least one row's timestamp is within the tolerance window
    Fresh,
    /// The query ran but no row qualifies
    Stale,
    /// The table or column does not exist in the target database
    TargetMissing,
}

impl CheckOutcome {
    /// Whether this outcome should trigger a notification.
    pub fn needs_notification(&self) -> bool {
        !matches!(self, CheckOutcome::Fresh)
    }
}

/// A query failure that could not be classified as a missing target. This is
/// never treated as Fresh or Stale; it is surfaced for the entry and the run
/// moves on.
#[derive(Debug, thiserror::Error)]
pub enum CheckError {
    #[error("freshness query failed for {table}: {source}")]
    Query {
        table: String,
        #[source]
        source: sqlx::Error,
    },
}

/// The checking seam used by the orchestration loop.
#[async_trait]
pub trait Check: Send + Sync {
    async fn check(
        &self,
        entry: &MonitorEntry,
        now: DateTime<Utc>,
    ) -> Result<CheckOutcome, CheckError>;
}

/// Checks tables for recent rows over a Postgres pool.
pub struct FreshnessChecker<C = PgErrorClassifier> {
    pool: PgPool,
    classifier: C,
}

impl FreshnessChecker<PgErrorClassifier> {
    /// Create a checker with the default Postgres error classifier.
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            classifier: PgErrorClassifier,
        }
    }
}

impl<C: ErrorClassifier> FreshnessChecker<C> {
    /// Create a checker with a custom error classifier.
    pub fn with_classifier(pool: PgPool, classifier: C) -> Self {
        Self { pool, classifier }
    }
}

#[async_trait]
impl<C: ErrorClassifier> Check for FreshnessChecker<C> {
    async fn check(
        &self,
        entry: &MonitorEntry,
        now: DateTime<Utc>,
    ) -> Result<CheckOutcome, CheckError> {
        let cutoff = now - entry.tolerance;
        let sql = freshness_sql(&entry.table_name, &entry.date_column);

        match sqlx::query(&sql)
            .bind(cutoff)
            .fetch_optional(&self.pool)
            .await
        {
            Ok(Some(_)) => Ok(CheckOutcome::Fresh),
            Ok(None) => Ok(CheckOutcome::Stale),
            Err(err) => match self.classifier.classify(&err) {
                ErrorClass::TargetMissing => Ok(CheckOutcome::TargetMissing),
                ErrorClass::Other => Err(CheckError::Query {
                    table: entry.table_name.clone(),
                    source: err,
                }),
            },
        }
    }
}

/// Existence query for rows at or after the cutoff. Only whether a row
/// qualifies matters, so no ordering and a single-row limit.
fn freshness_sql(table_name: &str, date_column: &str) -> String {
    format!(
        "SELECT 1 FROM {} WHERE {} >= $1 LIMIT 1",
        quote_ident(table_name),
        quote_ident(date_column)
    )
}

/// Quote a name as a SQL identifier. Table and column names are schema
/// identifiers, not literal data; they are never bound as query parameters
/// and never interpolated unquoted.
fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
