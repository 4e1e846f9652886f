//! Sequential check-and-notify loop over the configured entries
//!
//! Entries are processed one at a time in configuration order. A check or
//! notification failure is logged and recorded for that entry; it never
//! aborts the run.

use chrono::Utc;

use super::checker::{Check, CheckError, CheckOutcome};
use super::notifier::{Notify, NotifierError};
use crate::config::MonitorEntry;

/// What happened to one entry during a run.
#[derive(Debug)]
pub enum EntryStatus {
    /// Table had recent data; nothing sent
    Fresh,
    /// Notification sent for a stale or missing table
    Notified(CheckOutcome),
    /// The freshness query failed; no notification sent
    CheckFailed(CheckError),
    /// The table needed a notification but sending it failed
    NotifyFailed(CheckOutcome, NotifierError),
}

/// Per-entry outcome record.
#[derive(Debug)]
pub struct EntryReport {
    pub table: String,
    pub status: EntryStatus,
}

/// Summary of one full run.
#[derive(Debug, Default)]
pub struct RunReport {
    pub entries: Vec<EntryReport>,
}

impl RunReport {
    pub fn fresh(&self) -> usize {
        self.count(|s| matches!(s, EntryStatus::Fresh))
    }

    pub fn notified(&self) -> usize {
        self.count(|s| matches!(s, EntryStatus::Notified(_)))
    }

    pub fn errored(&self) -> usize {
        self.count(|s| {
            matches!(s, EntryStatus::CheckFailed(_) | EntryStatus::NotifyFailed(..))
        })
    }

    fn count(&self, pred: impl Fn(&EntryStatus) -> bool) -> usize {
        self.entries.iter().filter(|e| pred(&e.status)).count()
    }
}

/// Drives the checker and notifier over a sequence of entries.
pub struct MonitorRunner<C, N> {
    checker: C,
    notifier: N,
}

impl<C: Check, N: Notify> MonitorRunner<C, N> {
    pub fn new(checker: C, notifier: N) -> Self {
        Self { checker, notifier }
    }

    /// Check every entry in order, notifying on Stale or TargetMissing.
    pub async fn run(&self, entries: &[MonitorEntry]) -> RunReport {
        let mut report = RunReport::default();
        for entry in entries {
            let status = self.run_entry(entry).await;
            report.entries.push(EntryReport {
                table: entry.table_name.clone(),
                status,
            });
        }
        report
    }

    async fn run_entry(&self, entry: &MonitorEntry) -> EntryStatus {
        let now = Utc::now();
        let outcome = match self.checker.check(entry, now).await {
            Ok(outcome) => outcome,
            Err(err) => {
                tracing::error!(
                    table = %entry.table_name,
                    error = %err,
                    "Freshness check failed"
                );
                return EntryStatus::CheckFailed(err);
            }
        };

        if !outcome.needs_notification() {
            tracing::info!(table = %entry.table_name, "Table has recent data");
            return EntryStatus::Fresh;
        }

        tracing::warn!(
            table = %entry.table_name,
            outcome = ?outcome,
            tolerance_mins = entry.tolerance.num_minutes(),
            "Table failed freshness check, notifying"
        );

        match self
            .notifier
            .notify(&entry.recipients, &entry.table_name, entry.tolerance)
            .await
        {
            Ok(()) => EntryStatus::Notified(outcome),
            Err(err) => {
                tracing::error!(
                    table = %entry.table_name,
                    error = %err,
                    "Failed to send notification"
                );
                EntryStatus::NotifyFailed(outcome, err)
            }
        }
    }
}
