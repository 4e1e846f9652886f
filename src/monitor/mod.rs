//! The check-and-notify core
//!
//! Checks each configured table for recent rows and emails the entry's
//! recipients when a table is stale or missing.

pub mod checker;
pub mod classify;
pub mod notifier;
pub mod runner;

pub use checker::{Check, CheckError, CheckOutcome, FreshnessChecker};
pub use classify::{ErrorClass, ErrorClassifier, PgErrorClassifier};
pub use notifier::{EmailNotifier, NotificationMessage, Notify, NotifierError, SmtpConfig};
pub use runner::{EntryReport, EntryStatus, MonitorRunner, RunReport};
