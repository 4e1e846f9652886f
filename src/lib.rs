//! dbmon: database table freshness monitor
//!
//! Checks that each monitored table has at least one row whose timestamp
//! column falls within a configured tolerance window, and emails the
//! configured recipients when it does not. Built for batch data pipelines
//! ("dataflows") that deposit rows on a schedule: silence beyond the window
//! means something upstream broke.
//!
//! Each invocation is stateless and one-shot; run it from a scheduler.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//!
//! use dbmon::config;
//! use dbmon::monitor::{EmailNotifier, FreshnessChecker, MonitorRunner, SmtpConfig};
//! use sqlx::postgres::PgPoolOptions;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let entries = config::load_entries(Path::new("monitors.toml"))?;
//!
//!     let pool = PgPoolOptions::new()
//!         .connect("postgres://localhost/warehouse")
//!         .await?;
//!     let notifier = EmailNotifier::new(SmtpConfig {
//!         server: "smtp.example.com".to_string(),
//!         username: "alerts@example.com".to_string(),
//!         password: None,
//!         secure: true,
//!     })?;
//!
//!     let runner = MonitorRunner::new(FreshnessChecker::new(pool), notifier);
//!     let report = runner.run(&entries).await;
//!     println!("{} of {} tables notified", report.notified(), report.entries.len());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod monitor;

// Re-export commonly used types
pub use config::{ConfigError, MonitorEntry};
pub use monitor::{CheckOutcome, EmailNotifier, FreshnessChecker, MonitorRunner, SmtpConfig};
