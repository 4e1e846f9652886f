//! dbmon driver
//!
//! Checks the configured tables once and exits; schedule it externally
//! (cron or similar) to monitor continuously.

use std::path::PathBuf;

use clap::Parser;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dbmon::config;
use dbmon::monitor::{EmailNotifier, FreshnessChecker, MonitorRunner, SmtpConfig};

#[derive(Debug, Parser)]
#[command(
    name = "dbmon",
    about = "Monitors database tables and sends a notification email if there \
             have not been recent enough updates"
)]
struct Cli {
    /// Email address used to authenticate to the SMTP server and as the
    /// sender of notification emails
    #[arg(short = 'e', long)]
    email_address: String,

    /// Password for the email address. If not provided, the SMTP server is
    /// not given credentials
    #[arg(short = 'p', long)]
    email_password: Option<String>,

    /// SMTP server to use for sending notification emails
    #[arg(short = 'm', long)]
    smtp_server: String,

    /// Database connection string
    #[arg(short = 'c', long)]
    conn_str: String,

    /// Use SMTPS instead of SMTP
    #[arg(short = 's', long)]
    secure: bool,

    /// TOML file with the tables to check
    #[arg(short = 'o', long)]
    config: PathBuf,

    /// Increased logging level
    #[arg(short = 'v', long)]
    verbose: bool,

    /// Print debug statements
    #[arg(long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let default_level = if cli.debug {
        "dbmon=debug"
    } else if cli.verbose {
        "dbmon=info"
    } else {
        "dbmon=warn"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_level.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Fatal startup checks: config file and SMTP settings must be valid
    // before any entry is processed.
    let entries = config::load_entries(&cli.config)?;
    let notifier = EmailNotifier::new(SmtpConfig {
        server: cli.smtp_server,
        username: cli.email_address,
        password: cli.email_password,
        secure: cli.secure,
    })?;

    let pool = PgPoolOptions::new()
        .max_connections(1)
        .connect(&cli.conn_str)
        .await?;

    let runner = MonitorRunner::new(FreshnessChecker::new(pool), notifier);
    let report = runner.run(&entries).await;

    tracing::info!(
        checked = report.entries.len(),
        fresh = report.fresh(),
        notified = report.notified(),
        errored = report.errored(),
        "Run complete"
    );

    Ok(())
}
