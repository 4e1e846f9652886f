//! Monitor configuration types and loading
//!
//! Entries are declared in a TOML file and validated at load time; a
//! malformed or incomplete entry fails the whole load rather than being
//! skipped.

use std::fs;
use std::path::Path;

use chrono::Duration;
use serde::Deserialize;

/// One monitored table: where to look, how fresh is fresh enough, and who to
/// tell when it is not.
#[derive(Debug, Clone)]
pub struct MonitorEntry {
    /// Schema identifier of the table to check
    pub table_name: String,
    /// Schema identifier of the timestamp column used as the freshness signal
    pub date_column: String,
    /// Addresses notified when the table is stale or missing
    pub recipients: Vec<String>,
    /// Maximum allowed age of the most recent row
    pub tolerance: Duration,
}

impl MonitorEntry {
    /// Create an entry with a tolerance given in whole minutes.
    pub fn new(
        table_name: impl Into<String>,
        date_column: impl Into<String>,
        recipients: Vec<String>,
        tolerance_mins: u32,
    ) -> Self {
        Self {
            table_name: table_name.into(),
            date_column: date_column.into(),
            recipients,
            tolerance: Duration::minutes(i64::from(tolerance_mins)),
        }
    }
}

/// Configuration loading and validation errors. All of these are fatal at
/// startup; no entries are checked if the config does not load cleanly.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("entry {index} ({table}): {reason}")]
    Invalid {
        index: usize,
        table: String,
        reason: String,
    },
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    #[serde(default)]
    tables: Vec<RawEntry>,
}

#[derive(Debug, Deserialize)]
struct RawEntry {
    table_name: String,
    date_col: String,
    email: OneOrMany,
    notification_mins: u32,
}

/// The `email` field accepts a single address or a list of addresses.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    fn into_vec(self) -> Vec<String> {
        match self {
            OneOrMany::One(addr) => vec![addr],
            OneOrMany::Many(addrs) => addrs,
        }
    }
}

/// Load and validate monitor entries from a TOML file.
pub fn load_entries(path: &Path) -> Result<Vec<MonitorEntry>, ConfigError> {
    let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse_entries(&text)
}

/// Parse and validate monitor entries from TOML text.
pub fn parse_entries(text: &str) -> Result<Vec<MonitorEntry>, ConfigError> {
    let raw: RawConfig = toml::from_str(text)?;
    raw.tables
        .into_iter()
        .enumerate()
        .map(|(index, entry)| validate_entry(index, entry))
        .collect()
}

fn validate_entry(index: usize, raw: RawEntry) -> Result<MonitorEntry, ConfigError> {
    let invalid = |reason: &str| ConfigError::Invalid {
        index,
        table: raw.table_name.clone(),
        reason: reason.to_string(),
    };

    if raw.table_name.trim().is_empty() {
        return Err(invalid("table_name must not be empty"));
    }
    if raw.date_col.trim().is_empty() {
        return Err(invalid("date_col must not be empty"));
    }
    if raw.notification_mins == 0 {
        return Err(invalid("notification_mins must be a positive number of minutes"));
    }

    let recipients = raw.email.into_vec();
    if recipients.is_empty() || recipients.iter().any(|a| a.trim().is_empty()) {
        return Err(invalid("email must contain at least one non-empty address"));
    }

    Ok(MonitorEntry {
        table_name: raw.table_name,
        date_column: raw.date_col,
        recipients,
        tolerance: Duration::minutes(i64::from(raw.notification_mins)),
    })
}
