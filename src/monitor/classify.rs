//! Driver-specific classification of freshness query errors
//!
//! A missing table or column is an expected, notification-worthy condition;
//! everything else (connectivity, permissions, syntax) is a real query
//! failure. The mapping from driver error codes to that distinction lives
//! behind [`ErrorClassifier`] so supporting another database only requires a
//! new classifier implementation.

/// Class of a failed freshness query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// The table or column named in the query does not exist
    TargetMissing,
    /// Any other database failure
    Other,
}

/// Maps a driver error to an [`ErrorClass`] using structured error codes,
/// never message text.
pub trait ErrorClassifier: Send + Sync {
    fn classify(&self, err: &sqlx::Error) -> ErrorClass;
}

/// PostgreSQL SQLSTATE `undefined_table`
const UNDEFINED_TABLE: &str = "42P01";
/// PostgreSQL SQLSTATE `undefined_column`
const UNDEFINED_COLUMN: &str = "42703";

/// Classifier for PostgreSQL SQLSTATE codes.
#[derive(Debug, Clone, Copy, Default)]
pub struct PgErrorClassifier;

impl PgErrorClassifier {
    fn classify_code(code: &str) -> ErrorClass {
        match code {
            UNDEFINED_TABLE | UNDEFINED_COLUMN => ErrorClass::TargetMissing,
            _ => ErrorClass::Other,
        }
    }
}

impl ErrorClassifier for PgErrorClassifier {
    fn classify(&self, err: &sqlx::Error) -> ErrorClass {
        match err {
            sqlx::Error::Database(db) => match db.code() {
                Some(code) => Self::classify_code(&code),
                None => ErrorClass::Other,
            },
            _ => ErrorClass::Other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_undefined_table_is_target_missing() {
        assert_eq!(
            PgErrorClassifier::classify_code("42P01"),
            ErrorClass::TargetMissing
        );
    }

    #[test]
    fn test_undefined_column_is_target_missing() {
        assert_eq!(
            PgErrorClassifier::classify_code("42703"),
            ErrorClass::TargetMissing
        );
    }

    #[test]
    fn test_other_codes_are_other() {
        // permission denied, syntax error, connection exception
        for code in ["42501", "42601", "08000"] {
            assert_eq!(PgErrorClassifier::classify_code(code), ErrorClass::Other);
        }
    }

    #[test]
    fn test_non_database_error_is_other() {
        let classifier = PgErrorClassifier;
        assert_eq!(
            classifier.classify(&sqlx::Error::RowNotFound),
            ErrorClass::Other
        );
        assert_eq!(
            classifier.classify(&sqlx::Error::PoolClosed),
            ErrorClass::Other
        );
    }
}
