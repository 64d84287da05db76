//! Error taxonomy shared by the store, the credential routines and the
//! catalog synchronizer.
//!
//! Failed logins and wrong current passwords are not errors: they come back
//! as `None` / `false` so callers cannot tell an unknown username from a bad
//! password.

use rusqlite::ErrorCode;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Password missing or empty where one is required.
    #[error("invalid credential: {0}")]
    InvalidCredential(String),

    /// A store constraint (unique, not-null, check, foreign key) was broken.
    #[error("integrity violation: {0}")]
    IntegrityViolation(String),

    #[error("{entity} '{key}' not found")]
    NotFound { entity: &'static str, key: String },

    /// A remote reference-data endpoint failed or returned something unusable.
    #[error("upstream unavailable ({endpoint}): {reason}")]
    UpstreamUnavailable { endpoint: String, reason: String },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The session user does not own the target row.
    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("password hashing failed: {0}")]
    Hash(String),

    #[error("database error: {0}")]
    Database(rusqlite::Error),
}

impl Error {
    pub fn not_found(entity: &'static str, key: impl ToString) -> Self {
        Self::NotFound {
            entity,
            key: key.to_string(),
        }
    }

    pub fn upstream(endpoint: impl Into<String>, reason: impl ToString) -> Self {
        Self::UpstreamUnavailable {
            endpoint: endpoint.into(),
            reason: reason.to_string(),
        }
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::SqliteFailure(e, msg) if e.code == ErrorCode::ConstraintViolation => {
                Self::IntegrityViolation(msg.unwrap_or_else(|| e.to_string()))
            }
            other => Self::Database(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constraint_failure_maps_to_integrity_violation() {
        let sqlite_err = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error {
                code: ErrorCode::ConstraintViolation,
                extended_code: 2067,
            },
            Some("UNIQUE constraint failed: users.username".to_string()),
        );
        match Error::from(sqlite_err) {
            Error::IntegrityViolation(msg) => assert!(msg.contains("users.username")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn other_failures_stay_database_errors() {
        let err = Error::from(rusqlite::Error::QueryReturnedNoRows);
        assert!(matches!(err, Error::Database(_)));
    }

    #[test]
    fn not_found_message() {
        let err = Error::not_found("user", 42);
        assert_eq!(err.to_string(), "user '42' not found");
    }
}
