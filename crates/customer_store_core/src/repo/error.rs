//! Repository error taxonomy.
//!
//! SQLite failures are classified by result code so callers can tell
//! constraint violations, lock timeouts and unreachable databases apart
//! without inspecting driver errors.

use crate::db::DbError;
use crate::model::page::PageRequestError;
use crate::model::validation::ValidationError;
use rusqlite::ErrorCode;
use thiserror::Error;

pub type RepoResult<T> = Result<T, RepoError>;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error(transparent)]
    InvalidPageRequest(#[from] PageRequestError),
    #[error("constraint violation: {0}")]
    ConstraintViolation(#[source] rusqlite::Error),
    #[error("database unavailable: {0}")]
    Connectivity(#[source] rusqlite::Error),
    #[error("timed out waiting for database lock: {0}")]
    Timeout(#[source] rusqlite::Error),
    #[error(transparent)]
    Db(DbError),
    #[error("invalid persisted data: {0}")]
    InvalidData(String),
    #[error("connection schema version is {actual_version}, repository requires {expected_version}")]
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    #[error("required table `{0}` is missing")]
    MissingRequiredTable(&'static str),
    #[error("required column `{table}.{column}` is missing")]
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        match value.sqlite_error_code() {
            Some(ErrorCode::ConstraintViolation) => Self::ConstraintViolation(value),
            Some(ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked) => Self::Timeout(value),
            Some(ErrorCode::CannotOpen | ErrorCode::NotADatabase) => Self::Connectivity(value),
            _ => Self::Db(DbError::Sqlite(value)),
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        match value {
            DbError::Sqlite(err) => err.into(),
            other => Self::Db(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::RepoError;
    use crate::db::DbError;
    use rusqlite::ffi;

    fn sqlite_failure(code: i32) -> rusqlite::Error {
        rusqlite::Error::SqliteFailure(ffi::Error::new(code), None)
    }

    #[test]
    fn sqlite_codes_map_to_error_kinds() {
        assert!(matches!(
            RepoError::from(sqlite_failure(ffi::SQLITE_CONSTRAINT_FOREIGNKEY)),
            RepoError::ConstraintViolation(_)
        ));
        assert!(matches!(
            RepoError::from(sqlite_failure(ffi::SQLITE_BUSY)),
            RepoError::Timeout(_)
        ));
        assert!(matches!(
            RepoError::from(sqlite_failure(ffi::SQLITE_CANTOPEN)),
            RepoError::Connectivity(_)
        ));
        assert!(matches!(
            RepoError::from(rusqlite::Error::QueryReturnedNoRows),
            RepoError::Db(DbError::Sqlite(_))
        ));
    }

    #[test]
    fn schema_version_errors_stay_db_errors() {
        let err = RepoError::from(DbError::UnsupportedSchemaVersion {
            db_version: 9,
            latest_supported: 2,
        });
        assert!(matches!(
            err,
            RepoError::Db(DbError::UnsupportedSchemaVersion { .. })
        ));
    }
}
