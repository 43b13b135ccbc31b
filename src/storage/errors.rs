//! Storage engine errors

use thiserror::Error;

use crate::errors::DbError;

/// Key/value engine errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    #[error("Store not found: {0}")]
    StoreNotFound(String),

    #[error("Store already exists: {0}")]
    StoreAlreadyExists(String),

    #[error("Transaction is read-only")]
    ReadOnly,

    #[error("Transaction conflict: {0}")]
    Conflict(String),

    #[error("Store {0} is being modified during iteration")]
    Busy(String),
}

impl From<StorageError> for DbError {
    fn from(err: StorageError) -> Self {
        let message = err.to_string();
        match err {
            StorageError::StoreNotFound(_) => DbError::not_found(message),
            StorageError::StoreAlreadyExists(_) => DbError::already_exists(message),
            StorageError::ReadOnly => DbError::read_only(message),
            StorageError::Conflict(_) | StorageError::Busy(_) => DbError::conflict(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorCode;

    #[test]
    fn test_mapping_to_db_error() {
        let err: DbError = StorageError::StoreNotFound("t_users".into()).into();
        assert!(err.is(ErrorCode::NotFound));
        assert!(err.message().contains("t_users"));

        let err: DbError = StorageError::ReadOnly.into();
        assert!(err.is(ErrorCode::ReadOnly));
    }
}
