use thiserror::Error;

/// Application error type
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Permission denied: {capability} is not available")]
    PermissionDenied { capability: &'static str },

    #[error("{capability} unavailable: {reason}")]
    Unavailable {
        capability: &'static str,
        reason: String,
    },

    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Invalid {field}: {reason}")]
    ConfigurationInvalid { field: &'static str, reason: String },

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Lock poisoned")]
    LockPoisoned,
}

impl AppError {
    /// Whether the error came from the storage layer.
    pub fn is_storage(&self) -> bool {
        matches!(
            self,
            AppError::StorageUnavailable(_) | AppError::Database(_) | AppError::LockPoisoned
        )
    }
}

/// Check if a rusqlite error means the database file is busy or locked
pub fn is_busy(e: &rusqlite::Error) -> bool {
    matches!(e, rusqlite::Error::SqliteFailure(err, _)
        if err.code == rusqlite::ffi::ErrorCode::DatabaseBusy
            || err.code == rusqlite::ffi::ErrorCode::DatabaseLocked)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        let err = AppError::PermissionDenied {
            capability: "idle detection",
        };
        assert_eq!(err.to_string(), "Permission denied: idle detection is not available");

        let err = AppError::ConfigurationInvalid {
            field: "idle_threshold_secs",
            reason: "must be positive".into(),
        };
        assert_eq!(err.to_string(), "Invalid idle_threshold_secs: must be positive");
    }

    #[test]
    fn test_storage_classification() {
        assert!(AppError::StorageUnavailable("disk full".into()).is_storage());
        assert!(AppError::LockPoisoned.is_storage());
        assert!(!AppError::PermissionDenied { capability: "x" }.is_storage());
    }
}
