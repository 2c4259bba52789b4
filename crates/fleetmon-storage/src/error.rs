/// Errors that can occur within the storage layer.
///
/// # Examples
///
/// ```rust
/// use fleetmon_storage::error::StorageError;
///
/// let err = StorageError::Other("memory.total out of range".to_string());
/// assert!(err.to_string().contains("memory.total"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// An error reported by the database driver, including failed
    /// migrations and aborted transactions.
    #[error("Storage: database error: {0}")]
    Db(#[from] sea_orm::DbErr),

    /// Filesystem error while preparing the database location.
    #[error("Storage: I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic storage error for cases not covered by other variants.
    #[error("Storage: {0}")]
    Other(String),
}

/// Convenience `Result` alias for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;
