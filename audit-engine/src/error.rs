use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuditError {
    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Database error: {0}")]
    SqlxError(#[from] sqlx::Error),
}

pub type AuditResult<T> = Result<T, AuditError>;
