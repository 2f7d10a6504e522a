use thiserror::Error;

pub type Result<T> = std::result::Result<T, StoreError>;

/// Storage-layer outcomes the callers branch on. Conflict and NotFound
/// are part of the swipe/rewind contracts, not incidental failures.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record already exists")]
    Conflict,

    #[error("record not found")]
    NotFound,

    #[error("invalid stored data: {0}")]
    Invalid(String),

    #[error("storage lock poisoned")]
    Poisoned,

    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
}

impl StoreError {
    /// True when a retry with identical input cannot succeed.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict)
    }
}
