use stampdb_codec::CodecError;

/// Errors from store load and save operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// I/O error from the backing provider.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The document could not be encoded or decoded.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// A background worker panicked before reporting a result.
    #[error("worker thread panicked")]
    WorkerPanicked,
}

impl StoreError {
    /// Returns `true` if this error means the backing document does not exist.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Io(e) => e.kind() == std::io::ErrorKind::NotFound,
            Self::Codec(CodecError::Io(e)) => e.kind() == std::io::ErrorKind::NotFound,
            _ => false,
        }
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
