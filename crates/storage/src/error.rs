#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// A project, image or export does not exist.
    #[error("{0} not found")]
    NotFound(String),

    /// An id contains characters that could escape the storage root.
    #[error("Invalid id '{0}'")]
    InvalidId(String),

    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt project document: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StorageError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
