use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Duplicate map name in definition document: {0}")]
    DuplicateMapName(String),

    #[error("Invalid equation '{equation}': {message}")]
    InvalidEquation { equation: String, message: String },

    #[error("Invalid definition: {0}")]
    InvalidDefinition(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Check if this error is a "file not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::Io(e) if e.kind() == std::io::ErrorKind::NotFound)
    }
}
