use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("invalid document name: {0}")]
    InvalidName(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("malformed document: {0}")]
    Malformed(String),
    #[error("storage error: {0}")]
    Io(String),
}

impl ServiceError {
    pub fn not_found(name: &str) -> Self {
        Self::NotFound(format!("{} not found", name))
    }
}
