use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("invalid duration: {0}")]
    InvalidDuration(String),

    #[error("unknown resource type: {0}")]
    UnknownResourceType(String),

    #[error("invalid model: {0}")]
    Invalid(String),
}

pub type ModelResult<T> = Result<T, ModelError>;
