use thiserror::Error;

pub type Result<T> = std::result::Result<T, MultireducerError>;

#[derive(Debug, Error)]
pub enum MultireducerError {
    #[error("Delimiter must not be empty")]
    EmptyDelimiter,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Malformed action: {0}")]
    MalformedAction(String),
}

impl From<serde_json::Error> for MultireducerError {
    fn from(err: serde_json::Error) -> Self {
        MultireducerError::MalformedAction(err.to_string())
    }
}
