use thiserror::Error;

#[derive(Debug, Error)]
pub enum StudyError {
    #[error("provider error: {0}")]
    Provider(String),

    #[error("generation timed out")]
    Timeout,

    #[error("response was not the expected shape: {0}")]
    InvalidJson(String),

    #[error("unknown subject: {0}")]
    UnknownSubject(String),

    #[error("no unique question available")]
    Exhausted,

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, StudyError>;
