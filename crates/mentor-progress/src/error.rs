use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProgressError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("unknown achievement: {0}")]
    UnknownAchievement(String),

    #[error("backup write failed: {0}")]
    Backup(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ProgressError>;
