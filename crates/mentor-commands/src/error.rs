use thiserror::Error;

use mentor_discord::PlatformError;

/// Failure modes a command handler may surface. The dispatcher owns the
/// translation to user-visible replies — handlers never format error text
/// for the channel themselves.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Arguments didn't match the descriptor. Carries the usage line.
    #[error("usage: {0}")]
    Usage(String),

    #[error(transparent)]
    Platform(#[from] PlatformError),

    /// External provider (AI, lookup) failed.
    #[error("provider failure: {0}")]
    Provider(String),

    #[error("store failure: {0}")]
    Store(String),

    #[error("{0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, CommandError>;
