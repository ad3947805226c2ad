use smartcd_host::HostError;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ScdError>;

#[derive(Debug, Error)]
pub enum ScdError {
    #[error(
        "scd executable not found: {0}. Place it in a directory in the PATH or set SCD_EXECUTABLE"
    )]
    MatcherNotFound(String),

    #[error("host {host} has no {command} command to wrap")]
    MissingPrimitive { host: String, command: String },

    #[error("Home directory not found")]
    NoHomeDirectory,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Resolver(#[from] ResolverError),

    #[error(transparent)]
    History(#[from] HistoryError),

    #[error(transparent)]
    Navigation(#[from] HostError),
}

impl ScdError {
    /// Errors that stop the extension from loading at all.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            ScdError::MatcherNotFound(_)
                | ScdError::MissingPrimitive { .. }
                | ScdError::NoHomeDirectory
                | ScdError::InvalidConfig(_)
        )
    }
}

#[derive(Debug, Error)]
pub enum ResolverError {
    #[error("matcher not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("failed to launch matcher {}: {source}", path.display())]
    Spawn {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("cannot split query into words: {0}")]
    InvalidQuery(String),

    #[error("matcher channel error: {0}")]
    Io(#[from] std::io::Error),

    #[error("matcher did not exit within {0:?}")]
    Timeout(Duration),
}

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("history entries must be absolute single-line paths, got {0:?}")]
    InvalidPath(PathBuf),

    #[error("cannot append to history log {}: {source}", path.display())]
    Append {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
