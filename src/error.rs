use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Could not parse configuration: {0}")]
    ConfigSource(#[from] config::ConfigError),

    #[error("Error scanning {}: {source}", .path.display())]
    Scan {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Could not {action} {}: {source}", .path.display())]
    Action {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Input closed while waiting for an answer")]
    InputClosed,

    #[error("Prompt I/O error: {0}")]
    Prompt(#[from] io::Error),
}

impl Error {
    pub fn scan(path: impl AsRef<Path>, source: io::Error) -> Self {
        Self::Scan {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    pub fn action(action: &'static str, path: impl AsRef<Path>, source: io::Error) -> Self {
        Self::Action {
            action,
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Configuration problems stop the run before any phase executes.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Config(_) | Self::ConfigSource(_))
    }
}
