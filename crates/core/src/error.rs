//! Error type shared across the restyle crates.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Failed to read prompt set {path}: {source}")]
    PromptSetIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse prompt set {path}: {reason}")]
    PromptSetParse { path: PathBuf, reason: String },

    #[error("Refusing to overwrite existing output: {0}")]
    WouldOverwrite(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
