//! Error types for vault ingestion.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum VaultError {
    #[error("malformed front matter: {0}")]
    MalformedHeader(String),

    #[error("front matter block is not terminated")]
    UnterminatedHeader,

    #[error("invalid glob pattern `{pattern}`: {message}")]
    InvalidGlob { pattern: String, message: String },

    #[error("io error for {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
