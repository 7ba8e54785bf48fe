//! Error types shared by the whole crate.

use std::path::PathBuf;
use thiserror::Error;

/// Errors produced by a [`Codec`](crate::codec::Codec) while turning a
/// document into bytes or back.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The document could not be written in the codec's format.
    #[error("Failed to encode document: {0}")]
    Encode(String),

    /// The bytes could not be parsed in the codec's format.
    #[error("Failed to decode document: {0}")]
    Decode(String),
}

impl CodecError {
    pub fn encode(err: impl std::fmt::Display) -> Self {
        CodecError::Encode(err.to_string())
    }

    pub fn decode(err: impl std::fmt::Display) -> Self {
        CodecError::Decode(err.to_string())
    }
}

/// Errors that can occur while mutating, loading or saving a config tree.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The persistence context has no root folder, so no file can be resolved.
    #[error("Root folder is not set")]
    RootFolderUnset,

    /// No codec is registered for the extension of a root config.
    #[error("No codec supports extension: {0}")]
    UnsupportedExtension(String),

    /// Reading, writing or creating a directory failed.
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A value has no faithful form in the document tree and would not
    /// load back, e.g. a non-finite float (written as `null`).
    #[error("Value for {field} cannot be stored: {reason}")]
    Unrepresentable { field: &'static str, reason: String },

    /// The codec rejected the document.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// A node or value could not be converted to or from the document tree.
    #[error("Value conversion failed: {0}")]
    Value(#[from] serde_json::Error),
}

impl ConfigError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConfigError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, ConfigError>;
