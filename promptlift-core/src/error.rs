use std::path::{Path, PathBuf};
use thiserror::Error;

/// File-level failures. Parse-level problems inside the metadata never end up
/// here; they become [`crate::model::ParseWarning`]s on the result instead.
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("{}: not a PNG image (detected {detected})", path.display())]
    Format { path: PathBuf, detected: String },

    #[error("{}: IO error: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{}: failed to decode PNG: {source}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: png::DecodingError,
    },
}

impl ExtractError {
    /// The file this error belongs to.
    pub fn path(&self) -> &Path {
        match self {
            ExtractError::Format { path, .. }
            | ExtractError::Io { path, .. }
            | ExtractError::Decode { path, .. } => path,
        }
    }

    pub fn is_format_error(&self) -> bool {
        matches!(self, ExtractError::Format { .. })
    }
}

pub type Result<T> = std::result::Result<T, ExtractError>;
