//! Errors raised while reading declarations or writing generated proxies.

use std::path::PathBuf;

use thiserror::Error;

/// Errors from the file-facing side of the generator.
///
/// Problems with the declarations themselves are reported as
/// [`Diagnostic`](crate::Diagnostic)s, not as errors.
#[derive(Debug, Error)]
pub enum GenerateError {
    /// Reading or writing a file failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// File or directory involved.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Declarations could not be decoded.
    #[error("Invalid declarations: {0}")]
    Decode(#[from] serde_json::Error),
}

impl GenerateError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type for generator I/O.
pub type GenerateResult<T> = Result<T, GenerateError>;
