use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced to callers of [`crate::Combiner::combine`].
///
/// Both variants are fatal to the current batch only; the caller is expected
/// to fall back to emitting the source files individually. Remote minification
/// failures never appear here, they are absorbed by the strategy chain.
#[derive(Debug, Error)]
pub enum CombineError {
    #[error("failed to read source file {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to publish combined artifact {path}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CombineError {
    pub(crate) fn read(path: PathBuf, source: std::io::Error) -> Self {
        Self::Read { path, source }
    }

    pub(crate) fn write(path: PathBuf, source: std::io::Error) -> Self {
        Self::Write { path, source }
    }
}
