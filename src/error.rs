use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Failure taxonomy of the frame pipeline. Absence of entities and unmatched
/// cascades are ordinary outcomes, not errors.
#[derive(Debug, Error)]
pub enum Error {
    /// The input cannot produce frames at all. Fatal for the invocation.
    #[error("source unavailable: {0}")]
    SourceUnavailable(String),

    /// A detector adapter failed. Per-frame callers degrade this to an
    /// empty detection set and keep going.
    #[error("detector failure")]
    Detector(#[from] anyhow::Error),

    /// Writing an output artifact failed.
    #[error("cannot write {path}")]
    Persistence {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The interactive viewer could not present a frame.
    #[error("display failure: {0}")]
    Render(String),
}

impl Error {
    pub fn persistence(path: &Path, source: io::Error) -> Self {
        Error::Persistence {
            path: path.to_path_buf(),
            source,
        }
    }
}
