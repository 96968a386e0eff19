// Dataset error module

use std::path::{Path, PathBuf};
use thiserror::Error;

/// A dataset could not be served.
///
/// Read and parse failures are kept apart for logging, but the HTTP layer
/// renders both through the same error envelope.
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("{source}: '{}'", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON in '{}': {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl DatasetError {
    pub fn path(&self) -> &Path {
        match self {
            Self::Read { path, .. } | Self::Parse { path, .. } => path,
        }
    }
}
