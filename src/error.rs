use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors raised by the walker itself. Backend failures are kept unchanged as `cause`.
#[derive(Debug, Error)]
pub enum WalkError {
    /// The directory could not be opened for listing.
    #[error("cannot open directory {}: {cause}", .path.display())]
    Open { path: PathBuf, cause: anyhow::Error },

    /// The directory was opened but its entries could not be read.
    #[error("cannot read directory {}: {cause}", .path.display())]
    Read { path: PathBuf, cause: anyhow::Error },

    /// Metadata could not be resolved.
    #[error("cannot stat {}: {cause}", .path.display())]
    Stat { path: PathBuf, cause: anyhow::Error },

    /// The visitor asked to skip the subtree of an entry that has none.
    #[error("skip-subtree requested for {}, which is not a directory", .path.display())]
    InvalidSkip { path: PathBuf },
}

impl WalkError {
    pub fn path(&self) -> &Path {
        match self {
            WalkError::Open { path, .. }
            | WalkError::Read { path, .. }
            | WalkError::Stat { path, .. }
            | WalkError::InvalidSkip { path } => path,
        }
    }

    /// The backend error behind this failure, if any.
    pub fn cause(&self) -> Option<&anyhow::Error> {
        match self {
            WalkError::Open { cause, .. }
            | WalkError::Read { cause, .. }
            | WalkError::Stat { cause, .. } => Some(cause),
            WalkError::InvalidSkip { .. } => None,
        }
    }

    /// True when the backend reported that the path does not exist.
    pub fn is_not_found(&self) -> bool {
        self.cause()
            .and_then(|cause| cause.downcast_ref::<std::io::Error>())
            .is_some_and(|io| io.kind() == std::io::ErrorKind::NotFound)
    }
}
