use arbor_vfs::VfsError;
use thiserror::Error;

/// Typed error variants for tree controller operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    #[error("Invalid move: cannot move {path} into {target}")]
    InvalidMove { path: String, target: String },

    #[error("Identity not found: {0}")]
    IdentityNotFound(String),

    #[error("Already exists: {}", .0.join(", "))]
    PathsAlreadyExist(Vec<String>),

    #[error(transparent)]
    Vfs(#[from] VfsError),
}

impl TreeError {
    /// Return a machine-readable error code string for this error variant.
    pub fn code(&self) -> &str {
        match self {
            Self::InvalidMove { .. } => "TREE_INVALID_MOVE",
            Self::IdentityNotFound(_) => "TREE_IDENTITY_NOT_FOUND",
            Self::PathsAlreadyExist(_) => "VFS_ALREADY_EXISTS",
            Self::Vfs(e) => e.code(),
        }
    }
}
