use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VfsError {
    #[error("Invalid path: {0}")]
    InvalidPath(String),
    #[error("No such file or directory: {0}")]
    PathNotFound(String),
    #[error("Already exists: {0}")]
    PathAlreadyExists(String),
    #[error("Not a file: {0}")]
    NotAFile(String),
    #[error("Is a directory: {0}")]
    PathIsDirectory(String),
    #[error("Not a directory: {0}")]
    NotADirectory(String),
    #[error("Directory not empty: {0}")]
    DirectoryNotEmpty(String),
    #[error("Limit exceeded: {0}")]
    LimitExceeded(String),
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),
}

impl VfsError {
    pub fn code(&self) -> &str {
        match self {
            Self::InvalidPath(_) => "VFS_INVALID_PATH",
            Self::PathNotFound(_) => "VFS_NOT_FOUND",
            Self::PathAlreadyExists(_) => "VFS_ALREADY_EXISTS",
            Self::NotAFile(_) => "VFS_NOT_FILE",
            Self::PathIsDirectory(_) => "VFS_IS_DIRECTORY",
            Self::NotADirectory(_) => "VFS_NOT_DIRECTORY",
            Self::DirectoryNotEmpty(_) => "VFS_NOT_EMPTY",
            Self::LimitExceeded(_) => "VFS_LIMIT_EXCEEDED",
            Self::InvalidOperation(_) => "VFS_INVALID_OPERATION",
        }
    }

    pub fn to_json_rpc_error(&self) -> serde_json::Value {
        serde_json::json!({
            "code": self.code(),
            "message": self.to_string(),
        })
    }
}
