use arbor_tree::TreeError;
use arbor_vfs::VfsError;
use thiserror::Error;

use crate::protocol::{DOMAIN_ERROR, INTERNAL_ERROR, INVALID_PARAMS};

/// Typed error variants for the arbor JSON-RPC server.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Invalid params: {0}")]
    InvalidParams(String),

    #[error(transparent)]
    Tree(#[from] TreeError),

    #[error(transparent)]
    Vfs(#[from] VfsError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ServerError {
    /// Return a machine-readable error code string for this error variant.
    pub fn code(&self) -> &str {
        match self {
            Self::InvalidParams(_) => "INVALID_PARAMS",
            Self::Tree(e) => e.code(),
            Self::Vfs(e) => e.code(),
            Self::Io(_) => "IO_ERROR",
            Self::Json(_) => "JSON_ERROR",
        }
    }

    /// JSON-RPC error code the response is sent with.
    pub fn rpc_code(&self) -> i32 {
        match self {
            Self::InvalidParams(_) => INVALID_PARAMS,
            Self::Tree(_) | Self::Vfs(_) => DOMAIN_ERROR,
            Self::Io(_) | Self::Json(_) => INTERNAL_ERROR,
        }
    }

    pub fn to_json_rpc_error(&self) -> serde_json::Value {
        match self {
            Self::Vfs(e) => e.to_json_rpc_error(),
            _ => serde_json::json!({
                "code": self.code(),
                "message": self.to_string(),
            }),
        }
    }
}
