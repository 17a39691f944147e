use arbor_vfs::{RenamePolicy, VfsLimits, VfsOptions};
use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "arbor-server", about = "Tree controller over JSON-RPC 2.0 / NDJSON stdio")]
pub struct CliArgs {
    /// Subtree the tree view is rooted at (empty for the store root)
    #[arg(long, default_value = "", env = "ARBOR_BASE")]
    pub base: String,

    /// Fail renames whose source is missing instead of ignoring them
    #[arg(long, env = "ARBOR_STRICT_RENAME")]
    pub strict_rename: bool,

    /// Maximum number of entries the store may hold, root included
    #[arg(long, default_value = "10000", env = "ARBOR_MAX_NODE_COUNT")]
    pub max_node_count: usize,

    /// Maximum number of segments in a path
    #[arg(long, default_value = "32", env = "ARBOR_MAX_PATH_DEPTH")]
    pub max_path_depth: usize,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "ARBOR_LOG_LEVEL")]
    pub log_level: String,
}

/// Settings a [`TreeServer`](crate::server::TreeServer) starts from; the
/// `initialize` request can replace them.
#[derive(Debug, Clone, Default)]
pub struct ServerConfig {
    pub base: String,
    pub options: VfsOptions,
}

impl From<&CliArgs> for ServerConfig {
    fn from(args: &CliArgs) -> Self {
        Self {
            base: args.base.clone(),
            options: VfsOptions {
                limits: VfsLimits {
                    max_path_depth: args.max_path_depth,
                    max_node_count: args.max_node_count,
                    ..VfsLimits::default()
                },
                rename_policy: if args.strict_rename {
                    RenamePolicy::Strict
                } else {
                    RenamePolicy::Lenient
                },
            },
        }
    }
}
