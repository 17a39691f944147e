pub mod error;
pub mod path;
pub mod vfs;

pub use error::VfsError;
pub use path::VfsLimits;
pub use vfs::{
    DirEntry, EntryKind, FileCell, MetricsResult, RenamePolicy, SharedFs, VfsEvent, VfsOptions,
    VirtualFs,
};
