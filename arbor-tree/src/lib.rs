pub mod config;
pub mod controller;
pub mod entry;
pub mod error;
pub mod flat;
pub mod identity;
pub mod moves;
pub mod selection;

pub use config::{RenameCallback, SelectionCallback, TreeConfig};
pub use controller::TreeController;
pub use entry::EntryHandle;
pub use error::TreeError;
pub use flat::{FlatEntry, FlatRow, SortFn, default_sort};
pub use identity::{IdentityRegistry, StableId};
pub use selection::{SelectionSpan, SelectionSpans};
