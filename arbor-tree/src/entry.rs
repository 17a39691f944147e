use crate::controller::TreeController;
use crate::error::TreeError;
use crate::flat::FlatEntry;
use crate::identity::StableId;

/// Per-entry view onto a [`TreeController`], bound to one [`StableId`].
///
/// The handle borrows the controller mutably, so reads always reflect the
/// latest committed state and actions go through the same batching as the
/// controller's own methods.
pub struct EntryHandle<'a, T> {
    controller: &'a mut TreeController<T>,
    id: StableId,
}

impl<'a, T> EntryHandle<'a, T> {
    pub(crate) fn new(controller: &'a mut TreeController<T>, id: StableId) -> Self {
        Self { controller, id }
    }

    pub fn id(&self) -> StableId {
        self.id
    }

    pub fn path(&self) -> Result<String, TreeError> {
        self.controller.id_to_path(self.id)
    }

    /// Current projection, or `None` when the entry is not visible.
    pub fn snapshot(&mut self) -> Option<FlatEntry> {
        self.controller.flat_entry(self.id)
    }

    pub fn select(&mut self) -> Result<(), TreeError> {
        self.controller.select(self.id)
    }

    pub fn shift_select(&mut self) -> Result<(), TreeError> {
        self.controller.shift_select(self.id)
    }

    pub fn deselect(&mut self) {
        self.controller.deselect(self.id);
    }

    pub fn focus(&mut self) -> Result<(), TreeError> {
        self.controller.focus(self.id)
    }

    pub fn blur(&mut self) {
        self.controller.blur(self.id);
    }

    pub fn expand(&mut self) -> Result<(), TreeError> {
        self.controller.expand(self.id)
    }

    pub fn collapse(&mut self) {
        self.controller.collapse(self.id);
    }

    /// Rename this entry to `new_path`; the handle keeps pointing at it.
    pub fn rename(&mut self, new_path: &str) -> Result<(), TreeError> {
        let old_path = self.path()?;
        self.controller.rename_dir_ent(&old_path, new_path)
    }
}
