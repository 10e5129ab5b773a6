//! Staged edits against a read-write handle.

use uuid::Uuid;

use super::handle::DocumentHandle;

/// A byte-level mutation of a document
///
/// Semantic edits (annotations, page reorder, text) are expressed by the
/// caller as one of these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditOperation {
    /// Append an incremental update section after the current end of file
    AppendIncrement(Vec<u8>),
    /// Replace the whole document
    ReplaceContents(Vec<u8>),
}

impl EditOperation {
    pub(crate) fn apply(self, bytes: &mut Vec<u8>) {
        match self {
            EditOperation::AppendIncrement(section) => {
                if bytes.last().is_some_and(|b| *b != b'\n') {
                    bytes.push(b'\n');
                }
                bytes.extend_from_slice(&section);
            }
            EditOperation::ReplaceContents(contents) => *bytes = contents,
        }
    }
}

/// Ordered group of operations, committed or discarded as a unit
///
/// Obtained from [`SessionManager::begin_edit`](super::SessionManager::begin_edit).
/// Dropping a transaction without committing it discards it.
#[derive(Debug)]
pub struct EditTransaction {
    handle: DocumentHandle,
    id: Uuid,
    operations: Vec<EditOperation>,
    finished: bool,
}

impl EditTransaction {
    pub(crate) fn new(handle: DocumentHandle, id: Uuid) -> Self {
        Self {
            handle,
            id,
            operations: Vec::new(),
            finished: false,
        }
    }

    pub fn handle(&self) -> &DocumentHandle {
        &self.handle
    }

    pub fn operations(&self) -> &[EditOperation] {
        &self.operations
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Stage an operation; marks the document dirty
    pub fn stage(&mut self, operation: EditOperation) {
        let mut meta = self.handle.shared.meta.write();
        if meta.pending.is_some_and(|p| p.id == self.id) {
            meta.dirty = true;
        }
        drop(meta);
        self.operations.push(operation);
    }

    pub(crate) fn into_parts(mut self) -> (DocumentHandle, Uuid, Vec<EditOperation>) {
        self.finished = true;
        let operations = std::mem::take(&mut self.operations);
        (self.handle.clone(), self.id, operations)
    }

    pub(crate) fn abandon(&mut self) {
        if self.finished {
            return;
        }
        self.finished = true;
        self.operations.clear();

        let mut meta = self.handle.shared.meta.write();
        if meta.pending.is_some_and(|p| p.id == self.id) {
            meta.clear_pending();
            log::debug!(
                "discarded edit transaction {} on {}",
                self.id,
                self.handle.shared.id
            );
        }
    }
}

impl Drop for EditTransaction {
    fn drop(&mut self) {
        self.abandon();
    }
}
