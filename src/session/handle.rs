//! Document handles and page references.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::error::PageError;
use super::storage::DocumentResource;
use crate::format::PageIndex;

/// String-encodable identifier of an open document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HandleId(Uuid);

impl HandleId {
    pub(crate) fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for HandleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for HandleId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Access requested when opening a document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpenMode {
    ReadOnly,
    ReadWrite,
}

/// Lifetime of the resource behind a handle
///
/// `Failed` is terminal for an open attempt. A failed open never produces a
/// handle, so the state only shows up in the open path's log output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    Opening,
    Open,
    Closing,
    Closed,
    Failed,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LifecycleState::Opening => "opening",
            LifecycleState::Open => "open",
            LifecycleState::Closing => "closing",
            LifecycleState::Closed => "closed",
            LifecycleState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// The edit transaction currently staged against a handle
#[derive(Debug, Clone, Copy)]
pub(crate) struct PendingEdit {
    pub id: Uuid,
    /// Dirty flag to restore if the transaction never commits
    pub dirty_before: bool,
}

/// Metadata read by non-suspending operations
#[derive(Debug)]
pub(crate) struct HandleMeta {
    pub state: LifecycleState,
    pub dirty: bool,
    pub pages: PageIndex,
    pub pending: Option<PendingEdit>,
    /// Incremented on every successful write
    pub generation: u64,
}

impl HandleMeta {
    pub fn opening() -> Self {
        Self {
            state: LifecycleState::Opening,
            dirty: false,
            pages: PageIndex::default(),
            pending: None,
            generation: 0,
        }
    }

    pub fn mark_open(&mut self, pages: PageIndex) {
        debug_assert_eq!(self.state, LifecycleState::Opening);
        self.pages = pages;
        self.state = LifecycleState::Open;
    }

    /// Drop the pending transaction, restoring the dirty flag it found
    pub fn clear_pending(&mut self) -> Option<Uuid> {
        let pending = self.pending.take()?;
        self.dirty = pending.dirty_before;
        Some(pending.id)
    }
}

pub(crate) struct HandleShared {
    pub id: HandleId,
    pub locator: String,
    pub mode: OpenMode,
    pub meta: RwLock<HandleMeta>,
    /// Per-handle critical section; owns the file exclusively
    pub slot: Mutex<Option<DocumentResource>>,
}

/// Reference to one open document, cheap to clone
///
/// All clones refer to the same underlying resource. Closing any clone
/// through the manager closes the document for every holder.
#[derive(Clone)]
pub struct DocumentHandle {
    pub(crate) shared: Arc<HandleShared>,
}

impl DocumentHandle {
    pub(crate) fn new(
        locator: String,
        mode: OpenMode,
        meta: HandleMeta,
        resource: DocumentResource,
    ) -> Self {
        Self {
            shared: Arc::new(HandleShared {
                id: HandleId::new(),
                locator,
                mode,
                meta: RwLock::new(meta),
                slot: Mutex::new(Some(resource)),
            }),
        }
    }

    pub fn id(&self) -> HandleId {
        self.shared.id
    }

    pub fn locator(&self) -> &str {
        &self.shared.locator
    }

    pub fn mode(&self) -> OpenMode {
        self.shared.mode
    }

    pub fn state(&self) -> LifecycleState {
        self.shared.meta.read().state
    }

    pub fn is_dirty(&self) -> bool {
        self.shared.meta.read().dirty
    }

    pub fn page_count(&self) -> usize {
        self.shared.meta.read().pages.page_count()
    }

    /// Number of successful writes since open
    pub fn generation(&self) -> u64 {
        self.shared.meta.read().generation
    }

    pub fn has_pending_edit(&self) -> bool {
        self.shared.meta.read().pending.is_some()
    }
}

impl fmt::Debug for DocumentHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let meta = self.shared.meta.read();
        f.debug_struct("DocumentHandle")
            .field("id", &self.shared.id)
            .field("locator", &self.shared.locator)
            .field("mode", &self.shared.mode)
            .field("state", &meta.state)
            .field("dirty", &meta.dirty)
            .field("pages", &meta.pages.page_count())
            .finish()
    }
}

/// Resolved location of a page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageInfo {
    pub index: usize,
    pub object_number: u32,
    pub offset: usize,
}

/// A page of an open document, identified by zero-based index
#[derive(Debug, Clone)]
pub struct PageRef {
    handle: DocumentHandle,
    index: usize,
}

impl PageRef {
    pub(crate) fn new(handle: DocumentHandle, index: usize) -> Self {
        Self { handle, index }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn handle_id(&self) -> HandleId {
        self.handle.id()
    }

    /// Resolve the page; fails once the owning handle is no longer open
    pub fn info(&self) -> Result<PageInfo, PageError> {
        let meta = self.handle.shared.meta.read();
        if meta.state != LifecycleState::Open {
            return Err(PageError::HandleClosed);
        }
        let entry = meta.pages.get(self.index).ok_or(PageError::IndexOutOfRange {
            index: self.index,
            page_count: meta.pages.page_count(),
        })?;
        Ok(PageInfo {
            index: self.index,
            object_number: entry.object_number,
            offset: entry.offset,
        })
    }
}
