//! Document Session Manager
//!
//! Owns every open document handle. Mutations of one handle are serialized
//! through its resource lock; page lookups only take the metadata read lock
//! and never suspend. Different handles never contend.

use std::sync::Arc;

use dashmap::DashMap;
use uuid::Uuid;

use super::error::{OpenError, PageError, SaveError, StateError};
use super::handle::{DocumentHandle, HandleId, HandleMeta, LifecycleState, OpenMode, PageRef, PendingEdit};
use super::storage::DocumentResource;
use super::transaction::{EditOperation, EditTransaction};
use crate::config::SessionConfig;
use crate::format::{DocumentFormat, FormatError, PageIndex, PdfProbe};

pub struct SessionManager {
    config: SessionConfig,
    format: Arc<dyn DocumentFormat>,
    handles: DashMap<HandleId, DocumentHandle>,
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}

impl SessionManager {
    /// Create a manager using the built-in PDF probe
    pub fn new(config: SessionConfig) -> Self {
        Self::with_format(config, Arc::new(PdfProbe::new()))
    }

    pub fn with_format(config: SessionConfig, format: Arc<dyn DocumentFormat>) -> Self {
        Self {
            config,
            format,
            handles: DashMap::new(),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Open the document at `locator`
    ///
    /// Page metadata is resolved before this returns. On failure nothing
    /// stays open; dropping the future mid-way closes the partially opened
    /// file.
    pub async fn open(&self, locator: &str, mode: OpenMode) -> Result<DocumentHandle, OpenError> {
        log::debug!("{} {} ({:?})", LifecycleState::Opening, locator, mode);

        let opened = match DocumentResource::open(locator, mode, self.config.max_document_bytes)
            .await
        {
            Ok((resource, bytes)) => probe_pages(&self.format, bytes)
                .await
                .map(|(pages, _)| (resource, pages))
                .map_err(|e| OpenError::from_format(locator, e)),
            Err(e) => Err(e),
        };

        let (resource, pages) = match opened {
            Ok(opened) => opened,
            Err(e) => {
                log::warn!("open of {} {}: {}", locator, LifecycleState::Failed, e);
                return Err(e);
            }
        };

        let mut meta = HandleMeta::opening();
        meta.mark_open(pages);
        let handle = DocumentHandle::new(locator.to_string(), mode, meta, resource);
        log::info!(
            "opened {} as {} ({:?}, {} pages, format {})",
            locator,
            handle.id(),
            mode,
            handle.page_count(),
            self.format.name()
        );
        self.handles.insert(handle.id(), handle.clone());
        Ok(handle)
    }

    /// Reference page `index` of an open handle
    pub fn page(&self, handle: &DocumentHandle, index: usize) -> Result<PageRef, PageError> {
        let meta = handle.shared.meta.read();
        if meta.state != LifecycleState::Open {
            return Err(PageError::HandleClosed);
        }
        let page_count = meta.pages.page_count();
        if index >= page_count {
            return Err(PageError::IndexOutOfRange { index, page_count });
        }
        drop(meta);
        Ok(PageRef::new(handle.clone(), index))
    }

    /// Start staging edits; only one transaction may be pending per handle
    pub fn begin_edit(&self, handle: &DocumentHandle) -> Result<EditTransaction, StateError> {
        let mut meta = handle.shared.meta.write();
        if meta.state != LifecycleState::Open {
            return Err(StateError::NotOpen(meta.state));
        }
        if handle.mode() == OpenMode::ReadOnly {
            return Err(StateError::ReadOnly);
        }
        if meta.pending.is_some() {
            return Err(StateError::TransactionPending);
        }

        let id = Uuid::new_v4();
        meta.pending = Some(PendingEdit {
            id,
            dirty_before: meta.dirty,
        });
        drop(meta);

        log::debug!("began edit transaction {} on {}", id, handle.id());
        Ok(EditTransaction::new(handle.clone(), id))
    }

    /// Persist a transaction's operations atomically
    ///
    /// The write runs in its own task holding the handle's lock, so a caller
    /// that stops waiting cannot leave the document half written.
    pub async fn commit(&self, transaction: EditTransaction) -> Result<(), SaveError> {
        let (handle, id, operations) = transaction.into_parts();
        let format = Arc::clone(&self.format);
        let durable = self.config.durable_commits;

        let task = tokio::spawn(commit_locked(handle, id, operations, format, durable));
        match task.await {
            Ok(result) => result,
            Err(e) => Err(SaveError::IoFailure(std::io::Error::other(e))),
        }
    }

    /// Drop a transaction's staged operations
    pub fn discard(&self, mut transaction: EditTransaction) {
        transaction.abandon();
    }

    /// Close a handle; calling this more than once has no further effect
    ///
    /// Waits for an in-flight commit, discards any pending transaction and
    /// releases the file. Release errors are logged only.
    pub async fn close(&self, handle: &DocumentHandle) {
        let shared = &handle.shared;
        let mut slot = shared.slot.lock().await;

        {
            let mut meta = shared.meta.write();
            if meta.state == LifecycleState::Closed {
                return;
            }
            if let Some(id) = meta.clear_pending() {
                log::debug!("closing {} discards pending transaction {}", shared.id, id);
            }
            meta.state = LifecycleState::Closing;
        }

        if let Some(resource) = slot.take() {
            if let Err(e) = resource.release().await {
                log::warn!("releasing {} failed: {}", shared.locator, e);
            }
        }

        shared.meta.write().state = LifecycleState::Closed;
        drop(slot);

        self.handles.remove(&shared.id);
        log::info!("closed {} ({})", shared.locator, shared.id);
    }

    /// Look up an open handle by its identifier
    pub fn resolve(&self, id: &HandleId) -> Option<DocumentHandle> {
        self.handles.get(id).map(|entry| entry.value().clone())
    }

    pub fn open_handles(&self) -> Vec<DocumentHandle> {
        self.handles
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }

    /// Close every open handle
    pub async fn close_all(&self) {
        for handle in self.open_handles() {
            self.close(&handle).await;
        }
    }
}

async fn commit_locked(
    handle: DocumentHandle,
    id: Uuid,
    operations: Vec<EditOperation>,
    format: Arc<dyn DocumentFormat>,
    durable: bool,
) -> Result<(), SaveError> {
    let shared = &handle.shared;
    let mut slot = shared.slot.lock().await;

    {
        let meta = shared.meta.read();
        if meta.state != LifecycleState::Open || !meta.pending.is_some_and(|p| p.id == id) {
            return Err(SaveError::Invalidated);
        }
    }

    let result = match slot.as_mut() {
        Some(resource) => persist(resource, operations, &format, durable).await,
        None => Err(SaveError::Invalidated),
    };

    let mut meta = shared.meta.write();
    match result {
        Ok(Some((replacement, pages))) => {
            meta.pending = None;
            meta.pages = pages;
            meta.dirty = false;
            meta.generation += 1;
            drop(meta);
            *slot = Some(replacement);
            log::info!("committed transaction {} to {}", id, shared.locator);
            Ok(())
        }
        Ok(None) => {
            meta.pending = None;
            meta.dirty = false;
            log::debug!("transaction {} on {} had no operations", id, shared.id);
            Ok(())
        }
        Err(e) => {
            meta.clear_pending();
            log::warn!("commit of {} to {} failed: {}", id, shared.locator, e);
            Err(e)
        }
    }
}

/// Run the format probe off the async worker threads
async fn probe_pages(
    format: &Arc<dyn DocumentFormat>,
    bytes: Vec<u8>,
) -> Result<(PageIndex, Vec<u8>), FormatError> {
    let format = Arc::clone(format);
    tokio::task::spawn_blocking(move || format.probe(&bytes).map(|pages| (pages, bytes)))
        .await
        .unwrap_or_else(|e| Err(FormatError::Corrupt(format!("format probe panicked: {}", e))))
}

/// Apply operations and replace the file; `None` when there was nothing to write
async fn persist(
    resource: &mut DocumentResource,
    operations: Vec<EditOperation>,
    format: &Arc<dyn DocumentFormat>,
    durable: bool,
) -> Result<Option<(DocumentResource, PageIndex)>, SaveError> {
    if resource.changed_on_disk().await {
        return Err(SaveError::ConcurrentModification);
    }
    if operations.is_empty() {
        return Ok(None);
    }

    let mut bytes = resource.read_all().await?;
    for operation in operations {
        operation.apply(&mut bytes);
    }
    let (pages, bytes) = probe_pages(format, bytes)
        .await
        .map_err(SaveError::Rejected)?;

    let replacement = resource.replace(bytes, durable).await?;
    Ok(Some((replacement, pages)))
}
