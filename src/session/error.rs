//! Error taxonomy of the session manager.

use std::io;

use thiserror::Error;

use super::handle::LifecycleState;
use crate::format::FormatError;

/// Failure to open a document
#[derive(Debug, Error)]
pub enum OpenError {
    #[error("document not found: {locator}")]
    NotFound { locator: String },

    #[error("permission denied: {locator}")]
    PermissionDenied { locator: String },

    #[error("unsupported document {locator}: {reason}")]
    UnsupportedFormat { locator: String, reason: String },

    #[error("corrupt document {locator}: {reason}")]
    Corrupt { locator: String, reason: String },
}

impl OpenError {
    pub(crate) fn from_io(locator: &str, error: io::Error) -> Self {
        let locator = locator.to_string();
        match error.kind() {
            io::ErrorKind::NotFound => OpenError::NotFound { locator },
            io::ErrorKind::PermissionDenied => OpenError::PermissionDenied { locator },
            io::ErrorKind::IsADirectory => OpenError::UnsupportedFormat {
                locator,
                reason: "not a regular file".to_string(),
            },
            _ => OpenError::Corrupt {
                locator,
                reason: format!("unreadable: {}", error),
            },
        }
    }

    pub(crate) fn from_format(locator: &str, error: FormatError) -> Self {
        let locator = locator.to_string();
        match error {
            FormatError::Unsupported(reason) => OpenError::UnsupportedFormat { locator, reason },
            FormatError::Corrupt(reason) => OpenError::Corrupt { locator, reason },
        }
    }
}

/// Failure to resolve a page
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PageError {
    #[error("document handle is not open")]
    HandleClosed,

    #[error("page index {index} out of range (document has {page_count} pages)")]
    IndexOutOfRange { index: usize, page_count: usize },
}

/// Operation not permitted in the handle's current state
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    #[error("document was opened read-only")]
    ReadOnly,

    #[error("another edit transaction is pending")]
    TransactionPending,

    #[error("document handle is {0}")]
    NotOpen(LifecycleState),
}

/// Failure to persist a transaction
#[derive(Debug, Error)]
pub enum SaveError {
    #[error("i/o failure while saving: {0}")]
    IoFailure(#[from] io::Error),

    #[error("document was modified outside this session")]
    ConcurrentModification,

    #[error("staged changes produce an invalid document: {0}")]
    Rejected(FormatError),

    #[error("transaction was invalidated by closing its document")]
    Invalidated,
}

/// How a user-facing surface should react to an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recovery {
    /// Offer the user a retry or cancel choice
    RetryOrCancel,
    /// Caller logic defect; not recoverable at runtime
    Defect,
}

/// Any error produced by the session manager
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Open(#[from] OpenError),
    #[error(transparent)]
    Page(#[from] PageError),
    #[error(transparent)]
    State(#[from] StateError),
    #[error(transparent)]
    Save(#[from] SaveError),
}

impl SessionError {
    pub fn recovery(&self) -> Recovery {
        match self {
            SessionError::Open(_) | SessionError::Save(_) => Recovery::RetryOrCancel,
            SessionError::Page(_) | SessionError::State(_) => Recovery::Defect,
        }
    }
}
