//! Document Format Seam
//!
//! The session layer never interprets document bytes itself. It hands them
//! to a [`DocumentFormat`] which resolves the page index up front, so page
//! access after open is a plain lookup.

pub mod probe;

pub use probe::PdfProbe;

use thiserror::Error;

/// Why a byte buffer was not accepted as a document
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    #[error("unsupported format: {0}")]
    Unsupported(String),
    #[error("corrupt document: {0}")]
    Corrupt(String),
}

/// Location of a single page inside the document bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageEntry {
    /// Indirect object number that defines the page
    pub object_number: u32,
    /// Byte offset of the object header (`N G obj`)
    pub offset: usize,
}

/// Page metadata resolved when a document is opened or committed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageIndex {
    entries: Vec<PageEntry>,
}

impl PageIndex {
    pub fn new(entries: Vec<PageEntry>) -> Self {
        Self { entries }
    }

    pub fn page_count(&self) -> usize {
        self.entries.len()
    }

    pub fn get(&self, index: usize) -> Option<&PageEntry> {
        self.entries.get(index)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// External parsing collaborator used by the session manager
pub trait DocumentFormat: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str;

    /// Validate `bytes` and build the page index
    fn probe(&self, bytes: &[u8]) -> Result<PageIndex, FormatError>;
}
