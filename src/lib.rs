//! PDF Editor Core
//!
//! The engine behind a PDF viewer/editor shell.
//!
//! This library provides:
//! - Document sessions: open, page access, transactional save, close
//! - A pluggable document format seam with a built-in PDF probe
//! - Typed navigation between the picker, viewer and editor screens
//! - Configuration management

pub mod config;
pub mod format;
pub mod host;
pub mod navigation;
pub mod session;

// Re-exports for clean public API
pub use config::{Config, SessionConfig};
pub use format::{DocumentFormat, PdfProbe};
pub use navigation::{Navigator, Route};
pub use session::{DocumentHandle, EditOperation, EditTransaction, OpenMode, SessionManager};
