//! Document Sessions
//!
//! Handle lifecycle, page access and transactional saving for open documents.

pub mod error;
pub mod handle;
pub mod manager;
pub mod storage;
pub mod transaction;

pub use error::{OpenError, PageError, Recovery, SaveError, SessionError, StateError};
pub use handle::{DocumentHandle, HandleId, LifecycleState, OpenMode, PageInfo, PageRef};
pub use manager::SessionManager;
pub use transaction::{EditOperation, EditTransaction};
