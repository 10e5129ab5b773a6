//! Screen stack bound to an injected session manager.
//!
//! A document stays open while at least one screen on the stack refers to
//! it; popping the last such screen closes it.

use std::sync::Arc;

use thiserror::Error;

use super::picker::{DocumentPicker, PickOutcome};
use super::routes::{EditorParams, Route, RouteError, ViewerParams};
use crate::session::{DocumentHandle, HandleId, OpenError, OpenMode, SessionManager, StateError};

#[derive(Debug, Error)]
pub enum NavigationError {
    #[error("document selection was cancelled")]
    Cancelled,
    #[error(transparent)]
    Open(#[from] OpenError),
    #[error(transparent)]
    Route(#[from] RouteError),
    #[error(transparent)]
    State(#[from] StateError),
    #[error("no open document {0}")]
    UnknownDocument(HandleId),
    #[error("current screen has no document")]
    NoDocument,
}

pub struct Navigator {
    sessions: Arc<SessionManager>,
    stack: Vec<Route>,
}

impl Navigator {
    pub fn new(sessions: Arc<SessionManager>) -> Self {
        Self {
            sessions,
            stack: vec![Route::FileManager],
        }
    }

    pub fn current(&self) -> &Route {
        // The file manager is never popped
        self.stack.last().unwrap_or(&Route::FileManager)
    }

    pub fn stack(&self) -> &[Route] {
        &self.stack
    }

    pub fn current_document(&self) -> Option<DocumentHandle> {
        let id = self.current().document()?;
        self.sessions.resolve(&id)
    }

    /// Ask the picker for a document, open it and show the viewer
    pub async fn pick_and_open<P>(
        &mut self,
        picker: &P,
        mode: OpenMode,
    ) -> Result<DocumentHandle, NavigationError>
    where
        P: DocumentPicker + ?Sized,
    {
        let locator = match picker.request_document().await {
            PickOutcome::Selected(locator) => locator,
            PickOutcome::Cancelled => return Err(NavigationError::Cancelled),
        };

        let handle = self.sessions.open(&locator, mode).await?;
        self.stack.push(Route::Viewer(ViewerParams {
            document: handle.id(),
        }));
        log::debug!("navigated to {}", self.current());
        Ok(handle)
    }

    /// Push a route; its document must be open
    pub fn navigate(&mut self, route: Route) -> Result<(), NavigationError> {
        if let Some(id) = route.document() {
            let handle = self
                .sessions
                .resolve(&id)
                .ok_or(NavigationError::UnknownDocument(id))?;
            if matches!(route, Route::Editor(_)) && handle.mode() == OpenMode::ReadOnly {
                return Err(StateError::ReadOnly.into());
            }
        }
        self.stack.push(route);
        log::debug!("navigated to {}", route);
        Ok(())
    }

    pub fn navigate_path(&mut self, path: &str) -> Result<(), NavigationError> {
        let route = Route::from_path(path)?;
        self.navigate(route)
    }

    /// Open the editor for the document on the current screen
    pub fn edit(&mut self) -> Result<(), NavigationError> {
        let document = self.current().document().ok_or(NavigationError::NoDocument)?;
        self.navigate(Route::Editor(EditorParams { document }))
    }

    /// Pop the current screen, closing its document if nothing else shows it
    pub async fn back(&mut self) -> Option<Route> {
        if self.stack.len() <= 1 {
            return None;
        }
        let popped = self.stack.pop()?;

        if let Some(id) = popped.document() {
            let still_shown = self.stack.iter().any(|route| route.document() == Some(id));
            if !still_shown {
                if let Some(handle) = self.sessions.resolve(&id) {
                    self.sessions.close(&handle).await;
                }
            }
        }
        Some(popped)
    }

    /// Unwind to the file manager, closing every document on the stack
    pub async fn teardown(&mut self) {
        while self.back().await.is_some() {}
    }
}
