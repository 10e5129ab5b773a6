//! Headless host
//!
//! Drives the same flow as the mobile shell: pick a document, open it in
//! the viewer (or editor), report what was opened, then tear down.

use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Serialize;
use tokio::io::{stdin, BufReader};

use crate::navigation::{DocumentPicker, FixedPicker, LinePicker, NavigationError, Navigator};
use crate::session::{DocumentHandle, HandleId, OpenMode, PageInfo, Recovery, SessionError, SessionManager};
use crate::Config;

/// What the host reports about an opened document
#[derive(Debug, Serialize)]
pub struct DocumentSummary {
    pub handle: HandleId,
    pub locator: String,
    pub mode: OpenMode,
    pub route: String,
    pub page_count: usize,
    pub pages: Vec<PageInfo>,
}

impl DocumentSummary {
    pub fn collect(sessions: &SessionManager, handle: &DocumentHandle, route: String) -> Result<Self> {
        let pages = (0..handle.page_count())
            .map(|index| sessions.page(handle, index)?.info())
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            handle: handle.id(),
            locator: handle.locator().to_string(),
            mode: handle.mode(),
            route,
            page_count: pages.len(),
            pages,
        })
    }

    pub fn render_text(&self) -> String {
        let mut out = format!(
            "{} ({} pages, {:?})\nroute: {}\n",
            self.locator, self.page_count, self.mode, self.route
        );
        for page in &self.pages {
            out.push_str(&format!(
                "  page {:>4}: object {} at byte {}\n",
                page.index + 1,
                page.object_number,
                page.offset
            ));
        }
        out
    }
}

/// Run the host with an explicitly constructed session manager
pub async fn run(config: Config) -> Result<()> {
    let sessions = Arc::new(SessionManager::new(config.session.clone()));
    let mut navigator = Navigator::new(Arc::clone(&sessions));

    let picker: Box<dyn DocumentPicker> = match &config.locator {
        Some(locator) => Box::new(FixedPicker::new(Some(locator.clone()))),
        None => Box::new(LinePicker::new(BufReader::new(stdin()))),
    };
    let mode = if config.read_write {
        OpenMode::ReadWrite
    } else {
        OpenMode::ReadOnly
    };

    let handle = match navigator.pick_and_open(picker.as_ref(), mode).await {
        Ok(handle) => handle,
        Err(NavigationError::Cancelled) => {
            log::info!("no document selected");
            return Ok(());
        }
        Err(NavigationError::Open(e)) => {
            let error = SessionError::from(e);
            if error.recovery() == Recovery::RetryOrCancel {
                log::error!("{}; pick another document or cancel", error);
            }
            return Err(error).context("opening document");
        }
        Err(e) => return Err(e.into()),
    };

    if mode == OpenMode::ReadWrite {
        navigator.edit()?;
    }

    let summary = DocumentSummary::collect(&sessions, &handle, navigator.current().path());
    navigator.teardown().await;
    let summary = summary?;

    if config.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print!("{}", summary.render_text());
    }

    sessions.close_all().await;
    Ok(())
}
