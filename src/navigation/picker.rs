//! Document pickers.
//!
//! A picker is awaited once and yields either a locator or a cancellation.

use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PickOutcome {
    Selected(String),
    Cancelled,
}

#[async_trait]
pub trait DocumentPicker: Send + Sync {
    async fn request_document(&self) -> PickOutcome;
}

/// Picker answering with a locator known up front (e.g. from the command line)
#[derive(Debug, Clone, Default)]
pub struct FixedPicker {
    locator: Option<String>,
}

impl FixedPicker {
    pub fn new(locator: Option<String>) -> Self {
        Self { locator }
    }
}

#[async_trait]
impl DocumentPicker for FixedPicker {
    async fn request_document(&self) -> PickOutcome {
        match &self.locator {
            Some(locator) => PickOutcome::Selected(locator.clone()),
            None => PickOutcome::Cancelled,
        }
    }
}

/// Picker reading one locator per line; a blank line or EOF cancels
pub struct LinePicker<R> {
    reader: Mutex<R>,
}

impl<R> LinePicker<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    pub fn new(reader: R) -> Self {
        Self {
            reader: Mutex::new(reader),
        }
    }
}

#[async_trait]
impl<R> DocumentPicker for LinePicker<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    async fn request_document(&self) -> PickOutcome {
        let mut reader = self.reader.lock().await;
        let mut line = String::new();
        match reader.read_line(&mut line).await {
            Ok(_) => {
                let locator = line.trim();
                if locator.is_empty() {
                    PickOutcome::Cancelled
                } else {
                    PickOutcome::Selected(locator.to_string())
                }
            }
            Err(e) => {
                log::warn!("reading document locator failed: {}", e);
                PickOutcome::Cancelled
            }
        }
    }
}
