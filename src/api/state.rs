//! Application state for the API server

use crate::{Config, StoryDownloader};
use std::sync::Arc;

/// Shared application state accessible to all route handlers
///
/// This struct is cloned for each request (cheap Arc clone) and provides
/// access to the downloader instance and configuration.
#[derive(Clone)]
pub struct AppState {
    /// The main StoryDownloader instance
    pub downloader: Arc<StoryDownloader>,

    /// Configuration (read access for handlers)
    pub config: Arc<Config>,
}

impl AppState {
    /// Create a new AppState
    pub fn new(downloader: Arc<StoryDownloader>, config: Arc<Config>) -> Self {
        Self { downloader, config }
    }
}
