//! Download orchestration
//!
//! [`StoryDownloader`] owns the per-request pipeline: credential exchange,
//! story/part resolution, ordered content retrieval, book assembly, and the
//! terminal [`DownloadOutcome`]. Each request runs as one logical task whose
//! derived data is exclusively owned by that task; nothing is shared or
//! cached across requests.

mod pipeline;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::client::{ContentClient, WattpadClient};
use crate::config::Config;
use crate::error::Result;
use crate::types::{DownloadOutcome, DownloadRequest};

/// Main downloader instance (cloneable - all fields are Arc-wrapped)
#[derive(Clone)]
pub struct StoryDownloader {
    /// Upstream content client (trait object for pluggable implementations)
    pub(crate) client: Arc<dyn ContentClient>,
    /// Configuration (wrapped in Arc for sharing across tasks)
    pub(crate) config: Arc<Config>,
}

impl StoryDownloader {
    /// Create a downloader backed by the production Wattpad client.
    pub fn new(config: Config) -> Result<Self> {
        let client = WattpadClient::new(&config.source)?;
        Ok(Self {
            client: Arc::new(client),
            config: Arc::new(config),
        })
    }

    /// Create a downloader with a custom content client.
    ///
    /// Used by tests and by embedders targeting a different content source.
    pub fn with_client(client: Arc<dyn ContentClient>, config: Arc<Config>) -> Self {
        Self { client, config }
    }

    /// Run one download request to its terminal outcome.
    ///
    /// The pipeline future is raced against `cancel`: a cancellation raised
    /// while any upstream call or builder step is pending drops the whole
    /// chain at that suspension point and resolves to
    /// [`DownloadOutcome::Cancelled`] without emitting anything. Failures are
    /// logged here and carried out as [`DownloadOutcome::Failed`]; mapping to
    /// a client-facing response happens in the HTTP layer.
    pub async fn download(
        &self,
        request: DownloadRequest,
        cancel: CancellationToken,
    ) -> DownloadOutcome {
        match cancel.run_until_cancelled(pipeline::run(self, &request)).await {
            None => {
                tracing::info!(
                    identifier = request.identifier,
                    "download cancelled, client disconnected"
                );
                DownloadOutcome::Cancelled
            }
            Some(Ok(book)) => {
                tracing::info!(
                    identifier = request.identifier,
                    filename = %book.filename,
                    size = book.bytes.len(),
                    "download complete"
                );
                DownloadOutcome::Success(book)
            }
            Some(Err(error)) => {
                tracing::error!(
                    identifier = request.identifier,
                    error = %error,
                    "download failed"
                );
                DownloadOutcome::Failed(error)
            }
        }
    }
}
