//! Book assembly
//!
//! Turns fetched story content into a finished ebook artifact. The
//! orchestrator selects one [`BookBuilder`] variant per request through
//! [`new_builder`] and never branches on the format again: EPUB and PDF
//! assembly differ only behind the trait.

pub mod epub;
mod images;
pub mod pdf;

use std::sync::Arc;

use async_trait::async_trait;

use crate::client::ContentClient;
use crate::error::Result;
use crate::types::{DownloadFormat, FetchedChapter, Story};

pub use epub::EpubBuilder;
pub use pdf::PdfBuilder;

/// Accumulates chapters and a cover into a finished binary artifact.
///
/// Chapters must be added in story order; the builder preserves insertion
/// order in the finished book. Builders may perform their own network fetches
/// for inline images; any failure inside assembly surfaces as
/// [`Error::Build`](crate::error::Error::Build).
#[async_trait]
pub trait BookBuilder: Send {
    /// Append the next chapter in order.
    async fn add_chapter(&mut self, chapter: &FetchedChapter, include_images: bool) -> Result<()>;

    /// Serialize the finished artifact, consuming the builder.
    fn finalize(self: Box<Self>) -> Result<Vec<u8>>;
}

/// Select the builder variant for `format`.
///
/// `client` is only used for inline image fetches when the request asked for
/// images; the cover bytes have already been fetched by the pipeline.
pub fn new_builder(
    format: DownloadFormat,
    story: &Story,
    cover: Vec<u8>,
    client: Arc<dyn ContentClient>,
) -> Box<dyn BookBuilder> {
    match format {
        DownloadFormat::Epub => Box::new(EpubBuilder::new(story.clone(), cover, client)),
        DownloadFormat::Pdf => Box::new(PdfBuilder::new(story.clone(), cover, client)),
    }
}
