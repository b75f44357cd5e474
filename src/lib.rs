//! # wattpad-dl
//!
//! Backend library for converting hosted serialized stories into
//! downloadable EPUB or PDF artifacts, streamed to the requesting client.
//!
//! ## Design Philosophy
//!
//! wattpad-dl is designed to be:
//! - **Cancellation-correct** - all in-flight work stops the instant the
//!   client disconnects, at whichever suspension point it is parked on
//! - **Sensible defaults** - works out of the box with zero configuration
//! - **Library-first** - no CLI or UI, purely a Rust crate for embedding;
//!   the bundled axum server is one `start_api_server` call away
//! - **Uniform failures** - heterogeneous upstream errors collapse into a
//!   fixed set of client-facing outcomes
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use wattpad_dl::{Config, StoryDownloader, api};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Arc::new(Config::default());
//!     let downloader = Arc::new(StoryDownloader::new((*config).clone())?);
//!
//!     // Serve GET /download/{id} until SIGTERM/Ctrl+C
//!     api::start_api_server(downloader, config).await?;
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// REST API module
pub mod api;
/// Book assembly (EPUB and PDF builders)
pub mod book;
/// Upstream content client
pub mod client;
/// Configuration types
pub mod config;
/// Download orchestration
pub mod downloader;
/// Error types
pub mod error;
/// Core types
pub mod types;
/// Utility functions
pub mod utils;

// Re-export commonly used types
pub use book::{BookBuilder, EpubBuilder, PdfBuilder};
pub use client::{ContentClient, WattpadClient};
pub use config::{ApiConfig, Config, SourceConfig};
pub use downloader::StoryDownloader;
pub use error::{Error, Result};
pub use types::{
    Credentials, DownloadFormat, DownloadMode, DownloadOutcome, DownloadRequest, FetchedChapter,
    GeneratedBook, Part, Session, Story, StoryId,
};
