//! Download pipeline — top-level lifecycle for a single request.

use std::sync::Arc;

use futures::stream::{self, StreamExt, TryStreamExt};

use super::StoryDownloader;
use crate::client::ContentClient;
use crate::book::new_builder;
use crate::error::{Error, Result};
use crate::types::{
    DownloadMode, DownloadRequest, FetchedChapter, GeneratedBook, Session, Story, StoryId,
};
use crate::utils::{download_filename, html_escape, upscale_cover_url};

/// Run the request through the full pipeline.
///
/// Phases:
/// 1. Exchange credentials for a session (only when a pair is present; the
///    both-or-neither invariant already held at request construction)
/// 2. Resolve the addressing mode to a uniform `(story id, metadata)` pair
/// 3. Fetch the cover at its higher-resolution variant
/// 4. Fetch every part's content, output ordered exactly like the metadata
/// 5. Assemble the book through the format-selected builder
/// 6. Package bytes, media type, and the deterministic filename
///
/// Any failure transitions straight to the caller; no step is retried.
pub(crate) async fn run(
    downloader: &StoryDownloader,
    request: &DownloadRequest,
) -> Result<GeneratedBook> {
    // Phase 1: optional credential exchange
    let session = match &request.credentials {
        Some(credentials) => Some(downloader.client.exchange_credentials(credentials).await?),
        None => None,
    };

    // Phase 2: normalize both addressing modes to (story id, metadata)
    let (story_id, story) = match request.mode {
        DownloadMode::Story => {
            let story_id = StoryId(request.identifier);
            let story = downloader
                .client
                .fetch_story(story_id, session.as_ref())
                .await?;
            (story_id, story)
        }
        DownloadMode::Part => {
            downloader
                .client
                .resolve_story_from_part(request.identifier, session.as_ref())
                .await?
        }
    };
    tracing::info!(%story_id, title = %story.title, parts = story.parts.len(), "resolved story");

    // Phase 3: cover, upscaled
    let source = &downloader.config.source;
    let cover_url = upscale_cover_url(
        &story.cover,
        &source.cover_size_marker,
        &source.cover_size_upscaled,
    );
    let cover = downloader.client.fetch_image(&cover_url).await?;

    // Phase 4: parts, in order
    let chapters = fetch_chapters(downloader, &story, session.as_ref()).await?;

    // Phase 5: assemble through the format-selected builder
    let mut builder = new_builder(request.format, &story, cover, downloader.client.clone());
    for chapter in &chapters {
        builder.add_chapter(chapter, request.include_images).await?;
        tracing::debug!(title = %chapter.title, "chapter added");
    }
    let bytes = builder.finalize()?;

    // Phase 6: package
    Ok(GeneratedBook {
        bytes,
        media_type: request.format.media_type(),
        filename: download_filename(
            &story.title,
            story_id,
            request.include_images,
            request.format,
        ),
    })
}

/// Fetch every part's HTML, prepending the title heading.
///
/// Fetches may overlap up to the configured concurrency, but the returned
/// sequence always matches `story.parts` order index-for-index — ordering of
/// the output is the invariant, not the fetch scheduling.
async fn fetch_chapters(
    downloader: &StoryDownloader,
    story: &Story,
    session: Option<&Session>,
) -> Result<Vec<FetchedChapter>> {
    let concurrency = downloader.config.source.part_concurrency.max(1);
    let jobs: Vec<_> = story
        .parts
        .iter()
        .map(|part| {
            (
                downloader.client.clone(),
                part.id,
                part.title.clone(),
                session.cloned(),
            )
        })
        .collect();
    let mut futs = Vec::with_capacity(jobs.len());
    for (client, part_id, part_title, session) in jobs {
        let client: Arc<dyn ContentClient> = client;
        futs.push(async move {
            let body = client.fetch_part_content(part_id, session.as_ref()).await?;
            Ok::<_, Error>(FetchedChapter {
                title: part_title.clone(),
                html: format!("<h1>{}</h1>{}", html_escape(&part_title), body),
            })
        });
    }
    stream::iter(futs)
        .buffered(concurrency)
        .try_collect()
        .await
}
