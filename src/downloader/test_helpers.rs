//! Shared test doubles for the download pipeline and book builders.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::TimeZone;

use crate::client::ContentClient;
use crate::config::Config;
use crate::downloader::StoryDownloader;
use crate::error::{Error, Result};
use crate::types::{Credentials, Language, Part, Session, Story, StoryId, User};

/// Deterministic story fixture with `parts` numbered parts.
pub(crate) fn test_story(parts: usize) -> Story {
    Story {
        id: "42".to_string(),
        title: "Starfall".to_string(),
        create_date: chrono::Utc
            .with_ymd_and_hms(2014, 10, 9, 21, 26, 7)
            .single()
            .unwrap(),
        modify_date: chrono::Utc
            .with_ymd_and_hms(2015, 1, 1, 8, 0, 0)
            .single()
            .unwrap(),
        language: Language {
            name: "English".to_string(),
        },
        user: User {
            username: "author1".to_string(),
        },
        description: "A story.".to_string(),
        cover: "https://img.example/cover-256-1.jpg".to_string(),
        completed: true,
        tags: vec!["space".to_string()],
        mature: false,
        url: "https://example.com/story/42".to_string(),
        parts: (0..parts)
            .map(|index| Part {
                id: 10 + index as u64,
                title: format!("Part {}", index + 1),
            })
            .collect(),
        is_paywalled: false,
    }
}

/// Recording [`ContentClient`] double.
///
/// Every call appends a `"kind:argument"` entry to an internal log so tests
/// can assert both call counts and relative order. Failure modes are opt-in
/// through the builder methods.
#[derive(Default)]
pub(crate) struct MockContentClient {
    calls: Mutex<Vec<String>>,
    reject_auth: bool,
    story_not_found: bool,
    fail_images: bool,
    /// Part fetches never resolve; used to park the pipeline at a suspension
    /// point for cancellation tests
    hang_parts: bool,
    /// Part fetches complete in scrambled order to prove output ordering is
    /// independent of completion ordering
    stagger_parts: bool,
}

impl MockContentClient {
    pub(crate) fn rejecting_auth(mut self) -> Self {
        self.reject_auth = true;
        self
    }

    pub(crate) fn story_not_found(mut self) -> Self {
        self.story_not_found = true;
        self
    }

    pub(crate) fn failing_images(mut self) -> Self {
        self.fail_images = true;
        self
    }

    pub(crate) fn hanging_parts(mut self) -> Self {
        self.hang_parts = true;
        self
    }

    pub(crate) fn staggered_parts(mut self) -> Self {
        self.stagger_parts = true;
        self
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, entry: String) {
        self.calls.lock().unwrap().push(entry);
    }
}

#[async_trait]
impl ContentClient for MockContentClient {
    async fn exchange_credentials(&self, credentials: &Credentials) -> Result<Session> {
        self.record(format!("auth:{}", credentials.username));
        if self.reject_auth {
            return Err(Error::AuthRejected);
        }
        Ok(Session("token=test".to_string()))
    }

    async fn fetch_story(&self, story_id: StoryId, _session: Option<&Session>) -> Result<Story> {
        self.record(format!("story:{story_id}"));
        if self.story_not_found {
            return Err(Error::StoryNotFound);
        }
        Ok(test_story(3))
    }

    async fn resolve_story_from_part(
        &self,
        part_id: u64,
        _session: Option<&Session>,
    ) -> Result<(StoryId, Story)> {
        self.record(format!("resolve:{part_id}"));
        if self.story_not_found {
            return Err(Error::StoryNotFound);
        }
        Ok((StoryId(42), test_story(3)))
    }

    async fn fetch_part_content(&self, part_id: u64, _session: Option<&Session>) -> Result<String> {
        self.record(format!("part:{part_id}"));
        if self.hang_parts {
            std::future::pending::<()>().await;
        }
        if self.stagger_parts {
            // ids 10/11/12 sleep 60/30/90 ms: completions land out of order
            let delay = (3 - (part_id % 3)) * 30;
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        Ok(format!("<p>content of part {part_id}</p>"))
    }

    async fn fetch_image(&self, url: &str) -> Result<Vec<u8>> {
        self.record(format!("image:{url}"));
        if self.fail_images {
            return Err(Error::UpstreamStatus { status: 500 });
        }
        Ok(vec![0xFF, 0xD8, 0xFF, 0xD9])
    }
}

/// Downloader wired to the given mock, with test-friendly config.
pub(crate) fn test_downloader(client: Arc<MockContentClient>) -> StoryDownloader {
    StoryDownloader::with_client(client, Arc::new(Config::default()))
}
