//! Core types for wattpad-dl

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::{Error, Result};

/// Unique identifier for a story
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(transparent)]
pub struct StoryId(pub u64);

impl StoryId {
    /// Create a new StoryId
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the inner u64 value
    pub fn get(&self) -> u64 {
        self.0
    }
}

impl From<u64> for StoryId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl From<StoryId> for u64 {
    fn from(id: StoryId) -> Self {
        id.0
    }
}

impl std::fmt::Display for StoryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How the request's identifier addresses the source content
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum DownloadMode {
    /// The identifier is a story id
    #[default]
    Story,
    /// The identifier is a part id; the owning story is resolved upstream
    Part,
}

/// Terminal artifact variant
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum DownloadFormat {
    /// EPUB 3 container
    #[default]
    Epub,
    /// Single-file PDF
    Pdf,
}

impl DownloadFormat {
    /// File extension for the artifact, without the leading dot
    pub fn extension(&self) -> &'static str {
        match self {
            DownloadFormat::Epub => "epub",
            DownloadFormat::Pdf => "pdf",
        }
    }

    /// MIME type used for the download response
    pub fn media_type(&self) -> &'static str {
        match self {
            DownloadFormat::Epub => "application/epub+zip",
            DownloadFormat::Pdf => "application/pdf",
        }
    }
}

/// A username/password pair for the upstream credential exchange.
///
/// By construction this always holds both halves — a partial pair cannot
/// exist past [`Credentials::from_parts`]. The pair is consumed by the
/// exchange and never stored beyond the request that carried it.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Account username
    pub username: String,
    /// Account password
    pub password: String,
}

impl Credentials {
    /// Build the optional pair from transport input, enforcing the
    /// both-or-neither invariant before any network call.
    ///
    /// Empty strings count as absent (HTML forms submit empty fields).
    ///
    /// # Errors
    ///
    /// Returns [`Error::CredentialPair`] when exactly one half is present.
    pub fn from_parts(username: Option<String>, password: Option<String>) -> Result<Option<Self>> {
        let username = username.filter(|u| !u.is_empty());
        let password = password.filter(|p| !p.is_empty());
        match (username, password) {
            (Some(username), Some(password)) => Ok(Some(Self { username, password })),
            (None, None) => Ok(None),
            _ => Err(Error::CredentialPair),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never log the password
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Short-lived session obtained from the credential exchange.
///
/// Holds the serialized cookie header attached to authenticated upstream
/// fetches. Dropped with the request that created it.
#[derive(Clone, Debug)]
pub struct Session(pub String);

/// One download request, created at request arrival and destroyed when the
/// handling task ends.
#[derive(Clone, Debug)]
pub struct DownloadRequest {
    /// Story id or part id, depending on `mode`
    pub identifier: u64,
    /// How `identifier` addresses the content
    pub mode: DownloadMode,
    /// Artifact variant to assemble
    pub format: DownloadFormat,
    /// Whether inline chapter images are fetched and embedded
    pub include_images: bool,
    /// Optional credential pair for paywalled/mature content
    pub credentials: Option<Credentials>,
}

/// Story language as reported by the content API
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Language {
    /// Human-readable language name, e.g. "English"
    pub name: String,
}

/// Story author as reported by the content API
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct User {
    /// Author username
    pub username: String,
}

/// One chapter-equivalent unit of a story, addressable by its own id
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Part {
    /// Part identifier
    pub id: u64,
    /// Part title
    pub title: String,
}

/// Story metadata fetched from the content API.
///
/// `parts` ordering is authoritative and preserved end-to-end: the chapter
/// sequence of the generated book matches it index-for-index.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Story {
    /// Story identifier as the API serializes it (a decimal string)
    pub id: String,
    /// Story title
    pub title: String,
    /// Publication timestamp
    pub create_date: DateTime<Utc>,
    /// Last modification timestamp
    pub modify_date: DateTime<Utc>,
    /// Story language
    pub language: Language,
    /// Story author
    pub user: User,
    /// Story description / blurb
    pub description: String,
    /// Cover image URL (standard resolution)
    pub cover: String,
    /// Whether the author marked the story complete
    pub completed: bool,
    /// Author-assigned tags
    #[serde(default)]
    pub tags: Vec<String>,
    /// Whether the story is marked mature
    pub mature: bool,
    /// Canonical story URL
    pub url: String,
    /// Ordered parts making up the story
    pub parts: Vec<Part>,
    /// Whether the story sits behind the paywall
    #[serde(default)]
    pub is_paywalled: bool,
}

/// One fetched chapter, produced one-to-one and in-order from [`Story::parts`].
///
/// `html` already carries the heading derived from the part title.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchedChapter {
    /// Chapter title (the part title, unescaped)
    pub title: String,
    /// Chapter body HTML, heading included
    pub html: String,
}

/// The finished downloadable artifact.
///
/// Terminal and immutable; owned solely by the response-streaming step and
/// released once written to the outbound channel.
#[derive(Clone, PartialEq, Eq)]
pub struct GeneratedBook {
    /// Serialized artifact bytes
    pub bytes: Vec<u8>,
    /// MIME type for the response
    pub media_type: &'static str,
    /// Attachment filename, `<slug>_<storyId>[_images].<ext>`
    pub filename: String,
}

impl std::fmt::Debug for GeneratedBook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // The blob itself is noise in logs; show its size instead
        f.debug_struct("GeneratedBook")
            .field("bytes", &format_args!("[{} bytes]", self.bytes.len()))
            .field("media_type", &self.media_type)
            .field("filename", &self.filename)
            .finish()
    }
}

/// Terminal outcome of one download request
#[derive(Debug)]
pub enum DownloadOutcome {
    /// The pipeline ran to completion and produced an artifact
    Success(GeneratedBook),
    /// The client disconnected; the pipeline was unwound and no response
    /// bytes were (or will be) emitted
    Cancelled,
    /// The pipeline failed; exactly one mapped error response is emitted
    Failed(Error),
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credentials_both_present_is_accepted() {
        let pair = Credentials::from_parts(Some("reader".into()), Some("hunter2".into()))
            .unwrap()
            .unwrap();
        assert_eq!(pair.username, "reader");
        assert_eq!(pair.password, "hunter2");
    }

    #[test]
    fn credentials_both_absent_is_accepted_as_none() {
        assert!(Credentials::from_parts(None, None).unwrap().is_none());
    }

    #[test]
    fn credentials_username_only_is_rejected() {
        let err = Credentials::from_parts(Some("reader".into()), None).unwrap_err();
        assert!(matches!(err, Error::CredentialPair));
    }

    #[test]
    fn credentials_password_only_is_rejected() {
        let err = Credentials::from_parts(None, Some("hunter2".into())).unwrap_err();
        assert!(matches!(err, Error::CredentialPair));
    }

    #[test]
    fn credentials_empty_strings_count_as_absent() {
        // An empty form field and a missing one behave identically
        assert!(
            Credentials::from_parts(Some(String::new()), Some(String::new()))
                .unwrap()
                .is_none()
        );
        let err = Credentials::from_parts(Some("reader".into()), Some(String::new())).unwrap_err();
        assert!(matches!(err, Error::CredentialPair));
    }

    #[test]
    fn credentials_debug_never_shows_password() {
        let pair = Credentials {
            username: "reader".into(),
            password: "hunter2".into(),
        };
        let rendered = format!("{pair:?}");
        assert!(rendered.contains("reader"));
        assert!(!rendered.contains("hunter2"));
    }

    #[test]
    fn format_extension_and_media_type() {
        assert_eq!(DownloadFormat::Epub.extension(), "epub");
        assert_eq!(DownloadFormat::Epub.media_type(), "application/epub+zip");
        assert_eq!(DownloadFormat::Pdf.extension(), "pdf");
        assert_eq!(DownloadFormat::Pdf.media_type(), "application/pdf");
    }

    #[test]
    fn mode_and_format_deserialize_from_query_tokens() {
        assert_eq!(
            serde_json::from_str::<DownloadMode>("\"part\"").unwrap(),
            DownloadMode::Part
        );
        assert_eq!(
            serde_json::from_str::<DownloadFormat>("\"pdf\"").unwrap(),
            DownloadFormat::Pdf
        );
    }

    #[test]
    fn story_deserializes_from_api_payload() {
        let raw = serde_json::json!({
            "id": "12345",
            "title": "My Story",
            "createDate": "2014-10-09T21:26:07Z",
            "modifyDate": "2015-01-01T08:00:00Z",
            "language": {"name": "English"},
            "user": {"username": "author1"},
            "description": "A story.",
            "cover": "https://img.example/cover-256-1.jpg",
            "completed": true,
            "tags": ["adventure"],
            "mature": false,
            "url": "https://example.com/story/12345",
            "parts": [{"id": 1, "title": "One"}, {"id": 2, "title": "Two"}],
            "isPaywalled": false
        });
        let story: Story = serde_json::from_value(raw).unwrap();
        assert_eq!(story.id, "12345");
        assert_eq!(story.parts.len(), 2);
        assert_eq!(story.parts[1].title, "Two");
        assert_eq!(story.language.name, "English");
        assert!(!story.is_paywalled);
    }

    #[test]
    fn story_tolerates_missing_optional_collections() {
        // Older payloads omit tags/isPaywalled
        let raw = serde_json::json!({
            "id": "1",
            "title": "T",
            "createDate": "2014-10-09T21:26:07Z",
            "modifyDate": "2015-01-01T08:00:00Z",
            "language": {"name": "English"},
            "user": {"username": "author1"},
            "description": "",
            "cover": "https://img.example/c-256-1.jpg",
            "completed": false,
            "mature": false,
            "url": "u",
            "parts": []
        });
        let story: Story = serde_json::from_value(raw).unwrap();
        assert!(story.tags.is_empty());
        assert!(!story.is_paywalled);
    }

    #[test]
    fn generated_book_debug_elides_bytes() {
        let book = GeneratedBook {
            bytes: vec![0u8; 4096],
            media_type: "application/pdf",
            filename: "x.pdf".into(),
        };
        let rendered = format!("{book:?}");
        assert!(rendered.contains("[4096 bytes]"));
        assert!(!rendered.contains("0, 0, 0"));
    }
}
