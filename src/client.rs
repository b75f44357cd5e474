//! Upstream content client
//!
//! Fetches story metadata, part HTML, and image bytes from the Wattpad HTTP
//! API, and exchanges credentials for a session cookie. The orchestrator only
//! talks to the [`ContentClient`] trait; [`WattpadClient`] is the production
//! implementation.
//!
//! The upstream API reports "not found" inconsistently: sometimes as HTTP
//! 404, sometimes as HTTP 400 with a domain error code in the JSON body
//! (1017 for stories, 1020 for parts, 463 for part text). This module
//! normalizes all of those into typed [`Error`] variants so later layers see
//! one failure shape.

use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header;
use serde::Deserialize;

use crate::config::SourceConfig;
use crate::error::{Error, Result};
use crate::types::{Credentials, Session, Story, StoryId};

/// Field list requested for story metadata lookups
const STORY_FIELDS: &str = "tags,id,title,createDate,modifyDate,language(name),description,\
                            completed,mature,url,isPaywalled,user(username),parts(id,title),cover";

/// Field list requested for part-to-story resolution
const PART_FIELDS: &str = "groupId,group(tags,id,title,createDate,modifyDate,language(name),\
                           description,completed,mature,url,isPaywalled,user(username),\
                           parts(id,title),cover)";

/// Upstream operations the download pipeline depends on.
///
/// One implementation per content source; tests substitute a recording mock.
#[async_trait]
pub trait ContentClient: Send + Sync {
    /// Exchange a credential pair for a short-lived session.
    ///
    /// Fails with [`Error::AuthRejected`] when the source refuses the pair.
    async fn exchange_credentials(&self, credentials: &Credentials) -> Result<Session>;

    /// Fetch story metadata by story id.
    async fn fetch_story(&self, story_id: StoryId, session: Option<&Session>) -> Result<Story>;

    /// Resolve the story owning `part_id` and fetch its metadata in one
    /// combined upstream call.
    async fn resolve_story_from_part(
        &self,
        part_id: u64,
        session: Option<&Session>,
    ) -> Result<(StoryId, Story)>;

    /// Fetch the HTML content of a single part.
    async fn fetch_part_content(&self, part_id: u64, session: Option<&Session>) -> Result<String>;

    /// Fetch raw image bytes (covers and inline chapter images).
    async fn fetch_image(&self, url: &str) -> Result<Vec<u8>>;
}

/// Production [`ContentClient`] backed by the Wattpad HTTP API.
#[derive(Debug)]
pub struct WattpadClient {
    http: reqwest::Client,
    api_base: String,
}

impl WattpadClient {
    /// Create a client from source configuration.
    ///
    /// The source serves reduced payloads to non-browser agents, so every
    /// request carries the configured browser User-Agent.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when the configured base URL does not
    /// parse, and a network error when the HTTP client cannot be built.
    pub fn new(config: &SourceConfig) -> Result<Self> {
        url::Url::parse(&config.api_base).map_err(|e| Error::Config {
            message: format!("invalid content source base URL: {e}"),
            key: Some("source.api_base".to_string()),
        })?;

        let http = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self {
            http,
            api_base: config.api_base.trim_end_matches('/').to_string(),
        })
    }

    fn get(&self, url: &str, session: Option<&Session>) -> reqwest::RequestBuilder {
        let mut request = self.http.get(url);
        if let Some(session) = session {
            request = request.header(header::COOKIE, session.0.clone());
        }
        request
    }
}

/// Map a non-success upstream HTTP status to its typed failure.
fn classify_status(status: StatusCode) -> Error {
    if status == StatusCode::TOO_MANY_REQUESTS {
        Error::RateLimited
    } else {
        Error::UpstreamStatus {
            status: status.as_u16(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PartResolution {
    #[serde(deserialize_with = "story_id_from_number_or_string")]
    group_id: StoryId,
    group: Story,
}

/// The API serializes `groupId` as a number but story ids elsewhere as
/// strings; accept both.
fn story_id_from_number_or_string<'de, D>(deserializer: D) -> std::result::Result<StoryId, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Number(u64),
        Text(String),
    }

    match Repr::deserialize(deserializer)? {
        Repr::Number(id) => Ok(StoryId(id)),
        Repr::Text(text) => text.parse().map(StoryId).map_err(serde::de::Error::custom),
    }
}

#[async_trait]
impl ContentClient for WattpadClient {
    async fn exchange_credentials(&self, credentials: &Credentials) -> Result<Session> {
        let url = format!(
            "{}/auth/login?nextUrl=%2F&_data=routes%2Fauth.login",
            self.api_base
        );
        // The username is lowercased upstream anyway; do it here so the
        // exchange is deterministic regardless of how the user typed it.
        let response = self
            .http
            .post(&url)
            .form(&[
                ("username", credentials.username.to_lowercase()),
                ("password", credentials.password.clone()),
            ])
            .send()
            .await?;

        if response.status() != StatusCode::NO_CONTENT {
            tracing::warn!(status = %response.status(), "credential exchange refused");
            return Err(Error::AuthRejected);
        }

        let cookies: Vec<String> = response
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .filter_map(|value| value.split(';').next())
            .map(str::to_string)
            .collect();

        if cookies.is_empty() {
            // A 204 without cookies means the login did not actually stick
            tracing::warn!("credential exchange returned no cookies");
            return Err(Error::AuthRejected);
        }

        Ok(Session(cookies.join("; ")))
    }

    async fn fetch_story(&self, story_id: StoryId, session: Option<&Session>) -> Result<Story> {
        tracing::debug!(%story_id, "fetching story metadata");
        let url = format!(
            "{}/api/v3/stories/{}?fields={}",
            self.api_base, story_id, STORY_FIELDS
        );
        let response = self.get(&url, session).send().await?;

        let status = response.status();
        if status == StatusCode::BAD_REQUEST {
            let body: serde_json::Value = response.json().await?;
            // 1017: "Story not found"
            if body.get("error_code").and_then(serde_json::Value::as_i64) == Some(1017) {
                tracing::info!(%story_id, "story not found upstream");
                return Err(Error::StoryNotFound);
            }
            return Err(classify_status(status));
        }
        if !status.is_success() {
            return Err(classify_status(status));
        }

        Ok(response.json().await?)
    }

    async fn resolve_story_from_part(
        &self,
        part_id: u64,
        session: Option<&Session>,
    ) -> Result<(StoryId, Story)> {
        tracing::debug!(part_id, "resolving story from part");
        let url = format!(
            "{}/api/v3/story_parts/{}?fields={}",
            self.api_base, part_id, PART_FIELDS
        );
        let response = self.get(&url, session).send().await?;

        let status = response.status();
        if status == StatusCode::BAD_REQUEST {
            let body: serde_json::Value = response.json().await?;
            // 1020: "Story part not found"
            if body.get("error_code").and_then(serde_json::Value::as_i64) == Some(1020) {
                tracing::info!(part_id, "part not found upstream");
                return Err(Error::StoryNotFound);
            }
            return Err(classify_status(status));
        }
        if !status.is_success() {
            return Err(classify_status(status));
        }

        let resolution: PartResolution =
            serde_json::from_slice(response.bytes().await?.as_ref())?;
        Ok((resolution.group_id, resolution.group))
    }

    async fn fetch_part_content(&self, part_id: u64, session: Option<&Session>) -> Result<String> {
        tracing::debug!(part_id, "fetching part content");
        let url = format!("{}/apiv2/?m=storytext&id={}", self.api_base, part_id);
        let response = self.get(&url, session).send().await?;

        let status = response.status();
        if status == StatusCode::BAD_REQUEST {
            let body = response.text().await?;
            // 463: "Could not find any parts for that story"
            let code = serde_json::from_str::<serde_json::Value>(&body)
                .ok()
                .and_then(|v| v.get("code").and_then(serde_json::Value::as_i64));
            if code == Some(463) {
                tracing::info!(part_id, "part text not found upstream");
                return Err(Error::StoryNotFound);
            }
            return Err(classify_status(status));
        }
        if !status.is_success() {
            return Err(classify_status(status));
        }

        Ok(response.text().await?)
    }

    async fn fetch_image(&self, url: &str) -> Result<Vec<u8>> {
        tracing::debug!(url, "fetching image");
        let response = self.http.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(classify_status(status));
        }

        Ok(response.bytes().await?.to_vec())
    }
}
