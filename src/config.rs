//! Configuration types for wattpad-dl

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

/// API server configuration
///
/// Groups settings for the HTTP surface. Used as a nested sub-config within
/// [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Bind address for the API server (default: "0.0.0.0:8080")
    #[serde(default = "default_bind_address")]
    pub bind_address: SocketAddr,

    /// Enable CORS middleware (default: true)
    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// Allowed CORS origins; "*" allows any origin (default: ["*"])
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            cors_enabled: true,
            cors_origins: default_cors_origins(),
        }
    }
}

/// Content source configuration
///
/// Groups settings for talking to the upstream story API. The base URL is
/// configurable so tests can point the client at a local double.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Base URL of the content API (default: "https://www.wattpad.com")
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// User-Agent header sent on every upstream request
    ///
    /// The source serves different (reduced) payloads to non-browser agents,
    /// so this defaults to a desktop browser string.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Size marker found in standard-resolution cover URLs (default: "-256-")
    #[serde(default = "default_cover_size_marker")]
    pub cover_size_marker: String,

    /// Replacement marker selecting the higher-resolution cover (default: "-512-")
    #[serde(default = "default_cover_size_upscaled")]
    pub cover_size_upscaled: String,

    /// How many part-content fetches may be in flight at once (default: 1)
    ///
    /// Output order always matches the story's part order regardless of this
    /// setting; raising it only overlaps the fetch latencies.
    #[serde(default = "default_part_concurrency")]
    pub part_concurrency: usize,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            user_agent: default_user_agent(),
            cover_size_marker: default_cover_size_marker(),
            cover_size_upscaled: default_cover_size_upscaled(),
            part_concurrency: default_part_concurrency(),
        }
    }
}

/// Top-level configuration for wattpad-dl
///
/// Works out of the box with zero configuration; every field has a sensible
/// default and deserializes from partial input.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// HTTP API settings
    #[serde(default)]
    pub api: ApiConfig,

    /// Upstream content source settings
    #[serde(default)]
    pub source: SourceConfig,
}

fn default_bind_address() -> SocketAddr {
    // Panic-free: the literal always parses
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

fn default_true() -> bool {
    true
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".to_string()]
}

fn default_api_base() -> String {
    "https://www.wattpad.com".to_string()
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) \
     Chrome/103.0.0.0 Safari/537.36"
        .to_string()
}

fn default_cover_size_marker() -> String {
    "-256-".to_string()
}

fn default_cover_size_upscaled() -> String {
    "-512-".to_string()
}

fn default_part_concurrency() -> usize {
    1
}
