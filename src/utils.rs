//! Utility functions for filenames, URLs, and small HTML helpers

use std::sync::OnceLock;

use regex::Regex;

use crate::types::{DownloadFormat, StoryId};

fn non_alphanumeric_runs() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // Panic-free: the pattern is a literal and always compiles
    RE.get_or_init(|| Regex::new(r"[^a-z0-9]+").unwrap_or_else(|_| unreachable!()))
}

/// Convert a title to a filesystem- and header-safe slug.
///
/// Lowercases the input, collapses every run of non-alphanumeric characters
/// to a single underscore, and strips leading/trailing separators. Titles
/// with no ASCII alphanumerics at all (for example some non-Latin scripts)
/// slug to the empty string; the filename still stays unique through the
/// story id.
///
/// # Examples
///
/// ```
/// use wattpad_dl::utils::slugify;
///
/// assert_eq!(slugify("My Story!! 2024"), "my_story_2024");
/// ```
#[must_use]
pub fn slugify(value: &str) -> String {
    let lowered = value.to_lowercase();
    let collapsed = non_alphanumeric_runs().replace_all(&lowered, "_");
    collapsed.trim_matches('_').to_string()
}

/// Derive the deterministic attachment filename for a generated book:
/// `<slug>_<storyId>[_images].<ext>`.
#[must_use]
pub fn download_filename(
    title: &str,
    story_id: StoryId,
    include_images: bool,
    format: DownloadFormat,
) -> String {
    let suffix = if include_images { "_images" } else { "" };
    format!(
        "{}_{}{}.{}",
        slugify(title),
        story_id,
        suffix,
        format.extension()
    )
}

/// Rewrite a cover URL to its higher-resolution variant by substituting the
/// size marker, e.g. `...-256-...` becomes `...-512-...`.
///
/// URLs without the marker are returned unchanged.
#[must_use]
pub fn upscale_cover_url(url: &str, marker: &str, upscaled: &str) -> String {
    url.replace(marker, upscaled)
}

/// Escape text for embedding into HTML element content or attribute values.
#[must_use]
pub fn html_escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
