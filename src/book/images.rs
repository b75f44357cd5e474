//! Inline image handling shared by the book builders

use std::sync::OnceLock;

use regex::Regex;

fn img_src() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // Panic-free: the pattern is a literal and always compiles
    RE.get_or_init(|| {
        Regex::new(r#"<img[^>]*?src\s*=\s*"([^"]+)""#).unwrap_or_else(|_| unreachable!())
    })
}

/// Extract the `src` URLs of every `<img>` tag in document order.
///
/// Empty sources are skipped; duplicate URLs are kept (each occurrence gets
/// its own packed copy, mirroring positional file naming).
pub(crate) fn image_sources(html: &str) -> Vec<String> {
    img_src()
        .captures_iter(html)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .filter(|src| !src.is_empty())
        .collect()
}

/// Read the pixel dimensions out of a JPEG's start-of-frame marker.
///
/// Returns `None` for non-JPEG data or truncated streams.
pub(crate) fn jpeg_dimensions(data: &[u8]) -> Option<(u32, u32)> {
    if data.len() < 4 || data[0] != 0xFF || data[1] != 0xD8 {
        return None;
    }

    let mut pos = 2;
    while pos + 9 <= data.len() {
        if data[pos] != 0xFF {
            return None;
        }
        let marker = data[pos + 1];
        // Standalone markers without a length field
        if (0xD0..=0xD9).contains(&marker) {
            pos += 2;
            continue;
        }
        let length = u16::from_be_bytes([data[pos + 2], data[pos + 3]]) as usize;
        let is_sof = matches!(
            marker,
            0xC0 | 0xC1 | 0xC2 | 0xC3 | 0xC5 | 0xC6 | 0xC7 | 0xC9 | 0xCA | 0xCB | 0xCD | 0xCE
                | 0xCF
        );
        if is_sof {
            let height = u32::from(u16::from_be_bytes([data[pos + 5], data[pos + 6]]));
            let width = u32::from(u16::from_be_bytes([data[pos + 7], data[pos + 8]]));
            return Some((width, height));
        }
        pos += 2 + length;
    }
    None
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_sources_in_document_order() {
        let html = r#"<p><img src="https://a/1.jpg"></p>text<img alt="x" src="https://a/2.jpg"/>"#;
        assert_eq!(image_sources(html), vec!["https://a/1.jpg", "https://a/2.jpg"]);
    }

    #[test]
    fn image_sources_skips_empty_src() {
        let html = r#"<img src=""><img src="https://a/1.jpg">"#;
        assert_eq!(image_sources(html), vec!["https://a/1.jpg"]);
    }

    #[test]
    fn image_sources_none_on_plain_text() {
        assert!(image_sources("<p>no images here</p>").is_empty());
    }

    /// Minimal JPEG: SOI, APP0 (empty-ish), SOF0 with 64x32, EOI.
    fn tiny_jpeg(width: u16, height: u16) -> Vec<u8> {
        let mut data = vec![0xFF, 0xD8];
        // APP0 segment, length 4 (length bytes + 2 payload)
        data.extend_from_slice(&[0xFF, 0xE0, 0x00, 0x04, 0x4A, 0x46]);
        // SOF0: length 11, precision 8, height, width, 1 component
        data.extend_from_slice(&[0xFF, 0xC0, 0x00, 0x0B, 0x08]);
        data.extend_from_slice(&height.to_be_bytes());
        data.extend_from_slice(&width.to_be_bytes());
        data.extend_from_slice(&[0x01, 0x01, 0x11, 0x00]);
        data.extend_from_slice(&[0xFF, 0xD9]);
        data
    }

    #[test]
    fn jpeg_dimensions_reads_sof() {
        assert_eq!(jpeg_dimensions(&tiny_jpeg(640, 480)), Some((640, 480)));
    }

    #[test]
    fn jpeg_dimensions_rejects_non_jpeg() {
        assert_eq!(jpeg_dimensions(b"PNG not jpeg"), None);
        assert_eq!(jpeg_dimensions(&[]), None);
    }
}
