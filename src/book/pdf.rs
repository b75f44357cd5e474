//! PDF assembly
//!
//! Renders story chapters as paginated text with a cover page, serialized as
//! a self-contained PDF 1.4 document. Chapter HTML is flattened to
//! paragraphs; when images are requested they are embedded as DCT (JPEG)
//! XObjects on their own pages after the chapter that referenced them.
//!
//! The writer is single-pass and deterministic: object numbering, stream
//! contents, and the cross-reference table depend only on the input story,
//! so identical inputs serialize to identical bytes.

use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use regex::Regex;

use super::BookBuilder;
use super::images::{image_sources, jpeg_dimensions};
use crate::client::ContentClient;
use crate::error::{Error, Result};
use crate::types::{FetchedChapter, Story};

const PAGE_WIDTH: f32 = 595.0;
const PAGE_HEIGHT: f32 = 842.0;
const MARGIN: f32 = 50.0;
const FONT_SIZE: u32 = 11;
const LEADING: u32 = 14;
const MAX_LINE_CHARS: usize = 90;
const LINES_PER_PAGE: usize = 52;

/// Fallback cover dimensions when the JPEG header cannot be parsed
/// (matches the 993x1404 full-page cover the reference artwork uses).
const FALLBACK_COVER_DIMENSIONS: (u32, u32) = (993, 1404);

fn block_breaks() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // Panic-free: the pattern is a literal and always compiles
    RE.get_or_init(|| {
        Regex::new(r"(?i)</p>|</h[1-6]>|</div>|</li>|<br\s*/?>").unwrap_or_else(|_| unreachable!())
    })
}

fn any_tag() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<[^>]*>").unwrap_or_else(|_| unreachable!()))
}

/// Flatten chapter HTML into trimmed, non-empty paragraphs.
fn html_to_paragraphs(html: &str) -> Vec<String> {
    let with_breaks = block_breaks().replace_all(html, "\n");
    let stripped = any_tag().replace_all(&with_breaks, "");
    let decoded = stripped
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&");
    decoded
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Greedy word wrap; overlong single words keep their own line.
fn wrap(paragraph: &str) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in paragraph.split_whitespace() {
        if current.is_empty() {
            current = word.to_string();
        } else if current.len() + 1 + word.len() <= MAX_LINE_CHARS {
            current.push(' ');
            current.push_str(word);
        } else {
            lines.push(std::mem::take(&mut current));
            current = word.to_string();
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Escape text for a PDF literal string, Latin-1 coded; characters outside
/// Latin-1 degrade to '?'.
fn pdf_text(value: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '(' | ')' | '\\' => {
                out.push(b'\\');
                out.push(c as u8);
            }
            '\n' | '\r' => out.push(b' '),
            c if (c as u32) <= 0xFF => out.push(c as u8),
            _ => out.push(b'?'),
        }
    }
    out
}

struct PdfChapter {
    lines: Vec<String>,
    images: Vec<Vec<u8>>,
}

/// PDF variant of the book builder.
pub struct PdfBuilder {
    story: Story,
    cover: Vec<u8>,
    client: Arc<dyn ContentClient>,
    chapters: Vec<PdfChapter>,
}

impl PdfBuilder {
    /// Create a builder for `story` with the already-fetched cover bytes.
    pub fn new(story: Story, cover: Vec<u8>, client: Arc<dyn ContentClient>) -> Self {
        Self {
            story,
            cover,
            client,
            chapters: Vec::new(),
        }
    }
}

#[async_trait]
impl BookBuilder for PdfBuilder {
    async fn add_chapter(&mut self, chapter: &FetchedChapter, include_images: bool) -> Result<()> {
        let mut lines = Vec::new();
        for paragraph in html_to_paragraphs(&chapter.html) {
            lines.extend(wrap(&paragraph));
            // Blank separator line between paragraphs
            lines.push(String::new());
        }

        let mut images = Vec::new();
        if include_images {
            for source in image_sources(&chapter.html) {
                let bytes = self
                    .client
                    .fetch_image(&source)
                    .await
                    .map_err(|e| Error::Build(format!("inline image fetch: {e}")))?;
                images.push(bytes);
            }
        }

        self.chapters.push(PdfChapter { lines, images });
        Ok(())
    }

    fn finalize(self: Box<Self>) -> Result<Vec<u8>> {
        let mut doc = Document::new();
        // Fixed ids: 1 = catalog, 2 = page tree (patched last), 3 = font
        doc.add(b"<< /Type /Catalog /Pages 2 0 R >>".to_vec());
        let pages_slot = doc.add(Vec::new());
        doc.add(b"<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>".to_vec());

        let mut page_ids = Vec::new();
        page_ids.push(doc.add_image_page(&self.cover));

        for chapter in &self.chapters {
            for page_lines in chapter.lines.chunks(LINES_PER_PAGE) {
                page_ids.push(doc.add_text_page(page_lines));
            }
            for image in &chapter.images {
                page_ids.push(doc.add_image_page(image));
            }
        }

        let kids: Vec<String> = page_ids.iter().map(|id| format!("{id} 0 R")).collect();
        doc.patch(
            pages_slot,
            format!(
                "<< /Type /Pages /Kids [{}] /Count {} >>",
                kids.join(" "),
                page_ids.len()
            )
            .into_bytes(),
        );

        let info_id = doc.add_info(&self.story);
        Ok(doc.serialize(info_id))
    }
}

/// Accumulates numbered PDF objects and serializes the final document.
struct Document {
    bodies: Vec<Vec<u8>>,
}

impl Document {
    fn new() -> Self {
        Self { bodies: Vec::new() }
    }

    /// Append an object body; returns its object id.
    fn add(&mut self, body: Vec<u8>) -> usize {
        self.bodies.push(body);
        self.bodies.len()
    }

    /// Replace a previously-reserved object body.
    fn patch(&mut self, id: usize, body: Vec<u8>) {
        if let Some(slot) = self.bodies.get_mut(id - 1) {
            *slot = body;
        }
    }

    fn add_stream(&mut self, data: Vec<u8>) -> usize {
        let mut body = format!("<< /Length {} >>\nstream\n", data.len()).into_bytes();
        body.extend_from_slice(&data);
        body.extend_from_slice(b"\nendstream");
        self.add(body)
    }

    fn add_text_page(&mut self, lines: &[String]) -> usize {
        let mut content = format!(
            "BT\n/F1 {FONT_SIZE} Tf\n{LEADING} TL\n{MARGIN} {} Td\n",
            PAGE_HEIGHT - MARGIN
        )
        .into_bytes();
        for line in lines {
            content.push(b'(');
            content.extend_from_slice(&pdf_text(line));
            content.extend_from_slice(b") Tj\nT*\n");
        }
        content.extend_from_slice(b"ET");

        let content_id = self.add_stream(content);
        self.add(
            format!(
                "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {PAGE_WIDTH} {PAGE_HEIGHT}] \
                 /Resources << /Font << /F1 3 0 R >> >> /Contents {content_id} 0 R >>"
            )
            .into_bytes(),
        )
    }

    fn add_image_page(&mut self, jpeg: &[u8]) -> usize {
        let (width, height) = jpeg_dimensions(jpeg).unwrap_or(FALLBACK_COVER_DIMENSIONS);

        let mut xobject = format!(
            "<< /Type /XObject /Subtype /Image /Width {width} /Height {height} \
             /ColorSpace /DeviceRGB /BitsPerComponent 8 /Filter /DCTDecode /Length {} >>\nstream\n",
            jpeg.len()
        )
        .into_bytes();
        xobject.extend_from_slice(jpeg);
        xobject.extend_from_slice(b"\nendstream");
        let image_id = self.add(xobject);

        // Scale to fit the page, centered
        let scale = (PAGE_WIDTH / width as f32).min(PAGE_HEIGHT / height as f32);
        let draw_width = width as f32 * scale;
        let draw_height = height as f32 * scale;
        let x = (PAGE_WIDTH - draw_width) / 2.0;
        let y = (PAGE_HEIGHT - draw_height) / 2.0;
        let content = format!(
            "q\n{draw_width:.2} 0 0 {draw_height:.2} {x:.2} {y:.2} cm\n/Im{image_id} Do\nQ"
        )
        .into_bytes();
        let content_id = self.add_stream(content);

        self.add(
            format!(
                "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {PAGE_WIDTH} {PAGE_HEIGHT}] \
                 /Resources << /XObject << /Im{image_id} {image_id} 0 R >> >> \
                 /Contents {content_id} 0 R >>"
            )
            .into_bytes(),
        )
    }

    fn add_info(&mut self, story: &Story) -> usize {
        let mut body = Vec::new();
        let mut field = |name: &str, value: &str| {
            body.extend_from_slice(format!("/{name} (").as_bytes());
            body.extend_from_slice(&pdf_text(value));
            body.extend_from_slice(b")\n");
        };
        field("Title", &story.title);
        field("Author", &story.user.username);
        field("Subject", story.description.trim());
        field("Keywords", &story.tags.join(","));
        field("Language", &story.language.name);
        field("Completed", if story.completed { "true" } else { "false" });
        field("MatureContent", if story.mature { "true" } else { "false" });
        field(
            "CreationDate",
            &story.create_date.format("D:%Y%m%d%H%M%SZ").to_string(),
        );
        field(
            "ModDate",
            &story.modify_date.format("D:%Y%m%d%H%M%SZ").to_string(),
        );
        field("Producer", "wattpad-dl");

        let mut wrapped = b"<<\n".to_vec();
        wrapped.extend_from_slice(&body);
        wrapped.extend_from_slice(b">>");
        self.add(wrapped)
    }

    /// Emit header, objects, xref table, and trailer.
    fn serialize(self, info_id: usize) -> Vec<u8> {
        let mut out = b"%PDF-1.4\n%\xE2\xE3\xCF\xD3\n".to_vec();
        let mut offsets = Vec::with_capacity(self.bodies.len());

        for (index, body) in self.bodies.iter().enumerate() {
            offsets.push(out.len());
            out.extend_from_slice(format!("{} 0 obj\n", index + 1).as_bytes());
            out.extend_from_slice(body);
            out.extend_from_slice(b"\nendobj\n");
        }

        let xref_offset = out.len();
        out.extend_from_slice(format!("xref\n0 {}\n", self.bodies.len() + 1).as_bytes());
        out.extend_from_slice(b"0000000000 65535 f \n");
        for offset in offsets {
            out.extend_from_slice(format!("{offset:010} 00000 n \n").as_bytes());
        }
        out.extend_from_slice(
            format!(
                "trailer\n<< /Size {} /Root 1 0 R /Info {info_id} 0 R >>\nstartxref\n{xref_offset}\n%%EOF\n",
                self.bodies.len() + 1
            )
            .as_bytes(),
        );
        out
    }
}
