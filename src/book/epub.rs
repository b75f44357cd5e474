//! EPUB 3 assembly
//!
//! Packs story metadata, the cover, and the ordered chapters into an EPUB
//! container (a constrained ZIP archive). Output is deterministic for
//! identical inputs: entry order is fixed and every entry carries a pinned
//! modification time, so the same story always produces byte-identical
//! archives.

use std::io::{Cursor, Write};
use std::sync::Arc;

use async_trait::async_trait;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::BookBuilder;
use super::images::image_sources;
use crate::client::ContentClient;
use crate::error::{Error, Result};
use crate::types::{FetchedChapter, Story};
use crate::utils::html_escape;

struct Chapter {
    title: String,
    file_name: String,
    html: String,
}

/// EPUB variant of the book builder.
pub struct EpubBuilder {
    story: Story,
    cover: Vec<u8>,
    client: Arc<dyn ContentClient>,
    chapters: Vec<Chapter>,
    /// (archive path, bytes) for fetched inline images
    images: Vec<(String, Vec<u8>)>,
}

impl EpubBuilder {
    /// Create a builder for `story` with the already-fetched cover bytes.
    pub fn new(story: Story, cover: Vec<u8>, client: Arc<dyn ContentClient>) -> Self {
        Self {
            story,
            cover,
            client,
            chapters: Vec::new(),
            images: Vec::new(),
        }
    }

    fn content_opf(&self) -> String {
        let story = &self.story;
        let mut manifest = String::from(
            "    <item id=\"cover-image\" href=\"cover.jpg\" media-type=\"image/jpeg\" \
             properties=\"cover-image\"/>\n    <item id=\"titlepage\" href=\"titlepage.xhtml\" \
             media-type=\"application/xhtml+xml\"/>\n    <item id=\"nav\" href=\"nav.xhtml\" \
             media-type=\"application/xhtml+xml\" properties=\"nav\"/>\n",
        );
        let mut spine = String::from("    <itemref idref=\"titlepage\"/>\n");
        for (index, chapter) in self.chapters.iter().enumerate() {
            manifest.push_str(&format!(
                "    <item id=\"c{index}\" href=\"{}\" media-type=\"application/xhtml+xml\"/>\n",
                chapter.file_name
            ));
            spine.push_str(&format!("    <itemref idref=\"c{index}\"/>\n"));
        }
        for (index, (path, _)) in self.images.iter().enumerate() {
            let href = path.trim_start_matches("OEBPS/");
            manifest.push_str(&format!(
                "    <item id=\"img{index}\" href=\"{href}\" media-type=\"image/jpeg\"/>\n"
            ));
        }

        format!(
            "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n\
             <package xmlns=\"http://www.idpf.org/2007/opf\" version=\"3.0\" \
             unique-identifier=\"id\">\n\
             \x20 <metadata xmlns:dc=\"http://purl.org/dc/elements/1.1/\">\n\
             \x20   <dc:identifier id=\"id\">{id}</dc:identifier>\n\
             \x20   <dc:title>{title}</dc:title>\n\
             \x20   <dc:creator>{creator}</dc:creator>\n\
             \x20   <dc:description>{description}</dc:description>\n\
             \x20   <dc:language>{language}</dc:language>\n\
             \x20   <dc:date>{created}</dc:date>\n\
             \x20   <meta property=\"dcterms:modified\">{modified}</meta>\n\
             \x20   <meta name=\"tags\" content=\"{tags}\"/>\n\
             \x20   <meta name=\"mature\" content=\"{mature}\"/>\n\
             \x20   <meta name=\"completed\" content=\"{completed}\"/>\n\
             \x20   <meta name=\"cover\" content=\"cover-image\"/>\n\
             \x20 </metadata>\n\
             \x20 <manifest>\n{manifest}  </manifest>\n\
             \x20 <spine>\n{spine}  </spine>\n\
             </package>\n",
            id = html_escape(&story.id),
            title = html_escape(&story.title),
            creator = html_escape(&story.user.username),
            description = html_escape(&story.description),
            language = html_escape(&story.language.name),
            created = story.create_date.format("%Y-%m-%dT%H:%M:%SZ"),
            modified = story.modify_date.format("%Y-%m-%dT%H:%M:%SZ"),
            tags = html_escape(&story.tags.join(", ")),
            mature = u8::from(story.mature),
            completed = u8::from(story.completed),
        )
    }

    fn nav_xhtml(&self) -> String {
        let mut entries = String::new();
        for chapter in &self.chapters {
            entries.push_str(&format!(
                "      <li><a href=\"{}\">{}</a></li>\n",
                chapter.file_name,
                html_escape(&chapter.title)
            ));
        }
        format!(
            "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n\
             <html xmlns=\"http://www.w3.org/1999/xhtml\" \
             xmlns:epub=\"http://www.idpf.org/2007/ops\">\n\
             <head><title>{title}</title></head>\n\
             <body>\n  <nav epub:type=\"toc\">\n    <ol>\n{entries}    </ol>\n  </nav>\n\
             </body>\n</html>\n",
            title = html_escape(&self.story.title),
        )
    }

    fn chapter_xhtml(chapter: &Chapter) -> String {
        format!(
            "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n\
             <html xmlns=\"http://www.w3.org/1999/xhtml\">\n\
             <head><title>{title}</title></head>\n\
             <body>\n{body}\n</body>\n</html>\n",
            title = html_escape(&chapter.title),
            body = chapter.html,
        )
    }
}

const CONTAINER_XML: &str = "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n\
    <container version=\"1.0\" xmlns=\"urn:oasis:names:tc:opendocument:xmlns:container\">\n\
    \x20 <rootfiles>\n\
    \x20   <rootfile full-path=\"OEBPS/content.opf\" \
    media-type=\"application/oebps-package+xml\"/>\n\
    \x20 </rootfiles>\n\
    </container>\n";

const TITLEPAGE_XHTML: &str = "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n\
    <html xmlns=\"http://www.w3.org/1999/xhtml\">\n\
    <head><title>Cover</title></head>\n\
    <body><img src=\"cover.jpg\" alt=\"Cover\"/></body>\n</html>\n";

#[async_trait]
impl BookBuilder for EpubBuilder {
    async fn add_chapter(&mut self, chapter: &FetchedChapter, include_images: bool) -> Result<()> {
        let index = self.chapters.len();
        let mut html = chapter.html.clone();

        if include_images {
            for (image_index, source) in image_sources(&html).into_iter().enumerate() {
                let bytes = self
                    .client
                    .fetch_image(&source)
                    .await
                    .map_err(|e| Error::Build(format!("inline image fetch: {e}")))?;
                let packed = format!("static/{index}/{image_index}.jpeg");
                html = html.replace(&source, &packed);
                self.images.push((format!("OEBPS/{packed}"), bytes));
            }
        }

        // File names are positional rather than title-derived: slugs of
        // non-Latin titles collapse to the same (empty) name and would
        // overwrite each other.
        self.chapters.push(Chapter {
            title: chapter.title.clone(),
            file_name: format!("{index}.xhtml"),
            html,
        });
        Ok(())
    }

    fn finalize(self: Box<Self>) -> Result<Vec<u8>> {
        let pack = |e: zip::result::ZipError| Error::Build(format!("epub container: {e}"));

        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        // Pinned mtimes keep the archive deterministic for identical inputs
        let stored = FileOptions::default()
            .compression_method(CompressionMethod::Stored)
            .last_modified_time(zip::DateTime::default());
        let deflated = FileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .last_modified_time(zip::DateTime::default());

        // The mimetype entry must come first and uncompressed
        zip.start_file("mimetype", stored).map_err(pack)?;
        zip.write_all(b"application/epub+zip")?;

        zip.start_file("META-INF/container.xml", deflated)
            .map_err(pack)?;
        zip.write_all(CONTAINER_XML.as_bytes())?;

        zip.start_file("OEBPS/content.opf", deflated).map_err(pack)?;
        zip.write_all(self.content_opf().as_bytes())?;

        zip.start_file("OEBPS/nav.xhtml", deflated).map_err(pack)?;
        zip.write_all(self.nav_xhtml().as_bytes())?;

        zip.start_file("OEBPS/titlepage.xhtml", deflated)
            .map_err(pack)?;
        zip.write_all(TITLEPAGE_XHTML.as_bytes())?;

        zip.start_file("OEBPS/cover.jpg", deflated).map_err(pack)?;
        zip.write_all(&self.cover)?;

        for chapter in &self.chapters {
            zip.start_file(format!("OEBPS/{}", chapter.file_name), deflated)
                .map_err(pack)?;
            zip.write_all(Self::chapter_xhtml(chapter).as_bytes())?;
        }

        for (path, bytes) in &self.images {
            zip.start_file(path.clone(), deflated).map_err(pack)?;
            zip.write_all(bytes)?;
        }

        let cursor = zip.finish().map_err(pack)?;
        Ok(cursor.into_inner())
    }
}
