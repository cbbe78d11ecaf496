//! Plain-text extraction for uploaded study documents.
//!
//! Only PDF and DOCX are understood. Both parsers are blocking, so they run on
//! the blocking pool and hand back a single awaited result.

use std::{
    fs,
    io::Read,
    path::{Path, PathBuf},
};

use anyhow::{Context, anyhow};
use pdf_extract::extract_text_from_mem as extract_pdf_text;
use quick_xml::{Reader as XmlReader, events::Event};
use tokio::task;
use zip::ZipArchive;

/// Summaries are built from at most this many characters of document text.
pub const MAX_SUMMARY_CHARS: usize = 10_000;

#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("unsupported document extension `{0}`")]
    UnsupportedFormat(String),

    #[error("failed to read upload: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to extract PDF text: {0}")]
    Pdf(String),

    #[error("failed to extract DOCX text: {0:#}")]
    Docx(anyhow::Error),

    #[error("failed to parse DOCX: document contains no text")]
    EmptyDocx,

    #[error("extraction worker failed: {0}")]
    Worker(String),
}

/// Supported upload formats, keyed by lower-cased extension.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum DocumentKind {
    Pdf,
    Docx,
}

impl DocumentKind {
    pub fn from_extension(extension: &str) -> Result<Self, DocumentError> {
        match extension {
            "pdf" => Ok(DocumentKind::Pdf),
            "docx" => Ok(DocumentKind::Docx),
            "" => Err(DocumentError::UnsupportedFormat("(none)".to_string())),
            other => Err(DocumentError::UnsupportedFormat(other.to_string())),
        }
    }
}

/// Lower-cased extension of an uploaded filename, empty when there is none.
pub fn extension_of(filename: &str) -> String {
    Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_default()
}

/// Extract text from the file at `path`, dispatching on the original name's extension.
///
/// Unsupported extensions fail before any parser touches the file.
pub async fn extract_text(path: &Path, original_name: &str) -> Result<String, DocumentError> {
    let kind = DocumentKind::from_extension(&extension_of(original_name))?;

    match kind {
        DocumentKind::Pdf => {
            let bytes = tokio::fs::read(path).await?;
            task::spawn_blocking(move || extract_pdf_text(&bytes))
                .await
                .map_err(|err| DocumentError::Worker(err.to_string()))?
                .map_err(|err| DocumentError::Pdf(err.to_string()))
        }
        DocumentKind::Docx => {
            let path: PathBuf = path.to_path_buf();
            let text = task::spawn_blocking(move || extract_docx_text(&path))
                .await
                .map_err(|err| DocumentError::Worker(err.to_string()))?
                .map_err(DocumentError::Docx)?;
            if text.is_empty() {
                return Err(DocumentError::EmptyDocx);
            }
            Ok(text)
        }
    }
}

/// Keep the first `max_chars` characters of `text`.
pub fn truncate(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

fn extract_docx_text(path: &Path) -> anyhow::Result<String> {
    let file = fs::File::open(path)
        .with_context(|| format!("failed to open DOCX file {}", path.display()))?;
    let mut archive = ZipArchive::new(file)
        .with_context(|| format!("failed to open DOCX archive {}", path.display()))?;

    let mut document = archive
        .by_name("word/document.xml")
        .with_context(|| format!("missing word/document.xml in {}", path.display()))?;

    let mut xml = String::new();
    document
        .read_to_string(&mut xml)
        .with_context(|| format!("failed to read DOCX XML for {}", path.display()))?;

    let mut reader = XmlReader::from_str(&xml);
    let mut buf = Vec::new();
    let mut output = String::new();
    let mut in_text_node = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) if e.name().as_ref() == b"w:t" => in_text_node = true,
            // Self-closing `<w:p/>` still marks a paragraph break.
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => match e.name().as_ref() {
                b"w:p" if !output.is_empty() => output.push_str("\n\n"),
                b"w:tab" => output.push('\t'),
                b"w:br" => output.push('\n'),
                _ => {}
            },
            Ok(Event::Text(e)) if in_text_node => {
                output.push_str(&e.unescape().map_err(|err| anyhow!(err))?);
            }
            Ok(Event::End(ref e)) if e.name().as_ref() == b"w:t" => in_text_node = false,
            Ok(Event::Eof) => break,
            Err(err) => return Err(anyhow!("failed to parse DOCX XML: {err}")),
            _ => {}
        }
        buf.clear();
    }

    Ok(output.trim().to_string())
}
