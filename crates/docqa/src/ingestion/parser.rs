//! Local text extraction for txt, pdf, and docx uploads

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::config::extension_of;
use crate::error::ExtractionError;
use crate::providers::{Extraction, Extractor};

/// Seconds one extraction may run before it is abandoned
pub const DEFAULT_EXTRACT_TIMEOUT_SECS: u64 = 60;

/// Extractor backed by pdf-extract, lopdf, and docx-rs
#[derive(Debug, Clone)]
pub struct LocalExtractor {
    timeout: Duration,
}

impl Default for LocalExtractor {
    fn default() -> Self {
        Self::with_timeout(Duration::from_secs(DEFAULT_EXTRACT_TIMEOUT_SECS))
    }
}

impl LocalExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// pdf-extract can hang on some embedded fonts, so every parse is bounded
    pub fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Extract from in-memory bytes, dispatching on the filename extension
    pub fn extract_bytes(filename: &str, data: &[u8]) -> Result<Extraction, ExtractionError> {
        let extension = extension_of(filename).unwrap_or_default();

        let parsed = match extension.as_str() {
            "txt" => parse_text(data),
            "pdf" => parse_pdf(data)?,
            "docx" => parse_docx(data)?,
            other => {
                return Err(ExtractionError::new(format!(
                    "Unsupported file format: .{}",
                    other
                )))
            }
        };

        finish(filename, parsed)
    }
}

#[async_trait]
impl Extractor for LocalExtractor {
    async fn extract(&self, path: &Path) -> Result<Extraction, ExtractionError> {
        let data: Arc<[u8]> = tokio::fs::read(path)
            .await
            .map_err(|e| ExtractionError::new(format!("Failed to read {}: {}", path.display(), e)))?
            .into();

        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        tracing::debug!("Extracting {} ({} bytes)", filename, data.len());

        let primary = {
            let (filename, data) = (filename.clone(), data.clone());
            move || Self::extract_bytes(&filename, &data)
        };
        if let Some(result) = run_bounded(self.timeout, primary).await {
            return result;
        }

        tracing::error!(
            "Extraction of {} timed out after {}s",
            filename,
            self.timeout.as_secs()
        );

        // The lopdf content-stream reader is usually much faster
        if extension_of(&filename).as_deref() == Some("pdf") {
            let fallback = {
                let filename = filename.clone();
                move || finish(&filename, parse_pdf_fallback(&data)?)
            };
            if let Some(result) = run_bounded(self.timeout, fallback).await {
                return result;
            }
        }

        Err(ExtractionError::new(format!(
            "Extraction of {} timed out after {}s",
            filename,
            self.timeout.as_secs()
        )))
    }

    fn name(&self) -> &str {
        "local"
    }
}

/// Run blocking parse work with a time limit; `None` when the limit elapsed.
///
/// A timed-out worker cannot be killed and keeps its blocking thread until it returns.
async fn run_bounded<T, F>(limit: Duration, work: F) -> Option<Result<T, ExtractionError>>
where
    F: FnOnce() -> Result<T, ExtractionError> + Send + 'static,
    T: Send + 'static,
{
    match tokio::time::timeout(limit, tokio::task::spawn_blocking(work)).await {
        Ok(Ok(result)) => Some(result),
        Ok(Err(e)) => Some(Err(ExtractionError::new(format!(
            "Extraction worker failed: {}",
            e
        )))),
        Err(_) => None,
    }
}

fn finish(
    filename: &str,
    (text, page_count, method): (String, u32, &'static str),
) -> Result<Extraction, ExtractionError> {
    if text.trim().is_empty() {
        return Err(ExtractionError::new(format!(
            "No text content could be extracted from {}",
            filename
        )));
    }

    Ok(Extraction {
        word_count: text.split_whitespace().count(),
        text,
        page_count,
        extraction_method: method.to_string(),
    })
}

/// Plain text; form feeds separate pages
fn parse_text(data: &[u8]) -> (String, u32, &'static str) {
    let text = String::from_utf8_lossy(data).into_owned();
    let pages = text.matches('\u{000C}').count() as u32 + 1;
    (text, pages, "plain-text")
}

#[cfg(feature = "pdf")]
fn parse_pdf(data: &[u8]) -> Result<(String, u32, &'static str), ExtractionError> {
    let page_count = pdf_page_count(data);

    match pdf_extract::extract_text_from_mem(data) {
        Ok(text) if !text.trim().is_empty() => Ok((clean_pdf_text(&text), page_count, "pdf-extract")),
        Ok(_) => {
            tracing::warn!("pdf-extract returned no text, trying content-stream fallback");
            Ok((extract_pdf_fallback(data)?, page_count, "lopdf-fallback"))
        }
        Err(e) => {
            tracing::warn!("pdf-extract failed: {}, trying content-stream fallback", e);
            Ok((extract_pdf_fallback(data)?, page_count, "lopdf-fallback"))
        }
    }
}

#[cfg(feature = "pdf")]
fn parse_pdf_fallback(data: &[u8]) -> Result<(String, u32, &'static str), ExtractionError> {
    Ok((extract_pdf_fallback(data)?, pdf_page_count(data), "lopdf-fallback"))
}

#[cfg(feature = "pdf")]
fn pdf_page_count(data: &[u8]) -> u32 {
    match lopdf::Document::load_mem(data) {
        Ok(doc) => doc.get_pages().len() as u32,
        Err(e) => {
            tracing::debug!("lopdf could not count pages: {}", e);
            1
        }
    }
}

#[cfg(not(feature = "pdf"))]
fn parse_pdf(_data: &[u8]) -> Result<(String, u32, &'static str), ExtractionError> {
    Err(ExtractionError::new("PDF support is not enabled"))
}

#[cfg(not(feature = "pdf"))]
fn parse_pdf_fallback(data: &[u8]) -> Result<(String, u32, &'static str), ExtractionError> {
    parse_pdf(data)
}

/// Drop null bytes and blank lines left by PDF layout
#[cfg(feature = "pdf")]
fn clean_pdf_text(text: &str) -> String {
    text.replace('\0', "")
        .replace('\u{00A0}', " ")
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Pull string operands of `Tj`/`TJ` operators out of each page's content stream
#[cfg(feature = "pdf")]
fn extract_pdf_fallback(data: &[u8]) -> Result<String, ExtractionError> {
    let doc = lopdf::Document::load_mem(data)
        .map_err(|e| ExtractionError::new(format!("Failed to load PDF: {}", e)))?;

    let mut all_text = String::new();
    for (page_num, page_id) in doc.get_pages() {
        match doc.get_page_content(page_id) {
            Ok(content) => {
                let text = text_from_content_stream(&content);
                if !text.is_empty() {
                    all_text.push_str(&text);
                    all_text.push('\n');
                }
            }
            Err(e) => tracing::debug!("Could not get content for page {}: {}", page_num, e),
        }
    }

    if all_text.trim().is_empty() {
        return Err(ExtractionError::new(
            "PDF appears to be image-based or has no extractable text",
        ));
    }
    Ok(all_text)
}

#[cfg(feature = "pdf")]
fn text_from_content_stream(content: &[u8]) -> String {
    let content = String::from_utf8_lossy(content);
    let mut text = String::new();
    let mut in_text_block = false;

    for line in content.lines().map(str::trim) {
        match line {
            "BT" => in_text_block = true,
            "ET" => {
                in_text_block = false;
                text.push(' ');
            }
            _ if in_text_block && (line.ends_with("Tj") || line.ends_with("TJ")) => {
                if let (Some(start), Some(end)) = (line.find('('), line.rfind(')')) {
                    if start < end {
                        text.push_str(
                            &line[start + 1..end]
                                .replace("\\(", "(")
                                .replace("\\)", ")")
                                .replace("\\\\", "\\"),
                        );
                    }
                }
            }
            _ => {}
        }
    }

    text.trim().to_string()
}

/// Paragraph runs, one paragraph per line. DOCX carries no reliable page
/// layout, so it counts as a single page.
#[cfg(feature = "docx")]
fn parse_docx(data: &[u8]) -> Result<(String, u32, &'static str), ExtractionError> {
    use docx_rs::{DocumentChild, ParagraphChild, RunChild};

    let doc = docx_rs::read_docx(data)
        .map_err(|e| ExtractionError::new(format!("Failed to read DOCX: {}", e)))?;

    let mut text = String::new();
    for child in doc.document.children {
        if let DocumentChild::Paragraph(p) = child {
            for child in p.children {
                if let ParagraphChild::Run(run) = child {
                    for child in run.children {
                        if let RunChild::Text(t) = child {
                            text.push_str(&t.text);
                        }
                    }
                }
            }
            text.push('\n');
        }
    }

    Ok((text, 1, "docx"))
}

#[cfg(not(feature = "docx"))]
fn parse_docx(_data: &[u8]) -> Result<(String, u32, &'static str), ExtractionError> {
    Err(ExtractionError::new("DOCX support is not enabled"))
}

/// SHA-256 of the extracted text, lowercase hex
pub fn hash_content(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_pages_split_on_form_feed() {
        let data = "Page one words.\u{000C}Page two words.\u{000C}Page three.";
        let extraction = LocalExtractor::extract_bytes("notes.txt", data.as_bytes()).unwrap();
        assert_eq!(extraction.page_count, 3);
        assert_eq!(extraction.word_count, 8);
        assert_eq!(extraction.extraction_method, "plain-text");
    }

    #[test]
    fn test_blank_text_is_an_extraction_error() {
        let err = LocalExtractor::extract_bytes("empty.txt", b"  \n\t ").unwrap_err();
        assert!(err.message.contains("No text content"));
    }

    #[test]
    fn test_unknown_extension_is_rejected() {
        tokio_test::assert_err!(LocalExtractor::extract_bytes("tool.exe", b"MZ"));
    }

    #[cfg(feature = "pdf")]
    #[test]
    fn test_garbage_pdf_fails_cleanly() {
        tokio_test::assert_err!(LocalExtractor::extract_bytes("broken.pdf", b"not a pdf"));
    }

    #[tokio::test]
    async fn test_extract_reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("manual.txt");
        std::fs::write(&path, "Press the red button to start.").unwrap();

        let extraction = LocalExtractor::new().extract(&path).await.unwrap();
        assert_eq!(extraction.word_count, 6);
        assert_eq!(extraction.page_count, 1);
    }

    #[tokio::test]
    async fn test_missing_file_is_an_extraction_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = LocalExtractor::new()
            .extract(&dir.path().join("gone.txt"))
            .await
            .unwrap_err();
        assert!(err.message.starts_with("Failed to read"));
    }

    #[tokio::test]
    async fn test_bounded_work_returns_its_result() {
        let result = run_bounded(Duration::from_secs(5), || Ok::<_, ExtractionError>(7)).await;
        assert_eq!(result, Some(Ok(7)));
    }

    #[tokio::test]
    async fn test_bounded_work_gives_up_after_limit() {
        let result = run_bounded(Duration::from_millis(20), || {
            std::thread::sleep(Duration::from_millis(500));
            Ok::<_, ExtractionError>(())
        })
        .await;
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_panicking_parser_is_an_extraction_error() {
        let result = run_bounded(Duration::from_secs(5), || -> Result<(), ExtractionError> {
            panic!("bad font table")
        })
        .await;
        let err = result.unwrap().unwrap_err();
        assert!(err.message.starts_with("Extraction worker failed"));
    }

    #[test]
    fn test_hash_is_stable_hex() {
        let hash = hash_content("abc");
        assert_eq!(
            hash,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
