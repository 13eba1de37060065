//! Page-aware text extraction.

use std::sync::Arc;

use lexsight_core::{DocumentInput, ExtractedContent, ExtractionError, PageText};
use once_cell::sync::{Lazy, OnceCell};
use regex::Regex;
use tracing::{debug, info, warn};

use crate::file::FileType;
use crate::pdf::{LopdfBackend, PdfBackend};

static INLINE_WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t\u{a0}]+").unwrap());

/// Extracts normalized text from PDFs and plain-text documents.
///
/// Cheap to clone; clones share the backend and its one-time
/// initialization.
#[derive(Clone)]
pub struct TextExtractor {
    backend: Arc<dyn PdfBackend>,
    init: Arc<OnceCell<Result<(), String>>>,
}

impl Default for TextExtractor {
    fn default() -> Self {
        Self::new(Arc::new(LopdfBackend::new()))
    }
}

impl TextExtractor {
    pub fn new(backend: Arc<dyn PdfBackend>) -> Self {
        Self {
            backend,
            init: Arc::new(OnceCell::new()),
        }
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// Extract text, running PDF parsing on the blocking thread pool.
    pub async fn extract(&self, doc: &DocumentInput) -> Result<ExtractedContent, ExtractionError> {
        if FileType::detect(doc) != FileType::Pdf {
            return self.extract_blocking(doc);
        }
        let extractor = self.clone();
        let doc = doc.clone();
        tokio::task::spawn_blocking(move || extractor.extract_blocking(&doc))
            .await
            .map_err(|e| ExtractionError::Pdf(format!("extraction task failed: {}", e)))?
    }

    /// Synchronous extraction for callers already off the async runtime.
    pub fn extract_blocking(&self, doc: &DocumentInput) -> Result<ExtractedContent, ExtractionError> {
        match FileType::detect(doc) {
            FileType::Pdf => self.extract_pdf(doc),
            FileType::PlainText => extract_plain_text(doc),
            FileType::Unknown => Err(ExtractionError::UnsupportedFileType(format!(
                "{} ({})",
                doc.name, doc.mime_type
            ))),
        }
    }

    fn ensure_initialized(&self) -> Result<(), ExtractionError> {
        let outcome = self.init.get_or_init(|| {
            info!("Initializing PDF backend: {}", self.backend.name());
            self.backend.initialize().map_err(|e| match e {
                ExtractionError::WorkerConfiguration(reason) => reason,
                other => other.to_string(),
            })
        });
        outcome
            .clone()
            .map_err(ExtractionError::WorkerConfiguration)
    }

    fn extract_pdf(&self, doc: &DocumentInput) -> Result<ExtractedContent, ExtractionError> {
        self.ensure_initialized()?;

        info!("Extracting PDF: {} ({} bytes)", doc.name, doc.bytes.len());
        let pdf = self.backend.open(&doc.bytes)?;
        let total_pages = pdf.page_count();

        let mut page_texts = Vec::with_capacity(total_pages as usize);
        let mut full_text = String::new();

        for page_number in 1..=total_pages {
            match pdf.page_text(page_number) {
                Ok(raw) => {
                    let text = normalize_page_text(&raw);
                    debug!("Page {}: {} chars", page_number, text.len());
                    if !text.is_empty() {
                        full_text.push_str(&format!("\n\n--- Page {} ---\n{}", page_number, text));
                    }
                    page_texts.push(PageText::new(page_number, text));
                }
                Err(e) => {
                    warn!("Page {} of {} failed: {}", page_number, doc.name, e);
                    page_texts.push(PageText::failed(page_number, &e.to_string()));
                }
            }
        }

        let full_text = full_text.trim().to_string();
        if full_text.is_empty() {
            if pdf.is_encrypted() {
                return Err(ExtractionError::EncryptedOrPasswordProtected);
            }
            return Err(ExtractionError::EmptyContent);
        }

        info!(
            "Extracted {} chars from {} pages of {}",
            full_text.len(),
            total_pages,
            doc.name
        );

        Ok(ExtractedContent {
            full_text,
            page_texts,
            total_pages,
            file_name: doc.name.clone(),
        })
    }
}

fn extract_plain_text(doc: &DocumentInput) -> Result<ExtractedContent, ExtractionError> {
    let text = String::from_utf8_lossy(&doc.bytes).into_owned();
    if text.trim().is_empty() {
        return Err(ExtractionError::EmptyContent);
    }
    debug!("Plain text {}: {} chars", doc.name, text.len());
    Ok(ExtractedContent {
        page_texts: vec![PageText::new(1, text.clone())],
        full_text: text,
        total_pages: 1,
        file_name: doc.name.clone(),
    })
}

/// Collapse runs of inline whitespace and drop blank lines.
fn normalize_page_text(raw: &str) -> String {
    raw.lines()
        .map(|line| INLINE_WHITESPACE.replace_all(line.trim(), " "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::PdfDocument;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Backend serving canned pages; `None` pages fail.
    struct FakeBackend {
        pages: Vec<Option<&'static str>>,
        init_ok: bool,
        init_calls: AtomicUsize,
        encrypted: bool,
    }

    impl FakeBackend {
        fn with_pages(pages: Vec<Option<&'static str>>) -> Self {
            Self {
                pages,
                init_ok: true,
                init_calls: AtomicUsize::new(0),
                encrypted: false,
            }
        }
    }

    struct FakeDocument {
        pages: Vec<Option<&'static str>>,
        encrypted: bool,
    }

    impl PdfDocument for FakeDocument {
        fn page_count(&self) -> u32 {
            self.pages.len() as u32
        }

        fn page_text(&self, page_number: u32) -> Result<String, ExtractionError> {
            self.pages[(page_number - 1) as usize]
                .map(str::to_string)
                .ok_or_else(|| ExtractionError::Pdf("corrupt content stream".into()))
        }

        fn is_encrypted(&self) -> bool {
            self.encrypted
        }
    }

    impl PdfBackend for FakeBackend {
        fn name(&self) -> &str {
            "fake"
        }

        fn initialize(&self) -> Result<(), ExtractionError> {
            self.init_calls.fetch_add(1, Ordering::SeqCst);
            if self.init_ok {
                Ok(())
            } else {
                Err(ExtractionError::WorkerConfiguration("worker script missing".into()))
            }
        }

        fn open(&self, _bytes: &[u8]) -> Result<Box<dyn PdfDocument>, ExtractionError> {
            Ok(Box::new(FakeDocument {
                pages: self.pages.clone(),
                encrypted: self.encrypted,
            }))
        }
    }

    fn pdf(name: &str) -> DocumentInput {
        DocumentInput::new(name, "application/pdf", b"%PDF-1.4".to_vec())
    }

    #[test]
    fn test_plain_text_is_one_page() {
        let extractor = TextExtractor::default();
        let doc = DocumentInput::from_text("note.txt", "Hello world.");
        let content = extractor.extract_blocking(&doc).unwrap();
        assert_eq!(content.full_text, "Hello world.");
        assert_eq!(content.total_pages, 1);
        assert_eq!(content.page_texts.len(), 1);
        assert_eq!(content.page_texts[0].length, 12);
    }

    #[test]
    fn test_blank_text_is_empty_content() {
        let extractor = TextExtractor::default();
        let doc = DocumentInput::from_text("blank.txt", "  \n\t ");
        assert!(matches!(
            extractor.extract_blocking(&doc),
            Err(ExtractionError::EmptyContent)
        ));
    }

    #[test]
    fn test_unsupported_type() {
        let extractor = TextExtractor::default();
        let doc = DocumentInput::new("scan.png", "image/png", vec![0x89, 0x50]);
        assert!(matches!(
            extractor.extract_blocking(&doc),
            Err(ExtractionError::UnsupportedFileType(_))
        ));
    }

    #[test]
    fn test_failed_page_keeps_placeholder() {
        let backend = FakeBackend::with_pages(vec![
            Some("First   page\n\n  text"),
            None,
            Some("Third page"),
        ]);
        let extractor = TextExtractor::new(Arc::new(backend));
        let content = extractor.extract_blocking(&pdf("contract.pdf")).unwrap();

        assert_eq!(content.total_pages, 3);
        assert_eq!(content.page_texts.len(), 3);
        assert_eq!(content.page_texts[0].text, "First page\ntext");
        assert!(content.page_texts[1].is_placeholder());
        assert!(content.page_texts[1]
            .text
            .starts_with("[Page 2 - Text extraction failed:"));
        assert_eq!(
            content.full_text,
            "--- Page 1 ---\nFirst page\ntext\n\n--- Page 3 ---\nThird page"
        );
    }

    #[test]
    fn test_all_empty_pages_is_empty_content() {
        let backend = FakeBackend::with_pages(vec![Some("   "), Some("\n"), None]);
        let extractor = TextExtractor::new(Arc::new(backend));
        assert!(matches!(
            extractor.extract_blocking(&pdf("scan.pdf")),
            Err(ExtractionError::EmptyContent)
        ));
    }

    #[test]
    fn test_encrypted_without_text() {
        let mut backend = FakeBackend::with_pages(vec![Some("")]);
        backend.encrypted = true;
        let extractor = TextExtractor::new(Arc::new(backend));
        assert!(matches!(
            extractor.extract_blocking(&pdf("locked.pdf")),
            Err(ExtractionError::EncryptedOrPasswordProtected)
        ));
    }

    #[test]
    fn test_initialization_runs_once_and_failure_sticks() {
        let mut backend = FakeBackend::with_pages(vec![Some("text")]);
        backend.init_ok = false;
        let backend = Arc::new(backend);
        let extractor = TextExtractor::new(backend.clone());

        for _ in 0..2 {
            assert!(matches!(
                extractor.extract_blocking(&pdf("a.pdf")),
                Err(ExtractionError::WorkerConfiguration(_))
            ));
        }
        assert_eq!(backend.init_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_async_extract_uses_blocking_pool() {
        let backend = FakeBackend::with_pages(vec![Some("Body text")]);
        let extractor = TextExtractor::new(Arc::new(backend));
        let content = extractor.extract(&pdf("a.pdf")).await.unwrap();
        assert_eq!(content.file_name, "a.pdf");
        assert_eq!(content.page_texts[0].length, 9);
    }
}
