//! PDF parsing backends.
//!
//! The extractor only talks to [`PdfBackend`], so a different parser (or a
//! test double) can be swapped in without touching page assembly.

use lexsight_core::ExtractionError;
use tracing::debug;

/// A PDF parser. `initialize` is called once before the first document is
/// opened; a failure there means no PDF can be processed at all.
pub trait PdfBackend: Send + Sync {
    fn name(&self) -> &str;

    fn initialize(&self) -> Result<(), ExtractionError>;

    fn open(&self, bytes: &[u8]) -> Result<Box<dyn PdfDocument>, ExtractionError>;
}

/// An opened PDF. Page numbers are 1-based.
pub trait PdfDocument: Send {
    fn page_count(&self) -> u32;

    fn page_text(&self, page_number: u32) -> Result<String, ExtractionError>;

    fn is_encrypted(&self) -> bool {
        false
    }
}

/// Pure-Rust backend built on `lopdf`.
#[derive(Debug, Default, Clone)]
pub struct LopdfBackend;

impl LopdfBackend {
    pub fn new() -> Self {
        Self
    }
}

impl PdfBackend for LopdfBackend {
    fn name(&self) -> &str {
        "lopdf"
    }

    fn initialize(&self) -> Result<(), ExtractionError> {
        // lopdf runs in-process; there is no worker to spawn.
        debug!("PDF backend {} ready", self.name());
        Ok(())
    }

    fn open(&self, bytes: &[u8]) -> Result<Box<dyn PdfDocument>, ExtractionError> {
        let document = lopdf::Document::load_mem(bytes).map_err(|e| {
            let message = e.to_string();
            if looks_encrypted(&message) {
                ExtractionError::EncryptedOrPasswordProtected
            } else {
                ExtractionError::Pdf(message)
            }
        })?;
        let pages: Vec<u32> = document.get_pages().keys().copied().collect();
        debug!("Opened PDF with {} pages", pages.len());
        Ok(Box::new(LopdfDocument { document, pages }))
    }
}

struct LopdfDocument {
    document: lopdf::Document,
    /// Page numbers as lopdf reports them, in document order.
    pages: Vec<u32>,
}

impl PdfDocument for LopdfDocument {
    fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }

    fn page_text(&self, page_number: u32) -> Result<String, ExtractionError> {
        let index = page_number
            .checked_sub(1)
            .map(|i| i as usize)
            .filter(|i| *i < self.pages.len())
            .ok_or_else(|| ExtractionError::Pdf(format!("page {page_number} out of range")))?;
        self.document
            .extract_text(&[self.pages[index]])
            .map_err(|e| ExtractionError::Pdf(e.to_string()))
    }

    fn is_encrypted(&self) -> bool {
        self.document.is_encrypted()
    }
}

fn looks_encrypted(message: &str) -> bool {
    let lower = message.to_lowercase();
    lower.contains("password") || lower.contains("encrypt") || lower.contains("decrypt")
}
