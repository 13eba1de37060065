//! LexSight Extract: turns uploaded documents into page-aware text.
//!
//! PDFs go through a [`PdfBackend`] (lopdf by default); plain text is
//! decoded directly as a single page.

pub mod extractor;
pub mod file;
pub mod pdf;

pub use extractor::TextExtractor;
pub use file::FileType;
pub use pdf::{LopdfBackend, PdfBackend, PdfDocument};
