//! Error types for LexSight.
//!
//! Extraction failures are hard stops and carry user-facing guidance.
//! Analysis failures are absorbed by the fallback synthesizer, so they only
//! need to be descriptive enough for logs.

use thiserror::Error;

use crate::status::ProcessingStatus;

/// Failure to turn an uploaded document into text.
#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("PDF worker could not be configured: {0}")]
    WorkerConfiguration(String),

    #[error("No text content could be extracted (document may be image-based or encrypted)")]
    EmptyContent,

    #[error("Document is encrypted or password-protected")]
    EncryptedOrPasswordProtected,

    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),

    #[error("PDF parse error: {0}")]
    Pdf(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ExtractionError {
    /// Actionable advice shown to the user alongside the error.
    pub fn user_guidance(&self) -> &'static str {
        match self {
            Self::WorkerConfiguration(_) => {
                "PDF processing is unavailable right now. Try pasting the document text instead."
            }
            Self::EmptyContent => {
                "The document appears to be scanned or image-based. Run it through OCR software first, or paste the text directly."
            }
            Self::EncryptedOrPasswordProtected => {
                "Remove the password protection and upload the document again."
            }
            Self::UnsupportedFileType(_) => "Upload a PDF (.pdf) or plain text (.txt) file.",
            Self::Pdf(_) => {
                "The PDF could not be read. It may be corrupted; try re-exporting it or paste the text instead."
            }
            Self::Io(_) => "The file could not be read. Check that it exists and try again.",
        }
    }

    /// Short machine-readable code for API error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            Self::WorkerConfiguration(_) => "worker_configuration",
            Self::EmptyContent => "empty_content",
            Self::EncryptedOrPasswordProtected => "encrypted_document",
            Self::UnsupportedFileType(_) => "unsupported_file_type",
            Self::Pdf(_) => "pdf_parse_error",
            Self::Io(_) => "io_error",
        }
    }
}

/// Failure of a remote analysis attempt.
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Request failed: {0}")]
    Request(String),

    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Model returned an empty response")]
    EmptyResponse,

    #[error("Malformed model response: {0}")]
    MalformedResponse(String),

    #[error("No API key configured for the generative service")]
    MissingApiKey,

    #[error("All models failed: {}", .0.join("; "))]
    AllModelsFailed(Vec<String>),

    #[error("Analysis cancelled")]
    Cancelled,
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error(transparent)]
    Analysis(#[from] AnalysisError),

    #[error("No files were submitted")]
    NoFiles,

    #[error("Processing cancelled")]
    Cancelled,

    #[error("Invalid status transition: {from} -> {to}")]
    InvalidTransition {
        from: ProcessingStatus,
        to: ProcessingStatus,
    },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_extraction_error_has_guidance() {
        let errors = [
            ExtractionError::WorkerConfiguration("missing".into()),
            ExtractionError::EmptyContent,
            ExtractionError::EncryptedOrPasswordProtected,
            ExtractionError::UnsupportedFileType("image/png".into()),
            ExtractionError::Pdf("bad xref".into()),
        ];
        for e in &errors {
            assert!(!e.user_guidance().is_empty(), "{e} has no guidance");
        }
        assert!(ExtractionError::EmptyContent.user_guidance().contains("OCR"));
    }

    #[test]
    fn test_all_models_failed_lists_attempts() {
        let e = AnalysisError::AllModelsFailed(vec!["a: 500".into(), "b: timeout".into()]);
        assert_eq!(e.to_string(), "All models failed: a: 500; b: timeout");
    }

    #[test]
    fn test_extraction_converts_into_error() {
        let e: Error = ExtractionError::EmptyContent.into();
        assert!(matches!(e, Error::Extraction(ExtractionError::EmptyContent)));
    }
}
