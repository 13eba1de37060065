//! File type detection for submitted documents.

use lexsight_core::DocumentInput;

/// Document formats the extractor understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    Pdf,
    PlainText,
    Unknown,
}

impl FileType {
    /// Detect file type from extension.
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "pdf" => Self::Pdf,
            "txt" | "text" => Self::PlainText,
            _ => Self::Unknown,
        }
    }

    /// Detect file type from a MIME type, ignoring parameters like `charset`.
    pub fn from_mime(mime: &str) -> Self {
        let essence = mime.split(';').next().unwrap_or("").trim().to_lowercase();
        match essence.as_str() {
            "application/pdf" | "application/x-pdf" => Self::Pdf,
            "text/plain" => Self::PlainText,
            _ => Self::Unknown,
        }
    }

    /// MIME type wins; the extension decides when the uploader sent a
    /// generic type such as `application/octet-stream`.
    pub fn detect(doc: &DocumentInput) -> Self {
        match Self::from_mime(&doc.mime_type) {
            Self::Unknown => doc
                .extension()
                .map(|ext| Self::from_extension(&ext))
                .unwrap_or(Self::Unknown),
            known => known,
        }
    }
}

impl std::fmt::Display for FileType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pdf => write!(f, "pdf"),
            Self::PlainText => write!(f, "text"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_prefers_mime() {
        let doc = DocumentInput::new("notes.pdf", "text/plain; charset=utf-8", b"hi".to_vec());
        assert_eq!(FileType::detect(&doc), FileType::PlainText);
    }

    #[test]
    fn test_detect_falls_back_to_extension() {
        let doc = DocumentInput::new("Lease.PDF", "application/octet-stream", Vec::new());
        assert_eq!(FileType::detect(&doc), FileType::Pdf);

        let doc = DocumentInput::new("photo.png", "image/png", Vec::new());
        assert_eq!(FileType::detect(&doc), FileType::Unknown);
    }
}
