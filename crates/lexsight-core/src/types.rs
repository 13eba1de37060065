//! Documents, extracted content and the structured analysis shape.
//!
//! The analysis types mirror the JSON the generative model is asked to
//! return, so they use snake_case keys and deserialize leniently: models
//! routinely emit numbers as strings, `"N/A"` page labels, or a single
//! string where a list was requested.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

pub const DEFAULT_PERSONA: &str = "Legal Document Analyst";
pub const DEFAULT_JOB_TO_BE_DONE: &str = "Legal analysis of the document including key provisions, obligations, rights, risks, and important clauses";

/// Suffix carried by every analysis type produced without the remote model.
pub const FALLBACK_SUFFIX: &str = "(Fallback)";

// ============================================================================
// Documents
// ============================================================================

/// A document submitted for analysis. Lives only for one submission.
#[derive(Clone)]
pub struct DocumentInput {
    pub name: String,
    /// Byte size as reported by the uploader. Plain-text submissions may omit it.
    pub size: Option<u64>,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl DocumentInput {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            size: Some(bytes.len() as u64),
            mime_type: mime_type.into(),
            bytes,
        }
    }

    /// Wrap pasted text as a plain-text document.
    pub fn from_text(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            size: None,
            mime_type: "text/plain".into(),
            bytes: text.into().into_bytes(),
        }
    }

    /// Read a document from disk, inferring the MIME type from the extension.
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = std::fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "document".into());
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        Ok(Self::new(name, mime_for_extension(&ext), bytes))
    }

    /// Lowercased file extension, if the name has one.
    pub fn extension(&self) -> Option<String> {
        Path::new(&self.name)
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
    }

    pub fn metadata(&self) -> DocumentMetadata {
        DocumentMetadata {
            file_name: self.name.clone(),
            size: self.size,
            mime_type: self.mime_type.clone(),
        }
    }
}

impl std::fmt::Debug for DocumentInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentInput")
            .field("name", &self.name)
            .field("size", &self.size)
            .field("mime_type", &self.mime_type)
            .field("bytes", &self.bytes.len())
            .finish()
    }
}

pub fn mime_for_extension(ext: &str) -> &'static str {
    match ext {
        "pdf" => "application/pdf",
        "txt" | "text" => "text/plain",
        _ => "application/octet-stream",
    }
}

/// What is known about a document when its text is unavailable.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocumentMetadata {
    pub file_name: String,
    pub size: Option<u64>,
    pub mime_type: String,
}

/// Text of one page. Failed pages keep a placeholder with `length == 0`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PageText {
    pub page_number: u32,
    pub text: String,
    pub length: usize,
}

impl PageText {
    pub fn new(page_number: u32, text: impl Into<String>) -> Self {
        let text = text.into();
        let length = text.chars().count();
        Self {
            page_number,
            text,
            length,
        }
    }

    pub fn failed(page_number: u32, reason: &str) -> Self {
        Self {
            page_number,
            text: format!("[Page {page_number} - Text extraction failed: {reason}]"),
            length: 0,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.length == 0
    }
}

/// Normalized text of one document. `page_texts.len() == total_pages`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExtractedContent {
    pub full_text: String,
    pub page_texts: Vec<PageText>,
    pub total_pages: u32,
    pub file_name: String,
}

// ============================================================================
// Analysis requests
// ============================================================================

/// What the analyzer gets to look at.
#[derive(Debug, Clone)]
pub enum AnalysisSource {
    /// Page-aware content from a PDF.
    Pages(ExtractedContent),
    /// Plain text, with a title used for section attribution.
    Text { title: String, text: String },
    /// File metadata only; the text could not be read.
    Metadata(DocumentMetadata),
}

#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub persona: String,
    pub job_to_be_done: String,
    pub source: AnalysisSource,
}

impl AnalysisRequest {
    pub fn new(
        persona: impl Into<String>,
        job_to_be_done: impl Into<String>,
        source: AnalysisSource,
    ) -> Self {
        Self {
            persona: persona.into(),
            job_to_be_done: job_to_be_done.into(),
            source,
        }
    }

    /// Name recorded as the analyzed document.
    pub fn document_name(&self) -> &str {
        match &self.source {
            AnalysisSource::Pages(content) => &content.file_name,
            AnalysisSource::Text { title, .. } => title,
            AnalysisSource::Metadata(meta) => &meta.file_name,
        }
    }

    pub fn total_pages(&self) -> Option<u32> {
        match &self.source {
            AnalysisSource::Pages(content) => Some(content.total_pages),
            AnalysisSource::Text { .. } => Some(1),
            AnalysisSource::Metadata(_) => None,
        }
    }
}

// ============================================================================
// Analysis results
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AnalysisResult {
    #[serde(default)]
    pub metadata: AnalysisMetadata,
    #[serde(default)]
    pub extracted_sections: Vec<ExtractedSection>,
    #[serde(default)]
    pub subsection_analysis: Vec<SubsectionAnalysis>,
    #[serde(default)]
    pub processing_info: ProcessingInfo,
}

impl AnalysisResult {
    pub fn is_fallback(&self) -> bool {
        self.processing_info.is_fallback()
    }

    /// Both section lists are non-empty.
    pub fn has_content(&self) -> bool {
        !self.extracted_sections.is_empty() && !self.subsection_analysis.is_empty()
    }

    /// Order sections by rank. Stable, so equal ranks keep model order;
    /// missing ranks (0) go last.
    pub fn sort_sections(&mut self) {
        self.extracted_sections.sort_by_key(|s| match s.importance_rank {
            0 => u32::MAX,
            r => r,
        });
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AnalysisMetadata {
    #[serde(default, deserialize_with = "string_or_list")]
    pub input_documents: Vec<String>,
    #[serde(default)]
    pub persona: String,
    #[serde(default)]
    pub job_to_be_done: String,
    #[serde(default)]
    pub processing_timestamp: String,
    #[serde(
        default,
        deserialize_with = "lenient_u32",
        skip_serializing_if = "Option::is_none"
    )]
    pub total_pages: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processing_note: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ExtractedSection {
    #[serde(default)]
    pub document: String,
    #[serde(default)]
    pub section_title: String,
    /// 1 is the most important. 0 when the model gave no usable rank.
    #[serde(default, deserialize_with = "lenient_rank")]
    pub importance_rank: u32,
    /// `None` when the page is unknown (`"N/A"`).
    #[serde(default, deserialize_with = "lenient_u32")]
    pub page_number: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SubsectionAnalysis {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document: Option<String>,
    #[serde(default, deserialize_with = "lenient_u32")]
    pub page_number: Option<u32>,
    #[serde(default)]
    pub refined_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extracted_text: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_f64",
        skip_serializing_if = "Option::is_none"
    )]
    pub confidence_score: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ProcessingInfo {
    #[serde(default, deserialize_with = "string_or_list")]
    pub files_processed: Vec<String>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub total_files: usize,
    #[serde(default)]
    pub analysis_type: String,
    #[serde(default)]
    pub processed_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limitation_note: Option<String>,
}

impl ProcessingInfo {
    /// Whether the result was synthesized locally instead of by the model.
    pub fn is_fallback(&self) -> bool {
        self.analysis_type.trim_end().ends_with(FALLBACK_SUFFIX)
    }
}

/// A completed analysis kept by the result store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProcessedDocumentRecord {
    /// Time-based identifier, unique within one store.
    pub id: String,
    pub file_names: Vec<String>,
    pub persona: String,
    pub job_to_be_done: String,
    pub result: AnalysisResult,
    pub completed_at: DateTime<Utc>,
}

impl ProcessedDocumentRecord {
    /// Record without an id; the store assigns one.
    pub fn new(
        file_names: Vec<String>,
        persona: impl Into<String>,
        job_to_be_done: impl Into<String>,
        result: AnalysisResult,
    ) -> Self {
        Self {
            id: String::new(),
            file_names,
            persona: persona.into(),
            job_to_be_done: job_to_be_done.into(),
            result,
            completed_at: Utc::now(),
        }
    }
}

/// RFC 3339 timestamp used inside analysis results.
pub fn timestamp_now() -> String {
    Utc::now().to_rfc3339()
}

// ============================================================================
// Lenient deserializers
// ============================================================================

fn value_as_u32(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0 && f.fract() == 0.0).map(|f| f as u64))
            .and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn lenient_u32<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u32>, D::Error> {
    let value = Option::<Value>::deserialize(d)?;
    Ok(value.as_ref().and_then(value_as_u32))
}

fn lenient_rank<'de, D: Deserializer<'de>>(d: D) -> Result<u32, D::Error> {
    Ok(lenient_u32(d)?.unwrap_or(0))
}

fn lenient_count<'de, D: Deserializer<'de>>(d: D) -> Result<usize, D::Error> {
    Ok(lenient_u32(d)?.unwrap_or(0) as usize)
}

fn lenient_f64<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
    let value = Option::<Value>::deserialize(d)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

fn string_or_list<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
    let value = Option::<Value>::deserialize(d)?;
    Ok(match value {
        Some(Value::String(s)) => vec![s],
        Some(Value::Array(items)) => items
            .into_iter()
            .filter_map(|v| match v {
                Value::String(s) => Some(s),
                Value::Null => None,
                other => Some(other.to_string()),
            })
            .collect(),
        _ => Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lenient_section_fields() {
        let json = r#"{
            "document": "lease.pdf",
            "section_title": "Rent",
            "importance_rank": "2",
            "page_number": "N/A"
        }"#;
        let section: ExtractedSection = serde_json::from_str(json).unwrap();
        assert_eq!(section.importance_rank, 2);
        assert_eq!(section.page_number, None);

        let section: ExtractedSection =
            serde_json::from_str(r#"{"section_title": "Term", "importance_rank": 1.0, "page_number": 3}"#)
                .unwrap();
        assert_eq!(section.importance_rank, 1);
        assert_eq!(section.page_number, Some(3));
    }

    #[test]
    fn test_unknown_total_pages_is_none() {
        let meta: AnalysisMetadata = serde_json::from_str(
            r#"{"input_documents": "a.pdf", "total_pages": "Unknown (PDF text extraction not available)"}"#,
        )
        .unwrap();
        assert_eq!(meta.total_pages, None);
        assert_eq!(meta.input_documents, vec!["a.pdf".to_string()]);
    }

    #[test]
    fn test_missing_blocks_default() {
        let result: AnalysisResult = serde_json::from_str(r#"{"extracted_sections": []}"#).unwrap();
        assert!(!result.has_content());
        assert_eq!(result.processing_info.total_files, 0);
    }

    #[test]
    fn test_sort_sections_is_stable() {
        let section = |title: &str, rank| ExtractedSection {
            section_title: title.into(),
            importance_rank: rank,
            ..Default::default()
        };
        let mut result = AnalysisResult {
            extracted_sections: vec![
                section("unranked", 0),
                section("second-a", 2),
                section("first", 1),
                section("second-b", 2),
            ],
            ..Default::default()
        };
        result.sort_sections();
        let titles: Vec<_> = result
            .extracted_sections
            .iter()
            .map(|s| s.section_title.as_str())
            .collect();
        assert_eq!(titles, vec!["first", "second-a", "second-b", "unranked"]);
    }

    #[test]
    fn test_fallback_detection() {
        let mut info = ProcessingInfo {
            analysis_type: "Document Analysis (Fallback)".into(),
            ..Default::default()
        };
        assert!(info.is_fallback());
        info.analysis_type = "Legal Document Analysis".into();
        assert!(!info.is_fallback());
    }

    #[test]
    fn test_failed_page_placeholder() {
        let page = PageText::failed(3, "bad stream");
        assert_eq!(page.text, "[Page 3 - Text extraction failed: bad stream]");
        assert_eq!(page.length, 0);
        assert!(page.is_placeholder());
        assert_eq!(PageText::new(1, "héllo").length, 5);
    }

    #[test]
    fn test_optional_fields_are_omitted() {
        let json = serde_json::to_value(SubsectionAnalysis {
            page_number: None,
            refined_text: "x".into(),
            ..Default::default()
        })
        .unwrap();
        assert!(json.get("original_text").is_none());
        assert!(json["page_number"].is_null());
    }
}
