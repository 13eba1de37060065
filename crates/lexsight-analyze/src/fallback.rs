//! Deterministic local analysis used whenever the model path fails.
//!
//! Nothing here touches the network or returns an error. Every result has
//! at least one extracted section and one subsection analysis.

use lexsight_core::{
    timestamp_now, AnalysisMetadata, AnalysisRequest, AnalysisResult, AnalysisSource,
    ExtractedContent, ExtractedSection, ProcessingInfo, SubsectionAnalysis,
};
use tracing::info;

pub const PAGE_FALLBACK_TYPE: &str = "Document Analysis (Fallback)";
pub const TEXT_FALLBACK_TYPE: &str = "Text Document Analysis (Fallback)";
pub const METADATA_FALLBACK_TYPE: &str = "Basic Document Analysis (Fallback)";

const MIN_PARAGRAPH_CHARS: usize = 50;
const MAX_TEXT_SECTIONS: usize = 8;
const MIN_PAGE_CHARS: usize = 100;
const MAX_PAGE_SECTIONS: usize = 10;
const TITLE_CHARS: usize = 80;
const REFINED_CHARS: usize = 500;

/// Document category guessed from a filename.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Contract,
    Policy,
    Report,
    Manual,
    General,
}

impl DocumentKind {
    pub fn from_file_name(name: &str) -> Self {
        let name = name.to_lowercase();
        let has = |words: &[&str]| words.iter().any(|w| name.contains(w));
        if has(&["contract", "agreement"]) {
            Self::Contract
        } else if has(&["policy", "procedure"]) {
            Self::Policy
        } else if has(&["report", "analysis"]) {
            Self::Report
        } else if has(&["manual", "guide"]) {
            Self::Manual
        } else {
            Self::General
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Contract => "Contract/Agreement",
            Self::Policy => "Policy/Procedure Document",
            Self::Report => "Report/Analysis",
            Self::Manual => "Manual/Guide",
            Self::General => "Document",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::Contract => "This appears to be a contractual document that likely contains terms, conditions, and legal obligations.",
            Self::Policy => "This appears to be a policy or procedure document containing guidelines and processes.",
            Self::Report => "This appears to be a report or analysis document containing findings and recommendations.",
            Self::Manual => "This appears to be an instructional document containing procedures or guidance.",
            Self::General => "This document requires review.",
        }
    }
}

/// Pick the richest fallback the request's data allows.
pub fn synthesize(request: &AnalysisRequest) -> AnalysisResult {
    match &request.source {
        AnalysisSource::Pages(content) => {
            from_pages(content, &request.persona, &request.job_to_be_done)
        }
        AnalysisSource::Text { title, text } => {
            from_text(title, text, &request.persona, &request.job_to_be_done)
        }
        AnalysisSource::Metadata(meta) => {
            from_metadata(&meta.file_name, &request.persona, &request.job_to_be_done)
        }
    }
}

/// Filename-only analysis: three canned sections, no page information.
pub fn from_metadata(file_name: &str, persona: &str, job_to_be_done: &str) -> AnalysisResult {
    let kind = DocumentKind::from_file_name(file_name);
    info!("Metadata fallback for {} ({:?})", file_name, kind);

    let titles = [
        format!("{} Overview", kind.label()),
        "Document Analysis Limitation".to_string(),
        "Recommended Next Steps".to_string(),
    ];
    let texts = [
        kind.description().to_string(),
        "Note: Full text analysis was not possible due to technical limitations. For a complete analysis, paste the document text and submit it as a text document.".to_string(),
        format!("As a {persona}, I recommend extracting the text from this document manually and submitting it as text for a more detailed analysis."),
    ];

    let extracted_sections = titles
        .into_iter()
        .enumerate()
        .map(|(i, section_title)| ExtractedSection {
            document: file_name.to_string(),
            section_title,
            importance_rank: i as u32 + 1,
            page_number: None,
        })
        .collect();
    let subsection_analysis = texts
        .into_iter()
        .map(|refined_text| SubsectionAnalysis {
            page_number: None,
            refined_text,
            ..Default::default()
        })
        .collect();

    let mut result = build(
        file_name,
        persona,
        job_to_be_done,
        None,
        METADATA_FALLBACK_TYPE,
        extracted_sections,
        subsection_analysis,
    );
    result.metadata.processing_note = Some("Analysis based on filename inference".into());
    result.processing_info.limitation_note =
        Some("Text extraction not available - analysis based on filename".into());
    result
}

/// Paragraph-based analysis of plain text.
pub fn from_text(title: &str, text: &str, persona: &str, job_to_be_done: &str) -> AnalysisResult {
    let paragraphs: Vec<&str> = text
        .split('\n')
        .filter(|p| p.trim().chars().count() > MIN_PARAGRAPH_CHARS)
        .take(MAX_TEXT_SECTIONS)
        .collect();
    info!("Text fallback for {}: {} paragraphs", title, paragraphs.len());

    let (extracted_sections, subsection_analysis) = if paragraphs.is_empty() {
        (
            vec![section(title, "Document Content".into(), 1, Some(1))],
            vec![subsection(Some(1), clip(text.trim(), REFINED_CHARS))],
        )
    } else {
        paragraphs
            .iter()
            .enumerate()
            .map(|(i, paragraph)| {
                let paragraph = paragraph.trim();
                (
                    section(title, clip(paragraph, TITLE_CHARS), i as u32 + 1, Some(1)),
                    subsection(Some(1), clip(paragraph, REFINED_CHARS)),
                )
            })
            .unzip()
    };

    build(
        title,
        persona,
        job_to_be_done,
        Some(1),
        TEXT_FALLBACK_TYPE,
        extracted_sections,
        subsection_analysis,
    )
}

/// Page-based analysis of extracted PDF content. Falls through to the
/// paragraph strategy when no page carries enough text.
pub fn from_pages(content: &ExtractedContent, persona: &str, job_to_be_done: &str) -> AnalysisResult {
    let pages: Vec<_> = content
        .page_texts
        .iter()
        .filter(|p| !p.is_placeholder() && p.text.chars().count() > MIN_PAGE_CHARS)
        .collect();

    if pages.is_empty() {
        info!("No page of {} has enough text; using paragraph fallback", content.file_name);
        let mut result = from_text(&content.file_name, &content.full_text, persona, job_to_be_done);
        result.metadata.total_pages = Some(content.total_pages);
        result.processing_info.analysis_type = PAGE_FALLBACK_TYPE.into();
        for s in &mut result.extracted_sections {
            s.page_number = None;
        }
        for s in &mut result.subsection_analysis {
            s.page_number = None;
        }
        return result;
    }

    info!("Page fallback for {}: {} usable pages", content.file_name, pages.len());

    let extracted_sections = pages
        .iter()
        .take(MAX_PAGE_SECTIONS)
        .enumerate()
        .map(|(i, page)| {
            let first_sentence = page.text.split('.').next().unwrap_or("").trim();
            let title = if first_sentence.is_empty() {
                format!("Page {} Content", page.page_number)
            } else {
                first_sentence.chars().take(TITLE_CHARS).collect()
            };
            section(&content.file_name, title, i as u32 + 1, Some(page.page_number))
        })
        .collect();
    let subsection_analysis = pages
        .iter()
        .map(|page| subsection(Some(page.page_number), clip(&page.text, REFINED_CHARS)))
        .collect();

    build(
        &content.file_name,
        persona,
        job_to_be_done,
        Some(content.total_pages),
        PAGE_FALLBACK_TYPE,
        extracted_sections,
        subsection_analysis,
    )
}

fn section(document: &str, section_title: String, rank: u32, page: Option<u32>) -> ExtractedSection {
    ExtractedSection {
        document: document.to_string(),
        section_title,
        importance_rank: rank,
        page_number: page,
    }
}

fn subsection(page: Option<u32>, refined_text: String) -> SubsectionAnalysis {
    SubsectionAnalysis {
        page_number: page,
        refined_text,
        ..Default::default()
    }
}

/// First `max` characters, with "..." when anything was cut.
fn clip(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((i, _)) => format!("{}...", text[..i].trim_end()),
        None => text.to_string(),
    }
}

fn build(
    document: &str,
    persona: &str,
    job_to_be_done: &str,
    total_pages: Option<u32>,
    analysis_type: &str,
    extracted_sections: Vec<ExtractedSection>,
    subsection_analysis: Vec<SubsectionAnalysis>,
) -> AnalysisResult {
    let now = timestamp_now();
    AnalysisResult {
        metadata: AnalysisMetadata {
            input_documents: vec![document.to_string()],
            persona: persona.to_string(),
            job_to_be_done: job_to_be_done.to_string(),
            processing_timestamp: now.clone(),
            total_pages,
            processing_note: None,
        },
        extracted_sections,
        subsection_analysis,
        processing_info: ProcessingInfo {
            files_processed: vec![document.to_string()],
            total_files: 1,
            analysis_type: analysis_type.to_string(),
            processed_at: now,
            limitation_note: None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lexsight_core::PageText;

    #[test]
    fn test_document_kind_from_name() {
        assert_eq!(DocumentKind::from_file_name("Service_AGREEMENT.pdf"), DocumentKind::Contract);
        assert_eq!(DocumentKind::from_file_name("hr-procedure.pdf"), DocumentKind::Policy);
        assert_eq!(DocumentKind::from_file_name("q3_report.pdf"), DocumentKind::Report);
        assert_eq!(DocumentKind::from_file_name("user-guide.pdf"), DocumentKind::Manual);
        assert_eq!(DocumentKind::from_file_name("scan0001.pdf"), DocumentKind::General);
    }

    #[test]
    fn test_metadata_fallback_shape() {
        let result = from_metadata("employment_contract.pdf", "HR Manager", "review terms");
        assert_eq!(result.extracted_sections.len(), 3);
        assert_eq!(result.subsection_analysis.len(), 3);
        assert_eq!(result.extracted_sections[0].section_title, "Contract/Agreement Overview");
        assert!(result.extracted_sections.iter().all(|s| s.page_number.is_none()));
        assert_eq!(result.metadata.total_pages, None);
        assert!(result.subsection_analysis[2].refined_text.starts_with("As a HR Manager"));
        assert_eq!(result.processing_info.analysis_type, METADATA_FALLBACK_TYPE);
        assert!(result.is_fallback());
    }

    #[test]
    fn test_short_text_yields_single_section() {
        let result = from_text("note.txt", "Hello world.", "Student", "Summarize");
        assert_eq!(result.extracted_sections.len(), 1);
        assert_eq!(result.extracted_sections[0].section_title, "Document Content");
        assert_eq!(result.subsection_analysis[0].refined_text, "Hello world.");
        assert_eq!(result.metadata.total_pages, Some(1));
        assert_eq!(result.processing_info.analysis_type, TEXT_FALLBACK_TYPE);
    }

    #[test]
    fn test_text_paragraphs_are_capped_and_clipped() {
        let paragraph = "The Licensee shall not sublicense any rights granted under this Agreement without consent of the Licensor in writing.";
        let text = vec![paragraph; 12].join("\nshort line\n");
        let result = from_text("license.txt", &text, "Counsel", "Review");

        assert_eq!(result.extracted_sections.len(), 8);
        let title = &result.extracted_sections[0].section_title;
        assert!(title.ends_with("..."));
        assert_eq!(title.chars().count(), 83);
        let ranks: Vec<u32> = result.extracted_sections.iter().map(|s| s.importance_rank).collect();
        assert_eq!(ranks, (1..=8).collect::<Vec<_>>());
    }

    #[test]
    fn test_pages_skip_short_and_failed_pages() {
        let long = "This Lease Agreement is made between the Landlord and the Tenant. Rent is payable monthly in advance on the first day.";
        let content = ExtractedContent {
            full_text: String::new(),
            page_texts: vec![
                PageText::new(1, "Cover page"),
                PageText::new(2, long),
                PageText::failed(3, "bad stream"),
                PageText::new(4, "x".repeat(600)),
            ],
            total_pages: 4,
            file_name: "lease.pdf".into(),
        };
        let result = from_pages(&content, "Tenant", "Understand obligations");

        assert_eq!(result.extracted_sections.len(), 2);
        assert_eq!(
            result.extracted_sections[0].section_title,
            "This Lease Agreement is made between the Landlord and the Tenant"
        );
        assert_eq!(result.extracted_sections[0].page_number, Some(2));
        assert_eq!(result.extracted_sections[1].importance_rank, 2);
        assert_eq!(result.extracted_sections[1].section_title.chars().count(), 80);
        assert_eq!(result.subsection_analysis[1].refined_text.chars().count(), 503);
        assert_eq!(result.metadata.total_pages, Some(4));
        assert_eq!(result.processing_info.analysis_type, PAGE_FALLBACK_TYPE);
    }

    #[test]
    fn test_pages_without_enough_text_degrade_to_paragraphs() {
        let content = ExtractedContent {
            full_text: "--- Page 1 ---\nSigned.".into(),
            page_texts: vec![PageText::new(1, "Signed.")],
            total_pages: 1,
            file_name: "sig.pdf".into(),
        };
        let result = from_pages(&content, "Clerk", "File it");
        assert!(result.has_content());
        assert_eq!(result.processing_info.analysis_type, PAGE_FALLBACK_TYPE);
    }

    #[test]
    fn test_page_sections_capped_at_ten() {
        let pages = (1..=14).map(|n| PageText::new(n, "y".repeat(150))).collect();
        let content = ExtractedContent {
            full_text: String::new(),
            page_texts: pages,
            total_pages: 14,
            file_name: "big.pdf".into(),
        };
        let result = from_pages(&content, "Analyst", "Review");
        assert_eq!(result.extracted_sections.len(), 10);
        assert_eq!(result.subsection_analysis.len(), 14);
    }
}
