//! Prompt construction for document analysis.

use lexsight_core::{timestamp_now, AnalysisRequest, AnalysisSource, DocumentMetadata, ExtractedContent};

pub const TRUNCATION_MARKER: &str = "...\n[Content truncated due to length]";

pub const PDF_ANALYSIS_TYPE: &str = "Legal Document Analysis";
pub const TEXT_ANALYSIS_TYPE: &str = "Text Document Analysis";
pub const METADATA_ANALYSIS_TYPE: &str = "Metadata-based Document Analysis";

/// Cut `text` to at most `max_chars` characters, appending the truncation
/// marker when anything was removed.
pub fn truncate_text(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => format!("{}{}", &text[..byte_index], TRUNCATION_MARKER),
        None => text.to_string(),
    }
}

/// Build the single prompt sent to the model for `request`.
pub fn build_analysis_prompt(request: &AnalysisRequest, truncate_chars: usize) -> String {
    let header = format!(
        "You are an expert {}. Your task is to {}.\n\n",
        request.persona, request.job_to_be_done
    );
    let body = match &request.source {
        AnalysisSource::Pages(content) => pages_prompt(request, content, truncate_chars),
        AnalysisSource::Text { title, text } => text_prompt(request, title, text, truncate_chars),
        AnalysisSource::Metadata(meta) => metadata_prompt(request, meta),
    };
    format!("{header}{body}\nPlease respond with ONLY the JSON structure, no additional text.\n")
}

fn json_shape(
    request: &AnalysisRequest,
    document: &str,
    total_pages: &str,
    page_label: &str,
    analysis_type: &str,
) -> String {
    let now = timestamp_now();
    format!(
        r#"{{
  "metadata": {{
    "input_documents": ["{document}"],
    "persona": "{persona}",
    "job_to_be_done": "{job}",
    "processing_timestamp": "{now}",
    "total_pages": {total_pages}
  }},
  "extracted_sections": [
    {{
      "document": "{document}",
      "section_title": "Section Title",
      "importance_rank": 1,
      "page_number": {page_label}
    }}
  ],
  "subsection_analysis": [
    {{
      "page_number": {page_label},
      "refined_text": "Detailed analysis of the content"
    }}
  ],
  "processing_info": {{
    "files_processed": ["{document}"],
    "total_files": 1,
    "analysis_type": "{analysis_type}",
    "processed_at": "{now}"
  }}
}}"#,
        persona = request.persona,
        job = request.job_to_be_done,
    )
}

fn pages_prompt(request: &AnalysisRequest, content: &ExtractedContent, truncate_chars: usize) -> String {
    format!(
        "Please analyze the following PDF document content and provide a structured analysis in JSON format with the following structure:\n\n{shape}\n\n\
Important guidelines:\n\
1. Extract 8-15 key sections from the document, ranked by importance (1 = most important)\n\
2. For each page, provide refined analysis of the key content\n\
3. Focus on legal terms, obligations, rights, risks, and important clauses\n\
4. Make sure section titles are descriptive and specific\n\
5. Ensure the JSON is valid and properly formatted\n\
6. Provide practical insights relevant to the persona and job to be done\n\n\
Document Content:\n{text}\n",
        shape = json_shape(
            request,
            &content.file_name,
            &content.total_pages.to_string(),
            "1",
            PDF_ANALYSIS_TYPE
        ),
        text = truncate_text(&content.full_text, truncate_chars),
    )
}

fn text_prompt(request: &AnalysisRequest, title: &str, text: &str, truncate_chars: usize) -> String {
    format!(
        "Please analyze the following document text and provide a structured analysis in JSON format with the following structure:\n\n{shape}\n\n\
Important guidelines:\n\
1. Extract 5-12 key sections from the document, ranked by importance (1 = most important)\n\
2. Provide refined analysis of the key content\n\
3. Focus on legal terms, obligations, rights, risks, and important clauses if it's a legal document\n\
4. Make sure section titles are descriptive and specific\n\
5. Ensure the JSON is valid and properly formatted\n\
6. Provide practical insights relevant to the persona and job to be done\n\
7. Break down the content logically into important sections\n\n\
Document Content:\n{text}\n",
        shape = json_shape(request, title, "1", "1", TEXT_ANALYSIS_TYPE),
        text = truncate_text(text, truncate_chars),
    )
}

fn metadata_prompt(request: &AnalysisRequest, meta: &DocumentMetadata) -> String {
    let size = meta
        .size
        .map(|s| format!("{s} bytes"))
        .unwrap_or_else(|| "unknown".into());
    format!(
        "I have a document whose text cannot be read directly, but I can provide the file information:\n\n\
File Name: {name}\nFile Size: {size}\nFile Type: {mime}\n\n\
Based on the filename and your expertise as a {persona}, please create a structured analysis in JSON format with the following structure:\n\n{shape}\n\n\
Important guidelines:\n\
1. Infer 3-5 likely sections from the document type suggested by the filename\n\
2. Use \"N/A\" for page numbers and state clearly that the full text was not available\n\
3. Recommend concrete next steps relevant to the persona and job to be done\n\
4. Ensure the JSON is valid and properly formatted\n",
        name = meta.file_name,
        mime = meta.mime_type,
        persona = request.persona,
        shape = json_shape(
            request,
            &meta.file_name,
            "\"Unknown\"",
            "\"N/A\"",
            METADATA_ANALYSIS_TYPE
        ),
    )
}
