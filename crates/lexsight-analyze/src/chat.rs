//! Question answering over an analyzed document.

use std::sync::Arc;

use lexsight_core::{AnalysisError, AnalysisResult};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::analyzer::generate_with_models;
use crate::client::GenerativeClient;
use crate::config::AnalyzerConfig;
use crate::prompt::truncate_text;
use crate::rate_limit::RateLimiter;

static COMPENSATION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:salary|compensation|pay)\b|\$[\d,]+").unwrap());

/// The document a conversation is about.
#[derive(Debug, Clone, Default)]
pub struct ChatDocument {
    pub name: String,
    pub doc_type: String,
    pub content: String,
    /// (section title, analysis) pairs.
    pub summary: Vec<(String, String)>,
}

impl ChatDocument {
    /// Build from a stored analysis. Sections are paired with subsection
    /// analyses by position.
    pub fn from_analysis(
        name: impl Into<String>,
        content: impl Into<String>,
        result: &AnalysisResult,
    ) -> Self {
        let summary = result
            .extracted_sections
            .iter()
            .zip(
                result
                    .subsection_analysis
                    .iter()
                    .map(|s| s.refined_text.clone())
                    .chain(std::iter::repeat(String::new())),
            )
            .map(|(section, text)| (section.section_title.clone(), text))
            .collect();
        Self {
            name: name.into(),
            doc_type: "Legal Document".into(),
            content: content.into(),
            summary,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    /// Reply language code; `None` or `"en"` means English.
    #[serde(default)]
    pub language: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatReply {
    pub reply: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub fallback: bool,
}

/// Answers user questions about one document, throttled between calls.
pub struct ChatAssistant {
    client: Arc<dyn GenerativeClient>,
    config: AnalyzerConfig,
    limiter: RateLimiter,
}

impl ChatAssistant {
    pub fn new(client: Arc<dyn GenerativeClient>, config: AnalyzerConfig) -> Self {
        let limiter = RateLimiter::new(config.chat_min_interval());
        Self {
            client,
            config,
            limiter,
        }
    }

    /// Answer `request`; model failures produce a heuristic reply instead.
    pub async fn answer(&self, document: &ChatDocument, request: &ChatRequest) -> ChatReply {
        self.limiter.throttle().await;

        match self.ask_model(document, request).await {
            Ok((model, reply)) => {
                info!("Chat answered by {} for {}", model, document.name);
                ChatReply {
                    reply: reply.trim().to_string(),
                    model: Some(model),
                    fallback: false,
                }
            }
            Err(e) => {
                warn!("Chat model failed for {}, using fallback: {}", document.name, e);
                ChatReply {
                    reply: fallback_reply(document, &request.message),
                    model: None,
                    fallback: true,
                }
            }
        }
    }

    async fn ask_model(
        &self,
        document: &ChatDocument,
        request: &ChatRequest,
    ) -> Result<(String, String), AnalysisError> {
        let prompt = build_chat_prompt(document, request, self.config.truncate_chars);
        generate_with_models(
            self.client.as_ref(),
            &self.config.chat_models,
            &prompt,
            &self.config.chat_params,
        )
        .await
    }
}

fn build_chat_prompt(document: &ChatDocument, request: &ChatRequest, truncate_chars: usize) -> String {
    let summary = if document.summary.is_empty() {
        "No summary available".to_string()
    } else {
        document
            .summary
            .iter()
            .map(|(title, text)| format!("{title}: {text}"))
            .collect::<Vec<_>>()
            .join("\n")
    };
    let content = if document.content.trim().is_empty() {
        "No content available".to_string()
    } else {
        truncate_text(&document.content, truncate_chars)
    };
    let language = match request.language.as_deref().map(str::trim) {
        Some(code) if !code.is_empty() && !code.eq_ignore_ascii_case("en") => format!(
            "Please respond in the language with code: {code}. If you cannot respond in this language, respond in English.\n"
        ),
        _ => String::new(),
    };

    format!(
        "You are an expert legal document assistant specializing in contract analysis and legal document interpretation.\n\
You have access to the following document:\n\n\
Document Name: {name}\n\
Document Type: {doc_type}\n\
Document Content: {content}\n\
Document Summary: {summary}\n\n\
User Question: {question}\n\
{language}\n\
Please provide a helpful, accurate, and professional response based on the document content.\n\
If the question is about specific clauses or terms, reference the relevant sections.\n\
Keep your responses clear, concise, and accessible to non-lawyers while maintaining accuracy.\n\
If you cannot find relevant information in the document, please say so clearly.\n",
        name = if document.name.is_empty() { "Unknown Document" } else { document.name.as_str() },
        doc_type = document.doc_type,
        question = request.message,
    )
}

/// Keyword heuristics over the document content.
pub fn fallback_reply(document: &ChatDocument, message: &str) -> String {
    let question = message.to_lowercase();
    let name = if document.name.is_empty() { "your document" } else { document.name.as_str() };

    if document.content.trim().is_empty() {
        return "I can help you understand this document. You can ask me about specific terms, clauses, or sections. Please try rephrasing your question or ask about a specific part of the document.".into();
    }

    if ["salary", "compensation", "pay"].iter().any(|w| question.contains(w)) {
        let found: Vec<&str> = COMPENSATION_RE
            .find_iter(&document.content)
            .take(3)
            .map(|m| m.as_str())
            .collect();
        return if found.is_empty() {
            "I can see the document content but couldn't find specific salary information. Please ask about specific compensation details.".into()
        } else {
            format!(
                "Based on the document, I can see salary/compensation information: {}. Please ask a more specific question about compensation for detailed information.",
                found.join(", ")
            )
        };
    }

    if question.contains("what") && (question.contains("document") || question.contains("content")) {
        let overview = if document.summary.is_empty() {
            format!(
                "This document contains information about {name}. The main content includes various terms and conditions."
            )
        } else {
            let titles: Vec<&str> = document.summary.iter().map(|(t, _)| t.as_str()).collect();
            format!("This document contains the following sections: {}.", titles.join(", "))
        };
        return format!("{overview} Ask me about specific sections or terms you'd like to understand better.");
    }

    format!(
        "I have access to the document \"{name}\" and its content. You can ask me specific questions about any part of it, such as terms, clauses, obligations, or specific sections. What would you like to know?"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::GenerationParams;
    use async_trait::async_trait;
    use lexsight_core::{ExtractedSection, SubsectionAnalysis};
    use parking_lot::Mutex;

    struct RecordingClient {
        reply: Option<&'static str>,
        prompts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl GenerativeClient for RecordingClient {
        fn name(&self) -> &str {
            "recording"
        }

        async fn generate(
            &self,
            _model: &str,
            prompt: &str,
            _params: &GenerationParams,
        ) -> Result<String, AnalysisError> {
            self.prompts.lock().push(prompt.to_string());
            self.reply
                .map(str::to_string)
                .ok_or_else(|| AnalysisError::Api {
                    status: 503,
                    body: "overloaded".into(),
                })
        }
    }

    fn employment() -> ChatDocument {
        ChatDocument {
            name: "employment.pdf".into(),
            doc_type: "Legal Document".into(),
            content: "The Employee's base salary is $225,000 per year, with pay reviewed annually.".into(),
            summary: vec![
                ("Compensation".into(), "Base salary terms".into()),
                ("Term".into(), "Three years".into()),
            ],
        }
    }

    fn assistant(reply: Option<&'static str>) -> (Arc<RecordingClient>, ChatAssistant) {
        let client = Arc::new(RecordingClient {
            reply,
            prompts: Mutex::new(Vec::new()),
        });
        let config = AnalyzerConfig {
            chat_min_interval_ms: 0,
            ..Default::default()
        };
        (client.clone(), ChatAssistant::new(client, config))
    }

    #[test]
    fn test_compensation_fallback_quotes_matches() {
        let reply = fallback_reply(&employment(), "What is my pay?");
        assert!(reply.contains("salary, $225,000, pay"), "{reply}");
    }

    #[test]
    fn test_compensation_fallback_ignores_pay_inside_words() {
        let document = ChatDocument {
            content: "Fees are payable within 30 days. Early repayment carries no penalty. Base Salary: $90,000.".into(),
            ..employment()
        };
        let reply = fallback_reply(&document, "What is the salary?");
        assert!(reply.contains("information: Salary, $90,000."), "{reply}");
        assert!(!reply.contains("pay,"), "{reply}");
    }

    #[test]
    fn test_document_overview_fallback_lists_sections() {
        let reply = fallback_reply(&employment(), "What is in this document?");
        assert!(reply.starts_with("This document contains the following sections: Compensation, Term."));
    }

    #[test]
    fn test_generic_fallback_names_document() {
        let reply = fallback_reply(&employment(), "Can I work remotely?");
        assert!(reply.contains("\"employment.pdf\""));
    }

    #[tokio::test]
    async fn test_language_instruction_reaches_prompt() {
        let (client, assistant) = assistant(Some("  La duración es de tres años.  "));
        let reply = assistant
            .answer(
                &employment(),
                &ChatRequest {
                    message: "How long is the term?".into(),
                    language: Some("es".into()),
                },
            )
            .await;

        assert_eq!(reply.reply, "La duración es de tres años.");
        assert_eq!(reply.model.as_deref(), Some("gemini-2.0-flash-exp"));
        let prompts = client.prompts.lock();
        assert!(prompts[0].contains("language with code: es"));
        assert!(prompts[0].contains("Compensation: Base salary terms"));
    }

    #[tokio::test]
    async fn test_all_models_down_uses_fallback() {
        let (client, assistant) = assistant(None);
        let reply = assistant
            .answer(
                &employment(),
                &ChatRequest {
                    message: "What's the salary?".into(),
                    language: None,
                },
            )
            .await;
        assert!(reply.fallback);
        assert!(reply.reply.contains("$225,000"));
        assert_eq!(client.prompts.lock().len(), 4);
    }

    #[test]
    fn test_from_analysis_pairs_sections() {
        let result = AnalysisResult {
            extracted_sections: vec![
                ExtractedSection {
                    section_title: "Parties".into(),
                    importance_rank: 1,
                    ..Default::default()
                },
                ExtractedSection {
                    section_title: "Payment".into(),
                    importance_rank: 2,
                    ..Default::default()
                },
            ],
            subsection_analysis: vec![SubsectionAnalysis {
                refined_text: "Acme and Beta".into(),
                ..Default::default()
            }],
            ..Default::default()
        };
        let doc = ChatDocument::from_analysis("a.pdf", "", &result);
        assert_eq!(doc.summary[0], ("Parties".to_string(), "Acme and Beta".to_string()));
        assert_eq!(doc.summary[1].1, "");
    }
}
