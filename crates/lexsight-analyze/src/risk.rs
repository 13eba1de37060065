//! Risk analysis of an analyzed document.

use std::sync::Arc;

use lexsight_core::AnalysisError;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::analyzer::generate_with_models;
use crate::client::GenerativeClient;
use crate::config::AnalyzerConfig;
use crate::prompt::truncate_text;
use crate::response::parse_json_reply;

/// Severity, most severe first. Unknown labels read as `Medium`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum RiskLevel {
    Critical,
    High,
    Medium,
    Low,
}

impl From<String> for RiskLevel {
    fn from(label: String) -> Self {
        match label.trim().to_lowercase().as_str() {
            "critical" => Self::Critical,
            "high" => Self::High,
            "low" => Self::Low,
            _ => Self::Medium,
        }
    }
}

/// Risk area. Unknown labels read as `Legal`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String")]
pub enum RiskCategory {
    Legal,
    Financial,
    Operational,
    Compliance,
    Timeline,
}

impl From<String> for RiskCategory {
    fn from(label: String) -> Self {
        match label.trim().to_lowercase().as_str() {
            "financial" => Self::Financial,
            "operational" => Self::Operational,
            "compliance" => Self::Compliance,
            "timeline" => Self::Timeline,
            _ => Self::Legal,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Risk {
    #[serde(default)]
    pub id: serde_json::Value,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_level")]
    pub level: RiskLevel,
    #[serde(default = "default_category")]
    pub category: RiskCategory,
    #[serde(default)]
    pub recommendation: String,
}

fn default_level() -> RiskLevel {
    RiskLevel::Medium
}
fn default_category() -> RiskCategory {
    RiskCategory::Legal
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskReport {
    pub risks: Vec<Risk>,
    /// True when the risks come from keyword heuristics, not the model.
    #[serde(default)]
    pub fallback: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl RiskReport {
    pub fn count_at_least(&self, level: RiskLevel) -> usize {
        self.risks.iter().filter(|r| r.level <= level).count()
    }
}

#[derive(Deserialize)]
struct RiskReply {
    #[serde(default)]
    risks: Vec<Risk>,
}

/// Identifies legal, financial and timeline risks in a document.
pub struct RiskAnalyzer {
    client: Arc<dyn GenerativeClient>,
    config: AnalyzerConfig,
}

impl RiskAnalyzer {
    pub fn new(client: Arc<dyn GenerativeClient>, config: AnalyzerConfig) -> Self {
        Self { client, config }
    }

    /// Analyze risks; never fails, falling back to keyword detection.
    pub async fn analyze(&self, document_name: &str, content: &str, summary: &str) -> RiskReport {
        if content.trim().is_empty() && summary.trim().is_empty() {
            warn!("No content for risk analysis of {}", document_name);
            return fallback_report(content, summary);
        }

        match self.request(document_name, content, summary).await {
            Ok((model, risks)) => {
                info!("Model {} found {} risks in {}", model, risks.len(), document_name);
                let mut risks = risks;
                risks.sort_by_key(|r| r.level);
                RiskReport {
                    risks,
                    fallback: false,
                    model: Some(model),
                }
            }
            Err(e) => {
                warn!("Risk analysis of {} failed, using fallback: {}", document_name, e);
                fallback_report(content, summary)
            }
        }
    }

    async fn request(
        &self,
        document_name: &str,
        content: &str,
        summary: &str,
    ) -> Result<(String, Vec<Risk>), AnalysisError> {
        let prompt = build_risk_prompt(
            document_name,
            &truncate_text(content, self.config.truncate_chars),
            summary,
        );
        let (model, raw) = generate_with_models(
            self.client.as_ref(),
            &self.config.risk_models,
            &prompt,
            &self.config.risk_params,
        )
        .await?;
        let reply: RiskReply = parse_json_reply(&raw)?;
        Ok((model, reply.risks))
    }
}

fn build_risk_prompt(document_name: &str, content: &str, summary: &str) -> String {
    let or_none = |s: &str, none: &str| {
        if s.trim().is_empty() {
            none.to_string()
        } else {
            s.to_string()
        }
    };
    format!(
        r#"Please analyze the following document for potential risks and concerns. Focus on identifying specific risks in these categories: Legal, Financial, Operational, Compliance, and Timeline.

Document title: {title}
Document summary: {summary}
Document content: {content}

Please provide a detailed risk analysis in the following JSON format:
{{
  "risks": [
    {{
      "id": 1,
      "title": "Risk Title",
      "description": "Detailed description of the risk and its implications",
      "level": "critical|high|medium|low",
      "category": "Legal|Financial|Operational|Compliance|Timeline",
      "recommendation": "Specific recommendation to mitigate this risk"
    }}
  ]
}}

Focus on actual content from the document. Identify real risks based on what's written, not hypothetical scenarios. Be specific and actionable."#,
        title = or_none(document_name, "Unknown Document"),
        summary = or_none(summary, "No summary available"),
        content = or_none(content, "No content available"),
    )
}

/// Keyword-driven risks from the content (or the summary when the content
/// is empty).
pub fn fallback_report(content: &str, summary: &str) -> RiskReport {
    let source = if content.trim().is_empty() { summary } else { content };
    let text = source.to_lowercase();
    let has = |words: &[&str]| words.iter().any(|w| text.contains(w));

    let mut risks = Vec::new();
    if has(&["contract", "agreement"]) {
        risks.push(fallback_risk(
            1,
            "Contract Terms Review Needed",
            "This document contains contractual terms that require careful review to understand obligations and rights.",
            RiskLevel::Medium,
            RiskCategory::Legal,
            "Have a legal professional review all contract terms before signing.",
        ));
    }
    if has(&["payment", "salary", "money"]) {
        risks.push(fallback_risk(
            2,
            "Financial Terms Present",
            "Document contains financial terms that need verification and understanding.",
            RiskLevel::Medium,
            RiskCategory::Financial,
            "Verify all financial terms and payment schedules are acceptable.",
        ));
    }
    if has(&["deadline", "date", "term"]) {
        risks.push(fallback_risk(
            3,
            "Time-Sensitive Elements",
            "Document contains dates or deadlines that require attention.",
            RiskLevel::Medium,
            RiskCategory::Timeline,
            "Mark all important dates and deadlines in your calendar.",
        ));
    }
    if risks.is_empty() {
        risks.push(fallback_risk(
            1,
            "General Document Review",
            "This document requires careful review to identify potential issues or important information.",
            RiskLevel::Low,
            RiskCategory::Legal,
            "Read through the entire document carefully and consult professionals if needed.",
        ));
    }

    RiskReport {
        risks,
        fallback: true,
        model: None,
    }
}

fn fallback_risk(
    id: u32,
    title: &str,
    description: &str,
    level: RiskLevel,
    category: RiskCategory,
    recommendation: &str,
) -> Risk {
    Risk {
        id: id.into(),
        title: title.into(),
        description: description.into(),
        level,
        category,
        recommendation: recommendation.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::GenerationParams;
    use async_trait::async_trait;

    struct FixedClient(Result<&'static str, ()>);

    #[async_trait]
    impl GenerativeClient for FixedClient {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn generate(
            &self,
            _model: &str,
            _prompt: &str,
            _params: &GenerationParams,
        ) -> Result<String, AnalysisError> {
            self.0
                .map(str::to_string)
                .map_err(|_| AnalysisError::Request("connection refused".into()))
        }
    }

    fn risk_analyzer(reply: Result<&'static str, ()>) -> RiskAnalyzer {
        RiskAnalyzer::new(Arc::new(FixedClient(reply)), AnalyzerConfig::default())
    }

    #[test]
    fn test_fallback_keywords() {
        let report = fallback_report("This Agreement sets the payment deadline.", "");
        let titles: Vec<_> = report.risks.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(
            titles,
            vec![
                "Contract Terms Review Needed",
                "Financial Terms Present",
                "Time-Sensitive Elements"
            ]
        );
        assert!(report.fallback);
    }

    #[test]
    fn test_fallback_general_review() {
        let report = fallback_report("Meeting notes.", "");
        assert_eq!(report.risks.len(), 1);
        assert_eq!(report.risks[0].level, RiskLevel::Low);
        assert_eq!(report.risks[0].category, RiskCategory::Legal);
    }

    #[test]
    fn test_unknown_level_and_category_are_tolerated() {
        let risk: Risk = serde_json::from_str(
            r#"{"id": "r1", "title": "Odd", "level": "severe", "category": "Reputational"}"#,
        )
        .unwrap();
        assert_eq!(risk.level, RiskLevel::Medium);
        assert_eq!(risk.category, RiskCategory::Legal);
    }

    #[tokio::test]
    async fn test_model_risks_sorted_by_severity() {
        let reply = r#"Analysis follows.
{"risks": [
  {"id": 1, "title": "Late fee", "level": "low", "category": "Financial"},
  {"id": 2, "title": "Unlimited liability", "level": "critical", "category": "Legal"}
]}"#;
        let report = risk_analyzer(Ok(reply))
            .analyze("lease.pdf", "The tenant is liable for all damages.", "")
            .await;
        assert!(!report.fallback);
        assert_eq!(report.risks[0].title, "Unlimited liability");
        assert_eq!(report.count_at_least(RiskLevel::High), 1);
    }

    #[tokio::test]
    async fn test_failure_uses_fallback() {
        let report = risk_analyzer(Err(()))
            .analyze("salary.txt", "Salary is paid monthly.", "")
            .await;
        assert!(report.fallback);
        assert_eq!(report.risks[0].category, RiskCategory::Financial);
    }
}
