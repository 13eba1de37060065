//! Model-backed document analysis.

use std::sync::Arc;

use lexsight_core::{
    timestamp_now, AnalysisError, AnalysisRequest, AnalysisResult, AnalysisSource,
};
use tracing::{debug, info, warn};

use crate::client::{GeminiClient, GenerationParams, GenerativeClient};
use crate::config::AnalyzerConfig;
use crate::fallback;
use crate::prompt::{self, METADATA_ANALYSIS_TYPE, PDF_ANALYSIS_TYPE, TEXT_ANALYSIS_TYPE};
use crate::response::parse_json_reply;

/// Run `prompt` against each model in order until one answers.
///
/// Each model gets exactly one attempt and there is no delay between
/// attempts. Returns the answering model and its raw text.
pub async fn generate_with_models(
    client: &dyn GenerativeClient,
    models: &[String],
    prompt: &str,
    params: &GenerationParams,
) -> Result<(String, String), AnalysisError> {
    let mut failures = Vec::with_capacity(models.len());
    for model in models {
        match client.generate(model, prompt, params).await {
            Ok(text) => {
                debug!("Model {} answered with {} chars", model, text.len());
                return Ok((model.clone(), text));
            }
            Err(AnalysisError::MissingApiKey) => return Err(AnalysisError::MissingApiKey),
            Err(e) => {
                warn!("Model {} via {} failed: {}", model, client.name(), e);
                failures.push(format!("{}: {}", model, e));
            }
        }
    }
    Err(AnalysisError::AllModelsFailed(failures))
}

/// Produces structured analyses from a generative model.
pub struct ContentAnalyzer {
    client: Arc<dyn GenerativeClient>,
    config: AnalyzerConfig,
}

impl ContentAnalyzer {
    pub fn new(client: Arc<dyn GenerativeClient>, config: AnalyzerConfig) -> Self {
        Self { client, config }
    }

    /// Analyzer talking to Gemini with the configured key and timeout.
    pub fn from_config(config: AnalyzerConfig) -> Result<Self, AnalysisError> {
        let client = GeminiClient::new(
            config.base_url.clone(),
            config.api_key.clone(),
            config.request_timeout(),
        )?;
        Ok(Self::new(Arc::new(client), config))
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    pub fn client(&self) -> Arc<dyn GenerativeClient> {
        self.client.clone()
    }

    /// Ask the model for an analysis. Errors mean the caller should fall
    /// back; see [`ContentAnalyzer::analyze_or_fallback`].
    pub async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisResult, AnalysisError> {
        let prompt = prompt::build_analysis_prompt(request, self.config.truncate_chars);
        info!(
            "Analyzing {} as '{}' ({} prompt chars)",
            request.document_name(),
            request.persona,
            prompt.len()
        );

        let (model, raw) = generate_with_models(
            self.client.as_ref(),
            &self.config.analysis_models,
            &prompt,
            &self.config.analysis_params,
        )
        .await?;

        let mut result: AnalysisResult = parse_json_reply(&raw)?;
        normalize(&mut result, request);
        if !result.has_content() {
            return Err(AnalysisError::MalformedResponse(
                "model returned no sections".into(),
            ));
        }

        info!(
            "Model {} produced {} sections and {} subsection analyses",
            model,
            result.extracted_sections.len(),
            result.subsection_analysis.len()
        );
        Ok(result)
    }

    /// Analyze, substituting the local fallback for any failure.
    pub async fn analyze_or_fallback(&self, request: &AnalysisRequest) -> AnalysisResult {
        match self.analyze(request).await {
            Ok(result) => result,
            Err(e) => {
                warn!("Analysis of {} failed, using fallback: {}", request.document_name(), e);
                fallback::synthesize(request)
            }
        }
    }
}

/// Fill blanks the model left from the request and order sections by rank.
fn normalize(result: &mut AnalysisResult, request: &AnalysisRequest) {
    let document = request.document_name().to_string();

    let meta = &mut result.metadata;
    if meta.input_documents.is_empty() {
        meta.input_documents = vec![document.clone()];
    }
    if meta.persona.is_empty() {
        meta.persona = request.persona.clone();
    }
    if meta.job_to_be_done.is_empty() {
        meta.job_to_be_done = request.job_to_be_done.clone();
    }
    if meta.processing_timestamp.is_empty() {
        meta.processing_timestamp = timestamp_now();
    }
    if meta.total_pages.is_none() {
        meta.total_pages = request.total_pages();
    }

    let info = &mut result.processing_info;
    if info.files_processed.is_empty() {
        info.files_processed = vec![document.clone()];
    }
    if info.total_files == 0 {
        info.total_files = info.files_processed.len();
    }
    if info.analysis_type.is_empty() {
        info.analysis_type = match request.source {
            AnalysisSource::Pages(_) => PDF_ANALYSIS_TYPE,
            AnalysisSource::Text { .. } => TEXT_ANALYSIS_TYPE,
            AnalysisSource::Metadata(_) => METADATA_ANALYSIS_TYPE,
        }
        .into();
    }
    if info.processed_at.is_empty() {
        info.processed_at = timestamp_now();
    }

    for section in &mut result.extracted_sections {
        if section.document.is_empty() {
            section.document = document.clone();
        }
    }
    result.sort_sections();
}
