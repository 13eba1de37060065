//! Shared application state.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use lexsight_analyze::{
    AnalyzerConfig, ChatAssistant, ContentAnalyzer, GeminiClient, GenerativeClient, RiskAnalyzer,
};
use lexsight_core::{AnalysisResult, LexSightConfig};
use lexsight_extract::TextExtractor;
use lexsight_runtime::{DocumentPipeline, PipelineOptions, ResultStore};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Analysis job tracked by the HTTP layer.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisJob {
    pub job_id: String,
    pub kind: JobKind,
    pub status: JobStatus,
    pub files: Vec<String>,
    pub persona: String,
    pub job_to_be_done: String,
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<AnalysisResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JobError>,
    /// Id of the stored record once the job has completed.
    #[serde(skip)]
    pub record_id: Option<String>,
    /// Extracted text, kept as context for risk analysis and chat.
    #[serde(skip)]
    pub source_text: Option<String>,
    #[serde(skip)]
    pub queued_at: i64,
}

impl AnalysisJob {
    pub fn new(job_id: impl Into<String>, files: Vec<String>, persona: &str, job_to_be_done: &str) -> Self {
        Self {
            job_id: job_id.into(),
            kind: JobKind::Analysis,
            status: JobStatus::Pending,
            files,
            persona: persona.to_string(),
            job_to_be_done: job_to_be_done.to_string(),
            created_at: chrono::Utc::now().to_rfc3339(),
            started_at: None,
            completed_at: None,
            result: None,
            error: None,
            record_id: None,
            source_text: None,
            queued_at: crate::jobs::now_millis(),
        }
    }

    pub fn with_kind(mut self, kind: JobKind) -> Self {
        self.kind = kind;
        self
    }

    /// Name of the analyzed document (the first submitted file).
    pub fn document_name(&self) -> &str {
        self.files.first().map(String::as_str).unwrap_or("document")
    }
}

/// What a job does with its files.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum JobKind {
    /// Model analysis of the first file, with local fallbacks.
    #[default]
    Analysis,
    /// Local relevance ranking across every file.
    Collection,
}

impl JobKind {
    pub fn analysis_type(self) -> &'static str {
        match self {
            Self::Analysis => "Legal Document Analysis",
            Self::Collection => lexsight_analyze::ranker::RANKING_ANALYSIS_TYPE,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_finished(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

/// Failure reported on a job, in the API error body shape.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobError {
    pub code: String,
    pub message: String,
}

/// A queued background job whose files wait in the uploads directory.
pub struct JobRequest {
    pub job_id: String,
    pub kind: JobKind,
    pub file_paths: Vec<PathBuf>,
    pub persona: String,
    pub job_to_be_done: String,
}

/// Shared application state accessible from all route handlers.
pub struct AppState {
    pub config: LexSightConfig,
    pub analyzer_config: AnalyzerConfig,
    pub pipeline: DocumentPipeline,
    pub risk_analyzer: RiskAnalyzer,
    pub chat_assistant: ChatAssistant,
    pub jobs: RwLock<HashMap<String, AnalysisJob>>,
    pub job_tx: mpsc::UnboundedSender<JobRequest>,
    job_rx: parking_lot::Mutex<Option<mpsc::UnboundedReceiver<JobRequest>>>,
}

impl AppState {
    /// Build state around an explicit model client and extractor.
    pub fn new(
        config: LexSightConfig,
        analyzer_config: AnalyzerConfig,
        client: Arc<dyn GenerativeClient>,
        extractor: TextExtractor,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();

        let analyzer = Arc::new(ContentAnalyzer::new(client.clone(), analyzer_config.clone()));
        let pipeline = DocumentPipeline::new(extractor, analyzer, Arc::new(ResultStore::new()))
            .with_options(PipelineOptions {
                pdf_metadata_fallback: config.pdf_metadata_fallback,
            });
        let risk_analyzer = RiskAnalyzer::new(client.clone(), analyzer_config.clone());
        let chat_assistant = ChatAssistant::new(client, analyzer_config.clone());

        Self {
            config,
            analyzer_config,
            pipeline,
            risk_analyzer,
            chat_assistant,
            jobs: RwLock::new(HashMap::new()),
            job_tx: tx,
            job_rx: parking_lot::Mutex::new(Some(rx)),
        }
    }

    /// Build state talking to the Gemini service described by the
    /// analyzer config file under the data directory.
    pub fn from_config(config: LexSightConfig) -> anyhow::Result<Self> {
        let analyzer_config = AnalyzerConfig::load(&config.data_paths.analyzer_config_file);
        if !analyzer_config.is_configured() {
            tracing::warn!("No GEMINI_API_KEY configured; analyses will use local fallbacks");
        }
        let client = GeminiClient::new(
            analyzer_config.base_url.clone(),
            analyzer_config.api_key.clone(),
            analyzer_config.request_timeout(),
        )?;
        Ok(Self::new(
            config,
            analyzer_config,
            Arc::new(client),
            TextExtractor::default(),
        ))
    }

    /// Take the job receiver (can only be called once, by the worker).
    pub fn take_job_rx(&self) -> Option<mpsc::UnboundedReceiver<JobRequest>> {
        self.job_rx.lock().take()
    }

    pub fn store(&self) -> &Arc<ResultStore> {
        self.pipeline.store()
    }

    pub fn insert_job(&self, job: AnalysisJob) {
        self.jobs.write().insert(job.job_id.clone(), job);
    }

    pub fn get_job(&self, job_id: &str) -> Option<AnalysisJob> {
        self.jobs.read().get(job_id).cloned()
    }

    /// Apply `f` to a job if it still exists.
    pub fn update_job(&self, job_id: &str, f: impl FnOnce(&mut AnalysisJob)) {
        if let Some(job) = self.jobs.write().get_mut(job_id) {
            f(job);
        }
    }
}
