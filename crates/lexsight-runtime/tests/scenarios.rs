//! End-to-end submissions with in-process fakes for the model service and
//! the PDF backend.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use lexsight_analyze::{AnalyzerConfig, ContentAnalyzer, GenerationParams, GenerativeClient};
use lexsight_core::{
    AnalysisError, DocumentInput, Error, ExtractionError, ProcessingStatus, SubmissionTracker,
};
use lexsight_extract::{PdfBackend, PdfDocument, TextExtractor};
use lexsight_runtime::{DocumentPipeline, PipelineOptions, ResultStore, Submission};
use tokio_util::sync::CancellationToken;

enum Behavior {
    Reply(&'static str),
    Fail,
    Hang,
}

struct FakeModel {
    behavior: Behavior,
    calls: AtomicUsize,
}

impl FakeModel {
    fn new(behavior: Behavior) -> Arc<Self> {
        Arc::new(Self {
            behavior,
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl GenerativeClient for FakeModel {
    fn name(&self) -> &str {
        "fake"
    }

    async fn generate(
        &self,
        _model: &str,
        _prompt: &str,
        _params: &GenerationParams,
    ) -> Result<String, AnalysisError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.behavior {
            Behavior::Reply(text) => Ok(text.to_string()),
            Behavior::Fail => Err(AnalysisError::Request("service unreachable".into())),
            Behavior::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(AnalysisError::Request("unreachable".into()))
            }
        }
    }
}

/// PDF backend whose worker never comes up.
struct BrokenWorker;

impl PdfBackend for BrokenWorker {
    fn name(&self) -> &str {
        "broken"
    }

    fn initialize(&self) -> Result<(), ExtractionError> {
        Err(ExtractionError::WorkerConfiguration(
            "worker source could not be loaded".into(),
        ))
    }

    fn open(&self, _bytes: &[u8]) -> Result<Box<dyn PdfDocument>, ExtractionError> {
        Err(ExtractionError::Pdf("not initialized".into()))
    }
}

fn pipeline_with(
    model: Arc<FakeModel>,
    extractor: TextExtractor,
    options: PipelineOptions,
) -> DocumentPipeline {
    let analyzer = Arc::new(ContentAnalyzer::new(model, AnalyzerConfig::default()));
    DocumentPipeline::new(extractor, analyzer, Arc::new(ResultStore::new())).with_options(options)
}

fn hello_submission() -> Submission {
    Submission::new(
        vec![DocumentInput::from_text("hello.txt", "Hello world.")],
        Some("Student"),
        Some("Summarize"),
    )
}

const VALID_REPLY: &str = r#"{
  "metadata": {"input_documents": ["hello.txt"], "persona": "Student", "job_to_be_done": "Summarize", "total_pages": 1},
  "extracted_sections": [{"document": "hello.txt", "section_title": "Greeting", "importance_rank": 1, "page_number": 1}],
  "subsection_analysis": [{"page_number": 1, "refined_text": "A short greeting to the world."}],
  "processing_info": {"files_processed": ["hello.txt"], "total_files": 1, "analysis_type": "Text Document Analysis"}
}"#;

#[tokio::test]
async fn plain_text_submission_completes() {
    let model = FakeModel::new(Behavior::Reply(VALID_REPLY));
    let pipeline = pipeline_with(model, TextExtractor::default(), PipelineOptions::default());
    let tracker = SubmissionTracker::new();

    let outcome = pipeline
        .process(hello_submission(), &tracker, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(tracker.status(), ProcessingStatus::Completed);
    let result = &outcome.record.result;
    assert_eq!(result.metadata.total_pages, Some(1));
    assert!(!result.extracted_sections.is_empty());
    assert!(!result.is_fallback());
    assert_eq!(outcome.source_text.as_deref(), Some("Hello world."));
    assert_eq!(
        pipeline.store().get_by_id(&outcome.record.id),
        Some(outcome.record.clone())
    );
}

#[tokio::test]
async fn worker_failure_stores_nothing() {
    let model = FakeModel::new(Behavior::Reply(VALID_REPLY));
    let pipeline = pipeline_with(
        model.clone(),
        TextExtractor::new(Arc::new(BrokenWorker)),
        PipelineOptions::default(),
    );
    let tracker = SubmissionTracker::new();
    let submission = Submission::new(
        vec![DocumentInput::new("contract.pdf", "application/pdf", b"%PDF-1.7".to_vec())],
        None,
        None,
    );

    let err = pipeline
        .process(submission, &tracker, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        Error::Extraction(ExtractionError::WorkerConfiguration(_))
    ));
    assert_eq!(tracker.status(), ProcessingStatus::Error);
    assert!(pipeline.store().is_empty());
    assert_eq!(model.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn model_failure_falls_back_and_is_retrievable() {
    let model = FakeModel::new(Behavior::Fail);
    let pipeline = pipeline_with(model.clone(), TextExtractor::default(), PipelineOptions::default());
    let tracker = SubmissionTracker::new();

    let outcome = pipeline
        .process(hello_submission(), &tracker, &CancellationToken::new())
        .await
        .unwrap();

    let result = &outcome.record.result;
    assert!(result.processing_info.analysis_type.contains("(Fallback)"));
    assert!(result.has_content());
    assert_eq!(tracker.status(), ProcessingStatus::Completed);
    // One attempt per configured model, no retries.
    assert_eq!(
        model.calls.load(Ordering::SeqCst),
        AnalyzerConfig::default().analysis_models.len()
    );

    let stored = pipeline.store().get_by_id(&outcome.record.id).unwrap();
    assert!(stored.result.is_fallback());
}

#[tokio::test]
async fn metadata_fallback_rescues_unreadable_pdf() {
    let model = FakeModel::new(Behavior::Fail);
    let pipeline = pipeline_with(
        model,
        TextExtractor::new(Arc::new(BrokenWorker)),
        PipelineOptions {
            pdf_metadata_fallback: true,
        },
    );
    let tracker = SubmissionTracker::new();
    let submission = Submission::new(
        vec![DocumentInput::new("nda_agreement.pdf", "application/pdf", vec![0; 64])],
        Some("Founder"),
        Some("Check confidentiality terms"),
    );

    let outcome = pipeline
        .process(submission, &tracker, &CancellationToken::new())
        .await
        .unwrap();

    let result = &outcome.record.result;
    assert_eq!(result.processing_info.analysis_type, "Basic Document Analysis (Fallback)");
    assert_eq!(result.extracted_sections[0].section_title, "Contract/Agreement Overview");
    assert_eq!(result.metadata.total_pages, None);
    assert!(outcome.source_text.is_none());
}

#[tokio::test]
async fn only_first_file_is_analyzed() {
    let model = FakeModel::new(Behavior::Fail);
    let pipeline = pipeline_with(model, TextExtractor::default(), PipelineOptions::default());
    let submission = Submission::new(
        vec![
            DocumentInput::from_text("first.txt", "First document body."),
            DocumentInput::from_text("second.txt", "Second document body."),
        ],
        None,
        None,
    );

    let outcome = pipeline
        .process(submission, &SubmissionTracker::new(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome.record.file_names, vec!["first.txt", "second.txt"]);
    assert_eq!(outcome.record.result.metadata.input_documents, vec!["first.txt"]);
}

#[tokio::test]
async fn empty_submission_is_rejected() {
    let model = FakeModel::new(Behavior::Fail);
    let pipeline = pipeline_with(model, TextExtractor::default(), PipelineOptions::default());
    let tracker = SubmissionTracker::new();

    let err = pipeline
        .process(Submission::new(Vec::new(), None, None), &tracker, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::NoFiles));
    assert_eq!(tracker.status(), ProcessingStatus::Error);
}

#[tokio::test]
async fn cancellation_interrupts_model_call() {
    let model = FakeModel::new(Behavior::Hang);
    let pipeline = Arc::new(pipeline_with(model, TextExtractor::default(), PipelineOptions::default()));
    let tracker = Arc::new(SubmissionTracker::new());
    let cancel = CancellationToken::new();

    let mut status = tracker.subscribe();
    let task = {
        let pipeline = pipeline.clone();
        let tracker = tracker.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move { pipeline.process(hello_submission(), &tracker, &cancel).await })
    };

    status
        .wait_for(|s| *s == ProcessingStatus::Processing)
        .await
        .unwrap();
    cancel.cancel();

    let err = tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .unwrap()
        .unwrap()
        .unwrap_err();
    assert!(matches!(err, Error::Cancelled));
    assert_eq!(tracker.status(), ProcessingStatus::Error);
    assert!(pipeline.store().is_empty());
}

#[tokio::test]
async fn collection_ranks_every_readable_file_without_the_model() {
    let model = FakeModel::new(Behavior::Fail);
    let pipeline = pipeline_with(model.clone(), TextExtractor::default(), PipelineOptions::default());
    let tracker = SubmissionTracker::new();
    let submission = Submission::new(
        vec![
            DocumentInput::from_text(
                "lease.txt",
                "Termination\nEither party may terminate this lease with sixty days written notice. Early termination by the Tenant costs two months rent.",
            ),
            DocumentInput::from_text("blank.txt", "   "),
            DocumentInput::from_text(
                "house_rules.txt",
                "Quiet Hours\nResidents keep noise down between ten at night and seven in the morning on every day of the week.",
            ),
        ],
        Some("Tenant"),
        Some("Understand early termination"),
    );

    let outcome = pipeline
        .process_collection(submission, &tracker, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(tracker.status(), ProcessingStatus::Completed);
    assert_eq!(model.calls.load(Ordering::SeqCst), 0);

    let result = &outcome.record.result;
    assert_eq!(result.processing_info.analysis_type, "Persona Relevance Ranking");
    assert_eq!(result.metadata.input_documents, vec!["lease.txt", "house_rules.txt"]);
    assert_eq!(result.extracted_sections[0].section_title, "Termination");
    assert!(result
        .extracted_sections
        .iter()
        .any(|s| s.document == "house_rules.txt"));
    assert_eq!(
        outcome.record.file_names,
        vec!["lease.txt", "blank.txt", "house_rules.txt"]
    );

    let source = outcome.source_text.unwrap();
    assert!(source.starts_with("=== lease.txt ===\nTermination"));
    assert!(source.contains("=== house_rules.txt ==="));
    assert_eq!(
        pipeline.store().get_by_id(&outcome.record.id).map(|r| r.result),
        Some(outcome.record.result.clone())
    );
}

#[tokio::test]
async fn collection_without_readable_files_reports_extraction_error() {
    let model = FakeModel::new(Behavior::Fail);
    let pipeline = pipeline_with(model, TextExtractor::default(), PipelineOptions::default());
    let tracker = SubmissionTracker::new();
    let submission = Submission::new(
        vec![
            DocumentInput::from_text("blank.txt", " "),
            DocumentInput::from_text("empty.txt", ""),
        ],
        None,
        None,
    );

    let err = pipeline
        .process_collection(submission, &tracker, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Extraction(ExtractionError::EmptyContent)));
    assert_eq!(tracker.status(), ProcessingStatus::Error);
    assert!(pipeline.store().is_empty());
}
