//! Submission pipeline: extract → analyze → fallback → store.

use std::sync::Arc;

use lexsight_analyze::{ContentAnalyzer, RelevanceRanker};
use lexsight_core::{
    AnalysisRequest, AnalysisSource, DocumentInput, Error, ExtractedContent, ExtractionError,
    ProcessedDocumentRecord, ProcessingStatus, Result, SubmissionTracker, DEFAULT_JOB_TO_BE_DONE,
    DEFAULT_PERSONA,
};
use lexsight_extract::{FileType, TextExtractor};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::store::ResultStore;
use crate::strategy::{self, MetadataStrategy, ProcessingStrategy};

#[derive(Debug, Clone, Default)]
pub struct PipelineOptions {
    /// When PDF text extraction fails, analyze the file's metadata instead
    /// of reporting the extraction error.
    pub pdf_metadata_fallback: bool,
}

/// Files plus the persona and goal that drive the analysis.
#[derive(Debug, Clone)]
pub struct Submission {
    pub files: Vec<DocumentInput>,
    pub persona: String,
    pub job_to_be_done: String,
}

impl Submission {
    /// Blank persona or goal fall back to the legal-analysis defaults.
    pub fn new(files: Vec<DocumentInput>, persona: Option<&str>, job_to_be_done: Option<&str>) -> Self {
        let pick = |value: Option<&str>, default: &str| {
            value
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .unwrap_or(default)
                .to_string()
        };
        Self {
            files,
            persona: pick(persona, DEFAULT_PERSONA),
            job_to_be_done: pick(job_to_be_done, DEFAULT_JOB_TO_BE_DONE),
        }
    }

    pub fn file_names(&self) -> Vec<String> {
        self.files.iter().map(|f| f.name.clone()).collect()
    }
}

/// A stored analysis plus the text it was made from, if any.
#[derive(Debug, Clone)]
pub struct ProcessOutcome {
    pub record: ProcessedDocumentRecord,
    pub source_text: Option<String>,
}

/// Runs submissions and stores their results.
pub struct DocumentPipeline {
    extractor: TextExtractor,
    analyzer: Arc<ContentAnalyzer>,
    ranker: RelevanceRanker,
    store: Arc<ResultStore>,
    options: PipelineOptions,
}

impl DocumentPipeline {
    pub fn new(extractor: TextExtractor, analyzer: Arc<ContentAnalyzer>, store: Arc<ResultStore>) -> Self {
        Self {
            extractor,
            analyzer,
            ranker: RelevanceRanker::default(),
            store,
            options: PipelineOptions::default(),
        }
    }

    pub fn with_options(mut self, options: PipelineOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_ranker(mut self, ranker: RelevanceRanker) -> Self {
        self.ranker = ranker;
        self
    }

    pub fn store(&self) -> &Arc<ResultStore> {
        &self.store
    }

    pub fn analyzer(&self) -> &Arc<ContentAnalyzer> {
        &self.analyzer
    }

    /// Process a submission to completion.
    ///
    /// Only the first file is analyzed. Extraction failures end the run in
    /// `Error` and store nothing; analysis failures are replaced by the
    /// local fallback. Cancelling `cancel` between or during stages ends
    /// the run with [`Error::Cancelled`].
    pub async fn process(
        &self,
        submission: Submission,
        tracker: &SubmissionTracker,
        cancel: &CancellationToken,
    ) -> Result<ProcessOutcome> {
        let outcome = self.run(submission, tracker, cancel).await;
        if let Err(e) = &outcome {
            error!("Submission failed: {}", e);
            if !tracker.status().is_terminal() {
                tracker.transition(ProcessingStatus::Error)?;
            }
        }
        outcome
    }

    /// Rank the sections of every submitted file against the persona and
    /// goal, without the model.
    ///
    /// Files whose text cannot be read are skipped; the run fails with the
    /// first extraction error only when no file can be read.
    pub async fn process_collection(
        &self,
        submission: Submission,
        tracker: &SubmissionTracker,
        cancel: &CancellationToken,
    ) -> Result<ProcessOutcome> {
        let outcome = self.run_collection(submission, tracker, cancel).await;
        if let Err(e) = &outcome {
            error!("Collection failed: {}", e);
            if !tracker.status().is_terminal() {
                tracker.transition(ProcessingStatus::Error)?;
            }
        }
        outcome
    }

    async fn run_collection(
        &self,
        submission: Submission,
        tracker: &SubmissionTracker,
        cancel: &CancellationToken,
    ) -> Result<ProcessOutcome> {
        if submission.files.is_empty() {
            return Err(Error::NoFiles);
        }
        tracker.transition(ProcessingStatus::Uploading)?;
        info!(
            "Ranking {} files for '{}': {}",
            submission.files.len(),
            submission.persona,
            submission.job_to_be_done
        );

        ensure_live(cancel)?;
        tracker.transition(ProcessingStatus::Processing)?;

        let mut documents: Vec<ExtractedContent> = Vec::with_capacity(submission.files.len());
        let mut first_error = None;
        for doc in &submission.files {
            let extracted = tokio::select! {
                _ = cancel.cancelled() => return Err(Error::Cancelled),
                result = self.extractor.extract(doc) => result,
            };
            match extracted {
                Ok(content) => documents.push(content),
                Err(e) => {
                    warn!("Skipping {} in collection: {}", doc.name, e.user_guidance());
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
            }
        }
        if documents.is_empty() {
            return Err(first_error.map(Error::from).unwrap_or(Error::NoFiles));
        }

        let result = self
            .ranker
            .rank(&documents, &submission.persona, &submission.job_to_be_done);
        ensure_live(cancel)?;

        let source_text = documents
            .iter()
            .map(|d| format!("=== {} ===\n{}", d.file_name, d.full_text))
            .collect::<Vec<_>>()
            .join("\n\n");

        let record = self.store.store(ProcessedDocumentRecord::new(
            submission.file_names(),
            submission.persona,
            submission.job_to_be_done,
            result,
        ));

        tracker.transition(ProcessingStatus::Completed)?;
        info!(
            "Ranked collection as {} ({} of {} files read)",
            record.id,
            documents.len(),
            submission.files.len()
        );

        Ok(ProcessOutcome {
            record,
            source_text: Some(source_text),
        })
    }

    async fn run(
        &self,
        submission: Submission,
        tracker: &SubmissionTracker,
        cancel: &CancellationToken,
    ) -> Result<ProcessOutcome> {
        if submission.files.is_empty() {
            return Err(Error::NoFiles);
        }
        tracker.transition(ProcessingStatus::Uploading)?;

        let file_names = submission.file_names();
        if submission.files.len() > 1 {
            warn!(
                "{} files submitted; only {} will be analyzed",
                submission.files.len(),
                file_names[0]
            );
        }
        let doc = &submission.files[0];
        info!(
            "Processing {} for '{}': {}",
            doc.name, submission.persona, submission.job_to_be_done
        );

        ensure_live(cancel)?;
        tracker.transition(ProcessingStatus::Processing)?;

        let (strategy, source) = self.extract(doc, cancel).await?;

        let request = AnalysisRequest::new(
            submission.persona.clone(),
            submission.job_to_be_done.clone(),
            source,
        );

        let analysis = tokio::select! {
            _ = cancel.cancelled() => return Err(Error::Cancelled),
            result = strategy.analyze(&request) => result,
        };
        let result = match analysis {
            Ok(result) => result,
            Err(e) => {
                warn!("{} analysis of {} failed, using fallback: {}", strategy.name(), doc.name, e);
                strategy.fallback(&request)
            }
        };

        ensure_live(cancel)?;

        let source_text = match request.source {
            AnalysisSource::Pages(content) => Some(content.full_text),
            AnalysisSource::Text { text, .. } => Some(text),
            AnalysisSource::Metadata(_) => None,
        };

        let record = ProcessedDocumentRecord::new(
            file_names,
            submission.persona,
            submission.job_to_be_done,
            result,
        );
        let record = self.store.store(record);

        tracker.transition(ProcessingStatus::Completed)?;
        info!(
            "Completed {} as {} ({})",
            doc.name, record.id, record.result.processing_info.analysis_type
        );

        Ok(ProcessOutcome {
            record,
            source_text,
        })
    }

    /// Extract with the strategy for `doc`, switching PDFs to metadata
    /// analysis when that is enabled and their text cannot be read.
    async fn extract(
        &self,
        doc: &DocumentInput,
        cancel: &CancellationToken,
    ) -> Result<(Box<dyn ProcessingStrategy>, AnalysisSource)> {
        let strategy = strategy::strategy_for(doc, &self.extractor, &self.analyzer);

        let extracted = tokio::select! {
            _ = cancel.cancelled() => return Err(Error::Cancelled),
            result = strategy.extract(doc) => result,
        };

        match extracted {
            Ok(source) => Ok((strategy, source)),
            Err(e) if self.can_use_metadata(doc, &e) => {
                warn!("Text extraction failed for {} ({}); analyzing metadata only", doc.name, e);
                let metadata: Box<dyn ProcessingStrategy> =
                    Box::new(MetadataStrategy::new(self.analyzer.clone()));
                let source = metadata.extract(doc).await?;
                Ok((metadata, source))
            }
            Err(e) => {
                warn!("Extraction failed for {}: {}", doc.name, e.user_guidance());
                Err(e.into())
            }
        }
    }

    fn can_use_metadata(&self, doc: &DocumentInput, e: &ExtractionError) -> bool {
        self.options.pdf_metadata_fallback
            && FileType::detect(doc) == FileType::Pdf
            && !matches!(e, ExtractionError::UnsupportedFileType(_))
    }
}

fn ensure_live(cancel: &CancellationToken) -> Result<()> {
    if cancel.is_cancelled() {
        Err(Error::Cancelled)
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_submission_defaults() {
        let submission = Submission::new(Vec::new(), Some("  "), None);
        assert_eq!(submission.persona, DEFAULT_PERSONA);
        assert_eq!(submission.job_to_be_done, DEFAULT_JOB_TO_BE_DONE);

        let submission = Submission::new(Vec::new(), Some(" Student "), Some("Summarize"));
        assert_eq!(submission.persona, "Student");
        assert_eq!(submission.job_to_be_done, "Summarize");
    }
}
