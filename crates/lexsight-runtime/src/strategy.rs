//! Per-input-type processing strategies.

use std::sync::Arc;

use async_trait::async_trait;
use lexsight_analyze::{fallback, ContentAnalyzer};
use lexsight_core::{
    AnalysisError, AnalysisRequest, AnalysisResult, AnalysisSource, DocumentInput,
    ExtractionError,
};
use lexsight_extract::{FileType, TextExtractor};

/// How one kind of input is extracted, analyzed and rescued.
#[async_trait]
pub trait ProcessingStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Turn the document into something the analyzer can read.
    async fn extract(&self, doc: &DocumentInput) -> Result<AnalysisSource, ExtractionError>;

    fn analyzer(&self) -> &Arc<ContentAnalyzer>;

    async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisResult, AnalysisError> {
        self.analyzer().analyze(request).await
    }

    /// Local analysis used when [`ProcessingStrategy::analyze`] fails.
    fn fallback(&self, request: &AnalysisRequest) -> AnalysisResult {
        fallback::synthesize(request)
    }
}

/// Page-aware PDF processing.
pub struct PdfStrategy {
    extractor: TextExtractor,
    analyzer: Arc<ContentAnalyzer>,
}

impl PdfStrategy {
    pub fn new(extractor: TextExtractor, analyzer: Arc<ContentAnalyzer>) -> Self {
        Self { extractor, analyzer }
    }
}

#[async_trait]
impl ProcessingStrategy for PdfStrategy {
    fn name(&self) -> &'static str {
        "pdf"
    }

    async fn extract(&self, doc: &DocumentInput) -> Result<AnalysisSource, ExtractionError> {
        let content = self.extractor.extract(doc).await?;
        Ok(AnalysisSource::Pages(content))
    }

    fn analyzer(&self) -> &Arc<ContentAnalyzer> {
        &self.analyzer
    }
}

/// Plain text processing; the whole text is one page.
pub struct TextStrategy {
    extractor: TextExtractor,
    analyzer: Arc<ContentAnalyzer>,
}

impl TextStrategy {
    pub fn new(extractor: TextExtractor, analyzer: Arc<ContentAnalyzer>) -> Self {
        Self { extractor, analyzer }
    }
}

#[async_trait]
impl ProcessingStrategy for TextStrategy {
    fn name(&self) -> &'static str {
        "text"
    }

    async fn extract(&self, doc: &DocumentInput) -> Result<AnalysisSource, ExtractionError> {
        let content = self.extractor.extract(doc).await?;
        Ok(AnalysisSource::Text {
            title: content.file_name,
            text: content.full_text,
        })
    }

    fn analyzer(&self) -> &Arc<ContentAnalyzer> {
        &self.analyzer
    }
}

/// Analysis from file metadata alone, for documents whose text is out of
/// reach.
pub struct MetadataStrategy {
    analyzer: Arc<ContentAnalyzer>,
}

impl MetadataStrategy {
    pub fn new(analyzer: Arc<ContentAnalyzer>) -> Self {
        Self { analyzer }
    }
}

#[async_trait]
impl ProcessingStrategy for MetadataStrategy {
    fn name(&self) -> &'static str {
        "metadata"
    }

    async fn extract(&self, doc: &DocumentInput) -> Result<AnalysisSource, ExtractionError> {
        Ok(AnalysisSource::Metadata(doc.metadata()))
    }

    fn analyzer(&self) -> &Arc<ContentAnalyzer> {
        &self.analyzer
    }
}

/// Pick the strategy for `doc` by its detected file type. Unknown types go
/// to the text strategy, whose extractor reports them as unsupported.
pub fn strategy_for(
    doc: &DocumentInput,
    extractor: &TextExtractor,
    analyzer: &Arc<ContentAnalyzer>,
) -> Box<dyn ProcessingStrategy> {
    match FileType::detect(doc) {
        FileType::Pdf => Box::new(PdfStrategy::new(extractor.clone(), analyzer.clone())),
        FileType::PlainText | FileType::Unknown => {
            Box::new(TextStrategy::new(extractor.clone(), analyzer.clone()))
        }
    }
}
