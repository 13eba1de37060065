//! LexSight Runtime: runs submissions through extract → analyze →
//! fallback → store, and keeps completed analyses in memory.

pub mod pipeline;
pub mod store;
pub mod strategy;

pub use pipeline::{DocumentPipeline, PipelineOptions, ProcessOutcome, Submission};
pub use store::ResultStore;
pub use strategy::{MetadataStrategy, PdfStrategy, ProcessingStrategy, TextStrategy};
