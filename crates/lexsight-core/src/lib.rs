//! LexSight Core: document and analysis types, error taxonomy, processing
//! status machine and configuration shared by every pipeline stage.

pub mod config;
pub mod error;
pub mod status;
pub mod types;

pub use config::{DataPaths, LexSightConfig};
pub use error::{AnalysisError, Error, ExtractionError, Result};
pub use status::{ProcessingStatus, SubmissionTracker};
pub use types::*;
