//! Configuration and data directory management.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_PORT: u16 = 8000;
/// 50 MB, the upload ceiling enforced at the HTTP layer.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 50_000_000;
pub const DEFAULT_JOB_TIMEOUT_SECS: u64 = 300;

/// Paths to LexSight data files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataPaths {
    /// Root data directory (e.g., `data/`).
    pub root: PathBuf,
    /// Uploaded documents awaiting background processing (`data/uploads/`).
    pub uploads: PathBuf,
    /// Analyzer configuration (`data/analyzer-config.json`).
    pub analyzer_config_file: PathBuf,
}

impl DataPaths {
    /// Create data paths from a root directory. Creates directories if needed.
    pub fn new(root: impl AsRef<Path>) -> std::io::Result<Self> {
        let root = root.as_ref().to_path_buf();
        let paths = Self {
            uploads: root.join("uploads"),
            analyzer_config_file: root.join("analyzer-config.json"),
            root,
        };
        std::fs::create_dir_all(&paths.uploads)?;
        Ok(paths)
    }
}

/// Top-level LexSight configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LexSightConfig {
    /// Interface the HTTP server binds to.
    pub host: String,
    /// HTTP server port.
    pub port: u16,
    pub data_paths: DataPaths,
    /// Largest multipart upload accepted by the HTTP layer, in bytes.
    pub max_upload_bytes: usize,
    /// Upper bound on one background job, in seconds.
    pub job_timeout_secs: u64,
    /// Analyze PDFs from file metadata when text extraction fails, instead
    /// of reporting the extraction error.
    pub pdf_metadata_fallback: bool,
}

impl LexSightConfig {
    /// Create configuration from environment and defaults.
    pub fn from_env(data_dir: impl AsRef<Path>) -> std::io::Result<Self> {
        let host = std::env::var("LEXSIGHT_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let port = env_parse("PORT").unwrap_or(DEFAULT_PORT);
        let max_upload_bytes =
            env_parse("LEXSIGHT_MAX_UPLOAD_BYTES").unwrap_or(DEFAULT_MAX_UPLOAD_BYTES);
        let job_timeout_secs =
            env_parse("LEXSIGHT_JOB_TIMEOUT_SECS").unwrap_or(DEFAULT_JOB_TIMEOUT_SECS);
        let pdf_metadata_fallback = std::env::var("LEXSIGHT_PDF_METADATA_FALLBACK")
            .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        let data_paths = DataPaths::new(data_dir)?;

        Ok(Self {
            host,
            port,
            data_paths,
            max_upload_bytes,
            job_timeout_secs,
            pdf_metadata_fallback,
        })
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_paths_creates_upload_dir() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("data");
        let paths = DataPaths::new(&root).unwrap();
        assert!(paths.uploads.is_dir());
        assert_eq!(paths.analyzer_config_file, root.join("analyzer-config.json"));
    }
}
