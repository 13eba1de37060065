//! In-memory store of completed analyses.

use lexsight_core::ProcessedDocumentRecord;
use parking_lot::RwLock;
use tracing::{debug, info};

/// Process-local record store, newest first. Contents are lost on restart.
#[derive(Debug, Default)]
pub struct ResultStore {
    records: RwLock<Vec<ProcessedDocumentRecord>>,
}

impl ResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a record and return it as stored, id included.
    ///
    /// A record without an id gets one from the current time in
    /// milliseconds, bumped until it is unique. A record whose id is
    /// already present replaces the old one.
    pub fn store(&self, mut record: ProcessedDocumentRecord) -> ProcessedDocumentRecord {
        let mut records = self.records.write();

        if record.id.is_empty() {
            let mut candidate = chrono::Utc::now().timestamp_millis();
            while records.iter().any(|r| r.id == candidate.to_string()) {
                candidate += 1;
            }
            record.id = candidate.to_string();
        } else if let Some(pos) = records.iter().position(|r| r.id == record.id) {
            debug!("Replacing stored record {}", record.id);
            records.remove(pos);
        }

        info!("Stored analysis {} for {:?}", record.id, record.file_names);
        records.insert(0, record.clone());
        record
    }

    pub fn get_by_id(&self, id: &str) -> Option<ProcessedDocumentRecord> {
        self.records.read().iter().find(|r| r.id == id).cloned()
    }

    /// Remove a record. Returns whether anything was removed; removing an
    /// unknown id is a no-op.
    pub fn remove(&self, id: &str) -> bool {
        let mut records = self.records.write();
        match records.iter().position(|r| r.id == id) {
            Some(pos) => {
                records.remove(pos);
                info!("Removed analysis {}", id);
                true
            }
            None => false,
        }
    }

    /// All records, newest first.
    pub fn list_all(&self) -> Vec<ProcessedDocumentRecord> {
        self.records.read().clone()
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}
