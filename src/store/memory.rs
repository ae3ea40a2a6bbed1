use super::{FailedScanRecord, ScanLookup, ScanRecord, ScanStore, ServiceCommit, StoreError};
use std::collections::HashMap;

/// In-memory scan store for tests and embedding callers.
#[derive(Debug, Default)]
pub struct MemoryScanStore {
    scans: HashMap<(String, String), ScanRecord>,
    failures: HashMap<(String, String), FailedScanRecord>,
}

impl MemoryScanStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scan_count(&self) -> usize {
        self.scans.len()
    }

    pub fn failure_count(&self) -> usize {
        self.failures.len()
    }
}

impl ScanStore for MemoryScanStore {
    fn put_scan(&mut self, record: ScanRecord) -> Result<(), StoreError> {
        let key = (record.service_id.clone(), record.git_commit_hash.clone());
        self.failures.remove(&key);
        self.scans.insert(key, record);
        Ok(())
    }

    fn put_failure(&mut self, record: FailedScanRecord) -> Result<(), StoreError> {
        let key = (record.service_id.clone(), record.git_commit_hash.clone());
        self.scans.remove(&key);
        self.failures.insert(key, record);
        Ok(())
    }

    fn lookup(&self, service_id: &str, git_commit_hash: &str) -> Result<ScanLookup, StoreError> {
        let key = (service_id.to_string(), git_commit_hash.to_string());
        if let Some(record) = self.scans.get(&key) {
            return Ok(ScanLookup::Successful(record.clone()));
        }
        if let Some(record) = self.failures.get(&key) {
            return Ok(ScanLookup::Failed(record.clone()));
        }
        Ok(ScanLookup::NotFound {
            service_id: service_id.to_string(),
            git_commit_hash: git_commit_hash.to_string(),
        })
    }

    fn find_failures(&self, pairs: &[ServiceCommit]) -> Result<Vec<FailedScanRecord>, StoreError> {
        Ok(pairs
            .iter()
            .filter_map(|pair| {
                self.failures
                    .get(&(pair.service_id.clone(), pair.git_commit_hash.clone()))
                    .cloned()
            })
            .collect())
    }

    fn load_for_build(&self, pairs: &[ServiceCommit]) -> Result<Vec<ScanRecord>, StoreError> {
        let mut records = Vec::with_capacity(pairs.len());
        let mut missing = Vec::new();

        for pair in pairs {
            match self
                .scans
                .get(&(pair.service_id.clone(), pair.git_commit_hash.clone()))
            {
                Some(record) => records.push(record.clone()),
                None => missing.push(pair.to_string()),
            }
        }

        if !missing.is_empty() {
            return Err(StoreError::MissingScans { keys: missing });
        }

        Ok(records)
    }
}
