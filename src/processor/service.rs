use super::record::{RecordError, ScanRecordFactory};
use crate::scan::RawScan;
use crate::store::{
    FailedScanRecord, ScanErrorType, ScanLookup, ScanRecord, ScanStore, StoreError,
};
use chrono::Utc;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error(transparent)]
    Record(#[from] RecordError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Orchestrates the scan ingestion workflow: processing raw reports into
/// stored records, recording failures, and looking up stored state.
///
/// Storing a success clears any failure for the same (service, commit) pair
/// and vice versa, so a pair is always in exactly one state.
#[derive(Debug, Default)]
pub struct ScanIngestService {
    factory: ScanRecordFactory,
}

impl ScanIngestService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Processes a raw scan and stores the resulting record, replacing any
    /// previous scan or failure for the same (service, commit) pair.
    pub fn process_and_store(
        &self,
        store: &mut dyn ScanStore,
        raw: &RawScan,
        git_commit_hash: &str,
    ) -> Result<ScanRecord, IngestError> {
        info!(
            service = %raw.artifact_id,
            commit = %git_commit_hash,
            "processing and storing scan"
        );

        let record = self.factory.create_record(raw, git_commit_hash)?;
        store.put_scan(record.clone())?;
        Ok(record)
    }

    /// Records a failed scan attempt, replacing any previous scan or failure
    /// for the same (service, commit) pair.
    #[allow(clippy::too_many_arguments)]
    pub fn record_failure(
        &self,
        store: &mut dyn ScanStore,
        service_id: &str,
        git_commit_hash: &str,
        group_id: Option<String>,
        version: Option<String>,
        error_type: ScanErrorType,
        error_message: &str,
        detail: Option<String>,
    ) -> Result<FailedScanRecord, IngestError> {
        warn!(
            service = %service_id,
            commit = %git_commit_hash,
            error = %error_message,
            "recording scan failure"
        );

        let record = FailedScanRecord {
            failure_id: Uuid::new_v4().to_string(),
            service_id: service_id.to_string(),
            git_commit_hash: git_commit_hash.to_string(),
            failure_timestamp: Utc::now(),
            group_id,
            version,
            error_type,
            error_message: error_message.to_string(),
            detail,
        };

        store.put_failure(record.clone())?;
        Ok(record)
    }

    /// Looks a (service, commit) pair up in both the scan and failure tables.
    pub fn find_by_service_and_commit(
        &self,
        store: &dyn ScanStore,
        service_id: &str,
        git_commit_hash: &str,
    ) -> Result<ScanLookup, IngestError> {
        Ok(store.lookup(service_id, git_commit_hash)?)
    }

    /// Whether a failure is on record for the pair.
    pub fn has_failed_scan(
        &self,
        store: &dyn ScanStore,
        service_id: &str,
        git_commit_hash: &str,
    ) -> Result<bool, IngestError> {
        Ok(store.lookup(service_id, git_commit_hash)?.is_failed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryScanStore;

    fn raw(artifact_id: &str) -> RawScan {
        RawScan {
            artifact_id: artifact_id.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn process_and_store_round_trips() {
        let service = ScanIngestService::new();
        let mut store = MemoryScanStore::new();

        let record = service
            .process_and_store(&mut store, &raw("SVC1"), "c1")
            .unwrap();
        assert_eq!(record.service_id, "SVC1");

        let lookup = service
            .find_by_service_and_commit(&store, "SVC1", "c1")
            .unwrap();
        assert!(lookup.is_successful());
    }

    #[test]
    fn successful_scan_clears_previous_failure() {
        let service = ScanIngestService::new();
        let mut store = MemoryScanStore::new();

        service
            .record_failure(
                &mut store,
                "SVC1",
                "c1",
                None,
                None,
                ScanErrorType::ScanError,
                "scanner crashed",
                None,
            )
            .unwrap();
        assert!(service.has_failed_scan(&store, "SVC1", "c1").unwrap());

        service
            .process_and_store(&mut store, &raw("SVC1"), "c1")
            .unwrap();
        assert!(!service.has_failed_scan(&store, "SVC1", "c1").unwrap());
    }

    #[test]
    fn failure_replaces_previous_scan() {
        let service = ScanIngestService::new();
        let mut store = MemoryScanStore::new();

        service
            .process_and_store(&mut store, &raw("SVC1"), "c1")
            .unwrap();
        let record = service
            .record_failure(
                &mut store,
                "SVC1",
                "c1",
                Some("com.acme.services".to_string()),
                Some("1.0.0".to_string()),
                ScanErrorType::ProcessingError,
                "transformation failed",
                Some("stack trace".to_string()),
            )
            .unwrap();

        assert_eq!(record.error_type, ScanErrorType::ProcessingError);
        let lookup = service
            .find_by_service_and_commit(&store, "SVC1", "c1")
            .unwrap();
        assert!(lookup.is_failed());
    }

    #[test]
    fn invalid_raw_scan_is_rejected_before_storage() {
        let service = ScanIngestService::new();
        let mut store = MemoryScanStore::new();

        let err = service
            .process_and_store(&mut store, &raw(""), "c1")
            .unwrap_err();
        assert!(matches!(err, IngestError::Record(_)));
        assert_eq!(store.scan_count(), 0);
    }
}
