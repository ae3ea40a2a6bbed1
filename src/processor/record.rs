use super::ScanProcessor;
use crate::scan::RawScan;
use crate::store::ScanRecord;
use chrono::Utc;
use regex::Regex;
use std::sync::OnceLock;
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

/// Matches Maven-style dependency coordinates and captures the artifact id:
/// `com.acme.services:SVC7:[1.0.0,)` -> `SVC7`.
fn dependency_artifact_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[^:]+:([^:]+):").expect("valid dependency pattern"))
}

#[derive(Debug, Error)]
pub enum RecordError {
    #[error("git commit hash cannot be empty")]
    EmptyCommitHash,

    #[error("scanned service has no artifact id")]
    MissingArtifactId,
}

/// Builds storable [`ScanRecord`]s from raw scanner reports: processes the
/// scan data, stamps identity and time, and extracts the declared dependency
/// artifact ids from their coordinates.
#[derive(Debug, Default)]
pub struct ScanRecordFactory {
    processor: ScanProcessor,
}

impl ScanRecordFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_record(&self, raw: &RawScan, git_commit_hash: &str) -> Result<ScanRecord, RecordError> {
        if git_commit_hash.trim().is_empty() {
            return Err(RecordError::EmptyCommitHash);
        }
        if raw.artifact_id.trim().is_empty() {
            return Err(RecordError::MissingArtifactId);
        }

        debug!(
            service = %raw.artifact_id,
            commit = %git_commit_hash,
            classes = raw.class_count,
            methods = raw.method_count,
            "creating scan record"
        );

        let scan = self.processor.process(raw);
        let service_dependencies = extract_service_dependencies(&raw.service_dependencies);

        Ok(ScanRecord {
            scan_id: Uuid::new_v4().to_string(),
            service_id: raw.artifact_id.clone(),
            git_commit_hash: git_commit_hash.to_string(),
            scan_timestamp: Utc::now(),
            is_ui_service: raw.is_ui_service,
            group_id: raw.group_id.clone(),
            version: raw.version.clone(),
            service_dependencies,
            scan,
        })
    }
}

/// Extracts artifact ids from dependency coordinates and joins them
/// comma-separated; `None` when nothing usable remains.
fn extract_service_dependencies(dependencies: &[String]) -> Option<String> {
    let ids: Vec<&str> = dependencies
        .iter()
        .filter_map(|coordinate| match extract_artifact_id(coordinate) {
            Some(id) => Some(id),
            None => {
                if !coordinate.trim().is_empty() {
                    warn!(coordinate = %coordinate, "failed to extract artifact id from dependency");
                }
                None
            }
        })
        .collect();

    if ids.is_empty() {
        None
    } else {
        Some(ids.join(","))
    }
}

fn extract_artifact_id(coordinate: &str) -> Option<&str> {
    dependency_artifact_pattern()
        .captures(coordinate)
        .and_then(|captures| captures.get(1))
        .map(|capture| capture.as_str())
}
