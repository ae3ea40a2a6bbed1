//! Scan store seam
//!
//! The assembler reads processed scans and failure records through the
//! [`ScanStore`] trait; ingestion writes through it. Two implementations are
//! provided: [`MemoryScanStore`] for tests and embedding, and
//! [`JsonDirStore`] persisting one JSON document per record under a
//! directory.
//!
//! A (service_id, git_commit_hash) pair is either a successful scan or a
//! recorded failure, never both: each write clears the other side.

pub mod json_dir;
pub mod memory;

pub use json_dir::JsonDirStore;
pub use memory::MemoryScanStore;

use crate::processor::ProcessedScan;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// A pinned (service, revision) pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceCommit {
    pub service_id: String,
    pub git_commit_hash: String,
}

impl ServiceCommit {
    pub fn new(service_id: impl Into<String>, git_commit_hash: impl Into<String>) -> Self {
        Self {
            service_id: service_id.into(),
            git_commit_hash: git_commit_hash.into(),
        }
    }
}

impl fmt::Display for ServiceCommit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.service_id, self.git_commit_hash)
    }
}

/// Category of a recorded scan failure.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScanErrorType {
    ScanError,
    ParseError,
    CodeViolation,
    ProcessingError,
    #[default]
    Unknown,
}

impl fmt::Display for ScanErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ScanErrorType::ScanError => "SCAN_ERROR",
            ScanErrorType::ParseError => "PARSE_ERROR",
            ScanErrorType::CodeViolation => "CODE_VIOLATION",
            ScanErrorType::ProcessingError => "PROCESSING_ERROR",
            ScanErrorType::Unknown => "UNKNOWN",
        };
        f.write_str(label)
    }
}

impl std::str::FromStr for ScanErrorType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "SCAN_ERROR" => Ok(ScanErrorType::ScanError),
            "PARSE_ERROR" => Ok(ScanErrorType::ParseError),
            "CODE_VIOLATION" => Ok(ScanErrorType::CodeViolation),
            "PROCESSING_ERROR" => Ok(ScanErrorType::ProcessingError),
            "UNKNOWN" => Ok(ScanErrorType::Unknown),
            other => Err(format!("unrecognized error type: {other}")),
        }
    }
}

/// A successfully processed scan pinned to a revision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanRecord {
    pub scan_id: String,
    pub service_id: String,
    pub git_commit_hash: String,
    pub scan_timestamp: DateTime<Utc>,
    pub is_ui_service: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Comma-separated declared dependency artifact ids.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_dependencies: Option<String>,
    pub scan: ProcessedScan,
}

/// A recorded scan failure pinned to a revision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedScanRecord {
    pub failure_id: String,
    pub service_id: String,
    pub git_commit_hash: String,
    pub failure_timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    pub error_type: ScanErrorType,
    pub error_message: String,
    /// Longer diagnostic text, e.g. a captured error chain.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Three-way outcome of looking up a (service, revision) pair.
#[derive(Debug, Clone, PartialEq)]
pub enum ScanLookup {
    Successful(ScanRecord),
    Failed(FailedScanRecord),
    NotFound { service_id: String, git_commit_hash: String },
}

impl ScanLookup {
    pub fn is_successful(&self) -> bool {
        matches!(self, ScanLookup::Successful(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, ScanLookup::Failed(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ScanLookup::NotFound { .. })
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    /// Requested pairs with no successful scan on record. A data error, not
    /// an expected partial-failure mode.
    #[error("missing scans for services: {}", keys.join(", "))]
    MissingScans { keys: Vec<String> },

    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Storage seam for processed scans and failure records.
pub trait ScanStore {
    /// Stores a successful scan, replacing any record for the same pair and
    /// clearing any failure record for it.
    fn put_scan(&mut self, record: ScanRecord) -> Result<(), StoreError>;

    /// Stores a failure record, replacing any record for the same pair and
    /// clearing any successful scan for it.
    fn put_failure(&mut self, record: FailedScanRecord) -> Result<(), StoreError>;

    /// Looks a pair up in both tables.
    fn lookup(&self, service_id: &str, git_commit_hash: &str) -> Result<ScanLookup, StoreError>;

    /// Failure records among the given pairs, in pair order.
    fn find_failures(&self, pairs: &[ServiceCommit]) -> Result<Vec<FailedScanRecord>, StoreError>;

    /// Successful scans for the given pairs, in pair order. Fails with
    /// [`StoreError::MissingScans`] if any pair has no scan on record.
    fn load_for_build(&self, pairs: &[ServiceCommit]) -> Result<Vec<ScanRecord>, StoreError>;
}
