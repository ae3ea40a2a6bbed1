use super::{FailedScanRecord, ScanLookup, ScanRecord, ScanStore, ServiceCommit, StoreError};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

const SCAN_SUFFIX: &str = ".scan.json";
const FAILURE_SUFFIX: &str = ".failure.json";

/// Scan store persisting one JSON document per record under a directory.
///
/// File names are derived from the (service, commit) pair with filesystem
/// separators and other special characters replaced, so records remain
/// addressable without an index file.
#[derive(Debug, Clone)]
pub struct JsonDirStore {
    dir: PathBuf,
}

impl JsonDirStore {
    /// Opens a store rooted at `dir`, creating the directory if needed.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn scan_path(&self, service_id: &str, git_commit_hash: &str) -> PathBuf {
        self.dir
            .join(format!("{}{}", file_stem(service_id, git_commit_hash), SCAN_SUFFIX))
    }

    fn failure_path(&self, service_id: &str, git_commit_hash: &str) -> PathBuf {
        self.dir
            .join(format!("{}{}", file_stem(service_id, git_commit_hash), FAILURE_SUFFIX))
    }

    fn read_scan(&self, service_id: &str, git_commit_hash: &str) -> Result<Option<ScanRecord>, StoreError> {
        read_json(&self.scan_path(service_id, git_commit_hash))
    }

    fn read_failure(
        &self,
        service_id: &str,
        git_commit_hash: &str,
    ) -> Result<Option<FailedScanRecord>, StoreError> {
        read_json(&self.failure_path(service_id, git_commit_hash))
    }
}

fn file_stem(service_id: &str, git_commit_hash: &str) -> String {
    format!("{}@{}", sanitize(service_id), sanitize(git_commit_hash))
}

fn sanitize(part: &str) -> String {
    part.replace(['/', '\\', ':', '*', '?', '"', '<', '>', '|'], "_")
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Option<T>, StoreError> {
    match fs::read_to_string(path) {
        Ok(contents) => Ok(Some(serde_json::from_str(&contents)?)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    fs::write(path, serde_json::to_string_pretty(value)?)?;
    Ok(())
}

fn remove_if_present(path: &Path) -> Result<(), StoreError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

impl ScanStore for JsonDirStore {
    fn put_scan(&mut self, record: ScanRecord) -> Result<(), StoreError> {
        debug!(service = %record.service_id, commit = %record.git_commit_hash, "storing scan record");
        remove_if_present(&self.failure_path(&record.service_id, &record.git_commit_hash))?;
        write_json(&self.scan_path(&record.service_id, &record.git_commit_hash), &record)
    }

    fn put_failure(&mut self, record: FailedScanRecord) -> Result<(), StoreError> {
        debug!(service = %record.service_id, commit = %record.git_commit_hash, "storing failure record");
        remove_if_present(&self.scan_path(&record.service_id, &record.git_commit_hash))?;
        write_json(&self.failure_path(&record.service_id, &record.git_commit_hash), &record)
    }

    fn lookup(&self, service_id: &str, git_commit_hash: &str) -> Result<ScanLookup, StoreError> {
        if let Some(record) = self.read_scan(service_id, git_commit_hash)? {
            return Ok(ScanLookup::Successful(record));
        }
        if let Some(record) = self.read_failure(service_id, git_commit_hash)? {
            return Ok(ScanLookup::Failed(record));
        }
        Ok(ScanLookup::NotFound {
            service_id: service_id.to_string(),
            git_commit_hash: git_commit_hash.to_string(),
        })
    }

    fn find_failures(&self, pairs: &[ServiceCommit]) -> Result<Vec<FailedScanRecord>, StoreError> {
        let mut failures = Vec::new();
        for pair in pairs {
            if let Some(record) = self.read_failure(&pair.service_id, &pair.git_commit_hash)? {
                failures.push(record);
            }
        }
        Ok(failures)
    }

    fn load_for_build(&self, pairs: &[ServiceCommit]) -> Result<Vec<ScanRecord>, StoreError> {
        let mut records = Vec::with_capacity(pairs.len());
        let mut missing = Vec::new();

        for pair in pairs {
            match self.read_scan(&pair.service_id, &pair.git_commit_hash)? {
                Some(record) => records.push(record),
                None => missing.push(pair.to_string()),
            }
        }

        if !missing.is_empty() {
            return Err(StoreError::MissingScans { keys: missing });
        }

        Ok(records)
    }
}
