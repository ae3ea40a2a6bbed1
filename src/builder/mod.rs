//! Snapshot assembly
//!
//! Drives one build: load the requested scans, filter recorded failures,
//! order the remaining services by their declared dependencies, walk each
//! service's entry points, and emit the application template plus the
//! function pool.

pub mod assembler;
pub mod order;
pub mod request;
pub mod service;
pub mod snapshot;
pub mod transitive;

pub use assembler::SnapshotAssembler;
pub use request::BuildRequest;
pub use service::{SnapshotJson, SnapshotService};
pub use snapshot::{ChildRef, FailedServiceInfo, FunctionPoolEntry, Snapshot, TemplateNode};
pub use transitive::TransitiveResolver;

use crate::store::StoreError;
use thiserror::Error;

/// Fatal build failures. Per-service scan failures and unresolved queue
/// names are survivable and surface on the [`Snapshot`] instead.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("invalid build request: {0}")]
    InvalidRequest(String),

    #[error("missing scans for services: {0}")]
    MissingScans(String),

    #[error("cyclic dependency detected involving service: {0}")]
    CyclicDependency(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("failed to serialize snapshot: {0}")]
    Serialization(#[from] serde_json::Error),
}
