pub mod builder;
pub mod cli;
pub mod config;
pub mod processor;
pub mod queue;
pub mod scan;
pub mod store;

pub use builder::{
    BuildError, BuildRequest, ChildRef, FailedServiceInfo, FunctionPoolEntry, Snapshot,
    SnapshotAssembler, SnapshotJson, SnapshotService, TemplateNode, TransitiveResolver,
};
pub use config::{ConfigError, DepsnapConfig};
pub use processor::{
    Dependencies, IngestError, ProcessedScan, ScanIngestService, ScanProcessor, ScanRecordFactory,
    ServiceCall, UNKNOWN_TOPIC_PLACEHOLDER,
};
pub use queue::{HttpQueueResolver, QueueResolver, StaticQueueResolver};
pub use scan::RawScan;
pub use store::{
    FailedScanRecord, JsonDirStore, MemoryScanStore, ScanErrorType, ScanLookup, ScanRecord,
    ScanStore, ServiceCommit, StoreError,
};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
