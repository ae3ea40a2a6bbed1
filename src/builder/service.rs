use super::assembler::SnapshotAssembler;
use super::request::BuildRequest;
use super::snapshot::Snapshot;
use super::BuildError;
use crate::queue::QueueResolver;
use crate::store::ScanStore;

/// JSON-serialized parts of a snapshot, handed to callers that forward the
/// template and pool documents separately.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotJson {
    pub app_template_json: String,
    pub function_pool_json: String,
    pub is_complete: bool,
    pub warnings: Vec<String>,
}

/// Front-end over the assembler that also handles the JSON boundary:
/// parsing build requests and serializing results.
pub struct SnapshotService<Q> {
    assembler: SnapshotAssembler<Q>,
}

impl<Q: QueueResolver> SnapshotService<Q> {
    pub fn new(queues: Q) -> Self {
        Self {
            assembler: SnapshotAssembler::new(queues),
        }
    }

    pub async fn build(
        &mut self,
        store: &dyn ScanStore,
        request: &BuildRequest,
    ) -> Result<Snapshot, BuildError> {
        self.assembler.build(store, request).await
    }

    /// Builds the snapshot and serializes the template and pool separately.
    pub async fn build_as_json(
        &mut self,
        store: &dyn ScanStore,
        request: &BuildRequest,
    ) -> Result<SnapshotJson, BuildError> {
        let snapshot = self.assembler.build(store, request).await?;
        Ok(SnapshotJson {
            app_template_json: serde_json::to_string_pretty(&snapshot.app_template)?,
            function_pool_json: serde_json::to_string_pretty(&snapshot.function_pool)?,
            is_complete: snapshot.is_complete,
            warnings: snapshot.warnings,
        })
    }

    /// Parses a build request from its JSON wire form.
    pub fn parse_request(json: &str) -> Result<BuildRequest, BuildError> {
        serde_json::from_str(json)
            .map_err(|e| BuildError::InvalidRequest(format!("failed to parse build request: {e}")))
    }

    /// Serializes a whole snapshot to pretty-printed JSON.
    pub fn serialize_snapshot(snapshot: &Snapshot) -> Result<String, BuildError> {
        Ok(serde_json::to_string_pretty(snapshot)?)
    }
}
