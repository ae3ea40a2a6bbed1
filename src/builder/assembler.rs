//! Snapshot assembler
//!
//! One `build` call runs sequentially: clear the queue cache, filter
//! recorded failures, load the remaining scans, order them by declared
//! dependencies, then walk each service's entry points in order. Regular
//! services populate the function pool and contribute function refs to the
//! template root; UI services contribute container/method subtrees.

use super::order::order_services;
use super::request::BuildRequest;
use super::snapshot::{FailedServiceInfo, FunctionPoolEntry, Snapshot, TemplateNode};
use super::transitive::TransitiveResolver;
use super::BuildError;
use crate::processor::Dependencies;
use crate::queue::QueueResolver;
use crate::store::{ScanRecord, ScanStore, ServiceCommit, StoreError};
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::{debug, info, warn};

/// Assembles snapshots from stored scans. Each assembler owns its queue
/// resolver, so concurrent builds on separate assemblers share no mutable
/// state.
pub struct SnapshotAssembler<Q> {
    queues: Q,
}

impl<Q: QueueResolver> SnapshotAssembler<Q> {
    pub fn new(queues: Q) -> Self {
        Self { queues }
    }

    /// Builds the snapshot for the given request against the given store.
    ///
    /// Services with recorded scan failures are excluded and reported on the
    /// snapshot; the build fails only on an invalid request, a missing scan
    /// for a non-failed service, or a dependency cycle within the build set.
    pub async fn build(
        &mut self,
        store: &dyn ScanStore,
        request: &BuildRequest,
    ) -> Result<Snapshot, BuildError> {
        request.validate()?;

        info!(
            app = %request.app_name,
            services = request.services.len(),
            "starting snapshot build"
        );

        self.queues.clear_cache();

        let failures = store.find_failures(&request.services)?;
        let failed_service_ids: HashSet<&str> =
            failures.iter().map(|f| f.service_id.as_str()).collect();

        let mut failed_services = Vec::new();
        let mut warnings = Vec::new();
        for failure in &failures {
            warnings.push(format!(
                "Service {}@{} has a failed scan: {}",
                failure.service_id, failure.git_commit_hash, failure.error_message
            ));
            failed_services.push(FailedServiceInfo {
                service_id: failure.service_id.clone(),
                git_commit_hash: failure.git_commit_hash.clone(),
                error_type: failure.error_type,
                error_message: failure.error_message.clone(),
            });
        }

        let valid_pairs: Vec<ServiceCommit> = request
            .services
            .iter()
            .filter(|pair| !failed_service_ids.contains(pair.service_id.as_str()))
            .cloned()
            .collect();

        let scans = if valid_pairs.is_empty() {
            warn!(app = %request.app_name, "all requested services have failed scans");
            HashMap::new()
        } else {
            let records = store.load_for_build(&valid_pairs).map_err(|e| match e {
                StoreError::MissingScans { keys } => BuildError::MissingScans(keys.join(", ")),
                other => BuildError::Store(other),
            })?;
            records
                .into_iter()
                .map(|record| (record.service_id.clone(), record))
                .collect::<HashMap<String, ScanRecord>>()
        };

        let mut seed = Vec::new();
        for pair in &valid_pairs {
            if !seed.contains(&pair.service_id) {
                seed.push(pair.service_id.clone());
            }
        }

        let sorted = order_services(&seed, &scans)?;
        debug!(order = ?sorted, "processing services in dependency order");

        let resolver = TransitiveResolver::new(&scans);

        let mut pool: BTreeMap<String, FunctionPoolEntry> = BTreeMap::new();
        let mut root_children: Vec<TemplateNode> = Vec::new();
        let mut added_function_refs: HashSet<String> = HashSet::new();

        for service_id in &sorted {
            let record = match scans.get(service_id) {
                Some(record) => record,
                None => continue,
            };

            if record.is_ui_service {
                if let Some(container) = self.assemble_ui_service(record, &resolver).await {
                    root_children.push(container);
                }
            } else {
                self.assemble_regular_service(
                    record,
                    &request.app_name,
                    &resolver,
                    &mut pool,
                    &mut root_children,
                    &mut added_function_refs,
                )
                .await;
            }
        }

        let is_complete = failed_services.is_empty();
        if is_complete {
            info!(
                app = %request.app_name,
                functions = pool.len(),
                "snapshot build complete"
            );
        } else {
            warn!(
                app = %request.app_name,
                functions = pool.len(),
                failed_services = failed_services.len(),
                "snapshot build completed with failures"
            );
        }

        Ok(Snapshot {
            app_template: TemplateNode::app(request.app_name.clone(), root_children),
            function_pool: pool,
            is_complete,
            failed_services,
            warnings,
        })
    }

    async fn assemble_regular_service(
        &mut self,
        record: &ScanRecord,
        app_name: &str,
        resolver: &TransitiveResolver,
        pool: &mut BTreeMap<String, FunctionPoolEntry>,
        root_children: &mut Vec<TemplateNode>,
        added_function_refs: &mut HashSet<String>,
    ) {
        let scan = &record.scan;
        if scan.function_mappings.is_empty() {
            debug!(service = %record.service_id, "dependency-only service, no exposed functions");
            return;
        }

        for function_name in scan.function_mappings.keys() {
            let entry = pool
                .entry(function_name.clone())
                .or_insert_with(|| FunctionPoolEntry::for_app(app_name));

            if let Some(deps) = scan.children_of(function_name) {
                attach_dependencies(deps, entry, resolver, &mut self.queues).await;
            }

            let dedup_key = function_name.to_lowercase();
            if !added_function_refs.contains(&dedup_key) {
                root_children.push(TemplateNode::function_ref(function_name.clone()));
                added_function_refs.insert(dedup_key);
            }
        }

        debug!(
            service = %record.service_id,
            functions = scan.function_mappings.len(),
            "processed regular service"
        );
    }

    async fn assemble_ui_service(
        &mut self,
        record: &ScanRecord,
        resolver: &TransitiveResolver,
    ) -> Option<TemplateNode> {
        let scan = &record.scan;
        if scan.ui_method_mappings.is_empty() {
            debug!(service = %record.service_id, "UI service has no UI method mappings");
            return None;
        }

        let mut method_nodes = Vec::with_capacity(scan.ui_method_mappings.len());

        for method_name in scan.ui_method_mappings.keys() {
            let mut children = Vec::new();

            if let Some(deps) = scan.children_of(method_name) {
                for function_name in &deps.functions {
                    children.push(TemplateNode::function_ref(function_name.clone()));
                }
                for function_name in &deps.async_functions {
                    let queue_name = self.queues.resolve_for_function(function_name).await;
                    children.push(TemplateNode::async_function_ref(function_name.clone(), queue_name));
                }
                for topic_name in &deps.topics {
                    let queue_name = self.queues.resolve_for_topic(topic_name).await;
                    children.push(TemplateNode::topic_publish_ref(topic_name.clone(), queue_name));
                }

                if !deps.service_calls.is_empty() {
                    // Transitive leaves of a UI method land in the template,
                    // not the pool: collect them, then lift each into a node.
                    let mut collector = FunctionPoolEntry::default();
                    resolver
                        .resolve_service_calls(&deps.service_calls, &mut collector, &mut self.queues)
                        .await;
                    children.extend(collector.children.iter().map(TemplateNode::from_child_ref));
                }
            }

            method_nodes.push(TemplateNode::ui_service_method(method_name.clone(), children));
        }

        debug!(
            service = %record.service_id,
            methods = scan.ui_method_mappings.len(),
            "processed UI service"
        );

        Some(TemplateNode::ui_services(record.service_id.clone(), method_nodes))
    }
}

/// Attaches an entry point's direct dependencies to its pool entry, then
/// expands its service calls into the same entry.
async fn attach_dependencies<Q: QueueResolver + ?Sized>(
    deps: &Dependencies,
    entry: &mut FunctionPoolEntry,
    resolver: &TransitiveResolver,
    queues: &mut Q,
) {
    for function_name in &deps.functions {
        if !entry.contains_sync_ref(function_name) {
            entry.add_sync_ref(function_name.clone());
        }
    }

    for function_name in &deps.async_functions {
        if !entry.contains_async_ref(function_name) {
            let queue_name = queues.resolve_for_function(function_name).await;
            entry.add_async_ref(function_name.clone(), queue_name);
        }
    }

    for topic_name in &deps.topics {
        if !entry.contains_topic_ref(topic_name) {
            let queue_name = queues.resolve_for_topic(topic_name).await;
            entry.add_topic_ref(topic_name.clone(), queue_name);
        }
    }

    if !deps.service_calls.is_empty() {
        resolver
            .resolve_service_calls(&deps.service_calls, entry, queues)
            .await;
    }
}
