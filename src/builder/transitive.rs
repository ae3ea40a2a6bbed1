//! Transitive service-call resolution
//!
//! A function that calls another service's interface method depends, through
//! it, on whatever that method ultimately touches. The resolver pre-computes
//! a lookup table `service_id -> (interface_method -> Dependencies)` from
//! each loaded scan's public-method index and expands service calls
//! depth-first into their leaf dependencies, guarding against call cycles
//! with a visited set per top-level expansion.

use crate::processor::{Dependencies, ServiceCall};
use crate::queue::QueueResolver;
use crate::store::ScanRecord;
use crate::builder::snapshot::FunctionPoolEntry;
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

pub struct TransitiveResolver {
    /// service_id -> (interface_method -> dependencies reachable through it).
    /// Fixed for the duration of one build.
    index: HashMap<String, HashMap<String, Dependencies>>,
}

impl TransitiveResolver {
    pub fn new(scans: &HashMap<String, ScanRecord>) -> Self {
        let mut index: HashMap<String, HashMap<String, Dependencies>> = HashMap::new();

        for (service_id, record) in scans {
            let mut method_deps = HashMap::new();
            for (interface_method, impl_method) in &record.scan.method_impl_mappings {
                if let Some(deps) = record.scan.public_method_dependencies.get(impl_method) {
                    if !deps.is_empty() {
                        method_deps.insert(interface_method.clone(), deps.clone());
                    }
                }
            }
            if !method_deps.is_empty() {
                index.insert(service_id.clone(), method_deps);
            }
        }

        debug!(services = index.len(), "built transitive resolution index");
        Self { index }
    }

    pub fn has_resolution_data(&self, service_id: &str) -> bool {
        self.index.contains_key(service_id)
    }

    /// Expands each service call in order, accumulating leaf dependencies on
    /// the sink. Each top-level call gets its own cycle-protection scope.
    pub async fn resolve_service_calls<Q: QueueResolver + ?Sized>(
        &self,
        service_calls: &[ServiceCall],
        sink: &mut FunctionPoolEntry,
        queues: &mut Q,
    ) {
        for call in service_calls {
            self.resolve_service_call(call, sink, queues).await;
        }
    }

    /// Expands one service call into its ultimate leaf dependencies.
    pub async fn resolve_service_call<Q: QueueResolver + ?Sized>(
        &self,
        service_call: &ServiceCall,
        sink: &mut FunctionPoolEntry,
        queues: &mut Q,
    ) {
        let mut visited: HashSet<(String, String)> = HashSet::new();
        let mut stack = vec![(
            service_call.service_id.clone(),
            service_call.interface_method.clone(),
        )];

        while let Some((service_id, interface_method)) = stack.pop() {
            if !visited.insert((service_id.clone(), interface_method.clone())) {
                warn!(
                    service = %service_id,
                    method = %interface_method,
                    "cycle detected in transitive resolution"
                );
                continue;
            }

            let deps = match self
                .index
                .get(&service_id)
                .and_then(|methods| methods.get(&interface_method))
            {
                Some(deps) => deps,
                None => {
                    // The callee's scan may legitimately be outside the
                    // build set; the call contributes no leaves.
                    debug!(
                        service = %service_id,
                        method = %interface_method,
                        "no transitive resolution data"
                    );
                    continue;
                }
            };

            for function_name in &deps.functions {
                if !sink.contains_sync_ref(function_name) {
                    sink.add_sync_ref(function_name.clone());
                }
            }

            for function_name in &deps.async_functions {
                if !sink.contains_async_ref(function_name) {
                    let queue_name = queues.resolve_for_function(function_name).await;
                    sink.add_async_ref(function_name.clone(), queue_name);
                }
            }

            for topic_name in &deps.topics {
                if !sink.contains_topic_ref(topic_name) {
                    let queue_name = queues.resolve_for_topic(topic_name).await;
                    sink.add_topic_ref(topic_name.clone(), queue_name);
                }
            }

            // Depth-first: nested calls of this node are expanded before
            // its siblings, in source order.
            for nested in deps.service_calls.iter().rev() {
                stack.push((nested.service_id.clone(), nested.interface_method.clone()));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processor::ProcessedScan;
    use crate::queue::StaticQueueResolver;
    use chrono::Utc;

    fn record(service_id: &str, scan: ProcessedScan) -> ScanRecord {
        ScanRecord {
            scan_id: format!("scan-{service_id}"),
            service_id: service_id.to_string(),
            git_commit_hash: "c1".to_string(),
            scan_timestamp: Utc::now(),
            is_ui_service: false,
            group_id: None,
            version: None,
            service_dependencies: None,
            scan,
        }
    }

    /// A scan whose `interface_method` resolves (via its impl method) to
    /// the given dependencies.
    fn exposing(interface_method: &str, deps: Dependencies) -> ProcessedScan {
        let impl_method = format!("{interface_method}#impl");
        let mut scan = ProcessedScan::default();
        scan.method_impl_mappings
            .insert(interface_method.to_string(), impl_method.clone());
        scan.public_method_dependencies.insert(impl_method, deps);
        scan
    }

    fn scans(records: Vec<ScanRecord>) -> HashMap<String, ScanRecord> {
        records
            .into_iter()
            .map(|r| (r.service_id.clone(), r))
            .collect()
    }

    #[tokio::test]
    async fn resolves_single_hop_leaves_in_order() {
        let mut deps = Dependencies::new();
        deps.add_function("leaf");
        deps.add_async_function("asyncLeaf");
        deps.add_topic("TopicLeaf");

        let scans = scans(vec![record("SVC_B", exposing("I_B.mb(...)", deps))]);
        let resolver = TransitiveResolver::new(&scans);
        let mut queues = StaticQueueResolver::new().with_function_queue("asyncLeaf", "ASYNC.Q");

        let mut sink = FunctionPoolEntry::default();
        resolver
            .resolve_service_call(&ServiceCall::new("SVC_B", "I_B.mb(...)"), &mut sink, &mut queues)
            .await;

        assert_eq!(
            sink.children,
            vec![
                crate::builder::ChildRef::sync("leaf"),
                crate::builder::ChildRef::async_fn("asyncLeaf", "ASYNC.Q"),
                crate::builder::ChildRef::topic("TopicLeaf", "TopicLeaf_queue"),
            ]
        );
    }

    #[tokio::test]
    async fn follows_nested_service_calls() {
        let mut b_deps = Dependencies::new();
        b_deps.add_service_call("SVC_C", "I_C.mc(...)");

        let mut c_deps = Dependencies::new();
        c_deps.add_function("deepLeaf");

        let scans = scans(vec![
            record("SVC_B", exposing("I_B.mb(...)", b_deps)),
            record("SVC_C", exposing("I_C.mc(...)", c_deps)),
        ]);
        let resolver = TransitiveResolver::new(&scans);
        let mut queues = StaticQueueResolver::new();

        let mut sink = FunctionPoolEntry::default();
        resolver
            .resolve_service_call(&ServiceCall::new("SVC_B", "I_B.mb(...)"), &mut sink, &mut queues)
            .await;

        assert!(sink.contains_sync_ref("deepLeaf"));
    }

    #[tokio::test]
    async fn dangling_target_contributes_nothing() {
        let scans = scans(vec![]);
        let resolver = TransitiveResolver::new(&scans);
        let mut queues = StaticQueueResolver::new();

        let mut sink = FunctionPoolEntry::default();
        resolver
            .resolve_service_call(&ServiceCall::new("ABSENT", "I.m(...)"), &mut sink, &mut queues)
            .await;

        assert!(sink.is_empty());
    }

    #[tokio::test]
    async fn mutual_cycle_terminates() {
        let mut b_deps = Dependencies::new();
        b_deps.add_function("fromB");
        b_deps.add_service_call("SVC_C", "I_C.mc(...)");

        let mut c_deps = Dependencies::new();
        c_deps.add_function("fromC");
        c_deps.add_service_call("SVC_B", "I_B.mb(...)");

        let scans = scans(vec![
            record("SVC_B", exposing("I_B.mb(...)", b_deps)),
            record("SVC_C", exposing("I_C.mc(...)", c_deps)),
        ]);
        let resolver = TransitiveResolver::new(&scans);
        let mut queues = StaticQueueResolver::new();

        let mut sink = FunctionPoolEntry::default();
        resolver
            .resolve_service_call(&ServiceCall::new("SVC_B", "I_B.mb(...)"), &mut sink, &mut queues)
            .await;

        assert!(sink.contains_sync_ref("fromB"));
        assert!(sink.contains_sync_ref("fromC"));
        assert_eq!(sink.children.len(), 2);
    }

    #[tokio::test]
    async fn self_referential_call_terminates() {
        let mut deps = Dependencies::new();
        deps.add_function("selfLeaf");
        deps.add_service_call("SVC_B", "I_B.mb(...)");

        let scans = scans(vec![record("SVC_B", exposing("I_B.mb(...)", deps))]);
        let resolver = TransitiveResolver::new(&scans);
        let mut queues = StaticQueueResolver::new();

        let mut sink = FunctionPoolEntry::default();
        resolver
            .resolve_service_call(&ServiceCall::new("SVC_B", "I_B.mb(...)"), &mut sink, &mut queues)
            .await;

        assert_eq!(sink.children.len(), 1);
    }

    #[test]
    fn index_skips_empty_dependency_sets() {
        let scans = scans(vec![record(
            "SVC_B",
            exposing("I_B.mb(...)", Dependencies::new()),
        )]);
        let resolver = TransitiveResolver::new(&scans);

        assert!(!resolver.has_resolution_data("SVC_B"));
    }

    #[tokio::test]
    async fn duplicate_leaves_across_hops_are_suppressed() {
        let mut b_deps = Dependencies::new();
        b_deps.add_function("shared");
        b_deps.add_service_call("SVC_C", "I_C.mc(...)");

        let mut c_deps = Dependencies::new();
        c_deps.add_function("shared");

        let scans = scans(vec![
            record("SVC_B", exposing("I_B.mb(...)", b_deps)),
            record("SVC_C", exposing("I_C.mc(...)", c_deps)),
        ]);
        let resolver = TransitiveResolver::new(&scans);
        let mut queues = StaticQueueResolver::new();

        let mut sink = FunctionPoolEntry::default();
        resolver
            .resolve_service_call(&ServiceCall::new("SVC_B", "I_B.mb(...)"), &mut sink, &mut queues)
            .await;

        assert_eq!(sink.children.len(), 1);
    }
}
