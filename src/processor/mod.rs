//! Scan-data transformation
//!
//! Turns one raw scanner report into the build-optimized [`ProcessedScan`]:
//! builds the reverse lookup tables, attributes every observed invocation to
//! the entry points whose call chains enclose it, and populates the
//! public-method index used for transitive resolution.

pub mod dependencies;
pub mod processed;
pub mod record;
pub mod service;

pub use dependencies::{Dependencies, ServiceCall};
pub use processed::ProcessedScan;
pub use record::{RecordError, ScanRecordFactory};
pub use service::{IngestError, ScanIngestService};

use crate::scan::{MethodRef, RawScan, TopicResolution};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

/// Placeholder used when the scanner could not resolve a published topic to
/// a literal. The invocation still matters for ownership and must appear in
/// the output tree.
pub const UNKNOWN_TOPIC_PLACEHOLDER: &str = "<unknown-topic>";

/// Transforms raw scans into [`ProcessedScan`]s.
#[derive(Debug, Default)]
pub struct ScanProcessor;

impl ScanProcessor {
    pub fn new() -> Self {
        Self
    }

    /// Processes a raw scan into its build-optimized form.
    ///
    /// Tolerates empty mapping tables, empty usage lists, and empty call
    /// chains; the latter are skipped with a warning because they cannot be
    /// attributed to any entry point.
    pub fn process(&self, raw: &RawScan) -> ProcessedScan {
        debug!(service = %raw.artifact_id, "processing scan data");

        let mut scan = ProcessedScan {
            function_mappings: raw.function_mappings.clone(),
            ui_method_mappings: raw.ui_method_mappings.clone(),
            method_impl_mappings: raw.method_impl_mappings.clone(),
            ..Default::default()
        };

        let impl_to_interface: BTreeMap<&str, &str> = raw
            .method_impl_mappings
            .iter()
            .map(|(interface, implementation)| (implementation.as_str(), interface.as_str()))
            .collect();

        let interface_to_entry_point: BTreeMap<&str, &str> = raw
            .function_mappings
            .iter()
            .chain(raw.ui_method_mappings.iter())
            .map(|(entry_point, interface)| (interface.as_str(), entry_point.as_str()))
            .collect();

        for entry_point in raw.function_mappings.keys().chain(raw.ui_method_mappings.keys()) {
            scan.entry_point_children
                .insert(entry_point.clone(), Dependencies::new());
        }

        self.process_function_usages(raw, &mut scan, &impl_to_interface, &interface_to_entry_point);
        self.process_service_usages(raw, &mut scan, &impl_to_interface, &interface_to_entry_point);
        self.process_event_publishers(raw, &mut scan, &impl_to_interface, &interface_to_entry_point);

        debug!(
            service = %raw.artifact_id,
            entry_points = scan.entry_point_children.len(),
            public_methods = scan.public_method_dependencies.len(),
            "scan data processed"
        );

        scan
    }

    fn process_function_usages(
        &self,
        raw: &RawScan,
        scan: &mut ProcessedScan,
        impl_to_interface: &BTreeMap<&str, &str>,
        interface_to_entry_point: &BTreeMap<&str, &str>,
    ) {
        for usage in &raw.function_usages {
            for invocation in &usage.invocations {
                if invocation.call_chain.is_empty() {
                    warn!(
                        function = %usage.function_name,
                        site = %invocation.location_in_code,
                        "function invocation has an empty call chain, skipping"
                    );
                    continue;
                }

                let is_async = invocation.is_async();
                let owners =
                    find_owners(&invocation.call_chain, impl_to_interface, interface_to_entry_point);

                for owner in owners {
                    if let Some(deps) = scan.entry_point_children.get_mut(owner) {
                        if is_async {
                            deps.add_async_function(usage.function_name.clone());
                        } else {
                            deps.add_function(usage.function_name.clone());
                        }
                    }
                }

                for method in public_methods(&invocation.call_chain) {
                    let deps = scan
                        .public_method_dependencies
                        .entry(method.method_signature.clone())
                        .or_default();
                    if is_async {
                        deps.add_async_function(usage.function_name.clone());
                    } else {
                        deps.add_function(usage.function_name.clone());
                    }
                }
            }
        }
    }

    fn process_service_usages(
        &self,
        raw: &RawScan,
        scan: &mut ProcessedScan,
        impl_to_interface: &BTreeMap<&str, &str>,
        interface_to_entry_point: &BTreeMap<&str, &str>,
    ) {
        for usage in &raw.service_usages {
            for invocation in &usage.invocations {
                if invocation.call_chain.is_empty() {
                    warn!(
                        service = %usage.service_id,
                        method = %invocation.target_interface_method,
                        site = %invocation.location_in_code,
                        "service invocation has an empty call chain, skipping"
                    );
                    continue;
                }

                let owners =
                    find_owners(&invocation.call_chain, impl_to_interface, interface_to_entry_point);

                for owner in owners {
                    if let Some(deps) = scan.entry_point_children.get_mut(owner) {
                        deps.add_service_call(
                            usage.service_id.clone(),
                            invocation.target_interface_method.clone(),
                        );
                    }
                }

                for method in public_methods(&invocation.call_chain) {
                    scan.public_method_dependencies
                        .entry(method.method_signature.clone())
                        .or_default()
                        .add_service_call(
                            usage.service_id.clone(),
                            invocation.target_interface_method.clone(),
                        );
                }
            }
        }
    }

    fn process_event_publishers(
        &self,
        raw: &RawScan,
        scan: &mut ProcessedScan,
        impl_to_interface: &BTreeMap<&str, &str>,
        interface_to_entry_point: &BTreeMap<&str, &str>,
    ) {
        for invocation in &raw.event_publisher_invocations {
            let topic = match (&invocation.topic_resolution, &invocation.topic_name) {
                (TopicResolution::Resolved, Some(name)) => name.clone(),
                _ => UNKNOWN_TOPIC_PLACEHOLDER.to_string(),
            };

            if invocation.call_chain.is_empty() {
                warn!(
                    topic = %topic,
                    site = %invocation.location_in_code,
                    "event publisher invocation has an empty call chain, skipping"
                );
                continue;
            }

            let owners =
                find_owners(&invocation.call_chain, impl_to_interface, interface_to_entry_point);

            for owner in owners {
                if let Some(deps) = scan.entry_point_children.get_mut(owner) {
                    deps.add_topic(topic.clone());
                }
            }

            for method in public_methods(&invocation.call_chain) {
                scan.public_method_dependencies
                    .entry(method.method_signature.clone())
                    .or_default()
                    .add_topic(topic.clone());
            }
        }
    }
}

/// Entry points whose implementations transitively enclose the given call
/// chain: each chain element is mapped implementation -> interface ->
/// entry point, keeping the ones where both lookups succeed.
fn find_owners<'a>(
    call_chain: &[MethodRef],
    impl_to_interface: &BTreeMap<&str, &'a str>,
    interface_to_entry_point: &BTreeMap<&str, &'a str>,
) -> BTreeSet<&'a str> {
    call_chain
        .iter()
        .filter_map(|method| impl_to_interface.get(method.method_signature.as_str()))
        .filter_map(|interface| interface_to_entry_point.get(*interface))
        .copied()
        .collect()
}

fn public_methods(call_chain: &[MethodRef]) -> impl Iterator<Item = &MethodRef> {
    call_chain.iter().filter(|method| method.is_public())
}
