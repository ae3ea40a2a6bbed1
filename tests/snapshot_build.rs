//! End-to-end snapshot assembly tests over an in-memory scan store.

use chrono::Utc;
use depsnap::{
    BuildError, BuildRequest, ChildRef, DepsnapConfig, Dependencies, FailedScanRecord,
    FunctionPoolEntry, HttpQueueResolver, MemoryScanStore, ProcessedScan, ScanErrorType,
    ScanRecord, ScanStore, Snapshot, SnapshotAssembler, StaticQueueResolver, TemplateNode,
};

struct ScanBuilder {
    record: ScanRecord,
}

impl ScanBuilder {
    fn regular(service_id: &str, commit: &str) -> Self {
        Self {
            record: ScanRecord {
                scan_id: format!("scan-{service_id}"),
                service_id: service_id.to_string(),
                git_commit_hash: commit.to_string(),
                scan_timestamp: Utc::now(),
                is_ui_service: false,
                group_id: None,
                version: None,
                service_dependencies: None,
                scan: ProcessedScan::default(),
            },
        }
    }

    fn ui(service_id: &str, commit: &str) -> Self {
        let mut builder = Self::regular(service_id, commit);
        builder.record.is_ui_service = true;
        builder
    }

    fn declares(mut self, dependencies: &str) -> Self {
        self.record.service_dependencies = Some(dependencies.to_string());
        self
    }

    fn function(mut self, name: &str, interface_method: &str) -> Self {
        self.record
            .scan
            .function_mappings
            .insert(name.to_string(), interface_method.to_string());
        self
    }

    fn ui_method(mut self, name: &str, interface_method: &str) -> Self {
        self.record
            .scan
            .ui_method_mappings
            .insert(name.to_string(), interface_method.to_string());
        self
    }

    fn children(mut self, entry_point: &str, deps: Dependencies) -> Self {
        self.record
            .scan
            .entry_point_children
            .insert(entry_point.to_string(), deps);
        self
    }

    /// Registers `interface_method` as reachable from other services with
    /// the given dependencies.
    fn public_method(mut self, interface_method: &str, deps: Dependencies) -> Self {
        let impl_method = format!("{interface_method}#impl");
        self.record
            .scan
            .method_impl_mappings
            .insert(interface_method.to_string(), impl_method.clone());
        self.record
            .scan
            .public_method_dependencies
            .insert(impl_method, deps);
        self
    }

    fn build(self) -> ScanRecord {
        self.record
    }
}

fn failure(service_id: &str, commit: &str, error_type: ScanErrorType, message: &str) -> FailedScanRecord {
    FailedScanRecord {
        failure_id: format!("fail-{service_id}"),
        service_id: service_id.to_string(),
        git_commit_hash: commit.to_string(),
        failure_timestamp: Utc::now(),
        group_id: None,
        version: None,
        error_type,
        error_message: message.to_string(),
        detail: None,
    }
}

fn store_with(records: Vec<ScanRecord>) -> MemoryScanStore {
    let mut store = MemoryScanStore::new();
    for record in records {
        store.put_scan(record).unwrap();
    }
    store
}

fn pool_entry<'a>(snapshot: &'a Snapshot, name: &str) -> &'a FunctionPoolEntry {
    snapshot
        .function_pool
        .get(name)
        .unwrap_or_else(|| panic!("function pool has no entry for {name}"))
}

#[tokio::test]
async fn single_regular_service_with_all_leaf_kinds() {
    // Scenario: one service exposing "f" with a sync, an async, and a topic
    // dependency, queue names served from a static table.
    let mut deps = Dependencies::new();
    deps.add_function("g");
    deps.add_async_function("h");
    deps.add_topic("T");

    let store = store_with(vec![ScanBuilder::regular("SVC1", "c1")
        .function("f", "I.f(...)")
        .children("f", deps)
        .build()]);

    let queues = StaticQueueResolver::new()
        .with_function_queue("h", "H.Q")
        .with_topic_queue("T", "T.Q");
    let mut assembler = SnapshotAssembler::new(queues);

    let request = BuildRequest::new("A").with_service("SVC1", "c1");
    let snapshot = assembler.build(&store, &request).await.unwrap();

    let entry = pool_entry(&snapshot, "f");
    assert_eq!(entry.app.as_deref(), Some("A"));
    assert_eq!(
        entry.children,
        vec![
            ChildRef::sync("g"),
            ChildRef::async_fn("h", "H.Q"),
            ChildRef::topic("T", "T.Q"),
        ]
    );

    assert_eq!(
        snapshot.app_template,
        TemplateNode::app("A", vec![TemplateNode::function_ref("f")])
    );
    assert!(snapshot.is_complete);
    assert!(snapshot.failed_services.is_empty());
    assert!(snapshot.warnings.is_empty());
}

#[tokio::test]
async fn ui_service_builds_template_subtree_and_no_pool_entries() {
    let mut deps = Dependencies::new();
    deps.add_function("g");
    deps.add_function("h");

    let store = store_with(vec![ScanBuilder::ui("UI1", "u1")
        .ui_method("m", "I.m(...)")
        .children("m", deps)
        .build()]);

    let mut assembler = SnapshotAssembler::new(StaticQueueResolver::new());
    let request = BuildRequest::new("A").with_service("UI1", "u1");
    let snapshot = assembler.build(&store, &request).await.unwrap();

    assert_eq!(
        snapshot.app_template,
        TemplateNode::app(
            "A",
            vec![TemplateNode::ui_services(
                "UI1",
                vec![TemplateNode::ui_service_method(
                    "m",
                    vec![TemplateNode::function_ref("g"), TemplateNode::function_ref("h")]
                )]
            )]
        )
    );
    assert!(snapshot.function_pool.is_empty());
}

#[tokio::test]
async fn two_hop_transitive_resolution_into_pool() {
    // SVC_A's "fa" calls SVC_B; SVC_B's public method reaches "leaf".
    // SVC_B exposes no functions itself (dependency-only service).
    let mut fa_deps = Dependencies::new();
    fa_deps.add_service_call("SVC_B", "I_B.mb(...)");

    let mut mb_deps = Dependencies::new();
    mb_deps.add_function("leaf");

    let store = store_with(vec![
        ScanBuilder::regular("SVC_A", "ca")
            .function("fa", "I_A.fa(...)")
            .children("fa", fa_deps)
            .build(),
        ScanBuilder::regular("SVC_B", "cb")
            .public_method("I_B.mb(...)", mb_deps)
            .build(),
    ]);

    let mut assembler = SnapshotAssembler::new(StaticQueueResolver::new());
    let request = BuildRequest::new("A")
        .with_service("SVC_A", "ca")
        .with_service("SVC_B", "cb");
    let snapshot = assembler.build(&store, &request).await.unwrap();

    let entry = pool_entry(&snapshot, "fa");
    assert!(entry.contains_sync_ref("leaf"));

    // The dependency-only service contributes no pool entries of its own.
    assert_eq!(snapshot.function_pool.len(), 1);
}

#[tokio::test]
async fn three_hop_chain_with_declared_dependency_ordering() {
    // A -> B -> C by declared dependency; the call chain reaches C's leaf.
    let mut fa_deps = Dependencies::new();
    fa_deps.add_service_call("SVC_B", "I_B.mb(...)");

    let mut mb_deps = Dependencies::new();
    mb_deps.add_service_call("SVC_C", "I_C.mc(...)");

    let mut mc_deps = Dependencies::new();
    mc_deps.add_function("leaf");

    let store = store_with(vec![
        ScanBuilder::regular("SVC_A", "ca")
            .declares("SVC_B")
            .function("fa", "I_A.fa(...)")
            .children("fa", fa_deps)
            .build(),
        ScanBuilder::regular("SVC_B", "cb")
            .declares("SVC_C")
            .public_method("I_B.mb(...)", mb_deps)
            .build(),
        ScanBuilder::regular("SVC_C", "cc")
            .public_method("I_C.mc(...)", mc_deps)
            .build(),
    ]);

    let mut assembler = SnapshotAssembler::new(StaticQueueResolver::new());
    let request = BuildRequest::new("A")
        .with_service("SVC_A", "ca")
        .with_service("SVC_B", "cb")
        .with_service("SVC_C", "cc");
    let snapshot = assembler.build(&store, &request).await.unwrap();

    assert!(pool_entry(&snapshot, "fa").contains_sync_ref("leaf"));
}

#[tokio::test]
async fn failed_scan_yields_partial_build() {
    let mut store = store_with(vec![ScanBuilder::regular("G", "c1")
        .function("g", "I.g(...)")
        .build()]);
    store
        .put_failure(failure("F", "c2", ScanErrorType::ScanError, "scanner crashed"))
        .unwrap();

    let mut assembler = SnapshotAssembler::new(StaticQueueResolver::new());
    let request = BuildRequest::new("A")
        .with_service("G", "c1")
        .with_service("F", "c2");
    let snapshot = assembler.build(&store, &request).await.unwrap();

    assert!(!snapshot.is_complete);
    assert_eq!(snapshot.failed_services.len(), 1);
    assert_eq!(snapshot.failed_services[0].service_id, "F");
    assert_eq!(snapshot.failed_services[0].git_commit_hash, "c2");
    assert_eq!(snapshot.failed_services[0].error_type, ScanErrorType::ScanError);

    assert_eq!(snapshot.warnings.len(), 1);
    assert!(snapshot.warnings[0].contains("F@c2"));

    assert!(snapshot.function_pool.contains_key("g"));
    assert_eq!(
        snapshot.app_template.children(),
        &[TemplateNode::function_ref("g")]
    );
}

#[tokio::test]
async fn absent_queue_endpoints_fall_back_to_generated_names() {
    let mut deps = Dependencies::new();
    deps.add_async_function("h");
    deps.add_topic("T");

    let store = store_with(vec![ScanBuilder::regular("SVC1", "c1")
        .function("f", "I.f(...)")
        .children("f", deps)
        .build()]);

    // No endpoints configured: every lookup resolves to the fallback.
    let queues = HttpQueueResolver::from_config(&DepsnapConfig::offline());
    let mut assembler = SnapshotAssembler::new(queues);

    let request = BuildRequest::new("A").with_service("SVC1", "c1");
    let snapshot = assembler.build(&store, &request).await.unwrap();

    assert_eq!(
        pool_entry(&snapshot, "f").children,
        vec![ChildRef::async_fn("h", "h_queue"), ChildRef::topic("T", "T_queue")]
    );
}

#[tokio::test]
async fn cyclic_declared_dependencies_fail_the_build() {
    let store = store_with(vec![
        ScanBuilder::regular("A", "ca").declares("B").build(),
        ScanBuilder::regular("B", "cb").declares("A").build(),
    ]);

    let mut assembler = SnapshotAssembler::new(StaticQueueResolver::new());
    let request = BuildRequest::new("app")
        .with_service("A", "ca")
        .with_service("B", "cb");

    let err = assembler.build(&store, &request).await.unwrap_err();
    assert!(matches!(err, BuildError::CyclicDependency(_)));

    // Removing one cycle edge makes the same build succeed.
    let store = store_with(vec![
        ScanBuilder::regular("A", "ca").declares("B").build(),
        ScanBuilder::regular("B", "cb").build(),
    ]);
    let mut assembler = SnapshotAssembler::new(StaticQueueResolver::new());
    assert!(assembler.build(&store, &request).await.is_ok());
}

#[tokio::test]
async fn missing_scan_is_fatal() {
    let store = MemoryScanStore::new();
    let mut assembler = SnapshotAssembler::new(StaticQueueResolver::new());
    let request = BuildRequest::new("A").with_service("SVC1", "c1");

    let err = assembler.build(&store, &request).await.unwrap_err();
    match err {
        BuildError::MissingScans(keys) => assert!(keys.contains("SVC1@c1")),
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn invalid_requests_are_rejected() {
    let store = MemoryScanStore::new();
    let mut assembler = SnapshotAssembler::new(StaticQueueResolver::new());

    for request in [
        BuildRequest::new(""),
        BuildRequest::new("A"),
        BuildRequest::new("A").with_service("", "c1"),
        BuildRequest::new("A").with_service("SVC1", ""),
    ] {
        let err = assembler.build(&store, &request).await.unwrap_err();
        assert!(matches!(err, BuildError::InvalidRequest(_)), "request: {request:?}");
    }
}

#[tokio::test]
async fn shared_function_name_enters_pool_and_root_once() {
    let store = store_with(vec![
        ScanBuilder::regular("SVC1", "c1").function("Shared", "I1.s(...)").build(),
        ScanBuilder::regular("SVC2", "c2").function("Shared", "I2.s(...)").build(),
    ]);

    let mut assembler = SnapshotAssembler::new(StaticQueueResolver::new());
    let request = BuildRequest::new("A")
        .with_service("SVC1", "c1")
        .with_service("SVC2", "c2");
    let snapshot = assembler.build(&store, &request).await.unwrap();

    assert_eq!(snapshot.function_pool.len(), 1);
    assert_eq!(pool_entry(&snapshot, "Shared").app.as_deref(), Some("A"));
    assert_eq!(snapshot.app_template.children().len(), 1);
}

#[tokio::test]
async fn root_function_refs_dedupe_case_insensitively() {
    // Pool keys preserve source casing, so two casings yield two pool
    // entries; the root ref set compares case-insensitively and keeps one.
    let store = store_with(vec![
        ScanBuilder::regular("SVC1", "c1").function("Shared", "I1.s(...)").build(),
        ScanBuilder::regular("SVC2", "c2").function("SHARED", "I2.s(...)").build(),
    ]);

    let mut assembler = SnapshotAssembler::new(StaticQueueResolver::new());
    let request = BuildRequest::new("A")
        .with_service("SVC1", "c1")
        .with_service("SVC2", "c2");
    let snapshot = assembler.build(&store, &request).await.unwrap();

    assert_eq!(snapshot.function_pool.len(), 2);
    assert_eq!(snapshot.app_template.children().len(), 1);
}

#[tokio::test]
async fn self_referential_service_call_terminates() {
    let mut fa_deps = Dependencies::new();
    fa_deps.add_service_call("SVC_A", "I_A.fa(...)");

    let mut loop_deps = Dependencies::new();
    loop_deps.add_function("leaf");
    loop_deps.add_service_call("SVC_A", "I_A.fa(...)");

    let store = store_with(vec![ScanBuilder::regular("SVC_A", "ca")
        .function("fa", "I_A.fa(...)")
        .children("fa", fa_deps)
        .public_method("I_A.fa(...)", loop_deps)
        .build()]);

    let mut assembler = SnapshotAssembler::new(StaticQueueResolver::new());
    let request = BuildRequest::new("A").with_service("SVC_A", "ca");
    let snapshot = assembler.build(&store, &request).await.unwrap();

    assert!(pool_entry(&snapshot, "fa").contains_sync_ref("leaf"));
}

#[tokio::test]
async fn ui_method_service_calls_land_in_template_not_pool() {
    let mut m_deps = Dependencies::new();
    m_deps.add_service_call("SVC_B", "I_B.mb(...)");

    let mut mb_deps = Dependencies::new();
    mb_deps.add_function("leaf");
    mb_deps.add_async_function("asyncLeaf");

    let store = store_with(vec![
        ScanBuilder::ui("UI1", "u1")
            .ui_method("m", "I.m(...)")
            .children("m", m_deps)
            .build(),
        ScanBuilder::regular("SVC_B", "cb")
            .public_method("I_B.mb(...)", mb_deps)
            .build(),
    ]);

    let queues = StaticQueueResolver::new().with_function_queue("asyncLeaf", "ASYNC.Q");
    let mut assembler = SnapshotAssembler::new(queues);
    let request = BuildRequest::new("A")
        .with_service("UI1", "u1")
        .with_service("SVC_B", "cb");
    let snapshot = assembler.build(&store, &request).await.unwrap();

    assert!(snapshot.function_pool.is_empty());

    let expected_method = TemplateNode::ui_service_method(
        "m",
        vec![
            TemplateNode::function_ref("leaf"),
            TemplateNode::async_function_ref("asyncLeaf", "ASYNC.Q"),
        ],
    );
    assert_eq!(
        snapshot.app_template.children(),
        &[TemplateNode::ui_services("UI1", vec![expected_method])]
    );
}

#[tokio::test]
async fn builds_are_deterministic_for_identical_inputs() {
    let mut deps = Dependencies::new();
    deps.add_function("g");
    deps.add_async_function("h");

    let records = vec![
        ScanBuilder::regular("SVC1", "c1")
            .function("f", "I.f(...)")
            .children("f", deps)
            .build(),
        ScanBuilder::regular("SVC2", "c2").function("k", "I.k(...)").build(),
    ];
    let store = store_with(records.clone());
    let other_store = store_with(records);

    let request = BuildRequest::new("A")
        .with_service("SVC1", "c1")
        .with_service("SVC2", "c2");

    let mut first_assembler = SnapshotAssembler::new(StaticQueueResolver::new());
    let first = first_assembler.build(&store, &request).await.unwrap();

    let mut second_assembler = SnapshotAssembler::new(StaticQueueResolver::new());
    let second = second_assembler.build(&other_store, &request).await.unwrap();

    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}

#[tokio::test]
async fn snapshot_serializes_wire_shape() {
    let mut deps = Dependencies::new();
    deps.add_async_function("h");

    let store = store_with(vec![ScanBuilder::regular("SVC1", "c1")
        .function("f", "I.f(...)")
        .children("f", deps)
        .build()]);

    let queues = StaticQueueResolver::new().with_function_queue("h", "H.Q");
    let mut assembler = SnapshotAssembler::new(queues);
    let request = BuildRequest::new("A").with_service("SVC1", "c1");
    let snapshot = assembler.build(&store, &request).await.unwrap();

    let json = serde_json::to_value(&snapshot).unwrap();
    assert_eq!(
        json,
        serde_json::json!({
            "appTemplate": {
                "name": "A",
                "type": "app",
                "children": [{"ref": "f"}]
            },
            "functionPool": {
                "f": {
                    "app": "A",
                    "children": [{"ref": "h", "async": true, "queueName": "H.Q"}]
                }
            },
            "isComplete": true,
            "failedServices": [],
            "warnings": []
        })
    );
}
