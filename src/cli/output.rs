use crate::builder::Snapshot;
use crate::store::ScanLookup;
use clap::ValueEnum;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text
    Human,
    /// Machine-readable JSON
    Json,
}

/// Renders a scan lookup result for the `status` command.
pub fn format_status(lookup: &ScanLookup, format: OutputFormat) -> String {
    match format {
        OutputFormat::Human => format_status_human(lookup),
        OutputFormat::Json => format_status_json(lookup),
    }
}

fn format_status_human(lookup: &ScanLookup) -> String {
    match lookup {
        ScanLookup::Successful(record) => format!(
            "{}@{}: successful scan ({}, scanned {})",
            record.service_id,
            record.git_commit_hash,
            if record.is_ui_service { "UI service" } else { "regular service" },
            record.scan_timestamp
        ),
        ScanLookup::Failed(record) => format!(
            "{}@{}: failed scan ({}: {})",
            record.service_id, record.git_commit_hash, record.error_type, record.error_message
        ),
        ScanLookup::NotFound { service_id, git_commit_hash } => {
            format!("{service_id}@{git_commit_hash}: no scan on record")
        }
    }
}

fn format_status_json(lookup: &ScanLookup) -> String {
    let value = match lookup {
        ScanLookup::Successful(record) => serde_json::json!({
            "status": "successful",
            "serviceId": record.service_id,
            "gitCommitHash": record.git_commit_hash,
            "isUIService": record.is_ui_service,
            "scanTimestamp": record.scan_timestamp,
            "entryPoints": record.scan.entry_point_children.len(),
        }),
        ScanLookup::Failed(record) => serde_json::json!({
            "status": "failed",
            "serviceId": record.service_id,
            "gitCommitHash": record.git_commit_hash,
            "errorType": record.error_type,
            "errorMessage": record.error_message,
        }),
        ScanLookup::NotFound { service_id, git_commit_hash } => serde_json::json!({
            "status": "not-found",
            "serviceId": service_id,
            "gitCommitHash": git_commit_hash,
        }),
    };
    serde_json::to_string_pretty(&value).unwrap_or_else(|_| "{}".to_string())
}

/// One-line build summary logged after a snapshot is assembled.
pub fn build_summary(snapshot: &Snapshot) -> String {
    let ui_services = snapshot
        .app_template
        .children()
        .iter()
        .filter(|child| matches!(child, crate::builder::TemplateNode::UiServiceContainer { .. }))
        .count();

    if snapshot.is_complete {
        format!(
            "build complete: {} functions, {} UI services",
            snapshot.function_pool.len(),
            ui_services
        )
    } else {
        format!(
            "build incomplete: {} functions, {} UI services, {} failed services",
            snapshot.function_pool.len(),
            ui_services,
            snapshot.failed_services.len()
        )
    }
}
