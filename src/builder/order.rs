use super::BuildError;
use crate::store::ScanRecord;
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Orders services so that every declared dependency present in the build
/// set precedes its dependents. Dependencies outside the build set are
/// ignored. The `seed` order (derived from the request) fixes iteration, so
/// the result is deterministic for a given input.
///
/// Fails with [`BuildError::CyclicDependency`] when the declared
/// dependencies restricted to the build set contain a cycle.
pub fn order_services(
    seed: &[String],
    scans: &HashMap<String, ScanRecord>,
) -> Result<Vec<String>, BuildError> {
    let dependencies: HashMap<&str, Vec<String>> = scans
        .iter()
        .map(|(service_id, record)| {
            let declared = parse_declared_dependencies(record.service_dependencies.as_deref());
            let in_build_set = declared
                .into_iter()
                .filter(|dep| scans.contains_key(dep))
                .collect();
            (service_id.as_str(), in_build_set)
        })
        .collect();

    let mut sorted = Vec::with_capacity(scans.len());
    let mut visited = HashSet::new();
    let mut visiting = HashSet::new();

    for service_id in seed {
        if scans.contains_key(service_id) && !visited.contains(service_id.as_str()) {
            visit(service_id, &dependencies, &mut visited, &mut visiting, &mut sorted)?;
        }
    }

    debug!(order = ?sorted, "services ordered by declared dependencies");
    Ok(sorted)
}

fn visit(
    service_id: &str,
    dependencies: &HashMap<&str, Vec<String>>,
    visited: &mut HashSet<String>,
    visiting: &mut HashSet<String>,
    sorted: &mut Vec<String>,
) -> Result<(), BuildError> {
    if visiting.contains(service_id) {
        return Err(BuildError::CyclicDependency(service_id.to_string()));
    }
    if visited.contains(service_id) {
        return Ok(());
    }

    visiting.insert(service_id.to_string());

    if let Some(deps) = dependencies.get(service_id) {
        for dep in deps {
            visit(dep, dependencies, visited, visiting, sorted)?;
        }
    }

    visiting.remove(service_id);
    visited.insert(service_id.to_string());
    sorted.push(service_id.to_string());
    Ok(())
}

/// Splits the stored comma-separated dependency list, trimming entries and
/// discarding empties.
pub fn parse_declared_dependencies(raw: Option<&str>) -> Vec<String> {
    match raw {
        Some(raw) if !raw.trim().is_empty() => raw
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}
