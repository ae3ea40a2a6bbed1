use super::dependencies::Dependencies;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Build-optimized form of one service's scan, as persisted in the scan
/// store. Immutable once produced.
///
/// The mapping tables are copied verbatim from the raw scan;
/// `entry_point_children` holds each entry point's direct dependencies, and
/// `public_method_dependencies` is the inverted index used when another
/// service calls into this one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProcessedScan {
    /// Function short name -> interface method signature (regular services).
    pub function_mappings: BTreeMap<String, String>,

    /// UI method short name -> interface method signature (UI services).
    #[serde(rename = "uiServiceMethodMappings")]
    pub ui_method_mappings: BTreeMap<String, String>,

    /// Interface method signature -> implementation method signature.
    #[serde(rename = "methodImplementationMapping")]
    pub method_impl_mappings: BTreeMap<String, String>,

    /// Entry point short name -> direct dependencies.
    pub entry_point_children: BTreeMap<String, Dependencies>,

    /// PUBLIC implementation method signature -> dependencies reachable
    /// through it.
    pub public_method_dependencies: BTreeMap<String, Dependencies>,
}

impl ProcessedScan {
    /// Direct dependencies for an entry point, if any were recorded.
    pub fn children_of(&self, entry_point: &str) -> Option<&Dependencies> {
        self.entry_point_children.get(entry_point)
    }

    pub fn has_entry_points(&self) -> bool {
        !self.function_mappings.is_empty() || !self.ui_method_mappings.is_empty()
    }
}
