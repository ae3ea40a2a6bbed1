//! Raw scanner artifact types
//!
//! These types mirror the JSON report emitted by the static-analysis scanner
//! for a single service at a specific source revision. A report carries the
//! service's exposed entry points (function or UI-method mappings), its
//! interface-to-implementation method table, its declared service
//! dependencies, and the observed invocations with their call chains.
//!
//! depsnap never produces these documents; it only consumes them. All
//! collection fields tolerate being absent or `null` in the input.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// Invocation type marker for synchronous function calls.
pub const INVOCATION_TYPE_EXECUTE: &str = "execute";

/// Invocation type marker for asynchronous (queued) function calls.
pub const INVOCATION_TYPE_EXECUTE_ASYNC: &str = "executeAsync";

fn null_to_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::deserialize(deserializer)?.unwrap_or_default())
}

/// One service's raw scan report.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawScan {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
    pub artifact_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub packaging: Option<String>,

    #[serde(deserialize_with = "null_to_default")]
    pub source_files: Vec<String>,

    /// All declared dependency coordinates, service or not.
    #[serde(deserialize_with = "null_to_default")]
    pub dependencies: Vec<String>,

    #[serde(rename = "classes")]
    pub class_count: u32,
    #[serde(rename = "methods")]
    pub method_count: u32,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_interface: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_implementation: Option<String>,

    /// UI services expose `ui_method_mappings`; regular services expose
    /// `function_mappings`.
    #[serde(rename = "isUIService")]
    pub is_ui_service: bool,

    /// Function short name -> exposed interface method signature.
    #[serde(deserialize_with = "null_to_default")]
    pub function_mappings: BTreeMap<String, String>,

    /// UI method short name -> exposed interface method signature.
    #[serde(rename = "uiServiceMethodMappings", deserialize_with = "null_to_default")]
    pub ui_method_mappings: BTreeMap<String, String>,

    /// Interface method signature -> implementation method signature.
    #[serde(rename = "methodImplementationMapping", deserialize_with = "null_to_default")]
    pub method_impl_mappings: BTreeMap<String, String>,

    /// Declared service dependency coordinates, e.g.
    /// `com.acme.services:SVC7:[1.0.0,)`.
    #[serde(deserialize_with = "null_to_default")]
    pub service_dependencies: Vec<String>,

    /// Function artifacts this service depends on, by coordinate.
    #[serde(deserialize_with = "null_to_default")]
    pub function_dependencies: Vec<String>,

    #[serde(deserialize_with = "null_to_default")]
    pub function_usages: Vec<FunctionUsage>,

    #[serde(deserialize_with = "null_to_default")]
    pub service_usages: Vec<ServiceUsage>,

    #[serde(deserialize_with = "null_to_default")]
    pub event_publisher_invocations: Vec<EventPublisherInvocation>,
}

/// All observed invocations of one external function within the service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FunctionUsage {
    pub function_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fully_qualified_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dependency_artifact_id: Option<String>,
    #[serde(deserialize_with = "null_to_default")]
    pub invocations: Vec<FunctionInvocation>,
}

/// A single function invocation site with its enclosing call chain.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FunctionInvocation {
    pub location_in_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invoking_method: Option<MethodRef>,
    /// `execute` or `executeAsync`; anything else is treated as synchronous.
    pub invocation_type: String,
    #[serde(deserialize_with = "null_to_default")]
    pub call_chain: Vec<MethodRef>,
}

impl FunctionInvocation {
    pub fn is_async(&self) -> bool {
        self.invocation_type == INVOCATION_TYPE_EXECUTE_ASYNC
    }
}

/// All observed calls into one target service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServiceUsage {
    pub service_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dependency_artifact_id: Option<String>,
    #[serde(deserialize_with = "null_to_default")]
    pub invocations: Vec<ServiceInvocation>,
}

/// A single cross-service call site.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServiceInvocation {
    pub location_in_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invoking_method: Option<MethodRef>,
    pub target_interface_method: String,
    #[serde(deserialize_with = "null_to_default")]
    pub call_chain: Vec<MethodRef>,
}

/// A single event-publish site with the scanner's topic resolution verdict.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EventPublisherInvocation {
    pub location_in_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invoking_method: Option<MethodRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic_name: Option<String>,
    pub topic_resolution: TopicResolution,
    #[serde(deserialize_with = "null_to_default")]
    pub call_chain: Vec<MethodRef>,
}

/// A method signature paired with its access modifier, as observed in a
/// call chain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MethodRef {
    pub method_signature: String,
    pub access_modifier: AccessModifier,
}

impl MethodRef {
    pub fn new(signature: impl Into<String>, access_modifier: AccessModifier) -> Self {
        Self {
            method_signature: signature.into(),
            access_modifier,
        }
    }

    pub fn is_public(&self) -> bool {
        self.access_modifier == AccessModifier::Public
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccessModifier {
    Public,
    Protected,
    #[default]
    Private,
    /// Older scanner versions emit `PACKAGE` for the same modifier.
    #[serde(alias = "PACKAGE")]
    PackagePrivate,
}

/// Whether the scanner managed to resolve a published topic name to a
/// literal. `UNKNOWN_COMPLEX` is accepted as a wire alias emitted by one
/// scanner lineage for `UNKNOWN_CONSTANT`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TopicResolution {
    Resolved,
    #[default]
    UnknownVariable,
    #[serde(alias = "UNKNOWN_COMPLEX")]
    UnknownConstant,
}

impl TopicResolution {
    pub fn is_resolved(&self) -> bool {
        *self == TopicResolution::Resolved
    }
}
