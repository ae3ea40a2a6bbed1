//! Snapshot output schema
//!
//! The assembled snapshot has two parts: the application template (a tree of
//! [`TemplateNode`]s consumed by the downstream tree renderer) and the
//! function pool (flat definitions keyed by function name). Leaf references
//! serialize to the wire shapes the renderer discriminates by present keys:
//!
//! - sync:  `{"ref": "name"}`
//! - async: `{"ref": "name", "async": true, "queueName": "Q"}`
//! - topic: `{"topicName": "name", "topicPublish": true, "queueName": "Q"}`

use crate::store::ScanErrorType;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A leaf reference in the function pool.
///
/// Two sync refs are equal iff their function names match; two async refs
/// are equal iff their function names match (the queue name is content, not
/// identity); two topic refs are equal iff their topic names match. Pool
/// entries keep at most one of each.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChildRef {
    Topic {
        #[serde(rename = "topicName")]
        topic_name: String,
        #[serde(rename = "topicPublish")]
        topic_publish: bool,
        #[serde(rename = "queueName")]
        queue_name: String,
    },
    Async {
        #[serde(rename = "ref")]
        name: String,
        #[serde(rename = "async")]
        is_async: bool,
        #[serde(rename = "queueName")]
        queue_name: String,
    },
    Sync {
        #[serde(rename = "ref")]
        name: String,
    },
}

impl ChildRef {
    pub fn sync(name: impl Into<String>) -> Self {
        ChildRef::Sync { name: name.into() }
    }

    pub fn async_fn(name: impl Into<String>, queue_name: impl Into<String>) -> Self {
        ChildRef::Async {
            name: name.into(),
            is_async: true,
            queue_name: queue_name.into(),
        }
    }

    pub fn topic(topic_name: impl Into<String>, queue_name: impl Into<String>) -> Self {
        ChildRef::Topic {
            topic_name: topic_name.into(),
            topic_publish: true,
            queue_name: queue_name.into(),
        }
    }
}

/// One function definition in the pool: the owning application plus the
/// function's direct and transitively resolved leaf dependencies.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FunctionPoolEntry {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ChildRef>,
}

impl FunctionPoolEntry {
    pub fn for_app(app: impl Into<String>) -> Self {
        Self {
            app: Some(app.into()),
            children: Vec::new(),
        }
    }

    pub fn add_sync_ref(&mut self, name: impl Into<String>) {
        self.children.push(ChildRef::sync(name));
    }

    pub fn add_async_ref(&mut self, name: impl Into<String>, queue_name: impl Into<String>) {
        self.children.push(ChildRef::async_fn(name, queue_name));
    }

    pub fn add_topic_ref(&mut self, topic_name: impl Into<String>, queue_name: impl Into<String>) {
        self.children.push(ChildRef::topic(topic_name, queue_name));
    }

    pub fn contains_sync_ref(&self, name: &str) -> bool {
        self.children
            .iter()
            .any(|child| matches!(child, ChildRef::Sync { name: existing } if existing == name))
    }

    pub fn contains_async_ref(&self, name: &str) -> bool {
        self.children
            .iter()
            .any(|child| matches!(child, ChildRef::Async { name: existing, .. } if existing == name))
    }

    pub fn contains_topic_ref(&self, topic_name: &str) -> bool {
        self.children.iter().any(
            |child| matches!(child, ChildRef::Topic { topic_name: existing, .. } if existing == topic_name),
        )
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NodeType {
    #[serde(rename = "app")]
    App,
    #[serde(rename = "ui-services")]
    UiServices,
    #[serde(rename = "ui-service-method")]
    UiServiceMethod,
}

/// A node of the application template tree. Leaves share the wire shapes of
/// [`ChildRef`]; container nodes carry a `type` discriminator.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TemplateNode {
    App {
        name: String,
        #[serde(rename = "type")]
        node_type: NodeType,
        children: Vec<TemplateNode>,
    },
    UiServiceContainer {
        name: String,
        #[serde(rename = "type")]
        node_type: NodeType,
        children: Vec<TemplateNode>,
    },
    UiServiceMethod {
        name: String,
        #[serde(rename = "type")]
        node_type: NodeType,
        children: Vec<TemplateNode>,
    },
    FunctionRef {
        #[serde(rename = "ref")]
        name: String,
    },
    AsyncFunctionRef {
        #[serde(rename = "ref")]
        name: String,
        #[serde(rename = "async")]
        is_async: bool,
        #[serde(rename = "queueName")]
        queue_name: String,
    },
    TopicPublishRef {
        #[serde(rename = "topicName")]
        topic_name: String,
        #[serde(rename = "topicPublish")]
        topic_publish: bool,
        #[serde(rename = "queueName")]
        queue_name: String,
    },
}

impl TemplateNode {
    pub fn app(name: impl Into<String>, children: Vec<TemplateNode>) -> Self {
        TemplateNode::App {
            name: name.into(),
            node_type: NodeType::App,
            children,
        }
    }

    pub fn ui_services(service_id: impl Into<String>, children: Vec<TemplateNode>) -> Self {
        TemplateNode::UiServiceContainer {
            name: service_id.into(),
            node_type: NodeType::UiServices,
            children,
        }
    }

    pub fn ui_service_method(method_name: impl Into<String>, children: Vec<TemplateNode>) -> Self {
        TemplateNode::UiServiceMethod {
            name: method_name.into(),
            node_type: NodeType::UiServiceMethod,
            children,
        }
    }

    pub fn function_ref(name: impl Into<String>) -> Self {
        TemplateNode::FunctionRef { name: name.into() }
    }

    pub fn async_function_ref(name: impl Into<String>, queue_name: impl Into<String>) -> Self {
        TemplateNode::AsyncFunctionRef {
            name: name.into(),
            is_async: true,
            queue_name: queue_name.into(),
        }
    }

    pub fn topic_publish_ref(topic_name: impl Into<String>, queue_name: impl Into<String>) -> Self {
        TemplateNode::TopicPublishRef {
            topic_name: topic_name.into(),
            topic_publish: true,
            queue_name: queue_name.into(),
        }
    }

    /// Lifts an accumulated pool child into the equivalent template leaf.
    pub fn from_child_ref(child: &ChildRef) -> Self {
        match child {
            ChildRef::Sync { name } => TemplateNode::function_ref(name.clone()),
            ChildRef::Async { name, queue_name, .. } => {
                TemplateNode::async_function_ref(name.clone(), queue_name.clone())
            }
            ChildRef::Topic { topic_name, queue_name, .. } => {
                TemplateNode::topic_publish_ref(topic_name.clone(), queue_name.clone())
            }
        }
    }

    pub fn children(&self) -> &[TemplateNode] {
        match self {
            TemplateNode::App { children, .. }
            | TemplateNode::UiServiceContainer { children, .. }
            | TemplateNode::UiServiceMethod { children, .. } => children,
            _ => &[],
        }
    }
}

/// A service excluded from the build because its scan failed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedServiceInfo {
    pub service_id: String,
    pub git_commit_hash: String,
    pub error_type: ScanErrorType,
    pub error_message: String,
}

/// The assembled snapshot: template tree, function pool, and the failure
/// metadata of a partially successful build.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub app_template: TemplateNode,
    pub function_pool: BTreeMap<String, FunctionPoolEntry>,
    pub is_complete: bool,
    pub failed_services: Vec<FailedServiceInfo>,
    pub warnings: Vec<String>,
}

impl Snapshot {
    pub fn has_failed_services(&self) -> bool {
        !self.failed_services.is_empty()
    }
}
