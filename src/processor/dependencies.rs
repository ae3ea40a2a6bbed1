use serde::{Deserialize, Serialize};

/// A call to another service's interface method, resolved transitively at
/// build time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceCall {
    pub service_id: String,
    pub interface_method: String,
}

impl ServiceCall {
    pub fn new(service_id: impl Into<String>, interface_method: impl Into<String>) -> Self {
        Self {
            service_id: service_id.into(),
            interface_method: interface_method.into(),
        }
    }
}

/// The direct dependencies of an entry point or public method.
///
/// `functions`, `async_functions`, and `topics` behave as insertion-ordered
/// sets; `service_calls` is an insertion-ordered list deduplicated on the
/// (service, method) pair.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Dependencies {
    pub functions: Vec<String>,
    pub async_functions: Vec<String>,
    pub topics: Vec<String>,
    pub service_calls: Vec<ServiceCall>,
}

impl Dependencies {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_function(&mut self, name: impl Into<String>) {
        let name = name.into();
        if !self.functions.contains(&name) {
            self.functions.push(name);
        }
    }

    pub fn add_async_function(&mut self, name: impl Into<String>) {
        let name = name.into();
        if !self.async_functions.contains(&name) {
            self.async_functions.push(name);
        }
    }

    pub fn add_topic(&mut self, topic: impl Into<String>) {
        let topic = topic.into();
        if !self.topics.contains(&topic) {
            self.topics.push(topic);
        }
    }

    pub fn add_service_call(&mut self, service_id: impl Into<String>, interface_method: impl Into<String>) {
        let call = ServiceCall::new(service_id, interface_method);
        if !self.service_calls.contains(&call) {
            self.service_calls.push(call);
        }
    }

    /// Set-union on the leaf fields, dedup-append on service calls.
    pub fn merge(&mut self, other: &Dependencies) {
        for name in &other.functions {
            self.add_function(name.clone());
        }
        for name in &other.async_functions {
            self.add_async_function(name.clone());
        }
        for topic in &other.topics {
            self.add_topic(topic.clone());
        }
        for call in &other.service_calls {
            self.add_service_call(call.service_id.clone(), call.interface_method.clone());
        }
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
            && self.async_functions.is_empty()
            && self.topics.is_empty()
            && self.service_calls.is_empty()
    }
}
