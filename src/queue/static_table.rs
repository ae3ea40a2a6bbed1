use super::{fallback_queue_name, QueueResolver};
use async_trait::async_trait;
use std::collections::HashMap;

/// Queue resolver backed by an in-memory mapping table.
///
/// Satisfies the same contract as [`HttpQueueResolver`]: lookups are keyed
/// by the lowercased target name and unresolved targets fall back to the
/// generated default. The table itself is authoritative, so there is no
/// per-build cache to clear.
///
/// [`HttpQueueResolver`]: super::HttpQueueResolver
#[derive(Debug, Default, Clone)]
pub struct StaticQueueResolver {
    function_queues: HashMap<String, String>,
    topic_queues: HashMap<String, String>,
}

impl StaticQueueResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_function_queue(mut self, function_name: &str, queue_name: &str) -> Self {
        self.function_queues
            .insert(function_name.to_lowercase(), queue_name.to_string());
        self
    }

    pub fn with_topic_queue(mut self, topic_name: &str, queue_name: &str) -> Self {
        self.topic_queues
            .insert(topic_name.to_lowercase(), queue_name.to_string());
        self
    }

    pub fn mapping_count(&self) -> usize {
        self.function_queues.len() + self.topic_queues.len()
    }
}

#[async_trait]
impl QueueResolver for StaticQueueResolver {
    async fn resolve_for_function(&mut self, function_name: &str) -> String {
        self.function_queues
            .get(&function_name.to_lowercase())
            .cloned()
            .unwrap_or_else(|| fallback_queue_name(function_name))
    }

    async fn resolve_for_topic(&mut self, topic_name: &str) -> String {
        self.topic_queues
            .get(&topic_name.to_lowercase())
            .cloned()
            .unwrap_or_else(|| fallback_queue_name(topic_name))
    }

    fn clear_cache(&mut self) {}
}
