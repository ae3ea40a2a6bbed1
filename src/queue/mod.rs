//! Queue-name resolution
//!
//! Async functions and published topics reference external queues by name.
//! A [`QueueResolver`] turns a function or topic name into its queue name
//! and never fails at the call site: when a mapping cannot be obtained the
//! generated default `<name>_queue` is returned instead.
//!
//! Two implementations are provided: [`HttpQueueResolver`] looks names up
//! against configured REST endpoints with caching and bounded retries, and
//! [`StaticQueueResolver`] serves from an in-memory mapping table.

pub mod http;
pub mod static_table;

pub use http::HttpQueueResolver;
pub use static_table::StaticQueueResolver;

use async_trait::async_trait;

const DEFAULT_QUEUE_SUFFIX: &str = "_queue";

/// Generated queue name used when no mapping resolves.
pub fn fallback_queue_name(target_name: &str) -> String {
    format!("{target_name}{DEFAULT_QUEUE_SUFFIX}")
}

/// Resolves queue names for async functions and topics.
///
/// Implementations always return a non-empty name and must keep any caching
/// scoped to a single build: callers invoke [`clear_cache`] at build start.
///
/// [`clear_cache`]: QueueResolver::clear_cache
#[async_trait]
pub trait QueueResolver: Send {
    async fn resolve_for_function(&mut self, function_name: &str) -> String;

    async fn resolve_for_topic(&mut self, topic_name: &str) -> String;

    fn clear_cache(&mut self);

    /// Warms the resolver for a batch of targets ahead of a build walk.
    async fn preload_mappings(&mut self, function_names: &[String], topic_names: &[String]) {
        for name in function_names {
            self.resolve_for_function(name).await;
        }
        for name in topic_names {
            self.resolve_for_topic(name).await;
        }
    }
}
