//! HTTP-backed queue-name resolver
//!
//! Function lookups POST to `{function_endpoint}/{lowercased name}` and read
//! the queue name from the `async_url` key of the JSON response; topic
//! lookups GET `{topic_endpoint}/{lowercased name}` and read `MQ_QUEUE`.
//! Lookups are cached per build, retried with exponential backoff on
//! transient failures, and fall back to the generated default name when all
//! attempts fail or no endpoint is configured.

use super::{fallback_queue_name, QueueResolver};
use crate::config::DepsnapConfig;
use async_trait::async_trait;
use rand::Rng;
use reqwest::{Client, Method, StatusCode};
use url::Url;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};

const FUNCTION_QUEUE_NAME_KEY: &str = "async_url";
const TOPIC_QUEUE_NAME_KEY: &str = "MQ_QUEUE";
const QUEUE_PREFIX_TO_REMOVE: &str = "OCP.DEV.";
const JITTER_MS: u64 = 50;

#[derive(Debug, Clone, Copy)]
struct RetryPolicy {
    max_attempts: u32,
    initial_backoff: Duration,
}

impl RetryPolicy {
    /// Delay before attempt `attempt + 1`: exponential in the attempt number
    /// plus uniform jitter.
    fn backoff_delay(&self, attempt: u32) -> Duration {
        let exponential = self.initial_backoff * 2u32.saturating_pow(attempt - 1);
        let jitter = Duration::from_millis(rand::thread_rng().gen_range(0..JITTER_MS));
        exponential + jitter
    }
}

enum LookupOutcome {
    Success(String),
    RetryableFailure,
    FatalFailure,
}

/// Resolves queue names through the configured REST endpoints.
pub struct HttpQueueResolver {
    http: Client,
    function_endpoint: Option<Url>,
    topic_endpoint: Option<Url>,
    retry: RetryPolicy,
    function_cache: HashMap<String, String>,
    topic_cache: HashMap<String, String>,
}

impl HttpQueueResolver {
    /// Builds a resolver from process-wide configuration. Endpoints that do
    /// not parse as URLs are ignored with a warning, matching the behavior
    /// for absent endpoints.
    pub fn from_config(config: &DepsnapConfig) -> Self {
        let http = Client::builder()
            .timeout(config.http_timeout())
            .build()
            .expect("failed to build HTTP client");

        Self {
            http,
            function_endpoint: parse_endpoint(config.function_queue_url.as_deref(), "function"),
            topic_endpoint: parse_endpoint(config.topic_queue_url.as_deref(), "topic"),
            retry: RetryPolicy {
                max_attempts: config.queue_max_attempts,
                initial_backoff: config.queue_initial_backoff(),
            },
            function_cache: HashMap::new(),
            topic_cache: HashMap::new(),
        }
    }
}

#[async_trait]
impl QueueResolver for HttpQueueResolver {
    async fn resolve_for_function(&mut self, function_name: &str) -> String {
        let cache_key = normalize_cache_key(function_name);
        if let Some(cached) = self.function_cache.get(&cache_key) {
            return cached.clone();
        }

        let resolved = match &self.function_endpoint {
            Some(endpoint) => {
                lookup_with_retry(
                    &self.http,
                    endpoint,
                    self.retry,
                    "function",
                    &cache_key,
                    FUNCTION_QUEUE_NAME_KEY,
                    Method::POST,
                )
                .await
            }
            None => {
                debug!(target = %function_name, "no function queue resolver endpoint configured");
                None
            }
        };

        let queue_name = resolved.unwrap_or_else(|| fallback_queue_name(function_name));
        self.function_cache.insert(cache_key, queue_name.clone());
        queue_name
    }

    async fn resolve_for_topic(&mut self, topic_name: &str) -> String {
        let cache_key = normalize_cache_key(topic_name);
        if let Some(cached) = self.topic_cache.get(&cache_key) {
            return cached.clone();
        }

        let resolved = match &self.topic_endpoint {
            Some(endpoint) => {
                lookup_with_retry(
                    &self.http,
                    endpoint,
                    self.retry,
                    "topic",
                    &cache_key,
                    TOPIC_QUEUE_NAME_KEY,
                    Method::GET,
                )
                .await
            }
            None => {
                debug!(target = %topic_name, "no topic queue resolver endpoint configured");
                None
            }
        };

        let queue_name = resolved.unwrap_or_else(|| fallback_queue_name(topic_name));
        self.topic_cache.insert(cache_key, queue_name.clone());
        queue_name
    }

    fn clear_cache(&mut self) {
        self.function_cache.clear();
        self.topic_cache.clear();
    }
}

async fn lookup_with_retry(
    http: &Client,
    endpoint: &Url,
    retry: RetryPolicy,
    target_type: &'static str,
    normalized_target: &str,
    queue_name_key: &str,
    method: Method,
) -> Option<String> {
    for attempt in 1..=retry.max_attempts {
        match call_endpoint(http, endpoint, target_type, normalized_target, queue_name_key, method.clone())
            .await
        {
            LookupOutcome::Success(queue_name) => return Some(queue_name),
            LookupOutcome::FatalFailure => return None,
            LookupOutcome::RetryableFailure => {
                if attempt == retry.max_attempts {
                    return None;
                }
                let delay = retry.backoff_delay(attempt);
                debug!(
                    target_type,
                    target = %normalized_target,
                    delay_ms = delay.as_millis() as u64,
                    attempt = attempt + 1,
                    max_attempts = retry.max_attempts,
                    "retrying queue resolver"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
    None
}

async fn call_endpoint(
    http: &Client,
    endpoint: &Url,
    target_type: &'static str,
    normalized_target: &str,
    queue_name_key: &str,
    method: Method,
) -> LookupOutcome {
    let url = match build_request_url(endpoint, normalized_target) {
        Some(url) => url,
        None => {
            warn!(target_type, target = %normalized_target, "cannot extend queue resolver endpoint path");
            return LookupOutcome::FatalFailure;
        }
    };

    let response = match http.request(method, url).send().await {
        Ok(response) => response,
        Err(e) => {
            if e.is_timeout() {
                warn!(
                    target_type,
                    target = %normalized_target,
                    "queue resolver request timed out"
                );
            } else if e.is_connect() {
                warn!(
                    target_type,
                    target = %normalized_target,
                    error = %e,
                    "cannot connect to queue resolver"
                );
            } else {
                warn!(
                    target_type,
                    target = %normalized_target,
                    error = %e,
                    "error calling queue resolver"
                );
            }
            return LookupOutcome::RetryableFailure;
        }
    };

    let status = response.status();
    if status.is_success() {
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                warn!(target_type, target = %normalized_target, error = %e, "error reading queue resolver response");
                return LookupOutcome::RetryableFailure;
            }
        };
        return match parse_queue_name(&body, queue_name_key) {
            Some(queue_name) => LookupOutcome::Success(normalize_resolved_queue_name(&queue_name)),
            None => {
                warn!(
                    target_type,
                    target = %normalized_target,
                    key = queue_name_key,
                    "queue resolver response missing usable queue name"
                );
                LookupOutcome::FatalFailure
            }
        };
    }

    if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        warn!(target_type, target = %normalized_target, status = %status, "transient queue resolver status");
        return LookupOutcome::RetryableFailure;
    }

    warn!(target_type, target = %normalized_target, status = %status, "non-retryable queue resolver status");
    LookupOutcome::FatalFailure
}

fn parse_endpoint(raw: Option<&str>, target_type: &str) -> Option<Url> {
    let raw = raw?.trim();
    if raw.is_empty() {
        return None;
    }
    match Url::parse(raw) {
        Ok(url) => Some(url),
        Err(e) => {
            warn!(target_type, endpoint = %raw, error = %e, "ignoring invalid queue resolver endpoint");
            None
        }
    }
}

/// Appends the URL-encoded target as one extra path segment.
fn build_request_url(endpoint: &Url, normalized_target: &str) -> Option<Url> {
    let mut url = endpoint.clone();
    url.path_segments_mut()
        .ok()?
        .pop_if_empty()
        .push(normalized_target);
    Some(url)
}

fn parse_queue_name(body: &str, queue_name_key: &str) -> Option<String> {
    if body.trim().is_empty() {
        return None;
    }
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    let queue_name = value.get(queue_name_key)?.as_str()?;
    if queue_name.trim().is_empty() {
        return None;
    }
    Some(queue_name.to_string())
}

/// Trims the resolved name and strips a leading `OCP.DEV.` prefix,
/// case-insensitively.
fn normalize_resolved_queue_name(queue_name: &str) -> String {
    let trimmed = queue_name.trim();
    if trimmed.len() >= QUEUE_PREFIX_TO_REMOVE.len()
        && trimmed[..QUEUE_PREFIX_TO_REMOVE.len()].eq_ignore_ascii_case(QUEUE_PREFIX_TO_REMOVE)
    {
        trimmed[QUEUE_PREFIX_TO_REMOVE.len()..].trim().to_string()
    } else {
        trimmed.to_string()
    }
}

fn normalize_cache_key(target_name: &str) -> String {
    target_name.to_lowercase()
}
