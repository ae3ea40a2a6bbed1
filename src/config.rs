use std::env;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_HTTP_TIMEOUT_MS: u64 = 2_000;
const DEFAULT_QUEUE_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_QUEUE_INITIAL_BACKOFF_MS: u64 = 200;
const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

/// Process-wide configuration, read once from the environment.
///
/// Recognized variables:
/// - `DEPSNAP_FUNCTION_QUEUE_URL` - function queue resolver endpoint
/// - `DEPSNAP_TOPIC_QUEUE_URL` - topic queue resolver endpoint
/// - `DEPSNAP_HTTP_TIMEOUT_MS` - per-attempt HTTP timeout (default 2000)
/// - `DEPSNAP_QUEUE_MAX_ATTEMPTS` - lookup attempts per target (default 3)
/// - `DEPSNAP_QUEUE_INITIAL_BACKOFF_MS` - first retry delay (default 200)
/// - `DEPSNAP_SCAN_DIR` - scan store directory for the CLI
/// - `DEPSNAP_LOG_LEVEL` - default log level
#[derive(Debug, Clone)]
pub struct DepsnapConfig {
    pub function_queue_url: Option<String>,
    pub topic_queue_url: Option<String>,
    pub http_timeout_ms: u64,
    pub queue_max_attempts: u32,
    pub queue_initial_backoff_ms: u64,
    pub scan_dir: Option<PathBuf>,
    pub log_level: String,
}

impl Default for DepsnapConfig {
    fn default() -> Self {
        let function_queue_url = non_blank(env::var("DEPSNAP_FUNCTION_QUEUE_URL").ok());
        let topic_queue_url = non_blank(env::var("DEPSNAP_TOPIC_QUEUE_URL").ok());

        let http_timeout_ms = env::var("DEPSNAP_HTTP_TIMEOUT_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(DEFAULT_HTTP_TIMEOUT_MS);

        let queue_max_attempts = env::var("DEPSNAP_QUEUE_MAX_ATTEMPTS")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(DEFAULT_QUEUE_MAX_ATTEMPTS);

        let queue_initial_backoff_ms = env::var("DEPSNAP_QUEUE_INITIAL_BACKOFF_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(DEFAULT_QUEUE_INITIAL_BACKOFF_MS);

        let scan_dir = env::var("DEPSNAP_SCAN_DIR").ok().map(PathBuf::from);

        let log_level = env::var("DEPSNAP_LOG_LEVEL")
            .unwrap_or_else(|_| DEFAULT_LOG_LEVEL.to_string())
            .to_lowercase();

        Self {
            function_queue_url,
            topic_queue_url,
            http_timeout_ms,
            queue_max_attempts,
            queue_initial_backoff_ms,
            scan_dir,
            log_level,
        }
    }
}

impl DepsnapConfig {
    /// A configuration with library defaults and no endpoints, independent
    /// of the process environment. Queue lookups resolve to fallback names.
    pub fn offline() -> Self {
        Self {
            function_queue_url: None,
            topic_queue_url: None,
            http_timeout_ms: DEFAULT_HTTP_TIMEOUT_MS,
            queue_max_attempts: DEFAULT_QUEUE_MAX_ATTEMPTS,
            queue_initial_backoff_ms: DEFAULT_QUEUE_INITIAL_BACKOFF_MS,
            scan_dir: None,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.http_timeout_ms == 0 {
            return Err(ConfigError::ValidationFailed(
                "HTTP timeout must be at least 1 millisecond".to_string(),
            ));
        }
        if self.http_timeout_ms > 60_000 {
            return Err(ConfigError::ValidationFailed(
                "HTTP timeout cannot exceed 1 minute".to_string(),
            ));
        }

        if self.queue_max_attempts == 0 {
            return Err(ConfigError::ValidationFailed(
                "Queue lookup attempts must be at least 1".to_string(),
            ));
        }
        if self.queue_max_attempts > 10 {
            return Err(ConfigError::ValidationFailed(
                "Queue lookup attempts cannot exceed 10".to_string(),
            ));
        }

        if self.queue_initial_backoff_ms > 10_000 {
            return Err(ConfigError::ValidationFailed(
                "Initial backoff cannot exceed 10 seconds".to_string(),
            ));
        }

        match self.log_level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(ConfigError::ValidationFailed(format!(
                    "Invalid log level: {}. Valid options: trace, debug, info, warn, error",
                    self.log_level
                )))
            }
        }

        Ok(())
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_millis(self.http_timeout_ms)
    }

    pub fn queue_initial_backoff(&self) -> Duration {
        Duration::from_millis(self.queue_initial_backoff_ms)
    }
}

impl fmt::Display for DepsnapConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Depsnap Configuration:")?;
        writeln!(
            f,
            "  Function Queue Endpoint: {}",
            self.function_queue_url.as_deref().unwrap_or("(not configured)")
        )?;
        writeln!(
            f,
            "  Topic Queue Endpoint: {}",
            self.topic_queue_url.as_deref().unwrap_or("(not configured)")
        )?;
        writeln!(f, "  HTTP Timeout: {}ms", self.http_timeout_ms)?;
        writeln!(f, "  Queue Lookup Attempts: {}", self.queue_max_attempts)?;
        writeln!(f, "  Initial Backoff: {}ms", self.queue_initial_backoff_ms)?;
        if let Some(ref dir) = self.scan_dir {
            writeln!(f, "  Scan Dir: {}", dir.display())?;
        }
        writeln!(f, "  Log Level: {}", self.log_level)?;
        Ok(())
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
