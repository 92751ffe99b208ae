//! Backend location, timeouts and polling cadence.
//!
//! Values come from defaults, then the environment, then whatever the caller
//! overrides (the CLI maps its flags onto the same fields).
//!
//! | Variable | Default |
//! |----------|---------|
//! | `DATASIM_API_URL` | `http://localhost:8000` |
//! | `DATASIM_REQUEST_TIMEOUT_MS` | `30000` |
//! | `DATASIM_POLL_INTERVAL_MS` | `1000` |
//! | `DATASIM_POLL_DEADLINE_MS` | unset (poll until terminal) |

use std::time::Duration;

use crate::domain::OutputFormat;
use crate::error::ConfigError;
use crate::stream::StreamFormat;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Polling cadence for the job controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    pub interval: Duration,
    /// Overall budget for one job's polling loop. `None` polls until a
    /// terminal status or abandonment.
    pub deadline: Option<Duration>,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            deadline: None,
        }
    }
}

/// Client-side configuration for talking to the generation backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    pub base_url: String,
    pub request_timeout: Duration,
    pub poll: PollConfig,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: String::from(DEFAULT_BASE_URL),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            poll: PollConfig::default(),
        }
    }
}

impl ApiConfig {
    /// Defaults overlaid with the `DATASIM_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(base_url) = lookup("DATASIM_API_URL") {
            config = config.with_base_url(base_url)?;
        }
        if let Some(timeout) = millis(&lookup, "DATASIM_REQUEST_TIMEOUT_MS")? {
            config.request_timeout = timeout;
        }
        if let Some(interval) = millis(&lookup, "DATASIM_POLL_INTERVAL_MS")? {
            config.poll.interval = interval;
        }
        if let Some(deadline) = millis(&lookup, "DATASIM_POLL_DEADLINE_MS")? {
            config.poll.deadline = Some(deadline);
        }

        Ok(config)
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Result<Self, ConfigError> {
        let base_url = base_url.into();
        let trimmed = base_url.trim().trim_end_matches('/');
        if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
            return Err(ConfigError::InvalidBaseUrl { value: base_url });
        }
        self.base_url = trimmed.to_owned();
        Ok(self)
    }

    pub fn endpoints(&self) -> ApiEndpoints {
        ApiEndpoints {
            base_url: self.base_url.clone(),
        }
    }
}

fn millis(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<Option<Duration>, ConfigError> {
    match lookup(name) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse::<u64>()
            .map(|ms| Some(Duration::from_millis(ms)))
            .map_err(|_| ConfigError::InvalidDuration { name, value }),
    }
}

/// URL builder for the backend's endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiEndpoints {
    base_url: String,
}

impl ApiEndpoints {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_owned(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn generate(&self) -> String {
        format!("{}/generate-data-async/", self.base_url)
    }

    pub fn task_status(&self, task_id: &str) -> String {
        format!(
            "{}/task-status/{}",
            self.base_url,
            urlencoding::encode(task_id)
        )
    }

    pub fn live_stream(&self, format: StreamFormat) -> String {
        format!(
            "{}/live-stream/?file_type={}",
            self.base_url,
            urlencoding::encode(format.as_str())
        )
    }

    pub fn tables(&self) -> String {
        format!("{}/get-tables", self.base_url)
    }

    pub fn table_content(&self, table_name: &str, limit: u32) -> String {
        format!(
            "{}/get-table-content/{}?limit={limit}",
            self.base_url,
            urlencoding::encode(table_name)
        )
    }

    pub fn table_schema(&self, table_name: &str) -> String {
        format!(
            "{}/get-table-schema/{}",
            self.base_url,
            urlencoding::encode(table_name)
        )
    }
}

impl Default for ApiEndpoints {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

/// Stream encoding matching a job's output format, when there is exactly one.
pub fn stream_format_for(output: OutputFormat) -> Option<StreamFormat> {
    match output {
        OutputFormat::Csv => Some(StreamFormat::Csv),
        OutputFormat::Json => Some(StreamFormat::Json),
        OutputFormat::Both => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn defaults_match_backend_conventions() {
        let config = ApiConfig::from_lookup(lookup(&[])).expect("defaults");

        assert_eq!(config.base_url, "http://localhost:8000");
        assert_eq!(config.poll.interval, Duration::from_secs(1));
        assert_eq!(config.poll.deadline, None);
        assert_eq!(config.request_timeout, Duration::from_secs(30));
    }

    #[test]
    fn environment_overrides_defaults() {
        let config = ApiConfig::from_lookup(lookup(&[
            ("DATASIM_API_URL", "https://datasim.internal/"),
            ("DATASIM_POLL_INTERVAL_MS", "250"),
            ("DATASIM_POLL_DEADLINE_MS", "60000"),
            ("DATASIM_REQUEST_TIMEOUT_MS", "5000"),
        ]))
        .expect("valid env");

        assert_eq!(config.base_url, "https://datasim.internal");
        assert_eq!(config.poll.interval, Duration::from_millis(250));
        assert_eq!(config.poll.deadline, Some(Duration::from_secs(60)));
        assert_eq!(config.request_timeout, Duration::from_secs(5));
    }

    #[test]
    fn malformed_values_are_reported_with_their_variable() {
        let error = ApiConfig::from_lookup(lookup(&[("DATASIM_POLL_INTERVAL_MS", "1s")]))
            .expect_err("not an integer");
        assert_eq!(
            error,
            ConfigError::InvalidDuration {
                name: "DATASIM_POLL_INTERVAL_MS",
                value: String::from("1s"),
            }
        );

        let error = ApiConfig::from_lookup(lookup(&[("DATASIM_API_URL", "localhost:8000")]))
            .expect_err("no scheme");
        assert!(matches!(error, ConfigError::InvalidBaseUrl { .. }));
    }

    #[test]
    fn endpoints_encode_path_segments() {
        let endpoints = ApiEndpoints::new("http://localhost:8000/");

        assert_eq!(endpoints.generate(), "http://localhost:8000/generate-data-async/");
        assert_eq!(
            endpoints.task_status("a b/c"),
            "http://localhost:8000/task-status/a%20b%2Fc"
        );
        assert_eq!(
            endpoints.live_stream(StreamFormat::Json),
            "http://localhost:8000/live-stream/?file_type=json"
        );
        assert_eq!(
            endpoints.table_content("synthetic_orders", 100),
            "http://localhost:8000/get-table-content/synthetic_orders?limit=100"
        );
    }
}
