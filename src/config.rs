//! Runtime configuration read from the environment.
//!
//! The three keys a hosting page used to supply (`base`, `query_endpoint`,
//! `baseAPI`) map to `TRAPI_BASE`, `TRAPI_QUERY_ENDPOINT` and `TRAPI_BASE_API`.

use std::env;
use std::time::Duration;

use crate::{
    DEFAULT_BIND, DEFAULT_HISTOGRAM_SOURCE, DEFAULT_MAX_STREAM_BUFFER, DEFAULT_POLL_MAX,
    DEFAULT_POLL_SECONDS, DEFAULT_QUERY_ENDPOINT, DEFAULT_SESSION_TTL_HOURS,
};

#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the internal reasoning service, e.g. `https://arax.example.org/api/arax/v1.4`.
    pub base: String,
    /// Path appended to `base` for query submission.
    pub query_endpoint: String,
    /// Base URL for auxiliary API calls (meta knowledge graph, recent/latest lists, status).
    /// Falls back to `base`.
    pub base_api: String,
    /// Aggregator root, e.g. `https://ars.example.org/ars/api`.
    pub aggregator_url: Option<String>,
    /// Suggestion endpoint used by the autocomplete proxy.
    pub autocomplete_url: Option<String>,
    /// SmartAPI registry query URL.
    pub smartapi_url: String,
    pub bind: String,
    /// Only results from this source feed the confidence histogram.
    pub histogram_source: String,
    /// Column names for the summary table; empty means the two-column default.
    pub summary_columns: Vec<String>,
    pub poll_interval: Duration,
    pub poll_max: u32,
    pub http_timeout: Duration,
    pub allowed_api_domains: Vec<String>,
    pub submitter: Option<String>,
    pub max_stream_buffer: usize,
    /// Sessions idle for longer than this are dropped.
    pub session_ttl: Duration,
}

fn env_list(key: &str) -> Vec<String> {
    env::var(key)
        .map(|v| {
            v.split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

impl Config {
    pub fn from_env() -> Self {
        let base = env_opt("TRAPI_BASE").unwrap_or_else(|| "http://localhost:5000/api/arax/v1.4".to_string());
        let base = base.trim_end_matches('/').to_string();
        let base_api = env_opt("TRAPI_BASE_API")
            .map(|b| b.trim_end_matches('/').to_string())
            .unwrap_or_else(|| base.clone());

        Self {
            base,
            query_endpoint: env_opt("TRAPI_QUERY_ENDPOINT").unwrap_or_else(|| DEFAULT_QUERY_ENDPOINT.to_string()),
            base_api,
            aggregator_url: env_opt("TRAPI_AGGREGATOR_URL").map(|u| u.trim_end_matches('/').to_string()),
            autocomplete_url: env_opt("TRAPI_AUTOCOMPLETE_URL"),
            smartapi_url: env_opt("TRAPI_SMARTAPI_URL")
                .unwrap_or_else(|| "https://smart-api.info/api/query?q=TRAPI&size=200".to_string()),
            bind: env_opt("TRAPI_BIND").unwrap_or_else(|| DEFAULT_BIND.to_string()),
            histogram_source: env_opt("TRAPI_HISTOGRAM_SOURCE")
                .unwrap_or_else(|| DEFAULT_HISTOGRAM_SOURCE.to_string()),
            summary_columns: env_list("TRAPI_SUMMARY_COLUMNS"),
            poll_interval: Duration::from_secs(env_parse("TRAPI_POLL_SECONDS", DEFAULT_POLL_SECONDS)),
            poll_max: env_parse("TRAPI_POLL_MAX", DEFAULT_POLL_MAX),
            http_timeout: Duration::from_secs(env_parse("TRAPI_HTTP_TIMEOUT_SECONDS", 600u64)),
            allowed_api_domains: env_list("TRAPI_ALLOWED_API_DOMAINS"),
            submitter: env_opt("TRAPI_SUBMITTER"),
            max_stream_buffer: env_parse("TRAPI_MAX_STREAM_BUFFER", DEFAULT_MAX_STREAM_BUFFER),
            session_ttl: Duration::from_secs(env_parse("TRAPI_SESSION_TTL_HOURS", DEFAULT_SESSION_TTL_HOURS).saturating_mul(3600)),
        }
    }

    /// Full URL for query submission to the internal service.
    pub fn query_url(&self) -> String {
        let endpoint = if self.query_endpoint.starts_with('/') {
            self.query_endpoint.clone()
        } else {
            format!("/{}", self.query_endpoint)
        };
        format!("{}{}", self.base, endpoint)
    }

    /// Configuration pointing every provider at `root`; used by tests and local runs.
    pub fn for_base(root: &str) -> Self {
        let root = root.trim_end_matches('/').to_string();
        Self {
            base: root.clone(),
            query_endpoint: DEFAULT_QUERY_ENDPOINT.to_string(),
            base_api: root.clone(),
            aggregator_url: Some(format!("{}/ars", root)),
            autocomplete_url: Some(format!("{}/autocomplete", root)),
            smartapi_url: format!("{}/smartapi", root),
            bind: DEFAULT_BIND.to_string(),
            histogram_source: DEFAULT_HISTOGRAM_SOURCE.to_string(),
            summary_columns: Vec::new(),
            poll_interval: Duration::from_millis(50),
            poll_max: 5,
            http_timeout: Duration::from_secs(10),
            allowed_api_domains: Vec::new(),
            submitter: None,
            max_stream_buffer: DEFAULT_MAX_STREAM_BUFFER,
            session_ttl: Duration::from_secs(3600 * DEFAULT_SESSION_TTL_HOURS),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_url_joins_endpoint() {
        let mut config = Config::for_base("http://localhost:9999/api/");
        assert_eq!(config.query_url(), "http://localhost:9999/api/query");
        config.query_endpoint = "asyncquery".to_string();
        assert_eq!(config.query_url(), "http://localhost:9999/api/asyncquery");
    }
}
