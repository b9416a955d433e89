//! Query dispatch.
//!
//! Turns a query (DSL text, JSON text, workflow JSON or the session's query
//! graph) into a request body and sends it to one of three targets:
//!
//! - the internal reasoning service, whose body streams progress and ends
//!   with the aggregated response
//! - an aggregator, which only hands back a tracking id (see `aggregator`)
//! - a third-party TRAPI endpoint, answered with a plain JSON response
//!
//! Failures are reported once and never retried; the user resubmits.

use futures_util::StreamExt;
use serde::Serialize;
use serde_json::{json, Value};
use std::time::Duration;

use crate::config::Config;
use crate::error::{ClientError, ClientResult};
use crate::models::QueryGraph;
use crate::response::{classify_response, ResponseOutcome};
use crate::stream::{classify, JsonStreamParser, StreamEvent};
use crate::url_validator::{check_provider_url, validate_provider_url};

#[derive(Debug, Clone)]
pub enum QueryKind {
    Dsl(String),
    Json(String),
    Workflow(String),
    Graph(QueryGraph),
}

impl QueryKind {
    pub fn label(&self) -> &'static str {
        match self {
            QueryKind::Dsl(_) => "dsl",
            QueryKind::Json(_) => "json",
            QueryKind::Workflow(_) => "workflow",
            QueryKind::Graph(_) => "graph",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "target", content = "url", rename_all = "lowercase")]
pub enum Target {
    Internal,
    Aggregator,
    ThirdParty(String),
}

impl Target {
    pub fn label(&self) -> &str {
        match self {
            Target::Internal => "internal",
            Target::Aggregator => "aggregator",
            Target::ThirdParty(_) => "third-party",
        }
    }
}

/// Result of a termination request, shown inline next to the run.
#[derive(Debug, Clone, Serialize)]
pub struct TerminationReport {
    pub terminated: bool,
    pub message: String,
}

// ============================================================================
// Request Bodies
// ============================================================================

fn parse_object(text: &str) -> ClientResult<Value> {
    let value: Value = serde_json::from_str(text).map_err(|e| ClientError::InvalidInput(e.to_string()))?;
    Ok(value)
}

/// DSL lines become `operations.actions`; blank lines and `#` comments are dropped.
fn dsl_actions(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(str::to_string)
        .collect()
}

pub fn build_request_body(kind: &QueryKind) -> ClientResult<Value> {
    match kind {
        QueryKind::Graph(qg) => {
            let qg = serde_json::to_value(qg).map_err(|e| ClientError::InvalidInput(e.to_string()))?;
            Ok(json!({"message": {"query_graph": qg}}))
        }
        QueryKind::Dsl(text) => {
            let actions = dsl_actions(text);
            if actions.is_empty() {
                return Err(ClientError::InvalidInput("no DSL actions given".to_string()));
            }
            Ok(json!({"message": {}, "operations": {"actions": actions}}))
        }
        QueryKind::Workflow(text) => match parse_object(text)? {
            Value::Array(steps) => Ok(json!({"message": {}, "workflow": steps})),
            // A full request object goes out as written.
            v @ Value::Object(_) => Ok(v),
            _ => Err(ClientError::InvalidInput("workflow must be a JSON object or list".to_string())),
        },
        QueryKind::Json(text) => match parse_object(text)? {
            v @ Value::Object(_) => Ok(v),
            _ => Err(ClientError::InvalidInput("query must be a JSON object".to_string())),
        },
    }
}

/// Body for the internal service: always streamed.
pub fn internal_request_body(kind: &QueryKind, submitter: Option<&str>) -> ClientResult<Value> {
    let mut body = build_request_body(kind)?;
    if let Value::Object(ref mut map) = body {
        map.insert("stream_progress".to_string(), Value::Bool(true));
        if let Some(s) = submitter {
            map.entry("submitter").or_insert_with(|| Value::String(s.to_string()));
        }
    }
    Ok(body)
}

// ============================================================================
// Dispatcher
// ============================================================================

const MAX_REDIRECTS: usize = 10;

/// Whether a third-party request may follow a redirect to `next` after
/// `hops` earlier redirects. Every hop passes the same provider URL checks
/// as the submitted URL.
fn check_redirect(next: &url::Url, hops: usize, allowed_domains: &[String]) -> Result<(), String> {
    if hops >= MAX_REDIRECTS {
        return Err("too many redirects".to_string());
    }
    check_provider_url(next.as_str(), allowed_domains)
        .map(|_| ())
        .map_err(|e| format!("redirect to {} refused: {}", next, e))
}

fn provider_redirect_policy(allowed_domains: Vec<String>) -> reqwest::redirect::Policy {
    reqwest::redirect::Policy::custom(move |attempt| {
        match check_redirect(attempt.url(), attempt.previous().len(), &allowed_domains) {
            Ok(()) => attempt.follow(),
            Err(reason) => {
                tracing::warn!(%reason, "third-party redirect stopped");
                attempt.error(reason)
            }
        }
    })
}

/// Log form of a URL: the query string may carry credentials.
fn redacted(url: &str) -> &str {
    url.split_once('?').map_or(url, |(path, _)| path)
}

#[derive(Clone)]
pub struct Dispatcher {
    client: reqwest::Client,
    /// Client for user-supplied endpoints; redirects are re-checked per hop.
    third_party: reqwest::Client,
    config: Config,
}

impl Dispatcher {
    pub fn new(config: Config) -> ClientResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| ClientError::Transport(e.to_string()))?;
        let third_party = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .connect_timeout(Duration::from_secs(10))
            .redirect(provider_redirect_policy(config.allowed_api_domains.clone()))
            .build()
            .map_err(|e| ClientError::Transport(e.to_string()))?;
        Ok(Self { client, third_party, config })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    async fn check_status(response: reqwest::Response) -> ClientResult<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let body = body.chars().take(500).collect();
        Err(ClientError::HttpStatus { status: status.as_u16(), body })
    }

    /// GET a JSON document.
    pub async fn get_json(&self, url: &str) -> ClientResult<Value> {
        tracing::debug!(url = redacted(url), "GET");
        let response = self.client.get(url).send().await?;
        let response = Self::check_status(response).await?;
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| ClientError::ResponseShape(e.to_string()))
    }

    /// POST a JSON body and read a JSON document back.
    pub async fn post_json(&self, url: &str, body: &Value) -> ClientResult<Value> {
        self.post_json_with(&self.client, url, body).await
    }

    async fn post_json_with(&self, client: &reqwest::Client, url: &str, body: &Value) -> ClientResult<Value> {
        tracing::debug!(url = redacted(url), "POST");
        let response = client.post(url).json(body).send().await?;
        let response = Self::check_status(response).await?;
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| ClientError::ResponseShape(e.to_string()))
    }

    /// Submit to the internal service and consume its progress stream.
    /// `on_event` sees every event in arrival order, the final one included.
    pub async fn submit_internal<F>(&self, kind: &QueryKind, mut on_event: F) -> ClientResult<ResponseOutcome>
    where
        F: FnMut(&StreamEvent),
    {
        let body = internal_request_body(kind, self.config.submitter.as_deref())?;
        let url = self.config.query_url();
        tracing::info!(url = %url, kind = kind.label(), "submitting streamed query");

        let response = self.client.post(&url).json(&body).send().await?;
        let response = Self::check_status(response).await?;

        let mut parser = JsonStreamParser::new(self.config.max_stream_buffer);
        let mut final_value = None;
        let mut last_detail = None;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| ClientError::Transport(e.to_string()))?;
            for value in parser.push(&chunk)? {
                let event = classify(value);
                tracing::debug!(?event, "stream event");
                on_event(&event);
                match event {
                    StreamEvent::Final(v) => final_value = Some(v),
                    StreamEvent::ErrorDetail(d) => last_detail = Some(d),
                    _ => {}
                }
            }
        }
        parser.finish()?;

        match final_value {
            Some(v) => classify_response(v),
            None => Err(ClientError::ResponseShape(
                last_detail.unwrap_or_else(|| "stream ended without a final response".to_string()),
            )),
        }
    }

    /// Submit to a third-party TRAPI endpoint.
    pub async fn submit_third_party(&self, url: &str, kind: &QueryKind) -> ClientResult<ResponseOutcome> {
        let url = validate_provider_url(url, &self.config.allowed_api_domains).await?;
        let body = build_request_body(kind)?;
        tracing::info!(url = %url, kind = kind.label(), "submitting third-party query");
        let value = self.post_json_with(&self.third_party, url.as_str(), &body).await?;
        classify_response(value)
    }

    /// Ask the internal service to kill a running query.
    pub async fn terminate(&self, pid: &str, token: &str) -> ClientResult<TerminationReport> {
        let url = format!(
            "{}/status?terminate_pid={}&authorization={}",
            self.config.base_api,
            urlencoding::encode(pid),
            urlencoding::encode(token)
        );
        tracing::info!(pid, "terminating query");
        let value = self.get_json(&url).await?;
        let status = value.get("status").and_then(Value::as_str).unwrap_or("");
        let description = value
            .get("description")
            .and_then(Value::as_str)
            .unwrap_or(status)
            .to_string();
        Ok(TerminationReport {
            terminated: status == "OK",
            message: description,
        })
    }

    /// Fetch a previously computed response from the internal service.
    pub async fn fetch_response(&self, id: &str) -> ClientResult<ResponseOutcome> {
        let url = format!("{}/response/{}", self.config.base_api, urlencoding::encode(id));
        classify_response(self.get_json(&url).await?)
    }

    pub async fn fetch_meta_knowledge_graph(&self) -> ClientResult<crate::meta_kg::MetaKnowledgeGraph> {
        let url = format!("{}/meta_knowledge_graph", self.config.base_api);
        let value = self.get_json(&url).await?;
        serde_json::from_value(value).map_err(|e| ClientError::ResponseShape(e.to_string()))
    }

    /// Recent (`recent`) or latest (`latest`) query listing from the internal service.
    pub async fn fetch_query_listing(&self, which: &str, count: u32) -> ClientResult<Value> {
        let url = format!("{}/status?{}={}", self.config.base_api, which, count);
        self.get_json(&url).await
    }

    pub async fn fetch_smartapi_registry(&self) -> ClientResult<Value> {
        let url = self.config.smartapi_url.clone();
        self.get_json(&url).await
    }
}

#[cfg(test)]
#[path = "dispatch_test.rs"]
mod dispatch_test;
