//! Aggregator runs: submission, status tree and per-agent statistics.
//!
//! The aggregator fans a query out to many agents and only returns a
//! tracking id. Progress is read back by polling the trace view of that id
//! until every child reaches a terminal status.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

use crate::dispatch::{build_request_body, Dispatcher, QueryKind};
use crate::error::{ClientError, ClientResult};
use crate::response::{classify_response, ResponseOutcome};

pub const TERMINAL_STATUSES: &[&str] = &["Done", "Error"];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentActor {
    #[serde(default)]
    pub agent: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentStatus {
    /// Child message id.
    pub message: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub code: Option<u16>,
    #[serde(default)]
    pub actor: AgentActor,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub result_count: Option<u64>,
}

impl AgentStatus {
    pub fn agent_name(&self) -> &str {
        self.actor.agent.as_deref().unwrap_or("unknown")
    }

    pub fn is_terminal(&self) -> bool {
        TERMINAL_STATUSES.contains(&self.status.as_str())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatusTree {
    pub message: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub children: Vec<AgentStatus>,
}

impl StatusTree {
    /// Done when every child is terminal. A tree without children is still
    /// waiting for the fan-out unless the parent itself finished.
    pub fn is_complete(&self) -> bool {
        if self.children.is_empty() {
            return TERMINAL_STATUSES.contains(&self.status.as_str());
        }
        self.children.iter().all(AgentStatus::is_terminal)
    }

    pub fn counts(&self) -> (usize, usize) {
        let done = self.children.iter().filter(|c| c.is_terminal()).count();
        (done, self.children.len())
    }
}

/// Result/node/edge counts of one agent's answer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AgentStats {
    pub results: usize,
    pub nodes: usize,
    pub edges: usize,
}

fn count_entries(v: Option<&Value>) -> usize {
    match v {
        Some(Value::Array(a)) => a.len(),
        Some(Value::Object(o)) => o.len(),
        _ => 0,
    }
}

/// Counts from a child message document. The message sits either under
/// `fields.data.message` or directly under `message`.
pub fn agent_stats(doc: &Value) -> AgentStats {
    let message = doc
        .pointer("/fields/data/message")
        .or_else(|| doc.get("message").filter(|m| m.is_object()));
    let Some(message) = message else {
        return AgentStats::default();
    };
    AgentStats {
        results: count_entries(message.get("results")),
        nodes: count_entries(message.pointer("/knowledge_graph/nodes")),
        edges: count_entries(message.pointer("/knowledge_graph/edges")),
    }
}

/// The TRAPI response inside a child message document (`fields.data`), or
/// the document itself when it is already a bare response.
pub fn trapi_part(doc: Value) -> Value {
    match doc.pointer("/fields/data") {
        Some(data) if data.is_object() => data.clone(),
        _ => doc,
    }
}

pub struct Aggregator<'a> {
    dispatcher: &'a Dispatcher,
    root: String,
}

impl<'a> Aggregator<'a> {
    pub fn new(dispatcher: &'a Dispatcher) -> ClientResult<Self> {
        let root = dispatcher
            .config()
            .aggregator_url
            .clone()
            .ok_or_else(|| ClientError::InvalidInput("no aggregator configured".to_string()))?;
        Ok(Self { dispatcher, root })
    }

    /// Submit a query; returns the tracking id.
    pub async fn submit(&self, kind: &QueryKind) -> ClientResult<String> {
        let body = build_request_body(kind)?;
        let url = format!("{}/submit", self.root);
        tracing::info!(url = %url, kind = kind.label(), "submitting to aggregator");
        let value = self.dispatcher.post_json(&url, &body).await?;
        value
            .get("pk")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| ClientError::ResponseShape("aggregator reply has no `pk`".to_string()))
    }

    pub async fn status(&self, pk: &str) -> ClientResult<StatusTree> {
        let url = format!("{}/messages/{}?trace=y", self.root, urlencoding::encode(pk));
        let value = self.dispatcher.get_json(&url).await?;
        serde_json::from_value(value).map_err(|e| ClientError::ResponseShape(e.to_string()))
    }

    pub async fn message(&self, id: &str) -> ClientResult<Value> {
        let url = format!("{}/messages/{}", self.root, urlencoding::encode(id));
        self.dispatcher.get_json(&url).await
    }

    /// One agent's answer, classified like any other response.
    pub async fn response(&self, id: &str) -> ClientResult<ResponseOutcome> {
        classify_response(trapi_part(self.message(id).await?))
    }

    pub async fn child_stats(&self, child: &str) -> ClientResult<AgentStats> {
        Ok(agent_stats(&self.message(child).await?))
    }

    /// Poll the status tree until it completes or `max_polls` runs out,
    /// handing every snapshot to `on_update`. Returns the last snapshot.
    pub async fn poll<F>(&self, pk: &str, interval: Duration, max_polls: u32, mut on_update: F) -> ClientResult<StatusTree>
    where
        F: FnMut(&StatusTree),
    {
        let mut polls = 0;
        loop {
            let tree = self.status(pk).await?;
            polls += 1;
            on_update(&tree);
            if tree.is_complete() {
                tracing::info!(pk, polls, "aggregator run complete");
                return Ok(tree);
            }
            if polls >= max_polls.max(1) {
                let (done, total) = tree.counts();
                tracing::warn!(pk, done, total, "aggregator polling budget spent");
                return Ok(tree);
            }
            tokio::time::sleep(interval).await;
        }
    }
}
