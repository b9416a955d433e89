//! Incremental parsing of the internal service's progress stream.
//!
//! The body of a `stream_progress` query is a sequence of JSON objects
//! written back to back (usually newline-separated, though nothing relies on
//! that). `JsonStreamParser` tracks nesting and string state byte by byte, so
//! a value is emitted exactly when its closing brace arrives, regardless of
//! how the body is split into chunks or what text appears inside strings.

use serde::Serialize;
use serde_json::Value;

use crate::error::{ClientError, ClientResult};
use crate::models::LogEntry;

const KNOWN_LEVELS: &[&str] = &["DEBUG", "INFO", "WARNING", "WARN", "ERROR"];

// ============================================================================
// Tokenizer
// ============================================================================

#[derive(Debug)]
pub struct JsonStreamParser {
    /// Bytes of the value currently being read.
    buf: Vec<u8>,
    depth: usize,
    in_string: bool,
    escape: bool,
    max_buffer: usize,
}

impl JsonStreamParser {
    pub fn new(max_buffer: usize) -> Self {
        Self {
            buf: Vec::new(),
            depth: 0,
            in_string: false,
            escape: false,
            max_buffer,
        }
    }

    /// Bytes held for a value that has not closed yet.
    pub fn residual(&self) -> usize {
        self.buf.len()
    }

    /// Feed one chunk; returns every value completed by it, in order.
    pub fn push(&mut self, chunk: &[u8]) -> ClientResult<Vec<Value>> {
        let mut out = Vec::new();
        for &b in chunk {
            if self.depth == 0 {
                match b {
                    b' ' | b'\n' | b'\r' | b'\t' | b',' => continue,
                    b'{' | b'[' => {
                        self.depth = 1;
                        self.buf.push(b);
                    }
                    other => {
                        return Err(ClientError::Stream(format!(
                            "unexpected byte {:?} between values",
                            other as char
                        )))
                    }
                }
                continue;
            }

            self.buf.push(b);
            if self.in_string {
                if self.escape {
                    self.escape = false;
                } else if b == b'\\' {
                    self.escape = true;
                } else if b == b'"' {
                    self.in_string = false;
                }
            } else {
                match b {
                    b'"' => self.in_string = true,
                    b'{' | b'[' => self.depth += 1,
                    b'}' | b']' => {
                        self.depth -= 1;
                        if self.depth == 0 {
                            let value = serde_json::from_slice(&self.buf)
                                .map_err(|e| ClientError::Stream(e.to_string()))?;
                            self.buf.clear();
                            out.push(value);
                        }
                    }
                    _ => {}
                }
            }

            if self.buf.len() > self.max_buffer {
                return Err(ClientError::Stream(format!(
                    "value exceeds {} bytes without closing",
                    self.max_buffer
                )));
            }
        }
        Ok(out)
    }

    /// End of input: a value still open means the stream was cut short.
    pub fn finish(&self) -> ClientResult<()> {
        if self.depth > 0 {
            return Err(ClientError::Stream(format!(
                "stream ended inside a value ({} bytes pending)",
                self.buf.len()
            )));
        }
        Ok(())
    }
}

// ============================================================================
// Events
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StepKind {
    Parsing,
    Processing,
}

#[derive(Debug, Clone)]
pub enum StreamEvent {
    Log { entry: LogEntry, step: Option<StepKind> },
    QueryPlan(Value),
    ProcessId(String),
    ErrorDetail(String),
    /// The aggregated response; always the last meaningful value.
    Final(Value),
    Other(Value),
}

fn step_of(message: &str) -> Option<StepKind> {
    if message.starts_with("Parsing action: ") {
        Some(StepKind::Parsing)
    } else if message.starts_with("Processing action ") {
        Some(StepKind::Processing)
    } else {
        None
    }
}

pub fn classify(value: Value) -> StreamEvent {
    let Some(obj) = value.as_object() else {
        return StreamEvent::Other(value);
    };
    if obj.contains_key("logs") {
        return StreamEvent::Final(value);
    }
    if let Some(pid) = obj.get("pid") {
        let pid = match pid {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        return StreamEvent::ProcessId(pid);
    }
    if obj.contains_key("qedge_keys") {
        return StreamEvent::QueryPlan(value);
    }
    if let Some(detail) = obj.get("detail") {
        let detail = detail.as_str().map(str::to_string).unwrap_or_else(|| detail.to_string());
        return StreamEvent::ErrorDetail(detail);
    }
    if obj.get("message").map(Value::is_string).unwrap_or(false) {
        return match serde_json::from_value::<LogEntry>(value.clone()) {
            Ok(entry) => {
                let step = step_of(&entry.message);
                StreamEvent::Log { entry, step }
            }
            Err(_) => StreamEvent::Other(value),
        };
    }
    StreamEvent::Other(value)
}

// ============================================================================
// Progress
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    #[default]
    Running,
    Completed,
    Failed,
    Terminated,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Progress {
    pub status: RunStatus,
    pub parsing_steps: u32,
    pub processing_steps: u32,
    pub logs: Vec<LogEntry>,
    pub query_plan: Option<Value>,
    pub pid: Option<String>,
    pub errors: Vec<String>,
    pub response_id: Option<String>,
}

impl Progress {
    /// Fold one event in. Once frozen (finished or terminated) nothing changes.
    pub fn apply(&mut self, event: &StreamEvent) {
        if self.status != RunStatus::Running {
            return;
        }
        match event {
            StreamEvent::Log { entry, step } => {
                if let Some(level) = entry.level.as_deref() {
                    if !KNOWN_LEVELS.contains(&level.to_uppercase().as_str()) {
                        tracing::warn!(log_level = level, "unexpected log level in progress stream");
                    }
                }
                match step {
                    Some(StepKind::Parsing) => self.parsing_steps += 1,
                    Some(StepKind::Processing) => self.processing_steps += 1,
                    None => {}
                }
                self.logs.push(entry.clone());
            }
            StreamEvent::QueryPlan(plan) => self.query_plan = Some(plan.clone()),
            StreamEvent::ProcessId(pid) => self.pid = Some(pid.clone()),
            StreamEvent::ErrorDetail(detail) => self.errors.push(detail.clone()),
            StreamEvent::Final(_) | StreamEvent::Other(_) => {}
        }
    }

    pub fn can_terminate(&self) -> bool {
        self.status == RunStatus::Running && self.pid.is_some()
    }

    pub fn finish(&mut self, status: RunStatus) {
        if self.status == RunStatus::Running {
            self.status = status;
        }
    }
}

#[cfg(test)]
#[path = "stream_test.rs"]
mod stream_test;
