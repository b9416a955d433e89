//! Per-browser session state and per-query runs.
//!
//! A session owns the query graph being edited, the editor popups, the
//! cache of received responses, the query history and the entity lists.
//! Each dispatched query gets its own [`RunHandle`]; progress is folded into
//! it and fanned out to WebSocket listeners over a broadcast channel.

use chrono::{DateTime, Utc};
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::broadcast;

use crate::aggregator::{AgentStats, StatusTree};
use crate::dispatch::{Target, TerminationReport};
use crate::editor::Editors;
use crate::error::ClientError;
use crate::lists::EntityLists;
use crate::models::LogEntry;
use crate::query_graph::GraphState;
use crate::response::{response_id, ResponseOutcome};
use crate::stream::{Progress, RunStatus, StreamEvent};

/// Session cookie name
pub const SESSION_COOKIE: &str = "trapi_session";

const RUN_CHANNEL_CAPACITY: usize = 256;

pub fn generate_id(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// Lock a mutex, recovering the data if another thread panicked while holding it.
pub fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

// ============================================================================
// Runs
// ============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RunOutcome {
    Response { response_id: String, status: String, results: usize },
    Submitted { tracking_id: String },
    Failed { kind: String, message: String },
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RunUpdate {
    Log {
        entry: LogEntry,
    },
    Progress {
        parsing_steps: u32,
        processing_steps: u32,
        pid: Option<String>,
        can_terminate: bool,
    },
    QueryPlan {
        plan: Value,
    },
    Error {
        message: String,
    },
    Aggregator {
        tree: StatusTree,
    },
    AgentStats {
        child: String,
        stats: AgentStats,
    },
    Terminated {
        report: TerminationReport,
    },
    Finished {
        status: RunStatus,
        outcome: RunOutcome,
    },
}

#[derive(Debug, Default)]
struct RunState {
    progress: Progress,
    outcome: Option<RunOutcome>,
    aggregator: Option<StatusTree>,
    agent_stats: BTreeMap<String, AgentStats>,
    termination: Option<TerminationReport>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSnapshot {
    pub id: String,
    pub kind: String,
    pub target: Target,
    pub started: DateTime<Utc>,
    pub progress: Progress,
    pub can_terminate: bool,
    pub outcome: Option<RunOutcome>,
    pub aggregator: Option<StatusTree>,
    pub agent_stats: BTreeMap<String, AgentStats>,
    pub termination: Option<TerminationReport>,
}

#[derive(Debug)]
pub struct RunHandle {
    pub id: String,
    pub kind: String,
    pub target: Target,
    pub started: DateTime<Utc>,
    state: Mutex<RunState>,
    tx: broadcast::Sender<RunUpdate>,
}

impl RunHandle {
    pub fn new(kind: &str, target: Target) -> Arc<Self> {
        let (tx, _) = broadcast::channel(RUN_CHANNEL_CAPACITY);
        Arc::new(Self {
            id: generate_id(12),
            kind: kind.to_string(),
            target,
            started: Utc::now(),
            state: Mutex::new(RunState::default()),
            tx,
        })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RunUpdate> {
        self.tx.subscribe()
    }

    fn send_all(&self, updates: Vec<RunUpdate>) {
        for u in updates {
            // No listeners is fine; the snapshot endpoint still has everything.
            let _ = self.tx.send(u);
        }
    }

    pub fn apply(&self, event: &StreamEvent) {
        let updates = {
            let mut state = lock(&self.state);
            if state.progress.status != RunStatus::Running {
                return;
            }
            state.progress.apply(event);
            let p = &state.progress;
            match event {
                StreamEvent::Log { entry, .. } => vec![
                    RunUpdate::Log { entry: entry.clone() },
                    RunUpdate::Progress {
                        parsing_steps: p.parsing_steps,
                        processing_steps: p.processing_steps,
                        pid: p.pid.clone(),
                        can_terminate: p.can_terminate(),
                    },
                ],
                StreamEvent::ProcessId(_) => vec![RunUpdate::Progress {
                    parsing_steps: p.parsing_steps,
                    processing_steps: p.processing_steps,
                    pid: p.pid.clone(),
                    can_terminate: p.can_terminate(),
                }],
                StreamEvent::QueryPlan(plan) => vec![RunUpdate::QueryPlan { plan: plan.clone() }],
                StreamEvent::ErrorDetail(d) => vec![RunUpdate::Error { message: d.clone() }],
                StreamEvent::Final(_) | StreamEvent::Other(_) => Vec::new(),
            }
        };
        self.send_all(updates);
    }

    pub fn set_aggregator(&self, tree: StatusTree) {
        lock(&self.state).aggregator = Some(tree.clone());
        self.send_all(vec![RunUpdate::Aggregator { tree }]);
    }

    pub fn set_agent_stats(&self, child: &str, stats: AgentStats) {
        lock(&self.state).agent_stats.insert(child.to_string(), stats.clone());
        self.send_all(vec![RunUpdate::AgentStats { child: child.to_string(), stats }]);
    }

    /// Aggregator tracking id, once the submission was accepted.
    pub fn tracking_id(&self) -> Option<String> {
        match &lock(&self.state).outcome {
            Some(RunOutcome::Submitted { tracking_id }) => Some(tracking_id.clone()),
            _ => None,
        }
    }

    /// Report a problem that happens after the run already finished, such as
    /// a failed aggregator poll.
    pub fn notify_error(&self, message: String) {
        tracing::warn!(run = %self.id, %message, "run error");
        self.send_all(vec![RunUpdate::Error { message }]);
    }

    /// Record the end of the run. A terminated run keeps its `Terminated` status.
    pub fn finish(&self, outcome: RunOutcome) {
        let status = {
            let mut state = lock(&self.state);
            let status = match outcome {
                RunOutcome::Failed { .. } => RunStatus::Failed,
                _ => RunStatus::Completed,
            };
            state.progress.finish(status);
            state.outcome = Some(outcome.clone());
            state.progress.status
        };
        self.send_all(vec![RunUpdate::Finished { status, outcome }]);
    }

    pub fn fail(&self, err: &ClientError) {
        tracing::error!(run = %self.id, kind = err.kind(), error = %err, "run failed");
        self.finish(RunOutcome::Failed {
            kind: err.kind().to_string(),
            message: err.to_string(),
        });
    }

    pub fn pid(&self) -> Option<String> {
        lock(&self.state).progress.pid.clone()
    }

    pub fn can_terminate(&self) -> bool {
        lock(&self.state).progress.can_terminate()
    }

    /// Store a termination report; a successful one freezes the progress.
    pub fn record_termination(&self, report: TerminationReport) {
        {
            let mut state = lock(&self.state);
            if report.terminated {
                state.progress.finish(RunStatus::Terminated);
            }
            state.termination = Some(report.clone());
        }
        self.send_all(vec![RunUpdate::Terminated { report }]);
    }

    pub fn snapshot(&self) -> RunSnapshot {
        let state = lock(&self.state);
        RunSnapshot {
            id: self.id.clone(),
            kind: self.kind.clone(),
            target: self.target.clone(),
            started: self.started,
            progress: state.progress.clone(),
            can_terminate: state.progress.can_terminate(),
            outcome: state.outcome.clone(),
            aggregator: state.aggregator.clone(),
            agent_stats: state.agent_stats.clone(),
            termination: state.termination.clone(),
        }
    }
}

// ============================================================================
// Session
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct HistoryEntry {
    pub at: DateTime<Utc>,
    pub kind: String,
    pub target: String,
    pub run_id: String,
    pub status: Option<String>,
    pub response_id: Option<String>,
}

#[derive(Debug, Default)]
pub struct Session {
    pub graph: GraphState,
    pub editors: Editors,
    /// Received responses by id. Never evicted.
    pub responses: HashMap<String, ResponseOutcome>,
    pub history: Vec<HistoryEntry>,
    pub lists: EntityLists,
    pub runs: HashMap<String, Arc<RunHandle>>,
    pub current_response: Option<String>,
    local_ids: u32,
}

impl Session {
    pub fn start_run(&mut self, run: Arc<RunHandle>) {
        self.history.insert(
            0,
            HistoryEntry {
                at: run.started,
                kind: run.kind.clone(),
                target: run.target.label().to_string(),
                run_id: run.id.clone(),
                status: None,
                response_id: None,
            },
        );
        self.runs.insert(run.id.clone(), run);
    }

    /// Cache a received response and make it current.
    ///
    /// A `QueryGraphZeroNodes` outcome also clears the query graph and closes
    /// the editors. Responses without an id get a session-local one.
    pub fn store_response(&mut self, outcome: ResponseOutcome, run_id: Option<&str>) -> String {
        let id = match response_id(outcome.response()) {
            Some(id) => id,
            None => {
                self.local_ids += 1;
                format!("local-{}", self.local_ids)
            }
        };
        self.cache_response(&id, outcome, run_id);
        id
    }

    /// Like [`Session::store_response`], under an id the caller already knows
    /// (a response loaded by id).
    pub fn cache_response(&mut self, id: &str, outcome: ResponseOutcome, run_id: Option<&str>) {
        if matches!(outcome, ResponseOutcome::ZeroNodes(_)) {
            self.graph.reset();
            self.editors.sync(&self.graph);
        }
        if let Some(run_id) = run_id {
            if let Some(entry) = self.history.iter_mut().find(|h| h.run_id == run_id) {
                entry.status = Some(outcome.status_label().to_string());
                entry.response_id = Some(id.to_string());
            }
        }
        self.responses.insert(id.to_string(), outcome);
        self.current_response = Some(id.to_string());
    }

    pub fn record_submission(&mut self, run_id: &str, tracking_id: &str) {
        if let Some(entry) = self.history.iter_mut().find(|h| h.run_id == run_id) {
            entry.status = Some("Submitted".to_string());
            entry.response_id = Some(tracking_id.to_string());
        }
    }

    pub fn record_failure(&mut self, run_id: &str, err: &ClientError) {
        if let Some(entry) = self.history.iter_mut().find(|h| h.run_id == run_id) {
            entry.status = Some(format!("error: {}", err.kind()));
        }
    }

    pub fn response(&self, id: &str) -> Option<&ResponseOutcome> {
        self.responses.get(id)
    }
}

// ============================================================================
// Store
// ============================================================================

struct StoredSession {
    session: Arc<Mutex<Session>>,
    last_seen: DateTime<Utc>,
}

/// Cookie-keyed sessions. A session idle for longer than the TTL is dropped
/// and its cookie no longer resolves.
pub struct SessionStore {
    sessions: Mutex<HashMap<String, StoredSession>>,
    ttl: chrono::Duration,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::with_ttl(std::time::Duration::from_secs(3600 * crate::DEFAULT_SESSION_TTL_HOURS))
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ttl(ttl: std::time::Duration) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            ttl: chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::days(365)),
        }
    }

    /// Look up the session for a cookie value, creating a fresh one (with a
    /// new id) if the cookie is missing, unknown or expired. Returns
    /// `(id, session, created)`.
    pub fn get_or_create(&self, cookie: Option<&str>) -> (String, Arc<Mutex<Session>>, bool) {
        self.get_or_create_at(cookie, Utc::now())
    }

    fn get_or_create_at(&self, cookie: Option<&str>, now: DateTime<Utc>) -> (String, Arc<Mutex<Session>>, bool) {
        let mut sessions = lock(&self.sessions);
        if let Some(id) = cookie {
            if let Some(session) = Self::touch(&mut sessions, id, now, self.ttl) {
                return (id.to_string(), session, false);
            }
        }

        // New sessions are the only thing that grows the map, so expired
        // ones are swept here.
        let before = sessions.len();
        let ttl = self.ttl;
        sessions.retain(|_, s| !is_expired(s, now, ttl));
        let swept = before - sessions.len();
        if swept > 0 {
            tracing::debug!(swept, "expired sessions dropped");
        }

        let id = generate_id(24);
        let session = Arc::new(Mutex::new(Session::default()));
        sessions.insert(
            id.clone(),
            StoredSession {
                session: session.clone(),
                last_seen: now,
            },
        );
        tracing::debug!(session = %id, "new session");
        (id, session, true)
    }

    /// An existing, unexpired session. Never creates one.
    pub fn get(&self, id: &str) -> Option<Arc<Mutex<Session>>> {
        self.get_at(id, Utc::now())
    }

    fn get_at(&self, id: &str, now: DateTime<Utc>) -> Option<Arc<Mutex<Session>>> {
        Self::touch(&mut lock(&self.sessions), id, now, self.ttl)
    }

    /// Refresh `last_seen` of a live session; remove it if it already expired.
    fn touch(
        sessions: &mut HashMap<String, StoredSession>,
        id: &str,
        now: DateTime<Utc>,
        ttl: chrono::Duration,
    ) -> Option<Arc<Mutex<Session>>> {
        let stored = sessions.get_mut(id)?;
        if is_expired(stored, now, ttl) {
            sessions.remove(id);
            return None;
        }
        stored.last_seen = now;
        Some(stored.session.clone())
    }

    pub fn len(&self) -> usize {
        lock(&self.sessions).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn is_expired(stored: &StoredSession, now: DateTime<Utc>, ttl: chrono::Duration) -> bool {
    now.signed_duration_since(stored.last_seen) > ttl
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::classify_response;
    use crate::stream::classify;
    use serde_json::json;

    #[test]
    fn test_zero_nodes_resets_editor() {
        let mut s = Session::default();
        let n0 = s.graph.add_node();
        s.graph.add_node();
        let e0 = s.graph.add_edge(None, None).unwrap();
        s.editors.show_node(&s.graph, &n0);
        s.editors.show_edge(&s.graph, &e0);

        let outcome = classify_response(json!({"status": "QueryGraphZeroNodes", "message": {}})).unwrap();
        let id = s.store_response(outcome, None);
        assert!(s.graph.is_empty());
        assert_eq!(s.editors.node.shown_id(), None);
        assert_eq!(s.editors.edge.shown_id(), None);
        assert_eq!(id, "local-1");
        // A new query starts numbering from scratch.
        assert_eq!(s.graph.add_node(), "n0");
    }

    #[test]
    fn test_history_is_newest_first_and_filled_in() {
        let mut s = Session::default();
        let first = RunHandle::new("dsl", Target::Internal);
        let second = RunHandle::new("graph", Target::Aggregator);
        s.start_run(first.clone());
        s.start_run(second.clone());
        assert_eq!(s.history[0].run_id, second.id);

        let outcome = classify_response(json!({"status": "OK", "id": "r/55", "message": {}})).unwrap();
        let id = s.store_response(outcome, Some(&first.id));
        assert_eq!(id, "55");
        assert_eq!(s.history[1].response_id.as_deref(), Some("55"));
        assert_eq!(s.history[1].status.as_deref(), Some("OK"));
        assert_eq!(s.current_response.as_deref(), Some("55"));
        assert!(s.response("55").is_some());
    }

    #[tokio::test]
    async fn test_run_broadcasts_updates() {
        let run = RunHandle::new("dsl", Target::Internal);
        let mut rx = run.subscribe();
        run.apply(&classify(json!({"message": "Parsing action: x", "level": "INFO"})));
        run.apply(&classify(json!({"pid": 7})));

        assert!(matches!(rx.recv().await.unwrap(), RunUpdate::Log { .. }));
        assert!(matches!(rx.recv().await.unwrap(), RunUpdate::Progress { parsing_steps: 1, .. }));
        match rx.recv().await.unwrap() {
            RunUpdate::Progress { pid, can_terminate, .. } => {
                assert_eq!(pid.as_deref(), Some("7"));
                assert!(can_terminate);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_termination_freezes_run() {
        let run = RunHandle::new("dsl", Target::Internal);
        run.apply(&classify(json!({"pid": 7})));
        run.record_termination(TerminationReport { terminated: true, message: "ok".into() });
        run.apply(&classify(json!({"message": "Parsing action: late"})));
        run.finish(RunOutcome::Response { response_id: "1".into(), status: "OK".into(), results: 0 });

        let snap = run.snapshot();
        assert_eq!(snap.progress.status, RunStatus::Terminated);
        assert_eq!(snap.progress.parsing_steps, 0);
        assert!(!snap.can_terminate);
        assert!(snap.termination.unwrap().terminated);
    }

    #[test]
    fn test_failed_termination_keeps_running() {
        let run = RunHandle::new("dsl", Target::Internal);
        run.apply(&classify(json!({"pid": 7})));
        run.record_termination(TerminationReport { terminated: false, message: "denied".into() });
        assert!(run.can_terminate());
        assert_eq!(run.pid().as_deref(), Some("7"));
    }

    #[test]
    fn test_store_reuses_known_session() {
        let store = SessionStore::new();
        let (id, _, created) = store.get_or_create(None);
        assert!(created);
        assert_eq!(id.len(), 24);
        let (again, _, created) = store.get_or_create(Some(&id));
        assert_eq!(again, id);
        assert!(!created);
        let (_, _, created) = store.get_or_create(Some("stale"));
        assert!(created);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_idle_sessions_expire() {
        let store = SessionStore::with_ttl(std::time::Duration::from_secs(3600));
        let start = Utc::now();
        let (id, _, _) = store.get_or_create_at(None, start);

        let later = start + chrono::Duration::minutes(59);
        assert!(store.get_at(&id, later).is_some());
        // The lookup refreshed it, so it is still alive an hour after start.
        let (again, _, created) = store.get_or_create_at(Some(&id), later + chrono::Duration::minutes(30));
        assert_eq!(again, id);
        assert!(!created);

        let gone = later + chrono::Duration::minutes(30) + chrono::Duration::minutes(61);
        assert!(store.get_at(&id, gone).is_none());
        assert!(store.is_empty());
        let (fresh, _, created) = store.get_or_create_at(Some(&id), gone);
        assert!(created);
        assert_ne!(fresh, id);
    }

    #[test]
    fn test_cookieless_requests_do_not_accumulate() {
        let store = SessionStore::with_ttl(std::time::Duration::from_secs(60));
        let start = Utc::now();
        for i in 0..10_000 {
            store.get_or_create_at(None, start + chrono::Duration::seconds(i));
        }
        // Only the last minute's worth survives the sweeps.
        assert!(store.len() <= 62, "{} sessions kept", store.len());
    }

    #[test]
    fn test_get_never_creates() {
        let store = SessionStore::new();
        assert!(store.get("missing").is_none());
        assert!(store.is_empty());
    }
}
