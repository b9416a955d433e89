//! HTTP route handlers for the workbench.
//!
//! Pages are rendered on the server; the query graph editor and the entity
//! lists are driven by small JSON endpoints under `/api`. Query runs execute
//! in background tasks and report progress over `/ws/run/{id}`.

use axum::{
    extract::{
        ws::{Message, WebSocket},
        Path, Query, State, WebSocketUpgrade,
    },
    http::{header::CONTENT_TYPE, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{delete, get, post},
    Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;

use crate::aggregator::{Aggregator, StatusTree};
use crate::autocomplete::{self, DEFAULT_LIMIT};
use crate::dispatch::{build_request_body, QueryKind, Target};
use crate::editor::{predicate_suggestions, EdgeEdit, NodeEdit};
use crate::error::{ClientError, ClientResult};
use crate::graph_view;
use crate::render::build_response_view;
use crate::render::results::QUERY_GRAPH_PANEL;
use crate::response::ResponseOutcome;
use crate::session::{lock, RunHandle, RunOutcome, Session, SESSION_COOKIE};
use crate::templates::{
    client_error_block, render_listing, render_response, render_run_page, render_smartapi, render_suggestions,
    render_workbench, Tab, WorkbenchPage,
};
use crate::AppState;

type Shared = Arc<AppState>;

// ============================================================================
// Router
// ============================================================================

pub fn app(state: Shared) -> Router {
    Router::new()
        .route("/", get(index))
        // Query graph editor
        .route("/api/graph", get(graph_state))
        .route("/api/graph/node", post(add_node))
        .route("/api/graph/edge", post(add_edge))
        .route("/api/graph/node/{id}", delete(remove_node))
        .route("/api/graph/edge/{id}", delete(remove_edge))
        .route("/api/graph/node/{id}/edit", post(edit_node))
        .route("/api/graph/edge/{id}/edit", post(edit_edge))
        .route("/api/graph/edge/{id}/predicates", get(edge_predicates))
        .route("/api/graph/select", post(select_element))
        .route("/api/graph/hide", post(hide_editor))
        .route("/api/graph/reset", post(reset_graph))
        .route("/api/graph/import", post(import_graph))
        .route("/api/categories", get(categories))
        // Runs
        .route("/api/query", post(submit_query))
        .route("/run/{id}", get(run_page))
        .route("/api/run/{id}", get(run_snapshot))
        .route("/api/run/{id}/terminate", post(terminate_run))
        .route("/api/run/{id}/refresh", post(refresh_run))
        .route("/ws/run/{id}", get(run_ws))
        // Responses
        .route("/response/{id}", get(response_page))
        .route("/response/{id}/tsv", get(response_tsv))
        .route("/api/response/{id}", get(response_json))
        .route("/api/response/{id}/aux/{aux}", get(auxiliary_graph))
        // Lists, history, synonyms
        .route("/api/lists", get(lists).post(create_list))
        .route("/api/lists/{name}", delete(delete_list))
        .route("/api/lists/{name}/items", post(add_list_item))
        .route("/api/lists/{name}/items/{curie}", delete(remove_list_item))
        .route("/api/lists/{name}/clear", post(clear_list))
        .route("/api/lists/{name}/use", post(use_list))
        .route("/api/history", get(history))
        .route("/api/autocomplete", get(autocomplete_terms))
        .with_state(state)
}

// ============================================================================
// Session Helpers
// ============================================================================

/// The caller's session, plus the jar with a fresh cookie if one was created.
fn session_for(state: &AppState, jar: CookieJar) -> (CookieJar, Arc<Mutex<Session>>) {
    let cookie = jar.get(SESSION_COOKIE).map(|c| c.value().to_string());
    let (id, session, created) = state.sessions.get_or_create(cookie.as_deref());
    if !created {
        return (jar, session);
    }
    let cookie = Cookie::build((SESSION_COOKIE, id))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax);
    (jar.add(cookie), session)
}

/// The caller's existing session. Never creates one, so lookup-only routes
/// cannot grow the store.
fn existing_session(state: &AppState, jar: &CookieJar) -> Option<Arc<Mutex<Session>>> {
    jar.get(SESSION_COOKIE).and_then(|c| state.sessions.get(c.value()))
}

fn not_found(what: &str) -> Response {
    (StatusCode::NOT_FOUND, Json(json!({"error": format!("{} not found", what)}))).into_response()
}

fn find_run(session: &Mutex<Session>, id: &str) -> Option<Arc<RunHandle>> {
    lock(session).runs.get(id).cloned()
}

// ============================================================================
// Bootstrap
// ============================================================================

const DEFAULT_LISTING_COUNT: u32 = 10;

/// Query parameters accepted by `/`.
#[derive(Debug, Default, Deserialize)]
pub struct BootstrapParams {
    pub tab: Option<String>,
    pub term: Option<String>,
    pub recent: Option<String>,
    pub latest: Option<String>,
    pub smartapi: Option<String>,
    pub r: Option<String>,
    pub id: Option<String>,
    pub from: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BootstrapAction {
    Nothing,
    LoadResponse { id: String, from_aggregator: bool },
    Term(String),
    Recent(u32),
    Latest(u32),
    SmartApi,
}

fn listing_count(raw: &str) -> u32 {
    raw.trim().parse().ok().filter(|n| *n > 0).unwrap_or(DEFAULT_LISTING_COUNT)
}

impl BootstrapParams {
    /// What the page should do on load. A response id wins over everything else.
    pub fn action(&self) -> BootstrapAction {
        let non_empty = |v: &Option<String>| v.as_deref().map(str::trim).filter(|s| !s.is_empty()).map(str::to_string);
        if let Some(id) = non_empty(&self.r).or_else(|| non_empty(&self.id)) {
            let from_aggregator = self.from.as_deref().is_some_and(|f| f.eq_ignore_ascii_case("ars"));
            return BootstrapAction::LoadResponse { id, from_aggregator };
        }
        if let Some(term) = non_empty(&self.term) {
            return BootstrapAction::Term(term);
        }
        if let Some(n) = &self.recent {
            return BootstrapAction::Recent(listing_count(n));
        }
        if let Some(n) = &self.latest {
            return BootstrapAction::Latest(listing_count(n));
        }
        if self.smartapi.is_some() {
            return BootstrapAction::SmartApi;
        }
        BootstrapAction::Nothing
    }
}

/// Fetch a response by id and cache it in the session under that id.
async fn load_response(
    state: &AppState,
    session: &Mutex<Session>,
    id: &str,
    from_aggregator: bool,
) -> ClientResult<()> {
    let cached = lock(session).response(id).is_some();
    if cached {
        return Ok(());
    }
    let outcome = if from_aggregator {
        Aggregator::new(&state.dispatcher)?.response(id).await?
    } else {
        state.dispatcher.fetch_response(id).await?
    };
    tracing::info!(id, status = outcome.status_label(), "response loaded");
    lock(session).cache_response(id, outcome, None);
    Ok(())
}

pub async fn index(State(state): State<Shared>, jar: CookieJar, Query(params): Query<BootstrapParams>) -> Response {
    let (jar, session) = session_for(&state, jar);
    let mut tab = params.tab.as_deref().and_then(Tab::parse).unwrap_or_default();
    let action = params.action();
    let mut term = None;

    let bootstrap = match action {
        BootstrapAction::Nothing => String::new(),
        BootstrapAction::LoadResponse { id, from_aggregator } => {
            match load_response(&state, &session, &id, from_aggregator).await {
                Ok(()) => {
                    let to = format!("/response/{}", urlencoding::encode(&id));
                    return (jar, Redirect::to(&to)).into_response();
                }
                Err(e) => {
                    tracing::warn!(id, error = %e, "could not load response");
                    client_error_block(&e)
                }
            }
        }
        BootstrapAction::Term(t) => {
            tab = Tab::Synonyms;
            let html = match autocomplete::suggest(&state.dispatcher, &t, DEFAULT_LIMIT).await {
                Ok(terms) => render_suggestions(&t, &terms),
                Err(e) => client_error_block(&e),
            };
            term = Some(t);
            html
        }
        BootstrapAction::Recent(n) => match state.dispatcher.fetch_query_listing("recent", n).await {
            Ok(v) => render_listing("Recent queries", &v),
            Err(e) => client_error_block(&e),
        },
        BootstrapAction::Latest(n) => match state.dispatcher.fetch_query_listing("latest", n).await {
            Ok(v) => render_listing("Latest queries", &v),
            Err(e) => client_error_block(&e),
        },
        BootstrapAction::SmartApi => match state.dispatcher.fetch_smartapi_registry().await {
            Ok(v) => render_smartapi(&v),
            Err(e) => client_error_block(&e),
        },
    };

    let html = {
        let session = lock(&session);
        render_workbench(&WorkbenchPage {
            tab,
            session: &session,
            bootstrap: &bootstrap,
            term: term.as_deref(),
            aggregator_enabled: state.config.aggregator_url.is_some(),
        })
    };
    (jar, Html(html)).into_response()
}

// ============================================================================
// Query Graph Editor
// ============================================================================

fn graph_json(session: &Session) -> Value {
    json!({
        "query_graph": session.graph.to_trapi_json(),
        "editors": session.editors,
        "widget": graph_view::from_query_graph(session.graph.graph(), QUERY_GRAPH_PANEL),
    })
}

pub async fn graph_state(State(state): State<Shared>, jar: CookieJar) -> (CookieJar, Json<Value>) {
    let (jar, session) = session_for(&state, jar);
    let body = graph_json(&lock(&session));
    (jar, Json(body))
}

#[derive(Debug, Default, Deserialize)]
pub struct AddNodeRequest {
    #[serde(default)]
    pub ids: Vec<String>,
    #[serde(default)]
    pub categories: Vec<String>,
}

pub async fn add_node(
    State(state): State<Shared>,
    jar: CookieJar,
    Json(req): Json<AddNodeRequest>,
) -> (CookieJar, Json<Value>) {
    let (jar, session) = session_for(&state, jar);
    let id = {
        let mut s = lock(&session);
        let id = s.graph.add_node();
        for curie in &req.ids {
            s.graph.add_node_id(&id, curie, None);
        }
        for category in &req.categories {
            s.graph.add_category(&id, category);
        }
        let Session { graph, editors, .. } = &mut *s;
        editors.show_node(graph, &id);
        id
    };
    (jar, Json(json!({"id": id})))
}

#[derive(Debug, Default, Deserialize)]
pub struct AddEdgeRequest {
    pub subject: Option<String>,
    pub object: Option<String>,
}

pub async fn add_edge(
    State(state): State<Shared>,
    jar: CookieJar,
    Json(req): Json<AddEdgeRequest>,
) -> Result<(CookieJar, Json<Value>), ClientError> {
    let (jar, session) = session_for(&state, jar);
    let id = {
        let mut s = lock(&session);
        let id = s
            .graph
            .add_edge(req.subject.as_deref(), req.object.as_deref())
            .ok_or_else(|| ClientError::InvalidInput("an edge needs two existing nodes".to_string()))?;
        let Session { graph, editors, .. } = &mut *s;
        editors.show_edge(graph, &id);
        id
    };
    Ok((jar, Json(json!({"id": id}))))
}

pub async fn remove_node(State(state): State<Shared>, jar: CookieJar, Path(id): Path<String>) -> Response {
    let (jar, session) = session_for(&state, jar);
    let removed = {
        let mut s = lock(&session);
        if s.graph.node(&id).is_none() {
            return not_found("node");
        }
        let removed = s.graph.remove_node(&id);
        let Session { graph, editors, .. } = &mut *s;
        editors.sync(graph);
        removed
    };
    (jar, Json(json!({"removed_edges": removed}))).into_response()
}

pub async fn remove_edge(State(state): State<Shared>, jar: CookieJar, Path(id): Path<String>) -> Response {
    let (jar, session) = session_for(&state, jar);
    let mut s = lock(&session);
    if !s.graph.remove_edge(&id) {
        return not_found("edge");
    }
    let Session { graph, editors, .. } = &mut *s;
    editors.sync(graph);
    drop(s);
    (jar, Json(json!({"removed": id}))).into_response()
}

pub async fn edit_node(
    State(state): State<Shared>,
    jar: CookieJar,
    Path(id): Path<String>,
    Json(edit): Json<NodeEdit>,
) -> Response {
    let (jar, session) = session_for(&state, jar);
    let changed = {
        let mut s = lock(&session);
        if s.graph.node(&id).is_none() {
            return not_found("node");
        }
        edit.apply(&mut s.graph, &id)
    };
    (jar, Json(json!({"changed": changed}))).into_response()
}

pub async fn edit_edge(
    State(state): State<Shared>,
    jar: CookieJar,
    Path(id): Path<String>,
    Json(edit): Json<EdgeEdit>,
) -> Response {
    let (jar, session) = session_for(&state, jar);
    let changed = {
        let mut s = lock(&session);
        if s.graph.edge(&id).is_none() {
            return not_found("edge");
        }
        edit.apply(&mut s.graph, &id)
    };
    (jar, Json(json!({"changed": changed}))).into_response()
}

pub async fn edge_predicates(
    State(state): State<Shared>,
    jar: CookieJar,
    Path(id): Path<String>,
) -> (CookieJar, Json<Vec<String>>) {
    let (jar, session) = session_for(&state, jar);
    // Fetched before locking; the catalog may need a network round trip.
    let catalog = state.catalog().await;
    let predicates = predicate_suggestions(&lock(&session).graph, &catalog, &id);
    (jar, Json(predicates))
}

pub async fn categories(State(state): State<Shared>) -> Json<Vec<String>> {
    Json(state.catalog().await.categories())
}

#[derive(Debug, Deserialize)]
pub struct SelectRequest {
    pub element: String,
}

pub async fn select_element(
    State(state): State<Shared>,
    jar: CookieJar,
    Json(req): Json<SelectRequest>,
) -> Response {
    let (jar, session) = session_for(&state, jar);
    let mut s = lock(&session);
    let widget = graph_view::from_query_graph(s.graph.graph(), QUERY_GRAPH_PANEL);
    let Some(element) = widget.resolve_click(&req.element) else {
        return not_found("element");
    };
    let Session { graph, editors, .. } = &mut *s;
    editors.select(graph, &element);
    let body = json!({"editors": editors});
    drop(s);
    (jar, Json(body)).into_response()
}

#[derive(Debug, Deserialize)]
pub struct HideRequest {
    pub editor: String,
}

pub async fn hide_editor(
    State(state): State<Shared>,
    jar: CookieJar,
    Json(req): Json<HideRequest>,
) -> Result<(CookieJar, Json<Value>), ClientError> {
    let (jar, session) = session_for(&state, jar);
    let mut s = lock(&session);
    match req.editor.as_str() {
        "node" => s.editors.hide_node(),
        "edge" => s.editors.hide_edge(),
        other => return Err(ClientError::InvalidInput(format!("unknown editor `{}`", other))),
    }
    let body = json!({"editors": s.editors});
    drop(s);
    Ok((jar, Json(body)))
}

pub async fn reset_graph(State(state): State<Shared>, jar: CookieJar) -> (CookieJar, Json<Value>) {
    let (jar, session) = session_for(&state, jar);
    let body = {
        let mut s = lock(&session);
        s.graph.reset();
        let Session { graph, editors, .. } = &mut *s;
        editors.sync(graph);
        graph_json(&s)
    };
    (jar, Json(body))
}

#[derive(Debug, Deserialize)]
pub struct ImportRequest {
    pub text: String,
}

pub async fn import_graph(
    State(state): State<Shared>,
    jar: CookieJar,
    Json(req): Json<ImportRequest>,
) -> Result<(CookieJar, Json<Value>), ClientError> {
    let (jar, session) = session_for(&state, jar);
    let body = {
        let mut s = lock(&session);
        s.graph.load_json(&req.text)?;
        let Session { graph, editors, .. } = &mut *s;
        editors.sync(graph);
        graph_json(&s)
    };
    Ok((jar, Json(body)))
}

// ============================================================================
// Query Runs
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct SubmitRequest {
    pub kind: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub target: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

impl SubmitRequest {
    pub fn target(&self, aggregator_enabled: bool) -> ClientResult<Target> {
        match self.target.as_deref().unwrap_or("internal") {
            "" | "internal" => Ok(Target::Internal),
            "aggregator" if aggregator_enabled => Ok(Target::Aggregator),
            "aggregator" => Err(ClientError::InvalidInput("no aggregator configured".to_string())),
            "third-party" => match self.url.as_deref().map(str::trim).filter(|u| !u.is_empty()) {
                Some(url) => Ok(Target::ThirdParty(url.to_string())),
                None => Err(ClientError::InvalidInput("a third-party target needs a URL".to_string())),
            },
            other => Err(ClientError::InvalidInput(format!("unknown target `{}`", other))),
        }
    }

    pub fn query_kind(&self, session: &Session) -> ClientResult<QueryKind> {
        match self.kind.as_str() {
            "graph" => {
                if session.graph.is_empty() {
                    return Err(ClientError::InvalidInput("the query graph is empty".to_string()));
                }
                Ok(QueryKind::Graph(session.graph.graph().clone()))
            }
            "dsl" => Ok(QueryKind::Dsl(self.text.clone())),
            "json" => Ok(QueryKind::Json(self.text.clone())),
            "workflow" => Ok(QueryKind::Workflow(self.text.clone())),
            other => Err(ClientError::InvalidInput(format!("unknown query kind `{}`", other))),
        }
    }
}

pub async fn submit_query(
    State(state): State<Shared>,
    jar: CookieJar,
    Json(req): Json<SubmitRequest>,
) -> Result<(CookieJar, Json<Value>), ClientError> {
    let (jar, session) = session_for(&state, jar);
    let target = req.target(state.config.aggregator_url.is_some())?;
    let (run, kind) = {
        let mut s = lock(&session);
        let kind = req.query_kind(&s)?;
        // Input errors are reported here, before a run exists.
        build_request_body(&kind)?;
        let run = RunHandle::new(kind.label(), target);
        s.start_run(run.clone());
        (run, kind)
    };
    tracing::info!(run = %run.id, kind = kind.label(), target = run.target.label(), "query submitted");
    tokio::spawn(drive_run(state.clone(), session, run.clone(), kind));
    Ok((jar, Json(json!({"run_id": run.id}))))
}

async fn drive_run(state: Shared, session: Arc<Mutex<Session>>, run: Arc<RunHandle>, kind: QueryKind) {
    match run.target.clone() {
        Target::Internal => {
            let result = state.dispatcher.submit_internal(&kind, |event| run.apply(event)).await;
            complete_run(&session, &run, result);
        }
        Target::ThirdParty(url) => {
            let result = state.dispatcher.submit_third_party(&url, &kind).await;
            complete_run(&session, &run, result);
        }
        Target::Aggregator => drive_aggregator(&state, &session, &run, &kind).await,
    }
}

fn complete_run(session: &Mutex<Session>, run: &RunHandle, result: ClientResult<ResponseOutcome>) {
    match result {
        Ok(outcome) => {
            let status = outcome.status_label().to_string();
            let results = outcome.result_count();
            let response_id = lock(session).store_response(outcome, Some(&run.id));
            tracing::info!(run = %run.id, %status, results, "run finished");
            run.finish(RunOutcome::Response { response_id, status, results });
        }
        Err(e) => {
            lock(session).record_failure(&run.id, &e);
            run.fail(&e);
        }
    }
}

async fn drive_aggregator(state: &AppState, session: &Mutex<Session>, run: &RunHandle, kind: &QueryKind) {
    let submitted = async {
        let aggregator = Aggregator::new(&state.dispatcher)?;
        let pk = aggregator.submit(kind).await?;
        Ok::<_, ClientError>((aggregator, pk))
    }
    .await;
    let (aggregator, pk) = match submitted {
        Ok(v) => v,
        Err(e) => {
            lock(session).record_failure(&run.id, &e);
            run.fail(&e);
            return;
        }
    };
    lock(session).record_submission(&run.id, &pk);
    run.finish(RunOutcome::Submitted { tracking_id: pk.clone() });

    let polled = aggregator
        .poll(&pk, state.config.poll_interval, state.config.poll_max, |tree| {
            run.set_aggregator(tree.clone())
        })
        .await;
    match polled {
        Ok(tree) if tree.is_complete() => collect_agent_stats(&aggregator, run, &tree).await,
        Ok(_) => {}
        Err(e) => run.notify_error(e.to_string()),
    }
}

/// Result/node/edge counts for every child that finished successfully.
async fn collect_agent_stats(aggregator: &Aggregator<'_>, run: &RunHandle, tree: &StatusTree) {
    for child in tree.children.iter().filter(|c| c.status == "Done") {
        match aggregator.child_stats(&child.message).await {
            Ok(stats) => run.set_agent_stats(&child.message, stats),
            Err(e) => run.notify_error(format!("{}: {}", child.agent_name(), e)),
        }
    }
}

pub async fn run_page(State(state): State<Shared>, jar: CookieJar, Path(id): Path<String>) -> Response {
    let (jar, session) = session_for(&state, jar);
    match find_run(&session, &id) {
        Some(run) => (jar, Html(render_run_page(&run.snapshot()))).into_response(),
        None => (jar, Redirect::to("/?tab=history")).into_response(),
    }
}

pub async fn run_snapshot(State(state): State<Shared>, jar: CookieJar, Path(id): Path<String>) -> Response {
    match existing_session(&state, &jar).and_then(|session| find_run(&session, &id)) {
        Some(run) => Json(run.snapshot()).into_response(),
        None => not_found("run"),
    }
}

#[derive(Debug, Deserialize)]
pub struct TerminateRequest {
    #[serde(default)]
    pub token: String,
}

pub async fn terminate_run(
    State(state): State<Shared>,
    jar: CookieJar,
    Path(id): Path<String>,
    Json(req): Json<TerminateRequest>,
) -> Response {
    let (jar, session) = session_for(&state, jar);
    let Some(run) = find_run(&session, &id) else {
        return not_found("run");
    };
    let pid = match run.pid() {
        Some(pid) if run.can_terminate() => pid,
        _ => {
            let body = json!({"error": "run has no process id or is no longer running"});
            return (StatusCode::CONFLICT, Json(body)).into_response();
        }
    };
    match state.dispatcher.terminate(&pid, &req.token).await {
        Ok(report) => {
            run.record_termination(report.clone());
            (jar, Json(report)).into_response()
        }
        Err(e) => e.into_response(),
    }
}

/// One manual status poll of an aggregator run.
pub async fn refresh_run(State(state): State<Shared>, jar: CookieJar, Path(id): Path<String>) -> Response {
    let (jar, session) = session_for(&state, jar);
    let Some(run) = find_run(&session, &id) else {
        return not_found("run");
    };
    let Some(pk) = run.tracking_id() else {
        let body = json!({"error": "run has no aggregator tracking id"});
        return (StatusCode::CONFLICT, Json(body)).into_response();
    };
    let result = async {
        let aggregator = Aggregator::new(&state.dispatcher)?;
        let tree = aggregator.status(&pk).await?;
        run.set_aggregator(tree.clone());
        if tree.is_complete() {
            collect_agent_stats(&aggregator, &run, &tree).await;
        }
        Ok::<_, ClientError>(tree)
    }
    .await;
    match result {
        Ok(tree) => (jar, Json(tree)).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn run_ws(
    State(state): State<Shared>,
    jar: CookieJar,
    Path(id): Path<String>,
    ws: WebSocketUpgrade,
) -> Response {
    match existing_session(&state, &jar).and_then(|session| find_run(&session, &id)) {
        Some(run) => ws.on_upgrade(move |socket| stream_run(socket, run)),
        None => (StatusCode::NOT_FOUND, "Unknown run").into_response(),
    }
}

async fn stream_run(socket: WebSocket, run: Arc<RunHandle>) {
    let (mut ws_tx, mut ws_rx) = socket.split();

    // Subscribe before taking the snapshot so no update falls in between.
    let mut updates = run.subscribe();
    let init = json!({"type": "init", "snapshot": run.snapshot()});
    if ws_tx.send(Message::Text(init.to_string().into())).await.is_err() {
        return;
    }

    let run_id = run.id.clone();
    let mut forward_task = tokio::spawn(async move {
        loop {
            match updates.recv().await {
                Ok(update) => {
                    let Ok(text) = serde_json::to_string(&update) else {
                        continue;
                    };
                    if ws_tx.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(run = %run_id, skipped, "progress listener fell behind");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    loop {
        tokio::select! {
            msg = ws_rx.next() => match msg {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                _ => {}
            },
            _ = &mut forward_task => break,
        }
    }
    forward_task.abort();
}

// ============================================================================
// Responses
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct ResponseParams {
    pub level: Option<String>,
}

pub async fn response_page(
    State(state): State<Shared>,
    jar: CookieJar,
    Path(id): Path<String>,
    Query(params): Query<ResponseParams>,
) -> Response {
    let (jar, session) = session_for(&state, jar);
    // The view is rebuilt on every request; nothing rendered is cached.
    let view = lock(&session).response(&id).map(|o| build_response_view(o, &state.config));
    match view {
        Some(view) => {
            let level = params.level.as_deref().filter(|l| !l.is_empty());
            (jar, Html(render_response(&view, &id, level))).into_response()
        }
        None => {
            let to = format!("/?r={}", urlencoding::encode(&id));
            (jar, Redirect::to(&to)).into_response()
        }
    }
}

pub async fn response_tsv(State(state): State<Shared>, jar: CookieJar, Path(id): Path<String>) -> Response {
    let (jar, session) = session_for(&state, jar);
    let view = lock(&session).response(&id).map(|o| build_response_view(o, &state.config));
    match view {
        Some(view) => (
            jar,
            [(CONTENT_TYPE, "text/tab-separated-values; charset=utf-8")],
            view.summary.tsv,
        )
            .into_response(),
        None => not_found("response"),
    }
}

pub async fn response_json(State(state): State<Shared>, jar: CookieJar, Path(id): Path<String>) -> Response {
    let Some(session) = existing_session(&state, &jar) else {
        return not_found("response");
    };
    let response = lock(&session).response(&id).map(|o| json!(&**o.response()));
    match response {
        Some(r) => Json(r).into_response(),
        None => not_found("response"),
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct PanelParams {
    pub panel: Option<u32>,
}

pub async fn auxiliary_graph(
    State(state): State<Shared>,
    jar: CookieJar,
    Path((id, aux)): Path<(String, String)>,
    Query(params): Query<PanelParams>,
) -> Response {
    let (jar, session) = session_for(&state, jar);
    let widget = {
        let s = lock(&session);
        s.response(&id).and_then(|o| {
            let message = o.response().message.as_ref()?;
            let graph = message.auxiliary_graphs.as_ref()?.get(&aux)?;
            let empty = Default::default();
            let kg = message.knowledge_graph.as_ref().unwrap_or(&empty);
            Some(graph_view::from_auxiliary_graph(graph, kg, params.panel.unwrap_or(0)))
        })
    };
    match widget {
        Some(w) => (jar, Json(w)).into_response(),
        None => not_found("auxiliary graph"),
    }
}

// ============================================================================
// Lists, History, Autocomplete
// ============================================================================

pub async fn lists(State(state): State<Shared>, jar: CookieJar) -> (CookieJar, Json<Value>) {
    let (jar, session) = session_for(&state, jar);
    let body = json!(lock(&session).lists);
    (jar, Json(body))
}

#[derive(Debug, Deserialize)]
pub struct CreateListRequest {
    pub name: String,
}

pub async fn create_list(
    State(state): State<Shared>,
    jar: CookieJar,
    Json(req): Json<CreateListRequest>,
) -> (CookieJar, Json<Value>) {
    let (jar, session) = session_for(&state, jar);
    let created = lock(&session).lists.create(&req.name);
    (jar, Json(json!({"changed": created})))
}

pub async fn delete_list(State(state): State<Shared>, jar: CookieJar, Path(name): Path<String>) -> (CookieJar, Json<Value>) {
    let (jar, session) = session_for(&state, jar);
    let deleted = lock(&session).lists.delete(&name);
    (jar, Json(json!({"changed": deleted})))
}

#[derive(Debug, Deserialize)]
pub struct ListItemRequest {
    pub curie: String,
    #[serde(default)]
    pub name: Option<String>,
}

pub async fn add_list_item(
    State(state): State<Shared>,
    jar: CookieJar,
    Path(name): Path<String>,
    Json(req): Json<ListItemRequest>,
) -> Result<(CookieJar, Json<Value>), ClientError> {
    let (jar, session) = session_for(&state, jar);
    let added = lock(&session).lists.add(&name, &req.curie, req.name.as_deref())?;
    Ok((jar, Json(json!({"changed": added}))))
}

pub async fn remove_list_item(
    State(state): State<Shared>,
    jar: CookieJar,
    Path((name, curie)): Path<(String, String)>,
) -> (CookieJar, Json<Value>) {
    let (jar, session) = session_for(&state, jar);
    let removed = lock(&session).lists.remove(&name, &curie);
    (jar, Json(json!({"changed": removed})))
}

pub async fn clear_list(State(state): State<Shared>, jar: CookieJar, Path(name): Path<String>) -> (CookieJar, Json<Value>) {
    let (jar, session) = session_for(&state, jar);
    let cleared = lock(&session).lists.clear(&name);
    (jar, Json(json!({"changed": cleared})))
}

/// Add a set node holding the list's CURIEs and open it in the node editor.
pub async fn use_list(State(state): State<Shared>, jar: CookieJar, Path(name): Path<String>) -> Response {
    let (jar, session) = session_for(&state, jar);
    let node = {
        let mut s = lock(&session);
        let Session { graph, editors, lists, .. } = &mut *s;
        let node = lists.use_as_node(&name, graph);
        if let Some(id) = &node {
            editors.show_node(graph, id);
        }
        node
    };
    match node {
        Some(id) => (jar, Json(json!({"id": id}))).into_response(),
        None => not_found("non-empty list"),
    }
}

pub async fn history(State(state): State<Shared>, jar: CookieJar) -> (CookieJar, Json<Value>) {
    let (jar, session) = session_for(&state, jar);
    let body = json!(lock(&session).history);
    (jar, Json(body))
}

#[derive(Debug, Deserialize)]
pub struct AutocompleteParams {
    #[serde(default)]
    pub term: String,
    pub limit: Option<u32>,
}

pub async fn autocomplete_terms(
    State(state): State<Shared>,
    Query(params): Query<AutocompleteParams>,
) -> Result<Json<Vec<String>>, ClientError> {
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT);
    Ok(Json(autocomplete::suggest(&state.dispatcher, &params.term, limit).await?))
}

#[cfg(test)]
#[path = "handlers_test.rs"]
mod handlers_test;
