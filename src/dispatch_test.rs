//! Dispatcher tests against a local mock provider.

use super::*;
use crate::aggregator::Aggregator;
use crate::query_graph::GraphState;
use crate::stream::{Progress, RunStatus};
use axum::body::Body;
use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

// ============================================================================
// Mock Provider
// ============================================================================

#[derive(Default)]
struct Mock {
    bodies: Mutex<Vec<Value>>,
    polls: AtomicU32,
}

type Shared = Arc<Mock>;

fn progress_body() -> String {
    let mut out = String::new();
    for line in [
        json!({"level": "INFO", "message": "Parsing action: create_message"}),
        json!({"pid": 4242}),
        json!({"level": "INFO", "message": "Processing action 'expand' with parameters {}"}),
    ] {
        out.push_str(&line.to_string());
        out.push('\n');
    }
    let last = json!({
        "status": "OK",
        "id": "http://mock/response/77",
        "message": {"results": [{"node_bindings": {}, "analyses": []}]},
        "logs": [{"level": "INFO", "message": "done }\n{"}]
    });
    out.push_str(&serde_json::to_string_pretty(&last).unwrap());
    out
}

fn chunked(text: String, size: usize) -> Body {
    let chunks: Vec<Result<Vec<u8>, std::io::Error>> =
        text.into_bytes().chunks(size).map(|c| Ok(c.to_vec())).collect();
    Body::from_stream(futures_util::stream::iter(chunks))
}

async fn query(State(mock): State<Shared>, Json(body): Json<Value>) -> Body {
    mock.bodies.lock().unwrap().push(body);
    chunked(progress_body(), 7)
}

async fn status(Query(params): Query<HashMap<String, String>>) -> Json<Value> {
    match (params.get("terminate_pid"), params.get("authorization")) {
        (Some(pid), Some(token)) if token == "secret" => {
            Json(json!({"status": "OK", "description": format!("terminated {}", pid)}))
        }
        (Some(_), _) => Json(json!({"status": "ERROR", "description": "not authorized"})),
        _ => Json(json!([{"id": 1}, {"id": 2}])),
    }
}

async fn meta_kg() -> Json<Value> {
    Json(json!({
        "nodes": {"biolink:Gene": {}, "biolink:Disease": {}},
        "edges": [{"subject": "biolink:Gene", "predicate": "biolink:causes", "object": "biolink:Disease"}]
    }))
}

async fn stored_response(Path(id): Path<String>) -> Json<Value> {
    Json(json!({"status": "OK", "id": format!("http://mock/response/{}", id), "message": {}, "logs": []}))
}

async fn ars_submit(State(mock): State<Shared>, Json(body): Json<Value>) -> Json<Value> {
    mock.bodies.lock().unwrap().push(body);
    Json(json!({"pk": "pk-1"}))
}

async fn ars_message(State(mock): State<Shared>, Path(id): Path<String>) -> Json<Value> {
    if id == "pk-1" {
        let n = mock.polls.fetch_add(1, Ordering::SeqCst);
        let second = if n == 0 { "Running" } else { "Done" };
        return Json(json!({
            "message": "pk-1",
            "status": "Running",
            "children": [
                {"message": "c-1", "status": "Done", "actor": {"agent": "ara-one"}},
                {"message": "c-2", "status": second, "actor": {"agent": "ara-two"}}
            ]
        }));
    }
    Json(json!({"fields": {"data": {"message": {
        "results": [{}, {}],
        "knowledge_graph": {"nodes": {"a": {}}, "edges": {}}
    }}}}))
}

async fn spawn(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

async fn mock_provider() -> (Dispatcher, Shared) {
    let mock: Shared = Arc::default();
    let router = Router::new()
        .route("/query", post(query))
        .route("/status", get(status))
        .route("/meta_knowledge_graph", get(meta_kg))
        .route("/response/{id}", get(stored_response))
        .route("/ars/submit", post(ars_submit))
        .route("/ars/messages/{id}", get(ars_message))
        .with_state(mock.clone());
    let root = spawn(router).await;
    (Dispatcher::new(Config::for_base(&root)).unwrap(), mock)
}

// ============================================================================
// Request Bodies
// ============================================================================

#[test]
fn test_two_node_graph_body() {
    let mut g = GraphState::new();
    let n0 = g.add_node();
    g.add_node_id(&n0, "CHEBI:15365", Some("aspirin"));
    let n1 = g.add_node();
    g.add_category(&n1, "Protein");
    let e0 = g.add_edge(None, None).unwrap();
    g.add_predicate(&e0, "interacts_with");

    let body = build_request_body(&QueryKind::Graph(g.graph().clone())).unwrap();
    assert_eq!(
        body,
        json!({"message": {"query_graph": {
            "nodes": {"n0": {"ids": ["CHEBI:15365"]}, "n1": {"categories": ["Protein"]}},
            "edges": {"e0": {"subject": "n0", "object": "n1", "predicates": ["biolink:interacts_with"]}}
        }}})
    );
}

#[test]
fn test_dsl_body_drops_blank_and_comment_lines() {
    let body = build_request_body(&QueryKind::Dsl("create_message\n\n# note\n  add_qnode(ids=X)  \n".into())).unwrap();
    assert_eq!(
        body,
        json!({"message": {}, "operations": {"actions": ["create_message", "add_qnode(ids=X)"]}})
    );
    assert!(build_request_body(&QueryKind::Dsl(" \n# only\n".into())).is_err());
}

#[test]
fn test_workflow_array_is_wrapped() {
    let body = build_request_body(&QueryKind::Workflow("[{\"id\": \"lookup\"}]".into())).unwrap();
    assert_eq!(body, json!({"message": {}, "workflow": [{"id": "lookup"}]}));

    let obj = build_request_body(&QueryKind::Workflow("{\"workflow\": [], \"message\": {}}".into())).unwrap();
    assert!(obj.get("workflow").is_some());

    // Objects are sent as written, with or without a `workflow` key.
    let plain = build_request_body(&QueryKind::Workflow("{\"message\": {}}".into())).unwrap();
    assert_eq!(plain, json!({"message": {}}));
    assert!(build_request_body(&QueryKind::Workflow("\"lookup\"".into())).is_err());
}

#[test]
fn test_json_must_be_an_object() {
    assert!(matches!(
        build_request_body(&QueryKind::Json("[1, 2]".into())),
        Err(ClientError::InvalidInput(_))
    ));
    assert!(matches!(
        build_request_body(&QueryKind::Json("{nope".into())),
        Err(ClientError::InvalidInput(_))
    ));
}

#[test]
fn test_internal_body_requests_streaming() {
    let body = internal_request_body(&QueryKind::Json("{\"message\": {}}".into()), Some("workbench")).unwrap();
    assert_eq!(body["stream_progress"], json!(true));
    assert_eq!(body["submitter"], json!("workbench"));

    let keeps = internal_request_body(&QueryKind::Json("{\"submitter\": \"me\"}".into()), Some("workbench")).unwrap();
    assert_eq!(keeps["submitter"], json!("me"));
}

// ============================================================================
// Provider Calls
// ============================================================================

#[tokio::test]
async fn test_streamed_submission() {
    let (dispatcher, mock) = mock_provider().await;
    let mut progress = Progress::default();
    let outcome = dispatcher
        .submit_internal(&QueryKind::Dsl("create_message".into()), |ev| progress.apply(ev))
        .await
        .unwrap();

    assert!(matches!(outcome, ResponseOutcome::Results(_)));
    assert_eq!(outcome.result_count(), 1);
    assert_eq!(progress.parsing_steps, 1);
    assert_eq!(progress.processing_steps, 1);
    assert_eq!(progress.pid.as_deref(), Some("4242"));

    let sent = mock.bodies.lock().unwrap().clone();
    assert_eq!(sent[0]["stream_progress"], json!(true));
    assert_eq!(sent[0]["operations"]["actions"], json!(["create_message"]));
}

#[tokio::test]
async fn test_stream_without_final_response_is_an_error() {
    async fn partial() -> Body {
        chunked("{\"level\": \"INFO\", \"message\": \"x\"}\n{\"detail\": \"query crashed\"}\n".to_string(), 5)
    }
    let root = spawn(Router::new().route("/query", post(partial))).await;
    let dispatcher = Dispatcher::new(Config::for_base(&root)).unwrap();
    let err = dispatcher
        .submit_internal(&QueryKind::Json("{}".into()), |_| {})
        .await
        .unwrap_err();
    assert!(err.to_string().contains("query crashed"));
}

#[tokio::test]
async fn test_terminate() {
    let (dispatcher, _) = mock_provider().await;
    let ok = dispatcher.terminate("4242", "secret").await.unwrap();
    assert!(ok.terminated);
    assert_eq!(ok.message, "terminated 4242");

    let denied = dispatcher.terminate("4242", "wrong").await.unwrap();
    assert!(!denied.terminated);

    let mut progress = Progress::default();
    progress.apply(&crate::stream::classify(json!({"pid": 4242})));
    if ok.terminated {
        progress.finish(RunStatus::Terminated);
    }
    assert_eq!(progress.status, RunStatus::Terminated);
}

#[tokio::test]
async fn test_http_error_status() {
    let (dispatcher, _) = mock_provider().await;
    let url = format!("{}/nowhere", dispatcher.config().base);
    let err = dispatcher.get_json(&url).await.unwrap_err();
    assert!(matches!(err, ClientError::HttpStatus { status: 404, .. }));
}

#[tokio::test]
async fn test_connection_refused_is_transport_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    let dispatcher = Dispatcher::new(Config::for_base(&format!("http://127.0.0.1:{}", port))).unwrap();
    let err = dispatcher.fetch_query_listing("recent", 5).await.unwrap_err();
    assert_eq!(err.kind(), "transport");
}

#[tokio::test]
async fn test_meta_kg_and_stored_response() {
    let (dispatcher, _) = mock_provider().await;
    let meta = dispatcher.fetch_meta_knowledge_graph().await.unwrap();
    assert_eq!(meta.edges.len(), 1);

    let outcome = dispatcher.fetch_response("77").await.unwrap();
    assert_eq!(crate::response::response_id(outcome.response()).as_deref(), Some("77"));

    let listing = dispatcher.fetch_query_listing("recent", 2).await.unwrap();
    assert_eq!(listing.as_array().map(Vec::len), Some(2));
}

#[tokio::test]
async fn test_third_party_rejects_loopback_url() {
    let (dispatcher, _) = mock_provider().await;
    let url = format!("{}/query", dispatcher.config().base);
    let err = dispatcher
        .submit_third_party(&url, &QueryKind::Json("{\"message\": {}}".into()))
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::ProviderUrl(_)));
}

#[test]
fn test_redirects_are_checked_per_hop() {
    let allowed = vec!["transltr.io".to_string()];
    let hop = |u: &str| url::Url::parse(u).unwrap();

    assert!(check_redirect(&hop("https://arax.ci.transltr.io/query"), 0, &allowed).is_ok());
    assert!(check_redirect(&hop("https://evil.com/query"), 0, &allowed).is_err());
    assert!(check_redirect(&hop("http://127.0.0.1:8080/admin"), 1, &[]).is_err());
    assert!(check_redirect(&hop("http://169.254.169.254/latest/meta-data"), 1, &[]).is_err());
    assert!(check_redirect(&hop("file:///etc/passwd"), 0, &[]).is_err());

    let err = check_redirect(&hop("https://arax.ci.transltr.io/query"), MAX_REDIRECTS, &allowed).unwrap_err();
    assert!(err.contains("too many"));
}

#[test]
fn test_logged_urls_drop_the_query_string() {
    assert_eq!(
        redacted("http://svc/api/status?terminate_pid=7&authorization=secret"),
        "http://svc/api/status"
    );
    assert_eq!(redacted("http://svc/api/response/1"), "http://svc/api/response/1");
}

#[tokio::test]
async fn test_aggregator_submit_and_poll() {
    let (dispatcher, mock) = mock_provider().await;
    let ars = Aggregator::new(&dispatcher).unwrap();
    let pk = ars.submit(&QueryKind::Json("{\"message\": {}}".into())).await.unwrap();
    assert_eq!(pk, "pk-1");
    assert!(mock.bodies.lock().unwrap()[0].get("stream_progress").is_none());

    let mut snapshots = 0;
    let tree = ars
        .poll(&pk, std::time::Duration::from_millis(10), 5, |_| snapshots += 1)
        .await
        .unwrap();
    assert!(tree.is_complete());
    assert_eq!(snapshots, 2);

    let stats = ars.child_stats("c-1").await.unwrap();
    assert_eq!((stats.results, stats.nodes, stats.edges), (2, 1, 0));
}
