//! Tests for the progress stream tokenizer and event folding.

use super::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::json;

// ============================================================================
// Helpers
// ============================================================================

/// A realistic progress stream, including a final response whose strings
/// contain `}\n` and braces.
fn sample_stream() -> String {
    let lines = [
        json!({"timestamp": "2024-01-01T00:00:00", "level": "INFO", "code": "", "message": "Parsing input query"}),
        json!({"level": "INFO", "message": "Parsing action: create_message"}),
        json!({"level": "INFO", "message": "Parsing action: add_qnode(ids=CHEBI:15365)"}),
        json!({"pid": 4242}),
        json!({"qedge_keys": {"e0": {"status": "Waiting"}}}),
        json!({"level": "DEBUG", "message": "Processing action 'add_qnode' with parameters {}"}),
        json!({"level": "INFO", "message": "tricky text }\n{ inside \"quotes\" \\ backslash"}),
    ];
    let mut out = String::new();
    for l in &lines {
        out.push_str(&l.to_string());
        out.push('\n');
    }
    let final_response = json!({
        "status": "OK",
        "message": {"results": [], "knowledge_graph": {"nodes": {}, "edges": {}}},
        "logs": [{"level": "INFO", "message": "done }\n"}]
    });
    out.push_str(&serde_json::to_string_pretty(&final_response).unwrap());
    out.push('\n');
    out
}

fn parse_all(chunks: &[&[u8]]) -> Vec<Value> {
    let mut p = JsonStreamParser::new(1 << 20);
    let mut out = Vec::new();
    for c in chunks {
        out.extend(p.push(c).unwrap());
    }
    p.finish().unwrap();
    out
}

// ============================================================================
// Tokenizer
// ============================================================================

#[test]
fn test_unsplit_stream_yields_every_value() {
    let s = sample_stream();
    let values = parse_all(&[s.as_bytes()]);
    assert_eq!(values.len(), 8);
    assert!(values[7].get("logs").is_some());
}

#[test]
fn test_arbitrary_splits_match_unsplit_parse() {
    let s = sample_stream();
    let bytes = s.as_bytes();
    let expected = parse_all(&[bytes]);

    let mut rng = StdRng::seed_from_u64(11);
    for _ in 0..200 {
        let mut cuts: Vec<usize> = (0..rng.gen_range(1..20)).map(|_| rng.gen_range(0..=bytes.len())).collect();
        cuts.sort_unstable();
        let mut chunks: Vec<&[u8]> = Vec::new();
        let mut start = 0;
        for c in cuts {
            chunks.push(&bytes[start..c]);
            start = c;
        }
        chunks.push(&bytes[start..]);
        assert_eq!(parse_all(&chunks), expected);
    }
}

#[test]
fn test_single_byte_chunks() {
    let s = sample_stream();
    let chunks: Vec<&[u8]> = s.as_bytes().chunks(1).collect();
    assert_eq!(parse_all(&chunks), parse_all(&[s.as_bytes()]));
}

#[test]
fn test_multibyte_utf8_split_across_chunks() {
    let s = "{\"message\":\"naïve café → ok\"}\n";
    let bytes = s.as_bytes();
    let mid = s.find('ï').unwrap() + 1; // inside the two-byte sequence
    let values = parse_all(&[&bytes[..mid], &bytes[mid..]]);
    assert_eq!(values[0]["message"], "naïve café → ok");
}

#[test]
fn test_residual_is_carried() {
    let mut p = JsonStreamParser::new(1024);
    assert!(p.push(b"{\"a\": [1, 2").unwrap().is_empty());
    assert!(p.residual() > 0);
    let v = p.push(b"]}\n{\"b\"").unwrap();
    assert_eq!(v, vec![json!({"a": [1, 2]})]);
    assert!(p.finish().is_err());
}

#[test]
fn test_garbage_between_values_is_an_error() {
    let mut p = JsonStreamParser::new(1024);
    let err = p.push(b"{\"a\":1}\nnot json").unwrap_err();
    assert!(matches!(err, ClientError::Stream(_)));
}

#[test]
fn test_malformed_value_is_an_error() {
    let mut p = JsonStreamParser::new(1024);
    assert!(p.push(b"{\"a\": tru}").is_err());
}

#[test]
fn test_buffer_limit() {
    let mut p = JsonStreamParser::new(16);
    let err = p.push(b"{\"message\": \"this is far too long\"").unwrap_err();
    assert!(err.to_string().contains("16 bytes"));
}

// ============================================================================
// Events
// ============================================================================

#[test]
fn test_classification() {
    assert!(matches!(classify(json!({"pid": 12})), StreamEvent::ProcessId(p) if p == "12"));
    assert!(matches!(classify(json!({"qedge_keys": {}})), StreamEvent::QueryPlan(_)));
    assert!(matches!(classify(json!({"detail": "boom"})), StreamEvent::ErrorDetail(d) if d == "boom"));
    assert!(matches!(classify(json!({"logs": [], "message": {}})), StreamEvent::Final(_)));
    assert!(matches!(
        classify(json!({"message": "Parsing action: x"})),
        StreamEvent::Log { step: Some(StepKind::Parsing), .. }
    ));
    assert!(matches!(classify(json!([1, 2])), StreamEvent::Other(_)));
}

#[test]
fn test_progress_counts_steps() {
    let s = sample_stream();
    let mut progress = Progress::default();
    for v in parse_all(&[s.as_bytes()]) {
        progress.apply(&classify(v));
    }
    assert_eq!(progress.parsing_steps, 2);
    assert_eq!(progress.processing_steps, 1);
    assert_eq!(progress.pid.as_deref(), Some("4242"));
    assert!(progress.query_plan.is_some());
    assert_eq!(progress.logs.len(), 5);
    assert!(progress.can_terminate());
}

#[test]
fn test_terminated_progress_is_frozen() {
    let mut progress = Progress::default();
    progress.apply(&classify(json!({"pid": 1})));
    progress.finish(RunStatus::Terminated);
    progress.apply(&classify(json!({"message": "Parsing action: late"})));
    progress.finish(RunStatus::Completed);
    assert_eq!(progress.status, RunStatus::Terminated);
    assert_eq!(progress.parsing_steps, 0);
    assert!(!progress.can_terminate());
}
