//! Tests for query graph editing: id allocation, cascades, import/export.

use super::*;
use crate::models::ConstraintOperator;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::json;
use std::collections::HashSet;

// ============================================================================
// Helpers
// ============================================================================

/// The two-node graph used by the end-to-end request example.
fn protein_graph() -> GraphState {
    let mut g = GraphState::new();
    g.add_node();
    let n1 = g.add_node();
    g.add_category(&n1, "Protein");
    let e0 = g.add_edge(None, None).unwrap();
    g.add_predicate(&e0, "physically_interacts_with");
    g
}

// ============================================================================
// Structure
// ============================================================================

#[test]
fn test_ids_are_sequential() {
    let mut g = GraphState::new();
    assert_eq!(g.add_node(), "n0");
    assert_eq!(g.add_node(), "n1");
    assert_eq!(g.add_edge(None, None).as_deref(), Some("e0"));
}

#[test]
fn test_add_edge_connects_two_latest_nodes() {
    let mut g = GraphState::new();
    g.add_node();
    g.add_node();
    g.add_node();
    let e = g.add_edge(None, None).unwrap();
    let edge = g.edge(&e).unwrap();
    assert_eq!(edge.subject, "n1");
    assert_eq!(edge.object, "n2");
}

#[test]
fn test_add_edge_needs_two_nodes() {
    let mut g = GraphState::new();
    assert!(g.add_edge(None, None).is_none());
    g.add_node();
    assert!(g.add_edge(None, None).is_none());
    assert!(g.add_edge(Some("n0"), Some("n9")).is_none());
    assert!(g.graph().edges.is_empty());
}

#[test]
fn test_remove_node_cascades() {
    let mut g = protein_graph();
    let removed = g.remove_node("n1");
    assert_eq!(removed, vec!["e0".to_string()]);
    assert!(g.edge("e0").is_none());
    assert!(g.is_consistent());
}

#[test]
fn test_removed_ids_are_not_reused() {
    let mut g = GraphState::new();
    g.add_node();
    g.add_node();
    g.add_edge(None, None);
    g.remove_node("n1");
    assert_eq!(g.add_node(), "n2");
    assert_eq!(g.add_edge(None, None).as_deref(), Some("e1"));
}

#[test]
fn test_unknown_ids_are_noops() {
    let mut g = protein_graph();
    let before = g.graph().clone();
    assert!(!g.add_category("n42", "Gene"));
    assert!(!g.add_predicate("e42", "treats"));
    assert!(!g.set_exclude("e42", true));
    assert!(!g.remove_edge("e42"));
    assert!(g.remove_node("n42").is_empty());
    assert_eq!(g.graph(), &before);
}

#[test]
fn test_random_sequences_never_leave_dangling_edges() {
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..50 {
        let mut g = GraphState::new();
        let mut seen_nodes = HashSet::new();
        let mut seen_edges = HashSet::new();
        for _ in 0..60 {
            match rng.gen_range(0..4) {
                0 => {
                    let id = g.add_node();
                    assert!(seen_nodes.insert(id), "node id reused");
                }
                1 => {
                    let nodes: Vec<String> = g.graph().nodes.keys().cloned().collect();
                    let pick = |rng: &mut StdRng| {
                        if nodes.is_empty() || rng.gen_bool(0.3) {
                            None
                        } else {
                            Some(nodes[rng.gen_range(0..nodes.len())].clone())
                        }
                    };
                    let s = pick(&mut rng);
                    let o = pick(&mut rng);
                    if let Some(id) = g.add_edge(s.as_deref(), o.as_deref()) {
                        assert!(seen_edges.insert(id), "edge id reused");
                    }
                }
                2 => {
                    let nodes: Vec<String> = g.graph().nodes.keys().cloned().collect();
                    if !nodes.is_empty() {
                        let victim = nodes[rng.gen_range(0..nodes.len())].clone();
                        g.remove_node(&victim);
                    }
                }
                _ => {
                    let edges: Vec<String> = g.graph().edges.keys().cloned().collect();
                    if !edges.is_empty() {
                        g.remove_edge(&edges[rng.gen_range(0..edges.len())]);
                    }
                }
            }
            assert!(g.is_consistent());
        }
    }
}

// ============================================================================
// Field Mutators
// ============================================================================

#[test]
fn test_predicates_get_biolink_prefix() {
    let g = protein_graph();
    assert_eq!(g.edge("e0").unwrap().predicates, vec!["biolink:physically_interacts_with"]);
}

#[test]
fn test_duplicate_list_items_are_ignored() {
    let mut g = protein_graph();
    assert!(!g.add_category("n1", "Protein"));
    assert!(!g.add_predicate("e0", "biolink:physically_interacts_with"));
    assert!(g.add_node_id("n0", "CHEBI:15365", Some("aspirin")));
    assert!(!g.add_node_id("n0", "CHEBI:15365", None));
    assert_eq!(g.node("n0").unwrap().names, vec!["aspirin"]);
}

#[test]
fn test_remove_node_id_keeps_names_aligned() {
    let mut g = GraphState::new();
    let n = g.add_node();
    g.add_node_id(&n, "A:1", Some("one"));
    g.add_node_id(&n, "A:2", Some("two"));
    assert!(g.remove_node_id(&n, "A:1"));
    let node = g.node(&n).unwrap();
    assert_eq!(node.ids, vec!["A:2"]);
    assert_eq!(node.names, vec!["two"]);
}

#[test]
fn test_set_endpoints_requires_live_nodes() {
    let mut g = protein_graph();
    let n2 = g.add_node();
    assert!(g.set_endpoints("e0", &n2, "n0"));
    assert!(!g.set_endpoints("e0", "n0", "n77"));
    assert_eq!(g.edge("e0").unwrap().subject, n2);
}

#[test]
fn test_constraints_add_and_remove() {
    let mut g = protein_graph();
    let c = AttributeConstraint {
        id: "biolink:p_value".to_string(),
        name: "p-value".to_string(),
        operator: ConstraintOperator::LessThan,
        value: json!(0.05),
        not: false,
        unit_id: None,
        unit_name: None,
    };
    assert!(g.add_edge_constraint("e0", c.clone()));
    assert!(g.add_node_constraint("n0", c));
    assert!(!g.remove_edge_constraint("e0", 3));
    assert!(g.remove_edge_constraint("e0", 0));
    assert!(g.edge("e0").unwrap().constraints.is_empty());
    assert_eq!(g.node("n0").unwrap().constraints.len(), 1);
}

// ============================================================================
// Import / Export
// ============================================================================

#[test]
fn test_request_body_shape() {
    let g = protein_graph();
    assert_eq!(
        g.to_trapi_json(),
        json!({
            "nodes": {"n0": {}, "n1": {"categories": ["Protein"]}},
            "edges": {"e0": {"subject": "n0", "object": "n1", "predicates": ["biolink:physically_interacts_with"]}}
        })
    );
}

#[test]
fn test_round_trip_strips_helpers() {
    let mut g = protein_graph();
    g.add_node_id("n0", "NCBIGene:3845", Some("KRAS"));
    g.set_node_description("n0", Some("the gene we care about"));
    g.set_is_set("n1", true);

    let text = g.to_trapi_json().to_string();
    assert!(!text.contains("_names"));
    assert!(!text.contains("KRAS\""));

    let mut fresh = GraphState::new();
    fresh.load_json(&text).unwrap();
    let a = g.graph();
    let b = fresh.graph();
    assert_eq!(a.nodes.keys().collect::<Vec<_>>(), b.nodes.keys().collect::<Vec<_>>());
    assert_eq!(a.edges, b.edges);
    for (id, node) in &a.nodes {
        let other = &b.nodes[id];
        assert_eq!(node.ids, other.ids);
        assert_eq!(node.categories, other.categories);
        assert_eq!(node.is_set, other.is_set);
    }
}

#[test]
fn test_load_advances_counters() {
    let mut g = GraphState::new();
    g.load_json(r#"{"message":{"query_graph":{"nodes":{"n3":{},"drug":{}},"edges":{"e7":{"subject":"n3","object":"drug"}}}}}"#)
        .unwrap();
    assert_eq!(g.add_node(), "n4");
    assert_eq!(g.add_edge(Some("n3"), Some("n4")).as_deref(), Some("e8"));
}

#[test]
fn test_load_drops_dangling_edges() {
    let mut g = GraphState::new();
    g.load_json(r#"{"nodes":{"n0":{}},"edges":{"e0":{"subject":"n0","object":"n1"}}}"#)
        .unwrap();
    assert!(g.graph().edges.is_empty());
}

#[test]
fn test_load_rejects_malformed_text() {
    let mut g = protein_graph();
    let err = g.load_json("{not json").unwrap_err();
    assert!(matches!(err, ClientError::InvalidInput(_)));
    assert!(g.load_json("[1,2,3]").is_err());
    // Failed loads leave the graph untouched.
    assert!(g.edge("e0").is_some());
}

#[test]
fn test_load_rejects_ids_past_the_limit() {
    let mut g = protein_graph();
    let huge = format!(r#"{{"nodes":{{"n0":{{}},"n{}":{{}}}},"edges":{{}}}}"#, u64::MAX);
    let err = g.load_json(&huge).unwrap_err();
    assert!(matches!(err, ClientError::InvalidInput(_)));
    // The failed import changed nothing, counters included.
    assert!(g.edge("e0").is_some());
    assert_eq!(g.add_node(), "n2");

    let huge_edge = format!(
        r#"{{"nodes":{{"a":{{}},"b":{{}}}},"edges":{{"e{}":{{"subject":"a","object":"b"}}}}}}"#,
        u64::MAX
    );
    assert!(g.load_json(&huge_edge).is_err());

    // At the limit the import loads and the next id is still fresh.
    let at_limit = format!(r#"{{"nodes":{{"n0":{{}},"n{}":{{}}}},"edges":{{}}}}"#, u32::MAX);
    g.load_json(&at_limit).unwrap();
    let fresh = g.add_node();
    assert_eq!(fresh, format!("n{}", u64::from(u32::MAX) + 1));
    assert_eq!(g.graph().nodes.len(), 3);
}
