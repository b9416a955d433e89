//! Projection of query, knowledge and auxiliary graphs into the element
//! arrays consumed by the graph widget script.
//!
//! Every element carries the number of the panel it belongs to, so several
//! widgets on one page can share the same category → color/shape mapping
//! while resolving clicks independently.

use serde::Serialize;
use std::collections::BTreeSet;

use crate::editor::GraphElement;
use crate::models::{AuxiliaryGraph, KnowledgeGraph, QueryGraph, TrapiResult};

/// Solarized accents, used for categories without a fixed style.
const PALETTE: &[&str] = &[
    "#268bd2", // blue
    "#d33682", // magenta
    "#859900", // green
    "#cb4b16", // orange
    "#6c71c4", // violet
    "#2aa198", // cyan
    "#b58900", // yellow
    "#dc322f", // red
];

const SHAPES: &[&str] = &["circle", "square", "diamond", "triangle", "star", "cross", "wye"];

/// Fixed styles for the categories users see most.
const CATEGORY_STYLES: &[(&str, &str, &str)] = &[
    ("Gene", "#268bd2", "circle"),
    ("Protein", "#6c71c4", "circle"),
    ("Disease", "#dc322f", "square"),
    ("PhenotypicFeature", "#cb4b16", "square"),
    ("Drug", "#859900", "diamond"),
    ("SmallMolecule", "#859900", "diamond"),
    ("ChemicalEntity", "#2aa198", "diamond"),
    ("Pathway", "#b58900", "triangle"),
    ("BiologicalProcess", "#b58900", "triangle"),
    ("AnatomicalEntity", "#d33682", "star"),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeStyle {
    pub color: &'static str,
    pub shape: &'static str,
}

fn strip_biolink(category: &str) -> &str {
    category.strip_prefix("biolink:").unwrap_or(category)
}

fn stable_index(s: &str, modulo: usize) -> usize {
    // FNV-1a; must be stable across runs so colors don't shuffle on reload.
    let mut h: u64 = 0xcbf29ce484222325;
    for b in s.bytes() {
        h ^= b as u64;
        h = h.wrapping_mul(0x100000001b3);
    }
    (h % modulo as u64) as usize
}

/// Style for a node with the given categories (first category wins).
pub fn style_for_categories(categories: &[String]) -> NodeStyle {
    let Some(first) = categories.first() else {
        return NodeStyle { color: "#93a1a1", shape: "circle" };
    };
    let name = strip_biolink(first);
    if let Some((_, color, shape)) = CATEGORY_STYLES.iter().find(|(c, _, _)| *c == name) {
        return NodeStyle { color: *color, shape: *shape };
    }
    NodeStyle {
        color: PALETTE[stable_index(name, PALETTE.len())],
        shape: SHAPES[stable_index(name, SHAPES.len())],
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct WidgetNode {
    pub id: String,
    pub label: String,
    pub tooltip: String,
    pub color: &'static str,
    pub shape: &'static str,
    pub panel: u32,
    pub is_set: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct WidgetEdge {
    pub id: String,
    pub source: String,
    pub target: String,
    pub label: String,
    pub panel: u32,
    pub dashed: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct WidgetGraph {
    pub panel: u32,
    pub nodes: Vec<WidgetNode>,
    pub edges: Vec<WidgetEdge>,
}

impl WidgetGraph {
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{\"nodes\":[],\"edges\":[]}".to_string())
    }

    /// Map a clicked element id back to the graph element it stands for.
    pub fn resolve_click(&self, element_id: &str) -> Option<GraphElement> {
        if self.nodes.iter().any(|n| n.id == element_id) {
            return Some(GraphElement::Node(element_id.to_string()));
        }
        if self.edges.iter().any(|e| e.id == element_id) {
            return Some(GraphElement::Edge(element_id.to_string()));
        }
        None
    }

    pub fn has_node(&self, id: &str) -> bool {
        self.nodes.iter().any(|n| n.id == id)
    }

    pub fn has_edge(&self, id: &str) -> bool {
        self.edges.iter().any(|e| e.id == id)
    }
}

fn short_predicates(predicates: &[String]) -> String {
    predicates
        .iter()
        .map(|p| strip_biolink(p).replace('_', " "))
        .collect::<Vec<_>>()
        .join(" | ")
}

// ============================================================================
// Query Graph
// ============================================================================

pub fn from_query_graph(qg: &QueryGraph, panel: u32) -> WidgetGraph {
    let nodes = qg
        .nodes
        .iter()
        .map(|(id, node)| {
            let style = style_for_categories(&node.categories);
            let label = if !node.names.is_empty() {
                node.names.join(", ")
            } else if !node.ids.is_empty() {
                node.ids.join(", ")
            } else if !node.categories.is_empty() {
                node.categories.iter().map(|c| strip_biolink(c)).collect::<Vec<_>>().join(", ")
            } else {
                "(any)".to_string()
            };
            WidgetNode {
                id: id.clone(),
                label: format!("{}: {}", id, label),
                tooltip: node.description.clone().unwrap_or_default(),
                color: style.color,
                shape: style.shape,
                panel,
                is_set: node.is_set,
            }
        })
        .collect();

    let edges = qg
        .edges
        .iter()
        .map(|(id, edge)| WidgetEdge {
            id: id.clone(),
            source: edge.subject.clone(),
            target: edge.object.clone(),
            label: if edge.predicates.is_empty() {
                id.clone()
            } else {
                format!("{}: {}", id, short_predicates(&edge.predicates))
            },
            panel,
            dashed: edge.exclude,
        })
        .collect();

    WidgetGraph { panel, nodes, edges }
}

// ============================================================================
// Knowledge Graph
// ============================================================================

fn kg_subgraph<'a>(
    kg: &KnowledgeGraph,
    node_ids: impl IntoIterator<Item = &'a String>,
    edge_ids: impl IntoIterator<Item = &'a String>,
    panel: u32,
) -> WidgetGraph {
    let mut wanted_nodes: BTreeSet<String> = node_ids.into_iter().cloned().collect();
    let mut edges = Vec::new();
    for edge_id in edge_ids {
        let Some(edge) = kg.edges.get(edge_id) else { continue };
        wanted_nodes.insert(edge.subject.clone());
        wanted_nodes.insert(edge.object.clone());
        edges.push(WidgetEdge {
            id: edge_id.clone(),
            source: edge.subject.clone(),
            target: edge.object.clone(),
            label: edge.predicate.as_deref().map(strip_biolink).unwrap_or("").replace('_', " "),
            panel,
            dashed: false,
        });
    }

    let nodes = wanted_nodes
        .into_iter()
        .map(|id| {
            let kg_node = kg.nodes.get(&id);
            let categories = kg_node.map(|n| n.categories.clone()).unwrap_or_default();
            let style = style_for_categories(&categories);
            let name = kg_node.and_then(|n| n.name.clone()).unwrap_or_else(|| id.clone());
            WidgetNode {
                tooltip: format!("{} ({})", id, categories.iter().map(|c| strip_biolink(c)).collect::<Vec<_>>().join(", ")),
                id,
                label: name,
                color: style.color,
                shape: style.shape,
                panel,
                is_set: false,
            }
        })
        .collect();

    WidgetGraph { panel, nodes, edges }
}

pub fn from_knowledge_graph(kg: &KnowledgeGraph, panel: u32) -> WidgetGraph {
    kg_subgraph(kg, kg.nodes.keys(), kg.edges.keys(), panel)
}

/// The part of the knowledge graph bound by one result (all analyses).
pub fn from_result(result: &TrapiResult, kg: &KnowledgeGraph, panel: u32) -> WidgetGraph {
    let node_ids: Vec<String> = result
        .node_bindings
        .values()
        .flat_map(|bs| bs.iter().map(|b| b.id.clone()))
        .collect();
    let edge_ids: BTreeSet<String> = result
        .analyses
        .iter()
        .flat_map(|a| a.edge_bindings.values())
        .flat_map(|bs| bs.iter().map(|b| b.id.clone()))
        .collect();
    kg_subgraph(kg, node_ids.iter(), edge_ids.iter(), panel)
}

pub fn from_auxiliary_graph(aux: &AuxiliaryGraph, kg: &KnowledgeGraph, panel: u32) -> WidgetGraph {
    kg_subgraph(kg, std::iter::empty(), aux.edges.iter(), panel)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query_graph::GraphState;

    fn kg() -> KnowledgeGraph {
        serde_json::from_value(serde_json::json!({
            "nodes": {
                "CHEBI:15365": {"name": "aspirin", "categories": ["biolink:SmallMolecule"]},
                "MONDO:0005148": {"name": "type 2 diabetes", "categories": ["biolink:Disease"]},
                "NCBIGene:5742": {"name": "PTGS1", "categories": ["biolink:Gene"]}
            },
            "edges": {
                "k1": {"subject": "CHEBI:15365", "object": "MONDO:0005148", "predicate": "biolink:treats"},
                "k2": {"subject": "CHEBI:15365", "object": "NCBIGene:5742", "predicate": "biolink:affects"}
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_query_graph_projection_tags_panel() {
        let mut g = GraphState::new();
        let n0 = g.add_node();
        let n1 = g.add_node();
        g.add_category(&n1, "biolink:Protein");
        g.add_edge(Some(&n0), Some(&n1));
        g.set_exclude("e0", true);

        let w = from_query_graph(g.graph(), 3);
        assert_eq!(w.nodes.len(), 2);
        assert!(w.nodes.iter().all(|n| n.panel == 3));
        assert_eq!(w.edges[0].source, "n0");
        assert!(w.edges[0].dashed);
        let protein = w.nodes.iter().find(|n| n.id == "n1").unwrap();
        assert_eq!(protein.color, "#6c71c4");
    }

    #[test]
    fn test_removed_node_disappears_from_widget() {
        let mut g = GraphState::new();
        g.add_node();
        g.add_node();
        g.add_edge(None, None);
        g.remove_node("n0");
        let w = from_query_graph(g.graph(), 0);
        assert!(!w.has_node("n0"));
        assert!(!w.has_edge("e0"));
    }

    #[test]
    fn test_resolve_click() {
        let mut g = GraphState::new();
        g.add_node();
        g.add_node();
        g.add_edge(None, None);
        let w = from_query_graph(g.graph(), 0);
        assert_eq!(w.resolve_click("n1"), Some(GraphElement::Node("n1".to_string())));
        assert_eq!(w.resolve_click("e0"), Some(GraphElement::Edge("e0".to_string())));
        assert_eq!(w.resolve_click("x"), None);
    }

    #[test]
    fn test_auxiliary_graph_pulls_in_endpoints() {
        let aux = AuxiliaryGraph { edges: vec!["k2".to_string(), "missing".to_string()], attributes: vec![] };
        let w = from_auxiliary_graph(&aux, &kg(), 5);
        assert_eq!(w.edges.len(), 1);
        assert_eq!(w.nodes.len(), 2);
        assert!(w.has_node("NCBIGene:5742"));
        assert_eq!(w.edges[0].label, "affects");
    }

    #[test]
    fn test_style_mapping_is_stable() {
        let a = style_for_categories(&["biolink:Cell".to_string()]);
        let b = style_for_categories(&["Cell".to_string()]);
        assert_eq!(a, b);
        assert_eq!(style_for_categories(&[]).shape, "circle");
    }
}
