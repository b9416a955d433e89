//! Editable query graph.
//!
//! `GraphState` is the only writer of a session's query graph. Node and edge
//! ids are handed out from monotonic counters (`n0, n1, …` / `e0, e1, …`) and
//! are never reused while the graph is open; removing a node takes every
//! edge that references it along.

use crate::error::{ClientError, ClientResult};
use crate::models::{AttributeConstraint, QEdge, QNode, QualifierConstraint, QueryGraph};
use serde_json::Value;

const NODE_PREFIX: &str = "n";
const EDGE_PREFIX: &str = "e";
const BIOLINK_PREFIX: &str = "biolink:";

/// Prefix a bare predicate name with `biolink:`.
pub fn normalize_predicate(predicate: &str) -> String {
    let p = predicate.trim();
    if p.contains(':') {
        p.to_string()
    } else {
        format!("{}{}", BIOLINK_PREFIX, p)
    }
}

/// Numeric suffix of an id allocated with `prefix`, if it has that shape.
fn id_number(id: &str, prefix: &str) -> Option<u64> {
    id.strip_prefix(prefix)
        .filter(|rest| !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit()))
        .and_then(|rest| rest.parse().ok())
}

/// Largest numbered id an imported graph may carry. Keeps the counters far
/// from overflow however many elements are added afterwards.
const MAX_IMPORTED_ID: u64 = u32::MAX as u64;

/// First counter value past every `prefix`-numbered id in `ids`.
fn next_after<'a>(ids: impl Iterator<Item = &'a String>, prefix: &str) -> ClientResult<u64> {
    match ids.filter_map(|k| id_number(k, prefix)).max() {
        None => Ok(0),
        Some(max) if max > MAX_IMPORTED_ID => Err(ClientError::InvalidInput(format!(
            "id {}{} is too large; numbered ids must not exceed {}",
            prefix, max, MAX_IMPORTED_ID
        ))),
        Some(max) => Ok(max + 1),
    }
}

#[derive(Debug, Clone, Default)]
pub struct GraphState {
    graph: QueryGraph,
    next_node: u64,
    next_edge: u64,
    /// Live node ids in insertion order, for auto-connecting new edges.
    node_order: Vec<String>,
}

impl GraphState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn graph(&self) -> &QueryGraph {
        &self.graph
    }

    pub fn node(&self, id: &str) -> Option<&QNode> {
        self.graph.nodes.get(id)
    }

    pub fn edge(&self, id: &str) -> Option<&QEdge> {
        self.graph.edges.get(id)
    }

    pub fn is_empty(&self) -> bool {
        self.graph.nodes.is_empty() && self.graph.edges.is_empty()
    }

    /// Drop everything, including the id counters ("new query").
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    // ------------------------------------------------------------------------
    // Structure
    // ------------------------------------------------------------------------

    pub fn add_node(&mut self) -> String {
        let id = format!("{}{}", NODE_PREFIX, self.next_node);
        self.next_node += 1;
        self.graph.nodes.insert(id.clone(), QNode::default());
        self.node_order.push(id.clone());
        id
    }

    /// Add an edge. Missing endpoints default to the two most recently added
    /// live nodes (older one as subject). Returns `None` when an endpoint
    /// cannot be resolved.
    pub fn add_edge(&mut self, subject: Option<&str>, object: Option<&str>) -> Option<String> {
        let n = self.node_order.len();
        let default_subject = if n >= 2 { Some(self.node_order[n - 2].clone()) } else { None };
        let default_object = self.node_order.last().cloned();

        let subject = match subject {
            Some(s) => s.to_string(),
            None => default_subject?,
        };
        let object = match object {
            Some(o) => o.to_string(),
            None => default_object?,
        };
        if !self.graph.nodes.contains_key(&subject) || !self.graph.nodes.contains_key(&object) {
            return None;
        }

        let id = format!("{}{}", EDGE_PREFIX, self.next_edge);
        self.next_edge += 1;
        self.graph.edges.insert(
            id.clone(),
            QEdge {
                subject,
                object,
                ..Default::default()
            },
        );
        Some(id)
    }

    /// Remove a node and every edge touching it. Returns the removed edge ids.
    pub fn remove_node(&mut self, id: &str) -> Vec<String> {
        if self.graph.nodes.remove(id).is_none() {
            return Vec::new();
        }
        self.node_order.retain(|n| n != id);
        let incident: Vec<String> = self
            .graph
            .edges
            .iter()
            .filter(|(_, e)| e.subject == id || e.object == id)
            .map(|(k, _)| k.clone())
            .collect();
        for edge_id in &incident {
            self.graph.edges.remove(edge_id);
        }
        incident
    }

    pub fn remove_edge(&mut self, id: &str) -> bool {
        self.graph.edges.remove(id).is_some()
    }

    // ------------------------------------------------------------------------
    // Node Field Mutators
    // ------------------------------------------------------------------------

    fn with_node(&mut self, id: &str, f: impl FnOnce(&mut QNode) -> bool) -> bool {
        self.graph.nodes.get_mut(id).map(f).unwrap_or(false)
    }

    fn with_edge(&mut self, id: &str, f: impl FnOnce(&mut QEdge) -> bool) -> bool {
        self.graph.edges.get_mut(id).map(f).unwrap_or(false)
    }

    /// Add an identifier (with optional display name). Duplicates are ignored.
    pub fn add_node_id(&mut self, node: &str, curie: &str, name: Option<&str>) -> bool {
        let curie = curie.trim();
        if curie.is_empty() {
            return false;
        }
        self.with_node(node, |n| {
            if n.ids.iter().any(|i| i == curie) {
                return false;
            }
            n.ids.push(curie.to_string());
            n.names.push(name.unwrap_or(curie).to_string());
            true
        })
    }

    pub fn remove_node_id(&mut self, node: &str, curie: &str) -> bool {
        self.with_node(node, |n| match n.ids.iter().position(|i| i == curie) {
            Some(pos) => {
                n.ids.remove(pos);
                if pos < n.names.len() {
                    n.names.remove(pos);
                }
                true
            }
            None => false,
        })
    }

    pub fn add_category(&mut self, node: &str, category: &str) -> bool {
        let category = category.trim();
        if category.is_empty() {
            return false;
        }
        self.with_node(node, |n| {
            if n.categories.iter().any(|c| c == category) {
                return false;
            }
            n.categories.push(category.to_string());
            true
        })
    }

    pub fn remove_category(&mut self, node: &str, category: &str) -> bool {
        self.with_node(node, |n| {
            let before = n.categories.len();
            n.categories.retain(|c| c != category);
            n.categories.len() != before
        })
    }

    pub fn set_is_set(&mut self, node: &str, is_set: bool) -> bool {
        self.with_node(node, |n| {
            let changed = n.is_set != is_set;
            n.is_set = is_set;
            changed
        })
    }

    pub fn set_node_description(&mut self, node: &str, description: Option<&str>) -> bool {
        self.with_node(node, |n| {
            n.description = description.map(|d| d.to_string()).filter(|d| !d.is_empty());
            true
        })
    }

    pub fn set_node_option_group(&mut self, node: &str, group: Option<&str>) -> bool {
        self.with_node(node, |n| {
            n.option_group_id = group.map(|g| g.trim().to_string()).filter(|g| !g.is_empty());
            true
        })
    }

    pub fn add_node_constraint(&mut self, node: &str, constraint: AttributeConstraint) -> bool {
        self.with_node(node, |n| {
            n.constraints.push(constraint);
            true
        })
    }

    pub fn remove_node_constraint(&mut self, node: &str, index: usize) -> bool {
        self.with_node(node, |n| {
            if index < n.constraints.len() {
                n.constraints.remove(index);
                true
            } else {
                false
            }
        })
    }

    // ------------------------------------------------------------------------
    // Edge Field Mutators
    // ------------------------------------------------------------------------

    pub fn add_predicate(&mut self, edge: &str, predicate: &str) -> bool {
        if predicate.trim().is_empty() {
            return false;
        }
        let predicate = normalize_predicate(predicate);
        self.with_edge(edge, |e| {
            if e.predicates.contains(&predicate) {
                return false;
            }
            e.predicates.push(predicate);
            true
        })
    }

    pub fn remove_predicate(&mut self, edge: &str, predicate: &str) -> bool {
        let predicate = normalize_predicate(predicate);
        self.with_edge(edge, |e| {
            let before = e.predicates.len();
            e.predicates.retain(|p| *p != predicate);
            e.predicates.len() != before
        })
    }

    pub fn set_exclude(&mut self, edge: &str, exclude: bool) -> bool {
        self.with_edge(edge, |e| {
            let changed = e.exclude != exclude;
            e.exclude = exclude;
            changed
        })
    }

    pub fn set_edge_option_group(&mut self, edge: &str, group: Option<&str>) -> bool {
        self.with_edge(edge, |e| {
            e.option_group_id = group.map(|g| g.trim().to_string()).filter(|g| !g.is_empty());
            true
        })
    }

    /// Re-point an edge. Both endpoints must be live nodes.
    pub fn set_endpoints(&mut self, edge: &str, subject: &str, object: &str) -> bool {
        if !self.graph.nodes.contains_key(subject) || !self.graph.nodes.contains_key(object) {
            return false;
        }
        self.with_edge(edge, |e| {
            e.subject = subject.to_string();
            e.object = object.to_string();
            true
        })
    }

    pub fn add_edge_constraint(&mut self, edge: &str, constraint: AttributeConstraint) -> bool {
        self.with_edge(edge, |e| {
            e.constraints.push(constraint);
            true
        })
    }

    pub fn remove_edge_constraint(&mut self, edge: &str, index: usize) -> bool {
        self.with_edge(edge, |e| {
            if index < e.constraints.len() {
                e.constraints.remove(index);
                true
            } else {
                false
            }
        })
    }

    pub fn add_qualifier_constraint(&mut self, edge: &str, constraint: QualifierConstraint) -> bool {
        if constraint.qualifier_set.is_empty() {
            return false;
        }
        self.with_edge(edge, |e| {
            e.qualifier_constraints.push(constraint);
            true
        })
    }

    pub fn remove_qualifier_constraint(&mut self, edge: &str, index: usize) -> bool {
        self.with_edge(edge, |e| {
            if index < e.qualifier_constraints.len() {
                e.qualifier_constraints.remove(index);
                true
            } else {
                false
            }
        })
    }

    // ------------------------------------------------------------------------
    // Import / Export
    // ------------------------------------------------------------------------

    /// TRAPI query graph JSON, without session-only helper fields.
    pub fn to_trapi_json(&self) -> Value {
        serde_json::to_value(&self.graph).unwrap_or_else(|_| serde_json::json!({"nodes": {}, "edges": {}}))
    }

    /// Replace the current graph with `graph`, dropping dangling edges and
    /// advancing the id counters past every allocated-looking id.
    ///
    /// Fails, leaving the current graph untouched, when a numbered id is
    /// above the import limit.
    pub fn load(&mut self, mut graph: QueryGraph) -> ClientResult<()> {
        graph
            .edges
            .retain(|_, e| graph.nodes.contains_key(&e.subject) && graph.nodes.contains_key(&e.object));

        let next_node = next_after(graph.nodes.keys(), NODE_PREFIX)?;
        let next_edge = next_after(graph.edges.keys(), EDGE_PREFIX)?;
        // Counters only move forward within a session.
        self.next_node = self.next_node.max(next_node);
        self.next_edge = self.next_edge.max(next_edge);

        let mut order: Vec<String> = graph.nodes.keys().cloned().collect();
        order.sort_by_key(|k| (id_number(k, NODE_PREFIX).unwrap_or(u64::MAX), k.clone()));
        self.node_order = order;

        for node in graph.nodes.values_mut() {
            if node.names.len() != node.ids.len() {
                node.names = node.ids.clone();
            }
        }
        self.graph = graph;
        Ok(())
    }

    /// Hydrate from pasted text: either a bare query graph or anything with
    /// `message.query_graph` / `query_graph` inside.
    pub fn load_json(&mut self, text: &str) -> ClientResult<()> {
        let value: Value =
            serde_json::from_str(text).map_err(|e| ClientError::InvalidInput(e.to_string()))?;
        let qg = value
            .pointer("/message/query_graph")
            .or_else(|| value.get("query_graph"))
            .unwrap_or(&value)
            .clone();
        if !qg.is_object() || (qg.get("nodes").is_none() && qg.get("edges").is_none()) {
            return Err(ClientError::InvalidInput(
                "expected an object with `nodes` and `edges`".to_string(),
            ));
        }
        let graph: QueryGraph =
            serde_json::from_value(qg).map_err(|e| ClientError::InvalidInput(e.to_string()))?;
        self.load(graph)
    }

    /// Every edge endpoint resolves to a live node.
    pub fn is_consistent(&self) -> bool {
        self.graph
            .edges
            .values()
            .all(|e| self.graph.nodes.contains_key(&e.subject) && self.graph.nodes.contains_key(&e.object))
    }

    /// Edge ids whose subject or object is `node`.
    pub fn incident_edges(&self, node: &str) -> Vec<String> {
        self.graph
            .edges
            .iter()
            .filter(|(_, e)| e.subject == node || e.object == node)
            .map(|(k, _)| k.clone())
            .collect()
    }
}

#[cfg(test)]
#[path = "query_graph_test.rs"]
mod query_graph_test;
