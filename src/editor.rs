//! Node and edge editor popups.
//!
//! Each popup is `Hidden` or `Shown(id)`. The node editor and the edge editor
//! are independent: opening one never closes the other. Edits go straight
//! into the session's [`GraphState`].

use serde::{Deserialize, Serialize};

use crate::meta_kg::PredicateCatalog;
use crate::models::{AttributeConstraint, QualifierConstraint};
use crate::query_graph::GraphState;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "state", content = "id", rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Hidden,
    Shown(String),
}

impl Visibility {
    pub fn shown_id(&self) -> Option<&str> {
        match self {
            Visibility::Shown(id) => Some(id),
            Visibility::Hidden => None,
        }
    }
}

/// A clicked element of the query graph widget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphElement {
    Node(String),
    Edge(String),
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Editors {
    pub node: Visibility,
    pub edge: Visibility,
}

impl Editors {
    pub fn show_node(&mut self, graph: &GraphState, id: &str) -> bool {
        if graph.node(id).is_none() {
            return false;
        }
        self.node = Visibility::Shown(id.to_string());
        true
    }

    pub fn show_edge(&mut self, graph: &GraphState, id: &str) -> bool {
        if graph.edge(id).is_none() {
            return false;
        }
        self.edge = Visibility::Shown(id.to_string());
        true
    }

    pub fn hide_node(&mut self) {
        self.node = Visibility::Hidden;
    }

    pub fn hide_edge(&mut self) {
        self.edge = Visibility::Hidden;
    }

    /// Selecting a widget element opens the matching editor.
    pub fn select(&mut self, graph: &GraphState, element: &GraphElement) -> bool {
        match element {
            GraphElement::Node(id) => self.show_node(graph, id),
            GraphElement::Edge(id) => self.show_edge(graph, id),
        }
    }

    /// Close any popup whose element no longer exists.
    pub fn sync(&mut self, graph: &GraphState) {
        if let Some(id) = self.node.shown_id() {
            if graph.node(id).is_none() {
                self.node = Visibility::Hidden;
            }
        }
        if let Some(id) = self.edge.shown_id() {
            if graph.edge(id).is_none() {
                self.edge = Visibility::Hidden;
            }
        }
    }
}

/// Predicate choices for the edge editor.
pub fn predicate_suggestions(graph: &GraphState, catalog: &PredicateCatalog, edge_id: &str) -> Vec<String> {
    let Some(edge) = graph.edge(edge_id) else {
        return catalog.all_predicates();
    };
    let subject = graph.node(&edge.subject).map(|n| n.categories.clone()).unwrap_or_default();
    let object = graph.node(&edge.object).map(|n| n.categories.clone()).unwrap_or_default();
    catalog.suggest(&subject, &object)
}

// ============================================================================
// Field Edits
// ============================================================================

/// One change made in the node editor.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum NodeEdit {
    AddId { curie: String, name: Option<String> },
    RemoveId { curie: String },
    AddCategory { category: String },
    RemoveCategory { category: String },
    SetIsSet { value: bool },
    SetDescription { text: Option<String> },
    SetOptionGroup { group: Option<String> },
    AddConstraint { constraint: AttributeConstraint },
    RemoveConstraint { index: usize },
}

impl NodeEdit {
    pub fn apply(self, graph: &mut GraphState, node: &str) -> bool {
        match self {
            NodeEdit::AddId { curie, name } => graph.add_node_id(node, &curie, name.as_deref()),
            NodeEdit::RemoveId { curie } => graph.remove_node_id(node, &curie),
            NodeEdit::AddCategory { category } => graph.add_category(node, &category),
            NodeEdit::RemoveCategory { category } => graph.remove_category(node, &category),
            NodeEdit::SetIsSet { value } => graph.set_is_set(node, value),
            NodeEdit::SetDescription { text } => graph.set_node_description(node, text.as_deref()),
            NodeEdit::SetOptionGroup { group } => graph.set_node_option_group(node, group.as_deref()),
            NodeEdit::AddConstraint { constraint } => graph.add_node_constraint(node, constraint),
            NodeEdit::RemoveConstraint { index } => graph.remove_node_constraint(node, index),
        }
    }
}

/// One change made in the edge editor.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum EdgeEdit {
    AddPredicate { predicate: String },
    RemovePredicate { predicate: String },
    SetExclude { value: bool },
    SetOptionGroup { group: Option<String> },
    SetEndpoints { subject: String, object: String },
    AddConstraint { constraint: AttributeConstraint },
    RemoveConstraint { index: usize },
    AddQualifier { constraint: QualifierConstraint },
    RemoveQualifier { index: usize },
}

impl EdgeEdit {
    pub fn apply(self, graph: &mut GraphState, edge: &str) -> bool {
        match self {
            EdgeEdit::AddPredicate { predicate } => graph.add_predicate(edge, &predicate),
            EdgeEdit::RemovePredicate { predicate } => graph.remove_predicate(edge, &predicate),
            EdgeEdit::SetExclude { value } => graph.set_exclude(edge, value),
            EdgeEdit::SetOptionGroup { group } => graph.set_edge_option_group(edge, group.as_deref()),
            EdgeEdit::SetEndpoints { subject, object } => graph.set_endpoints(edge, &subject, &object),
            EdgeEdit::AddConstraint { constraint } => graph.add_edge_constraint(edge, constraint),
            EdgeEdit::RemoveConstraint { index } => graph.remove_edge_constraint(edge, index),
            EdgeEdit::AddQualifier { constraint } => graph.add_qualifier_constraint(edge, constraint),
            EdgeEdit::RemoveQualifier { index } => graph.remove_qualifier_constraint(edge, index),
        }
    }
}
