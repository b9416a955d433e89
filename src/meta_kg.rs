//! Predicate catalog built from a provider's meta knowledge graph.
//!
//! Used by the edge editor to narrow predicate suggestions to the ones known
//! to connect the categories on both ends of an edge.

use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::query_graph::normalize_predicate;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MetaKnowledgeGraph {
    #[serde(default)]
    pub nodes: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub edges: Vec<MetaEdge>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetaEdge {
    pub subject: String,
    pub predicate: String,
    pub object: String,
}

#[derive(Debug, Clone, Default)]
pub struct PredicateCatalog {
    by_pair: HashMap<(String, String), BTreeSet<String>>,
    all_predicates: BTreeSet<String>,
    categories: BTreeSet<String>,
}

impl PredicateCatalog {
    pub fn from_meta_kg(meta: &MetaKnowledgeGraph) -> Self {
        let mut catalog = Self::default();
        for category in meta.nodes.keys() {
            catalog.categories.insert(category.clone());
        }
        for edge in &meta.edges {
            let predicate = normalize_predicate(&edge.predicate);
            catalog
                .by_pair
                .entry((normalize_predicate(&edge.subject), normalize_predicate(&edge.object)))
                .or_default()
                .insert(predicate.clone());
            catalog.all_predicates.insert(predicate);
            catalog.categories.insert(normalize_predicate(&edge.subject));
            catalog.categories.insert(normalize_predicate(&edge.object));
        }
        catalog
    }

    pub fn is_empty(&self) -> bool {
        self.all_predicates.is_empty()
    }

    pub fn all_predicates(&self) -> Vec<String> {
        self.all_predicates.iter().cloned().collect()
    }

    pub fn categories(&self) -> Vec<String> {
        self.categories.iter().cloned().collect()
    }

    /// Predicates to offer for an edge whose endpoints carry the given
    /// categories. Exactly one category on each side narrows the list to the
    /// known connecting predicates; anything else yields the full list.
    pub fn suggest(&self, subject_categories: &[String], object_categories: &[String]) -> Vec<String> {
        if let ([s], [o]) = (subject_categories, object_categories) {
            let key = (normalize_predicate(s), normalize_predicate(o));
            return self
                .by_pair
                .get(&key)
                .map(|set| set.iter().cloned().collect())
                .unwrap_or_default();
        }
        self.all_predicates()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> PredicateCatalog {
        let meta: MetaKnowledgeGraph = serde_json::from_value(serde_json::json!({
            "nodes": {"biolink:Gene": {}, "biolink:Protein": {}, "biolink:Drug": {}},
            "edges": [
                {"subject": "biolink:Protein", "predicate": "biolink:physically_interacts_with", "object": "biolink:Protein"},
                {"subject": "biolink:Drug", "predicate": "biolink:treats", "object": "biolink:Disease"},
                {"subject": "biolink:Drug", "predicate": "biolink:affects", "object": "biolink:Gene"}
            ]
        }))
        .unwrap();
        PredicateCatalog::from_meta_kg(&meta)
    }

    #[test]
    fn test_single_categories_narrow_suggestions() {
        let c = catalog();
        let s = c.suggest(&["biolink:Drug".to_string()], &["Gene".to_string()]);
        assert_eq!(s, vec!["biolink:affects"]);
    }

    #[test]
    fn test_unknown_pair_offers_nothing() {
        let c = catalog();
        assert!(c.suggest(&["Gene".to_string()], &["Drug".to_string()]).is_empty());
    }

    #[test]
    fn test_multiple_categories_fall_back_to_global_list() {
        let c = catalog();
        let s = c.suggest(&["Drug".to_string(), "Gene".to_string()], &["Gene".to_string()]);
        assert_eq!(s.len(), 3);
        assert_eq!(c.suggest(&[], &[]).len(), 3);
    }

    #[test]
    fn test_categories_include_edge_endpoints() {
        let c = catalog();
        assert!(c.categories().contains(&"biolink:Disease".to_string()));
    }
}
