//! Named entity lists (`A`, `B` and user-created ones).
//!
//! A list collects CURIEs the user wants to reuse, e.g. to seed a set node
//! in the query graph.

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::OnceLock;

use crate::error::{ClientError, ClientResult};
use crate::query_graph::GraphState;

pub const DEFAULT_LISTS: &[&str] = &["A", "B"];

static CURIE_RE: OnceLock<Option<Regex>> = OnceLock::new();

/// `PREFIX:local`, where the prefix starts with a letter.
pub fn is_curie(s: &str) -> bool {
    CURIE_RE
        .get_or_init(|| Regex::new(r"^[A-Za-z][A-Za-z0-9_.\-]*:\S+$").ok())
        .as_ref()
        .map(|re| re.is_match(s))
        .unwrap_or(false)
}

#[derive(Debug, Clone, Serialize)]
pub struct ListItem {
    pub curie: String,
    pub name: Option<String>,
    pub added: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EntityLists {
    lists: BTreeMap<String, Vec<ListItem>>,
}

impl Default for EntityLists {
    fn default() -> Self {
        Self {
            lists: DEFAULT_LISTS.iter().map(|n| (n.to_string(), Vec::new())).collect(),
        }
    }
}

impl EntityLists {
    pub fn names(&self) -> Vec<&str> {
        self.lists.keys().map(String::as_str).collect()
    }

    pub fn items(&self, list: &str) -> Option<&[ListItem]> {
        self.lists.get(list).map(Vec::as_slice)
    }

    /// Create an empty list. Returns false if the name is taken or blank.
    pub fn create(&mut self, name: &str) -> bool {
        let name = name.trim();
        if name.is_empty() || self.lists.contains_key(name) {
            return false;
        }
        self.lists.insert(name.to_string(), Vec::new());
        true
    }

    /// Delete a user list. The default lists can only be cleared.
    pub fn delete(&mut self, name: &str) -> bool {
        if DEFAULT_LISTS.contains(&name) {
            return false;
        }
        self.lists.remove(name).is_some()
    }

    /// Add a CURIE to `list`, creating the list if needed.
    /// Ok(false) means it was already there.
    pub fn add(&mut self, list: &str, curie: &str, name: Option<&str>) -> ClientResult<bool> {
        let curie = curie.trim();
        if !is_curie(curie) {
            return Err(ClientError::InvalidInput(format!("`{}` is not a CURIE", curie)));
        }
        if list.trim().is_empty() {
            return Err(ClientError::InvalidInput("list name is empty".to_string()));
        }
        let items = self.lists.entry(list.trim().to_string()).or_default();
        if items.iter().any(|i| i.curie == curie) {
            return Ok(false);
        }
        items.push(ListItem {
            curie: curie.to_string(),
            name: name.map(str::trim).filter(|n| !n.is_empty()).map(str::to_string),
            added: Utc::now(),
        });
        Ok(true)
    }

    pub fn remove(&mut self, list: &str, curie: &str) -> bool {
        let Some(items) = self.lists.get_mut(list) else {
            return false;
        };
        let before = items.len();
        items.retain(|i| i.curie != curie);
        items.len() != before
    }

    pub fn clear(&mut self, list: &str) -> bool {
        match self.lists.get_mut(list) {
            Some(items) if !items.is_empty() => {
                items.clear();
                true
            }
            _ => false,
        }
    }

    /// Add a set node holding every item of `list`. None if the list is empty or missing.
    pub fn use_as_node(&self, list: &str, graph: &mut GraphState) -> Option<String> {
        let items = self.lists.get(list).filter(|items| !items.is_empty())?;
        let node = graph.add_node();
        for item in items {
            graph.add_node_id(&node, &item.curie, item.name.as_deref());
        }
        graph.set_is_set(&node, true);
        graph.set_node_description(&node, Some(format!("list {}", list).as_str()));
        Some(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_curie_check() {
        assert!(is_curie("CHEBI:15365"));
        assert!(is_curie("NCBIGene:5742"));
        assert!(is_curie("UMLS:C0004057"));
        assert!(!is_curie("aspirin"));
        assert!(!is_curie(":15365"));
        assert!(!is_curie("1X:2"));
        assert!(!is_curie("CHEBI: 15365"));
    }

    #[test]
    fn test_add_remove_clear() {
        let mut lists = EntityLists::default();
        assert_eq!(lists.names(), vec!["A", "B"]);
        assert!(lists.add("A", "CHEBI:15365", Some("aspirin")).unwrap());
        assert!(!lists.add("A", "CHEBI:15365", None).unwrap());
        assert!(lists.add("A", "MONDO:0005148", None).unwrap());
        assert!(lists.add("A", "nope", None).is_err());
        assert_eq!(lists.items("A").map(|i| i.len()), Some(2));

        assert!(lists.remove("A", "CHEBI:15365"));
        assert!(!lists.remove("A", "CHEBI:15365"));
        assert!(lists.clear("A"));
        assert!(!lists.clear("A"));
    }

    #[test]
    fn test_user_lists() {
        let mut lists = EntityLists::default();
        assert!(lists.create("genes"));
        assert!(!lists.create("genes"));
        assert!(!lists.create("  "));
        assert!(!lists.delete("A"));
        assert!(lists.delete("genes"));
        lists.add("drugs", "CHEBI:1", None).unwrap();
        assert!(lists.names().contains(&"drugs"));
    }

    #[test]
    fn test_use_as_node() {
        let mut lists = EntityLists::default();
        let mut graph = GraphState::new();
        assert!(lists.use_as_node("A", &mut graph).is_none());

        lists.add("A", "CHEBI:1", Some("one")).unwrap();
        lists.add("A", "CHEBI:2", None).unwrap();
        let id = lists.use_as_node("A", &mut graph).unwrap();
        let node = graph.node(&id).unwrap();
        assert_eq!(node.ids, vec!["CHEBI:1", "CHEBI:2"]);
        assert!(node.is_set);
    }
}
