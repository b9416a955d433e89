//! Response log view: level filter and per-level counts.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::models::LogEntry;

#[derive(Debug, Clone, Serialize)]
pub struct LogView {
    pub entries: Vec<LogEntry>,
    /// Entry count per upper-cased level; entries without a level count as `INFO`.
    pub counts: BTreeMap<String, usize>,
}

fn level_of(entry: &LogEntry) -> String {
    entry.level.as_deref().unwrap_or("INFO").to_ascii_uppercase()
}

impl LogView {
    pub fn new(entries: &[LogEntry]) -> Self {
        let mut counts = BTreeMap::new();
        for e in entries {
            *counts.entry(level_of(e)).or_insert(0) += 1;
        }
        Self { entries: entries.to_vec(), counts }
    }

    /// Entries at `level`; `None` keeps all of them.
    pub fn filtered(&self, level: Option<&str>) -> Vec<&LogEntry> {
        match level {
            None => self.entries.iter().collect(),
            Some(l) => {
                let l = l.to_ascii_uppercase();
                self.entries.iter().filter(|e| level_of(e) == l).collect()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(level: Option<&str>, message: &str) -> LogEntry {
        LogEntry { level: level.map(str::to_string), message: message.to_string(), ..Default::default() }
    }

    #[test]
    fn test_counts_and_filter() {
        let view = LogView::new(&[
            entry(Some("INFO"), "a"),
            entry(Some("warning"), "b"),
            entry(None, "c"),
            entry(Some("ERROR"), "d"),
        ]);
        assert_eq!(view.counts.get("INFO"), Some(&2));
        assert_eq!(view.counts.get("WARNING"), Some(&1));
        assert_eq!(view.filtered(Some("error")).len(), 1);
        assert_eq!(view.filtered(None).len(), 4);
    }
}
