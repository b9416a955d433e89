//! Summary table and its tab-separated twin for clipboard export.

use serde::Serialize;
use serde_json::Value;

use crate::models::{KnowledgeGraph, TrapiResult};
use crate::render::confidence::{confidence_of, Bucket};

pub const DEFAULT_COLUMNS: &[&str] = &["confidence", "essence"];

#[derive(Debug, Clone, Serialize)]
pub struct SummaryRow {
    /// 1-based, matching the result cards.
    pub rank: usize,
    pub cells: Vec<String>,
    pub bucket: Option<Bucket>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SummaryTable {
    pub columns: Vec<String>,
    pub rows: Vec<SummaryRow>,
    pub tsv: String,
}

/// Essence of a result: its own `essence`, else the names of the nodes it binds.
pub fn essence_of(result: &TrapiResult, kg: Option<&KnowledgeGraph>) -> String {
    if let Some(e) = result.essence.as_deref().filter(|e| !e.is_empty()) {
        return e.to_string();
    }
    let names: Vec<String> = result
        .node_bindings
        .values()
        .flatten()
        .map(|b| {
            kg.and_then(|kg| kg.nodes.get(&b.id))
                .and_then(|n| n.name.clone())
                .unwrap_or_else(|| b.id.clone())
        })
        .collect();
    names.join(", ")
}

fn value_text(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn cell(column: &str, index: usize, result: &TrapiResult, kg: Option<&KnowledgeGraph>) -> String {
    match column {
        "confidence" => confidence_of(result).map(|c| c.display()).unwrap_or_default(),
        "essence" => essence_of(result, kg),
        _ => result
            .row_data
            .as_ref()
            .and_then(|row| row.get(index))
            .map(value_text)
            .unwrap_or_default(),
    }
}

fn tsv_field(s: &str) -> String {
    s.replace(['\t', '\n', '\r'], " ")
}

pub fn build_summary(results: &[TrapiResult], kg: Option<&KnowledgeGraph>, columns: &[String]) -> SummaryTable {
    let columns: Vec<String> = if columns.is_empty() {
        DEFAULT_COLUMNS.iter().map(|c| c.to_string()).collect()
    } else {
        columns.to_vec()
    };

    let mut tsv = String::from("rank");
    for c in &columns {
        tsv.push('\t');
        tsv.push_str(&tsv_field(c));
    }
    tsv.push('\n');

    let rows: Vec<SummaryRow> = results
        .iter()
        .enumerate()
        .map(|(i, result)| {
            let cells: Vec<String> = columns.iter().enumerate().map(|(ci, c)| cell(c, ci, result, kg)).collect();
            tsv.push_str(&(i + 1).to_string());
            for c in &cells {
                tsv.push('\t');
                tsv.push_str(&tsv_field(c));
            }
            tsv.push('\n');
            SummaryRow {
                rank: i + 1,
                cells,
                bucket: confidence_of(result).map(|c| c.bucket()),
            }
        })
        .collect();

    SummaryTable { columns, rows, tsv }
}
