//! Result cards and the full response view.

use serde::Serialize;

use crate::config::Config;
use crate::graph_view::{self, WidgetGraph};
use crate::models::{KnowledgeGraph, TrapiResult};
use crate::render::confidence::{confidence_of, Bucket, Confidence};
use crate::render::histogram::{build_histogram, Histogram};
use crate::render::logs::LogView;
use crate::render::summary::{build_summary, essence_of, SummaryTable};
use crate::render::validation::{build_validation, ValidationView};
use crate::response::{response_id, ResponseOutcome};

/// Panel 0 is the query graph; the knowledge graph and results follow.
pub const QUERY_GRAPH_PANEL: u32 = 0;
pub const KNOWLEDGE_GRAPH_PANEL: u32 = 1;
const FIRST_RESULT_PANEL: u32 = 2;

#[derive(Debug, Clone, Serialize)]
pub struct BoundNode {
    pub id: String,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisView {
    pub resource_id: String,
    pub score: Option<f64>,
    pub edge_count: usize,
    pub support_graphs: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResultCard {
    pub rank: usize,
    pub essence: String,
    pub confidence: Option<Confidence>,
    pub bucket: Bucket,
    pub node_bindings: Vec<(String, Vec<BoundNode>)>,
    pub analyses: Vec<AnalysisView>,
    pub widget: WidgetGraph,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResponseView {
    pub status: String,
    pub description: Option<String>,
    pub response_id: Option<String>,
    pub schema_version: Option<String>,
    pub biolink_version: Option<String>,
    /// Set when the response was not usable; shown as an error block.
    pub error: Option<String>,
    pub query_graph: Option<WidgetGraph>,
    pub knowledge_graph: Option<WidgetGraph>,
    pub summary: SummaryTable,
    pub histogram: Option<Histogram>,
    pub validation: ValidationView,
    pub cards: Vec<ResultCard>,
    pub logs: LogView,
}

pub fn result_card(rank: usize, result: &TrapiResult, kg: Option<&KnowledgeGraph>, panel: u32) -> ResultCard {
    let confidence = confidence_of(result);
    let node_bindings = result
        .node_bindings
        .iter()
        .map(|(qnode, bindings)| {
            let bound = bindings
                .iter()
                .map(|b| BoundNode {
                    id: b.id.clone(),
                    name: kg.and_then(|kg| kg.nodes.get(&b.id)).and_then(|n| n.name.clone()),
                })
                .collect();
            (qnode.clone(), bound)
        })
        .collect();
    let analyses = result
        .analyses
        .iter()
        .map(|a| AnalysisView {
            resource_id: a.resource_id.clone().unwrap_or_else(|| "unknown".to_string()),
            score: a.score,
            edge_count: a.edge_bindings.values().map(Vec::len).sum(),
            support_graphs: a.support_graphs.clone(),
        })
        .collect();
    let empty = KnowledgeGraph::default();
    ResultCard {
        rank,
        essence: essence_of(result, kg),
        bucket: confidence.map(|c| c.bucket()).unwrap_or(Bucket::P0),
        confidence,
        node_bindings,
        analyses,
        widget: graph_view::from_result(result, kg.unwrap_or(&empty), panel),
    }
}

/// Build the whole view model for one outcome. Called on every render.
pub fn build_response_view(outcome: &ResponseOutcome, config: &Config) -> ResponseView {
    let response = outcome.response();
    let message = response.message.as_ref();
    let kg = message.and_then(|m| m.knowledge_graph.as_ref());
    let results: &[TrapiResult] = message.and_then(|m| m.results.as_deref()).unwrap_or(&[]);

    let error = match outcome {
        ResponseOutcome::Rejected { status, description, .. } => Some(if description.is_empty() {
            format!("Provider returned status {}", status)
        } else {
            format!("Provider returned status {}: {}", status, description)
        }),
        _ => None,
    };
    if response.logs.is_empty() {
        tracing::warn!(status = outcome.status_label(), "response carries no logs");
    }

    ResponseView {
        status: outcome.status_label().to_string(),
        description: response.description.clone(),
        response_id: response_id(response),
        schema_version: response.schema_version.clone(),
        biolink_version: response.biolink_version.clone(),
        error,
        query_graph: message
            .and_then(|m| m.query_graph.as_ref())
            .map(|qg| graph_view::from_query_graph(qg, QUERY_GRAPH_PANEL)),
        knowledge_graph: kg.map(|kg| graph_view::from_knowledge_graph(kg, KNOWLEDGE_GRAPH_PANEL)),
        summary: build_summary(results, kg, &config.summary_columns),
        histogram: build_histogram(results, &config.histogram_source),
        validation: build_validation(response.validation_result.as_ref()),
        cards: results
            .iter()
            .enumerate()
            .map(|(i, r)| result_card(i + 1, r, kg, FIRST_RESULT_PANEL + i as u32))
            .collect(),
        logs: LogView::new(&response.logs),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::classify_response;
    use serde_json::json;

    fn outcome() -> ResponseOutcome {
        classify_response(json!({
            "status": "OK",
            "id": "https://arax.example.org/response/9",
            "logs": [{"level": "INFO", "message": "ok"}],
            "message": {
                "query_graph": {"nodes": {"n0": {"ids": ["CHEBI:15365"]}, "n1": {}}, "edges": {"e0": {"subject": "n0", "object": "n1"}}},
                "knowledge_graph": {
                    "nodes": {"CHEBI:15365": {"name": "aspirin"}, "MONDO:1": {"name": "pain"}},
                    "edges": {"k1": {"subject": "CHEBI:15365", "object": "MONDO:1", "predicate": "biolink:treats"}}
                },
                "results": [{
                    "node_bindings": {"n0": [{"id": "CHEBI:15365"}], "n1": [{"id": "MONDO:1"}]},
                    "analyses": [{"resource_id": "infores:arax", "score": 0.8, "edge_bindings": {"e0": [{"id": "k1"}]}}]
                }]
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_view_model() {
        let config = Config::for_base("http://localhost");
        let view = build_response_view(&outcome(), &config);
        assert_eq!(view.status, "OK");
        assert_eq!(view.response_id.as_deref(), Some("9"));
        assert!(view.error.is_none());
        assert_eq!(view.cards.len(), 1);

        let card = &view.cards[0];
        assert_eq!(card.essence, "aspirin, pain");
        assert_eq!(card.bucket, Bucket::P7);
        assert_eq!(card.analyses[0].edge_count, 1);
        assert_eq!(card.widget.panel, 2);
        assert!(card.widget.has_edge("k1"));
        assert_eq!(card.node_bindings[0].1[0].name.as_deref(), Some("aspirin"));

        assert_eq!(view.histogram.as_ref().map(|h| h.total()), Some(1));
        assert_eq!(view.query_graph.as_ref().map(|w| w.panel), Some(QUERY_GRAPH_PANEL));
        assert_eq!(view.logs.entries.len(), 1);
    }

    #[test]
    fn test_rendering_twice_is_identical() {
        let config = Config::for_base("http://localhost");
        let o = outcome();
        let a = serde_json::to_value(build_response_view(&o, &config)).unwrap();
        let b = serde_json::to_value(build_response_view(&o, &config)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_rejected_outcome_has_error_and_no_cards() {
        let o = classify_response(json!({"status": "QueryGraphError", "description": "bad qg"})).unwrap();
        let view = build_response_view(&o, &Config::for_base("http://localhost"));
        assert_eq!(view.error.as_deref(), Some("Provider returned status QueryGraphError: bad qg"));
        assert!(view.cards.is_empty());
        assert!(view.summary.rows.is_empty());
    }
}
