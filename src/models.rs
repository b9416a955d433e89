//! TRAPI data models.
//!
//! The query graph types are owned and edited by the workbench. Everything
//! under "Received Types" is read-only input from remote providers and is
//! only deserialized, never validated beyond shape.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

// ============================================================================
// Serde Helpers
// ============================================================================

fn is_false(b: &bool) -> bool {
    !*b
}

/// Treat an explicit JSON `null` the same as a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Accept numbers and numeric strings; anything else reads as absent.
fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Option::<Value>::deserialize(deserializer)?;
    Ok(match v {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

// ============================================================================
// Query Graph
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryGraph {
    #[serde(default, deserialize_with = "null_as_default")]
    pub nodes: BTreeMap<String, QNode>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub edges: BTreeMap<String, QEdge>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QNode {
    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub ids: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub categories: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "is_false")]
    pub is_set: bool,
    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub constraints: Vec<AttributeConstraint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub option_group_id: Option<String>,
    /// Display names resolved for `ids`; session-only.
    #[serde(skip)]
    pub names: Vec<String>,
    /// Free-text description shown in the editor; session-only.
    #[serde(skip)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QEdge {
    pub subject: String,
    pub object: String,
    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub predicates: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "is_false")]
    pub exclude: bool,
    #[serde(
        default,
        rename = "attribute_constraints",
        alias = "constraints",
        deserialize_with = "null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub constraints: Vec<AttributeConstraint>,
    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub qualifier_constraints: Vec<QualifierConstraint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub option_group_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeConstraint {
    /// Attribute type id the constraint applies to, e.g. `biolink:p_value`.
    pub id: String,
    pub name: String,
    pub operator: ConstraintOperator,
    pub value: Value,
    #[serde(default, skip_serializing_if = "is_false")]
    pub not: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_name: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConstraintOperator {
    #[serde(rename = "==")]
    Equals,
    #[serde(rename = ">")]
    GreaterThan,
    #[serde(rename = "<")]
    LessThan,
    #[serde(rename = "matches")]
    Matches,
    #[serde(rename = "===")]
    StrictEquals,
}

impl ConstraintOperator {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "==" => Some(Self::Equals),
            ">" => Some(Self::GreaterThan),
            "<" => Some(Self::LessThan),
            "matches" => Some(Self::Matches),
            "===" => Some(Self::StrictEquals),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Equals => "==",
            Self::GreaterThan => ">",
            Self::LessThan => "<",
            Self::Matches => "matches",
            Self::StrictEquals => "===",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QualifierConstraint {
    #[serde(default)]
    pub qualifier_set: Vec<Qualifier>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Qualifier {
    pub qualifier_type_id: String,
    pub qualifier_value: String,
}

// ============================================================================
// Received Types
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrapiResponse {
    #[serde(default)]
    pub message: Option<Message>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub logs: Vec<LogEntry>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub validation_result: Option<ValidationResult>,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub schema_version: Option<String>,
    #[serde(default)]
    pub biolink_version: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Message {
    #[serde(default)]
    pub query_graph: Option<QueryGraph>,
    #[serde(default)]
    pub knowledge_graph: Option<KnowledgeGraph>,
    #[serde(default)]
    pub results: Option<Vec<TrapiResult>>,
    #[serde(default)]
    pub auxiliary_graphs: Option<BTreeMap<String, AuxiliaryGraph>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KnowledgeGraph {
    #[serde(default, deserialize_with = "null_as_default")]
    pub nodes: BTreeMap<String, KgNode>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub edges: BTreeMap<String, KgEdge>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KgNode {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub categories: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub attributes: Vec<Attribute>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KgEdge {
    pub subject: String,
    pub object: String,
    #[serde(default)]
    pub predicate: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub sources: Vec<RetrievalSource>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub attributes: Vec<Attribute>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub qualifiers: Vec<Qualifier>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalSource {
    pub resource_id: String,
    #[serde(default)]
    pub resource_role: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attribute {
    pub attribute_type_id: String,
    #[serde(default)]
    pub value: Value,
    #[serde(default)]
    pub value_type_id: Option<String>,
    #[serde(default)]
    pub original_attribute_name: Option<String>,
    #[serde(default)]
    pub attribute_source: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrapiResult {
    #[serde(default, deserialize_with = "null_as_default")]
    pub node_bindings: BTreeMap<String, Vec<Binding>>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub analyses: Vec<Analysis>,
    #[serde(default)]
    pub essence: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub normalized_score: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub score: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub confidence: Option<f64>,
    /// Extra per-result columns some services attach for the summary table.
    #[serde(default)]
    pub row_data: Option<Vec<Value>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Binding {
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub attributes: Vec<Attribute>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Analysis {
    #[serde(default)]
    pub resource_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub score: Option<f64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub edge_bindings: BTreeMap<String, Vec<Binding>>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub support_graphs: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuxiliaryGraph {
    #[serde(default, deserialize_with = "null_as_default")]
    pub edges: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub attributes: Vec<Attribute>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogEntry {
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub level: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationResult {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub provenance_summary: Option<ProvenanceSummary>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProvenanceSummary {
    #[serde(default)]
    pub n_sources: Option<u64>,
    /// Rows of `[source, role, upstream, count]` (last element is the count).
    #[serde(default, deserialize_with = "null_as_default")]
    pub provenance_counts: Vec<Vec<Value>>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub predicate_counts: BTreeMap<String, u64>,
}
