//! Classification of received responses.
//!
//! Responses are checked once, here, and turned into a `ResponseOutcome`;
//! renderers match on the variant instead of probing fields.

use serde_json::Value;
use std::sync::Arc;

use crate::error::{ClientError, ClientResult};
use crate::models::TrapiResponse;

pub const ACCEPTED_STATUSES: &[&str] = &["OK", "Success", "QueryGraphZeroNodes"];

#[derive(Debug, Clone)]
pub enum ResponseOutcome {
    /// Success with a message to render (results may still be empty).
    Results(Arc<TrapiResponse>),
    /// The query graph had no nodes; the editor starts over.
    ZeroNodes(Arc<TrapiResponse>),
    /// The provider answered but refused or failed the query.
    Rejected {
        status: String,
        description: String,
        response: Arc<TrapiResponse>,
    },
}

impl ResponseOutcome {
    pub fn response(&self) -> &Arc<TrapiResponse> {
        match self {
            ResponseOutcome::Results(r) | ResponseOutcome::ZeroNodes(r) => r,
            ResponseOutcome::Rejected { response, .. } => response,
        }
    }

    pub fn status_label(&self) -> &str {
        match self {
            ResponseOutcome::Results(r) => r.status.as_deref().unwrap_or("OK"),
            ResponseOutcome::ZeroNodes(_) => "QueryGraphZeroNodes",
            ResponseOutcome::Rejected { status, .. } => status,
        }
    }

    pub fn result_count(&self) -> usize {
        self.response()
            .message
            .as_ref()
            .and_then(|m| m.results.as_ref())
            .map(|r| r.len())
            .unwrap_or(0)
    }
}

pub fn classify_response(value: Value) -> ClientResult<ResponseOutcome> {
    if !value.is_object() {
        return Err(ClientError::ResponseShape("response is not a JSON object".to_string()));
    }
    let response: TrapiResponse =
        serde_json::from_value(value).map_err(|e| ClientError::ResponseShape(e.to_string()))?;
    Ok(classify_parsed(response))
}

pub fn classify_parsed(response: TrapiResponse) -> ResponseOutcome {
    let status = response.status.clone();
    match status.as_deref() {
        Some("QueryGraphZeroNodes") => ResponseOutcome::ZeroNodes(Arc::new(response)),
        Some(s) if !ACCEPTED_STATUSES.contains(&s) => ResponseOutcome::Rejected {
            status: s.to_string(),
            description: response.description.clone().unwrap_or_default(),
            response: Arc::new(response),
        },
        // Third-party services often leave `status` out entirely.
        _ if response.message.is_none() => ResponseOutcome::Rejected {
            status: status.unwrap_or_else(|| "NoMessage".to_string()),
            description: response
                .description
                .clone()
                .unwrap_or_else(|| "response carries no message".to_string()),
            response: Arc::new(response),
        },
        _ => ResponseOutcome::Results(Arc::new(response)),
    }
}

/// Short id of a response: the last path segment of its `id` URL.
pub fn response_id(response: &TrapiResponse) -> Option<String> {
    response
        .id
        .as_deref()
        .map(|id| id.trim_end_matches('/'))
        .and_then(|id| id.rsplit('/').next())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_ok_with_message_is_results() {
        let o = classify_response(json!({"status": "OK", "message": {"results": [{}, {}]}, "logs": []})).unwrap();
        assert!(matches!(o, ResponseOutcome::Results(_)));
        assert_eq!(o.result_count(), 2);
    }

    #[test]
    fn test_missing_status_with_message_is_results() {
        let o = classify_response(json!({"message": {}})).unwrap();
        assert!(matches!(o, ResponseOutcome::Results(_)));
        assert_eq!(o.status_label(), "OK");
    }

    #[test]
    fn test_zero_nodes() {
        let o = classify_response(json!({"status": "QueryGraphZeroNodes", "message": {}})).unwrap();
        assert!(matches!(o, ResponseOutcome::ZeroNodes(_)));
    }

    #[test]
    fn test_unknown_status_is_rejected() {
        let o = classify_response(json!({"status": "UnknownError", "description": "kaput", "message": {}})).unwrap();
        match o {
            ResponseOutcome::Rejected { status, description, .. } => {
                assert_eq!(status, "UnknownError");
                assert_eq!(description, "kaput");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_missing_message_is_rejected() {
        let o = classify_response(json!({"status": "OK", "logs": []})).unwrap();
        assert!(matches!(o, ResponseOutcome::Rejected { .. }));
    }

    #[test]
    fn test_non_object_is_shape_error() {
        assert!(matches!(classify_response(json!([1])), Err(ClientError::ResponseShape(_))));
    }

    #[test]
    fn test_response_id_takes_last_segment() {
        let r = TrapiResponse {
            id: Some("https://arax.example.org/api/arax/v1.4/response/301214/".to_string()),
            ..Default::default()
        };
        assert_eq!(response_id(&r).as_deref(), Some("301214"));
        assert_eq!(response_id(&TrapiResponse::default()), None);
    }
}
