//! Term suggestions proxied from the configured autocomplete service.

use serde_json::Value;

use crate::dispatch::Dispatcher;
use crate::error::{ClientError, ClientResult};

pub const DEFAULT_LIMIT: u32 = 10;

/// Accepts either a bare array of strings or `{"terms": [...]}`.
pub fn parse_suggestions(value: &Value) -> ClientResult<Vec<String>> {
    let terms = match value {
        Value::Array(a) => a,
        Value::Object(o) => o
            .get("terms")
            .and_then(Value::as_array)
            .ok_or_else(|| ClientError::ResponseShape("suggestions object has no `terms` list".to_string()))?,
        _ => return Err(ClientError::ResponseShape("suggestions must be a list".to_string())),
    };
    Ok(terms.iter().filter_map(Value::as_str).map(str::to_string).collect())
}

pub async fn suggest(dispatcher: &Dispatcher, term: &str, limit: u32) -> ClientResult<Vec<String>> {
    let term = term.trim();
    if term.is_empty() {
        return Ok(Vec::new());
    }
    let Some(base) = dispatcher.config().autocomplete_url.as_deref() else {
        return Ok(Vec::new());
    };
    let url = format!("{}?word={}&limit={}", base, urlencoding::encode(term), limit.max(1));
    parse_suggestions(&dispatcher.get_json(&url).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use serde_json::json;

    #[test]
    fn test_both_shapes() {
        assert_eq!(parse_suggestions(&json!(["aspirin", "asparagine"])).unwrap(), vec!["aspirin", "asparagine"]);
        assert_eq!(parse_suggestions(&json!({"terms": ["acetaminophen", 3]})).unwrap(), vec!["acetaminophen"]);
        assert!(parse_suggestions(&json!({"other": []})).is_err());
        assert!(parse_suggestions(&json!("x")).is_err());
    }

    #[tokio::test]
    async fn test_empty_term_makes_no_request() {
        // Nothing listens on port 9; a request would fail.
        let dispatcher = Dispatcher::new(Config::for_base("http://127.0.0.1:9")).unwrap();
        assert!(suggest(&dispatcher, "   ", 5).await.unwrap().is_empty());
    }
}
