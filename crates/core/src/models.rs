use crate::QueryError;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::fmt;
use url::Url;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// Document collection every query is restricted to.
pub const DEFAULT_SCOPE: &str = "spiderman-web";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QueryRequest {
    pub question: String,
    pub filters: Option<HashMap<String, String>>,
    pub repo_filter: Vec<String>,
    pub multi_turn: bool,
    pub session_id: Option<String>,
}

impl QueryRequest {
    /// Independent, single-turn question scoped to one collection.
    pub fn new(question: impl Into<String>, scope: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            filters: None,
            repo_filter: vec![scope.into()],
            multi_turn: false,
            session_id: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SourceRef {
    pub file: String,
    #[serde(default)]
    pub line: Option<u32>,
    #[serde(default)]
    pub snippet: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QueryResponse {
    pub answer: String,
    #[serde(rename = "total_tokens", default, deserialize_with = "any_count")]
    pub token_usage: Option<u64>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub sources: Vec<SourceRef>,
}

impl QueryResponse {
    pub fn display_tokens(&self) -> Option<u64> {
        self.token_usage.filter(|count| *count > 0)
    }
}

/// Accepts any non-negative number; fractional counts are rounded.
fn any_count<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(number) = Option::<serde_json::Number>::deserialize(deserializer)? else {
        return Ok(None);
    };
    if let Some(count) = number.as_u64() {
        return Ok(Some(count));
    }
    match number.as_f64() {
        Some(value) if value.is_finite() && value >= 0.0 => Ok(Some(value.round() as u64)),
        _ => Err(serde::de::Error::custom(format!(
            "token count {number} is not a non-negative number"
        ))),
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<SourceRef>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<SourceRef>>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointConfig {
    pub base_url: String,
    pub api_key: Option<String>,
}

impl EndpointConfig {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key,
        }
    }

    /// Key to send as a bearer token; blank keys count as absent.
    pub fn bearer_token(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
    }

    pub fn query_url(&self) -> Result<Url, QueryError> {
        let base = self.base_url.trim().trim_end_matches('/');
        Ok(Url::parse(&format!("{base}/query"))?)
    }
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Phase {
    #[default]
    Idle,
    Loading,
    Success,
    Error,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Idle => "idle",
            Phase::Loading => "loading",
            Phase::Success => "success",
            Phase::Error => "error",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PanelState {
    pub draft_question: String,
    pub phase: Phase,
    pub last_response: Option<QueryResponse>,
    pub last_error_message: Option<String>,
    pub endpoint_config: EndpointConfig,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    #[test]
    fn request_serializes_fixed_wire_fields() {
        let request = QueryRequest::new("where is auth?", DEFAULT_SCOPE);
        let value = serde_json::to_value(&request).unwrap();

        assert_eq!(
            value,
            json!({
                "question": "where is auth?",
                "filters": null,
                "repo_filter": ["spiderman-web"],
                "multi_turn": false,
                "session_id": null,
            })
        );
        assert_eq!(value.as_object().map(|object| object.len()), Some(5));
        assert!(matches!(value.get("filters"), Some(Value::Null)));
    }

    #[test]
    fn blank_api_key_is_not_a_bearer_token() {
        let config = EndpointConfig::new(DEFAULT_BASE_URL, Some("   ".to_string()));
        assert_eq!(config.bearer_token(), None);

        let config = EndpointConfig::new(DEFAULT_BASE_URL, Some("sk-123".to_string()));
        assert_eq!(config.bearer_token(), Some("sk-123"));
    }

    #[test]
    fn bearer_token_is_sent_as_typed() {
        let config = EndpointConfig::new(DEFAULT_BASE_URL, Some(" sk-123 ".to_string()));
        assert_eq!(config.bearer_token(), Some(" sk-123 "));
    }

    #[test]
    fn query_url_tolerates_trailing_slash() {
        let config = EndpointConfig::new("http://example.test:8000/", None);
        assert_eq!(
            config.query_url().unwrap().as_str(),
            "http://example.test:8000/query"
        );
    }

    #[test]
    fn query_url_rejects_garbage() {
        let config = EndpointConfig::new("not a url", None);
        assert!(matches!(
            config.query_url(),
            Err(QueryError::InvalidEndpoint(_))
        ));
    }

    #[test]
    fn token_count_accepts_any_non_negative_number() {
        let response: QueryResponse =
            serde_json::from_str(r#"{"answer":"A","total_tokens":42.0}"#).unwrap();
        assert_eq!(response.token_usage, Some(42));

        let response: QueryResponse =
            serde_json::from_str(r#"{"answer":"A","total_tokens":null}"#).unwrap();
        assert_eq!(response.token_usage, None);

        assert!(serde_json::from_str::<QueryResponse>(r#"{"answer":"A","total_tokens":-3}"#).is_err());
        assert!(serde_json::from_str::<QueryResponse>(r#"{"answer":"A","total_tokens":"many"}"#).is_err());
    }

    #[test]
    fn zero_token_count_is_hidden() {
        let response = QueryResponse {
            answer: "A".to_string(),
            token_usage: Some(0),
            sources: Vec::new(),
        };
        assert_eq!(response.display_tokens(), None);
    }

    #[test]
    fn null_sources_become_empty() {
        let response: QueryResponse =
            serde_json::from_str(r#"{"answer":"A","sources":null}"#).unwrap();
        assert!(response.sources.is_empty());
        assert_eq!(response.token_usage, None);
    }

    #[test]
    fn default_state_is_idle() {
        let state = PanelState::default();
        assert_eq!(state.phase, Phase::Idle);
        assert!(state.draft_question.is_empty());
        assert_eq!(state.endpoint_config.base_url, DEFAULT_BASE_URL);
    }
}
