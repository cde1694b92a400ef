use crate::traits::AnswerService;
use crate::{EndpointConfig, QueryError, QueryRequest, QueryResponse};
use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

pub struct HttpAnswerService {
    client: Client,
}

impl HttpAnswerService {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, QueryError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    pub fn build_request(
        &self,
        endpoint: &EndpointConfig,
        request: &QueryRequest,
    ) -> Result<reqwest::Request, QueryError> {
        let body = serde_json::to_vec(request)?;
        let mut builder = self
            .client
            .post(endpoint.query_url()?)
            .header(CONTENT_TYPE, "application/json")
            .body(body);

        if let Some(token) = endpoint.bearer_token() {
            builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
        }

        Ok(builder.build()?)
    }
}

impl Default for HttpAnswerService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AnswerService for HttpAnswerService {
    async fn answer(
        &self,
        endpoint: &EndpointConfig,
        request: &QueryRequest,
    ) -> Result<QueryResponse, QueryError> {
        let http_request = self.build_request(endpoint, request)?;
        debug!(url = %http_request.url(), "posting question");

        let response = self.client.execute(http_request).await?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), "answering service rejected query");
            return Err(QueryError::Status {
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        parse_query_response(&body)
    }
}

/// Parses a success body, rejecting anything without a string `answer`.
pub fn parse_query_response(body: &str) -> Result<QueryResponse, QueryError> {
    let parsed: Value = serde_json::from_str(body)?;

    if !parsed.is_object() {
        return Err(QueryError::Parse("expected a JSON object".to_string()));
    }

    match parsed.pointer("/answer") {
        Some(Value::String(_)) => {}
        Some(_) => return Err(QueryError::Parse("`answer` is not a string".to_string())),
        None => return Err(QueryError::Parse("missing `answer`".to_string())),
    }

    Ok(serde_json::from_value(parsed)?)
}
