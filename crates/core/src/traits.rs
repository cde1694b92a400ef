use crate::{EndpointConfig, QueryError, QueryRequest, QueryResponse};
use async_trait::async_trait;

/// Remote service that turns a question into an answer.
#[async_trait]
pub trait AnswerService: Send + Sync {
    async fn answer(
        &self,
        endpoint: &EndpointConfig,
        request: &QueryRequest,
    ) -> Result<QueryResponse, QueryError>;
}
