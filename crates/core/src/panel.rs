use crate::traits::AnswerService;
use crate::{
    EndpointConfig, PanelState, Phase, QueryError, QueryRequest, QueryResponse, DEFAULT_SCOPE,
};
use std::fmt;
use tracing::{debug, info, warn};

/// Why a submit was not dispatched. Neither case is surfaced as an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitSkip {
    EmptyQuestion,
    AlreadyLoading,
}

impl fmt::Display for SubmitSkip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubmitSkip::EmptyQuestion => f.write_str("question is empty"),
            SubmitSkip::AlreadyLoading => f.write_str("a query is already in flight"),
        }
    }
}

/// A dispatched query, detached from the panel so the panel stays editable
/// while the call is outstanding.
#[derive(Debug, Clone)]
pub struct PendingQuery {
    generation: u64,
    endpoint: EndpointConfig,
    request: QueryRequest,
}

impl PendingQuery {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Endpoint captured at submit time.
    pub fn endpoint(&self) -> &EndpointConfig {
        &self.endpoint
    }

    pub fn request(&self) -> &QueryRequest {
        &self.request
    }

    pub async fn execute<S>(self, service: &S) -> Completion
    where
        S: AnswerService + ?Sized,
    {
        let outcome = service.answer(&self.endpoint, &self.request).await;
        Completion {
            generation: self.generation,
            outcome,
        }
    }
}

#[derive(Debug)]
pub struct Completion {
    pub generation: u64,
    pub outcome: Result<QueryResponse, QueryError>,
}

pub struct QueryPanel {
    state: PanelState,
    scope: String,
    generation: u64,
}

impl QueryPanel {
    pub fn new() -> Self {
        Self::with_scope(DEFAULT_SCOPE)
    }

    pub fn with_scope(scope: impl Into<String>) -> Self {
        Self {
            state: PanelState::default(),
            scope: scope.into(),
            generation: 0,
        }
    }

    pub fn with_endpoint(mut self, config: EndpointConfig) -> Self {
        self.state.endpoint_config = config;
        self
    }

    pub fn state(&self) -> &PanelState {
        &self.state
    }

    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    pub fn draft(&self) -> &str {
        &self.state.draft_question
    }

    pub fn last_response(&self) -> Option<&QueryResponse> {
        self.state.last_response.as_ref()
    }

    pub fn last_error_message(&self) -> Option<&str> {
        self.state.last_error_message.as_deref()
    }

    pub fn endpoint_config(&self) -> &EndpointConfig {
        &self.state.endpoint_config
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    pub fn edit_draft(&mut self, text: impl Into<String>) {
        self.state.draft_question = text.into();
    }

    pub fn edit_endpoint_config(&mut self, config: EndpointConfig) {
        self.state.endpoint_config = config;
    }

    /// Moves to `Loading` and hands back the call to run, or reports why
    /// nothing was sent.
    pub fn submit(&mut self) -> Result<PendingQuery, SubmitSkip> {
        if self.state.phase == Phase::Loading {
            debug!("submit ignored: query already in flight");
            return Err(SubmitSkip::AlreadyLoading);
        }
        if self.state.draft_question.trim().is_empty() {
            debug!("submit ignored: empty question");
            return Err(SubmitSkip::EmptyQuestion);
        }

        self.generation += 1;
        self.state.phase = Phase::Loading;
        self.state.last_error_message = None;

        let pending = PendingQuery {
            generation: self.generation,
            endpoint: self.state.endpoint_config.clone(),
            request: QueryRequest::new(self.state.draft_question.clone(), self.scope.clone()),
        };

        info!(
            generation = pending.generation,
            base_url = %pending.endpoint.base_url,
            scope = %self.scope,
            "dispatching question"
        );

        Ok(pending)
    }

    /// Applies a finished call. Returns `false` when the result is stale.
    pub fn apply(&mut self, completion: Completion) -> bool {
        if completion.generation != self.generation || self.state.phase != Phase::Loading {
            debug!(
                generation = completion.generation,
                current = self.generation,
                phase = %self.state.phase,
                "discarding stale completion"
            );
            return false;
        }

        match completion.outcome {
            Ok(response) => {
                debug!(generation = completion.generation, "query answered");
                self.state.last_response = Some(response);
                self.state.last_error_message = None;
                self.state.phase = Phase::Success;
            }
            Err(error) => {
                warn!(generation = completion.generation, error = %error, "query failed");
                self.state.last_error_message = Some(error.user_message());
                self.state.phase = Phase::Error;
            }
        }

        true
    }

    pub fn clear(&mut self) {
        // Bumping the generation orphans any call still in flight.
        self.generation += 1;
        self.state.draft_question.clear();
        self.state.last_response = None;
        self.state.last_error_message = None;
        self.state.phase = Phase::Idle;
    }

    /// Submits the current draft and waits for the answer in place.
    pub async fn ask<S>(&mut self, service: &S) -> Phase
    where
        S: AnswerService + ?Sized,
    {
        if let Ok(pending) = self.submit() {
            let completion = pending.execute(service).await;
            self.apply(completion);
        }
        self.state.phase
    }
}

impl Default for QueryPanel {
    fn default() -> Self {
        Self::new()
    }
}
