pub mod error;
pub mod models;
pub mod panel;
pub mod render;
pub mod service;
pub mod traits;

pub use error::{QueryError, GENERIC_CONNECTIVITY_MESSAGE};
pub use models::{
    EndpointConfig, PanelState, Phase, QueryRequest, QueryResponse, SourceRef, DEFAULT_BASE_URL,
    DEFAULT_SCOPE,
};
pub use panel::{Completion, PendingQuery, QueryPanel, SubmitSkip};
pub use render::{render_answer, render_panel};
pub use service::{parse_query_response, HttpAnswerService};
pub use traits::AnswerService;
