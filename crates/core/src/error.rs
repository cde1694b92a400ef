use thiserror::Error;

pub const GENERIC_CONNECTIVITY_MESSAGE: &str = "Failed to connect to the answering service";

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("{}", GENERIC_CONNECTIVITY_MESSAGE)]
    Unreachable,

    #[error("request to the answering service timed out")]
    Timeout,

    #[error("transport error: {0}")]
    Transport(String),

    #[error("answering service error: HTTP {status}")]
    Status { status: u16 },

    #[error("malformed response: {0}")]
    Parse(String),

    #[error("invalid endpoint url: {0}")]
    InvalidEndpoint(#[from] url::ParseError),
}

impl QueryError {
    /// Single-line text shown to the user when a query ends in the error phase.
    pub fn user_message(&self) -> String {
        let message = self.to_string();
        let line = message.lines().next().unwrap_or_default().trim();
        if line.is_empty() {
            GENERIC_CONNECTIVITY_MESSAGE.to_string()
        } else {
            line.to_string()
        }
    }
}

impl From<reqwest::Error> for QueryError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            return QueryError::Timeout;
        }
        if error.is_connect() {
            return QueryError::Unreachable;
        }
        if error.is_decode() {
            return QueryError::Parse(error.without_url().to_string());
        }

        let reason = error.without_url().to_string();
        if reason.trim().is_empty() {
            QueryError::Unreachable
        } else {
            QueryError::Transport(reason)
        }
    }
}

impl From<serde_json::Error> for QueryError {
    fn from(error: serde_json::Error) -> Self {
        QueryError::Parse(error.to_string())
    }
}
