use billscope_ai::{OracleError, SearchError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server returned {status}: {body}")]
    Server { status: u16, body: String },
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<ClientError> for OracleError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Server { status, body } => OracleError::Server { status, body },
            other => OracleError::Transport(other.to_string()),
        }
    }
}

impl From<ClientError> for SearchError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Server { status, body } => SearchError::Server { status, body },
            ClientError::Json(e) => SearchError::Malformed(e.to_string()),
            ClientError::Http(e) if e.is_decode() => SearchError::Malformed(e.to_string()),
            other => SearchError::Transport(other.to_string()),
        }
    }
}

/// Read a non-success response body into a [`ClientError::Server`].
pub(crate) async fn server_error(resp: reqwest::Response) -> ClientError {
    let status = resp.status().as_u16();
    let body = resp.text().await.unwrap_or_default();
    ClientError::Server { status, body }
}
