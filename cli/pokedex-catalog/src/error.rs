//! Error handling for catalog operations.

use thiserror::Error;

/// Message shown for connection failures and timeouts.
pub const NETWORK_ERROR_MESSAGE: &str = "Please check your network connection and try again!";

/// A failed call to either catalog endpoint.
///
/// This is the only error the pipeline handles at runtime.
/// It carries a human readable message and no machine actionable code;
/// the only recovery is to run the pipeline again.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct TransportError {
    message: String,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The connection could not be established or timed out.
    pub fn network() -> Self {
        Self::new(NETWORK_ERROR_MESSAGE)
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() || err.is_timeout() {
            return TransportError::network();
        }
        if let Some(status) = err.status() {
            return match err.url() {
                Some(url) => TransportError::new(format!("{status}: {url}")),
                None => TransportError::new(status.to_string()),
            };
        }
        if err.is_decode() {
            return TransportError::new(format!("invalid response: {err}"));
        }
        TransportError::new(err.to_string())
    }
}

/// Errors constructing a catalog client.
#[derive(Debug, Error)]
pub enum CatalogClientError {
    #[error("invalid catalog url '{0}'")]
    InvalidUrl(String, #[source] url::ParseError),
    #[error("invalid header '{0}'")]
    InvalidHeader(String),
    #[error("failed to build http client")]
    Build(#[source] reqwest::Error),
    #[error(transparent)]
    MockData(#[from] MockDataError),
}

/// Errors reading canned responses for the mock client.
#[derive(Debug, Error)]
pub enum MockDataError {
    /// Failed to read the JSON file pointed at by the mock data variable
    #[error("failed to read mock response file")]
    ReadMockFile(#[source] std::io::Error),
    /// Failed to parse the contents of the mock data file as JSON
    #[error("failed to parse mock data as JSON")]
    ParseJson(#[source] serde_json::Error),
}

/// Errors returned by [crate::FetchPipeline::run].
///
/// Transport failures are reported through the state store instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
    #[error("a catalog fetch is already running")]
    AlreadyRunning,
}
