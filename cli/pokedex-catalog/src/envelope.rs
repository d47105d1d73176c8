use serde::Serialize;

use crate::error::TransportError;

/// The outcome of one asynchronous catalog operation.
///
/// Every fetch stage emits `Loading` followed by exactly one terminal
/// envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "value", rename_all = "lowercase")]
pub enum Envelope<T> {
    Loading,
    Success(T),
    Error(String),
}

impl<T> Envelope<T> {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Envelope::Loading)
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Envelope<U> {
        match self {
            Envelope::Loading => Envelope::Loading,
            Envelope::Success(value) => Envelope::Success(f(value)),
            Envelope::Error(message) => Envelope::Error(message),
        }
    }

    pub fn success(self) -> Option<T> {
        match self {
            Envelope::Success(value) => Some(value),
            _ => None,
        }
    }
}

impl<T> From<Result<T, TransportError>> for Envelope<T> {
    fn from(result: Result<T, TransportError>) -> Self {
        match result {
            Ok(value) => Envelope::Success(value),
            Err(err) => Envelope::Error(err.to_string()),
        }
    }
}
