use crate::llm::Provider;
use thiserror::Error;

const ENTITY_NOT_FOUND_MARKER: &str = "Requested entity was not found";

/// Failure of one generative call. No partial result accompanies any variant.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("no API credential configured")]
    MissingCredential,

    /// The credential points at a project or key the service cannot find.
    #[error("{provider:?}: requested entity was not found: {detail}")]
    EntityNotFound { provider: Provider, detail: String },

    #[error("{provider:?}: credential rejected (status={status})")]
    Unauthorized {
        provider: Provider,
        status: u16,
        raw_output: Option<String>,
    },

    #[error("{provider:?}: HTTP error (status={status})")]
    Http {
        provider: Provider,
        status: u16,
        raw_output: Option<String>,
    },

    #[error("{provider:?}: request failed: {source}")]
    Transport {
        provider: Provider,
        #[source]
        source: reqwest::Error,
    },

    #[error("{provider:?}: response has no text content")]
    EmptyResponse { provider: Provider },

    #[error("{provider:?}: response does not match the report contract: {detail}")]
    Contract {
        provider: Provider,
        detail: String,
        raw_output: Option<String>,
    },
}

impl LlmError {
    /// Classifies a non-success HTTP response from the generative endpoint.
    pub fn from_status(provider: Provider, status: u16, body: String) -> Self {
        if body.contains(ENTITY_NOT_FOUND_MARKER) {
            let detail = extract_error_message(&body).unwrap_or_else(|| format!("status={status}"));
            return LlmError::EntityNotFound { provider, detail };
        }
        match status {
            401 | 403 => LlmError::Unauthorized {
                provider,
                status,
                raw_output: Some(body),
            },
            _ => LlmError::Http {
                provider,
                status,
                raw_output: Some(body),
            },
        }
    }

    pub fn is_entity_not_found(&self) -> bool {
        matches!(self, LlmError::EntityNotFound { .. })
    }

    pub fn raw_output(&self) -> Option<&str> {
        match self {
            LlmError::Unauthorized { raw_output, .. }
            | LlmError::Http { raw_output, .. }
            | LlmError::Contract { raw_output, .. } => raw_output.as_deref(),
            _ => None,
        }
    }
}

fn extract_error_message(body: &str) -> Option<String> {
    let v = serde_json::from_str::<serde_json::Value>(body).ok()?;
    v.pointer("/error/message")?.as_str().map(str::to_string)
}
