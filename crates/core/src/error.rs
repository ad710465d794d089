use code_explainer_model::ErrorKind;

/// A specialized `Result` type for this crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors that end a turn.
///
/// A tripped guardrail is not an error, see
/// [`RunOutcome::Tripped`](crate::RunOutcome::Tripped).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The model service failed or refused the request.
    #[error("model request failed ({kind}): {message}")]
    Model {
        /// The kind reported by the provider.
        kind: ErrorKind,
        /// Human readable description.
        message: String,
    },
    /// An agent with an output type replied with something that doesn't
    /// deserialize into that type.
    #[error("agent `{agent}` returned invalid structured output: {reason}")]
    InvalidStructuredOutput {
        /// Name of the agent.
        agent: String,
        /// Why the output was rejected.
        reason: String,
    },
    /// The SQLite session database failed.
    #[error("session database error: {0}")]
    Storage(#[from] rusqlite::Error),
    /// A stored session item couldn't be encoded.
    #[error("session item encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
    /// The blocking storage task didn't complete.
    #[error("session storage task failed: {0}")]
    StorageTask(String),
}

impl Error {
    /// Returns the provider error kind, if this is a model error.
    #[inline]
    pub fn model_error_kind(&self) -> Option<ErrorKind> {
        match self {
            Error::Model { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}
