//! Checks that gate an agent's input before any other work is done.

use async_trait::async_trait;
use code_explainer_model::ModelMessage;
use serde_json::Value;

use crate::error::Result;
use crate::model_client::ModelClient;

/// The result of one guardrail check.
#[derive(Clone, Debug, PartialEq)]
pub struct GuardrailOutcome {
    /// Whether the turn must be aborted.
    pub tripwire_triggered: bool,
    /// Whatever the guardrail produced to reach its decision, e.g. the
    /// classifier verdict.
    pub output_info: Value,
}

impl GuardrailOutcome {
    /// An outcome that lets the turn proceed.
    #[inline]
    pub fn pass(output_info: Value) -> Self {
        Self {
            tripwire_triggered: false,
            output_info,
        }
    }

    /// An outcome that aborts the turn.
    #[inline]
    pub fn trip(output_info: Value) -> Self {
        Self {
            tripwire_triggered: true,
            output_info,
        }
    }
}

/// A check run on every input an agent receives.
///
/// `context` is the accumulated conversation followed by the current user
/// input as its last message. Errors are fatal to the turn; guardrails are
/// never retried.
#[async_trait]
pub trait InputGuardrail: Send + Sync {
    /// Returns the name reported when the tripwire is triggered.
    fn name(&self) -> &str;

    /// Checks the input.
    async fn check(
        &self,
        client: &ModelClient,
        context: &[ModelMessage],
    ) -> Result<GuardrailOutcome>;
}
