//! The input guardrail that keeps the conversation about programming.

use std::sync::Arc;

use async_trait::async_trait;
use code_explainer_core::guardrail::{GuardrailOutcome, InputGuardrail};
use code_explainer_core::{Agent, ModelClient, Result};
use code_explainer_model::ModelMessage;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// The guardrail agent's classification of an input.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema,
)]
#[serde(deny_unknown_fields)]
pub struct GuardrailVerdict {
    /// Whether the input is about programming or explaining code.
    pub is_programming: bool,
}

/// Trips on every input that is not about programming.
pub struct ProgrammingGuardrail {
    agent: Arc<Agent>,
}

impl ProgrammingGuardrail {
    /// Creates the guardrail around the classifying agent, which must have
    /// been built with [`GuardrailVerdict`] as its output type.
    #[inline]
    pub fn new(agent: Arc<Agent>) -> Self {
        Self { agent }
    }
}

#[async_trait]
impl InputGuardrail for ProgrammingGuardrail {
    fn name(&self) -> &str {
        "programming_guardrail"
    }

    async fn check(
        &self,
        client: &ModelClient,
        context: &[ModelMessage],
    ) -> Result<GuardrailOutcome> {
        let verdict: GuardrailVerdict =
            self.agent.respond_as(client, context).await?;
        debug!(?verdict, "guardrail verdict");

        let output_info = serde_json::to_value(verdict)?;
        Ok(if verdict.is_programming {
            GuardrailOutcome::pass(output_info)
        } else {
            GuardrailOutcome::trip(output_info)
        })
    }
}

#[cfg(test)]
mod tests {
    use code_explainer_core::AgentBuilder;
    use code_explainer_test_model::{Matcher, PresetResponse, TestModelProvider};
    use serde_json::json;

    use super::*;

    fn guardrail() -> ProgrammingGuardrail {
        ProgrammingGuardrail::new(Arc::new(
            AgentBuilder::with_name("Guardrail Agent")
                .with_instructions("Check if the user asks about programming.")
                .with_output_type::<GuardrailVerdict>()
                .build(),
        ))
    }

    #[tokio::test]
    async fn test_verdicts() {
        let mut provider = TestModelProvider::default();
        provider.respond(
            Matcher::instructions("Check").input("weather"),
            PresetResponse::text("{\"is_programming\": false}"),
        );
        provider.respond_text("Check", "{\"is_programming\": true}");
        let log = provider.log();
        let client = ModelClient::new(provider);
        let guardrail = guardrail();

        let context = [
            ModelMessage::User("def f(x): return x+1".to_owned()),
            ModelMessage::Assistant("It adds one.".to_owned()),
            ModelMessage::User("What's the weather today?".to_owned()),
        ];
        let outcome = guardrail.check(&client, &context).await.unwrap();
        assert!(outcome.tripwire_triggered);
        assert_eq!(outcome.output_info, json!({ "is_programming": false }));

        let outcome = guardrail
            .check(&client, &[ModelMessage::User("What is a trait?".to_owned())])
            .await
            .unwrap();
        assert!(!outcome.tripwire_triggered);

        // The classifier sees the whole conversation.
        let requests = log.requests();
        assert_eq!(requests[0].messages.len(), 4);
        assert!(requests[0].response_format.is_some());
    }

    #[tokio::test]
    async fn test_malformed_verdict_is_an_error() {
        let mut provider = TestModelProvider::default();
        provider.respond_text("Check", "{\"programming\": true}");
        let client = ModelClient::new(provider);

        let err = guardrail()
            .check(&client, &[ModelMessage::User("hi".to_owned())])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            code_explainer_core::Error::InvalidStructuredOutput { .. }
        ));
    }
}
