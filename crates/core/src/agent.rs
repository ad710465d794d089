mod builder;

use std::sync::Arc;

use code_explainer_model::{ModelMessage, ModelRequest, ResponseFormat};
use serde::de::DeserializeOwned;

pub use builder::AgentBuilder;
use crate::error::{Error, Result};
use crate::guardrail::InputGuardrail;
use crate::model_client::ModelClient;
use crate::tool::{AgentTool, Tool};

/// An immutable agent configuration.
///
/// An agent is a named set of instructions bound to a model, plus the
/// tools it may invoke, the agents it may hand a turn off to, and the
/// guardrails that gate its input. Agents are created once with
/// [`AgentBuilder`] and shared through [`Arc`].
pub struct Agent {
    pub(crate) name: String,
    pub(crate) instructions: String,
    pub(crate) model: Option<String>,
    pub(crate) tools: Vec<Arc<dyn Tool>>,
    pub(crate) handoffs: Vec<Arc<Agent>>,
    pub(crate) input_guardrails: Vec<Arc<dyn InputGuardrail>>,
    pub(crate) output_format: Option<ResponseFormat>,
}

impl Agent {
    /// Returns the name of the agent.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the instructions sent as the system message.
    #[inline]
    pub fn instructions(&self) -> &str {
        &self.instructions
    }

    /// Returns the model this agent samples from, if it overrides the
    /// provider default.
    #[inline]
    pub fn model(&self) -> Option<&str> {
        self.model.as_deref()
    }

    /// Returns the tools in the order they are invoked.
    #[inline]
    pub fn tools(&self) -> &[Arc<dyn Tool>] {
        &self.tools
    }

    /// Returns the agents this agent may hand a turn off to.
    #[inline]
    pub fn handoffs(&self) -> &[Arc<Agent>] {
        &self.handoffs
    }

    /// Returns the guardrails checked before this agent handles an input.
    #[inline]
    pub fn input_guardrails(&self) -> &[Arc<dyn InputGuardrail>] {
        &self.input_guardrails
    }

    /// Wraps this agent into a tool which other agents can invoke.
    pub fn as_tool<S1, S2>(
        self: &Arc<Self>,
        name: S1,
        description: S2,
    ) -> AgentTool
    where
        S1: Into<String>,
        S2: Into<String>,
    {
        AgentTool::new(name, description, Arc::clone(self))
    }

    /// Builds the request this agent sends for `context`.
    fn build_request(&self, context: &[ModelMessage]) -> ModelRequest {
        let mut messages = Vec::with_capacity(context.len() + 1);
        messages.push(ModelMessage::System(self.instructions.clone()));
        messages.extend_from_slice(context);
        ModelRequest {
            model: self.model.clone(),
            messages,
            response_format: self.output_format.clone(),
        }
    }

    /// Asks the agent to reply to `context` and returns the reply text.
    pub async fn respond(
        &self,
        client: &ModelClient,
        context: &[ModelMessage],
    ) -> Result<String> {
        debug!(agent = %self.name, "agent responding");
        client.complete(self.build_request(context)).await
    }

    /// Asks the agent to reply to `context` and decodes the reply as `T`.
    ///
    /// The agent should have been built with
    /// [`AgentBuilder::with_output_type`] for the same `T`.
    pub async fn respond_as<T: DeserializeOwned>(
        &self,
        client: &ModelClient,
        context: &[ModelMessage],
    ) -> Result<T> {
        let reply = self.respond(client, context).await?;
        serde_json::from_str(reply.trim()).map_err(|err| {
            Error::InvalidStructuredOutput {
                agent: self.name.clone(),
                reason: err.to_string(),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use code_explainer_test_model::TestModelProvider;
    use schemars::JsonSchema;
    use serde::Deserialize;

    use super::*;

    #[derive(Debug, PartialEq, Deserialize, JsonSchema)]
    struct Flag {
        on: bool,
    }

    #[test]
    fn test_request_shape() {
        let agent = AgentBuilder::with_name("Flagger")
            .with_instructions("Decide the flag.")
            .with_model("small-model")
            .with_output_type::<Flag>()
            .build();
        let req = agent.build_request(&[ModelMessage::User("x".to_owned())]);

        assert_eq!(req.model.as_deref(), Some("small-model"));
        assert_eq!(req.instructions(), Some("Decide the flag."));
        assert_eq!(req.messages.len(), 2);
        let Some(ResponseFormat::JsonSchema { name, schema }) =
            req.response_format
        else {
            panic!("expected a json schema format");
        };
        assert_eq!(name, "Flag");
        assert_eq!(schema["additionalProperties"], false);
        assert!(schema.get("$schema").is_none());
    }

    #[tokio::test]
    async fn test_structured_reply() {
        let mut provider = TestModelProvider::default();
        provider.respond_text("Decide", "{\"on\": true}");
        provider.respond_text("Broken", "not json");
        let client = ModelClient::new(provider);

        let agent = AgentBuilder::with_name("Flagger")
            .with_instructions("Decide the flag.")
            .with_output_type::<Flag>()
            .build();
        let flag: Flag = agent
            .respond_as(&client, &[ModelMessage::User("x".to_owned())])
            .await
            .unwrap();
        assert_eq!(flag, Flag { on: true });

        let broken = AgentBuilder::with_name("Broken")
            .with_instructions("Broken agent.")
            .with_output_type::<Flag>()
            .build();
        let err = broken
            .respond_as::<Flag>(&client, &[ModelMessage::User("x".to_owned())])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidStructuredOutput { .. }));
    }
}
