//! Tools that an agent invokes while handling a turn.

use std::sync::Arc;

use async_trait::async_trait;
use code_explainer_model::ModelMessage;
use tracing::Instrument;

use crate::agent::Agent;
use crate::error::Result;
use crate::model_client::ModelClient;

/// A narrowly scoped capability that an agent can call.
///
/// Implementations of this trait should be stateless: the same input may
/// be sent in any later turn and is expected to be handled the same way.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Returns the name of the tool.
    fn name(&self) -> &str;

    /// Returns the description of the tool.
    fn description(&self) -> &str;

    /// Runs the tool on `input` and returns its textual output.
    async fn call(&self, client: &ModelClient, input: &str) -> Result<String>;
}

/// A tool backed by an agent.
///
/// The wrapped agent sees only its own instructions and the forwarded
/// input, never the conversation history.
pub struct AgentTool {
    name: String,
    description: String,
    agent: Arc<Agent>,
}

impl AgentTool {
    /// Creates a tool named `name` that delegates to `agent`.
    #[inline]
    pub fn new<S1: Into<String>, S2: Into<String>>(
        name: S1,
        description: S2,
        agent: Arc<Agent>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            agent,
        }
    }

    /// Returns the agent behind this tool.
    #[inline]
    pub fn agent(&self) -> &Arc<Agent> {
        &self.agent
    }
}

#[async_trait]
impl Tool for AgentTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    async fn call(&self, client: &ModelClient, input: &str) -> Result<String> {
        trace!("forwarding {} bytes to {}", input.len(), self.agent.name());
        self.agent
            .respond(client, &[ModelMessage::User(input.to_owned())])
            .instrument(debug_span!("tool", name = %self.name))
            .await
    }
}

#[cfg(test)]
mod tests {
    use code_explainer_test_model::TestModelProvider;

    use super::*;
    use crate::AgentBuilder;

    #[tokio::test]
    async fn test_agent_tool_is_stateless() {
        let mut provider = TestModelProvider::default();
        provider.respond_text("which programming language", "Python");
        let log = provider.log();
        let client = ModelClient::new(provider);

        let detector = Arc::new(
            AgentBuilder::with_name("Language Detector")
                .with_instructions("Tell which programming language it is.")
                .build(),
        );
        let tool = detector.as_tool("language_detector", "detect the language");
        assert_eq!(tool.name(), "language_detector");
        assert_eq!(tool.agent().name(), "Language Detector");

        let output = tool.call(&client, "print('hi')").await.unwrap();
        assert_eq!(output, "Python");

        let requests = log.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(
            requests[0].messages,
            vec![
                ModelMessage::System(
                    "Tell which programming language it is.".to_owned()
                ),
                ModelMessage::User("print('hi')".to_owned()),
            ]
        );
    }
}
