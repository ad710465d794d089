//! Deciding which path a turn takes after it passed the guardrails.

use async_trait::async_trait;
use code_explainer_model::ModelMessage;

use crate::error::Result;
use crate::model_client::ModelClient;

/// The path a turn takes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Route {
    /// Invoke every tool of the agent, then synthesize one answer.
    Explain,
    /// Delegate the turn to the agent's hand-off target.
    Handoff,
    /// Let the agent answer by itself.
    Direct,
}

/// Classifies a turn into a [`Route`].
///
/// `context` is the accumulated conversation followed by the current user
/// input as its last message.
#[async_trait]
pub trait RouteClassifier: Send + Sync {
    /// Picks the route for the current input.
    async fn classify(
        &self,
        client: &ModelClient,
        context: &[ModelMessage],
    ) -> Result<Route>;
}

/// A classifier that always picks the same route.
#[derive(Clone, Copy, Debug)]
pub struct FixedRoute(pub Route);

#[async_trait]
impl RouteClassifier for FixedRoute {
    async fn classify(
        &self,
        _client: &ModelClient,
        _context: &[ModelMessage],
    ) -> Result<Route> {
        Ok(self.0)
    }
}
