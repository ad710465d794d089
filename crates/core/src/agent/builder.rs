use std::sync::Arc;

use code_explainer_model::ResponseFormat;
use schemars::{JsonSchema, schema_for};
use serde_json::Value;

use super::Agent;
use crate::guardrail::InputGuardrail;
use crate::tool::Tool;

/// [`Agent`] builder.
pub struct AgentBuilder {
    name: String,
    instructions: String,
    model: Option<String>,
    tools: Vec<Arc<dyn Tool>>,
    handoffs: Vec<Arc<Agent>>,
    input_guardrails: Vec<Arc<dyn InputGuardrail>>,
    output_format: Option<ResponseFormat>,
}

impl AgentBuilder {
    /// Creates a new builder for an agent called `name`.
    #[inline]
    pub fn with_name<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            instructions: String::new(),
            model: None,
            tools: vec![],
            handoffs: vec![],
            input_guardrails: vec![],
            output_format: None,
        }
    }

    /// Sets the instructions of the agent.
    #[inline]
    pub fn with_instructions<S: Into<String>>(mut self, instructions: S) -> Self {
        self.instructions = instructions.into();
        self
    }

    /// Sets the model to use instead of the provider default.
    #[inline]
    pub fn with_model<S: Into<String>>(mut self, model: S) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Registers a tool. Tools run in registration order.
    #[inline]
    pub fn with_tool<T: Tool + 'static>(mut self, tool: T) -> Self {
        self.tools.push(Arc::new(tool));
        self
    }

    /// Registers an agent this agent may hand a turn off to.
    #[inline]
    pub fn with_handoff(mut self, agent: Arc<Agent>) -> Self {
        self.handoffs.push(agent);
        self
    }

    /// Registers a guardrail checked before the agent handles an input.
    #[inline]
    pub fn with_input_guardrail<G: InputGuardrail + 'static>(
        mut self,
        guardrail: G,
    ) -> Self {
        self.input_guardrails.push(Arc::new(guardrail));
        self
    }

    /// Constrains the agent's replies to JSON values of type `T`.
    pub fn with_output_type<T: JsonSchema>(mut self) -> Self {
        let schema = strict_schema(schema_for!(T).to_value());
        self.output_format = Some(ResponseFormat::JsonSchema {
            name: T::schema_name().into_owned(),
            schema,
        });
        self
    }

    /// Builds the agent.
    #[inline]
    pub fn build(self) -> Agent {
        Agent {
            name: self.name,
            instructions: self.instructions,
            model: self.model,
            tools: self.tools,
            handoffs: self.handoffs,
            input_guardrails: self.input_guardrails,
            output_format: self.output_format,
        }
    }
}

/// Prepares a generated schema for strict structured output, which rejects
/// meta keywords and requires closed objects.
fn strict_schema(mut schema: Value) -> Value {
    if let Some(object) = schema.as_object_mut() {
        object.remove("$schema");
        object.remove("title");
        if object.get("type").and_then(Value::as_str) == Some("object") {
            object
                .entry("additionalProperties")
                .or_insert(Value::Bool(false));
        }
    }
    schema
}
