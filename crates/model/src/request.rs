use serde_json::Value;

/// A request to be sent to the model provider.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct ModelRequest {
    /// The model to sample from. Providers fall back to their configured
    /// default when this is `None`.
    pub model: Option<String>,
    /// The input messages.
    pub messages: Vec<ModelMessage>,
    /// Constrains the shape of the reply, if set.
    pub response_format: Option<ResponseFormat>,
}

impl ModelRequest {
    /// Returns the first system message, which carries the instructions of
    /// the agent that issued this request.
    pub fn instructions(&self) -> Option<&str> {
        self.messages.iter().find_map(|msg| match msg {
            ModelMessage::System(text) => Some(text.as_str()),
            _ => None,
        })
    }

    /// Returns the last user message in the request.
    pub fn last_user_input(&self) -> Option<&str> {
        self.messages.iter().rev().find_map(|msg| match msg {
            ModelMessage::User(text) => Some(text.as_str()),
            _ => None,
        })
    }
}

/// A complete message.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ModelMessage {
    /// The system instructions.
    System(String),
    /// A user input text.
    User(String),
    /// An assistant text.
    Assistant(String),
}

impl ModelMessage {
    /// Returns the text content of the message.
    #[inline]
    pub fn content(&self) -> &str {
        match self {
            ModelMessage::System(text)
            | ModelMessage::User(text)
            | ModelMessage::Assistant(text) => text,
        }
    }
}

/// Describes the expected shape of a model reply.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ResponseFormat {
    /// The reply must be a single JSON object matching `schema`.
    JsonSchema {
        /// Name of the schema, reported to the provider.
        name: String,
        /// The [JSON schema](https://json-schema.org/) of the reply.
        schema: Value,
    },
}
