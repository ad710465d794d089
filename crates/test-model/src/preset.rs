use code_explainer_model::{ErrorKind, ModelFinishReason};
use serde::{Deserialize, Serialize};

/// The events in a preset response.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum PresetEvent {
    #[serde(rename = "message_delta")]
    MessageDelta(String),
    #[serde(rename = "finish")]
    Finish(ModelFinishReason),
}

/// A failure the provider reports instead of a response.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PresetFailure {
    Moderated,
    RateLimitExceeded,
    Unauthorized,
    Other,
}

impl From<PresetFailure> for ErrorKind {
    fn from(failure: PresetFailure) -> Self {
        match failure {
            PresetFailure::Moderated => ErrorKind::Moderated,
            PresetFailure::RateLimitExceeded => ErrorKind::RateLimitExceeded,
            PresetFailure::Unauthorized => ErrorKind::Unauthorized,
            PresetFailure::Other => ErrorKind::Other,
        }
    }
}

/// The preset response for a matched request.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PresetResponse {
    /// Events in this response. A `Stop` finish is appended when none of
    /// them is a [`PresetEvent::Finish`].
    pub events: Vec<PresetEvent>,
    /// If set, the request fails with this error instead.
    pub failure: Option<PresetFailure>,
}

impl PresetResponse {
    /// Creates a `PresetResponse` with the specified events.
    #[inline]
    pub fn with_events(events: impl Into<Vec<PresetEvent>>) -> Self {
        Self {
            events: events.into(),
            failure: None,
        }
    }

    /// Creates a response that streams `text` one word at a time.
    pub fn text(text: &str) -> Self {
        let events = text
            .split_inclusive(' ')
            .map(|word| PresetEvent::MessageDelta(word.to_owned()))
            .collect::<Vec<_>>();
        Self::with_events(events)
    }

    /// Creates a response whose request fails with `failure`.
    #[inline]
    pub fn failing(failure: PresetFailure) -> Self {
        Self {
            events: vec![],
            failure: Some(failure),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_keeps_spacing() {
        let response = PresetResponse::text("This is Python.");
        let joined: String = response
            .events
            .iter()
            .map(|event| match event {
                PresetEvent::MessageDelta(delta) => delta.as_str(),
                PresetEvent::Finish(_) => "",
            })
            .collect();
        assert_eq!(joined, "This is Python.");
        assert_eq!(response.events.len(), 3);
    }

    #[test]
    fn test_serialize_deserialize() {
        let response = PresetResponse::with_events([
            PresetEvent::MessageDelta("{\"is_programming\":".to_owned()),
            PresetEvent::MessageDelta("true}".to_owned()),
            PresetEvent::Finish(ModelFinishReason::Stop),
        ]);

        let serialized = serde_json::to_string(&response).unwrap();
        let deserialized: PresetResponse =
            serde_json::from_str(&serialized).unwrap();

        assert_eq!(response, deserialized);
    }
}
