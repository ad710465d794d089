use std::pin::Pin;
use std::task::{self, Poll};

use serde::{Deserialize, Serialize};

use crate::provider::ModelProviderError;

/// A streamed reply to one [`ModelRequest`](crate::ModelRequest).
///
/// The events of a reply are message deltas followed by at most one
/// [`ModelResponseEvent::Completed`].
pub trait ModelResponse: Sized + Send + 'static {
    /// Failure type of the stream.
    type Error: ModelProviderError;

    /// Polls the next streamed event.
    ///
    /// Returns `Ready(Ok(Some(_)))` for each event in arrival order and
    /// `Ready(Ok(None))` once the stream is exhausted, also on every later
    /// call. A provider failure in the middle of the stream is reported as
    /// `Ready(Err(_))`, after which the response must not be polled again.
    /// While waiting, the task in `cx` is registered for wake-up.
    fn poll_next_event(
        self: Pin<&mut Self>,
        cx: &mut task::Context<'_>,
    ) -> Poll<Result<Option<ModelResponseEvent>, Self::Error>>;
}

/// Why the model stopped generating.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelFinishReason {
    /// The model reached a natural end of its reply.
    Stop,
    /// The output was cut off by the token limit.
    Length,
    /// The output was withheld by the provider's content filter.
    ContentFilter,
}

/// One event of a streamed reply.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelResponseEvent {
    /// Generation ended for the given reason.
    Completed(ModelFinishReason),
    /// The next piece of reply text.
    MessageDelta(String),
}
