use std::future::poll_fn;
use std::pin::{Pin, pin};
use std::sync::Arc;

use code_explainer_model::{
    ErrorKind, ModelFinishReason, ModelProvider, ModelProviderError,
    ModelRequest, ModelResponse, ModelResponseEvent,
};
use tracing::Instrument;

use crate::error::{Error, Result};

type BoxedSendRequestFuture =
    Pin<Box<dyn Future<Output = Result<ModelClientResponse>> + Send>>;
type HandlerFn =
    Arc<dyn Fn(ModelRequest) -> BoxedSendRequestFuture + Send + Sync>;

/// A wrapper around a model provider that provides a type-erased interface
/// for the other modules.
///
/// Cloning is cheap, all clones share the same provider.
#[derive(Clone)]
pub struct ModelClient {
    handler_fn: HandlerFn,
}

impl ModelClient {
    /// Wraps `provider`.
    #[inline]
    pub fn new<P: ModelProvider + 'static>(provider: P) -> Self {
        // We have to erase the type `P`, since `ModelClient` doesn't have a
        // generic parameter and we don't want it either.
        let handler_fn: HandlerFn = Arc::new(move |req| {
            let fut = provider.send_request(&req);
            Box::pin(
                async move {
                    trace!("got a request: {:?}", req);
                    handle_response::<P>(fut.await).await
                }
                .instrument(trace_span!("model client req")),
            )
        });
        Self { handler_fn }
    }

    /// Sends a request and collects the complete response.
    ///
    /// # Cancel safety
    ///
    /// This method is cancel safe. The response stops streaming further
    /// events when this operation is cancelled.
    #[inline]
    pub async fn send_request(
        &self,
        req: ModelRequest,
    ) -> Result<ModelClientResponse> {
        (self.handler_fn)(req).await
    }

    /// Sends a request and returns the reply text.
    ///
    /// A reply withheld by the provider's content filter is reported as an
    /// error of kind [`ErrorKind::Moderated`].
    pub async fn complete(&self, req: ModelRequest) -> Result<String> {
        let resp = self.send_request(req).await?;
        match resp.finish_reason {
            Some(ModelFinishReason::ContentFilter) => Err(Error::Model {
                kind: ErrorKind::Moderated,
                message: "the reply was withheld by the content filter"
                    .to_owned(),
            }),
            Some(ModelFinishReason::Length) => {
                warn!("the reply was cut off by the token limit");
                Ok(resp.transcript)
            }
            _ => Ok(resp.transcript),
        }
    }
}

/// A completely received response from the model client.
#[derive(Clone, Debug)]
pub struct ModelClientResponse {
    /// The concatenated message deltas.
    pub transcript: String,
    /// The reason the model finished generating.
    pub finish_reason: Option<ModelFinishReason>,
}

#[inline]
fn model_error<E: ModelProviderError>(err: E) -> Error {
    Error::Model {
        kind: err.kind(),
        message: err.to_string(),
    }
}

async fn handle_response<P: ModelProvider + 'static>(
    resp_or_err: Result<P::Response, P::Error>,
) -> Result<ModelClientResponse> {
    let resp = match resp_or_err {
        Ok(resp) => resp,
        Err(err) => {
            error!("got an error: {err:?}");
            return Err(model_error(err));
        }
    };

    let mut transcript = String::new();
    let mut finish_reason = None;

    trace!("start receiving events");

    let mut pinned_resp = pin!(resp);
    loop {
        let event_or_err =
            poll_fn(|cx| pinned_resp.as_mut().poll_next_event(cx)).await;
        let event = match event_or_err {
            Ok(Some(event)) => event,
            Ok(None) => break,
            Err(err) => {
                error!("got an error: {err:?}");
                return Err(model_error(err));
            }
        };
        trace!("got an event: {event:?}");

        match event {
            ModelResponseEvent::MessageDelta(msg) => transcript.push_str(&msg),
            ModelResponseEvent::Completed(reason) => {
                finish_reason = Some(reason);
            }
        }
    }

    trace!("finished a request");

    Ok(ModelClientResponse {
        transcript,
        finish_reason,
    })
}

#[cfg(test)]
mod tests {
    use code_explainer_model::ModelMessage;
    use code_explainer_test_model::{
        Matcher, PresetEvent, PresetResponse, TestModelProvider,
    };

    use super::*;

    fn request(instructions: &str) -> ModelRequest {
        ModelRequest {
            messages: vec![
                ModelMessage::System(instructions.to_owned()),
                ModelMessage::User("Hi".to_owned()),
            ],
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_send_request() {
        let mut model_provider = TestModelProvider::default();
        model_provider.respond_text("greeter", "How are you?");
        let model_client = ModelClient::new(model_provider);

        for _ in 0..3 {
            let resp = model_client
                .send_request(request("You are a greeter."))
                .await
                .unwrap();
            assert_eq!(resp.transcript, "How are you?");
            assert_eq!(resp.finish_reason, Some(ModelFinishReason::Stop));
        }
    }

    #[tokio::test]
    async fn test_error_handling() {
        let model_client = ModelClient::new(TestModelProvider::default());
        let err = model_client
            .send_request(request("Nobody answers this."))
            .await
            .unwrap_err();
        assert_eq!(err.model_error_kind(), Some(ErrorKind::Other));
    }

    #[tokio::test]
    async fn test_content_filter_is_moderated() {
        let mut model_provider = TestModelProvider::default();
        model_provider.respond(
            Matcher::instructions("filtered"),
            PresetResponse::with_events([
                PresetEvent::MessageDelta("partial".to_owned()),
                PresetEvent::Finish(ModelFinishReason::ContentFilter),
            ]),
        );
        let model_client = ModelClient::new(model_provider);
        let err = model_client
            .complete(request("This one gets filtered."))
            .await
            .unwrap_err();
        assert_eq!(err.model_error_kind(), Some(ErrorKind::Moderated));
    }
}
