use std::collections::VecDeque;
use std::error::Error;
use std::fmt::{self, Display, Formatter};
use std::future::{poll_fn, ready};
use std::pin::Pin;
use std::task::{self, Poll, ready};
use std::time::Duration;

use code_explainer_model::{
    ErrorKind, ModelFinishReason, ModelMessage, ModelProvider,
    ModelProviderError, ModelRequest, ModelResponse, ModelResponseEvent,
};
use tokio::time::{Sleep, sleep};

#[derive(Debug)]
struct EchoError(ErrorKind);

impl Display for EchoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "echo model failed: {}", self.0)
    }
}

impl Error for EchoError {}

impl ModelProviderError for EchoError {
    fn kind(&self) -> ErrorKind {
        self.0
    }
}

/// Streams "<model> heard <input>" word by word.
struct EchoResponse {
    words: VecDeque<String>,
    finished: bool,
    sleep: Option<Pin<Box<Sleep>>>,
}

impl ModelResponse for EchoResponse {
    type Error = EchoError;

    fn poll_next_event(
        self: Pin<&mut Self>,
        cx: &mut task::Context<'_>,
    ) -> Poll<Result<Option<ModelResponseEvent>, Self::Error>> {
        // SAFETY: This type does not require to be pinned.
        let this = unsafe { self.get_unchecked_mut() };
        let sleep = this
            .sleep
            .get_or_insert_with(|| Box::pin(sleep(Duration::from_millis(1))));
        ready!(sleep.as_mut().poll(cx));
        this.sleep = None;

        if let Some(mut word) = this.words.pop_front() {
            if !this.words.is_empty() {
                word.push(' ');
            }
            return Poll::Ready(Ok(Some(ModelResponseEvent::MessageDelta(
                word,
            ))));
        }
        if !this.finished {
            this.finished = true;
            return Poll::Ready(Ok(Some(ModelResponseEvent::Completed(
                ModelFinishReason::Stop,
            ))));
        }
        Poll::Ready(Ok(None))
    }
}

struct EchoProvider;

impl ModelProvider for EchoProvider {
    type Error = EchoError;
    type Response = EchoResponse;

    fn send_request(
        &self,
        req: &ModelRequest,
    ) -> impl Future<Output = Result<Self::Response, Self::Error>> + Send + 'static
    {
        let result = match req.last_user_input() {
            Some(input) => {
                let model = req.model.as_deref().unwrap_or("default");
                let words = format!("{model} heard {input}")
                    .split(' ')
                    .map(ToString::to_string)
                    .collect();
                Ok(EchoResponse {
                    words,
                    finished: false,
                    sleep: None,
                })
            }
            None => Err(EchoError(ErrorKind::Other)),
        };
        ready(result)
    }
}

async fn collect(mut resp: EchoResponse) -> (String, ModelFinishReason) {
    let mut text = String::new();
    let mut reason = None;
    while let Some(event) = poll_fn(|cx| Pin::new(&mut resp).poll_next_event(cx))
        .await
        .unwrap()
    {
        match event {
            ModelResponseEvent::MessageDelta(delta) => text.push_str(&delta),
            ModelResponseEvent::Completed(r) => reason = Some(r),
        }
    }
    (text, reason.unwrap())
}

#[tokio::test]
async fn test_streamed_completion() {
    let req = ModelRequest {
        model: Some("gpt-4o-mini".to_owned()),
        messages: vec![
            ModelMessage::System("Detect the language.".to_owned()),
            ModelMessage::User("fn main() {}".to_owned()),
        ],
        response_format: None,
    };
    assert_eq!(req.instructions(), Some("Detect the language."));

    let resp = EchoProvider.send_request(&req).await.unwrap();
    let (text, reason) = collect(resp).await;
    assert_eq!(text, "gpt-4o-mini heard fn main() {}");
    assert_eq!(reason, ModelFinishReason::Stop);
}

#[tokio::test]
async fn test_request_without_user_input() {
    let req = ModelRequest {
        messages: vec![ModelMessage::System("Only a prompt.".to_owned())],
        ..Default::default()
    };
    let err = EchoProvider.send_request(&req).await.err().unwrap();
    assert_eq!(err.kind(), ErrorKind::Other);
}
