//! A local fake model for testing purpose.

mod preset;

use std::collections::VecDeque;
use std::error::Error as StdError;
use std::fmt::{self, Debug, Display, Formatter};
use std::future::ready;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll, ready};
use std::time::Duration;

use code_explainer_model::{
    ErrorKind, ModelFinishReason, ModelProvider, ModelProviderError,
    ModelRequest, ModelResponse, ModelResponseEvent,
};
use tokio::time::{Sleep, sleep};

pub use preset::*;

/// Pause before each streamed event.
const EVENT_DELAY: Duration = Duration::from_millis(1);

#[derive(Debug)]
pub struct Error {
    message: String,
    kind: ErrorKind,
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.kind)
    }
}

impl StdError for Error {}

impl ModelProviderError for Error {
    #[inline]
    fn kind(&self) -> ErrorKind {
        self.kind
    }
}

/// Selects which requests a preset response answers.
///
/// Both conditions are substring matches. Unset conditions match anything.
#[derive(Clone, Debug, Default)]
pub struct Matcher {
    instructions: Option<String>,
    input: Option<String>,
}

impl Matcher {
    /// Matches requests whose system instructions contain `needle`.
    #[inline]
    pub fn instructions<S: Into<String>>(needle: S) -> Self {
        Self {
            instructions: Some(needle.into()),
            input: None,
        }
    }

    /// Additionally requires the last user message to contain `needle`.
    #[inline]
    pub fn input<S: Into<String>>(mut self, needle: S) -> Self {
        self.input = Some(needle.into());
        self
    }

    fn matches(&self, req: &ModelRequest) -> bool {
        let contains = |haystack: Option<&str>, needle: &Option<String>| {
            needle.as_deref().is_none_or(|needle| {
                haystack.is_some_and(|haystack| haystack.contains(needle))
            })
        };
        contains(req.instructions(), &self.instructions)
            && contains(req.last_user_input(), &self.input)
    }
}

/// Every request a [`TestModelProvider`] has received, in order.
#[derive(Clone, Default)]
pub struct RequestLog(Arc<Mutex<Vec<ModelRequest>>>);

impl RequestLog {
    /// Returns a snapshot of all recorded requests.
    pub fn requests(&self) -> Vec<ModelRequest> {
        self.0.lock().map(|log| log.clone()).unwrap_or_default()
    }

    /// Returns the indices of requests whose instructions contain `needle`.
    pub fn positions(&self, needle: &str) -> Vec<usize> {
        self.requests()
            .iter()
            .enumerate()
            .filter(|(_, req)| {
                req.instructions().is_some_and(|text| text.contains(needle))
            })
            .map(|(idx, _)| idx)
            .collect()
    }

    /// Returns how many requests carried instructions containing `needle`.
    #[inline]
    pub fn count(&self, needle: &str) -> usize {
        self.positions(needle).len()
    }

    fn push(&self, req: ModelRequest) {
        if let Ok(mut log) = self.0.lock() {
            log.push(req);
        }
    }
}

pub struct TestModelResponse {
    events: VecDeque<ModelResponseEvent>,
    delay: Duration,
    sleep: Option<Pin<Box<Sleep>>>,
}

impl TestModelResponse {
    fn new(preset: &PresetResponse, delay: Duration) -> Self {
        let mut events: VecDeque<_> = preset
            .events
            .iter()
            .map(|event| match event {
                PresetEvent::MessageDelta(msg) => {
                    ModelResponseEvent::MessageDelta(msg.clone())
                }
                PresetEvent::Finish(reason) => {
                    ModelResponseEvent::Completed(*reason)
                }
            })
            .collect();
        let has_finish = events
            .iter()
            .any(|event| matches!(event, ModelResponseEvent::Completed(_)));
        if !has_finish {
            events.push_back(ModelResponseEvent::Completed(
                ModelFinishReason::Stop,
            ));
        }
        Self {
            events,
            delay,
            sleep: None,
        }
    }
}

impl ModelResponse for TestModelResponse {
    type Error = crate::Error;

    fn poll_next_event(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Result<Option<ModelResponseEvent>, Self::Error>> {
        // SAFETY: This type does not require to be pinned.
        let this = unsafe { self.get_unchecked_mut() };
        if this.events.is_empty() {
            return Poll::Ready(Ok(None));
        }

        let delay = this.delay;
        let sleep = this.sleep.get_or_insert_with(|| Box::pin(sleep(delay)));
        ready!(sleep.as_mut().poll(cx));
        this.sleep = None;

        Poll::Ready(Ok(this.events.pop_front()))
    }
}

/// A local fake model for testing purpose.
///
/// Responses are picked by matching each request against the registered
/// [`Matcher`]s in registration order; the first match wins. A request
/// that matches nothing fails with [`ErrorKind::Other`]. Every request,
/// matched or not, is appended to the [`RequestLog`].
///
/// # Note
///
/// This type is not optimized for production use, there are heavy memory
/// copies involved. You should only use it for testing.
#[derive(Clone, Default)]
pub struct TestModelProvider {
    rules: Vec<(Matcher, PresetResponse)>,
    log: RequestLog,
}

impl TestModelProvider {
    /// Answers requests matching `matcher` with `preset`.
    #[inline]
    pub fn respond(&mut self, matcher: Matcher, preset: PresetResponse) {
        self.rules.push((matcher, preset));
    }

    /// Answers requests whose instructions contain `needle` with `text`.
    #[inline]
    pub fn respond_text(&mut self, needle: &str, text: &str) {
        self.respond(Matcher::instructions(needle), PresetResponse::text(text));
    }

    /// Returns a handle to the requests received so far, which stays valid
    /// after the provider has been moved.
    #[inline]
    pub fn log(&self) -> RequestLog {
        self.log.clone()
    }
}

impl ModelProvider for TestModelProvider {
    type Error = crate::Error;
    type Response = TestModelResponse;

    fn send_request(
        &self,
        req: &ModelRequest,
    ) -> impl Future<Output = Result<Self::Response, Self::Error>> + Send + 'static
    {
        self.log.push(req.clone());
        let result = match self.rules.iter().find(|(m, _)| m.matches(req)) {
            Some((_, preset)) => match preset.failure {
                Some(failure) => Err(Error {
                    message: "preset failure".to_owned(),
                    kind: failure.into(),
                }),
                None => Ok(TestModelResponse::new(preset, EVENT_DELAY)),
            },
            None => Err(Error {
                message: format!(
                    "no preset matches instructions {:?}",
                    req.instructions()
                ),
                kind: ErrorKind::Other,
            }),
        };
        ready(result)
    }
}
