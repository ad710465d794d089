use std::error::Error;

use crate::error::ErrorKind;
use crate::request::ModelRequest;
use crate::response::ModelResponse;

/// An error reported by a provider, classified by [`ErrorKind`].
pub trait ModelProviderError: Error + Send + Sync + 'static {
    /// Returns how the failure should be treated by callers.
    fn kind(&self) -> ErrorKind;
}

/// A connection to a model service.
///
/// Providers keep no conversation state. Everything a role needs travels
/// in the request, which lets one provider serve every agent role.
pub trait ModelProvider: Send + Sync {
    /// Failure type of requests and streamed responses.
    type Error: ModelProviderError;

    /// The streamed reply type.
    type Response: ModelResponse<Error = Self::Error>;

    /// Starts sampling a reply for `req`.
    ///
    /// The returned future owns everything it needs, so it can outlive
    /// `req` and the provider borrow.
    fn send_request(
        &self,
        req: &ModelRequest,
    ) -> impl Future<Output = Result<Self::Response, Self::Error>> + Send + 'static;
}
