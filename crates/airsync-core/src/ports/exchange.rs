//! Exchange port
//!
//! The merge loop and polling helpers only need "send this request, give
//! me the decoded response". Abstracting that step keeps them testable
//! without a server.

use crate::domain::errors::AirSyncResult;
use crate::domain::request::RawRequest;
use crate::domain::response::RawResponse;

/// One protocol round trip
#[async_trait::async_trait]
pub trait IExchange: Send + Sync {
    /// Sends `request` and returns the decoded response
    ///
    /// Implementations must not retry: a transport failure is returned to
    /// the caller as is.
    async fn send(&self, request: &RawRequest) -> AirSyncResult<RawResponse>;
}
