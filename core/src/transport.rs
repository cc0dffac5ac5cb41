//! The transport seam. The core never performs I/O itself; a `Client`
//! executes each `Request` and reports the `Response` or a `TransportError`.
//!
//! Implementations are shared by every concurrent invocation and must be
//! internally thread-safe. Connect/read timeouts and redirect handling travel
//! on `Request::options` and are enforced here, not by the handlers.

use crate::error::TransportError;
use crate::http::{Request, Response};

pub trait Client: Send + Sync {
    fn request(&self, request: &Request) -> Result<Response, TransportError>;
}

impl<F> Client for F
where
    F: Fn(&Request) -> Result<Response, TransportError> + Send + Sync,
{
    fn request(&self, request: &Request) -> Result<Response, TransportError> {
        self(request)
    }
}
