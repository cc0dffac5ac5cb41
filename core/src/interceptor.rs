//! Request interceptors adjust every outgoing request before it is frozen.

use crate::http::RequestDraft;

/// Runs after encoding and before the immutable `Request` is built.
/// Interceptors run in registration order and are shared across threads.
pub trait RequestInterceptor: Send + Sync {
    fn apply(&self, request: &mut RequestDraft);
}

impl<F> RequestInterceptor for F
where
    F: Fn(&mut RequestDraft) + Send + Sync,
{
    fn apply(&self, request: &mut RequestDraft) {
        self(request)
    }
}

/// Adds a fixed header to every request unless one is already present.
#[derive(Debug, Clone)]
pub struct DefaultHeader {
    name: String,
    value: String,
}

impl DefaultHeader {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

impl RequestInterceptor for DefaultHeader {
    fn apply(&self, request: &mut RequestDraft) {
        if !request.has_header(&self.name) {
            request.header(self.name.clone(), self.value.clone());
        }
    }
}
