//! Exception handlers decide the caller-visible outcome of a failed call.

use std::fmt;

use crate::codec::Reply;
use crate::error::InvocationError;

/// Receives every captured invocation failure exactly once. Returning `Ok`
/// substitutes a result; returning `Err` surfaces that failure, which may be
/// the original or a translation of it.
pub trait ExceptionHandler: Send + Sync + fmt::Debug {
    fn apply(&self, error: InvocationError) -> Result<Option<Reply>, InvocationError>;
}

/// Surfaces every failure unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct RethrowExceptionHandler;

impl ExceptionHandler for RethrowExceptionHandler {
    fn apply(&self, error: InvocationError) -> Result<Option<Reply>, InvocationError> {
        Err(error)
    }
}

/// Maps selected response statuses to an absent result and rethrows the
/// rest. `NotFoundAsNone::default()` covers 404.
#[derive(Debug, Clone)]
pub struct NotFoundAsNone {
    statuses: Vec<u16>,
}

impl NotFoundAsNone {
    pub fn for_statuses(statuses: impl IntoIterator<Item = u16>) -> Self {
        Self {
            statuses: statuses.into_iter().collect(),
        }
    }
}

impl Default for NotFoundAsNone {
    fn default() -> Self {
        Self { statuses: vec![404] }
    }
}

impl ExceptionHandler for NotFoundAsNone {
    fn apply(&self, error: InvocationError) -> Result<Option<Reply>, InvocationError> {
        match error.status() {
            Some(status) if self.statuses.contains(&status) => Ok(None),
            _ => Err(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn not_found() -> InvocationError {
        InvocationError::Status {
            status: 404,
            reason: Some("Not Found".to_string()),
            body: String::new(),
        }
    }

    #[test]
    fn rethrow_returns_error_unchanged() {
        let err = RethrowExceptionHandler.apply(not_found()).unwrap_err();
        assert_eq!(err.status(), Some(404));
    }

    #[test]
    fn not_found_maps_only_listed_statuses() {
        let handler = NotFoundAsNone::default();
        assert!(handler.apply(not_found()).unwrap().is_none());
        let other = InvocationError::Status {
            status: 500,
            reason: None,
            body: "boom".to_string(),
        };
        assert_eq!(handler.apply(other).unwrap_err().status(), Some(500));
        let gone = NotFoundAsNone::for_statuses([404, 410]);
        let err = InvocationError::Status {
            status: 410,
            reason: None,
            body: String::new(),
        };
        assert!(gone.apply(err).unwrap().is_none());
    }
}
