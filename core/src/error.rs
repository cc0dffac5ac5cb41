//! Error types for descriptor building and method invocation.
//!
//! # Design
//! Failures are split by *when* they can happen. `TemplateError` and
//! `ConfigError` are raised while descriptors are built, before the first
//! call, so a bad declaration fails at startup. `InvocationError` is raised
//! per call and always passes through the exception handler before it
//! reaches the caller. `TransportError` is the only error type a transport
//! client has to produce.

use thiserror::Error;

/// Boxed error used at the collaborator seams (encoder, decoder, transport).
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A URI template that could not be parsed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TemplateError {
    #[error("unclosed expression starting at offset {offset} in `{template}`")]
    Unclosed { template: String, offset: usize },

    #[error("unexpected `}}` at offset {offset} in `{template}`")]
    UnexpectedClose { template: String, offset: usize },

    #[error("nested `{{` at offset {offset} in `{template}`")]
    Nested { template: String, offset: usize },

    #[error("empty expression at offset {offset} in `{template}`")]
    EmptyExpression { template: String, offset: usize },

    #[error("invalid variable name `{name}` at offset {offset} in `{template}`")]
    InvalidVariable {
        template: String,
        offset: usize,
        name: String,
    },

    #[error("unsupported operator `{operator}` at offset {offset} in `{template}`")]
    UnsupportedOperator {
        template: String,
        offset: usize,
        operator: char,
    },
}

/// A declaration mistake detected while building descriptors or wiring a
/// client. Always fatal.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("method `{method}` has a malformed uri template")]
    Template {
        method: String,
        #[source]
        source: TemplateError,
    },

    #[error("method `{method}` declares two body arguments ({first} and {second})")]
    AmbiguousBody {
        method: String,
        first: usize,
        second: usize,
    },

    #[error("method `{method}`: argument {index} is neither named nor the body")]
    UnboundArgument { method: String, index: usize },

    #[error("method `{method}`: argument {index} cannot be both named and the body")]
    BodyAndNamed { method: String, index: usize },

    #[error("method `{method}` declares parameter `{name}` more than once")]
    DuplicateParameter { method: String, name: String },

    #[error("method `{method}` declares a nested asynchronous return type")]
    NestedAsync { method: String },

    #[error("method `{0}` is declared more than once")]
    DuplicateMethod(String),

    #[error("method `{method}` refers to unknown expander `{expander}`")]
    UnknownExpander { method: String, expander: String },

    #[error("invalid target `{0}`")]
    InvalidTarget(String),

    #[error("missing required value: {0}")]
    Missing(&'static str),

    #[error("malformed interface declaration")]
    Json(#[from] serde_json::Error),
}

/// Error reported by a transport client for a failed exchange.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct TransportError {
    message: String,
    #[source]
    source: Option<BoxError>,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Errors surfaced by a method invocation.
#[derive(Debug, Error)]
pub enum InvocationError {
    /// No method with this name was declared on the client.
    #[error("unknown method `{0}`")]
    UnknownMethod(String),

    /// The caller passed the wrong number of arguments.
    #[error("method `{method}` expects {expected} arguments, got {actual}")]
    Arity {
        method: String,
        expected: usize,
        actual: usize,
    },

    /// A synchronous call on an asynchronous method, or the reverse.
    #[error("method `{method}` invoked in the wrong mode (asynchronous: {asynchronous})")]
    Mode { method: String, asynchronous: bool },

    /// The request body could not be encoded. Never retried.
    #[error("failed to encode request body for `{method}`")]
    Encode {
        method: String,
        #[source]
        source: BoxError,
    },

    /// The exchange failed and the retry policy declined to continue.
    #[error("request to {uri} failed after {attempts} attempt(s)")]
    Transport {
        uri: String,
        attempts: u32,
        #[source]
        source: TransportError,
    },

    /// The server answered with a failure status.
    #[error("HTTP {status}: {body}")]
    Status {
        status: u16,
        reason: Option<String>,
        body: String,
    },

    /// The response could not be turned into the declared return type.
    #[error("failed to process response")]
    Decode(#[source] BoxError),

    /// A failure translated by an exception handler.
    #[error(transparent)]
    Handler(BoxError),

    /// The unit of work was dropped before it completed its future.
    #[error("invocation of `{0}` was abandoned by its executor")]
    Abandoned(String),
}

impl InvocationError {
    /// Status code for `Status` failures.
    pub fn status(&self) -> Option<u16> {
        match self {
            InvocationError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}
