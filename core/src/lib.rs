//! Declarative remote-invocation client core.
//!
//! # Overview
//! An interface declaration (paths, methods, headers, argument bindings) is
//! turned once into immutable method descriptors. Each call then expands the
//! descriptor's URI template with the call's arguments, encodes the body,
//! hands the request to a pluggable transport client and decodes the
//! response into the declared return type.
//!
//! # Design
//! - The core performs no I/O. Transport, encoding, decoding, retry,
//!   exception handling and execution are collaborator traits.
//! - Descriptors and templates are built and validated eagerly, then shared
//!   read-only by every invocation.
//! - Synchronous methods run on the caller's thread; asynchronous methods run
//!   the same pipeline on an `Executor` and return a `PendingReply`.
//! - Every failure passes through the `ExceptionHandler`, whose decision is
//!   final.

pub mod client;
pub mod codec;
pub mod contract;
pub mod descriptor;
pub mod error;
pub mod exception;
pub mod executor;
pub mod handler;
pub mod http;
pub mod interceptor;
pub mod retry;
pub mod template;
pub mod transport;

pub use client::{MethodHandle, RemoteClient, RemoteClientBuilder};
pub use codec::{JsonDecoder, JsonEncoder, Reply, RequestEncoder, ResponseDecoder};
pub use contract::{ArgShape, BodyPolicy, Contract, InterfaceDecl, MethodDecl, OptionsDecl, ParamDecl};
pub use descriptor::{MethodDescriptor, ReturnType, Target, TemplateParameter};
pub use error::{BoxError, ConfigError, InvocationError, TemplateError, TransportError};
pub use exception::{ExceptionHandler, NotFoundAsNone, RethrowExceptionHandler};
pub use executor::{Executor, Job, ThreadPool, TokioExecutor};
pub use handler::{Arguments, AsyncMethodHandler, PendingReply, SyncMethodHandler};
pub use http::{Body, Header, HttpMethod, Request, RequestDraft, RequestOptions, Response};
pub use interceptor::{DefaultHeader, RequestInterceptor};
pub use retry::{CountingRetry, NoRetry, Retry, RetryConfig, RetryDecision};
pub use template::{Bindings, Expander, ListExpander, MapExpander, SimpleExpander, UriTemplate};
pub use transport::Client;
