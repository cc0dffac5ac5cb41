//! Method handlers: the per-invocation encode → send → decode pipeline.
//!
//! # Design
//! Both handlers share one `Pipeline`. The synchronous handler runs it on
//! the caller's thread and returns its result. The asynchronous handler
//! packages the same call as a unit of work for an `Executor` and returns a
//! `PendingReply` immediately; the worker completes it exactly once.
//!
//! Every failure in the pipeline (arity, encoding, transport after retries,
//! status, decoding) is handed to the exception handler exactly once, and
//! its decision is what the caller sees.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::thread;

use futures::channel::oneshot;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, debug_span, warn};
use uuid::Uuid;

use crate::codec::{Reply, RequestEncoder, ResponseDecoder};
use crate::descriptor::{MethodDescriptor, ReturnType};
use crate::error::InvocationError;
use crate::exception::ExceptionHandler;
use crate::executor::Executor;
use crate::http::{Request, RequestDraft, Response};
use crate::interceptor::RequestInterceptor;
use crate::retry::RetryDecision;
use crate::template::Bindings;
use crate::transport::Client;

/// Positional arguments for one invocation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Arguments {
    values: Vec<Value>,
}

impl Arguments {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a serializable argument.
    pub fn arg<T: Serialize + ?Sized>(mut self, value: &T) -> Result<Self, serde_json::Error> {
        self.values.push(serde_json::to_value(value)?);
        Ok(self)
    }

    pub fn value(mut self, value: Value) -> Self {
        self.values.push(value);
        self
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl From<Vec<Value>> for Arguments {
    fn from(values: Vec<Value>) -> Self {
        Self { values }
    }
}

/// The collaborators an invocation runs against.
pub(crate) struct Pipeline {
    pub(crate) descriptor: Arc<MethodDescriptor>,
    pub(crate) encoder: Arc<dyn RequestEncoder>,
    pub(crate) interceptors: Vec<Arc<dyn RequestInterceptor>>,
    pub(crate) client: Arc<dyn Client>,
    pub(crate) decoder: Arc<dyn ResponseDecoder>,
    pub(crate) exception_handler: Arc<dyn ExceptionHandler>,
}

/// Final conversion of a decoded reply into what the caller asked for.
/// Runs inside the pipeline so its failures reach the exception handler.
type Finish<R> = fn(Option<Reply>) -> Result<R, InvocationError>;

fn untyped(reply: Option<Reply>) -> Result<Option<Reply>, InvocationError> {
    Ok(reply)
}

fn typed<T: DeserializeOwned>(reply: Option<Reply>) -> Result<Option<T>, InvocationError> {
    reply.map(Reply::into_typed).transpose()
}

impl Pipeline {
    fn execute<R>(&self, args: &Arguments, finish: Finish<R>) -> Result<R, InvocationError> {
        let invocation = Uuid::new_v4();
        let span = debug_span!("invoke", method = %self.descriptor.name(), %invocation);
        let _entered = span.enter();

        match self.run(args).and_then(finish) {
            Ok(result) => Ok(result),
            Err(error) => {
                debug!(error = %error, "invocation failed");
                // a substituted reply is converted once; the handler is not consulted again
                let substitute = self.exception_handler.apply(error)?;
                debug!("exception handler substituted a result");
                finish(substitute)
            }
        }
    }

    fn run(&self, args: &Arguments) -> Result<Option<Reply>, InvocationError> {
        let descriptor = &self.descriptor;
        if args.len() != descriptor.arity() {
            return Err(InvocationError::Arity {
                method: descriptor.name().to_string(),
                expected: descriptor.arity(),
                actual: args.len(),
            });
        }

        let mut bindings = Bindings::new();
        for parameter in descriptor.parameters() {
            bindings.push(
                parameter.name(),
                &args.values[parameter.index()],
                parameter.expander(),
            );
        }
        let uri = descriptor.template().expand(&bindings);

        let content = match descriptor.body() {
            Some(index) => Some(
                self.encoder
                    .encode(&args.values[index], &bindings)
                    .map_err(|source| InvocationError::Encode {
                        method: descriptor.name().to_string(),
                        source,
                    })?,
            ),
            None => None,
        };

        let mut draft = RequestDraft {
            uri,
            method: descriptor.method(),
            headers: descriptor.headers().to_vec(),
            options: *descriptor.options(),
            content,
        };
        if draft.content.is_some() && !draft.has_header("Content-Type") {
            if let Some(content_type) = self.encoder.content_type() {
                draft.header("Content-Type", content_type);
            }
        }
        for interceptor in &self.interceptors {
            interceptor.apply(&mut draft);
        }
        let request = draft.build();

        let response = self.send(&request)?;
        self.decode(response)
    }

    /// Submit the request, consulting the retry policy after each failure.
    fn send(&self, request: &Request) -> Result<Response, InvocationError> {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            debug!(attempt, method = %request.method(), uri = request.uri(), "sending request");
            let error = match self.client.request(request) {
                Ok(response) => {
                    debug!(status = response.status(), "response received");
                    return Ok(response);
                }
                Err(error) => error,
            };
            match self.descriptor.retry().decide(attempt, &error) {
                RetryDecision::Continue { delay } => {
                    warn!(attempt, error = %error, ?delay, "transport failure, retrying");
                    if !delay.is_zero() {
                        thread::sleep(delay);
                    }
                }
                RetryDecision::Decline => {
                    return Err(InvocationError::Transport {
                        uri: request.uri().to_string(),
                        attempts: attempt,
                        source: error,
                    })
                }
            }
        }
    }

    fn decode(&self, mut response: Response) -> Result<Option<Reply>, InvocationError> {
        let return_type = self.descriptor.return_type();
        if *return_type == ReturnType::Response {
            return Ok(Some(Reply::Response(response)));
        }
        if !response.is_success() {
            let body = response
                .take_body()
                .and_then(|body| body.text().ok())
                .unwrap_or_default();
            return Err(InvocationError::Status {
                status: response.status(),
                reason: response.reason().map(str::to_string),
                body,
            });
        }
        self.decoder.decode(Some(response), return_type)
    }
}

/// Runs invocations on the caller's thread.
pub struct SyncMethodHandler {
    pipeline: Pipeline,
}

impl SyncMethodHandler {
    pub(crate) fn new(pipeline: Pipeline) -> Self {
        Self { pipeline }
    }

    pub fn descriptor(&self) -> &MethodDescriptor {
        &self.pipeline.descriptor
    }

    /// Blocks for the whole encode → send → decode sequence.
    pub fn execute(&self, args: &Arguments) -> Result<Option<Reply>, InvocationError> {
        self.pipeline.execute(args, untyped)
    }

    /// Like `execute`, deserializing the reply into `T` before the
    /// exception handler rules on the outcome.
    pub fn execute_typed<T: DeserializeOwned>(
        &self,
        args: &Arguments,
    ) -> Result<Option<T>, InvocationError> {
        self.pipeline.execute(args, typed::<T>)
    }
}

/// Runs invocations on an executor and returns immediately.
pub struct AsyncMethodHandler {
    pipeline: Arc<Pipeline>,
    executor: Arc<dyn Executor>,
}

impl AsyncMethodHandler {
    pub(crate) fn new(pipeline: Pipeline, executor: Arc<dyn Executor>) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            executor,
        }
    }

    pub fn descriptor(&self) -> &MethodDescriptor {
        &self.pipeline.descriptor
    }

    pub fn execute(&self, args: Arguments) -> PendingReply {
        self.submit(args, untyped)
    }

    /// Like `execute`, deserializing the reply into `T` on the worker.
    pub fn execute_typed<T>(&self, args: Arguments) -> PendingReply<Option<T>>
    where
        T: DeserializeOwned + Send + 'static,
    {
        self.submit(args, typed::<T>)
    }

    fn submit<R: Send + 'static>(&self, args: Arguments, finish: Finish<R>) -> PendingReply<R> {
        let (sender, receiver) = oneshot::channel();
        let pipeline = Arc::clone(&self.pipeline);
        self.executor.execute(Box::new(move || {
            let result = pipeline.execute(&args, finish);
            if sender.send(result).is_err() {
                debug!(method = %pipeline.descriptor.name(), "pending reply dropped before completion");
            }
        }));
        PendingReply {
            method: self.pipeline.descriptor.name().to_string(),
            receiver,
        }
    }
}

/// The eventual result of an asynchronous invocation.
#[derive(Debug)]
pub struct PendingReply<R = Option<Reply>> {
    method: String,
    receiver: oneshot::Receiver<Result<R, InvocationError>>,
}

impl<R> PendingReply<R> {
    /// Block the current thread until the invocation completes.
    pub fn wait(self) -> Result<R, InvocationError> {
        futures::executor::block_on(self)
    }
}

impl<R> Future for PendingReply<R> {
    type Output = Result<R, InvocationError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.receiver).poll(cx) {
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            Poll::Ready(Err(oneshot::Canceled)) => {
                Poll::Ready(Err(InvocationError::Abandoned(self.method.clone())))
            }
            Poll::Pending => Poll::Pending,
        }
    }
}
