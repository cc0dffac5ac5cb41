//! The typed client object: one callable handle per declared method.
//!
//! # Design
//! `RemoteClientBuilder` is the wiring step. It runs the contract over the
//! interface declaration, so every configuration error surfaces from
//! `build`, and pairs each resulting descriptor with the shared
//! collaborators. After that the client is read-only and can be shared
//! across threads freely.

use std::collections::HashMap;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use tracing::debug;

use crate::codec::{JsonDecoder, JsonEncoder, Reply, RequestEncoder, ResponseDecoder};
use crate::contract::{BodyPolicy, Contract, InterfaceDecl};
use crate::descriptor::{MethodDescriptor, Target};
use crate::error::{ConfigError, InvocationError};
use crate::exception::{ExceptionHandler, RethrowExceptionHandler};
use crate::executor::Executor;
use crate::handler::{Arguments, AsyncMethodHandler, PendingReply, Pipeline, SyncMethodHandler};
use crate::interceptor::RequestInterceptor;
use crate::retry::Retry;
use crate::template::Expander;
use crate::transport::Client;

/// The handler bound to one declared method.
pub enum MethodHandle {
    Sync(SyncMethodHandler),
    Async(AsyncMethodHandler),
}

impl MethodHandle {
    pub fn descriptor(&self) -> &MethodDescriptor {
        match self {
            MethodHandle::Sync(handler) => handler.descriptor(),
            MethodHandle::Async(handler) => handler.descriptor(),
        }
    }
}

/// A client bound to one target and one interface declaration.
pub struct RemoteClient {
    target: Target,
    handles: HashMap<String, MethodHandle>,
}

impl RemoteClient {
    pub fn builder(target: Target) -> RemoteClientBuilder {
        RemoteClientBuilder::new(target)
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    pub fn method(&self, name: &str) -> Option<&MethodHandle> {
        self.handles.get(name)
    }

    pub fn descriptors(&self) -> impl Iterator<Item = &MethodDescriptor> {
        self.handles.values().map(MethodHandle::descriptor)
    }

    /// Invoke a synchronous method on the calling thread.
    pub fn invoke(&self, name: &str, args: &Arguments) -> Result<Option<Reply>, InvocationError> {
        match self.handle(name)? {
            MethodHandle::Sync(handler) => handler.execute(args),
            MethodHandle::Async(_) => Err(InvocationError::Mode {
                method: name.to_string(),
                asynchronous: true,
            }),
        }
    }

    /// Invoke a synchronous method and deserialize its reply. A reply that
    /// does not fit `T` is a decode failure seen by the exception handler.
    pub fn call<T: DeserializeOwned>(
        &self,
        name: &str,
        args: &Arguments,
    ) -> Result<Option<T>, InvocationError> {
        match self.handle(name)? {
            MethodHandle::Sync(handler) => handler.execute_typed(args),
            MethodHandle::Async(_) => Err(InvocationError::Mode {
                method: name.to_string(),
                asynchronous: true,
            }),
        }
    }

    /// Submit an asynchronous method to its executor.
    pub fn invoke_async(&self, name: &str, args: Arguments) -> Result<PendingReply, InvocationError> {
        match self.handle(name)? {
            MethodHandle::Async(handler) => Ok(handler.execute(args)),
            MethodHandle::Sync(_) => Err(InvocationError::Mode {
                method: name.to_string(),
                asynchronous: false,
            }),
        }
    }

    /// Submit an asynchronous method whose reply is deserialized into `T`
    /// on the worker.
    pub fn call_async<T>(
        &self,
        name: &str,
        args: Arguments,
    ) -> Result<PendingReply<Option<T>>, InvocationError>
    where
        T: DeserializeOwned + Send + 'static,
    {
        match self.handle(name)? {
            MethodHandle::Async(handler) => Ok(handler.execute_typed(args)),
            MethodHandle::Sync(_) => Err(InvocationError::Mode {
                method: name.to_string(),
                asynchronous: false,
            }),
        }
    }

    fn handle(&self, name: &str) -> Result<&MethodHandle, InvocationError> {
        self.handles
            .get(name)
            .ok_or_else(|| InvocationError::UnknownMethod(name.to_string()))
    }
}

/// Wires a `RemoteClient` together.
pub struct RemoteClientBuilder {
    target: Target,
    interface: Option<InterfaceDecl>,
    contract: Contract,
    client: Option<Arc<dyn Client>>,
    encoder: Arc<dyn RequestEncoder>,
    decoder: Arc<dyn ResponseDecoder>,
    exception_handler: Arc<dyn ExceptionHandler>,
    executor: Option<Arc<dyn Executor>>,
    interceptors: Vec<Arc<dyn RequestInterceptor>>,
}

impl RemoteClientBuilder {
    fn new(target: Target) -> Self {
        Self {
            target,
            interface: None,
            contract: Contract::new(),
            client: None,
            encoder: Arc::new(JsonEncoder),
            decoder: Arc::new(JsonDecoder),
            exception_handler: Arc::new(RethrowExceptionHandler),
            executor: None,
            interceptors: Vec::new(),
        }
    }

    pub fn interface(mut self, interface: InterfaceDecl) -> Self {
        self.interface = Some(interface);
        self
    }

    /// The transport client. Required.
    pub fn client(mut self, client: Arc<dyn Client>) -> Self {
        self.client = Some(client);
        self
    }

    pub fn encoder(mut self, encoder: Arc<dyn RequestEncoder>) -> Self {
        self.encoder = encoder;
        self
    }

    pub fn decoder(mut self, decoder: Arc<dyn ResponseDecoder>) -> Self {
        self.decoder = decoder;
        self
    }

    pub fn exception_handler(mut self, handler: Arc<dyn ExceptionHandler>) -> Self {
        self.exception_handler = handler;
        self
    }

    /// Required when the interface declares an asynchronous method.
    pub fn executor(mut self, executor: Arc<dyn Executor>) -> Self {
        self.executor = Some(executor);
        self
    }

    pub fn interceptor(mut self, interceptor: Arc<dyn RequestInterceptor>) -> Self {
        self.interceptors.push(interceptor);
        self
    }

    /// Retry policy for methods whose declaration names none.
    pub fn retry(mut self, retry: Arc<dyn Retry>) -> Self {
        self.contract = self.contract.default_retry(retry);
        self
    }

    pub fn body_policy(mut self, policy: BodyPolicy) -> Self {
        self.contract = self.contract.body_policy(policy);
        self
    }

    pub fn expander(mut self, name: impl Into<String>, expander: Arc<dyn Expander>) -> Self {
        self.contract = self.contract.expander(name, expander);
        self
    }

    pub fn build(self) -> Result<RemoteClient, ConfigError> {
        let interface = self.interface.ok_or(ConfigError::Missing("interface"))?;
        let client = self.client.ok_or(ConfigError::Missing("client"))?;
        let descriptors = self.contract.apply(&self.target, &interface)?;

        let mut handles = HashMap::with_capacity(descriptors.len());
        for descriptor in descriptors {
            let name = descriptor.name().to_string();
            let asynchronous = descriptor.is_async();
            let pipeline = Pipeline {
                descriptor: Arc::new(descriptor),
                encoder: Arc::clone(&self.encoder),
                interceptors: self.interceptors.clone(),
                client: Arc::clone(&client),
                decoder: Arc::clone(&self.decoder),
                exception_handler: Arc::clone(&self.exception_handler),
            };
            let handle = if asynchronous {
                let executor = self.executor.clone().ok_or(ConfigError::Missing("executor"))?;
                MethodHandle::Async(AsyncMethodHandler::new(pipeline, executor))
            } else {
                MethodHandle::Sync(SyncMethodHandler::new(pipeline))
            };
            handles.insert(name, handle);
        }

        debug!(target = self.target.name(), methods = handles.len(), "remote client built");
        Ok(RemoteClient {
            target: self.target,
            handles,
        })
    }
}
