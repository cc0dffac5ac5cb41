//! Request encoding and response decoding.
//!
//! # Design
//! `ResponseDecoder::decode` is a provided method that owns the cases every
//! decoder must treat the same way: no response or no body yields `None`
//! without calling the decoder, raw bytes and raw streams are returned as
//! they are, and the raw response type bypasses decoding entirely. Only the
//! remaining, type-specific case reaches `decode_body`, and any failure it
//! reports is wrapped into `InvocationError::Decode`.

use std::fmt;

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::descriptor::ReturnType;
use crate::error::{BoxError, InvocationError};
use crate::http::{Body, Response};
use crate::template::Bindings;

/// The decoded result of an invocation.
#[derive(Debug)]
pub enum Reply {
    Value(Value),
    Bytes(Bytes),
    Stream(Body),
    Response(Response),
}

impl Reply {
    /// Deserialize the reply into `T`. Failures here are not seen by the
    /// exception handler; `RemoteClient::call` converts inside the pipeline.
    pub fn into_typed<T: DeserializeOwned>(self) -> Result<T, InvocationError> {
        let decoded = match self {
            Reply::Value(value) => serde_json::from_value(value),
            Reply::Bytes(bytes) => serde_json::from_slice(&bytes),
            Reply::Stream(body) => serde_json::from_reader(body),
            Reply::Response(mut response) => match response.take_body() {
                Some(body) => serde_json::from_reader(body),
                None => serde_json::from_value(Value::Null),
            },
        };
        decoded.map_err(|e| InvocationError::Decode(e.into()))
    }

    pub fn into_value(self) -> Option<Value> {
        match self {
            Reply::Value(value) => Some(value),
            _ => None,
        }
    }

    pub fn into_bytes(self) -> Option<Bytes> {
        match self {
            Reply::Bytes(bytes) => Some(bytes),
            _ => None,
        }
    }

    pub fn into_stream(self) -> Option<Body> {
        match self {
            Reply::Stream(body) => Some(body),
            _ => None,
        }
    }

    pub fn into_response(self) -> Option<Response> {
        match self {
            Reply::Response(response) => Some(response),
            _ => None,
        }
    }
}

/// Turns the body argument (and, if needed, the other bound arguments) into
/// request content.
pub trait RequestEncoder: Send + Sync + fmt::Debug {
    fn encode(&self, body: &Value, bindings: &Bindings<'_>) -> Result<Bytes, BoxError>;

    /// Content type advertised for encoded bodies.
    fn content_type(&self) -> Option<&str> {
        None
    }
}

/// Turns a response into the declared return type.
pub trait ResponseDecoder: Send + Sync + fmt::Debug {
    /// Type-specific decoding of a body that is known to be present.
    fn decode_body(&self, body: Body, return_type: &ReturnType) -> Result<Value, BoxError>;

    fn decode(
        &self,
        response: Option<Response>,
        return_type: &ReturnType,
    ) -> Result<Option<Reply>, InvocationError> {
        let Some(mut response) = response else {
            return Ok(None);
        };
        match return_type {
            ReturnType::Response => return Ok(Some(Reply::Response(response))),
            ReturnType::Async(inner) => return self.decode(Some(response), inner),
            _ => {}
        }
        let Some(body) = response.take_body() else {
            return Ok(None);
        };
        match return_type {
            ReturnType::Unit => Ok(None),
            ReturnType::Bytes => body
                .bytes()
                .map(|bytes| Some(Reply::Bytes(bytes)))
                .map_err(|e| InvocationError::Decode(e.into())),
            ReturnType::Stream => Ok(Some(Reply::Stream(body))),
            other => self
                .decode_body(body, other)
                .map(|value| Some(Reply::Value(value)))
                .map_err(InvocationError::Decode),
        }
    }
}

/// Encodes the body argument as JSON.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonEncoder;

impl RequestEncoder for JsonEncoder {
    fn encode(&self, body: &Value, _bindings: &Bindings<'_>) -> Result<Bytes, BoxError> {
        Ok(Bytes::from(serde_json::to_vec(body)?))
    }

    fn content_type(&self) -> Option<&str> {
        Some("application/json")
    }
}

/// Decodes JSON bodies; `Text` return types receive the body verbatim.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonDecoder;

impl ResponseDecoder for JsonDecoder {
    fn decode_body(&self, body: Body, return_type: &ReturnType) -> Result<Value, BoxError> {
        match return_type {
            ReturnType::Text => Ok(Value::String(body.text()?)),
            _ => Ok(serde_json::from_reader(body)?),
        }
    }
}
