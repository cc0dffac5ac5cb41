//! Immutable per-method request templates.
//!
//! # Design
//! A `MethodDescriptor` is produced once per declared method by the
//! contract and never changes afterwards. Handlers share it through an
//! `Arc`, and every per-call value (expanded URI, bindings, request) is
//! derived from it without mutation.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::ConfigError;
use crate::http::{Header, HttpMethod, RequestOptions};
use crate::retry::Retry;
use crate::template::{Expander, UriTemplate};

/// The remote destination a client is bound to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    name: String,
    uri: String,
}

impl Target {
    /// `uri` must be an absolute URL with a host. Trailing slashes are
    /// dropped so method paths can be appended verbatim.
    pub fn new(name: impl Into<String>, uri: impl AsRef<str>) -> Result<Self, ConfigError> {
        let uri = uri.as_ref();
        match Url::parse(uri) {
            Ok(url) if url.has_host() && !url.host_str().is_some_and(str::is_empty) => {}
            _ => return Err(ConfigError::InvalidTarget(uri.to_string())),
        }
        Ok(Self {
            name: name.into(),
            uri: uri.trim_end_matches('/').to_string(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }
}

/// True when `uri` starts with a scheme (`http:`, `https:`, ...). Used on
/// method and interface paths, which are templates and may not parse as URLs.
pub fn is_absolute(uri: &str) -> bool {
    match uri.split_once(':') {
        Some((scheme, _)) => {
            let mut chars = scheme.chars();
            chars.next().is_some_and(|c| c.is_ascii_alphabetic())
                && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        }
        None => false,
    }
}

/// What a method declares it returns.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "of")]
pub enum ReturnType {
    /// Nothing; the body is discarded.
    #[default]
    Unit,
    /// A JSON value, named for diagnostics.
    Value(String),
    /// The body as UTF-8 text.
    Text,
    /// The fully read body bytes.
    Bytes,
    /// The unread body.
    Stream,
    /// The raw response, with decoding bypassed.
    Response,
    /// An asynchronous result of the inner type.
    Async(Box<ReturnType>),
}

impl ReturnType {
    pub fn value(type_name: impl Into<String>) -> Self {
        ReturnType::Value(type_name.into())
    }

    pub fn asynchronous(inner: ReturnType) -> Self {
        ReturnType::Async(Box::new(inner))
    }

    pub fn is_async(&self) -> bool {
        matches!(self, ReturnType::Async(_))
    }
}

/// A named argument and the expander chosen for its shape.
#[derive(Clone)]
pub struct TemplateParameter {
    name: String,
    index: usize,
    expander: Arc<dyn Expander>,
}

impl TemplateParameter {
    pub fn new(name: impl Into<String>, index: usize, expander: Arc<dyn Expander>) -> Self {
        Self {
            name: name.into(),
            index,
            expander,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Position of the bound argument in the call's argument list.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn expander(&self) -> &dyn Expander {
        self.expander.as_ref()
    }
}

impl fmt::Debug for TemplateParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemplateParameter")
            .field("name", &self.name)
            .field("index", &self.index)
            .field("expander", &self.expander)
            .finish()
    }
}

/// Immutable request template for one declared method.
#[derive(Debug, Clone)]
pub struct MethodDescriptor {
    pub(crate) name: String,
    pub(crate) template: UriTemplate,
    pub(crate) method: HttpMethod,
    pub(crate) headers: Vec<Header>,
    pub(crate) parameters: Vec<TemplateParameter>,
    pub(crate) arity: usize,
    pub(crate) body: Option<usize>,
    pub(crate) return_type: ReturnType,
    pub(crate) asynchronous: bool,
    pub(crate) options: RequestOptions,
    pub(crate) retry: Arc<dyn Retry>,
}

impl MethodDescriptor {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The fully resolved URI template (root + path, or the absolute path).
    pub fn uri(&self) -> &str {
        self.template.as_str()
    }

    pub fn template(&self) -> &UriTemplate {
        &self.template
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    pub fn headers(&self) -> &[Header] {
        &self.headers
    }

    pub fn parameters(&self) -> &[TemplateParameter] {
        &self.parameters
    }

    pub fn parameter(&self, name: &str) -> Option<&TemplateParameter> {
        self.parameters.iter().find(|p| p.name == name)
    }

    /// Number of arguments a call must supply.
    pub fn arity(&self) -> usize {
        self.arity
    }

    /// Position of the body argument, if any.
    pub fn body(&self) -> Option<usize> {
        self.body
    }

    /// Declared return element type. For asynchronous methods this is the
    /// unwrapped inner type.
    pub fn return_type(&self) -> &ReturnType {
        &self.return_type
    }

    pub fn is_async(&self) -> bool {
        self.asynchronous
    }

    pub fn options(&self) -> &RequestOptions {
        &self.options
    }

    pub fn connect_timeout(&self) -> std::time::Duration {
        self.options.connect_timeout
    }

    pub fn read_timeout(&self) -> std::time::Duration {
        self.options.read_timeout
    }

    pub fn follow_redirects(&self) -> bool {
        self.options.follow_redirects
    }

    pub fn retry(&self) -> &dyn Retry {
        self.retry.as_ref()
    }
}
