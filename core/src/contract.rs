//! Declarative interface descriptions and the extractor that turns them into
//! method descriptors.
//!
//! # Design
//! An interface is plain data: `InterfaceDecl` deserializes from JSON or is
//! assembled in code with the builder helpers, and both paths feed the same
//! `Contract::apply`. Every check that can fail (template syntax, body
//! selection, parameter names, nested async types) runs here, once, so a
//! mistake stops client construction instead of surfacing on first use.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::descriptor::{is_absolute, MethodDescriptor, ReturnType, Target, TemplateParameter};
use crate::error::ConfigError;
use crate::http::{merge_header, Header, HttpMethod, RequestOptions};
use crate::retry::{NoRetry, Retry, RetryConfig};
use crate::template::{Expander, ListExpander, MapExpander, SimpleExpander, UriTemplate};

/// Shape of a named argument; selects its expander.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArgShape {
    #[default]
    Scalar,
    Sequence,
    Map,
}

/// Per-interface or per-method transport options. Unset fields inherit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionsDecl {
    #[serde(default, with = "humantime_serde")]
    pub connect_timeout: Option<Duration>,
    #[serde(default, with = "humantime_serde")]
    pub read_timeout: Option<Duration>,
    #[serde(default)]
    pub follow_redirects: Option<bool>,
}

impl OptionsDecl {
    fn resolve(&self, base: RequestOptions) -> RequestOptions {
        RequestOptions {
            connect_timeout: self.connect_timeout.unwrap_or(base.connect_timeout),
            read_timeout: self.read_timeout.unwrap_or(base.read_timeout),
            follow_redirects: self.follow_redirects.unwrap_or(base.follow_redirects),
        }
    }
}

/// One declared method argument.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamDecl {
    /// Template variable this argument binds to.
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub shape: ArgShape,
    /// Explicit body marker.
    #[serde(default)]
    pub body: bool,
    /// Name of a custom expander registered on the contract.
    #[serde(default)]
    pub expander: Option<String>,
}

impl ParamDecl {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn body() -> Self {
        Self {
            body: true,
            ..Self::default()
        }
    }

    /// Neither named nor marked; a body candidate under `BodyPolicy::SoleUnmarked`.
    pub fn unmarked() -> Self {
        Self::default()
    }

    pub fn shape(mut self, shape: ArgShape) -> Self {
        self.shape = shape;
        self
    }

    pub fn expander(mut self, name: impl Into<String>) -> Self {
        self.expander = Some(name.into());
        self
    }
}

/// One declared remote method.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodDecl {
    pub name: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub method: HttpMethod,
    #[serde(default)]
    pub headers: Vec<Header>,
    #[serde(default)]
    pub options: OptionsDecl,
    #[serde(default)]
    pub retry: Option<RetryConfig>,
    #[serde(default)]
    pub params: Vec<ParamDecl>,
    #[serde(default)]
    pub returns: ReturnType,
}

impl MethodDecl {
    pub fn new(name: impl Into<String>, method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            method,
            headers: Vec::new(),
            options: OptionsDecl::default(),
            retry: None,
            params: Vec::new(),
            returns: ReturnType::Unit,
        }
    }

    pub fn param(mut self, param: ParamDecl) -> Self {
        self.params.push(param);
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push(Header::new(name, value));
        self
    }

    pub fn returns(mut self, returns: ReturnType) -> Self {
        self.returns = returns;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.options.connect_timeout = Some(timeout);
        self
    }

    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.options.read_timeout = Some(timeout);
        self
    }

    pub fn follow_redirects(mut self, follow: bool) -> Self {
        self.options.follow_redirects = Some(follow);
        self
    }

    pub fn retry(mut self, retry: RetryConfig) -> Self {
        self.retry = Some(retry);
        self
    }
}

/// A declared remote interface.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InterfaceDecl {
    /// Path prefix shared by every method.
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub headers: Vec<Header>,
    #[serde(default)]
    pub options: OptionsDecl,
    #[serde(default)]
    pub retry: Option<RetryConfig>,
    #[serde(default)]
    pub methods: Vec<MethodDecl>,
}

impl InterfaceDecl {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push(Header::new(name, value));
        self
    }

    pub fn options(mut self, options: OptionsDecl) -> Self {
        self.options = options;
        self
    }

    pub fn retry(mut self, retry: RetryConfig) -> Self {
        self.retry = Some(retry);
        self
    }

    pub fn method(mut self, method: MethodDecl) -> Self {
        self.methods.push(method);
        self
    }
}

/// How an argument that is neither named nor marked is treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BodyPolicy {
    /// The lone unmarked argument becomes the body when none is marked.
    #[default]
    SoleUnmarked,
    /// Only explicitly marked arguments can be the body.
    ExplicitOnly,
}

/// Builds method descriptors from an interface declaration.
#[derive(Debug, Clone)]
pub struct Contract {
    body_policy: BodyPolicy,
    expanders: HashMap<String, Arc<dyn Expander>>,
    default_retry: Arc<dyn Retry>,
}

impl Default for Contract {
    fn default() -> Self {
        Self {
            body_policy: BodyPolicy::default(),
            expanders: HashMap::new(),
            default_retry: Arc::new(NoRetry),
        }
    }
}

impl Contract {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn body_policy(mut self, policy: BodyPolicy) -> Self {
        self.body_policy = policy;
        self
    }

    /// Register a custom expander that parameters can select by name.
    pub fn expander(mut self, name: impl Into<String>, expander: Arc<dyn Expander>) -> Self {
        self.expanders.insert(name.into(), expander);
        self
    }

    /// Retry policy for methods whose declaration names none.
    pub fn default_retry(mut self, retry: Arc<dyn Retry>) -> Self {
        self.default_retry = retry;
        self
    }

    pub fn apply(
        &self,
        target: &Target,
        interface: &InterfaceDecl,
    ) -> Result<Vec<MethodDescriptor>, ConfigError> {
        let interface_retry = interface.retry.as_ref().map(RetryConfig::build);
        let interface_options = interface.options.resolve(RequestOptions::default());

        let mut names = HashSet::new();
        let mut descriptors = Vec::with_capacity(interface.methods.len());
        for method in &interface.methods {
            if !names.insert(method.name.as_str()) {
                return Err(ConfigError::DuplicateMethod(method.name.clone()));
            }
            let retry = match (&method.retry, &interface_retry) {
                (Some(config), _) => config.build(),
                (None, Some(shared)) => Arc::clone(shared),
                (None, None) => Arc::clone(&self.default_retry),
            };
            descriptors.push(self.describe(target, interface, interface_options, method, retry)?);
        }
        Ok(descriptors)
    }

    fn describe(
        &self,
        target: &Target,
        interface: &InterfaceDecl,
        interface_options: RequestOptions,
        method: &MethodDecl,
        retry: Arc<dyn Retry>,
    ) -> Result<MethodDescriptor, ConfigError> {
        if method.name.is_empty() {
            return Err(ConfigError::Missing("method name"));
        }

        let uri = resolve_uri(target.uri(), &interface.path, &method.path);
        let template = UriTemplate::parse(&uri).map_err(|source| ConfigError::Template {
            method: method.name.clone(),
            source,
        })?;

        let mut headers = Vec::new();
        for header in interface.headers.iter().chain(&method.headers) {
            merge_header(&mut headers, header.clone());
        }

        let (parameters, body) = self.bind_arguments(method)?;

        let (return_type, asynchronous) = match &method.returns {
            ReturnType::Async(inner) if inner.is_async() => {
                return Err(ConfigError::NestedAsync {
                    method: method.name.clone(),
                })
            }
            ReturnType::Async(inner) => ((**inner).clone(), true),
            other => (other.clone(), false),
        };

        Ok(MethodDescriptor {
            name: method.name.clone(),
            template,
            method: method.method,
            headers,
            parameters,
            arity: method.params.len(),
            body,
            return_type,
            asynchronous,
            options: method.options.resolve(interface_options),
            retry,
        })
    }

    fn bind_arguments(
        &self,
        method: &MethodDecl,
    ) -> Result<(Vec<TemplateParameter>, Option<usize>), ConfigError> {
        let mut parameters = Vec::new();
        let mut seen = HashSet::new();
        let mut body: Option<usize> = None;
        let mut unmarked = Vec::new();

        for (index, param) in method.params.iter().enumerate() {
            match (&param.name, param.body) {
                (Some(_), true) => {
                    return Err(ConfigError::BodyAndNamed {
                        method: method.name.clone(),
                        index,
                    })
                }
                (None, true) => {
                    if let Some(first) = body {
                        return Err(ConfigError::AmbiguousBody {
                            method: method.name.clone(),
                            first,
                            second: index,
                        });
                    }
                    body = Some(index);
                }
                (Some(name), false) => {
                    if !seen.insert(name.as_str()) {
                        return Err(ConfigError::DuplicateParameter {
                            method: method.name.clone(),
                            name: name.clone(),
                        });
                    }
                    let expander = self.expander_for(method, param)?;
                    parameters.push(TemplateParameter::new(name.clone(), index, expander));
                }
                (None, false) => unmarked.push(index),
            }
        }

        match self.body_policy {
            BodyPolicy::SoleUnmarked => match (body, unmarked.as_slice()) {
                (_, []) => {}
                (None, [only]) => body = Some(*only),
                (Some(marked), [unmarked, ..]) => {
                    return Err(ConfigError::AmbiguousBody {
                        method: method.name.clone(),
                        first: marked.min(*unmarked),
                        second: marked.max(*unmarked),
                    })
                }
                (None, [first, second, ..]) => {
                    return Err(ConfigError::AmbiguousBody {
                        method: method.name.clone(),
                        first: *first,
                        second: *second,
                    })
                }
            },
            BodyPolicy::ExplicitOnly => {
                if let Some(&index) = unmarked.first() {
                    return Err(ConfigError::UnboundArgument {
                        method: method.name.clone(),
                        index,
                    });
                }
            }
        }

        Ok((parameters, body))
    }

    fn expander_for(
        &self,
        method: &MethodDecl,
        param: &ParamDecl,
    ) -> Result<Arc<dyn Expander>, ConfigError> {
        if let Some(name) = &param.expander {
            return self
                .expanders
                .get(name)
                .cloned()
                .ok_or_else(|| ConfigError::UnknownExpander {
                    method: method.name.clone(),
                    expander: name.clone(),
                });
        }
        Ok(match param.shape {
            ArgShape::Scalar => Arc::new(SimpleExpander),
            ArgShape::Sequence => Arc::new(ListExpander),
            ArgShape::Map => Arc::new(MapExpander),
        })
    }
}

/// Root + interface path + method path, unless a later part is absolute, in
/// which case it replaces everything before it.
fn resolve_uri(root: &str, interface_path: &str, method_path: &str) -> String {
    if is_absolute(method_path) {
        return method_path.to_string();
    }
    if is_absolute(interface_path) {
        return format!("{interface_path}{method_path}");
    }
    format!("{root}{interface_path}{method_path}")
}
