//! URI template parsing and expansion.
//!
//! # Design
//! A template is parsed once, when descriptors are built, into literal spans
//! and compiled expressions. Expansion borrows the parsed template and an
//! ordered set of bindings and returns a fresh string, so one template can be
//! expanded by any number of concurrent invocations without locking.
//!
//! Unresolved variables expand to nothing rather than failing. Percent
//! encoding is done by the expanders, never by the template.

pub mod expander;
pub mod expression;

use std::fmt;

use serde_json::Value;

use crate::error::TemplateError;

pub use expander::{Expander, ListExpander, MapExpander, SimpleExpander};
pub use expression::{Expression, ExpressionKind};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Chunk {
    Literal(String),
    Expression(Expression),
}

/// A parsed URI template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UriTemplate {
    template: String,
    chunks: Vec<Chunk>,
}

impl UriTemplate {
    pub fn parse(template: &str) -> Result<Self, TemplateError> {
        let mut chunks = Vec::new();
        let mut literal = String::new();
        let mut chars = template.char_indices();

        while let Some((offset, c)) = chars.next() {
            match c {
                '{' => {
                    let mut inner = String::new();
                    let mut closed = false;
                    for (inner_offset, c) in chars.by_ref() {
                        match c {
                            '}' => {
                                closed = true;
                                break;
                            }
                            '{' => {
                                return Err(TemplateError::Nested {
                                    template: template.to_string(),
                                    offset: inner_offset,
                                })
                            }
                            c => inner.push(c),
                        }
                    }
                    if !closed {
                        return Err(TemplateError::Unclosed {
                            template: template.to_string(),
                            offset,
                        });
                    }
                    if !literal.is_empty() {
                        chunks.push(Chunk::Literal(std::mem::take(&mut literal)));
                    }
                    chunks.push(Chunk::Expression(Expression::parse(&inner, template, offset)?));
                }
                '}' => {
                    return Err(TemplateError::UnexpectedClose {
                        template: template.to_string(),
                        offset,
                    })
                }
                c => literal.push(c),
            }
        }
        if !literal.is_empty() {
            chunks.push(Chunk::Literal(literal));
        }

        Ok(Self {
            template: template.to_string(),
            chunks,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.template
    }

    pub fn expressions(&self) -> impl Iterator<Item = &Expression> {
        self.chunks.iter().filter_map(|chunk| match chunk {
            Chunk::Expression(expr) => Some(expr),
            Chunk::Literal(_) => None,
        })
    }

    /// Every variable name referenced by the template, in order of appearance.
    pub fn variables(&self) -> impl Iterator<Item = &str> {
        self.expressions()
            .flat_map(|expr| expr.variables().iter().map(String::as_str))
    }

    pub fn expand(&self, bindings: &Bindings<'_>) -> String {
        let mut out = String::with_capacity(self.template.len());
        for chunk in &self.chunks {
            match chunk {
                Chunk::Literal(text) => out.push_str(text),
                Chunk::Expression(expr) => out.push_str(&expr.expand(|name| bindings.tokens(name))),
            }
        }
        out
    }
}

impl fmt::Display for UriTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.template)
    }
}

/// One named argument value together with the expander chosen for it.
#[derive(Debug, Clone, Copy)]
pub struct Binding<'a> {
    pub name: &'a str,
    pub value: &'a Value,
    pub expander: &'a dyn Expander,
}

/// Ordered bindings for one invocation.
#[derive(Debug, Clone, Default)]
pub struct Bindings<'a> {
    entries: Vec<Binding<'a>>,
}

impl<'a> Bindings<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: &'a str, value: &'a Value, expander: &'a dyn Expander) {
        self.entries.push(Binding {
            name,
            value,
            expander,
        });
    }

    pub fn get(&self, name: &str) -> Option<&Binding<'a>> {
        self.entries.iter().find(|b| b.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Binding<'a>> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn tokens(&self, name: &str) -> Vec<String> {
        self.get(name)
            .map(|b| b.expander.expand(b.value))
            .unwrap_or_default()
    }
}
