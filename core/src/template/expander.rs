//! Expanders turn one bound argument value into substitution tokens.
//!
//! # Design
//! An expander only produces tokens; how tokens are prefixed and joined is
//! decided by the owning `Expression`. Every token leaves here already
//! percent-encoded, so expressions can join them without further escaping.
//! An empty token list means "undefined" and collapses to nothing.

use std::fmt;

use serde_json::Value;

/// Converts a bound value into percent-encoded substitution tokens.
pub trait Expander: Send + Sync + fmt::Debug {
    fn expand(&self, value: &Value) -> Vec<String>;
}

/// One scalar, one token.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimpleExpander;

/// N sequence elements, N tokens.
#[derive(Debug, Clone, Copy, Default)]
pub struct ListExpander;

/// M map entries, M `key=value` tokens.
#[derive(Debug, Clone, Copy, Default)]
pub struct MapExpander;

impl Expander for SimpleExpander {
    fn expand(&self, value: &Value) -> Vec<String> {
        scalar_text(value).map(|text| encode(&text)).into_iter().collect()
    }
}

impl Expander for ListExpander {
    fn expand(&self, value: &Value) -> Vec<String> {
        match value {
            Value::Array(items) => items
                .iter()
                .filter_map(scalar_text)
                .map(|text| encode(&text))
                .collect(),
            other => SimpleExpander.expand(other),
        }
    }
}

impl Expander for MapExpander {
    fn expand(&self, value: &Value) -> Vec<String> {
        match value {
            Value::Object(entries) => entries
                .iter()
                .filter_map(|(key, value)| {
                    scalar_text(value).map(|text| format!("{}={}", encode(key), encode(&text)))
                })
                .collect(),
            other => SimpleExpander.expand(other),
        }
    }
}

/// Text form of a value. `null` is undefined; compound values fall back to
/// their JSON text.
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        compound => Some(compound.to_string()),
    }
}

fn encode(text: &str) -> String {
    urlencoding::encode(text).into_owned()
}
