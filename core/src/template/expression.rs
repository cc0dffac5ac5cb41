//! Template expressions: `{a,b}` (simple) and `{/a,b}` (path segment).

use crate::error::TemplateError;

/// The closed set of expression operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpressionKind {
    /// Comma-joined, no prefix.
    Simple,
    /// Slash-prefixed, slash-joined.
    PathSegment,
}

impl ExpressionKind {
    pub fn prefix(&self) -> &'static str {
        match self {
            ExpressionKind::Simple => "",
            ExpressionKind::PathSegment => "/",
        }
    }

    pub fn separator(&self) -> &'static str {
        match self {
            ExpressionKind::Simple => ",",
            ExpressionKind::PathSegment => "/",
        }
    }
}

/// A compiled `{...}` fragment naming one or more variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expression {
    kind: ExpressionKind,
    variables: Vec<String>,
}

impl Expression {
    /// Compile the text between the braces. `offset` is the position of the
    /// opening brace, used for error reporting only.
    pub(crate) fn parse(inner: &str, template: &str, offset: usize) -> Result<Self, TemplateError> {
        let (kind, names) = match inner.chars().next() {
            None => {
                return Err(TemplateError::EmptyExpression {
                    template: template.to_string(),
                    offset,
                })
            }
            Some('/') => (ExpressionKind::PathSegment, &inner[1..]),
            Some(c) if is_variable_char(c) => (ExpressionKind::Simple, inner),
            Some(operator) => {
                return Err(TemplateError::UnsupportedOperator {
                    template: template.to_string(),
                    offset,
                    operator,
                })
            }
        };

        if names.is_empty() {
            return Err(TemplateError::EmptyExpression {
                template: template.to_string(),
                offset,
            });
        }

        let mut variables = Vec::new();
        for name in names.split(',') {
            if name.is_empty() || !name.chars().all(is_variable_char) {
                return Err(TemplateError::InvalidVariable {
                    template: template.to_string(),
                    offset,
                    name: name.to_string(),
                });
            }
            variables.push(name.to_string());
        }

        Ok(Self { kind, variables })
    }

    pub fn kind(&self) -> ExpressionKind {
        self.kind
    }

    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    /// Expand against a token source. Variables the source cannot resolve
    /// contribute nothing; an expression with no tokens at all contributes
    /// nothing, not even its prefix.
    pub fn expand<F>(&self, mut tokens_for: F) -> String
    where
        F: FnMut(&str) -> Vec<String>,
    {
        let tokens: Vec<String> = self
            .variables
            .iter()
            .flat_map(|name| tokens_for(name))
            .collect();
        if tokens.is_empty() {
            return String::new();
        }
        let mut out = String::from(self.kind.prefix());
        out.push_str(&tokens.join(self.kind.separator()));
        out
    }
}

fn is_variable_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '.'
}
