//! `{{$name}}` prompt templates.
//!
//! A template is parsed once into literal and variable segments and then
//! rendered against fresh [`Bindings`] every turn. Substituted values are
//! copied verbatim and never scanned for placeholders again.

use std::fmt;

use chatloom_core::ChatError;

use crate::bindings::Bindings;

/// Chat prompt: the running transcript followed by the new user line and an
/// open bot line for the model to complete.
pub const DEFAULT_CHAT_TEMPLATE: &str = "{{$history}}\nUser: {{$userInput}}\nChatBot:";

const OPEN: &str = "{{";
const CLOSE: &str = "}}";

/// One piece of a parsed template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    Variable(String),
}

/// A parsed prompt template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    source: String,
    segments: Vec<Segment>,
}

impl PromptTemplate {
    /// Parse `source` into segments.
    ///
    /// Only `{{$name}}` blocks (whitespace allowed inside the braces) are
    /// variables. Any other `{{ ... }}` block, or an unterminated `{{`, is
    /// kept as literal text.
    pub fn parse(source: impl Into<String>) -> Self {
        let source = source.into();
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut rest = source.as_str();

        while let Some(start) = rest.find(OPEN) {
            literal.push_str(&rest[..start]);
            let body = &rest[start + OPEN.len()..];

            let Some(end) = body.find(CLOSE) else {
                literal.push_str(&rest[start..]);
                rest = "";
                break;
            };

            // A nested opener before the closer restarts the scan there.
            if let Some(nested) = body[..end].find(OPEN) {
                literal.push_str(&rest[start..start + OPEN.len() + nested]);
                rest = &body[nested..];
                continue;
            }

            match variable_name(&body[..end]) {
                Some(name) => {
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(Segment::Variable(name.to_string()));
                }
                None => literal.push_str(&rest[start..start + OPEN.len() + end + CLOSE.len()]),
            }
            rest = &body[end + CLOSE.len()..];
        }

        literal.push_str(rest);
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Self { source, segments }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Variable names referenced by the template, in first-appearance order.
    pub fn variables(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for segment in &self.segments {
            if let Segment::Variable(name) = segment {
                if !names.contains(&name.as_str()) {
                    names.push(name);
                }
            }
        }
        names
    }

    /// Fail with [`ChatError::UnboundVariable`] for the first referenced name
    /// missing from `bindings`.
    pub fn check(&self, bindings: &Bindings) -> Result<(), ChatError> {
        match self.variables().into_iter().find(|name| !bindings.contains(name)) {
            Some(name) => Err(ChatError::UnboundVariable {
                name: name.to_string(),
            }),
            None => Ok(()),
        }
    }

    /// Substitute every variable segment from `bindings`.
    pub fn render(&self, bindings: &Bindings) -> Result<String, ChatError> {
        let mut out = String::with_capacity(self.source.len());
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Variable(name) => {
                    let value = bindings.get(name).ok_or_else(|| ChatError::UnboundVariable {
                        name: name.clone(),
                    })?;
                    out.push_str(value);
                }
            }
        }
        Ok(out)
    }
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self::parse(DEFAULT_CHAT_TEMPLATE)
    }
}

impl fmt::Display for PromptTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

fn variable_name(block: &str) -> Option<&str> {
    let name = block.trim().strip_prefix('$')?;
    if !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        Some(name)
    } else {
        None
    }
}
