//! Minimal layout templates for keys, default documents, and include rules.
//!
//! A template is literal text with `${...}` placeholders:
//!
//! ```text
//! "${logger}/${level}/${property:order_id}"
//! ```
//!
//! Supported placeholders:
//!
//! | Placeholder             | Renders                                        |
//! |-------------------------|------------------------------------------------|
//! | `${logger}`             | logger name                                    |
//! | `${level}`              | lowercase level name                           |
//! | `${message}`            | rendered message                               |
//! | `${timestamp}`          | RFC 3339 timestamp                             |
//! | `${exception}`          | exception text, empty when absent              |
//! | `${stacktrace}`         | stack trace text, empty when absent            |
//! | `${tdc:NAME}`           | thread diagnostic context value                |
//! | `${gdc:NAME}`           | global diagnostic context value                |
//! | `${property:NAME}`      | record property value                          |
//! | `${param:IDX[.a.b]}`    | positional parameter, with optional dot-path   |
//!
//! Templates are parsed once at configuration time; unknown placeholders
//! are a parse error so typos fail sink startup instead of silently
//! rendering nothing. Rendering is infallible except for an out-of-range
//! parameter index, which mirrors the per-record drop behavior of the
//! write path. Missing properties and context values render empty.
//!
//! Parameter dot-paths navigate a pre-structured `serde_json::Value` with
//! case-insensitive object keys; there is no runtime type introspection.

use serde_json::Value;
use thiserror::Error;

use crate::record::LogRecord;

/// Template parse or render failure.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemplateError {
    /// A `${` was never closed by `}`.
    #[error("unclosed placeholder starting at byte {position}")]
    Unclosed { position: usize },

    /// The placeholder name is not one the engine knows.
    #[error("unknown placeholder {name:?}")]
    UnknownPlaceholder { name: String },

    /// The placeholder requires an argument (`${tdc:NAME}`) but none was given.
    #[error("placeholder {name:?} requires an argument")]
    MissingArgument { name: String },

    /// A `param` placeholder argument did not start with a numeric index.
    #[error("parameter placeholder has invalid index {argument:?}")]
    BadParameterIndex { argument: String },

    /// Render-time: the record has fewer parameters than the index requires.
    #[error("parameter index {index} out of range, record has {len} parameter(s)")]
    ParameterOutOfRange { index: usize, len: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum FieldRef {
    Logger,
    Level,
    Message,
    Timestamp,
    Exception,
    StackTrace,
    Tdc(String),
    Gdc(String),
    Property(String),
    Parameter { index: usize, path: Vec<String> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Part {
    Literal(String),
    Field(FieldRef),
}

/// A parsed template, ready to render against records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    parts: Vec<Part>,
}

impl Template {
    /// Parses a template string.
    ///
    /// # Errors
    ///
    /// Returns a [`TemplateError`] for unclosed or unknown placeholders,
    /// missing arguments, or a non-numeric parameter index.
    pub fn parse(input: &str) -> Result<Self, TemplateError> {
        let mut parts = Vec::new();
        let mut literal = String::new();
        let mut rest = input;
        let mut consumed = 0;

        while let Some(open) = rest.find("${") {
            literal.push_str(&rest[..open]);
            let after_open = &rest[open + 2..];
            let close = after_open
                .find('}')
                .ok_or(TemplateError::Unclosed {
                    position: consumed + open,
                })?;

            if !literal.is_empty() {
                parts.push(Part::Literal(std::mem::take(&mut literal)));
            }
            parts.push(Part::Field(parse_field(&after_open[..close])?));

            consumed += open + 2 + close + 1;
            rest = &after_open[close + 1..];
        }

        literal.push_str(rest);
        if !literal.is_empty() {
            parts.push(Part::Literal(literal));
        }
        Ok(Template { parts })
    }

    /// Renders the template against one record.
    ///
    /// # Errors
    ///
    /// Fails only when a `param` placeholder indexes past the record's
    /// parameter list; every other missing value renders empty.
    pub fn render(&self, record: &LogRecord) -> Result<String, TemplateError> {
        let mut out = String::new();
        for part in &self.parts {
            match part {
                Part::Literal(text) => out.push_str(text),
                Part::Field(field) => out.push_str(&render_field(field, record)?),
            }
        }
        Ok(out)
    }
}

fn parse_field(body: &str) -> Result<FieldRef, TemplateError> {
    let (name, argument) = match body.split_once(':') {
        Some((name, argument)) => (name.trim(), Some(argument.trim())),
        None => (body.trim(), None),
    };

    let require_argument = |name: &str| {
        argument
            .filter(|a| !a.is_empty())
            .map(str::to_string)
            .ok_or_else(|| TemplateError::MissingArgument {
                name: name.to_string(),
            })
    };

    match name.to_ascii_lowercase().as_str() {
        "logger" => Ok(FieldRef::Logger),
        "level" => Ok(FieldRef::Level),
        "message" => Ok(FieldRef::Message),
        "timestamp" => Ok(FieldRef::Timestamp),
        "exception" => Ok(FieldRef::Exception),
        "stacktrace" => Ok(FieldRef::StackTrace),
        "tdc" => Ok(FieldRef::Tdc(require_argument("tdc")?)),
        "gdc" => Ok(FieldRef::Gdc(require_argument("gdc")?)),
        "property" => Ok(FieldRef::Property(require_argument("property")?)),
        "param" => {
            let argument = require_argument("param")?;
            let mut segments = argument.split('.');
            let index_text = segments.next().unwrap_or_default();
            let index = index_text
                .parse::<usize>()
                .map_err(|_| TemplateError::BadParameterIndex {
                    argument: argument.clone(),
                })?;
            Ok(FieldRef::Parameter {
                index,
                path: segments.map(str::to_string).collect(),
            })
        }
        _ => Err(TemplateError::UnknownPlaceholder {
            name: name.to_string(),
        }),
    }
}

fn render_field(field: &FieldRef, record: &LogRecord) -> Result<String, TemplateError> {
    let rendered = match field {
        FieldRef::Logger => record.logger.clone(),
        FieldRef::Level => record.level.to_string(),
        FieldRef::Message => record.message.clone(),
        FieldRef::Timestamp => record.timestamp.to_rfc3339(),
        FieldRef::Exception => record.exception.clone().unwrap_or_default(),
        FieldRef::StackTrace => record.stack_trace.clone().unwrap_or_default(),
        FieldRef::Tdc(name) => crate::context::tdc::get(name)
            .as_ref()
            .map(value_to_text)
            .unwrap_or_default(),
        FieldRef::Gdc(name) => crate::context::gdc::get(name)
            .as_ref()
            .map(value_to_text)
            .unwrap_or_default(),
        FieldRef::Property(name) => record
            .properties
            .get(name)
            .map(value_to_text)
            .unwrap_or_default(),
        FieldRef::Parameter { index, path } => {
            let parameter =
                record
                    .parameters
                    .get(*index)
                    .ok_or(TemplateError::ParameterOutOfRange {
                        index: *index,
                        len: record.parameters.len(),
                    })?;
            navigate(parameter, path).map(value_to_text).unwrap_or_default()
        }
    };
    Ok(rendered)
}

/// Walks a dot-path through a pre-structured value.
///
/// Object keys match case-insensitively; array segments must parse as
/// indices. A missing step yields `None`.
pub(crate) fn navigate<'v>(value: &'v Value, path: &[String]) -> Option<&'v Value> {
    let mut current = value;
    for segment in path {
        current = match current {
            Value::Object(map) => map
                .iter()
                .find(|(key, _)| key.eq_ignore_ascii_case(segment))
                .map(|(_, v)| v)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Text form of a value: strings unquoted, everything else as JSON.
fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
