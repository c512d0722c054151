//! Turns one [`LogRecord`] into a pending (key, document) pair.
//!
//! The builder is configured once from [`SinkConfig`]: source mode,
//! compiled key and layout templates, and the flattened mapping rules.
//! Rule-set layouts (`RenderedLayout` includes) are parsed here, at
//! construction, so template typos fail sink startup rather than at write
//! time.
//!
//! `build` never mutates the record and returns a fresh document per call.
//! A render failure is a [`BuildError`]; the sink write path logs it and
//! drops the record before it reaches the queue.

use serde_json::{Map, Value};
use uuid::Uuid;

use crate::config::mapping_rule::{ExcludeRule, IncludeRule, RuleContext};
use crate::config::{DocumentSource, SinkConfig};
use crate::constants::GENERATED_KEY_PREFIX;
use crate::error::{BuildError, ConfigError};
use crate::queue::PendingItem;
use crate::record::LogRecord;
use crate::template::Template;

/// The eight event fields mapping rules can name, in document order.
const EVENT_FIELDS: [&str; 8] = [
    "loggerName",
    "level",
    "message",
    "parameters",
    "properties",
    "exception",
    "timeStamp",
    "stackTrace",
];

/// An include rule with its layout pre-parsed when the context needs one.
#[derive(Debug, Clone)]
struct CompiledInclude {
    rule: IncludeRule,
    layout: Option<Template>,
}

/// Builds documents from records per the configured source mode and rules.
#[derive(Debug)]
pub struct DocumentBuilder {
    source: DocumentSource,
    key_template: Option<Template>,
    layout: Option<Template>,
    excludes: Vec<ExcludeRule>,
    includes: Vec<CompiledInclude>,
}

impl DocumentBuilder {
    /// Compiles templates and flattens the mapping rule-sets.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidTemplate`] when the key template, the
    /// default layout, or any `RenderedLayout` include fails to parse.
    pub fn new(config: &SinkConfig) -> Result<Self, ConfigError> {
        let compile = |template: &str| {
            Template::parse(template).map_err(|source| ConfigError::InvalidTemplate {
                template: template.to_string(),
                source,
            })
        };

        let key_template = config.key_template.as_deref().map(compile).transpose()?;
        let layout = config.layout.as_deref().map(compile).transpose()?;

        let mut includes = Vec::new();
        for rule in config.flat_includes() {
            let layout = match rule.context {
                RuleContext::RenderedLayout => Some(compile(&rule.name)?),
                _ => None,
            };
            includes.push(CompiledInclude {
                rule: rule.clone(),
                layout,
            });
        }

        Ok(DocumentBuilder {
            source: config.document_source,
            key_template,
            layout,
            excludes: config.flat_excludes().cloned().collect(),
            includes,
        })
    }

    /// Builds the pending item for one record.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError`] when a template fails to render, e.g. a
    /// parameter placeholder indexing past the record's parameter list.
    pub fn build(&self, record: &LogRecord) -> Result<PendingItem, BuildError> {
        let key = self.resolve_key(record)?;
        let document = match self.source {
            DocumentSource::None => self.default_document(record)?,
            DocumentSource::Properties => self.properties_document(record)?,
            DocumentSource::Parameters => self.parameters_document(record)?,
            DocumentSource::All => self.all_document(record)?,
        };
        Ok(PendingItem { key, document })
    }

    /// Renders the key template; an empty or whitespace result, or no
    /// template at all, synthesizes a unique key.
    fn resolve_key(&self, record: &LogRecord) -> Result<String, BuildError> {
        if let Some(template) = &self.key_template {
            let key = template.render(record)?;
            if !key.trim().is_empty() {
                return Ok(key);
            }
        }
        Ok(format!("{GENERATED_KEY_PREFIX}{}", Uuid::new_v4()))
    }

    /// `None` mode: the rendered default layout, or the raw message when
    /// no layout is configured.
    fn default_document(&self, record: &LogRecord) -> Result<Value, BuildError> {
        let text = match &self.layout {
            Some(layout) => layout.render(record)?,
            None => record.message.clone(),
        };
        Ok(Value::String(text))
    }

    fn properties_document(&self, record: &LogRecord) -> Result<Value, BuildError> {
        if record.properties.is_empty() {
            return self.default_document(record);
        }
        let mut document = self.filtered_properties(record);
        self.apply_includes(&mut document, record)?;
        Ok(Value::Object(document))
    }

    fn parameters_document(&self, record: &LogRecord) -> Result<Value, BuildError> {
        match record.parameters.as_slice() {
            [] => self.default_document(record),
            [single] => Ok(single.clone()),
            many => Ok(Value::Array(many.to_vec())),
        }
    }

    /// `All` mode: includes first, then every well-known event field that
    /// is neither excluded nor already written by an include.
    fn all_document(&self, record: &LogRecord) -> Result<Value, BuildError> {
        let mut document = Map::new();
        self.apply_includes(&mut document, record)?;

        for field in EVENT_FIELDS {
            if self.is_excluded(RuleContext::EventField, field) || document.contains_key(field) {
                continue;
            }
            if let Some(value) = self.event_field_value(field, record) {
                document.insert(field.to_string(), value);
            }
        }
        Ok(Value::Object(document))
    }

    fn apply_includes(
        &self,
        document: &mut Map<String, Value>,
        record: &LogRecord,
    ) -> Result<(), BuildError> {
        for include in &self.includes {
            let value = match include.rule.context {
                RuleContext::EventField => self.event_field_value(&include.rule.name, record),
                RuleContext::ThreadDiagnosticContext => crate::context::tdc::get(&include.rule.name),
                RuleContext::GlobalDiagnosticContext => crate::context::gdc::get(&include.rule.name),
                RuleContext::RenderedLayout => include
                    .layout
                    .as_ref()
                    .map(|layout| layout.render(record))
                    .transpose()?
                    .map(Value::String),
                // PropertyField includes carry no value of their own;
                // Parameters never survives validation.
                RuleContext::PropertyField | RuleContext::Parameters => None,
            };
            if let Some(value) = value {
                document.insert(include.rule.target_key().to_string(), value);
            }
        }
        Ok(())
    }

    /// Resolves a well-known event field by case-insensitive name.
    /// Unknown names yield `None`, absent optional fields too.
    fn event_field_value(&self, name: &str, record: &LogRecord) -> Option<Value> {
        match name.to_ascii_lowercase().as_str() {
            "loggername" => Some(Value::String(record.logger.clone())),
            "level" => Some(Value::String(record.level.to_string())),
            "message" => Some(Value::String(record.message.clone())),
            "parameters" => Some(Value::Array(record.parameters.clone())),
            "properties" => Some(Value::Object(self.filtered_properties(record))),
            "exception" => record.exception.clone().map(Value::String),
            "timestamp" => Some(Value::String(record.timestamp.to_rfc3339())),
            "stacktrace" => record.stack_trace.clone().map(Value::String),
            _ => None,
        }
    }

    /// Record properties minus any `PropertyField` excludes.
    fn filtered_properties(&self, record: &LogRecord) -> Map<String, Value> {
        record
            .properties
            .iter()
            .filter(|(name, _)| !self.is_excluded(RuleContext::PropertyField, name))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect()
    }

    fn is_excluded(&self, context: RuleContext, name: &str) -> bool {
        self.excludes
            .iter()
            .any(|rule| rule.context == context && rule.name.eq_ignore_ascii_case(name))
    }
}
