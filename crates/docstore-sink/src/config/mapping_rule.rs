//! Mapping rules that shape documents built from log records.
//!
//! A rule-set is a list of excludes and includes. Excludes remove fields
//! from the active context by case-insensitive exact name match; includes
//! pull a value out of their context and write it into the document,
//! optionally under a different name (`map_to`).
//!
//! # Contexts
//!
//! - `EventField` — one of the eight well-known record fields
//!   (`loggerName`, `level`, `message`, `parameters`, `properties`,
//!   `exception`, `timeStamp`, `stackTrace`). Unknown names are silently
//!   ignored at include time.
//! - `PropertyField` — the record's structured properties.
//! - `ThreadDiagnosticContext` / `GlobalDiagnosticContext` — values looked
//!   up by name in the corresponding diagnostic context.
//! - `RenderedLayout` — the include's `name` is itself a template, parsed
//!   at configuration time and rendered per record.
//! - `Parameters` — reserved and unimplemented; configuration validation
//!   rejects any rule that uses it.

use serde::Deserialize;

/// Where a mapping rule reads from (includes) or filters (excludes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleContext {
    EventField,
    PropertyField,
    ThreadDiagnosticContext,
    GlobalDiagnosticContext,
    RenderedLayout,
    /// Reserved. Rejected by [`SinkConfig::validate`](crate::config::SinkConfig::validate).
    Parameters,
}

/// Removes a field from the matching context, case-insensitively.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ExcludeRule {
    pub context: RuleContext,
    pub name: String,
}

/// Pulls a value from its context into the document.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct IncludeRule {
    pub context: RuleContext,
    pub name: String,
    /// Document key to write under; defaults to `name` when absent.
    #[serde(default)]
    pub map_to: Option<String>,
}

impl IncludeRule {
    /// The document key this include writes to.
    #[must_use]
    pub fn target_key(&self) -> &str {
        match &self.map_to {
            Some(to) if !to.trim().is_empty() => to,
            _ => &self.name,
        }
    }
}

/// One configured rule-set: excludes applied first, then includes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct MappingRuleSet {
    #[serde(default)]
    pub excludes: Vec<ExcludeRule>,
    #[serde(default)]
    pub includes: Vec<IncludeRule>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_from_snake_case_config() {
        let set: MappingRuleSet = serde_json::from_value(serde_json::json!({
            "excludes": [
                {"context": "property_field", "name": "pwd"}
            ],
            "includes": [
                {"context": "event_field", "name": "level", "map_to": "severity"},
                {"context": "global_diagnostic_context", "name": "host"}
            ]
        }))
        .expect("rule-set should deserialize");

        assert_eq!(set.excludes.len(), 1);
        assert_eq!(set.excludes[0].context, RuleContext::PropertyField);
        assert_eq!(set.includes[0].target_key(), "severity");
        assert_eq!(set.includes[1].target_key(), "host");
        assert_eq!(set.includes[1].map_to, None);
    }

    #[test]
    fn blank_map_to_falls_back_to_name() {
        let include = IncludeRule {
            context: RuleContext::EventField,
            name: "message".to_string(),
            map_to: Some("  ".to_string()),
        };
        assert_eq!(include.target_key(), "message");
    }
}
