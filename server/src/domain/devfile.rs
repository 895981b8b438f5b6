//! Devfile document model
//!
//! A devfile is kept as the generic YAML tree it was parsed from. Stages of the
//! create pipeline read and rewrite it through the helpers here instead of
//! binding it to a fixed schema, so unknown or unsupported keys survive long
//! enough to be reported by validation.

use serde_yaml::{Mapping, Number, Value};

use crate::error::Result;

/// Attribute marking the component the editor is injected into
pub const INJECT_EDITOR_ATTRIBUTE: &str = "gl/inject-editor";

/// Component keys that select the component type
pub const COMPONENT_TYPES: [&str; 7] = [
    "container",
    "kubernetes",
    "openshift",
    "volume",
    "image",
    "plugin",
    "custom",
];

/// Parsed devfile, an ordered map of YAML values
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DevfileDocument(Mapping);

impl DevfileDocument {
    /// Parse YAML text; the root must be a mapping
    pub fn parse(yaml: &str) -> std::result::Result<Self, serde_yaml::Error> {
        serde_yaml::from_str::<Mapping>(yaml).map(Self)
    }

    pub fn from_mapping(mapping: Mapping) -> Self {
        Self(mapping)
    }

    pub fn as_mapping(&self) -> &Mapping {
        &self.0
    }

    /// Serialize back to YAML text
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(&self.0)?)
    }

    /// Value stored under a top-level key; an explicit `null` counts as absent
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key).filter(|value| !value.is_null())
    }

    /// Whether a top-level key holds a value other than `null`/`false`
    pub fn is_set(&self, key: &str) -> bool {
        self.get(key).map(is_truthy).unwrap_or(false)
    }

    /// The component list, empty when absent or malformed
    pub fn components(&self) -> &[Value] {
        self.sequence(COMPONENTS)
    }

    /// The command list, empty when absent or malformed
    pub fn commands(&self) -> &[Value] {
        self.sequence(COMMANDS)
    }

    pub fn components_mut(&mut self) -> &mut Vec<Value> {
        self.sequence_mut(COMPONENTS)
    }

    pub fn commands_mut(&mut self) -> &mut Vec<Value> {
        self.sequence_mut(COMMANDS)
    }

    /// The `events.preStart` list, created when missing
    pub fn pre_start_events_mut(&mut self) -> &mut Vec<Value> {
        let events = self
            .0
            .entry(Value::from(EVENTS))
            .or_insert(Value::Null);
        let events = ensure_mapping(events);
        let pre_start = events
            .entry(Value::from(PRE_START))
            .or_insert(Value::Null);
        ensure_sequence(pre_start)
    }

    fn sequence(&self, key: &str) -> &[Value] {
        self.get(key)
            .and_then(Value::as_sequence)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    fn sequence_mut(&mut self, key: &str) -> &mut Vec<Value> {
        let value = self.0.entry(Value::from(key)).or_insert(Value::Null);
        ensure_sequence(value)
    }
}

pub const COMPONENTS: &str = "components";
pub const COMMANDS: &str = "commands";
pub const EVENTS: &str = "events";
pub const PRE_START: &str = "preStart";

/// Ruby-style truthiness: everything except `null` and `false`
pub fn is_truthy(value: &Value) -> bool {
    !matches!(value, Value::Null | Value::Bool(false))
}

/// Look up a nested value through mapping keys
pub fn dig<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter()
        .try_fold(value, |current, key| current.get(*key))
        .filter(|value| !value.is_null())
}

/// Render a scalar for use in diagnostics
pub fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Null => String::new(),
        other => serde_yaml::to_string(other)
            .map(|s| s.trim_end().to_string())
            .unwrap_or_default(),
    }
}

/// Build a mapping value from string keys
pub fn map<I, K>(entries: I) -> Value
where
    I: IntoIterator<Item = (K, Value)>,
    K: Into<String>,
{
    Value::Mapping(
        entries
            .into_iter()
            .map(|(key, value)| (Value::String(key.into()), value))
            .collect(),
    )
}

pub fn string(value: impl Into<String>) -> Value {
    Value::String(value.into())
}

pub fn number(value: u64) -> Value {
    Value::Number(Number::from(value))
}

pub fn strings<I, S>(values: I) -> Value
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    Value::Sequence(values.into_iter().map(string).collect())
}

/// Replace a non-mapping value with an empty mapping and borrow it
pub fn ensure_mapping(value: &mut Value) -> &mut Mapping {
    if !value.is_mapping() {
        *value = Value::Mapping(Mapping::new());
    }
    match value {
        Value::Mapping(mapping) => mapping,
        _ => unreachable!("value was replaced with a mapping"),
    }
}

/// Replace a non-sequence value with an empty sequence and borrow it
pub fn ensure_sequence(value: &mut Value) -> &mut Vec<Value> {
    if !value.is_sequence() {
        *value = Value::Sequence(Vec::new());
    }
    match value {
        Value::Sequence(sequence) => sequence,
        _ => unreachable!("value was replaced with a sequence"),
    }
}

/// Borrow the list stored under `key` in a mapping value, creating it when missing
pub fn sequence_entry<'a>(value: &'a mut Value, key: &str) -> &'a mut Vec<Value> {
    let mapping = ensure_mapping(value);
    let entry = mapping.entry(Value::from(key)).or_insert(Value::Null);
    ensure_sequence(entry)
}
