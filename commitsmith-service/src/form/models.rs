// Form Data Models
// Field definitions, enum options and the current values a user has entered

use crate::expression::ContextValue;

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Root form definition: a message template plus the fields that fill it
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FormDefinition {
    /// Template lines, joined with '\n' at compile time
    #[serde(default)]
    pub template: TemplateSource,

    /// Field definitions, in display order
    #[serde(default, alias = "fields")]
    pub tokens: Vec<Field>,

    /// Collapse blank-line runs and strip trailing newlines
    #[serde(default = "default_true")]
    pub reduce_empty_lines: bool,
}

fn default_true() -> bool {
    true
}

impl Default for FormDefinition {
    fn default() -> Self {
        Self {
            template: TemplateSource::default(),
            tokens: Vec::new(),
            reduce_empty_lines: true,
        }
    }
}

impl FormDefinition {
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.tokens.iter().find(|f| f.name == name)
    }
}

/// A template written either as a list of lines or as a single block
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum TemplateSource {
    Lines(Vec<String>),
    Text(String),
}

impl Default for TemplateSource {
    fn default() -> Self {
        TemplateSource::Lines(Vec::new())
    }
}

impl TemplateSource {
    pub fn lines(&self) -> Vec<String> {
        match self {
            TemplateSource::Lines(lines) => lines.clone(),
            TemplateSource::Text(text) => text.split('\n').map(str::to_string).collect(),
        }
    }
}

/// Widget kind of a field
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum FieldKind {
    #[default]
    Text,
    Enum,
    Boolean,
    DynamicEnum,
}

/// One option of an enum field
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EnumOption {
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl EnumOption {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: None,
            description: None,
        }
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// The submitted value: explicit value, or the label when none is given
    pub fn effective_value(&self) -> &str {
        self.value.as_deref().unwrap_or(&self.label)
    }
}

/// Names of the fields a conditional field depends on
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum DependsOn {
    One(String),
    Many(Vec<String>),
}

impl DependsOn {
    /// Declared names, with blanks dropped
    pub fn names(&self) -> Vec<&str> {
        match self {
            DependsOn::One(name) => vec![name.as_str()],
            DependsOn::Many(names) => names.iter().map(String::as_str).collect(),
        }
        .into_iter()
        .filter(|name| !name.is_empty())
        .collect()
    }
}

/// A single form field definition
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Field {
    /// Placeholder name used as `{name}` in the template
    pub name: String,

    /// Display label
    #[serde(default)]
    pub label: String,

    /// Widget kind
    #[serde(default, rename = "type")]
    pub kind: FieldKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Static options for enum fields
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<EnumOption>,

    /// Enum allows several selections
    #[serde(default)]
    pub multiple: bool,

    /// Enum accepts free text as well as options
    #[serde(default)]
    pub combobox: bool,

    /// Joins multiple selections when substituted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub separator: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suffix: Option<String>,

    /// Value submitted when a boolean field is checked
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,

    #[serde(default)]
    pub multiline: bool,

    #[serde(default)]
    pub monospace: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lines: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_lines: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_line_length: Option<u32>,

    /// Option provider id for dynamic-enum fields
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,

    /// Fields this one depends on
    #[serde(default, alias = "linkedToken", skip_serializing_if = "Option::is_none")]
    pub depends_on: Option<DependsOn>,

    /// When-clause deciding visibility and substitution
    #[serde(
        default,
        alias = "shown",
        alias = "matchValue",
        skip_serializing_if = "Option::is_none"
    )]
    pub match_expression: Option<String>,
}

impl Field {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        let name = name.into();
        Self {
            label: name.clone(),
            name,
            kind,
            ..Default::default()
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = Some(suffix.into());
        self
    }

    pub fn with_options(mut self, options: Vec<EnumOption>) -> Self {
        self.options = options;
        self
    }

    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = Some(separator.into());
        self
    }

    pub fn depending_on(mut self, depends_on: DependsOn, expression: impl Into<String>) -> Self {
        self.depends_on = Some(depends_on);
        self.match_expression = Some(expression.into());
        self
    }

    /// Declared dependency names; empty for unconditional fields
    pub fn dependency_names(&self) -> Vec<&str> {
        self.depends_on
            .as_ref()
            .map(DependsOn::names)
            .unwrap_or_default()
    }

    pub fn is_conditional(&self) -> bool {
        !self.dependency_names().is_empty()
    }
}

/// Current value of a field
pub type FieldValue = ContextValue;

impl ContextValue {
    /// Flatten to the text substituted into a template
    pub fn raw(&self, separator: &str) -> String {
        match self {
            ContextValue::Single(s) => s.clone(),
            ContextValue::Multiple(items) => items.join(separator),
        }
    }
}

/// Raw widget input before normalization
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum RawInput {
    Text(String),
    Selection(Vec<String>),
}

/// Current values of every field, ordered by field name
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct FieldValues {
    values: BTreeMap<String, FieldValue>,
}

impl FieldValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<FieldValue>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.values.get(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<FieldValue> {
        self.values.remove(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FieldValue)> {
        self.values.iter()
    }

    /// Normalize raw widget input into field values.
    ///
    /// Text fields drop the literal `"undefined"` some widgets report for
    /// cleared inputs. Boolean fields keep the first checked value. Enum
    /// fields keep a single selection as text and several as a list.
    pub fn from_raw_input(fields: &[Field], raw: &HashMap<String, RawInput>) -> Self {
        let mut values = Self::new();

        for field in fields {
            let input = raw.get(&field.name);
            let value = match field.kind {
                FieldKind::Enum | FieldKind::DynamicEnum => match input {
                    Some(RawInput::Selection(items)) if field.multiple => {
                        FieldValue::Multiple(items.clone())
                    }
                    Some(RawInput::Selection(items)) => {
                        FieldValue::Single(items.first().cloned().unwrap_or_default())
                    }
                    Some(RawInput::Text(text)) => FieldValue::Single(text.clone()),
                    None => FieldValue::default(),
                },
                FieldKind::Text => match input {
                    Some(RawInput::Text(text)) if text != "undefined" => {
                        FieldValue::Single(text.clone())
                    }
                    Some(RawInput::Selection(items)) => FieldValue::Single(items.join("\n")),
                    _ => FieldValue::default(),
                },
                FieldKind::Boolean => match input {
                    Some(RawInput::Selection(items)) => {
                        FieldValue::Single(items.first().cloned().unwrap_or_default())
                    }
                    Some(RawInput::Text(text)) => FieldValue::Single(text.clone()),
                    None => FieldValue::default(),
                },
            };
            values.set(field.name.clone(), value);
        }

        values
    }
}

impl<K: Into<String>, V: Into<FieldValue>> FromIterator<(K, V)> for FieldValues {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut values = Self::new();
        for (name, value) in iter {
            values.set(name, value);
        }
        values
    }
}
