//! Form schemas
//!
//! A [`Schema`] is the ordered list of questions a flow step asks. It is
//! serialized to the frontend as `data_schema` and used to validate what
//! the user submits, following voluptuous semantics:
//!
//! - keys not in the schema are rejected
//! - a missing required field takes its default, or is rejected without one
//! - a missing optional field stays missing
//!
//! The last rule matters: flows use absence of an optional field to tell
//! "left blank" apart from an explicit answer.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Schema validation errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("expected a dictionary of answers")]
    NotAnObject,

    #[error("extra keys not allowed @ data['{0}']")]
    ExtraKey(String),

    #[error("required key not provided @ data['{0}']")]
    MissingRequired(String),

    #[error("expected {expected} for dictionary value @ data['{field}']")]
    InvalidValue {
        field: String,
        expected: &'static str,
    },
}

impl SchemaError {
    /// Field the error refers to, if any
    pub fn field(&self) -> Option<&str> {
        match self {
            SchemaError::NotAnObject => None,
            SchemaError::ExtraKey(field) | SchemaError::MissingRequired(field) => Some(field),
            SchemaError::InvalidValue { field, .. } => Some(field),
        }
    }
}

/// Option in a select field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
}

impl SelectOption {
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
        }
    }
}

/// Value type of a form field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    String,
    Boolean,
    /// One of a fixed set of values
    Select(Vec<SelectOption>),
    /// `[r, g, b]` with each component in 0..=255
    ColorRgb,
}

impl FieldKind {
    fn check(&self, field: &str, value: &Value) -> Result<(), SchemaError> {
        let invalid = |expected| SchemaError::InvalidValue {
            field: field.to_string(),
            expected,
        };

        match self {
            FieldKind::String => value.is_string().then_some(()).ok_or(invalid("str")),
            FieldKind::Boolean => value.is_boolean().then_some(()).ok_or(invalid("bool")),
            FieldKind::Select(options) => {
                let chosen = value.as_str().ok_or(invalid("one of the listed options"))?;
                options
                    .iter()
                    .any(|o| o.value == chosen)
                    .then_some(())
                    .ok_or(invalid("one of the listed options"))
            }
            FieldKind::ColorRgb => {
                let valid = value.as_array().is_some_and(|rgb| {
                    rgb.len() == 3
                        && rgb
                            .iter()
                            .all(|c| c.as_u64().is_some_and(|c| c <= u64::from(u8::MAX)))
                });
                valid.then_some(()).ok_or(invalid("an RGB color"))
            }
        }
    }
}

/// One question in a form
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaField {
    pub name: String,
    pub kind: FieldKind,
    pub required: bool,
    pub default: Option<Value>,
}

/// Ordered set of form fields
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schema {
    fields: Vec<SchemaField>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a required field the user must fill in
    pub fn required(self, name: impl Into<String>, kind: FieldKind) -> Self {
        self.push(name.into(), kind, true, None)
    }

    /// Add a required field pre-filled with `default`
    pub fn required_with_default(
        self,
        name: impl Into<String>,
        kind: FieldKind,
        default: impl Into<Value>,
    ) -> Self {
        self.push(name.into(), kind, true, Some(default.into()))
    }

    /// Add a field the user may leave out
    pub fn optional(self, name: impl Into<String>, kind: FieldKind) -> Self {
        self.push(name.into(), kind, false, None)
    }

    fn push(mut self, name: String, kind: FieldKind, required: bool, default: Option<Value>) -> Self {
        self.fields.retain(|f| f.name != name);
        self.fields.push(SchemaField {
            name,
            kind,
            required,
            default,
        });
        self
    }

    pub fn fields(&self) -> &[SchemaField] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&SchemaField> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Validate submitted answers, filling defaults for missing required fields
    pub fn validate(&self, input: &Value) -> Result<Map<String, Value>, SchemaError> {
        let submitted = input.as_object().ok_or(SchemaError::NotAnObject)?;

        if let Some(extra) = submitted.keys().find(|k| self.field(k).is_none()) {
            return Err(SchemaError::ExtraKey(extra.clone()));
        }

        let mut validated = Map::new();
        for field in &self.fields {
            match submitted.get(&field.name) {
                Some(value) => {
                    field.kind.check(&field.name, value)?;
                    validated.insert(field.name.clone(), value.clone());
                }
                None if field.required => {
                    let default = field
                        .default
                        .clone()
                        .ok_or_else(|| SchemaError::MissingRequired(field.name.clone()))?;
                    validated.insert(field.name.clone(), default);
                }
                None => {}
            }
        }

        Ok(validated)
    }

    /// Serialize for the frontend
    pub fn to_form_fields(&self) -> Vec<FormField> {
        self.fields.iter().map(FormField::from).collect()
    }
}

/// Form field as sent to the frontend (`data_schema` entries)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormField {
    pub name: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub field_type: Option<String>,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    /// `[value, label]` pairs for select fields
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<(String, String)>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selector: Option<Value>,
}

impl From<&SchemaField> for FormField {
    fn from(field: &SchemaField) -> Self {
        let (field_type, options, selector) = match &field.kind {
            FieldKind::String => (Some("string".to_string()), None, None),
            FieldKind::Boolean => (Some("boolean".to_string()), None, None),
            FieldKind::Select(options) => (
                Some("select".to_string()),
                Some(
                    options
                        .iter()
                        .map(|o| (o.value.clone(), o.label.clone()))
                        .collect(),
                ),
                None,
            ),
            FieldKind::ColorRgb => (None, None, Some(serde_json::json!({ "color_rgb": {} }))),
        };

        FormField {
            name: field.name.clone(),
            field_type,
            required: field.required,
            default: field.default.clone(),
            options,
            selector,
        }
    }
}
