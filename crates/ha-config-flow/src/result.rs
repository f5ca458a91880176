//! Step outcomes and the flow result wire shape

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

use crate::schema::{FormField, Schema};

/// Kind of flow result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowResultType {
    Form,
    CreateEntry,
    Abort,
}

/// A form to show the user
#[derive(Debug, Clone, PartialEq)]
pub struct FormStep {
    pub step_id: String,
    pub schema: Schema,
    /// Field name (or `base`) -> error key
    pub errors: HashMap<String, String>,
    pub description_placeholders: HashMap<String, String>,
    /// Whether submitting this form can finish the flow
    pub last_step: Option<bool>,
}

impl FormStep {
    pub fn new(step_id: impl Into<String>, schema: Schema) -> Self {
        Self {
            step_id: step_id.into(),
            schema,
            errors: HashMap::new(),
            description_placeholders: HashMap::new(),
            last_step: None,
        }
    }

    pub fn with_errors(mut self, errors: HashMap<String, String>) -> Self {
        self.errors = errors;
        self
    }

    pub fn with_placeholder(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.description_placeholders.insert(key.into(), value.into());
        self
    }

    pub fn last_step(mut self, last_step: bool) -> Self {
        self.last_step = Some(last_step);
        self
    }
}

/// What a flow step decided
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    /// Ask (or re-ask) the user something
    Form(FormStep),
    /// Flow is done; persist an entry
    CreateEntry {
        title: String,
        data: Map<String, Value>,
    },
    /// Flow is done without an entry
    Abort { reason: String },
}

impl StepOutcome {
    pub fn create_entry(title: impl Into<String>, data: Map<String, Value>) -> Self {
        StepOutcome::CreateEntry {
            title: title.into(),
            data,
        }
    }

    pub fn abort(reason: impl Into<String>) -> Self {
        StepOutcome::Abort {
            reason: reason.into(),
        }
    }

    pub fn is_finished(&self) -> bool {
        !matches!(self, StepOutcome::Form(_))
    }
}

impl From<FormStep> for StepOutcome {
    fn from(form: FormStep) -> Self {
        StepOutcome::Form(form)
    }
}

/// Result of a config flow step as sent to the frontend
#[derive(Debug, Clone, Serialize)]
pub struct FlowResult {
    pub flow_id: String,
    /// Handler (integration domain)
    pub handler: String,
    #[serde(rename = "type")]
    pub result_type: FlowResultType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step_id: Option<String>,
    /// Always present, empty if no schema
    pub data_schema: Vec<FormField>,
    /// Always present, null if none
    pub errors: Option<HashMap<String, String>>,
    /// Always present, null if none
    pub description_placeholders: Option<HashMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minor_version: Option<u32>,
    /// The created config entry (create_entry only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    pub last_step: Option<bool>,
    pub preview: Option<String>,
}

impl FlowResult {
    fn base(flow_id: &str, handler: &str, result_type: FlowResultType) -> Self {
        Self {
            flow_id: flow_id.to_string(),
            handler: handler.to_string(),
            result_type,
            step_id: None,
            data_schema: Vec::new(),
            errors: None,
            description_placeholders: None,
            title: None,
            reason: None,
            version: None,
            minor_version: None,
            result: None,
            last_step: None,
            preview: None,
        }
    }

    pub fn form(flow_id: &str, handler: &str, form: &FormStep) -> Self {
        let non_empty = |map: &HashMap<String, String>| (!map.is_empty()).then(|| map.clone());
        Self {
            step_id: Some(form.step_id.clone()),
            data_schema: form.schema.to_form_fields(),
            errors: non_empty(&form.errors),
            description_placeholders: non_empty(&form.description_placeholders),
            last_step: form.last_step,
            ..Self::base(flow_id, handler, FlowResultType::Form)
        }
    }

    pub fn create_entry(
        flow_id: &str,
        handler: &str,
        title: &str,
        version: u32,
        minor_version: u32,
        entry: Value,
    ) -> Self {
        Self {
            title: Some(title.to_string()),
            version: Some(version),
            minor_version: Some(minor_version),
            result: Some(entry),
            ..Self::base(flow_id, handler, FlowResultType::CreateEntry)
        }
    }

    pub fn abort(flow_id: &str, handler: &str, reason: &str) -> Self {
        Self {
            reason: Some(reason.to_string()),
            ..Self::base(flow_id, handler, FlowResultType::Abort)
        }
    }
}
