use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Declared type of a workflow parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Number,
    Email,
    Url,
    Boolean,
    Date,
    Text,
    Textarea,
    Password,
    Checkbox,
    Select,
}

impl FieldType {
    /// Parse a declared type name. Returns `None` for names the validator
    /// does not know.
    pub fn parse(name: &str) -> Option<Self> {
        let field_type = match name.trim().to_ascii_lowercase().as_str() {
            "string" => Self::String,
            "number" => Self::Number,
            "email" => Self::Email,
            "url" => Self::Url,
            "boolean" => Self::Boolean,
            "date" => Self::Date,
            "text" => Self::Text,
            "textarea" => Self::Textarea,
            "password" => Self::Password,
            "checkbox" => Self::Checkbox,
            "select" => Self::Select,
            _ => return None,
        };
        Some(field_type)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Email => "email",
            Self::Url => "url",
            Self::Boolean => "boolean",
            Self::Date => "date",
            Self::Text => "text",
            Self::Textarea => "textarea",
            Self::Password => "password",
            Self::Checkbox => "checkbox",
            Self::Select => "select",
        }
    }

    /// Types whose `min`/`max` bound the character length.
    pub fn is_textual(&self) -> bool {
        matches!(
            self,
            Self::String | Self::Text | Self::Textarea | Self::Password
        )
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-parameter validation rule as stored in a parameter catalog.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationRule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regex: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub field_type: Option<FieldType>,
}

impl ValidationRule {
    pub fn with_range(mut self, min: f64, max: f64) -> Self {
        self.min = Some(min);
        self.max = Some(max);
        self
    }

    pub fn with_regex(mut self, regex: impl Into<String>) -> Self {
        self.regex = Some(regex.into());
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(message.into());
        self
    }
}

/// One entry of a batch validation catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterConfig {
    pub name: String,
    pub declared_type: String,
    #[serde(default)]
    pub rule: Option<ValidationRule>,
    #[serde(default = "default_required")]
    pub required: bool,
}

fn default_required() -> bool {
    true
}

impl ParameterConfig {
    pub fn new(name: impl Into<String>, declared_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            declared_type: declared_type.into(),
            rule: None,
            required: true,
        }
    }

    pub fn with_rule(mut self, rule: ValidationRule) -> Self {
        self.rule = Some(rule);
        self
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }
}

/// A single rule violation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
    pub rule: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<ValidationError>,
}

impl ValidationResult {
    pub fn valid() -> Self {
        Self::from_errors(Vec::new())
    }

    pub fn from_errors(errors: Vec<ValidationError>) -> Self {
        Self {
            is_valid: errors.is_empty(),
            errors,
        }
    }

    /// Fold another result into this one.
    pub fn merge(&mut self, other: ValidationResult) {
        self.errors.extend(other.errors);
        self.is_valid = self.errors.is_empty();
    }

    /// Errors reported for one field.
    pub fn errors_for<'a>(&'a self, field: &'a str) -> impl Iterator<Item = &'a ValidationError> {
        self.errors.iter().filter(move |e| e.field == field)
    }

    pub fn summary(&self) -> String {
        self.errors
            .iter()
            .map(|e| format!("{}: {}", e.field, e.message))
            .collect::<Vec<_>>()
            .join("; ")
    }
}
