use chrono::{DateTime, NaiveDate, NaiveDateTime};
use orchcore::{
    FieldType, ParameterConfig, Parameters, ValidationError, ValidationResult, ValidationRule,
};
use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;
use url::Url;

pub const REDACTED: &str = "***REDACTED***";

const EMAIL_PATTERN: &str = r"^[^\s@]+@[^\s@]+\.[^\s@]+$";

fn email_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(EMAIL_PATTERN).expect("email pattern is valid"))
}

/// Validates caller-supplied parameter values against their declared types
/// and rules. Stateless; one instance can serve any number of callers.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParameterValidator;

impl ParameterValidator {
    pub fn new() -> Self {
        Self
    }

    /// Validate one parameter. Every violation is reported, except that a
    /// missing required value is reported alone.
    pub fn validate(
        &self,
        name: &str,
        value: Option<&Value>,
        declared_type: &str,
        rule: Option<&ValidationRule>,
        required: bool,
    ) -> ValidationResult {
        let required = rule.and_then(|r| r.required).unwrap_or(required);

        let value = match value {
            Some(v) if !is_absent(v) => v,
            other => {
                if required {
                    return ValidationResult::from_errors(vec![ValidationError {
                        field: name.to_string(),
                        message: format!("{} is required", name),
                        rule: "required".to_string(),
                        value: other.cloned(),
                    }]);
                }
                return ValidationResult::valid();
            }
        };

        let field_type = if declared_type.trim().is_empty() {
            rule.and_then(|r| r.field_type)
        } else {
            let parsed = FieldType::parse(declared_type);
            if parsed.is_none() {
                tracing::warn!("Unknown field type '{}' for {}", declared_type, name);
            }
            parsed
        };

        let mut errors = Vec::new();
        if let Some(field_type) = field_type {
            check_type(name, value, field_type, rule, &mut errors);
        }
        if let Some(rule) = rule {
            check_pattern(name, value, rule, &mut errors);
        }

        ValidationResult::from_errors(errors)
    }

    /// Validate every configured parameter and aggregate all errors.
    pub fn validate_all(&self, values: &Parameters, configs: &[ParameterConfig]) -> ValidationResult {
        let mut result = ValidationResult::valid();

        for config in configs {
            result.merge(self.validate(
                &config.name,
                values.get(&config.name),
                &config.declared_type,
                config.rule.as_ref(),
                config.required,
            ));
        }

        result
    }
}

/// Shallow copy of `values` with every sensitive key masked.
pub fn sanitize_for_logging(values: &Parameters, sensitive_keys: &[String]) -> Parameters {
    let mut sanitized = values.clone();

    for key in sensitive_keys {
        if let Some(value) = sanitized.get_mut(key) {
            *value = Value::String(REDACTED.to_string());
        }
    }

    sanitized
}

fn is_absent(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

fn error(field: &str, rule: &str, message: String, value: &Value) -> ValidationError {
    ValidationError {
        field: field.to_string(),
        message,
        rule: rule.to_string(),
        value: Some(value.clone()),
    }
}

fn type_error(field: &str, field_type: FieldType, value: &Value) -> ValidationError {
    error(
        field,
        "type",
        format!("{} must be a valid {}", field, field_type),
        value,
    )
}

fn check_type(
    field: &str,
    value: &Value,
    field_type: FieldType,
    rule: Option<&ValidationRule>,
    errors: &mut Vec<ValidationError>,
) {
    match field_type {
        FieldType::Number => match as_number(value) {
            Some(number) => {
                if let Some(rule) = rule {
                    check_range(field, value, number, rule, "", errors);
                }
            }
            None => errors.push(type_error(field, field_type, value)),
        },
        FieldType::String | FieldType::Text | FieldType::Textarea | FieldType::Password => {
            match value.as_str() {
                Some(text) => {
                    if let Some(rule) = rule {
                        let length = text.chars().count() as f64;
                        check_range(field, value, length, rule, " characters", errors);
                    }
                }
                None => errors.push(type_error(field, field_type, value)),
            }
        }
        FieldType::Boolean | FieldType::Checkbox => {
            if !value.is_boolean() {
                errors.push(type_error(field, field_type, value));
            }
        }
        FieldType::Email => {
            if !value.as_str().is_some_and(|s| email_regex().is_match(s)) {
                errors.push(type_error(field, field_type, value));
            }
        }
        FieldType::Url => {
            if !value.as_str().is_some_and(is_http_url) {
                errors.push(type_error(field, field_type, value));
            }
        }
        FieldType::Date => {
            if !is_date(value) {
                errors.push(type_error(field, field_type, value));
            }
        }
        // Options are checked by the catalog's own rules.
        FieldType::Select => {}
    }
}

fn check_range(
    field: &str,
    value: &Value,
    measured: f64,
    rule: &ValidationRule,
    unit: &str,
    errors: &mut Vec<ValidationError>,
) {
    if let Some(min) = rule.min {
        if measured < min {
            let message = rule
                .error_message
                .clone()
                .unwrap_or_else(|| format!("{} must be at least {}{}", field, min, unit));
            errors.push(error(field, "min", message, value));
        }
    }
    if let Some(max) = rule.max {
        if measured > max {
            let message = rule
                .error_message
                .clone()
                .unwrap_or_else(|| format!("{} must be no more than {}{}", field, max, unit));
            errors.push(error(field, "max", message, value));
        }
    }
}

fn check_pattern(
    field: &str,
    value: &Value,
    rule: &ValidationRule,
    errors: &mut Vec<ValidationError>,
) {
    let Some(pattern) = rule.regex.as_deref() else {
        return;
    };

    let regex = match Regex::new(pattern) {
        Ok(regex) => regex,
        Err(e) => {
            tracing::warn!("Invalid validation pattern for {}: {}", field, e);
            errors.push(error(
                field,
                "pattern",
                format!("{} has an invalid validation pattern", field),
                value,
            ));
            return;
        }
    };

    let text = match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };

    if !regex.is_match(&text) {
        let message = rule
            .error_message
            .clone()
            .unwrap_or_else(|| format!("{} does not match the required format", field));
        errors.push(error(field, "pattern", message, value));
    }
}

fn as_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    number.is_finite().then_some(number)
}

fn is_http_url(text: &str) -> bool {
    match Url::parse(text) {
        Ok(url) => matches!(url.scheme(), "http" | "https") && url.has_host(),
        Err(_) => false,
    }
}

fn is_date(value: &Value) -> bool {
    match value {
        // Epoch milliseconds
        Value::Number(n) => n
            .as_i64()
            .is_some_and(|ms| DateTime::from_timestamp_millis(ms).is_some()),
        Value::String(s) => {
            let s = s.trim();
            DateTime::parse_from_rfc3339(s).is_ok()
                || NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok()
                || NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f").is_ok()
                || NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f").is_ok()
        }
        _ => false,
    }
}
