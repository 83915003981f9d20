//! Guesses a parameter catalog for a freshly parsed workflow.
//!
//! Templated parameters carry no type information, so field types are
//! inferred from keywords in the parameter name and resolution path. The
//! result is a starting point the workload author can refine.

use orchcore::{FieldType, ParameterConfig, ParameterDescriptor, ParsedWorkflow, ValidationRule};

const PASSWORD_KEYWORDS: &[&str] = &[
    "password", "passwd", "pwd", "secret", "key", "token", "auth", "apikey", "api_key",
    "accesskey", "access_key", "privatekey", "private_key", "credential",
];
const EMAIL_KEYWORDS: &[&str] = &["email", "mail", "e-mail", "recipient", "sender"];
const URL_KEYWORDS: &[&str] = &["url", "uri", "endpoint", "link", "href", "baseurl", "base_url"];
const NUMBER_KEYWORDS: &[&str] = &[
    "count", "number", "num", "amount", "quantity", "size", "limit", "max", "min",
];
const BOOLEAN_KEYWORDS: &[&str] = &["enabled", "disabled", "active", "inactive", "flag"];
const LONG_TEXT_KEYWORDS: &[&str] = &[
    "description", "content", "body", "message", "text", "comment", "note",
];
const DATE_KEYWORDS: &[&str] = &[
    "date", "time", "timestamp", "created", "updated", "expires", "due",
];

/// Infer a field type from the descriptor's name and path. Earlier
/// categories win, so `apiKeyUrl` is a password field.
pub fn infer_field_type(descriptor: &ParameterDescriptor) -> FieldType {
    let name = descriptor.name.to_lowercase();
    let path = descriptor.resolution_path.to_lowercase();
    let matches = |keywords: &[&str]| {
        keywords
            .iter()
            .any(|k| name.contains(k) || path.contains(k))
    };

    if matches(PASSWORD_KEYWORDS) {
        FieldType::Password
    } else if matches(EMAIL_KEYWORDS) {
        FieldType::Email
    } else if matches(URL_KEYWORDS) {
        FieldType::Url
    } else if matches(NUMBER_KEYWORDS) {
        FieldType::Number
    } else if matches(BOOLEAN_KEYWORDS) {
        FieldType::Checkbox
    } else if matches(LONG_TEXT_KEYWORDS) {
        FieldType::Textarea
    } else if matches(DATE_KEYWORDS) {
        FieldType::Date
    } else {
        FieldType::Text
    }
}

/// Default rule for an inferred field type, if the type has one.
pub fn default_rule(field_type: FieldType) -> Option<ValidationRule> {
    let rule = match field_type {
        FieldType::Email => ValidationRule::default()
            .with_regex(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
            .with_message("Please enter a valid email address"),
        FieldType::Url => ValidationRule::default()
            .with_regex(r"^https?://[^\s/$.?#].[^\s]*$")
            .with_message("Please enter a valid URL starting with http:// or https://"),
        FieldType::Number => ValidationRule::default()
            .with_range(0.0, 999_999.0)
            .with_message("Please enter a number between 0 and 999999"),
        FieldType::Text | FieldType::String => ValidationRule::default()
            .with_range(1.0, 255.0)
            .with_message("Text must be between 1 and 255 characters"),
        FieldType::Textarea => ValidationRule::default()
            .with_range(1.0, 5000.0)
            .with_message("Text must be between 1 and 5000 characters"),
        FieldType::Password => ValidationRule::default()
            .with_range(8.0, 128.0)
            .with_message("Password must be between 8 and 128 characters"),
        _ => return None,
    };
    Some(rule)
}

/// Human-readable label: `apiBaseUrl` and `api_base_url` both become
/// "Api Base Url".
pub fn display_label(name: &str) -> String {
    let mut spaced = String::with_capacity(name.len() + 4);
    for c in name.chars() {
        if c.is_uppercase() {
            spaced.push(' ');
        }
        spaced.push(if c == '_' || c == '-' { ' ' } else { c });
    }

    spaced
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// One catalog entry per distinct parameter name, in descriptor order.
pub fn catalog(workflow: &ParsedWorkflow) -> Vec<ParameterConfig> {
    let mut configs: Vec<ParameterConfig> = Vec::new();

    for descriptor in workflow.parameters() {
        if configs.iter().any(|c| c.name == descriptor.name) {
            continue;
        }
        let field_type = infer_field_type(descriptor);
        configs.push(ParameterConfig {
            name: descriptor.name.clone(),
            declared_type: field_type.to_string(),
            rule: default_rule(field_type),
            required: descriptor.required,
        });
    }

    configs
}

/// Names of parameters inferred to hold secrets.
pub fn sensitive_keys(workflow: &ParsedWorkflow) -> Vec<String> {
    let mut keys: Vec<String> = Vec::new();
    for descriptor in workflow.parameters() {
        if infer_field_type(descriptor) == FieldType::Password && !keys.contains(&descriptor.name) {
            keys.push(descriptor.name.clone());
        }
    }
    keys
}
