//! The validated cover letter record. The renderer accepts nothing else.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

/// local@domain, where the domain has at least one dot and no empty labels.
static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?)+$",
    )
    .expect("email regex is valid")
});

/// A single field that failed validation.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{field}: {message}")]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Structured cover letter data.
///
/// Fields are private: a `LetterRecord` only exists after `from_object` has checked
/// every invariant, and nothing may change it afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LetterRecord {
    file_name: Option<String>,
    your_name: String,
    your_address: String,
    your_email: String,
    your_phone: String,
    employer_name: String,
    company_name: String,
    company_address: String,
    position_title: String,
    body_paragraphs: Vec<String>,
}

impl LetterRecord {
    /// Validates a JSON value. Anything but an object is rejected as a whole.
    pub fn from_value(value: &Value) -> Result<Self, FieldError> {
        match value.as_object() {
            Some(obj) => Self::from_object(obj),
            None => Err(FieldError::new("body", "expected a JSON object")),
        }
    }

    /// Validates a JSON object field by field, in declaration order.
    /// String values are copied untouched; only `file_name` is sanitized.
    pub fn from_object(obj: &Map<String, Value>) -> Result<Self, FieldError> {
        let file_name = optional_string(obj, "file_name")?.map(|name| sanitize_file_name(&name));
        let your_name = required_string(obj, "your_name")?;
        let your_address = required_string(obj, "your_address")?;
        let your_email = required_string(obj, "your_email")?;
        if !is_valid_email(&your_email) {
            return Err(FieldError::new(
                "your_email",
                format!("'{your_email}' is not a valid email address"),
            ));
        }
        let your_phone = required_string(obj, "your_phone")?;
        let employer_name = required_string(obj, "employer_name")?;
        let company_name = required_string(obj, "company_name")?;
        let company_address = required_string(obj, "company_address")?;
        let position_title = required_string(obj, "position_title")?;
        let body_paragraphs = paragraphs(obj, "body_paragraphs")?;

        Ok(Self {
            file_name,
            your_name,
            your_address,
            your_email,
            your_phone,
            employer_name,
            company_name,
            company_address,
            position_title,
            body_paragraphs,
        })
    }

    pub fn file_name(&self) -> Option<&str> {
        self.file_name.as_deref()
    }

    pub fn your_name(&self) -> &str {
        &self.your_name
    }

    pub fn your_address(&self) -> &str {
        &self.your_address
    }

    pub fn your_email(&self) -> &str {
        &self.your_email
    }

    pub fn your_phone(&self) -> &str {
        &self.your_phone
    }

    pub fn employer_name(&self) -> &str {
        &self.employer_name
    }

    pub fn company_name(&self) -> &str {
        &self.company_name
    }

    pub fn company_address(&self) -> &str {
        &self.company_address
    }

    pub fn position_title(&self) -> &str {
        &self.position_title
    }

    pub fn body_paragraphs(&self) -> &[String] {
        &self.body_paragraphs
    }
}

/// Makes a name safe as a single path component: spaces, `/` and `\` become `_`.
pub fn sanitize_file_name(name: &str) -> String {
    name.replace([' ', '/', '\\'], "_")
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

fn required_string(obj: &Map<String, Value>, field: &'static str) -> Result<String, FieldError> {
    match obj.get(field) {
        None | Some(Value::Null) => Err(FieldError::new(field, "field required")),
        Some(Value::String(s)) if s.trim().is_empty() => {
            Err(FieldError::new(field, "must not be empty"))
        }
        Some(Value::String(s)) => Ok(s.clone()),
        Some(other) => Err(FieldError::new(
            field,
            format!("expected a string, found {}", json_type_name(other)),
        )),
    }
}

fn optional_string(
    obj: &Map<String, Value>,
    field: &'static str,
) -> Result<Option<String>, FieldError> {
    match obj.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(FieldError::new(
            field,
            format!("expected a string, found {}", json_type_name(other)),
        )),
    }
}

fn paragraphs(obj: &Map<String, Value>, field: &'static str) -> Result<Vec<String>, FieldError> {
    let items = match obj.get(field) {
        None | Some(Value::Null) => return Err(FieldError::new(field, "field required")),
        Some(Value::Array(items)) => items,
        Some(other) => {
            return Err(FieldError::new(
                field,
                format!("expected an array, found {}", json_type_name(other)),
            ))
        }
    };

    if items.is_empty() {
        return Err(FieldError::new(field, "must contain at least one paragraph"));
    }

    items
        .iter()
        .enumerate()
        .map(|(i, item)| match item {
            Value::String(s) if !s.trim().is_empty() => Ok(s.clone()),
            Value::String(_) => Err(FieldError::new(field, format!("paragraph {i} is empty"))),
            other => Err(FieldError::new(
                field,
                format!(
                    "paragraph {i}: expected a string, found {}",
                    json_type_name(other)
                ),
            )),
        })
        .collect()
}

/// JSON type name used in shape and validation messages.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
