//! Redaction of sensitive request data and stack arguments
//!
//! Replaces secrets in headers and body fields with a fixed marker, and
//! reduces live stack-frame arguments to type or category placeholders
//! before a report leaves the process. Every function here is total.

use errtrack_core::config::{PrivacyConfig, DEFAULT_SENSITIVE_FIELDS, DEFAULT_SENSITIVE_HEADERS};
use errtrack_core::domain::{ArgValue, FrameArgs, Headers};
use serde_json::{Map, Number, Value};

/// Placeholder substituted for every redacted value.
pub const REDACTION_MARKER: &str = "[REDACTED]";

/// Placeholder for collection arguments.
pub const COLLECTION_PLACEHOLDER: &str = "[collection]";

/// Placeholder for resource handle arguments.
pub const RESOURCE_PLACEHOLDER: &str = "[resource]";

/// Sanitizes request data using a fixed set of sensitive names.
#[derive(Debug, Clone)]
pub struct Sanitizer {
    headers: Vec<String>,
    fields: Vec<String>,
}

impl Sanitizer {
    /// Creates a `Sanitizer` from the privacy configuration.
    pub fn new(config: &PrivacyConfig) -> Self {
        Self {
            headers: lowercase_all(&config.sanitize_request_headers),
            fields: lowercase_all(&config.sanitize_request_fields),
        }
    }

    /// Sensitive field substrings, lowercased.
    pub fn sensitive_fields(&self) -> &[String] {
        &self.fields
    }

    pub fn headers(&self, headers: &Headers) -> Headers {
        sanitize_headers(headers, &self.headers)
    }

    pub fn fields(&self, fields: &Map<String, Value>) -> Map<String, Value> {
        sanitize_fields(fields, &self.fields)
    }
}

impl Default for Sanitizer {
    fn default() -> Self {
        Self {
            headers: DEFAULT_SENSITIVE_HEADERS.iter().map(|h| h.to_string()).collect(),
            fields: DEFAULT_SENSITIVE_FIELDS.iter().map(|f| f.to_string()).collect(),
        }
    }
}

fn lowercase_all(names: &[String]) -> Vec<String> {
    names.iter().map(|n| n.trim().to_lowercase()).collect()
}

/// Replace the values of every header named in `sensitive` with the marker.
///
/// Matching is case-insensitive. Other headers pass through unchanged.
pub fn sanitize_headers<S: AsRef<str>>(headers: &Headers, sensitive: &[S]) -> Headers {
    let mut sanitized = headers.clone();
    for name in sensitive {
        let name = name.as_ref();
        if sanitized.contains(name) {
            sanitized.set(name, vec![REDACTION_MARKER.to_string()]);
        }
    }
    sanitized
}

/// Recursively redact body fields whose key contains a sensitive substring.
///
/// Nested objects are always descended into and keep their key. Any other
/// value is replaced by the marker when its key matches, arrays included.
/// Arrays under a non-matching key keep their scalars, and their object and
/// array elements are sanitized the same way.
pub fn sanitize_fields<S: AsRef<str>>(
    fields: &Map<String, Value>,
    sensitive: &[S],
) -> Map<String, Value> {
    fields
        .iter()
        .map(|(key, value)| {
            let sanitized = match value {
                Value::Object(nested) => Value::Object(sanitize_fields(nested, sensitive)),
                _ if is_sensitive_key(key, sensitive) => Value::String(REDACTION_MARKER.to_string()),
                Value::Array(items) => sanitize_elements(items, sensitive),
                _ => value.clone(),
            };
            (key.clone(), sanitized)
        })
        .collect()
}

fn sanitize_elements<S: AsRef<str>>(items: &[Value], sensitive: &[S]) -> Value {
    Value::Array(
        items
            .iter()
            .map(|item| match item {
                Value::Object(nested) => Value::Object(sanitize_fields(nested, sensitive)),
                Value::Array(inner) => sanitize_elements(inner, sensitive),
                scalar => scalar.clone(),
            })
            .collect(),
    )
}

/// Case-insensitive substring match of `key` against `sensitive`.
pub fn is_sensitive_key<S: AsRef<str>>(key: &str, sensitive: &[S]) -> bool {
    let key = key.to_lowercase();
    sensitive.iter().any(|s| {
        let s = s.as_ref().to_lowercase();
        !s.is_empty() && key.contains(&s)
    })
}

/// Reduce frame arguments to JSON, replacing non-scalars with placeholders.
///
/// Positional arguments become an array and named arguments an object.
pub fn sanitize_stack_args(args: &FrameArgs) -> Value {
    match args {
        FrameArgs::Positional(values) => Value::Array(values.iter().map(sanitize_arg).collect()),
        FrameArgs::Named(values) => Value::Object(
            values
                .iter()
                .map(|(name, value)| (name.clone(), sanitize_arg(value)))
                .collect(),
        ),
    }
}

fn sanitize_arg(value: &ArgValue) -> Value {
    match value {
        ArgValue::Null => Value::Null,
        ArgValue::Bool(b) => Value::Bool(*b),
        ArgValue::Int(i) => Value::Number((*i).into()),
        // NaN and infinities have no JSON form
        ArgValue::Float(f) => Number::from_f64(*f).map_or(Value::Null, Value::Number),
        ArgValue::Str(s) => Value::String(s.clone()),
        ArgValue::Object { type_name } => Value::String(type_name.clone()),
        ArgValue::Collection(_) => Value::String(COLLECTION_PLACEHOLDER.to_string()),
        ArgValue::Resource { .. } => Value::String(RESOURCE_PLACEHOLDER.to_string()),
    }
}
