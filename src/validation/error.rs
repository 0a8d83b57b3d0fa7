//! Validation failures
//!
//! Every variant carries the concrete field path plus whatever the caller needs
//! to build an actionable message (allowed set, what was actually found).

/// A local, synchronous validation failure. Never retried, never sent over the wire.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Wrong number of members set in an exclusive group or single-key map
    #[error("{}", describe_exclusive(.label, .path, .fields, .set, .required))]
    Exclusive {
        label: String,
        path: String,
        fields: Vec<String>,
        set: Vec<String>,
        required: bool,
    },

    /// Single-key map whose key is not one of the recognized tags
    #[error("unknown {label} '{tag}' at '{path}', allowed: {allowed:?}")]
    UnknownTag {
        label: String,
        path: String,
        tag: String,
        allowed: Vec<String>,
    },

    /// Discriminated field that is not a map at all
    #[error("{label} at '{path}' must be a single-key map, got {actual}")]
    NotATaggedMap {
        label: String,
        path: String,
        actual: String,
    },

    /// Inner tag not legal for the chosen outer tag
    #[error("illegal {outer_label}/{inner_label} combination '{outer}' -> '{inner}' at '{path}', allowed for '{outer}': {allowed:?}")]
    IllegalCombination {
        outer_label: String,
        inner_label: String,
        path: String,
        outer: String,
        inner: String,
        allowed: Vec<String>,
    },

    #[error("required field '{path}' is missing")]
    MissingField { path: String },

    #[error("field '{field}' is not permitted in {schema}")]
    UnknownField { schema: String, field: String },

    #[error("{schema} payload must be a JSON object, got {actual}")]
    NotAnObject { schema: String, actual: String },

    #[error("max_limit must be a positive integer, got {requested}")]
    InvalidLimit { requested: i64 },

    #[error("'{value}' is not a valid object identifier")]
    InvalidIdentifier { value: String },

    #[error("unknown resource type '{key}'")]
    UnknownResource { key: String },

    #[error("response is missing the '{key}' collection")]
    MissingCollection { key: String },

    #[error("payload does not match {schema}: {message}")]
    Decode { schema: String, message: String },
}

impl ValidationError {
    /// Field path the failure points at, when it has one
    pub fn path(&self) -> Option<&str> {
        match self {
            Self::Exclusive { path, .. }
            | Self::UnknownTag { path, .. }
            | Self::NotATaggedMap { path, .. }
            | Self::IllegalCombination { path, .. }
            | Self::MissingField { path } => Some(path.as_str()),
            Self::UnknownField { field, .. } => Some(field.as_str()),
            _ => None,
        }
    }
}

fn describe_exclusive(
    label: &str,
    path: &str,
    fields: &[String],
    set: &[String],
    required: &bool,
) -> String {
    let quantifier = if *required { "exactly one" } else { "at most one" };
    let location = if path.is_empty() {
        String::new()
    } else {
        format!(" at '{}'", path)
    };
    format!(
        "{} {} must be set{} (allowed: {:?}), found {}: {:?}",
        quantifier,
        label,
        location,
        fields,
        set.len(),
        set
    )
}

/// Short JSON type name for error messages
pub(crate) fn json_type(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
    .to_string()
}
