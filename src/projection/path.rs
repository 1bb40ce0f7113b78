use serde_json::Value;

use super::error::ConfigurationError;

/// A validated dot-delimited field path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPath {
    raw: String,
}

impl FieldPath {
    pub fn parse(raw: &str) -> Result<Self, ConfigurationError> {
        if raw.is_empty() || raw.split('.').any(str::is_empty) {
            return Err(ConfigurationError::InvalidPath(raw.to_string()));
        }
        Ok(Self { raw: raw.to_string() })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// First segment (`child` in `child.subeditable`)
    pub fn first(&self) -> &str {
        self.raw.split('.').next().unwrap_or(&self.raw)
    }

    /// Everything after the first dot
    pub fn rest(&self) -> Option<&str> {
        self.raw.split_once('.').map(|(_, rest)| rest)
    }
}

/// Look up a field path in an input object.
///
/// Two strategies, in order:
/// 1. a flat key equal to the whole path (`{"complex.subdoc": "v"}`), used
///    when it holds a non-object value;
/// 2. nested objects, one per segment (`{"complex": {"subdoc": "v"}}`).
///
/// A missing or null intermediate segment yields `None`.
pub fn resolve<'a>(path: &str, input: &'a Value) -> Option<&'a Value> {
    let object = input.as_object()?;

    if let Some(value) = object.get(path) {
        if !value.is_object() {
            return Some(value);
        }
    }

    let mut current = input;
    for segment in path.split('.') {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            _ => return None,
        };
    }
    Some(current)
}
