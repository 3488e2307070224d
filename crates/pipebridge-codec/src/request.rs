use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::error::EncodeError;

/// Key holding the action identifier.
pub const ACTION_KEY: &str = "action";
/// Key stamped by [`ActionRequest::with_timestamp`].
pub const TIMESTAMP_KEY: &str = "timestamp";

/// One user-triggered action to forward to the local service.
///
/// A JSON object whose `action` key is always a string. Every other key is
/// application-defined and passed through untouched.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ActionRequest {
    fields: Map<String, Value>,
}

impl ActionRequest {
    /// Create a request carrying only its action identifier.
    pub fn new(action: impl Into<String>) -> Self {
        let mut fields = Map::new();
        fields.insert(ACTION_KEY.to_string(), Value::String(action.into()));
        Self { fields }
    }

    /// Add or replace a field.
    ///
    /// Setting `action` to anything other than a string is ignored so the
    /// request always keeps a valid identifier.
    pub fn field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let key = key.into();
        let value = value.into();
        if key == ACTION_KEY && !value.is_string() {
            return self;
        }
        self.fields.insert(key, value);
        self
    }

    /// Stamp `timestamp` with the current Unix time in milliseconds.
    pub fn with_timestamp(self) -> Self {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        self.field(TIMESTAMP_KEY, now)
    }

    /// The action identifier.
    pub fn action(&self) -> &str {
        self.fields
            .get(ACTION_KEY)
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    /// Look up a field by key.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// All fields, including `action`.
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }
}

impl TryFrom<Value> for ActionRequest {
    type Error = EncodeError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(fields) => Self::try_from(fields),
            other => Err(EncodeError::InvalidRequest(format!(
                "expected a JSON object, got {}",
                json_type_name(&other)
            ))),
        }
    }
}

impl TryFrom<Map<String, Value>> for ActionRequest {
    type Error = EncodeError;

    fn try_from(fields: Map<String, Value>) -> Result<Self, Self::Error> {
        match fields.get(ACTION_KEY) {
            Some(Value::String(_)) => Ok(Self { fields }),
            Some(other) => Err(EncodeError::InvalidRequest(format!(
                "`action` must be a string, got {}",
                json_type_name(other)
            ))),
            None => Err(EncodeError::InvalidRequest(
                "missing `action` field".to_string(),
            )),
        }
    }
}

impl<'de> Deserialize<'de> for ActionRequest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let fields = Map::<String, Value>::deserialize(deserializer)?;
        Self::try_from(fields).map_err(serde::de::Error::custom)
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
