//! Conversion of runtime results into typed host values.
//!
//! A caller picks one strategy per call. The strategies differ in which raw
//! shapes they accept before handing off to serde.

use std::any::type_name;
use std::fmt;

use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

/// How a raw runtime value becomes a `T`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeStrategy {
    /// The value must be an array or object and is decoded structurally.
    Structured,
    /// The value must be a string holding serialized JSON text.
    JsonText,
    /// The value must be a scalar (string, number, bool or null).
    Primitive,
    /// The value is a raw integer or string naming an enum case.
    EnumFromPrimitive,
}

impl fmt::Display for DecodeStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DecodeStrategy::Structured => "structured",
            DecodeStrategy::JsonText => "json-text",
            DecodeStrategy::Primitive => "primitive",
            DecodeStrategy::EnumFromPrimitive => "enum-from-primitive",
        };
        f.write_str(name)
    }
}

/// A successful runtime value did not fit the requested type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("failed to decode {expected} using {strategy} strategy: {reason}")]
pub struct DecodingError {
    pub expected: &'static str,
    pub strategy: DecodeStrategy,
    pub reason: String,
}

impl DecodingError {
    fn new<T>(strategy: DecodeStrategy, reason: impl Into<String>) -> Self {
        Self {
            expected: type_name::<T>(),
            strategy,
            reason: reason.into(),
        }
    }
}

impl DecodeStrategy {
    /// Decode `raw` as `T`.
    ///
    /// A value of the wrong shape for the strategy is an error even when
    /// serde could coerce it, so a bool never decodes as a structured value.
    pub fn decode<T: DeserializeOwned>(self, raw: &Value) -> Result<T, DecodingError> {
        match self {
            DecodeStrategy::Structured => match raw {
                Value::Array(_) | Value::Object(_) => {
                    T::deserialize(raw).map_err(|e| DecodingError::new::<T>(self, e.to_string()))
                }
                other => Err(DecodingError::new::<T>(
                    self,
                    format!("expected an array or object, got {}", kind_of(other)),
                )),
            },
            DecodeStrategy::JsonText => match raw {
                Value::String(text) => serde_json::from_str(text)
                    .map_err(|e| DecodingError::new::<T>(self, e.to_string())),
                other => Err(DecodingError::new::<T>(
                    self,
                    format!("expected JSON text, got {}", kind_of(other)),
                )),
            },
            DecodeStrategy::Primitive => match raw {
                Value::Array(_) | Value::Object(_) => Err(DecodingError::new::<T>(
                    self,
                    format!("expected a scalar, got {}", kind_of(raw)),
                )),
                scalar => {
                    T::deserialize(scalar).map_err(|e| DecodingError::new::<T>(self, e.to_string()))
                }
            },
            DecodeStrategy::EnumFromPrimitive => {
                let is_raw_case = raw.is_i64() || raw.is_u64() || raw.is_string();
                if !is_raw_case {
                    return Err(DecodingError::new::<T>(
                        self,
                        format!("expected an integer or string case, got {}", kind_of(raw)),
                    ));
                }
                // Wrapped so serde sees the case as a sequence element, the
                // same way it arrives inside structured payloads.
                let wrapped = Value::Array(vec![raw.clone()]);
                let mut cases: Vec<T> = serde_json::from_value(wrapped)
                    .map_err(|e| DecodingError::new::<T>(self, e.to_string()))?;
                cases
                    .pop()
                    .ok_or_else(|| DecodingError::new::<T>(self, "no case decoded"))
            }
        }
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
