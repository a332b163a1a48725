//! Generic translation between sparse numeric-keyed wire objects and named records.
//!
//! A wire object is a JSON object whose keys are small integers rendered as
//! strings (`{"1": "ca-app-pub", "5": 0}`). Every entity has a declarative
//! `Schema` naming each key and the [`Translator`] for its value. Keys that a
//! schema does not declare are carried through untouched in both directions so
//! that platform-side schema additions survive a decode/encode cycle.

use log::warn;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Number, Value};
use thiserror::Error;

use super::schemas::{schema, SchemaKind};

/// Result type alias for translation.
pub type TranslateResult<T> = std::result::Result<T, TranslateError>;

const MICROS_PER_UNIT: i64 = 1_000_000;
const CENT_PRECISION: u32 = 2;

/// Errors raised while translating a wire value.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TranslateError {
    /// A value does not fit its declared translator.
    #[error("invalid value at {path}: {message}")]
    InvalidValue { path: String, message: String },

    /// A decoded record does not fit its typed domain shape.
    #[error("record shape mismatch: {0}")]
    Shape(String),
}

impl TranslateError {
    fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidValue {
            path: String::new(),
            message: message.into(),
        }
    }

    /// Prefix the error path with a field name.
    fn at(self, segment: &str) -> Self {
        match self {
            Self::InvalidValue { path, message } => Self::InvalidValue {
                path: if path.is_empty() {
                    segment.to_string()
                } else {
                    format!("{}.{}", segment, path)
                },
                message,
            },
            other => other,
        }
    }
}

/// Tri-state bidding status as exposed on ad units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BiddingStatus {
    Disabled,
    Enabled,
    Unsupported,
}

impl BiddingStatus {
    pub fn wire_code(self) -> i64 {
        match self {
            Self::Disabled => 1,
            Self::Enabled => 2,
            Self::Unsupported => 3,
        }
    }

    pub fn from_wire_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(Self::Disabled),
            2 => Some(Self::Enabled),
            3 => Some(Self::Unsupported),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Disabled => "DISABLED",
            Self::Enabled => "ENABLED",
            Self::Unsupported => "UNSUPPORTED",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "DISABLED" => Some(Self::Disabled),
            "ENABLED" => Some(Self::Enabled),
            "UNSUPPORTED" => Some(Self::Unsupported),
            _ => None,
        }
    }
}

/// How a single field value is converted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Translator {
    /// Raw passthrough.
    Identity,
    /// `0/1 <-> bool`.
    Boolean,
    /// Decimal micros string `<->` major units rounded to the cent.
    CurrencyMicros,
    /// Wire code `<->` [`BiddingStatus`] name.
    Bidding,
    /// Nested object described by another schema.
    Object(SchemaKind),
    /// Sequence whose elements share one translator.
    Array(&'static Translator),
}

impl Translator {
    /// Convert a wire value into its domain representation.
    pub fn decode(&self, value: &Value) -> TranslateResult<Value> {
        if value.is_null() {
            return Ok(Value::Null);
        }
        match self {
            Self::Identity => Ok(value.clone()),
            Self::Boolean => decode_boolean(value),
            Self::CurrencyMicros => decode_micros(value),
            Self::Bidding => decode_bidding(value),
            Self::Object(kind) => decode_object(*kind, value),
            Self::Array(element) => map_array(value, |item| element.decode(item)),
        }
    }

    /// Convert a domain value back into its wire representation.
    pub fn encode(&self, value: &Value) -> TranslateResult<Value> {
        if value.is_null() {
            return Ok(Value::Null);
        }
        match self {
            Self::Identity => Ok(value.clone()),
            Self::Boolean => encode_boolean(value),
            Self::CurrencyMicros => encode_micros(value),
            Self::Bidding => encode_bidding(value),
            Self::Object(kind) => encode_object(*kind, value),
            Self::Array(element) => map_array(value, |item| element.encode(item)),
        }
    }
}

/// Decode a wire object and deserialize the named record into `T`.
pub fn decode_record<T: DeserializeOwned>(kind: SchemaKind, wire: &Value) -> TranslateResult<T> {
    let named = decode_object(kind, wire)?;
    serde_json::from_value(named).map_err(|e| TranslateError::Shape(format!("{:?}: {}", kind, e)))
}

/// Serialize `record` and encode the result as a wire object.
pub fn encode_record<T: Serialize>(kind: SchemaKind, record: &T) -> TranslateResult<Value> {
    let named = serde_json::to_value(record)
        .map_err(|e| TranslateError::Shape(format!("{:?}: {}", kind, e)))?;
    encode_object(kind, &named)
}

/// Decode one wire object against its schema.
pub fn decode_object(kind: SchemaKind, wire: &Value) -> TranslateResult<Value> {
    let object = wire
        .as_object()
        .ok_or_else(|| TranslateError::invalid(format!("expected object for {:?}", kind)))?;
    let schema = schema(kind);

    let mut named = Map::with_capacity(object.len());
    for (key, value) in object {
        match schema.field_by_key(key) {
            Some(field) => {
                let decoded = field.translator.decode(value).map_err(|e| e.at(field.name))?;
                named.insert(field.name.to_string(), decoded);
            }
            None => {
                warn!(
                    "[Wire] {:?}: undeclared key '{}' preserved as-is",
                    kind, key
                );
                named.insert(key.clone(), value.clone());
            }
        }
    }
    Ok(Value::Object(named))
}

/// Encode one named record against its schema.
pub fn encode_object(kind: SchemaKind, record: &Value) -> TranslateResult<Value> {
    let object = record
        .as_object()
        .ok_or_else(|| TranslateError::invalid(format!("expected object for {:?}", kind)))?;
    let schema = schema(kind);

    let mut wire = Map::with_capacity(object.len());
    for (name, value) in object {
        match schema.field_by_name(name) {
            Some(field) => {
                let encoded = field.translator.encode(value).map_err(|e| e.at(field.name))?;
                wire.insert(field.key.to_string(), encoded);
            }
            None => {
                warn!(
                    "[Wire] {:?}: undeclared field '{}' passed through as-is",
                    kind, name
                );
                wire.insert(name.clone(), value.clone());
            }
        }
    }
    Ok(Value::Object(wire))
}

fn map_array(
    value: &Value,
    mut f: impl FnMut(&Value) -> TranslateResult<Value>,
) -> TranslateResult<Value> {
    let items = value
        .as_array()
        .ok_or_else(|| TranslateError::invalid("expected array"))?;
    items
        .iter()
        .enumerate()
        .map(|(idx, item)| f(item).map_err(|e| e.at(&idx.to_string())))
        .collect::<TranslateResult<Vec<_>>>()
        .map(Value::Array)
}

fn decode_boolean(value: &Value) -> TranslateResult<Value> {
    match value.as_i64() {
        Some(0) => Ok(Value::Bool(false)),
        Some(1) => Ok(Value::Bool(true)),
        _ => Err(TranslateError::invalid(format!(
            "expected 0 or 1, got {}",
            value
        ))),
    }
}

fn encode_boolean(value: &Value) -> TranslateResult<Value> {
    value
        .as_bool()
        .map(|flag| Value::from(i64::from(flag)))
        .ok_or_else(|| TranslateError::invalid(format!("expected bool, got {}", value)))
}

/// Round a major-unit amount to whole cents.
pub fn round_to_cents(amount: f64) -> Option<f64> {
    decimal_to_f64(Decimal::from_f64(amount)?.round_dp(CENT_PRECISION))
}

// Parsing the decimal rendering yields the nearest f64, the same value a literal produces.
fn decimal_to_f64(value: Decimal) -> Option<f64> {
    value.normalize().to_string().parse().ok()
}

// Lossy below one cent: "1234567" decodes to 1.23 and re-encodes as "1230000".
fn decode_micros(value: &Value) -> TranslateResult<Value> {
    let raw = value
        .as_str()
        .ok_or_else(|| TranslateError::invalid(format!("expected micros string, got {}", value)))?;
    let micros: Decimal = raw
        .trim()
        .parse()
        .map_err(|_| TranslateError::invalid(format!("'{}' is not a decimal", raw)))?;
    let units = decimal_to_f64((micros / Decimal::from(MICROS_PER_UNIT)).round_dp(CENT_PRECISION))
        .and_then(Number::from_f64)
        .ok_or_else(|| TranslateError::invalid(format!("'{}' is out of range", raw)))?;
    Ok(Value::Number(units))
}

fn encode_micros(value: &Value) -> TranslateResult<Value> {
    let units = value
        .as_f64()
        .and_then(Decimal::from_f64)
        .ok_or_else(|| TranslateError::invalid(format!("expected amount, got {}", value)))?;
    let micros = (units.round_dp(CENT_PRECISION) * Decimal::from(MICROS_PER_UNIT))
        .trunc()
        .to_i64()
        .ok_or_else(|| TranslateError::invalid(format!("{} is out of range", value)))?;
    Ok(Value::String(micros.to_string()))
}

fn decode_bidding(value: &Value) -> TranslateResult<Value> {
    value
        .as_i64()
        .and_then(BiddingStatus::from_wire_code)
        .map(|status| Value::String(status.as_str().to_string()))
        .ok_or_else(|| TranslateError::invalid(format!("unknown bidding code {}", value)))
}

fn encode_bidding(value: &Value) -> TranslateResult<Value> {
    value
        .as_str()
        .and_then(BiddingStatus::parse)
        .map(|status| Value::from(status.wire_code()))
        .ok_or_else(|| TranslateError::invalid(format!("unknown bidding status {}", value)))
}
