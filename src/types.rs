//! Core type definitions
//!
//! Includes the closed set of logical storage types, the declared (source-level)
//! field types they are classified from, and value coercion per logical type.

use std::fmt;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ============================================================================
// Logical storage types
// ============================================================================

/// Storage bucket a persisted field is classified into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogicalType {
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    Bool,
    String,
    DateTime,
}

impl LogicalType {
    /// Key used by dialect mapping tables
    pub fn name(self) -> &'static str {
        match self {
            Self::I8 => "i8",
            Self::I16 => "i16",
            Self::I32 => "i32",
            Self::I64 => "i64",
            Self::U8 => "u8",
            Self::U16 => "u16",
            Self::U32 => "u32",
            Self::U64 => "u64",
            Self::F32 => "f32",
            Self::F64 => "f64",
            Self::Bool => "bool",
            Self::String => "string",
            Self::DateTime => "datetime",
        }
    }

    pub fn is_integer(self) -> bool {
        self.int_bounds().is_some()
    }

    /// Bit width for integer types
    pub fn int_width(self) -> Option<u8> {
        match self {
            Self::I8 | Self::U8 => Some(8),
            Self::I16 | Self::U16 => Some(16),
            Self::I32 | Self::U32 => Some(32),
            Self::I64 | Self::U64 => Some(64),
            _ => None,
        }
    }

    fn int_bounds(self) -> Option<(i128, i128)> {
        Some(match self {
            Self::I8 => (i8::MIN.into(), i8::MAX.into()),
            Self::I16 => (i16::MIN.into(), i16::MAX.into()),
            Self::I32 => (i32::MIN.into(), i32::MAX.into()),
            Self::I64 => (i64::MIN.into(), i64::MAX.into()),
            Self::U8 => (0, u8::MAX.into()),
            Self::U16 => (0, u16::MAX.into()),
            Self::U32 => (0, u32::MAX.into()),
            Self::U64 => (0, u64::MAX.into()),
            _ => return None,
        })
    }

    /// Coerce a JSON value into the canonical representation for this type
    ///
    /// Null passes through; nullability is enforced by the schema, not the type.
    /// Strings holding numbers or booleans are accepted (common for CSV imports and
    /// for drivers that hand back text), and integer 0/1 is accepted as a boolean
    /// since SQLite stores booleans that way.
    pub fn coerce(self, value: &Value) -> Result<Value, String> {
        if value.is_null() {
            return Ok(Value::Null);
        }

        if let Some((min, max)) = self.int_bounds() {
            let parsed: Option<i128> = match value {
                Value::Number(n) => n
                    .as_i64()
                    .map(i128::from)
                    .or_else(|| n.as_u64().map(i128::from)),
                Value::String(s) => s.trim().parse::<i128>().ok(),
                _ => None,
            };
            let n = parsed.ok_or_else(|| format!("Cannot convert {} to {}", value, self.name()))?;
            if n < min || n > max {
                return Err(format!("Value {} out of range for {}", n, self.name()));
            }
            return Ok(if n < 0 {
                Value::from(n as i64)
            } else {
                Value::from(n as u64)
            });
        }

        match (self, value) {
            (Self::F32 | Self::F64, Value::Number(n)) => n
                .as_f64()
                .map(Value::from)
                .ok_or_else(|| format!("Cannot convert {} to {}", n, self.name())),
            (Self::F32 | Self::F64, Value::String(s)) => s
                .trim()
                .parse::<f64>()
                .map(Value::from)
                .map_err(|_| format!("Cannot convert '{}' to {}", s, self.name())),
            (Self::Bool, Value::Bool(b)) => Ok(Value::Bool(*b)),
            (Self::Bool, Value::Number(n)) => match n.as_i64() {
                Some(0) => Ok(Value::Bool(false)),
                Some(1) => Ok(Value::Bool(true)),
                _ => Err(format!("Cannot convert {} to bool", n)),
            },
            (Self::Bool, Value::String(s)) => match s.to_lowercase().as_str() {
                "true" | "1" | "yes" => Ok(Value::Bool(true)),
                "false" | "0" | "no" => Ok(Value::Bool(false)),
                _ => Err(format!("Cannot convert '{}' to bool", s)),
            },
            (Self::String, Value::String(s)) => Ok(Value::String(s.clone())),
            (Self::DateTime, Value::String(s)) => parse_datetime(s)
                .map(|dt| Value::String(dt.to_rfc3339()))
                .ok_or_else(|| format!("Invalid datetime format: '{}'", s)),
            _ => Err(format!(
                "Type mismatch: expected {}, got {}",
                self.name(),
                value
            )),
        }
    }
}

impl fmt::Display for LogicalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Accepts RFC 3339 and the naive `YYYY-MM-DD HH:MM:SS[.f]` form SQLite stores (read as UTC)
pub fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|naive| naive.and_utc())
}

// ============================================================================
// Declared field types
// ============================================================================

/// Type of a field as declared on a record, before classification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "lowercase")]
pub enum DeclaredType {
    /// Signed integer of the given bit width
    Int(u8),
    /// Unsigned integer of the given bit width
    Uint(u8),
    /// Floating point of the given bit width
    Float(u8),
    Bool,
    String,
    /// The date-time value type
    DateTime,
    /// Nullable wrapper around another declared type
    Optional(Box<DeclaredType>),
    /// Named nested record that is not embedded
    Record(String),
    Channel(String),
    Map(String),
    Sequence(String),
    Callable(String),
}

/// Result of classifying a declared type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Column(LogicalType),
    /// Nested helper record; not persisted and not an error
    Skip,
    Unsupported,
}

impl DeclaredType {
    pub fn classify(&self) -> Classification {
        let logical = match self {
            Self::Int(8) => LogicalType::I8,
            Self::Int(16) => LogicalType::I16,
            Self::Int(32) => LogicalType::I32,
            Self::Int(64) => LogicalType::I64,
            Self::Uint(8) => LogicalType::U8,
            Self::Uint(16) => LogicalType::U16,
            Self::Uint(32) => LogicalType::U32,
            Self::Uint(64) => LogicalType::U64,
            Self::Float(32) => LogicalType::F32,
            Self::Float(64) => LogicalType::F64,
            Self::Bool => LogicalType::Bool,
            Self::String => LogicalType::String,
            Self::DateTime => LogicalType::DateTime,
            Self::Optional(inner) => return inner.classify(),
            Self::Record(_) => return Classification::Skip,
            _ => return Classification::Unsupported,
        };
        Classification::Column(logical)
    }
}

impl fmt::Display for DeclaredType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(w) => write!(f, "int{}", w),
            Self::Uint(w) => write!(f, "uint{}", w),
            Self::Float(w) => write!(f, "float{}", w),
            Self::Bool => f.write_str("bool"),
            Self::String => f.write_str("string"),
            Self::DateTime => f.write_str("datetime"),
            Self::Optional(inner) => write!(f, "optional<{}>", inner),
            Self::Record(name) => write!(f, "record {}", name),
            Self::Channel(desc) | Self::Map(desc) | Self::Sequence(desc) | Self::Callable(desc) => {
                f.write_str(desc)
            }
        }
    }
}
