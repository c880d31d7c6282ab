//! Database data types and values.
//!
//! This module defines the canonical type system and value representation
//! for the engine. [`Type`] describes a declared column type and [`Value`]
//! carries a single typed field with serialization support.

use std::cmp::Ordering;
use std::fmt;

use chrono::{Datelike, NaiveDate};

/// Date rendering template used everywhere a DATE becomes text.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Errors from value serialization/deserialization.
#[derive(Debug)]
pub enum SerializationError {
    /// Buffer too small for the operation.
    BufferTooSmall {
        /// Bytes required.
        required: usize,
        /// Bytes available.
        available: usize,
    },
    /// Invalid data format.
    InvalidFormat(String),
}

impl fmt::Display for SerializationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SerializationError::BufferTooSmall {
                required,
                available,
            } => {
                write!(
                    f,
                    "buffer too small: need {} bytes, have {}",
                    required, available
                )
            }
            SerializationError::InvalidFormat(msg) => {
                write!(f, "invalid format: {}", msg)
            }
        }
    }
}

impl std::error::Error for SerializationError {}

/// Returns `SerializationError::BufferTooSmall` if the buffer is too small.
#[macro_export]
macro_rules! ensure_buf_len {
    ($buf:expr, $required:expr) => {
        if $buf.len() < $required {
            return Err($crate::datum::SerializationError::BufferTooSmall {
                required: $required,
                available: $buf.len(),
            });
        }
    };
}

/// Declared column type.
///
/// String types carry their declared capacity; a value is rejected at
/// insert/update time when it does not fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Type {
    /// 8-byte signed integer.
    Int,
    /// Double-precision floating point.
    Float,
    /// Boolean.
    Bool,
    /// Calendar date (no time component).
    Date,
    /// Fixed-capacity string.
    Char(u16),
    /// Variable-length string with limit.
    Varchar(u16),
}

impl Type {
    /// Returns true for INT and FLOAT.
    pub fn is_numeric(self) -> bool {
        matches!(self, Type::Int | Type::Float)
    }

    /// Returns the declared capacity for string types.
    pub fn capacity(self) -> Option<u16> {
        match self {
            Type::Char(n) | Type::Varchar(n) => Some(n),
            _ => None,
        }
    }

    /// On-disk type tag used in table headers.
    pub fn tag(self) -> u8 {
        match self {
            Type::Int => 1,
            Type::Float => 2,
            Type::Bool => 3,
            Type::Date => 4,
            Type::Char(_) => 5,
            Type::Varchar(_) => 6,
        }
    }

    /// Reconstructs a type from its on-disk tag and capacity.
    pub fn from_tag(tag: u8, capacity: u16) -> Option<Self> {
        match tag {
            1 => Some(Type::Int),
            2 => Some(Type::Float),
            3 => Some(Type::Bool),
            4 => Some(Type::Date),
            5 => Some(Type::Char(capacity)),
            6 => Some(Type::Varchar(capacity)),
            _ => None,
        }
    }

    /// Checks whether `value` can be stored in a column of this type,
    /// applying the permitted widenings: INT into FLOAT, BOOL into INT,
    /// string into DATE (when it parses), and strings within capacity.
    pub fn accepts(self, value: &Value) -> bool {
        match (self, value) {
            (_, Value::Null) => true,
            (Type::Int, Value::Int(_)) => true,
            (Type::Int, Value::Bool(_)) => true,
            (Type::Float, Value::Float(_)) => true,
            (Type::Float, Value::Int(_)) => true,
            (Type::Bool, Value::Bool(_)) => true,
            (Type::Date, Value::Date(_)) => true,
            (Type::Date, Value::Str(s)) => parse_date(s).is_some(),
            (Type::Char(n) | Type::Varchar(n), Value::Str(s)) => s.len() <= n as usize,
            _ => false,
        }
    }

    /// Converts `value` into this column type's representation.
    ///
    /// Must only be called after [`accepts`](Self::accepts) returned true;
    /// otherwise the value is returned unchanged.
    pub fn coerce(self, value: Value) -> Value {
        match (self, value) {
            (Type::Int, Value::Bool(b)) => Value::Int(b as i64),
            (Type::Float, Value::Int(n)) => Value::Float(n as f64),
            (Type::Date, Value::Str(s)) => match parse_date(&s) {
                Some(d) => Value::Date(d),
                None => Value::Str(s),
            },
            (_, v) => v,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Int => write!(f, "INT"),
            Type::Float => write!(f, "FLOAT"),
            Type::Bool => write!(f, "BOOL"),
            Type::Date => write!(f, "DATE"),
            Type::Char(n) => write!(f, "CHAR({})", n),
            Type::Varchar(n) => write!(f, "VARCHAR({})", n),
        }
    }
}

/// Parses a date literal in the `%Y-%m-%d` template.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, DATE_FORMAT).ok()
}

/// A typed field value.
///
/// Variable-length strings are heap-allocated. NULL carries no type; the
/// declared column type disambiguates on deserialization.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// SQL NULL.
    Null,
    /// INT.
    Int(i64),
    /// FLOAT.
    Float(f64),
    /// BOOL.
    Bool(bool),
    /// CHAR / VARCHAR.
    Str(String),
    /// DATE.
    Date(NaiveDate),
}

impl Value {
    /// Returns true if this value is NULL.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Human-readable name of the value's type, for diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "NULL",
            Value::Int(_) => "INT",
            Value::Float(_) => "FLOAT",
            Value::Bool(_) => "BOOL",
            Value::Str(_) => "STRING",
            Value::Date(_) => "DATE",
        }
    }

    /// Returns the serialized size in bytes.
    ///
    /// NULL occupies 0 bytes; its presence is recorded in the record's
    /// null bitmap. Strings carry a 4-byte length prefix.
    pub fn serialized_size(&self) -> usize {
        match self {
            Value::Null => 0,
            Value::Int(_) => 8,
            Value::Float(_) => 8,
            Value::Bool(_) => 1,
            Value::Str(s) => 4 + s.len(),
            Value::Date(_) => 4,
        }
    }

    /// Serializes this value to a buffer, returning the bytes written.
    ///
    /// # Errors
    ///
    /// Returns `SerializationError::BufferTooSmall` if the buffer is too small.
    pub fn serialize(&self, buf: &mut [u8]) -> Result<usize, SerializationError> {
        match self {
            Value::Null => Ok(0),
            Value::Int(n) => {
                ensure_buf_len!(buf, 8);
                buf[0..8].copy_from_slice(&n.to_le_bytes());
                Ok(8)
            }
            Value::Float(n) => {
                ensure_buf_len!(buf, 8);
                buf[0..8].copy_from_slice(&n.to_le_bytes());
                Ok(8)
            }
            Value::Bool(b) => {
                ensure_buf_len!(buf, 1);
                buf[0] = *b as u8;
                Ok(1)
            }
            Value::Str(s) => {
                let data = s.as_bytes();
                let required = 4 + data.len();
                ensure_buf_len!(buf, required);
                buf[0..4].copy_from_slice(&(data.len() as u32).to_le_bytes());
                buf[4..4 + data.len()].copy_from_slice(data);
                Ok(required)
            }
            Value::Date(d) => {
                ensure_buf_len!(buf, 4);
                buf[0..4].copy_from_slice(&d.num_days_from_ce().to_le_bytes());
                Ok(4)
            }
        }
    }

    /// Deserializes a value from a buffer given its declared type.
    ///
    /// Returns the value and the number of bytes consumed.
    ///
    /// # Errors
    ///
    /// Returns `SerializationError::BufferTooSmall` if the buffer is too
    /// small, `SerializationError::InvalidFormat` for malformed data.
    pub fn deserialize(buf: &[u8], ty: Type) -> Result<(Self, usize), SerializationError> {
        match ty {
            Type::Int => {
                ensure_buf_len!(buf, 8);
                let n = i64::from_le_bytes(buf[0..8].try_into().expect("checked length"));
                Ok((Value::Int(n), 8))
            }
            Type::Float => {
                ensure_buf_len!(buf, 8);
                let n = f64::from_le_bytes(buf[0..8].try_into().expect("checked length"));
                Ok((Value::Float(n), 8))
            }
            Type::Bool => {
                ensure_buf_len!(buf, 1);
                Ok((Value::Bool(buf[0] != 0), 1))
            }
            Type::Date => {
                ensure_buf_len!(buf, 4);
                let days = i32::from_le_bytes(buf[0..4].try_into().expect("checked length"));
                let date = NaiveDate::from_num_days_from_ce_opt(days).ok_or_else(|| {
                    SerializationError::InvalidFormat(format!("day number {} out of range", days))
                })?;
                Ok((Value::Date(date), 4))
            }
            Type::Char(_) | Type::Varchar(_) => {
                ensure_buf_len!(buf, 4);
                let len = u32::from_le_bytes(buf[0..4].try_into().expect("checked length")) as usize;
                let required = 4 + len;
                ensure_buf_len!(buf, required);
                let s = String::from_utf8(buf[4..4 + len].to_vec())
                    .map_err(|e| SerializationError::InvalidFormat(e.to_string()))?;
                Ok((Value::Str(s), required))
            }
        }
    }

    /// Converts this value to its display form.
    ///
    /// NULL renders as `"NULL"`, booleans as `"TRUE"`/`"FALSE"`, dates via
    /// [`DATE_FORMAT`]; numbers use their standard textual forms (floats
    /// always keep a decimal point).
    pub fn to_text(&self) -> String {
        match self {
            Value::Null => "NULL".to_string(),
            Value::Int(n) => n.to_string(),
            Value::Float(n) => format_float(*n),
            Value::Bool(b) => (if *b { "TRUE" } else { "FALSE" }).to_string(),
            Value::Str(s) => s.clone(),
            Value::Date(d) => d.format(DATE_FORMAT).to_string(),
        }
    }

    /// Compares two values under the engine's comparison rules.
    ///
    /// INT/FLOAT compare numerically (mixed pairs promote to FLOAT), DATE
    /// by day number, strings by byte order, booleans with false < true.
    /// Returns `None` when either side is NULL or the types are
    /// incompatible.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
            (Value::Float(a), Value::Float(b)) => Some(a.total_cmp(b)),
            (Value::Int(a), Value::Float(b)) => Some((*a as f64).total_cmp(b)),
            (Value::Float(a), Value::Int(b)) => Some(a.total_cmp(&(*b as f64))),
            (Value::Str(a), Value::Str(b)) => Some(a.as_bytes().cmp(b.as_bytes())),
            (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            (Value::Date(a), Value::Date(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    /// Total ordering used for index keys.
    ///
    /// NULL sorts before every non-NULL value; otherwise follows
    /// [`compare`](Self::compare), falling back to a type-tag order for
    /// pairs `compare` considers incompatible so the ordering stays total.
    pub fn index_cmp(&self, other: &Value) -> Ordering {
        match (self.is_null(), other.is_null()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            (false, false) => self
                .compare(other)
                .unwrap_or_else(|| self.type_rank().cmp(&other.type_rank())),
        }
    }

    fn type_rank(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Int(_) => 2,
            Value::Float(_) => 3,
            Value::Date(_) => 4,
            Value::Str(_) => 5,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_text())
    }
}

/// Formats a FLOAT so that integral values keep a decimal point
/// (`20.0`, not `20`).
pub fn format_float(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 {
        format!("{:.1}", n)
    } else {
        format!("{}", n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_tag_roundtrip() {
        let types = [
            Type::Int,
            Type::Float,
            Type::Bool,
            Type::Date,
            Type::Char(16),
            Type::Varchar(255),
        ];
        for ty in types {
            let parsed = Type::from_tag(ty.tag(), ty.capacity().unwrap_or(0)).unwrap();
            assert_eq!(parsed, ty);
        }
        assert_eq!(Type::from_tag(0, 0), None);
        assert_eq!(Type::from_tag(99, 0), None);
    }

    #[test]
    fn test_type_display() {
        assert_eq!(Type::Int.to_string(), "INT");
        assert_eq!(Type::Char(8).to_string(), "CHAR(8)");
        assert_eq!(Type::Varchar(32).to_string(), "VARCHAR(32)");
    }

    #[test]
    fn test_accepts_widening() {
        assert!(Type::Float.accepts(&Value::Int(1)));
        assert!(Type::Int.accepts(&Value::Bool(true)));
        assert!(!Type::Int.accepts(&Value::Float(1.0)));
        assert!(Type::Varchar(5).accepts(&Value::Str("abcde".into())));
        assert!(!Type::Varchar(4).accepts(&Value::Str("abcde".into())));
        assert!(Type::Date.accepts(&Value::Str("2024-01-31".into())));
        assert!(!Type::Date.accepts(&Value::Str("not a date".into())));
        for ty in [Type::Int, Type::Float, Type::Bool, Type::Date, Type::Char(1)] {
            assert!(ty.accepts(&Value::Null));
        }
    }

    #[test]
    fn test_coerce() {
        assert_eq!(Type::Float.coerce(Value::Int(3)), Value::Float(3.0));
        assert_eq!(Type::Int.coerce(Value::Bool(true)), Value::Int(1));
        assert_eq!(
            Type::Date.coerce(Value::Str("2020-02-29".into())),
            Value::Date(NaiveDate::from_ymd_opt(2020, 2, 29).unwrap())
        );
    }

    #[test]
    fn test_roundtrip_all_types() {
        let cases = [
            (Value::Int(0), Type::Int),
            (Value::Int(i64::MIN), Type::Int),
            (Value::Int(i64::MAX), Type::Int),
            (Value::Float(0.0), Type::Float),
            (Value::Float(std::f64::consts::PI), Type::Float),
            (Value::Bool(true), Type::Bool),
            (Value::Bool(false), Type::Bool),
            (Value::Str(String::new()), Type::Varchar(16)),
            (Value::Str("hello".into()), Type::Char(16)),
            (
                Value::Date(NaiveDate::from_ymd_opt(1999, 12, 31).unwrap()),
                Type::Date,
            ),
        ];
        for (value, ty) in cases {
            let mut buf = vec![0u8; value.serialized_size().max(1)];
            let written = value.serialize(&mut buf).unwrap();
            let (parsed, consumed) = Value::deserialize(&buf, ty).unwrap();
            assert_eq!(parsed, value);
            assert_eq!(consumed, written);
        }
    }

    #[test]
    fn test_null() {
        assert!(Value::Null.is_null());
        assert!(!Value::Int(0).is_null());
        assert_eq!(Value::Null.serialized_size(), 0);
        assert_eq!(Value::Null.serialize(&mut [0u8; 1]).unwrap(), 0);
    }

    #[test]
    fn test_buffer_too_small() {
        let mut buf = [0u8; 2];
        assert!(matches!(
            Value::Int(42).serialize(&mut buf),
            Err(SerializationError::BufferTooSmall {
                required: 8,
                available: 2
            })
        ));
    }

    #[test]
    fn test_to_text() {
        assert_eq!(Value::Null.to_text(), "NULL");
        assert_eq!(Value::Int(42).to_text(), "42");
        assert_eq!(Value::Float(20.0).to_text(), "20.0");
        assert_eq!(Value::Float(0.5).to_text(), "0.5");
        assert_eq!(Value::Bool(true).to_text(), "TRUE");
        assert_eq!(Value::Bool(false).to_text(), "FALSE");
        assert_eq!(
            Value::Date(NaiveDate::from_ymd_opt(2024, 3, 7).unwrap()).to_text(),
            "2024-03-07"
        );
    }

    #[test]
    fn test_compare() {
        assert_eq!(
            Value::Int(1).compare(&Value::Int(2)),
            Some(Ordering::Less)
        );
        assert_eq!(
            Value::Int(2).compare(&Value::Float(1.5)),
            Some(Ordering::Greater)
        );
        assert_eq!(
            Value::Bool(false).compare(&Value::Bool(true)),
            Some(Ordering::Less)
        );
        assert_eq!(
            Value::Str("abc".into()).compare(&Value::Str("abd".into())),
            Some(Ordering::Less)
        );
        assert_eq!(Value::Null.compare(&Value::Int(1)), None);
        assert_eq!(Value::Int(1).compare(&Value::Str("1".into())), None);
    }

    #[test]
    fn test_index_cmp_null_first() {
        assert_eq!(Value::Null.index_cmp(&Value::Int(i64::MIN)), Ordering::Less);
        assert_eq!(Value::Int(0).index_cmp(&Value::Null), Ordering::Greater);
        assert_eq!(Value::Null.index_cmp(&Value::Null), Ordering::Equal);
    }
}
