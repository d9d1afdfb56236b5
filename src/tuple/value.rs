use std::fmt;

use bytes::{Buf, BufMut};

use crate::common::{DbError, Result};

use super::DataType;

/// Represents a typed value that can be stored in a tuple.
/// Each variant corresponds to a DataType and holds the actual data.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Boolean(bool),
    Integer(i32),
    BigInt(i64),
    Double(f64),
    /// String value, stored in a Char column
    String(String),
}

impl Value {
    /// Returns true if this value can be stored in a column of the given type.
    pub fn matches(&self, data_type: &DataType) -> bool {
        matches!(
            (self, data_type),
            (Value::Boolean(_), DataType::Boolean)
                | (Value::Integer(_), DataType::Integer)
                | (Value::BigInt(_), DataType::BigInt)
                | (Value::Double(_), DataType::Double)
                | (Value::String(_), DataType::Char(_))
        )
    }

    /// Writes exactly `data_type.size()` bytes into `buf`.
    pub fn encode(&self, data_type: &DataType, buf: &mut impl BufMut) -> Result<()> {
        match (self, data_type) {
            (Value::Boolean(b), DataType::Boolean) => buf.put_u8(u8::from(*b)),
            (Value::Integer(v), DataType::Integer) => buf.put_i32_le(*v),
            (Value::BigInt(v), DataType::BigInt) => buf.put_i64_le(*v),
            (Value::Double(v), DataType::Double) => buf.put_f64_le(*v),
            (Value::String(s), DataType::Char(n)) => {
                let max = *n as usize;
                if s.len() > max {
                    return Err(DbError::ValueTooLong {
                        max,
                        actual: s.len(),
                    });
                }
                buf.put_u16_le(s.len() as u16);
                buf.put_slice(s.as_bytes());
                buf.put_bytes(0, max - s.len());
            }
            (_, other) => return Err(DbError::TypeMismatch(other.to_string())),
        }
        Ok(())
    }

    /// Reads one value of the given type, consuming `data_type.size()` bytes.
    pub fn decode(data_type: &DataType, buf: &mut impl Buf) -> Result<Self> {
        if buf.remaining() < data_type.size() {
            return Err(DbError::Corrupted(format!(
                "need {} bytes for {}, have {}",
                data_type.size(),
                data_type,
                buf.remaining()
            )));
        }

        let value = match data_type {
            DataType::Boolean => Value::Boolean(buf.get_u8() != 0),
            DataType::Integer => Value::Integer(buf.get_i32_le()),
            DataType::BigInt => Value::BigInt(buf.get_i64_le()),
            DataType::Double => Value::Double(buf.get_f64_le()),
            DataType::Char(n) => {
                let max = *n as usize;
                let len = buf.get_u16_le() as usize;
                if len > max {
                    return Err(DbError::Corrupted(format!(
                        "string length {} exceeds column width {}",
                        len, max
                    )));
                }
                let mut raw = vec![0u8; max];
                buf.copy_to_slice(&mut raw);
                raw.truncate(len);
                let s = String::from_utf8(raw)
                    .map_err(|e| DbError::Corrupted(format!("invalid utf-8: {}", e)))?;
                Value::String(s)
            }
        };

        Ok(value)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Boolean(v) => write!(f, "{}", v),
            Value::Integer(v) => write!(f, "{}", v),
            Value::BigInt(v) => write!(f, "{}", v),
            Value::Double(v) => write!(f, "{}", v),
            Value::String(v) => write!(f, "{}", v),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::BigInt(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}
