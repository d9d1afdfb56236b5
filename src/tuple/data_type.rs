use std::fmt;

/// Column types supported by heap tables.
/// Every type has a fixed on-disk width so that a table's tuples are all the
/// same size and a page can be carved into equal slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    /// Boolean type: 1 byte (0 = false, 1 = true)
    Boolean,

    /// 32-bit signed integer: 4 bytes, little-endian
    Integer,

    /// 64-bit signed integer: 8 bytes, little-endian
    BigInt,

    /// 64-bit floating point: 8 bytes, IEEE 754
    Double,

    /// Character string of at most n bytes.
    /// Stored as: length (2 bytes) + n bytes, zero padded
    Char(u16),
}

impl DataType {
    /// Returns the number of bytes a value of this type occupies on disk.
    pub fn size(&self) -> usize {
        match self {
            DataType::Boolean => 1,
            DataType::Integer => 4,
            DataType::BigInt => 8,
            DataType::Double => 8,
            DataType::Char(n) => 2 + *n as usize,
        }
    }

    /// Returns true for the integer and floating point types.
    pub fn is_numeric(&self) -> bool {
        matches!(self, DataType::Integer | DataType::BigInt | DataType::Double)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Boolean => write!(f, "BOOLEAN"),
            DataType::Integer => write!(f, "INTEGER"),
            DataType::BigInt => write!(f, "BIGINT"),
            DataType::Double => write!(f, "DOUBLE"),
            DataType::Char(n) => write!(f, "CHAR({})", n),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_calculations() {
        assert_eq!(DataType::Boolean.size(), 1);
        assert_eq!(DataType::Integer.size(), 4);
        assert_eq!(DataType::BigInt.size(), 8);
        assert_eq!(DataType::Double.size(), 8);
        assert_eq!(DataType::Char(20).size(), 22);
    }

    #[test]
    fn test_display() {
        assert_eq!(DataType::Integer.to_string(), "INTEGER");
        assert_eq!(DataType::Char(10).to_string(), "CHAR(10)");
    }

    #[test]
    fn test_numeric() {
        assert!(DataType::Integer.is_numeric());
        assert!(DataType::Double.is_numeric());
        assert!(!DataType::Boolean.is_numeric());
        assert!(!DataType::Char(4).is_numeric());
    }
}
