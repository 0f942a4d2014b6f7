use std::fmt;

/// Represents the supported data types in the database schema.
/// These types define the structure of columns and the expected format of values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    /// A 64-bit signed integer.
    Int,
    /// Text holding at most the given number of characters. Longer values
    /// are truncated on insert.
    Char(u32),
    /// A calendar date written `YYYY-MM-DD`.
    Date,
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int => write!(f, "int"),
            Self::Char(len) => write!(f, "char({len})"),
            Self::Date => write!(f, "date"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(DataType::Int.to_string(), "int");
        assert_eq!(DataType::Char(15).to_string(), "char(15)");
        assert_eq!(DataType::Date.to_string(), "date");
    }

    #[test]
    fn test_char_length_is_part_of_the_type() {
        assert_ne!(DataType::Char(10), DataType::Char(11));
        assert_eq!(DataType::Char(10), DataType::Char(10));
    }
}
