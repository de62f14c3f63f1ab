//! Case cells

/// One cell of a case
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    /// Numeric value
    Number(f64),
    /// System-missing numeric value
    Missing,
    /// String value with trailing spaces removed
    Text(Vec<u8>),
}

/// One case: a cell per logical variable, in dictionary order
pub type CaseRow = Vec<Cell>;

impl Cell {
    /// String cell from anything byte-like
    pub fn text(value: impl Into<Vec<u8>>) -> Self {
        Self::Text(value.into())
    }

    /// Numeric value, `None` for missing and string cells
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(value) => Some(*value),
            _ => None,
        }
    }

    /// Raw string bytes, `None` for numeric cells
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Text(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// String value if it is valid UTF-8
    pub fn as_str(&self) -> Option<&str> {
        self.as_bytes().and_then(|b| std::str::from_utf8(b).ok())
    }

    /// Whether this is the system-missing value
    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing)
    }

    /// Whether this cell belongs to a string variable
    pub fn is_text(&self) -> bool {
        matches!(self, Self::Text(_))
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Self::Text(value.as_bytes().to_vec())
    }
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        Self::Text(value.into_bytes())
    }
}

impl From<Option<f64>> for Cell {
    fn from(value: Option<f64>) -> Self {
        value.map_or(Self::Missing, Self::Number)
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_accessors() {
        assert_eq!(Cell::from(1.5).as_f64(), Some(1.5));
        assert_eq!(Cell::from("abc").as_str(), Some("abc"));
        assert_eq!(Cell::text(vec![0xFF]).as_str(), None);
        assert_eq!(Cell::text(vec![0xFF]).as_bytes(), Some([0xFF].as_slice()));
        assert!(Cell::from(None).is_missing());
        assert!(Cell::Missing.as_f64().is_none());
        assert!(Cell::from(String::from("x")).is_text());
    }
}
