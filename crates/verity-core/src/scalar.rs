//! Dynamically typed cell values

use std::cmp::Ordering;
use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};

/// A single cell value in a column
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Scalar {
    /// Missing value
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    /// Per-row numeric sequence (e.g. a cash-flow column)
    List(Vec<Scalar>),
}

impl Scalar {
    pub fn is_null(&self) -> bool {
        matches!(self, Scalar::Null)
    }

    /// Human-readable type name, used in error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Scalar::Null => "null",
            Scalar::Bool(_) => "bool",
            Scalar::Int(_) => "int",
            Scalar::Float(_) => "float",
            Scalar::Str(_) => "str",
            Scalar::Date(_) => "date",
            Scalar::DateTime(_) => "datetime",
            Scalar::List(_) => "list",
        }
    }

    /// Convert to a number, if possible (booleans count as 0/1)
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Scalar::Int(n) => Some(*n as f64),
            Scalar::Float(n) => Some(*n),
            Scalar::Bool(true) => Some(1.0),
            Scalar::Bool(false) => Some(0.0),
            _ => None,
        }
    }

    /// Convert to an integer, only when lossless
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Scalar::Int(n) => Some(*n),
            Scalar::Float(n) if n.fract() == 0.0 && n.abs() < 9.2e18 => Some(*n as i64),
            Scalar::Bool(b) => Some(*b as i64),
            _ => None,
        }
    }

    /// Convert to a boolean (non-zero numbers are truthy)
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Scalar::Bool(b) => Some(*b),
            Scalar::Int(n) => Some(*n != 0),
            Scalar::Float(n) => Some(*n != 0.0),
            _ => None,
        }
    }

    /// Borrow the string payload, if this is text
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Scalar::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Convert to a date. ISO-formatted text coerces.
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Scalar::Date(d) => Some(*d),
            Scalar::DateTime(dt) => Some(dt.date()),
            Scalar::Str(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d").ok(),
            _ => None,
        }
    }

    /// Compare two values for ordering, coercing where the engine allows:
    /// Int/Float/Bool compare numerically, text compares byte-wise
    /// (case-sensitive), dates coerce from ISO text. Returns `None` for
    /// nulls and incomparable types.
    pub fn compare(&self, other: &Scalar) -> Option<Ordering> {
        if self.is_null() || other.is_null() {
            return None;
        }

        if let (Some(l), Some(r)) = (self.as_f64(), other.as_f64()) {
            return l.partial_cmp(&r);
        }

        match (self, other) {
            (Scalar::Str(l), Scalar::Str(r)) => Some(l.cmp(r)),
            (Scalar::DateTime(l), Scalar::DateTime(r)) => Some(l.cmp(r)),
            _ => match (self.as_date(), other.as_date()) {
                (Some(l), Some(r)) => Some(l.cmp(&r)),
                _ => None,
            },
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Null => Ok(()),
            Scalar::Bool(true) => write!(f, "TRUE"),
            Scalar::Bool(false) => write!(f, "FALSE"),
            Scalar::Int(n) => write!(f, "{}", n),
            Scalar::Float(n) => {
                // No trailing zeros for integral floats
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    write!(f, "{}", *n as i64)
                } else {
                    write!(f, "{}", n)
                }
            }
            Scalar::Str(s) => write!(f, "{}", s),
            Scalar::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Scalar::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S")),
            Scalar::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
        }
    }
}

impl From<bool> for Scalar {
    fn from(v: bool) -> Self {
        Scalar::Bool(v)
    }
}

impl From<i64> for Scalar {
    fn from(v: i64) -> Self {
        Scalar::Int(v)
    }
}

impl From<f64> for Scalar {
    fn from(v: f64) -> Self {
        Scalar::Float(v)
    }
}

impl From<&str> for Scalar {
    fn from(v: &str) -> Self {
        Scalar::Str(v.to_string())
    }
}

impl From<String> for Scalar {
    fn from(v: String) -> Self {
        Scalar::Str(v)
    }
}

impl From<NaiveDate> for Scalar {
    fn from(v: NaiveDate) -> Self {
        Scalar::Date(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_coercion() {
        assert_eq!(Scalar::Int(3).as_f64(), Some(3.0));
        assert_eq!(Scalar::Bool(true).as_f64(), Some(1.0));
        assert_eq!(Scalar::Str("3".into()).as_f64(), None);
    }

    #[test]
    fn test_compare_mixed_numeric() {
        assert_eq!(
            Scalar::Int(2).compare(&Scalar::Float(2.0)),
            Some(Ordering::Equal)
        );
        assert_eq!(
            Scalar::Int(1).compare(&Scalar::Float(1.5)),
            Some(Ordering::Less)
        );
    }

    #[test]
    fn test_compare_strings_case_sensitive() {
        assert_ne!(
            Scalar::Str("Jane".into()).compare(&Scalar::Str("JANE".into())),
            Some(Ordering::Equal)
        );
        assert_eq!(
            Scalar::Str("JOHN".into()).compare(&Scalar::Str("JOHN".into())),
            Some(Ordering::Equal)
        );
    }

    #[test]
    fn test_compare_date_with_iso_text() {
        let d = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        assert_eq!(
            Scalar::Date(d).compare(&Scalar::Str("2025-01-01".into())),
            Some(Ordering::Equal)
        );
    }

    #[test]
    fn test_null_is_incomparable() {
        assert_eq!(Scalar::Null.compare(&Scalar::Int(1)), None);
    }

    #[test]
    fn test_display_trims_integral_floats() {
        assert_eq!(Scalar::Float(10.0).to_string(), "10");
        assert_eq!(Scalar::Float(10.5).to_string(), "10.5");
        assert_eq!(Scalar::Bool(true).to_string(), "TRUE");
    }
}
