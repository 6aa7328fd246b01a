//! Named columns of values

use crate::scalar::Scalar;

/// A named column of values
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Series {
    name: String,
    values: Vec<Scalar>,
}

impl Series {
    pub fn new(name: impl Into<String>, values: Vec<Scalar>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    /// Build an integer column
    pub fn ints(name: impl Into<String>, values: Vec<i64>) -> Self {
        Self::new(name, values.into_iter().map(Scalar::Int).collect())
    }

    /// Build a float column
    pub fn floats(name: impl Into<String>, values: Vec<f64>) -> Self {
        Self::new(name, values.into_iter().map(Scalar::Float).collect())
    }

    /// Build a text column
    pub fn strs(name: impl Into<String>, values: Vec<&str>) -> Self {
        Self::new(
            name,
            values.into_iter().map(|s| Scalar::Str(s.to_string())).collect(),
        )
    }

    /// Build a boolean column
    pub fn bools(name: impl Into<String>, values: Vec<bool>) -> Self {
        Self::new(name, values.into_iter().map(Scalar::Bool).collect())
    }

    /// Build a date column from ISO strings; unparseable entries become null
    pub fn dates(name: impl Into<String>, values: Vec<&str>) -> Self {
        Self::new(
            name,
            values
                .into_iter()
                .map(|s| {
                    chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d")
                        .map(Scalar::Date)
                        .unwrap_or(Scalar::Null)
                })
                .collect(),
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rename(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[Scalar] {
        &self.values
    }

    pub fn get(&self, index: usize) -> Option<&Scalar> {
        self.values.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Scalar> {
        self.values.iter()
    }

    /// New series containing the values at the given row indices
    pub fn take(&self, indices: &[usize]) -> Series {
        Series {
            name: self.name.clone(),
            values: indices
                .iter()
                .map(|&i| self.values.get(i).cloned().unwrap_or(Scalar::Null))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_preserves_name_and_order() {
        let s = Series::ints("n", vec![10, 20, 30, 40]);
        let t = s.take(&[3, 1]);
        assert_eq!(t.name(), "n");
        assert_eq!(t.values(), &[Scalar::Int(40), Scalar::Int(20)]);
    }

    #[test]
    fn test_dates_builder_nulls_bad_input() {
        let s = Series::dates("d", vec!["2025-01-01", "not-a-date"]);
        assert!(matches!(s.get(0), Some(Scalar::Date(_))));
        assert_eq!(s.get(1), Some(&Scalar::Null));
    }
}
