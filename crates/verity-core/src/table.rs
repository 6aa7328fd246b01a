//! In-memory columnar tables

use std::collections::HashMap;

use crate::error::{CoreError, CoreResult};
use crate::scalar::Scalar;
use crate::series::Series;

/// An ordered collection of equally sized, uniquely named columns
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Table {
    columns: Vec<Series>,
}

impl Table {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from columns, validating names and lengths
    pub fn from_columns(columns: Vec<Series>) -> CoreResult<Self> {
        let mut seen: Vec<&str> = Vec::with_capacity(columns.len());
        let height = columns.first().map_or(0, Series::len);

        for column in &columns {
            if seen.contains(&column.name()) {
                return Err(CoreError::DuplicateColumn(column.name().to_string()));
            }
            seen.push(column.name());

            if column.len() != height {
                return Err(CoreError::LengthMismatch {
                    expected: height,
                    actual: column.len(),
                });
            }
        }

        Ok(Self { columns })
    }

    /// Number of rows
    pub fn height(&self) -> usize {
        self.columns.first().map_or(0, Series::len)
    }

    /// Number of columns
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.height() == 0
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(Series::name)
    }

    pub fn columns(&self) -> &[Series] {
        &self.columns
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name() == name)
    }

    pub fn column(&self, name: &str) -> Option<&Series> {
        self.columns.iter().find(|c| c.name() == name)
    }

    /// Add a column, replacing any existing column of the same name
    pub fn with_column(mut self, column: Series) -> CoreResult<Self> {
        if !self.columns.is_empty() && column.len() != self.height() {
            return Err(CoreError::LengthMismatch {
                expected: self.height(),
                actual: column.len(),
            });
        }

        match self.columns.iter_mut().find(|c| c.name() == column.name()) {
            Some(existing) => *existing = column,
            None => self.columns.push(column),
        }
        Ok(self)
    }

    /// Project onto the named columns, in the given order
    pub fn select<S: AsRef<str>>(&self, names: &[S]) -> CoreResult<Table> {
        let mut columns = Vec::with_capacity(names.len());
        for name in names {
            let name = name.as_ref();
            let column = self
                .column(name)
                .ok_or_else(|| CoreError::ColumnNotFound(name.to_string()))?;
            columns.push(column.clone());
        }
        Ok(Table { columns })
    }

    /// New table containing the given rows, in the given order
    pub fn take(&self, indices: &[usize]) -> Table {
        Table {
            columns: self.columns.iter().map(|c| c.take(indices)).collect(),
        }
    }

    /// Keep rows where the mask is true
    pub fn filter(&self, mask: &[bool]) -> CoreResult<Table> {
        if mask.len() != self.height() {
            return Err(CoreError::LengthMismatch {
                expected: self.height(),
                actual: mask.len(),
            });
        }
        let indices: Vec<usize> = mask
            .iter()
            .enumerate()
            .filter_map(|(i, keep)| keep.then_some(i))
            .collect();
        Ok(self.take(&indices))
    }

    /// Prepend a sequential integer row-identifier column if one of the
    /// given name is not already present. Assigned once, stable for the
    /// lifetime of the table.
    pub fn with_row_ids(&self, name: &str) -> Table {
        if self.has_column(name) {
            return self.clone();
        }
        let ids = Series::ints(name, (0..self.height() as i64).collect());
        let mut columns = Vec::with_capacity(self.columns.len() + 1);
        columns.push(ids);
        columns.extend(self.columns.iter().cloned());
        Table { columns }
    }

    /// Group rows by the given key columns. Returns the row indices of
    /// each group, groups ordered by first appearance.
    pub fn partition_by<S: AsRef<str>>(&self, keys: &[S]) -> CoreResult<Vec<Vec<usize>>> {
        let key_columns: Vec<&Series> = keys
            .iter()
            .map(|name| {
                self.column(name.as_ref())
                    .ok_or_else(|| CoreError::ColumnNotFound(name.as_ref().to_string()))
            })
            .collect::<CoreResult<_>>()?;

        let mut groups: Vec<Vec<usize>> = Vec::new();
        let mut slots: HashMap<Vec<GroupKey>, usize> = HashMap::new();

        for row in 0..self.height() {
            let key: Vec<GroupKey> = key_columns
                .iter()
                .map(|c| GroupKey::from_scalar(&c.values()[row]))
                .collect();
            let slot = *slots.entry(key).or_insert_with(|| {
                groups.push(Vec::new());
                groups.len() - 1
            });
            groups[slot].push(row);
        }

        Ok(groups)
    }

    /// Materialize one row as a keyed record
    pub fn row(&self, index: usize) -> Record {
        Record {
            fields: self
                .columns
                .iter()
                .map(|c| {
                    (
                        c.name().to_string(),
                        c.get(index).cloned().unwrap_or(Scalar::Null),
                    )
                })
                .collect(),
        }
    }
}

/// A single row bundled as named fields, used to hand rows to external
/// per-row callables
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub fields: Vec<(String, Scalar)>,
}

impl Record {
    pub fn new(fields: Vec<(String, Scalar)>) -> Self {
        Self { fields }
    }

    pub fn get(&self, name: &str) -> Option<&Scalar> {
        self.fields
            .iter()
            .find_map(|(k, v)| (k == name).then_some(v))
    }

    pub fn values(&self) -> impl Iterator<Item = &Scalar> {
        self.fields.iter().map(|(_, v)| v)
    }
}

/// Hashable stand-in for a scalar used as a grouping key. Floats hash by
/// bit pattern; nulls form their own group.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum GroupKey {
    Null,
    Bool(bool),
    Int(i64),
    Bits(u64),
    Str(String),
    Day(i32),
    Micros(i64),
    List(Vec<GroupKey>),
}

impl GroupKey {
    fn from_scalar(value: &Scalar) -> GroupKey {
        use chrono::Datelike;
        match value {
            Scalar::Null => GroupKey::Null,
            Scalar::Bool(b) => GroupKey::Bool(*b),
            Scalar::Int(n) => GroupKey::Int(*n),
            Scalar::Float(n) => GroupKey::Bits(n.to_bits()),
            Scalar::Str(s) => GroupKey::Str(s.clone()),
            Scalar::Date(d) => GroupKey::Day(d.num_days_from_ce()),
            Scalar::DateTime(dt) => GroupKey::Micros(dt.and_utc().timestamp_micros()),
            Scalar::List(items) => {
                GroupKey::List(items.iter().map(GroupKey::from_scalar).collect())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample() -> Table {
        Table::from_columns(vec![
            Series::strs("dept", vec!["IT", "HR", "IT"]),
            Series::ints("salary", vec![100, 200, 300]),
        ])
        .unwrap()
    }

    #[test]
    fn test_from_columns_rejects_duplicates() {
        let err = Table::from_columns(vec![
            Series::ints("a", vec![1]),
            Series::ints("a", vec![2]),
        ])
        .unwrap_err();
        assert!(matches!(err, CoreError::DuplicateColumn(_)));
    }

    #[test]
    fn test_from_columns_rejects_ragged_lengths() {
        let err = Table::from_columns(vec![
            Series::ints("a", vec![1, 2]),
            Series::ints("b", vec![1]),
        ])
        .unwrap_err();
        assert!(matches!(err, CoreError::LengthMismatch { .. }));
    }

    #[test]
    fn test_with_row_ids_is_idempotent() {
        let t = sample().with_row_ids("row_id");
        assert_eq!(t.width(), 3);
        assert_eq!(
            t.column("row_id").unwrap().values(),
            &[Scalar::Int(0), Scalar::Int(1), Scalar::Int(2)]
        );

        let again = t.with_row_ids("row_id");
        assert_eq!(again, t);
    }

    #[test]
    fn test_partition_by_first_seen_order() {
        let groups = sample().partition_by(&["dept"]).unwrap();
        assert_eq!(groups, vec![vec![0, 2], vec![1]]);
    }

    #[test]
    fn test_select_missing_column() {
        let err = sample().select(&["nope"]).unwrap_err();
        assert!(matches!(err, CoreError::ColumnNotFound(_)));
    }

    #[test]
    fn test_filter_and_take() {
        let t = sample().filter(&[true, false, true]).unwrap();
        assert_eq!(t.height(), 2);
        assert_eq!(
            t.column("salary").unwrap().values(),
            &[Scalar::Int(100), Scalar::Int(300)]
        );
    }

    #[test]
    fn test_with_column_replaces_same_name() {
        let t = sample()
            .with_column(Series::ints("salary", vec![1, 2, 3]))
            .unwrap();
        assert_eq!(t.width(), 2);
        assert_eq!(t.column("salary").unwrap().get(0), Some(&Scalar::Int(1)));
    }

    #[test]
    fn test_row_record() {
        let r = sample().row(1);
        assert_eq!(r.get("dept"), Some(&Scalar::Str("HR".into())));
        assert_eq!(r.get("salary"), Some(&Scalar::Int(200)));
    }
}
