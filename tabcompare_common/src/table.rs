use indexmap::IndexSet;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Ordered set of unique column names
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TableHeader {
    columns: IndexSet<String>,
}

impl TableHeader {
    /// Builds a header, silently skipping repeated column names
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
        }
    }

    /// Ordered union of `first` followed by the columns only `second` has
    pub fn union(first: &TableHeader, second: &TableHeader) -> Self {
        let mut columns = first.columns.clone();
        for column in &second.columns {
            columns.insert(column.clone());
        }
        Self { columns }
    }

    /// Returns a header with every column passed through `rename`.
    /// Columns without an entry keep their name.
    pub fn renamed(&self, rename: &HashMap<String, String>) -> Self {
        Self::new(
            self.columns
                .iter()
                .map(|c| rename.get(c).cloned().unwrap_or_else(|| c.clone())),
        )
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn contains(&self, column: &str) -> bool {
        self.columns.contains(column)
    }

    pub fn index_of(&self, column: &str) -> Option<usize> {
        self.columns.get_index_of(column)
    }

    pub fn column(&self, index: usize) -> Option<&str> {
        self.columns.get_index(index).map(|c| c.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.as_str())
    }
}

impl fmt::Display for TableHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, column) in self.columns.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", column)?;
        }
        write!(f, "]")
    }
}

/// Row of values bound positionally to a shared header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRow {
    header: Arc<TableHeader>,
    values: Vec<Option<String>>,
}

impl TableRow {
    /// Creates a row with exactly one slot per header column.
    /// Missing trailing values read as `None`, surplus values are dropped.
    pub fn new(header: Arc<TableHeader>, mut values: Vec<Option<String>>) -> Self {
        values.resize(header.len(), None);
        Self { header, values }
    }

    pub fn from_strings<I, S>(header: Arc<TableHeader>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(header, values.into_iter().map(|v| Some(v.into())).collect())
    }

    pub fn header(&self) -> &Arc<TableHeader> {
        &self.header
    }

    /// Value of `column`, `None` if the column is unknown or the value is absent
    pub fn value(&self, column: &str) -> Option<&str> {
        self.header
            .index_of(column)
            .and_then(|idx| self.values[idx].as_deref())
    }

    pub fn values(&self) -> &[Option<String>] {
        &self.values
    }

    /// Rebinds the values to a header of the same width, e.g. after column renaming
    pub fn with_header(self, header: Arc<TableHeader>) -> Self {
        Self::new(header, self.values)
    }
}
