use std::collections::BTreeSet;
use std::fmt;

// ---------------------------------------------------------------------------
// CellValue – a single cell of a column
// ---------------------------------------------------------------------------

/// A dynamically-typed cell value.
/// Grouping plots collect values into `BTreeSet`s, so `CellValue` must be `Ord`.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    /// Empty CSV field.
    Null,
}

// -- Manual Eq/Ord so we can put CellValue in BTreeSet --

impl Eq for CellValue {}

impl PartialOrd for CellValue {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CellValue {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        use CellValue::*;
        fn discriminant(v: &CellValue) -> u8 {
            match v {
                Null => 0,
                Bool(_) => 1,
                Int(_) => 2,
                Float(_) => 3,
                Str(_) => 4,
            }
        }
        let da = discriminant(self);
        let db = discriminant(other);
        if da != db {
            return da.cmp(&db);
        }
        match (self, other) {
            (Null, Null) => std::cmp::Ordering::Equal,
            (Bool(a), Bool(b)) => a.cmp(b),
            (Int(a), Int(b)) => a.cmp(b),
            (Float(a), Float(b)) => a.total_cmp(b),
            (Str(a), Str(b)) => a.cmp(b),
            _ => std::cmp::Ordering::Equal,
        }
    }
}

impl std::hash::Hash for CellValue {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            CellValue::Str(s) => s.hash(state),
            CellValue::Int(i) => i.hash(state),
            CellValue::Float(f) => f.to_bits().hash(state),
            CellValue::Bool(b) => b.hash(state),
            CellValue::Null => {}
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Str(s) => write!(f, "{s}"),
            CellValue::Int(i) => write!(f, "{i}"),
            CellValue::Float(v) => write!(f, "{v}"),
            CellValue::Bool(b) => write!(f, "{b}"),
            CellValue::Null => write!(f, "<null>"),
        }
    }
}

impl CellValue {
    /// Try to interpret the value as an `f64` for numeric channels.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Float(v) => Some(*v),
            CellValue::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }
}

// ---------------------------------------------------------------------------
// Column types
// ---------------------------------------------------------------------------

/// Declared type of a column, inferred once at load time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Int,
    Float,
    Bool,
    Text,
}

/// Semantic class a column type maps to. Drives which plot options are
/// suggested; performs no validation on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeClass {
    Number,
    Category,
}

impl ColumnType {
    pub fn class(&self) -> TypeClass {
        match self {
            ColumnType::Int | ColumnType::Float => TypeClass::Number,
            ColumnType::Bool | ColumnType::Text => TypeClass::Category,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ColumnType::Int => "int64",
            ColumnType::Float => "float64",
            ColumnType::Bool => "bool",
            ColumnType::Text => "text",
        }
    }
}

impl fmt::Display for TypeClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeClass::Number => write!(f, "Number"),
            TypeClass::Category => write!(f, "Category"),
        }
    }
}

// ---------------------------------------------------------------------------
// Column – one named column of the dataset
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub dtype: ColumnType,
    pub values: Vec<CellValue>,
}

impl Column {
    pub fn class(&self) -> TypeClass {
        self.dtype.class()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Row-aligned numeric view: one entry per row, NaN where the cell is
    /// null or non-numeric. Used where pairing across columns matters.
    pub fn numeric_aligned(&self) -> Vec<f64> {
        self.values
            .iter()
            .map(|v| v.as_f64().unwrap_or(f64::NAN))
            .collect()
    }

    /// Finite numeric values only, missing cells dropped. Used for samples.
    pub fn numeric_clean(&self) -> Vec<f64> {
        self.values
            .iter()
            .filter_map(CellValue::as_f64)
            .filter(|v| v.is_finite())
            .collect()
    }

    /// Sorted set of distinct values, for grouping plots.
    pub fn unique_values(&self) -> BTreeSet<CellValue> {
        self.values.iter().cloned().collect()
    }
}

// ---------------------------------------------------------------------------
// Dataset – the complete loaded table
// ---------------------------------------------------------------------------

/// An ordered collection of named columns. Invariants: column names are
/// unique, every column holds the same number of rows. The loader is the
/// only producer of fresh datasets; `take_rows` preserves both invariants.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    columns: Vec<Column>,
}

impl Dataset {
    pub fn from_columns(columns: Vec<Column>) -> Self {
        debug_assert!(
            columns.windows(2).all(|w| w[0].len() == w[1].len()),
            "columns must have identical row counts"
        );
        Dataset { columns }
    }

    pub fn n_rows(&self) -> usize {
        self.columns.first().map_or(0, Column::len)
    }

    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.n_rows() == 0
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    /// The load-time type map: (name, dtype, class) per column, in order.
    pub fn type_map(&self) -> Vec<(String, ColumnType, TypeClass)> {
        self.columns
            .iter()
            .map(|c| (c.name.clone(), c.dtype, c.class()))
            .collect()
    }

    /// New dataset containing the given rows, in the given order.
    /// Column names and declared types are carried over unchanged.
    pub fn take_rows(&self, indices: &[usize]) -> Dataset {
        let columns = self
            .columns
            .iter()
            .map(|c| Column {
                name: c.name.clone(),
                dtype: c.dtype,
                values: indices.iter().map(|&i| c.values[i].clone()).collect(),
            })
            .collect();
        Dataset::from_columns(columns)
    }
}
