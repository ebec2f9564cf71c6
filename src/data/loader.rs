use std::collections::BTreeSet;
use std::path::Path;

use thiserror::Error;

use super::model::{CellValue, Column, ColumnType, Dataset};

// ---------------------------------------------------------------------------
// ParseError
// ---------------------------------------------------------------------------

/// Malformed upload. Carries the underlying parser's message where one
/// exists; surfaced to the user, never fatal to the session.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("reading file: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV parse error: {0}")]
    Csv(#[from] csv::Error),
    #[error("duplicate column name '{0}' in header")]
    DuplicateColumn(String),
    #[error("input has no header row")]
    Empty,
}

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Parse an uploaded file's bytes as comma-separated text with a header row.
/// No other format is accepted. On any error nothing is returned, so the
/// caller's dataset slot is never left partially populated.
pub fn load_bytes(bytes: &[u8]) -> Result<Dataset, ParseError> {
    let mut reader = csv::Reader::from_reader(bytes);

    let headers: Vec<String> = reader.headers()?.iter().map(|h| h.to_string()).collect();
    if headers.is_empty() || headers.iter().all(|h| h.is_empty()) {
        return Err(ParseError::Empty);
    }

    let mut seen = BTreeSet::new();
    for h in &headers {
        if !seen.insert(h) {
            return Err(ParseError::DuplicateColumn(h.clone()));
        }
    }

    // Collect raw text cells per column; ragged rows fail inside the csv
    // crate with an UnequalLengths error.
    let mut raw: Vec<Vec<String>> = vec![Vec::new(); headers.len()];
    for result in reader.records() {
        let record = result?;
        for (i, cells) in raw.iter_mut().enumerate() {
            cells.push(record.get(i).unwrap_or("").to_string());
        }
    }

    let columns = headers
        .into_iter()
        .zip(raw)
        .map(|(name, cells)| infer_column(name, &cells))
        .collect();

    let dataset = Dataset::from_columns(columns);
    log::info!(
        "Parsed CSV: {} rows, columns {:?}",
        dataset.n_rows(),
        dataset.column_names()
    );
    Ok(dataset)
}

/// Convenience wrapper for the file dialog.
pub fn load_file(path: &Path) -> Result<Dataset, ParseError> {
    let bytes = std::fs::read(path)?;
    load_bytes(&bytes)
}

// ---------------------------------------------------------------------------
// Column type inference
// ---------------------------------------------------------------------------

/// Infer the column type from its raw cells, then convert.
///
/// Order of attempts over the non-empty cells: all `i64` → Int, all `f64`
/// (this admits `NaN`/`inf` spellings) → Float, all `true`/`false` → Bool,
/// anything else → Text. Empty cells are Null and do not vote.
fn infer_column(name: String, cells: &[String]) -> Column {
    let non_null = || cells.iter().map(|s| s.trim()).filter(|s| !s.is_empty());

    let dtype = if non_null().count() == 0 {
        // Nothing to vote with: an all-null column stays textual.
        ColumnType::Text
    } else if non_null().all(|s| s.parse::<i64>().is_ok()) {
        ColumnType::Int
    } else if non_null().all(|s| s.parse::<f64>().is_ok()) {
        ColumnType::Float
    } else if non_null().all(|s| s == "true" || s == "false") {
        ColumnType::Bool
    } else {
        ColumnType::Text
    };

    let values = cells
        .iter()
        .map(|s| convert_cell(s.trim(), dtype))
        .collect();

    Column { name, dtype, values }
}

fn convert_cell(s: &str, dtype: ColumnType) -> CellValue {
    if s.is_empty() {
        return CellValue::Null;
    }
    match dtype {
        // Parses cannot fail here: inference only picked the type after
        // every non-empty cell accepted it.
        ColumnType::Int => s.parse::<i64>().map_or(CellValue::Null, CellValue::Int),
        ColumnType::Float => s.parse::<f64>().map_or(CellValue::Null, CellValue::Float),
        ColumnType::Bool => CellValue::Bool(s == "true"),
        ColumnType::Text => CellValue::Str(s.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::TypeClass;

    #[test]
    fn infers_types_per_column() {
        let csv = "id,height,ok,name\n1,1.5,true,ann\n2,2.5,false,bob\n";
        let ds = load_bytes(csv.as_bytes()).unwrap();
        assert_eq!(ds.n_cols(), 4);
        assert_eq!(ds.column("id").unwrap().dtype, ColumnType::Int);
        assert_eq!(ds.column("height").unwrap().dtype, ColumnType::Float);
        assert_eq!(ds.column("ok").unwrap().dtype, ColumnType::Bool);
        assert_eq!(ds.column("name").unwrap().dtype, ColumnType::Text);
    }

    #[test]
    fn type_map_covers_every_column_exactly_once() {
        let csv = "a,b,c\n1,x,2.5\n2,y,3.5\n";
        let ds = load_bytes(csv.as_bytes()).unwrap();
        let map = ds.type_map();
        assert_eq!(map.len(), ds.n_cols());
        let classes: Vec<TypeClass> = map.iter().map(|(_, _, c)| *c).collect();
        assert_eq!(
            classes,
            vec![TypeClass::Number, TypeClass::Category, TypeClass::Number]
        );
    }

    #[test]
    fn nan_cell_promotes_int_column_to_float() {
        let csv = "age\n20\n25\n30\nNaN\n";
        let ds = load_bytes(csv.as_bytes()).unwrap();
        let age = ds.column("age").unwrap();
        assert_eq!(age.dtype, ColumnType::Float);
        // NaN is numeric but not finite: dropped from clean samples.
        assert_eq!(age.numeric_clean(), vec![20.0, 25.0, 30.0]);
    }

    #[test]
    fn empty_cells_are_null_and_do_not_vote() {
        let csv = "score\n1.5\n\n4.0\n";
        let ds = load_bytes(csv.as_bytes()).unwrap();
        let score = ds.column("score").unwrap();
        assert_eq!(score.dtype, ColumnType::Float);
        assert!(score.values[1].is_null());
    }

    #[test]
    fn binary_blob_is_a_parse_error() {
        let blob: Vec<u8> = vec![0x89, 0x50, 0x4e, 0x47, 0xff, 0xfe, 0x00, 0x1a];
        assert!(matches!(load_bytes(&blob), Err(ParseError::Csv(_))));
    }

    #[test]
    fn ragged_rows_are_a_parse_error() {
        let csv = "a,b\n1,2\n3\n";
        assert!(matches!(load_bytes(csv.as_bytes()), Err(ParseError::Csv(_))));
    }

    #[test]
    fn duplicate_headers_rejected() {
        let csv = "a,a\n1,2\n";
        assert!(matches!(
            load_bytes(csv.as_bytes()),
            Err(ParseError::DuplicateColumn(_))
        ));
    }

    #[test]
    fn header_only_is_a_valid_empty_dataset() {
        let ds = load_bytes("a,b\n".as_bytes()).unwrap();
        assert_eq!(ds.n_cols(), 2);
        assert!(ds.is_empty());
    }
}
