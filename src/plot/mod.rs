pub mod figure;

use std::collections::BTreeMap;

use thiserror::Error;

use crate::data::model::{CellValue, Column, Dataset, TypeClass};
use crate::stats;

pub use figure::Figure;
use figure::{bin_values, box_stats, BoxGroup, PointGroup};

// ---------------------------------------------------------------------------
// PlotKind registry: arity buckets plus an arity-agnostic wildcard bucket
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlotKind {
    // arity 1
    Histogram,
    Box,
    // arity 2
    Scatter,
    Line,
    GroupedBox,
    // arity 3
    ColoredScatter,
    GroupedLine,
    // wildcard: offered at every arity
    CorrelationHeatmap,
}

impl PlotKind {
    pub fn label(&self) -> &'static str {
        match self {
            PlotKind::Histogram => "Histogram",
            PlotKind::Box => "Box plot",
            PlotKind::Scatter => "Scatter plot",
            PlotKind::Line => "Line plot",
            PlotKind::GroupedBox => "Box plot by group",
            PlotKind::ColoredScatter => "Scatter plot, color by third",
            PlotKind::GroupedLine => "Line plot, one line per third",
            PlotKind::CorrelationHeatmap => "Correlation heatmap",
        }
    }

    /// Number of columns the kind consumes; None for arity-agnostic kinds.
    pub fn arity(&self) -> Option<usize> {
        match self {
            PlotKind::Histogram | PlotKind::Box => Some(1),
            PlotKind::Scatter | PlotKind::Line | PlotKind::GroupedBox => Some(2),
            PlotKind::ColoredScatter | PlotKind::GroupedLine => Some(3),
            PlotKind::CorrelationHeatmap => None,
        }
    }
}

/// The plot kinds offered for a column-selection arity: the arity's own
/// bucket followed by the wildcard bucket.
pub fn kinds_for(arity: usize) -> Vec<PlotKind> {
    let mut kinds: Vec<PlotKind> = match arity {
        1 => vec![PlotKind::Histogram, PlotKind::Box],
        2 => vec![PlotKind::Scatter, PlotKind::Line, PlotKind::GroupedBox],
        3 => vec![PlotKind::ColoredScatter, PlotKind::GroupedLine],
        _ => Vec::new(),
    };
    kinds.push(PlotKind::CorrelationHeatmap);
    kinds
}

// ---------------------------------------------------------------------------
// PlotError
// ---------------------------------------------------------------------------

/// Rejected plot request. Non-fatal and retryable: the caller shows the
/// message and keeps the session alive.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PlotError {
    #[error("unknown column '{0}'")]
    UnknownColumn(String),
    #[error("'{kind}' needs exactly {expected} columns, got {got}")]
    ArityMismatch {
        kind: &'static str,
        expected: usize,
        got: usize,
    },
    #[error("'{kind}' needs numeric columns, but '{column}' is categorical")]
    TypeMismatch {
        kind: &'static str,
        column: String,
    },
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

/// Build the figure for a plot kind over an ordered column selection.
/// Column order is axis order: x, then y, then the auxiliary channel.
/// Pure: no side effects beyond figure construction.
pub fn dispatch(dataset: &Dataset, kind: PlotKind, columns: &[String]) -> Result<Figure, PlotError> {
    if let Some(expected) = kind.arity() {
        if columns.len() != expected {
            return Err(PlotError::ArityMismatch {
                kind: kind.label(),
                expected,
                got: columns.len(),
            });
        }
    }

    let cols: Vec<&Column> = columns
        .iter()
        .map(|name| {
            dataset
                .column(name)
                .ok_or_else(|| PlotError::UnknownColumn(name.clone()))
        })
        .collect::<Result<_, _>>()?;

    log::debug!("plot '{}' over {columns:?}", kind.label());

    let figure = match kind {
        PlotKind::Histogram => Figure::Histogram {
            x_label: cols[0].name.clone(),
            series: vec![bin_values("", &cols[0].numeric_aligned())],
        },

        PlotKind::Box => Figure::Boxes {
            y_label: cols[0].name.clone(),
            groups: box_stats(&cols[0].name, &cols[0].numeric_aligned())
                .into_iter()
                .collect(),
        },

        PlotKind::Scatter => Figure::Scatter {
            x_label: cols[0].name.clone(),
            y_label: cols[1].name.clone(),
            groups: vec![PointGroup {
                label: None,
                points: paired_points(cols[0], cols[1], false),
            }],
        },

        PlotKind::Line => Figure::Lines {
            x_label: cols[0].name.clone(),
            y_label: cols[1].name.clone(),
            groups: vec![PointGroup {
                label: None,
                points: paired_points(cols[0], cols[1], true),
            }],
        },

        PlotKind::GroupedBox => Figure::Boxes {
            y_label: cols[1].name.clone(),
            groups: grouped_boxes(cols[0], cols[1]),
        },

        PlotKind::ColoredScatter => Figure::Scatter {
            x_label: cols[0].name.clone(),
            y_label: cols[1].name.clone(),
            groups: grouped_points(cols[0], cols[1], cols[2], false),
        },

        PlotKind::GroupedLine => Figure::Lines {
            x_label: cols[0].name.clone(),
            y_label: cols[1].name.clone(),
            groups: grouped_points(cols[0], cols[1], cols[2], true),
        },

        PlotKind::CorrelationHeatmap => heatmap(&cols)?,
    };

    Ok(figure)
}

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

/// Rows where both channels are finite, as (x, y); optionally sorted by x.
fn paired_points(x: &Column, y: &Column, sort: bool) -> Vec<[f64; 2]> {
    let xs = x.numeric_aligned();
    let ys = y.numeric_aligned();
    let mut points: Vec<[f64; 2]> = xs
        .iter()
        .zip(&ys)
        .filter(|(a, b)| a.is_finite() && b.is_finite())
        .map(|(&a, &b)| [a, b])
        .collect();
    if sort {
        points.sort_by(|p, q| p[0].total_cmp(&q[0]));
    }
    points
}

/// Row indices partitioned by a grouping column's value, in value order.
fn partition_rows(by: &Column) -> Vec<(String, Vec<usize>)> {
    let mut groups: BTreeMap<CellValue, Vec<usize>> = BTreeMap::new();
    for (row, value) in by.values.iter().enumerate() {
        groups.entry(value.clone()).or_default().push(row);
    }
    groups
        .into_iter()
        .map(|(value, rows)| (value.to_string(), rows))
        .collect()
}

fn grouped_boxes(by: &Column, y: &Column) -> Vec<BoxGroup> {
    let ys = y.numeric_aligned();
    partition_rows(by)
        .into_iter()
        .filter_map(|(label, rows)| {
            let values: Vec<f64> = rows.iter().map(|&r| ys[r]).collect();
            box_stats(&label, &values)
        })
        .collect()
}

fn grouped_points(x: &Column, y: &Column, by: &Column, sort: bool) -> Vec<PointGroup> {
    let xs = x.numeric_aligned();
    let ys = y.numeric_aligned();
    partition_rows(by)
        .into_iter()
        .map(|(label, rows)| {
            let mut points: Vec<[f64; 2]> = rows
                .iter()
                .map(|&r| [xs[r], ys[r]])
                .filter(|p| p[0].is_finite() && p[1].is_finite())
                .collect();
            if sort {
                points.sort_by(|p, q| p[0].total_cmp(&q[0]));
            }
            PointGroup {
                label: Some(label),
                points,
            }
        })
        .filter(|g| !g.points.is_empty())
        .collect()
}

/// The wildcard plot. The one hard type precondition in the registry:
/// every selected column must classify as Number.
fn heatmap(cols: &[&Column]) -> Result<Figure, PlotError> {
    for col in cols {
        if col.class() != TypeClass::Number {
            return Err(PlotError::TypeMismatch {
                kind: PlotKind::CorrelationHeatmap.label(),
                column: col.name.clone(),
            });
        }
    }

    let series: Vec<Vec<f64>> = cols.iter().map(|c| c.numeric_aligned()).collect();
    Ok(Figure::Heatmap {
        labels: cols.iter().map(|c| c.name.clone()).collect(),
        matrix: stats::correlation_matrix(&series),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::loader::load_bytes;

    fn ds() -> Dataset {
        load_bytes(
            "x,y,group\n1,2.0,a\n2,4.0,b\n3,6.0,a\n4,,b\n5,10.0,a\n".as_bytes(),
        )
        .unwrap()
    }

    fn names(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn every_arity_bucket_also_offers_the_wildcard() {
        for arity in 1..=3 {
            let kinds = kinds_for(arity);
            assert!(kinds.contains(&PlotKind::CorrelationHeatmap));
            for kind in &kinds {
                assert!(kind.arity().is_none() || kind.arity() == Some(arity));
            }
        }
    }

    #[test]
    fn arity_mismatch_is_rejected() {
        let err = dispatch(&ds(), PlotKind::Scatter, &names(&["x", "y", "group"]));
        assert_eq!(
            err,
            Err(PlotError::ArityMismatch {
                kind: "Scatter plot",
                expected: 2,
                got: 3
            })
        );
    }

    #[test]
    fn unknown_column_is_rejected() {
        let err = dispatch(&ds(), PlotKind::Histogram, &names(&["nope"]));
        assert_eq!(err, Err(PlotError::UnknownColumn("nope".into())));
    }

    #[test]
    fn scatter_drops_rows_with_missing_cells() {
        let fig = dispatch(&ds(), PlotKind::Scatter, &names(&["x", "y"])).unwrap();
        let Figure::Scatter { groups, .. } = fig else {
            panic!("expected scatter");
        };
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].points.len(), 4); // row with null y dropped
    }

    #[test]
    fn colored_scatter_partitions_by_third_column() {
        let fig =
            dispatch(&ds(), PlotKind::ColoredScatter, &names(&["x", "y", "group"])).unwrap();
        let Figure::Scatter { groups, .. } = fig else {
            panic!("expected scatter");
        };
        let labels: Vec<_> = groups.iter().map(|g| g.label.clone().unwrap()).collect();
        assert_eq!(labels, vec!["a", "b"]);
        assert_eq!(groups[0].points.len(), 3);
        assert_eq!(groups[1].points.len(), 1);
    }

    #[test]
    fn grouped_box_uses_first_column_as_category() {
        let fig = dispatch(&ds(), PlotKind::GroupedBox, &names(&["group", "y"])).unwrap();
        let Figure::Boxes { groups, y_label } = fig else {
            panic!("expected boxes");
        };
        assert_eq!(y_label, "y");
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].label, "a");
    }

    #[test]
    fn heatmap_requires_all_numeric_columns() {
        let err = dispatch(
            &ds(),
            PlotKind::CorrelationHeatmap,
            &names(&["x", "y", "group"]),
        );
        assert_eq!(
            err,
            Err(PlotError::TypeMismatch {
                kind: "Correlation heatmap",
                column: "group".into()
            })
        );
    }

    #[test]
    fn heatmap_over_numeric_columns_is_symmetric() {
        let fig = dispatch(&ds(), PlotKind::CorrelationHeatmap, &names(&["x", "y"])).unwrap();
        let Figure::Heatmap { labels, matrix } = fig else {
            panic!("expected heatmap");
        };
        assert_eq!(labels, vec!["x", "y"]);
        assert_eq!(matrix[0][1], matrix[1][0]);
        assert!((matrix[0][0] - 1.0).abs() < 1e-12);
        // x and y are exactly linear where both present.
        assert!((matrix[0][1] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn heatmap_is_arity_agnostic() {
        for selection in [vec!["x"], vec!["x", "y"]] {
            assert!(dispatch(&ds(), PlotKind::CorrelationHeatmap, &names(&selection)).is_ok());
        }
    }

    #[test]
    fn line_points_are_sorted_by_x() {
        let shuffled = load_bytes("x,y\n3,1\n1,2\n2,3\n".as_bytes()).unwrap();
        let fig = dispatch(&shuffled, PlotKind::Line, &names(&["x", "y"])).unwrap();
        let Figure::Lines { groups, .. } = fig else {
            panic!("expected lines");
        };
        let xs: Vec<f64> = groups[0].points.iter().map(|p| p[0]).collect();
        assert_eq!(xs, vec![1.0, 2.0, 3.0]);
    }
}
