// ---------------------------------------------------------------------------
// Figure – renderer-independent chart data
// ---------------------------------------------------------------------------

/// The output of a successful plot dispatch: plain data the UI layer turns
/// into egui_plot elements. Keeping figures free of rendering state makes
/// dispatch a pure, testable function.
#[derive(Debug, Clone, PartialEq)]
pub enum Figure {
    Histogram {
        x_label: String,
        series: Vec<HistSeries>,
    },
    Scatter {
        x_label: String,
        y_label: String,
        groups: Vec<PointGroup>,
    },
    Lines {
        x_label: String,
        y_label: String,
        groups: Vec<PointGroup>,
    },
    Boxes {
        y_label: String,
        groups: Vec<BoxGroup>,
    },
    Heatmap {
        labels: Vec<String>,
        matrix: Vec<Vec<f64>>,
    },
}

/// One histogram series: equal-width bins over the value range.
#[derive(Debug, Clone, PartialEq)]
pub struct HistSeries {
    /// Legend label; empty for a single unsplit series.
    pub label: String,
    pub bin_width: f64,
    /// (bin center, count) pairs.
    pub bins: Vec<(f64, usize)>,
}

/// One scatter/line series; `label` is None for ungrouped data.
#[derive(Debug, Clone, PartialEq)]
pub struct PointGroup {
    pub label: Option<String>,
    pub points: Vec<[f64; 2]>,
}

/// Five-number summary for one box.
#[derive(Debug, Clone, PartialEq)]
pub struct BoxGroup {
    pub label: String,
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
}

// ---------------------------------------------------------------------------
// Construction helpers
// ---------------------------------------------------------------------------

/// Bin finite values into `⌈1 + log2 n⌉` equal-width bins (Sturges).
pub fn bin_values(label: &str, values: &[f64]) -> HistSeries {
    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.is_empty() {
        return HistSeries {
            label: label.to_string(),
            bin_width: 1.0,
            bins: Vec::new(),
        };
    }

    let min = finite.iter().copied().fold(f64::INFINITY, f64::min);
    let max = finite.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let n_bins = ((finite.len() as f64).log2().ceil() as usize + 1).max(1);

    if max == min {
        return HistSeries {
            label: label.to_string(),
            bin_width: 1.0,
            bins: vec![(min, finite.len())],
        };
    }

    let width = (max - min) / n_bins as f64;
    let mut counts = vec![0usize; n_bins];
    for v in &finite {
        let idx = (((v - min) / width) as usize).min(n_bins - 1);
        counts[idx] += 1;
    }

    HistSeries {
        label: label.to_string(),
        bin_width: width,
        bins: counts
            .into_iter()
            .enumerate()
            .map(|(i, count)| (min + (i as f64 + 0.5) * width, count))
            .collect(),
    }
}

/// Five-number summary of the finite values, or None when empty.
/// Quartiles use linear interpolation between order statistics.
pub fn box_stats(label: &str, values: &[f64]) -> Option<BoxGroup> {
    let mut finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.is_empty() {
        return None;
    }
    finite.sort_by(f64::total_cmp);

    Some(BoxGroup {
        label: label.to_string(),
        min: finite[0],
        q1: quantile(&finite, 0.25),
        median: quantile(&finite, 0.5),
        q3: quantile(&finite, 0.75),
        max: finite[finite.len() - 1],
    })
}

fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    if lo == hi {
        sorted[lo]
    } else {
        let frac = pos - lo as f64;
        sorted[lo] * (1.0 - frac) + sorted[hi] * frac
    }
}
