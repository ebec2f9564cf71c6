use crate::data::model::Dataset;
use crate::data::query;
use crate::plot::{self, Figure, PlotKind};
use crate::stats::{self, Alternative, TestKind, TestReport};

// ---------------------------------------------------------------------------
// Panel selections
// ---------------------------------------------------------------------------

/// Everything the Plot panel has picked: arity, ordered columns (x, y,
/// auxiliary), kind, and the last dispatch outcome.
pub struct PlotSelection {
    pub arity: usize,
    pub columns: Vec<String>,
    pub kind: PlotKind,
    pub figure: Option<Figure>,
    pub error: Option<String>,
}

impl Default for PlotSelection {
    fn default() -> Self {
        Self {
            arity: 1,
            columns: Vec::new(),
            kind: PlotKind::Histogram,
            figure: None,
            error: None,
        }
    }
}

/// The A/B-test panel: two named column selections, each with its own row
/// query, plus the chosen test and alternative.
pub struct TestSelection {
    pub kind: TestKind,
    pub alternative: Alternative,
    pub column_a: Option<String>,
    pub column_b: Option<String>,
    pub query_a: String,
    pub query_b: String,
    pub report: Option<TestReport>,
    pub error: Option<String>,
}

impl Default for TestSelection {
    fn default() -> Self {
        Self {
            kind: TestKind::WelchT,
            alternative: Alternative::TwoSided,
            column_a: None,
            column_b: None,
            query_a: String::new(),
            query_b: String::new(),
            report: None,
            error: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full UI state, independent of rendering.
#[derive(Default)]
pub struct AppState {
    /// Loaded dataset (None until a file parses successfully).
    pub dataset: Option<Dataset>,

    /// Row-filter query text and the filtered view it produced.
    pub query: String,
    pub view: Option<Dataset>,
    pub query_error: Option<String>,

    /// Panel toggles.
    pub show_info: bool,
    pub show_plot: bool,
    pub show_test: bool,

    pub plot: PlotSelection,
    pub test: TestSelection,

    /// Status / error message shown in the top bar.
    pub status_message: Option<String>,
}

impl AppState {
    /// Ingest a newly loaded dataset, resetting every selection.
    pub fn set_dataset(&mut self, dataset: Dataset) {
        self.query.clear();
        self.view = None;
        self.query_error = None;
        self.plot = PlotSelection::default();
        self.test = TestSelection::default();
        self.status_message = None;
        self.dataset = Some(dataset);
        self.sync_plot_columns();
    }

    /// A failed parse empties the holder; nothing survives partially.
    pub fn load_failed(&mut self, message: String) {
        self.dataset = None;
        self.view = None;
        self.query_error = None;
        self.plot = PlotSelection::default();
        self.test = TestSelection::default();
        self.status_message = Some(message);
    }

    /// The dataset the panels operate on: the filtered view when a query
    /// has been applied, the full dataset otherwise.
    pub fn active(&self) -> Option<&Dataset> {
        self.view.as_ref().or(self.dataset.as_ref())
    }

    /// Apply the row-filter query to the *loaded* dataset. On failure the
    /// previous view stays in place, untouched.
    pub fn apply_query(&mut self) {
        let Some(dataset) = &self.dataset else {
            return;
        };
        match query::apply(dataset, &self.query) {
            Ok(view) => {
                self.view = Some(view);
                self.query_error = None;
            }
            Err(e) => {
                log::warn!("query rejected: {e}");
                self.query_error = Some(e.to_string());
            }
        }
    }

    /// Keep the plot column slots sized to the arity and pointing at real
    /// columns, and the kind inside the current arity bucket.
    pub fn sync_plot_columns(&mut self) {
        let names = match self.active() {
            Some(dataset) => dataset.column_names(),
            None => return,
        };
        let Some(first) = names.first().cloned() else {
            return;
        };

        self.plot.columns.resize(self.plot.arity, first);
        for slot in &mut self.plot.columns {
            if !names.contains(slot) {
                slot.clone_from(&names[0]);
            }
        }

        if !plot::kinds_for(self.plot.arity).contains(&self.plot.kind) {
            self.plot.kind = plot::kinds_for(self.plot.arity)[0];
        }
    }

    /// Dispatch the selected plot against the active (filtered) view.
    pub fn run_plot(&mut self) {
        let Some(dataset) = self.active() else {
            return;
        };
        match plot::dispatch(dataset, self.plot.kind, &self.plot.columns) {
            Ok(figure) => {
                self.plot.figure = Some(figure);
                self.plot.error = None;
            }
            Err(e) => {
                log::warn!("plot rejected: {e}");
                self.plot.error = Some(e.to_string());
            }
        }
    }

    /// Run the selected two-sample test. Each sample comes from its named
    /// column after its own row query over the active view.
    pub fn run_test(&mut self) {
        let Some(dataset) = self.active() else {
            return;
        };

        let result = Self::collect_sample(dataset, &self.test.column_a, &self.test.query_a)
            .and_then(|a| {
                Self::collect_sample(dataset, &self.test.column_b, &self.test.query_b)
                    .map(|b| (a, b))
            })
            .and_then(|(a, b)| {
                stats::dispatch(self.test.kind, &a, &b, self.test.alternative)
                    .map_err(|e| e.to_string())
            });

        match result {
            Ok(report) => {
                self.test.report = Some(report);
                self.test.error = None;
            }
            Err(message) => {
                log::warn!("test rejected: {message}");
                self.test.error = Some(message);
            }
        }
    }

    fn collect_sample(
        dataset: &Dataset,
        column: &Option<String>,
        query_text: &str,
    ) -> Result<Vec<f64>, String> {
        let name = column.as_deref().ok_or("select a column for each sample")?;
        let filtered = query::apply(dataset, query_text).map_err(|e| e.to_string())?;
        let col = filtered
            .column(name)
            .ok_or_else(|| format!("unknown column '{name}'"))?;
        Ok(col.numeric_clean())
    }
}
