//! End-to-end exercises of the upload → classify → filter → plot/test flow,
//! driven through `AppState` the way the panels drive it.

use tabula::data::loader::{load_bytes, ParseError};
use tabula::data::model::TypeClass;
use tabula::plot::{self, Figure, PlotError, PlotKind};
use tabula::state::AppState;
use tabula::stats::{self, Alternative, TestKind};

const PATIENTS: &str = "\
age,score,city,enrolled
20,1.5,oslo,true
25,2.5,bergen,true
30,,oslo,false
40,4.0,bergen,true
33,3.1,oslo,false
";

fn session() -> AppState {
    let mut state = AppState::default();
    state.set_dataset(load_bytes(PATIENTS.as_bytes()).unwrap());
    state
}

#[test]
fn type_map_has_one_entry_per_column() {
    let state = session();
    let map = state.dataset.as_ref().unwrap().type_map();
    assert_eq!(map.len(), 4);
    let classes: Vec<TypeClass> = map.iter().map(|(_, _, c)| *c).collect();
    assert_eq!(
        classes,
        vec![
            TypeClass::Number,
            TypeClass::Number,
            TypeClass::Category,
            TypeClass::Category,
        ]
    );
}

#[test]
fn failed_upload_leaves_the_holder_empty() {
    let mut state = session();
    assert!(state.dataset.is_some());

    let blob: &[u8] = &[0x1f, 0x8b, 0xff, 0x00, 0xfe, 0x80];
    match load_bytes(blob) {
        Err(ParseError::Csv(_)) => state.load_failed("Error: bad upload".into()),
        other => panic!("expected parse error, got {other:?}"),
    }

    assert!(state.dataset.is_none());
    assert!(state.active().is_none());
    assert!(state.status_message.is_some());
}

#[test]
fn filter_then_plot_uses_the_narrowed_view() {
    let mut state = session();
    state.query = "city == 'oslo'".into();
    state.apply_query();
    assert_eq!(state.active().unwrap().n_rows(), 3);

    state.plot.arity = 2;
    state.sync_plot_columns();
    state.plot.columns = vec!["age".into(), "score".into()];
    state.plot.kind = PlotKind::Scatter;
    state.run_plot();

    let Some(Figure::Scatter { groups, .. }) = &state.plot.figure else {
        panic!("expected a scatter figure");
    };
    // Three oslo rows, one of them with a missing score.
    assert_eq!(groups[0].points.len(), 2);
}

#[test]
fn query_applies_before_type_validation() {
    // The type map is load-time state: filtering down to zero rows does not
    // change a column's class, and the heatmap precondition still fires on
    // the filtered view.
    let mut state = session();
    state.query = "age > 100".into();
    state.apply_query();
    assert_eq!(state.active().unwrap().n_rows(), 0);

    state.plot.arity = 2;
    state.sync_plot_columns();
    state.plot.columns = vec!["age".into(), "city".into()];
    state.plot.kind = PlotKind::CorrelationHeatmap;
    state.run_plot();
    assert!(state.plot.figure.is_none());
    assert!(state.plot.error.as_deref().unwrap().contains("city"));
}

#[test]
fn zero_match_filter_is_not_an_error() {
    let mut state = session();
    state.query = "age > 100".into();
    state.apply_query();
    assert!(state.query_error.is_none());
    let view = state.view.as_ref().unwrap();
    assert_eq!(view.n_rows(), 0);
    assert_eq!(view.n_cols(), 4);
}

#[test]
fn arity_mismatch_is_rejected_without_a_figure() {
    let ds = load_bytes(PATIENTS.as_bytes()).unwrap();
    let selection: Vec<String> = vec!["age".into(), "score".into(), "city".into()];
    let err = plot::dispatch(&ds, PlotKind::Scatter, &selection);
    assert!(matches!(err, Err(PlotError::ArityMismatch { .. })));
}

#[test]
fn welch_scenario_from_missing_value_columns() {
    // age: 20,25,30,NaN and score: 1.5,2.5,NaN,4.0 → both samples length 3
    // after dropping missing values.
    let ds = load_bytes("age,score\n20,1.5\n25,2.5\n30,\nNaN,4.0\n".as_bytes()).unwrap();
    let age = ds.column("age").unwrap().numeric_clean();
    let score = ds.column("score").unwrap().numeric_clean();
    assert_eq!(age.len(), 3);
    assert_eq!(score.len(), 3);

    let report = stats::dispatch(TestKind::WelchT, &age, &score, Alternative::TwoSided).unwrap();
    assert!((0.0..=1.0).contains(&report.p_value));
    if report.p_value >= 0.05 {
        assert!(!report.reject);
    }
}

#[test]
fn ab_test_panel_flow_with_mann_whitney() {
    let mut state = session();
    state.test.kind = TestKind::MannWhitneyU;
    state.test.alternative = Alternative::TwoSided;
    state.test.column_a = Some("score".into());
    state.test.column_b = Some("score".into());
    state.test.query_a = "city == 'oslo'".into();
    state.test.query_b = "city == 'bergen'".into();
    state.run_test();

    let report = state.test.report.as_ref().expect("report");
    assert_eq!(report.kind, TestKind::MannWhitneyU);
    assert!((0.0..=1.0).contains(&report.p_value));
    assert!(state.test.error.is_none());
}

#[test]
fn retry_after_every_error_class() {
    let mut state = session();

    // FilterError, then a corrected query.
    state.query = "nope == 1".into();
    state.apply_query();
    assert!(state.query_error.is_some());
    state.query = "age >= 20".into();
    state.apply_query();
    assert!(state.query_error.is_none());

    // PlotError, then a corrected selection.
    state.plot.arity = 1;
    state.sync_plot_columns();
    state.plot.columns = vec!["city".into()];
    state.plot.kind = PlotKind::CorrelationHeatmap;
    state.run_plot();
    assert!(state.plot.error.is_some());
    state.plot.columns = vec!["age".into()];
    state.run_plot();
    assert!(state.plot.error.is_none());
    assert!(state.plot.figure.is_some());

    // TestError, then corrected samples.
    state.test.column_a = Some("score".into());
    state.test.column_b = Some("score".into());
    state.test.query_a = "age > 100".into();
    state.run_test();
    assert!(state.test.error.is_some());
    state.test.query_a = String::new();
    state.run_test();
    assert!(state.test.error.is_none());
    assert!(state.test.report.is_some());
}
