use std::hash::Hash;
use std::path::Path;

use anyhow::Context;
use eframe::egui::{self, Color32, RichText, ScrollArea, Slider, TextEdit, Ui};
use egui_extras::{Column as TableColumn, TableBuilder};

use crate::data::loader;
use crate::data::model::{Dataset, TypeClass};
use crate::plot;
use crate::state::AppState;
use crate::stats::{Alternative, TestKind};
use crate::ui::plot::figure_view;

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open…").clicked() {
                open_file_dialog(state);
                ui.close_menu();
            }
        });

        ui.separator();

        if let Some(ds) = &state.dataset {
            let visible = state.view.as_ref().map_or(ds.n_rows(), Dataset::n_rows);
            ui.label(format!(
                "{} columns × {} rows loaded, {} in view",
                ds.n_cols(),
                ds.n_rows(),
                visible
            ));
        }

        if let Some(msg) = &state.status_message {
            ui.separator();
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
}

// ---------------------------------------------------------------------------
// File dialog
// ---------------------------------------------------------------------------

pub fn open_file_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Open tabular data")
        .add_filter("CSV", &["csv"])
        .pick_file();

    if let Some(path) = file {
        match load_with_context(&path) {
            Ok(dataset) => {
                log::info!(
                    "Loaded {} rows with columns {:?}",
                    dataset.n_rows(),
                    dataset.column_names()
                );
                state.set_dataset(dataset);
            }
            Err(e) => {
                log::error!("Failed to load file: {e:#}");
                state.load_failed(format!("Error: {e:#}"));
            }
        }
    }
}

fn load_with_context(path: &Path) -> anyhow::Result<Dataset> {
    loader::load_file(path).with_context(|| format!("loading {}", path.display()))
}

// ---------------------------------------------------------------------------
// Left control panel
// ---------------------------------------------------------------------------

/// Render the left panel: row filter, panel toggles, plot and test controls.
pub fn control_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Explore");
    ui.separator();

    if state.dataset.is_none() {
        ui.label("No dataset loaded.");
        return;
    }

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            query_section(ui, state);
            ui.separator();

            ui.checkbox(&mut state.show_info, "Info");
            ui.checkbox(&mut state.show_plot, "Plot");
            ui.checkbox(&mut state.show_test, "A/B test");

            if state.show_plot {
                ui.separator();
                plot_section(ui, state);
            }

            if state.show_test {
                ui.separator();
                test_section(ui, state);
            }
        });
}

fn query_section(ui: &mut Ui, state: &mut AppState) {
    ui.strong("Row filter");
    ui.add(
        TextEdit::singleline(&mut state.query)
            .hint_text("e.g.  age > 30 and city == 'oslo'")
            .desired_width(f32::INFINITY),
    );
    if ui.button("Apply filter").clicked() {
        state.apply_query();
        state.sync_plot_columns();
    }
    if let Some(err) = &state.query_error {
        ui.label(RichText::new(err).color(Color32::RED));
    }
}

fn plot_section(ui: &mut Ui, state: &mut AppState) {
    ui.strong("Plot");

    let names = match state.active() {
        Some(ds) => ds.column_names(),
        None => return,
    };

    if ui
        .add(Slider::new(&mut state.plot.arity, 1..=3).text("columns"))
        .changed()
    {
        state.sync_plot_columns();
    }

    // One combo per column slot; each carries a deterministic identity
    // derived from its slot index, so recurring selectors never collide.
    for i in 0..state.plot.columns.len() {
        let mut chosen = state.plot.columns[i].clone();
        if value_combo(
            ui,
            ("plot_col", i),
            &format!("Column {}", i + 1),
            &names,
            &mut chosen,
            |n| n.clone(),
        ) {
            state.plot.columns[i] = chosen;
        }
    }

    let kinds = plot::kinds_for(state.plot.arity);
    value_combo(ui, "plot_kind", "Type of plot", &kinds, &mut state.plot.kind, |k| {
        k.label().to_string()
    });

    if ui.button("Plot!").clicked() {
        state.run_plot();
    }
    if let Some(err) = &state.plot.error {
        ui.label(RichText::new(err).color(Color32::RED));
    }
}

fn test_section(ui: &mut Ui, state: &mut AppState) {
    ui.strong("A/B test");

    // Only Number-classed columns are suggested for samples.
    let numeric: Vec<String> = match state.active() {
        Some(ds) => ds
            .columns()
            .iter()
            .filter(|c| c.class() == TypeClass::Number)
            .map(|c| c.name.clone())
            .collect(),
        None => return,
    };
    if numeric.is_empty() {
        ui.label("No numeric columns in this dataset.");
        return;
    }

    value_combo(
        ui,
        "test_kind",
        "Test",
        &TestKind::ALL,
        &mut state.test.kind,
        |k| k.name().to_string(),
    );
    value_combo(
        ui,
        "test_alt",
        "Alternative",
        &Alternative::ALL,
        &mut state.test.alternative,
        |a| a.label().to_string(),
    );

    for (slot, column, query_text) in [
        ("a", &mut state.test.column_a, &mut state.test.query_a),
        ("b", &mut state.test.column_b, &mut state.test.query_b),
    ] {
        let mut chosen = column.clone().unwrap_or_else(|| numeric[0].clone());
        value_combo(
            ui,
            ("test_col", slot),
            &format!("Sample {}", slot.to_uppercase()),
            &numeric,
            &mut chosen,
            |n| n.clone(),
        );
        *column = Some(chosen);

        ui.add(
            TextEdit::singleline(query_text)
                .hint_text(format!("rows for sample {slot} (optional)"))
                .desired_width(f32::INFINITY),
        );
    }

    if ui.button("Run test").clicked() {
        state.run_test();
    }
    if let Some(err) = &state.test.error {
        ui.label(RichText::new(err).color(Color32::RED));
    }
}

/// Labeled combo box over a slice of values. The `id` must be unique and
/// deterministic per call site. Returns true when the selection changed.
fn value_combo<T: PartialEq + Clone>(
    ui: &mut Ui,
    id: impl Hash,
    label: &str,
    options: &[T],
    current: &mut T,
    display: impl Fn(&T) -> String,
) -> bool {
    let mut changed = false;
    ui.horizontal(|ui: &mut Ui| {
        ui.label(label);
        egui::ComboBox::from_id_salt(id)
            .selected_text(display(current))
            .show_ui(ui, |ui: &mut Ui| {
                for option in options {
                    if ui
                        .selectable_label(*current == *option, display(option))
                        .clicked()
                    {
                        *current = option.clone();
                        changed = true;
                    }
                }
            });
    });
    changed
}

// ---------------------------------------------------------------------------
// Central panel
// ---------------------------------------------------------------------------

/// Render the central panel: info table, test report, current figure.
pub fn central_view(ui: &mut Ui, state: &AppState) {
    if state.dataset.is_none() {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading("Open a CSV file to explore it  (File → Open…)");
        });
        return;
    }

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            if state.show_info {
                if let Some(ds) = state.active() {
                    info_table(ui, ds);
                    ui.separator();
                }
            }

            if state.show_test {
                if let Some(report) = &state.test.report {
                    let color = if report.reject {
                        Color32::LIGHT_RED
                    } else {
                        Color32::LIGHT_GREEN
                    };
                    ui.label(RichText::new(report.to_string()).color(color).strong());
                    ui.separator();
                }
            }

            if state.show_plot {
                if let Some(figure) = &state.plot.figure {
                    figure_view(ui, figure);
                }
            }
        });
}

/// Info panel: one row per column with its declared dtype and its
/// Number/Category classification.
fn info_table(ui: &mut Ui, dataset: &Dataset) {
    TableBuilder::new(ui)
        .striped(true)
        .column(TableColumn::auto().at_least(140.0))
        .column(TableColumn::auto().at_least(90.0))
        .column(TableColumn::remainder())
        .header(20.0, |mut header| {
            header.col(|ui| {
                ui.strong("Column");
            });
            header.col(|ui| {
                ui.strong("Type");
            });
            header.col(|ui| {
                ui.strong("Cat/Num");
            });
        })
        .body(|mut body| {
            for (name, dtype, class) in dataset.type_map() {
                body.row(18.0, |mut row| {
                    row.col(|ui| {
                        ui.label(name);
                    });
                    row.col(|ui| {
                        ui.label(dtype.name());
                    });
                    row.col(|ui| {
                        ui.label(class.to_string());
                    });
                });
            }
        });
}
