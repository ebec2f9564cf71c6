use eframe::egui::{Align2, Color32, FontId, Sense, Stroke, Ui, Vec2};
use egui_plot::{Bar, BarChart, BoxElem, BoxPlot, BoxSpread, Legend, Line, Plot, PlotPoints, Points};

use crate::color::{diverging_color, generate_palette};
use crate::plot::figure::{BoxGroup, Figure, HistSeries, PointGroup};

// ---------------------------------------------------------------------------
// Figure rendering (central panel)
// ---------------------------------------------------------------------------

/// Render a dispatched figure. All chart data was computed at dispatch
/// time; this function only translates it into egui_plot elements.
pub fn figure_view(ui: &mut Ui, figure: &Figure) {
    match figure {
        Figure::Histogram { x_label, series } => histogram_view(ui, x_label, series),
        Figure::Scatter {
            x_label,
            y_label,
            groups,
        } => scatter_view(ui, x_label, y_label, groups),
        Figure::Lines {
            x_label,
            y_label,
            groups,
        } => lines_view(ui, x_label, y_label, groups),
        Figure::Boxes { y_label, groups } => boxes_view(ui, y_label, groups),
        Figure::Heatmap { labels, matrix } => heatmap_view(ui, labels, matrix),
    }
}

fn histogram_view(ui: &mut Ui, x_label: &str, series: &[HistSeries]) {
    let palette = generate_palette(series.len());

    Plot::new("figure_histogram")
        .legend(Legend::default())
        .x_axis_label(x_label)
        .y_axis_label("count")
        .show(ui, |plot_ui| {
            for (i, s) in series.iter().enumerate() {
                let bars: Vec<Bar> = s
                    .bins
                    .iter()
                    .map(|&(center, count)| {
                        Bar::new(center, count as f64).width(s.bin_width * 0.95)
                    })
                    .collect();
                let mut chart = BarChart::new(bars).color(palette[i]);
                if !s.label.is_empty() {
                    chart = chart.name(&s.label);
                }
                plot_ui.bar_chart(chart);
            }
        });
}

fn scatter_view(ui: &mut Ui, x_label: &str, y_label: &str, groups: &[PointGroup]) {
    let palette = generate_palette(groups.len());

    Plot::new("figure_scatter")
        .legend(Legend::default())
        .x_axis_label(x_label)
        .y_axis_label(y_label)
        .show(ui, |plot_ui| {
            for (i, group) in groups.iter().enumerate() {
                let points: PlotPoints = group.points.iter().copied().collect();
                let mut marks = Points::new(points).radius(2.5).color(palette[i]);
                if let Some(label) = &group.label {
                    marks = marks.name(label);
                }
                plot_ui.points(marks);
            }
        });
}

fn lines_view(ui: &mut Ui, x_label: &str, y_label: &str, groups: &[PointGroup]) {
    let palette = generate_palette(groups.len());

    Plot::new("figure_lines")
        .legend(Legend::default())
        .x_axis_label(x_label)
        .y_axis_label(y_label)
        .show(ui, |plot_ui| {
            for (i, group) in groups.iter().enumerate() {
                let points: PlotPoints = group.points.iter().copied().collect();
                let mut line = Line::new(points).color(palette[i]).width(1.5);
                if let Some(label) = &group.label {
                    line = line.name(label);
                }
                plot_ui.line(line);
            }
        });
}

fn boxes_view(ui: &mut Ui, y_label: &str, groups: &[BoxGroup]) {
    let palette = generate_palette(groups.len());

    Plot::new("figure_boxes")
        .legend(Legend::default())
        .y_axis_label(y_label)
        .show(ui, |plot_ui| {
            for (i, group) in groups.iter().enumerate() {
                let spread = BoxSpread::new(
                    group.min,
                    group.q1,
                    group.median,
                    group.q3,
                    group.max,
                );
                let elem = BoxElem::new(i as f64, spread)
                    .box_width(0.5)
                    .fill(palette[i].gamma_multiply(0.4))
                    .stroke(Stroke::new(1.5, palette[i]));
                plot_ui.box_plot(BoxPlot::new(vec![elem]).name(&group.label));
            }
        });
}

/// Painted cell grid: egui_plot has no matrix primitive, so the heatmap is
/// drawn directly with the painter.
fn heatmap_view(ui: &mut Ui, labels: &[String], matrix: &[Vec<f64>]) {
    let n = labels.len();
    if n == 0 {
        return;
    }

    let left_margin = 90.0_f32;
    let top_margin = 24.0_f32;
    let avail = ui.available_size();
    let side = (avail.x - left_margin)
        .min(avail.y - top_margin)
        .clamp(120.0, 560.0);
    let cell = side / n as f32;

    let (response, painter) = ui.allocate_painter(
        Vec2::new(left_margin + side, top_margin + side),
        Sense::hover(),
    );
    let origin = response.rect.min + Vec2::new(left_margin, top_margin);
    let font = FontId::proportional(11.0);

    for (i, row) in matrix.iter().enumerate() {
        for (j, &r) in row.iter().enumerate() {
            let min = origin + Vec2::new(j as f32 * cell, i as f32 * cell);
            let rect = eframe::egui::Rect::from_min_size(min, Vec2::splat(cell - 1.0));
            painter.rect_filled(rect, 2.0, diverging_color(r));

            let text = if r.is_finite() {
                format!("{r:.2}")
            } else {
                "–".to_string()
            };
            painter.text(
                rect.center(),
                Align2::CENTER_CENTER,
                text,
                font.clone(),
                Color32::BLACK,
            );
        }
    }

    for (i, label) in labels.iter().enumerate() {
        // Row labels, right-aligned against the grid.
        painter.text(
            origin + Vec2::new(-6.0, (i as f32 + 0.5) * cell),
            Align2::RIGHT_CENTER,
            label,
            font.clone(),
            ui.visuals().text_color(),
        );
        // Column labels along the top.
        painter.text(
            origin + Vec2::new((i as f32 + 0.5) * cell, -4.0),
            Align2::CENTER_BOTTOM,
            label,
            font.clone(),
            ui.visuals().text_color(),
        );
    }
}
