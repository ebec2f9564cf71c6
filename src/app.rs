use eframe::egui;

use crate::state::AppState;
use crate::ui::panels;

// ---------------------------------------------------------------------------
// eframe App implementation
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct TabulaApp {
    pub state: AppState,
}

impl eframe::App for TabulaApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // ---- Top panel: menu bar ----
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            panels::top_bar(ui, &mut self.state);
        });

        // ---- Left side panel: filter / plot / test controls ----
        egui::SidePanel::left("control_panel")
            .default_width(280.0)
            .resizable(true)
            .show(ctx, |ui| {
                panels::control_panel(ui, &mut self.state);
            });

        // ---- Central panel: info table, test report, figure ----
        egui::CentralPanel::default().show(ctx, |ui| {
            panels::central_view(ui, &self.state);
        });
    }
}
