use eframe::egui;

use crate::config::Settings;
use crate::state::{AppState, RELOAD_INTERVAL};
use crate::ui::panels;

// ---------------------------------------------------------------------------
// eframe App implementation
// ---------------------------------------------------------------------------

pub struct DataMeasurementsApp {
    pub state: AppState,
}

impl DataMeasurementsApp {
    pub fn new(settings: Settings) -> Self {
        Self {
            state: AppState::new(settings),
        }
    }
}

impl eframe::App for DataMeasurementsApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let catalog = self.state.catalog();

        // ---- Background loads and requests ----
        if let Some(catalog) = &catalog {
            if self.state.refresh(catalog) {
                ctx.request_repaint_after(std::time::Duration::from_millis(100));
            } else {
                // Wake up to look for caches written in the meantime.
                ctx.request_repaint_after(RELOAD_INTERVAL);
            }
        }

        // ---- Top panel: menu bar ----
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            panels::top_bar(ui, &mut self.state, catalog.as_ref());
        });

        // ---- Left side panel: dataset selection ----
        egui::SidePanel::left("selection_panel")
            .default_width(260.0)
            .resizable(true)
            .show(ctx, |ui| {
                panels::side_panel(ui, &mut self.state, catalog.as_ref());
            });

        // ---- Central panel: measurements ----
        egui::CentralPanel::default().show(ctx, |ui| {
            panels::central_panel(ui, &mut self.state, catalog.as_ref());
        });
    }
}
