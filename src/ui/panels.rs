use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};
use egui_extras::{Size, StripBuilder};

use crate::data::catalog::DatasetCatalog;
use crate::state::{AppState, ColumnState, ColumnView, Selection, column_view};
use crate::ui::widgets;

// ---------------------------------------------------------------------------
// Left side panel – mode toggles and dataset selection
// ---------------------------------------------------------------------------

fn sidebar_header(ui: &mut Ui) {
    ui.heading("Data Measurements Tool");
    ui.label(
        "Explore descriptive statistics of text datasets: vocabulary, lengths, \
         duplicates, label balance, word associations and clusters.",
    );
    ui.separator();
}

/// Index picker over `options`; returns true when the choice changed.
fn picker(ui: &mut Ui, id: String, label: &str, options: &[String], selected: &mut usize) -> bool {
    let before = *selected;
    ui.label(label);
    egui::ComboBox::from_id_salt(id)
        .width(ui.available_width())
        .selected_text(options.get(*selected).cloned().unwrap_or_default())
        .show_ui(ui, |ui: &mut Ui| {
            for (i, option) in options.iter().enumerate() {
                ui.selectable_value(selected, i, option);
            }
        });
    before != *selected
}

/// One block of dataset / config / split / text field pickers.
fn sidebar_selection(ui: &mut Ui, catalog: &DatasetCatalog, selection: &mut Selection, column_id: &str) {
    ui.strong(format!("Choose dataset and field{column_id}"));

    let names = catalog.list_datasets();
    if picker(ui, format!("dataset{column_id}"), "Dataset", &names, &mut selection.dataset) {
        *selection = Selection {
            dataset: selection.dataset,
            ..Selection::default()
        };
    }
    let Some(ds) = catalog.datasets.get(selection.dataset) else {
        return;
    };

    let configs: Vec<String> = ds.configs.iter().map(|c| c.name.clone()).collect();
    if picker(ui, format!("config{column_id}"), "Dataset config", &configs, &mut selection.config) {
        selection.split = 0;
        selection.text_field = 0;
    }
    let Some(cfg) = ds.configs.get(selection.config) else {
        return;
    };

    picker(ui, format!("split{column_id}"), "Split", &cfg.split_names(), &mut selection.split);
    let fields: Vec<String> = cfg.text_fields.iter().map(|f| f.join(".")).collect();
    picker(ui, format!("text_field{column_id}"), "Text field", &fields, &mut selection.text_field);
    ui.separator();
}

/// Render the left sidebar.
pub fn side_panel(ui: &mut Ui, state: &mut AppState, catalog: Option<&DatasetCatalog>) {
    sidebar_header(ui);

    if ui.checkbox(&mut state.compare_mode, "Comparison mode").changed() {
        log::warn!(
            "Using {}",
            if state.compare_mode { "Comparison Mode" } else { "Single Dataset Mode" }
        );
    }
    ui.checkbox(&mut state.show_embeddings, "Show text clusters");
    ui.separator();

    let Some(catalog) = catalog else {
        ui.label("No dataset catalog loaded.");
        return;
    };
    if catalog.datasets.is_empty() {
        ui.label("The catalog lists no datasets.");
        return;
    }

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            for idx in 0..state.active_columns() {
                let column_id = state.column_id(idx);
                sidebar_selection(ui, catalog, &mut state.columns[idx].selection, column_id);
            }
        });
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState, catalog: Option<&DatasetCatalog>) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open catalog…").clicked() {
                open_catalog_dialog(state);
                ui.close_menu();
            }
        });

        ui.separator();

        if let Some(catalog) = catalog {
            ui.label(format!(
                "{} datasets in {}",
                catalog.datasets.len(),
                state.catalog.path().display()
            ));
        }

        if state.columns.iter().any(ColumnState::is_loading) {
            ui.separator();
            ui.spinner();
            ui.label("Loading measurements…");
        }

        if let Some(msg) = &state.status_message {
            ui.separator();
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
}

// ---------------------------------------------------------------------------
// Central panel – one or two result columns
// ---------------------------------------------------------------------------

/// Render the result columns: 10 : 1 : 10 in comparison mode.
pub fn central_panel(ui: &mut Ui, state: &mut AppState, catalog: Option<&DatasetCatalog>) {
    let Some(catalog) = catalog else {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading("Open a dataset catalog to start  (File → Open catalog…)");
        });
        return;
    };

    if !state.compare_mode {
        ScrollArea::vertical().id_salt("column").show(ui, |ui: &mut Ui| {
            display_or_compute(ui, state, catalog, 0);
        });
        return;
    }

    StripBuilder::new(ui)
        .size(Size::relative(10.0 / 21.0))
        .size(Size::relative(1.0 / 21.0))
        .size(Size::remainder())
        .horizontal(|mut strip| {
            strip.cell(|ui: &mut Ui| {
                ScrollArea::vertical().id_salt("column A").show(ui, |ui: &mut Ui| {
                    display_or_compute(ui, state, catalog, 0);
                });
            });
            strip.empty();
            strip.cell(|ui: &mut Ui| {
                ScrollArea::vertical().id_salt("column B").show(ui, |ui: &mut Ui| {
                    display_or_compute(ui, state, catalog, 1);
                });
            });
        });
}

/// Results when the cache is complete, a notice when it is partial, and the
/// compute request form when there is no cache at all.
fn display_or_compute(ui: &mut Ui, state: &mut AppState, catalog: &DatasetCatalog, idx: usize) {
    let column_id = state.column_id(idx);
    let show_embeddings = state.show_embeddings;
    let server_url = state.settings.server_url.clone();
    let col = &mut state.columns[idx];

    let Some(measures) = col.measures() else {
        ui.spinner();
        return;
    };
    let view = column_view(measures.cache_exists, measures.dstats.complete());
    let args = measures.dstats.args.clone();

    match view {
        ColumnView::Results => {
            let entry = catalog.dataset(&args.dset_name);
            let mut pair = col.npmi_pair;
            if let Some(measures) = col.measures() {
                widgets::show_column(ui, measures, entry, show_embeddings, &mut pair, column_id);
            }
            col.npmi_pair = pair;
        }
        ColumnView::CheckBackLater => {
            ui.heading(widgets::column_title(&args, column_id));
            ui.label("Check back later for data measurement results!");
        }
        ColumnView::RequestCompute => {
            ui.heading(widgets::column_title(&args, column_id));
            let form = &mut col.form;
            if !form.sent {
                ui.label(
                    "We are missing pre-computed data measures for this configuration. \
                     Enter your email. Our app will compute the measurements and email you when done!",
                );
                if ui
                    .add(egui::TextEdit::singleline(&mut form.email).hint_text("you@example.com"))
                    .changed()
                {
                    form.email_changed();
                }
                let clicked = ui.button("Compute Measurements").clicked();
                if let Some(feedback) = form.handle_input(clicked, &args, server_url.as_deref()) {
                    ui.label(RichText::new(feedback).color(Color32::RED));
                }
            }
            if let Some(message) = &form.message {
                ui.label(message);
            } else if form.sent {
                ui.spinner();
            }
        }
    }
}

// ---------------------------------------------------------------------------
// File dialog
// ---------------------------------------------------------------------------

pub fn open_catalog_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Open dataset catalog")
        .add_filter("Catalog", &["json"])
        .pick_file();

    if let Some(path) = file {
        log::info!("Opening catalog {}", path.display());
        state.open_catalog(path);
    }
}
