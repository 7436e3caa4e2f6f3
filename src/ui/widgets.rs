use eframe::egui::{self, Color32, RichText, Ui};
use egui_extras::{Column, TableBuilder};

use crate::SHOW_TOP_N_WORDS;
use crate::data::catalog::DatasetEntry;
use crate::data::model::{DatasetArgs, TextRecord};
use crate::measure::LoadedMeasures;
use crate::stats::embeddings::EmbeddingStats;
use crate::stats::npmi::{NpmiBias, NpmiStats};
use crate::stats::{DatasetStatisticsCache, Metric};
use crate::ui::plot;

/// Clusters smaller than this are not expanded in the tree.
const MIN_CLUSTER_SIZE: usize = 3;
const CELL_CHARS: usize = 160;

fn missing(ui: &mut Ui, metric: Metric) {
    ui.label(RichText::new(format!("No cached {metric} for this configuration.")).weak());
}

fn truncate(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}…", &text[..idx]),
        None => text.to_string(),
    }
}

fn texts_table(ui: &mut Ui, id: String, rows: &[(String, String)], headers: [&str; 2]) {
    ui.push_id(id, |ui: &mut Ui| {
        TableBuilder::new(ui)
            .striped(true)
            .resizable(true)
            .column(Column::auto().at_least(60.0))
            .column(Column::remainder())
            .max_scroll_height(240.0)
            .header(20.0, |mut header| {
                header.col(|ui: &mut Ui| {
                    ui.strong(headers[0]);
                });
                header.col(|ui: &mut Ui| {
                    ui.strong(headers[1]);
                });
            })
            .body(|mut body| {
                for (left, right) in rows {
                    body.row(18.0, |mut row| {
                        row.col(|ui: &mut Ui| {
                            ui.label(left);
                        });
                        row.col(|ui: &mut Ui| {
                            ui.label(truncate(right, CELL_CHARS));
                        });
                    });
                }
            });
    });
}

fn expander(ui: &mut Ui, title: &str, column_id: &str, add_contents: impl FnOnce(&mut Ui)) {
    egui::CollapsingHeader::new(RichText::new(title).strong())
        .id_salt(format!("{title}{column_id}"))
        .default_open(false)
        .show(ui, add_contents);
}

// ---------------------------------------------------------------------------
// Column title
// ---------------------------------------------------------------------------

pub fn column_title(args: &DatasetArgs, column_id: &str) -> String {
    format!(
        "Showing{column_id}: {} - {} - {} - {}",
        args.dset_name,
        args.dset_config,
        args.split_name,
        args.text_field_label()
    )
}

// ---------------------------------------------------------------------------
// Dataset header
// ---------------------------------------------------------------------------

pub fn header(ui: &mut Ui, dstats: &DatasetStatisticsCache, entry: Option<&DatasetEntry>, column_id: &str) {
    expander(ui, "Dataset Description", column_id, |ui: &mut Ui| {
        if let Some(entry) = entry {
            if !entry.description.is_empty() {
                ui.label(&entry.description);
            }
            if let Some(cfg) = entry.configs.iter().find(|c| c.name == dstats.args.dset_config) {
                egui::Grid::new(format!("config_grid{column_id}"))
                    .num_columns(2)
                    .striped(true)
                    .show(ui, |ui: &mut Ui| {
                        ui.label("Config");
                        ui.label(&cfg.name);
                        ui.end_row();
                        ui.label("Splits");
                        ui.label(cfg.split_names().join(", "));
                        ui.end_row();
                        ui.label("Text fields");
                        ui.label(
                            cfg.text_fields
                                .iter()
                                .map(|f| f.join("."))
                                .collect::<Vec<_>>()
                                .join(", "),
                        );
                        ui.end_row();
                        if let Some(label) = &cfg.label_field {
                            ui.label("Label field");
                            ui.label(format!("{label} ({})", cfg.label_names.join(", ")));
                            ui.end_row();
                        }
                    });
            }
        }
        ui.separator();
        match &dstats.dset_peek {
            Some(peek) => {
                ui.label(format!("The first {} examples:", peek.len()));
                let rows: Vec<(String, String)> = peek
                    .iter()
                    .map(|r: &TextRecord| {
                        let label = r
                            .label
                            .as_ref()
                            .map(|l| l.label_name(&dstats.args.label_names))
                            .unwrap_or_default();
                        (label, r.text.clone())
                    })
                    .collect();
                texts_table(ui, format!("peek{column_id}"), &rows, ["label", "text"]);
            }
            None => missing(ui, Metric::DsetPeek),
        }
    });
}

// ---------------------------------------------------------------------------
// General statistics
// ---------------------------------------------------------------------------

pub fn general_stats(ui: &mut Ui, dstats: &DatasetStatisticsCache, column_id: &str) {
    expander(ui, "General Text Statistics", column_id, |ui: &mut Ui| {
        let Some(stats) = &dstats.general_stats else {
            return missing(ui, Metric::GeneralStats);
        };
        egui::Grid::new(format!("general_grid{column_id}"))
            .num_columns(2)
            .striped(true)
            .show(ui, |ui: &mut Ui| {
                let pct = |n: u64| {
                    if stats.num_rows == 0 {
                        0.0
                    } else {
                        100.0 * n as f64 / stats.num_rows as f64
                    }
                };
                ui.label("Number of texts");
                ui.label(stats.num_rows.to_string());
                ui.end_row();
                ui.label("Total words");
                ui.label(stats.total_words.to_string());
                ui.end_row();
                ui.label("Open-class words");
                ui.label(stats.total_open_words.to_string());
                ui.end_row();
                ui.label("Missing or empty texts");
                ui.label(format!("{} ({:.2}%)", stats.text_nan_count, pct(stats.text_nan_count)));
                ui.end_row();
                ui.label("Duplicated texts");
                ui.label(format!("{} ({:.2}%)", stats.dedup_total, pct(stats.dedup_total)));
                ui.end_row();
            });
        ui.add_space(6.0);
        ui.label(format!("Top {SHOW_TOP_N_WORDS} open-class words:"));
        let rows: Vec<(String, String)> = stats
            .sorted_top_vocab
            .iter()
            .map(|e| (e.count.to_string(), format!("{} ({:.2}%)", e.word, 100.0 * e.proportion)))
            .collect();
        texts_table(ui, format!("top_vocab{column_id}"), &rows, ["count", "word"]);
    });
}

// ---------------------------------------------------------------------------
// Labels, lengths, duplicates
// ---------------------------------------------------------------------------

pub fn label_distribution(ui: &mut Ui, dstats: &DatasetStatisticsCache, column_id: &str) {
    expander(ui, "Label Distribution", column_id, |ui: &mut Ui| {
        match &dstats.label_stats {
            Some(stats) if !stats.is_empty() => {
                ui.label(format!("{} labelled texts", stats.total()));
                plot::label_distribution(ui, stats, column_id);
            }
            Some(_) => {
                ui.label("This configuration has no labels.");
            }
            None if dstats.args.label_field.is_none() => {
                ui.label("This configuration has no labels.");
            }
            None => missing(ui, Metric::Labels),
        }
    });
}

pub fn text_lengths(ui: &mut Ui, dstats: &DatasetStatisticsCache, column_id: &str) {
    expander(ui, "Text Lengths", column_id, |ui: &mut Ui| {
        let Some(stats) = &dstats.length_stats else {
            return missing(ui, Metric::TextLengths);
        };
        ui.label(format!(
            "Mean length: {:.2} words, standard deviation {:.2}, {} distinct lengths.",
            stats.avg_length,
            stats.std_length,
            stats.num_uniq_lengths()
        ));
        plot::text_length_histogram(ui, stats, column_id);
        let as_rows = |examples: &[crate::stats::lengths::LengthExample]| -> Vec<(String, String)> {
            examples
                .iter()
                .map(|e| (e.length.to_string(), e.text.clone()))
                .collect()
        };
        ui.label("Shortest texts:");
        texts_table(ui, format!("shortest{column_id}"), &as_rows(&stats.shortest), ["words", "text"]);
        ui.label("Longest texts:");
        texts_table(ui, format!("longest{column_id}"), &as_rows(&stats.longest), ["words", "text"]);
    });
}

pub fn text_duplicates(ui: &mut Ui, dstats: &DatasetStatisticsCache, column_id: &str) {
    expander(ui, "Text Duplicates", column_id, |ui: &mut Ui| {
        let Some(stats) = &dstats.dup_stats else {
            return missing(ui, Metric::TextDuplicates);
        };
        if stats.duplicates.is_empty() {
            ui.label("There are no duplicated texts in this dataset.");
            return;
        }
        ui.label(format!(
            "{} rows would be removed by deduplication ({} distinct repeated texts).",
            stats.dedup_total,
            stats.duplicates.len()
        ));
        let rows: Vec<(String, String)> = stats
            .duplicates
            .iter()
            .map(|d| (d.count.to_string(), d.text.clone()))
            .collect();
        texts_table(ui, format!("duplicates{column_id}"), &rows, ["count", "text"]);
    });
}

// ---------------------------------------------------------------------------
// nPMI
// ---------------------------------------------------------------------------

fn term_picker(ui: &mut Ui, id: String, label: &str, terms: &[String], selected: &mut usize) {
    egui::ComboBox::from_id_salt(id)
        .selected_text(format!("{label}: {}", terms[*selected]))
        .show_ui(ui, |ui: &mut Ui| {
            for (i, term) in terms.iter().enumerate() {
                ui.selectable_value(selected, i, term);
            }
        });
}

fn bias_table(ui: &mut Ui, id: String, rows: &[&NpmiBias], first: &str, second: &str) {
    ui.push_id(id, |ui: &mut Ui| {
        TableBuilder::new(ui)
            .striped(true)
            .column(Column::remainder())
            .column(Column::auto())
            .column(Column::auto())
            .column(Column::auto())
            .header(20.0, |mut header| {
                for title in ["word", "bias", first, second] {
                    header.col(|ui: &mut Ui| {
                        ui.strong(title);
                    });
                }
            })
            .body(|mut body| {
                for r in rows {
                    body.row(18.0, |mut row| {
                        row.col(|ui: &mut Ui| {
                            ui.label(&r.word);
                        });
                        for v in [r.bias, r.first, r.second] {
                            row.col(|ui: &mut Ui| {
                                ui.label(format!("{v:.3}"));
                            });
                        }
                    });
                }
            });
    });
}

/// Two identity-term pickers and the words most associated with either.
pub fn npmi_widget(ui: &mut Ui, npmi: Option<&NpmiStats>, min_vocab: u64, pair: &mut (usize, usize), column_id: &str) {
    expander(ui, "Word Association: nPMI", column_id, |ui: &mut Ui| {
        let Some(npmi) = npmi else {
            return missing(ui, Metric::Npmi);
        };
        ui.label(format!(
            "Normalized pointwise mutual information between identity terms and words \
             occurring at least {min_vocab} times."
        ));
        if !npmi.can_compare() {
            ui.label("Not enough identity terms occur in this dataset to compare them.");
            return;
        }
        let terms = &npmi.available_terms;
        pair.0 = pair.0.min(terms.len() - 1);
        pair.1 = pair.1.min(terms.len() - 1);
        ui.horizontal(|ui: &mut Ui| {
            term_picker(ui, format!("npmi_first{column_id}"), "First term", terms, &mut pair.0);
            term_picker(ui, format!("npmi_second{column_id}"), "Second term", terms, &mut pair.1);
        });
        if pair.0 == pair.1 {
            ui.label(RichText::new("Pick two different terms.").color(Color32::YELLOW));
            return;
        }
        let (first, second) = (&terms[pair.0], &terms[pair.1]);
        let rows = npmi.bias(first, second);
        if rows.is_empty() {
            ui.label("These terms share no frequent co-occurring words.");
            return;
        }
        let towards_first: Vec<&NpmiBias> = rows
            .iter()
            .filter(|r| r.bias > 0.0)
            .take(SHOW_TOP_N_WORDS)
            .collect();
        let towards_second: Vec<&NpmiBias> = rows
            .iter()
            .rev()
            .filter(|r| r.bias < 0.0)
            .take(SHOW_TOP_N_WORDS)
            .collect();
        ui.strong(format!("Words leaning towards \"{first}\""));
        bias_table(ui, format!("npmi_first_table{column_id}"), &towards_first, first, second);
        ui.strong(format!("Words leaning towards \"{second}\""));
        bias_table(ui, format!("npmi_second_table{column_id}"), &towards_second, first, second);
    });
}

// ---------------------------------------------------------------------------
// Zipf
// ---------------------------------------------------------------------------

pub fn zipf(ui: &mut Ui, dstats: &DatasetStatisticsCache, column_id: &str) {
    expander(ui, "Vocabulary Distribution: Zipf's Law Fit", column_id, |ui: &mut Ui| {
        let Some(z) = &dstats.zipf else {
            return missing(ui, Metric::Zipf);
        };
        egui::Grid::new(format!("zipf_grid{column_id}"))
            .num_columns(2)
            .striped(true)
            .show(ui, |ui: &mut Ui| {
                ui.label("alpha");
                ui.label(format!("{:.3}", z.alpha));
                ui.end_row();
                ui.label("rank exponent");
                ui.label(format!("{:.3}", z.rank_exponent()));
                ui.end_row();
                ui.label("xmin");
                ui.label(z.xmin.to_string());
                ui.end_row();
                ui.label("KS distance");
                ui.label(format!("{:.4}", z.ks_distance));
                ui.end_row();
                ui.label("unique words");
                ui.label(z.unique_words.to_string());
                ui.end_row();
            });
        if z.ks_distance > 0.1 {
            ui.label(
                RichText::new("The fit is loose: word counts deviate noticeably from Zipf's law.")
                    .color(Color32::YELLOW),
            );
        }
        plot::zipf_plot(ui, z, true, column_id);
    });
}

// ---------------------------------------------------------------------------
// Text clusters
// ---------------------------------------------------------------------------

fn cluster_node(ui: &mut Ui, stats: &EmbeddingStats, id: usize, column_id: &str) {
    let Some(node) = stats.node(id) else {
        return;
    };
    let title = format!(
        "{} texts  (similarity {:.2})",
        node.size, node.merge_similarity
    );
    let header = egui::CollapsingHeader::new(title).id_salt(format!("cluster{column_id}_{id}"));
    if node.children.is_empty() || node.size < MIN_CLUSTER_SIZE {
        header.show(ui, |ui: &mut Ui| {
            for example in &node.examples {
                ui.label(truncate(example, CELL_CHARS));
            }
        });
        return;
    }
    header.show(ui, |ui: &mut Ui| {
        ui.label(RichText::new(truncate(&node.examples.join(" | "), CELL_CHARS)).weak());
        for &child in &node.children {
            cluster_node(ui, stats, child, column_id);
        }
    });
}

pub fn text_embeddings(ui: &mut Ui, dstats: &DatasetStatisticsCache, column_id: &str) {
    expander(ui, "Text Clusters", column_id, |ui: &mut Ui| {
        let Some(stats) = &dstats.embeddings else {
            return missing(ui, Metric::Embeddings);
        };
        let Some(root) = stats.root() else {
            ui.label("There are no texts to cluster.");
            return;
        };
        ui.label(format!(
            "Hierarchical clustering of {} texts by bag-of-words similarity.",
            stats.text_ids.len()
        ));
        cluster_node(ui, stats, root.id, column_id);
    });
}

// ---------------------------------------------------------------------------
// Whole column
// ---------------------------------------------------------------------------

/// Every measurement widget for one loaded configuration.
pub fn show_column(
    ui: &mut Ui,
    measures: &LoadedMeasures,
    entry: Option<&DatasetEntry>,
    show_embeddings: bool,
    npmi_pair: &mut (usize, usize),
    column_id: &str,
) {
    let dstats = &measures.dstats;
    ui.heading(column_title(&dstats.args, column_id));
    log::debug!("showing header");
    header(ui, dstats, entry, column_id);
    general_stats(ui, dstats, column_id);
    label_distribution(ui, dstats, column_id);
    text_lengths(ui, dstats, column_id);
    text_duplicates(ui, dstats, column_id);
    npmi_widget(ui, dstats.npmi_stats.as_ref(), crate::MIN_VOCAB_COUNT, npmi_pair, column_id);
    zipf(ui, dstats, column_id);
    if show_embeddings {
        text_embeddings(ui, dstats, column_id);
    }

    let failures = measures.report.failures();
    if !failures.is_empty() {
        ui.separator();
        ui.label(format!(
            "{} of {} measurements could not be loaded:",
            failures.len(),
            measures.report.attempted()
        ));
        for (metric, reason) in failures {
            ui.label(RichText::new(format!("{metric}: {reason}")).small().weak());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncates_on_char_boundaries() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("héllo wörld", 4), "héll…");
    }

    #[test]
    fn title_joins_text_field_path() {
        let args = DatasetArgs {
            dset_name: "reviews".into(),
            dset_config: "default".into(),
            split_name: "train".into(),
            text_field: vec!["meta".into(), "title".into()],
            label_field: None,
            label_names: Vec::new(),
        };
        assert_eq!(
            column_title(&args, " A"),
            "Showing A: reviews - default - train - meta-title"
        );
    }
}
