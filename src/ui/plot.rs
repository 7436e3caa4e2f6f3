use eframe::egui::Ui;
use egui_plot::{Bar, BarChart, Legend, Line, Plot, PlotPoints};

use crate::color::{series_color, series_colors};
use crate::stats::labels::LabelStats;
use crate::stats::lengths::TextLengthStats;
use crate::stats::zipf::ZipfStats;

const PLOT_HEIGHT: f32 = 220.0;

// ---------------------------------------------------------------------------
// Label distribution
// ---------------------------------------------------------------------------

pub fn label_distribution(ui: &mut Ui, stats: &LabelStats, column_id: &str) {
    let colors = series_colors(stats.counts.len());
    let bars: Vec<Bar> = stats
        .counts
        .iter()
        .zip(colors)
        .enumerate()
        .map(|(i, (c, color))| {
            Bar::new(i as f64, c.count as f64)
                .name(&c.label)
                .fill(color)
                .width(0.7)
        })
        .collect();

    Plot::new(format!("label_distribution{column_id}"))
        .height(PLOT_HEIGHT)
        .legend(Legend::default())
        .y_axis_label("Count")
        .allow_drag(false)
        .allow_scroll(false)
        .show(ui, |plot_ui| {
            plot_ui.bar_chart(BarChart::new(bars).name("labels"));
        });
}

// ---------------------------------------------------------------------------
// Text length histogram
// ---------------------------------------------------------------------------

pub fn text_length_histogram(ui: &mut Ui, stats: &TextLengthStats, column_id: &str) {
    let bars: Vec<Bar> = stats
        .histogram
        .iter()
        .map(|(&len, &count)| Bar::new(len as f64, count as f64).width(1.0))
        .collect();

    Plot::new(format!("text_lengths{column_id}"))
        .height(PLOT_HEIGHT)
        .x_axis_label("Words per text")
        .y_axis_label("Texts")
        .allow_boxed_zoom(true)
        .show(ui, |plot_ui| {
            plot_ui.bar_chart(
                BarChart::new(bars)
                    .name("texts")
                    .color(series_color(0)),
            );
        });
}

// ---------------------------------------------------------------------------
// Zipf: observed versus predicted counts by rank
// ---------------------------------------------------------------------------

pub fn zipf_plot(ui: &mut Ui, zipf: &ZipfStats, log_scale: bool, column_id: &str) {
    let transform = |rank: usize, value: f64| -> [f64; 2] {
        let x = rank as f64;
        if log_scale {
            [x.log10(), value.max(1e-9).log10()]
        } else {
            [x, value]
        }
    };
    let observed: PlotPoints = zipf
        .observed
        .iter()
        .enumerate()
        .map(|(i, &count)| transform(i + 1, count as f64))
        .collect();
    let predicted: PlotPoints = zipf
        .predicted
        .iter()
        .enumerate()
        .map(|(i, &count)| transform(i + 1, count))
        .collect();

    let (x_label, y_label) = if log_scale {
        ("log10 rank", "log10 count")
    } else {
        ("Rank", "Count")
    };

    Plot::new(format!("zipf{column_id}"))
        .height(PLOT_HEIGHT)
        .legend(Legend::default())
        .x_axis_label(x_label)
        .y_axis_label(y_label)
        .allow_boxed_zoom(true)
        .allow_drag(true)
        .allow_scroll(true)
        .allow_zoom(true)
        .show(ui, |plot_ui| {
            plot_ui.line(Line::new(observed).name("observed").color(series_color(0)).width(1.5));
            plot_ui.line(Line::new(predicted).name("Zipf fit").color(series_color(4)).width(1.5));
        });
}
