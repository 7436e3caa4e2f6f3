use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::data::model::DatasetArgs;
use crate::stats::{DatasetStatisticsCache, Metric, StatsError};

// ---------------------------------------------------------------------------
// Per-metric outcome of a widget load
// ---------------------------------------------------------------------------

/// What happened to each metric a loader attempted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadReport {
    outcomes: BTreeMap<Metric, Result<(), String>>,
}

impl LoadReport {
    fn record(&mut self, metric: Metric, result: Result<(), StatsError>) {
        if let Err(e) = &result {
            log::warn!("Missing a cache for {metric}: {e}");
        }
        self.outcomes.insert(metric, result.map_err(|e| e.to_string()));
    }

    /// Metrics that failed, with the reason, in metric order.
    pub fn failures(&self) -> Vec<(Metric, &str)> {
        self.outcomes
            .iter()
            .filter_map(|(m, r)| r.as_ref().err().map(|e| (*m, e.as_str())))
            .collect()
    }

    pub fn attempted(&self) -> usize {
        self.outcomes.len()
    }
}

/// Result of loading one configuration for the UI.
#[derive(Debug)]
pub struct LoadedMeasures {
    pub dstats: DatasetStatisticsCache,
    pub cache_exists: bool,
    pub report: LoadReport,
}

// ---------------------------------------------------------------------------
// Loaders
// ---------------------------------------------------------------------------

/// Compute (or reuse) every measurement for one configuration.
///
/// Runs in development mode and stops at the first failure, except for
/// nPMI whose failure is only logged.
pub fn load_or_prepare(
    cache_dir: &Path,
    args: DatasetArgs,
    source: Option<PathBuf>,
    show_embeddings: bool,
    use_cache: bool,
) -> Result<DatasetStatisticsCache, StatsError> {
    if !cache_dir.is_dir() {
        log::warn!("Creating cache");
        std::fs::create_dir_all(cache_dir).map_err(|e| StatsError::io(cache_dir, e))?;
    }
    if use_cache {
        log::warn!("Using cache");
    }
    let mut dstats = DatasetStatisticsCache::new(cache_dir, args, use_cache).with_source(source);

    log::warn!("Loading dataset");
    dstats.load_or_prepare_dataset()?;
    log::warn!("Loading dataset peek");
    dstats.load_or_prepare_dset_peek()?;
    log::warn!("Loading labels");
    dstats.load_or_prepare_labels()?;
    log::warn!("Loading text lengths");
    dstats.load_or_prepare_text_lengths()?;
    log::warn!("Loading duplicates");
    dstats.load_or_prepare_text_duplicates()?;
    log::warn!("Loading vocabulary");
    dstats.load_or_prepare_vocab()?;
    log::warn!("Loading general statistics...");
    dstats.load_or_prepare_general_stats()?;
    if show_embeddings {
        log::warn!("Loading Embeddings");
        dstats.load_or_prepare_embeddings()?;
    }
    log::warn!("Loading nPMI");
    if let Err(e) = dstats.load_or_prepare_npmi() {
        log::warn!("Missing a cache for npmi: {e}");
    }
    log::warn!("Loading Zipf");
    dstats.load_or_prepare_zipf()?;
    Ok(dstats)
}

/// Metrics the widgets read, in load order.
pub fn widget_metrics(show_embeddings: bool) -> Vec<Metric> {
    let mut metrics = vec![
        // The text dataset backs the header and cluster examples.
        Metric::Dataset,
        Metric::DsetPeek,
        Metric::GeneralStats,
        Metric::Labels,
        Metric::TextLengths,
    ];
    if show_embeddings {
        metrics.push(Metric::Embeddings);
    }
    metrics.extend([Metric::TextDuplicates, Metric::Npmi, Metric::Zipf]);
    metrics
}

/// Load what the live app displays, never computing anything.
///
/// Each metric is attempted independently; failures are collected in the
/// report instead of stopping the load.
pub fn load_or_prepare_widgets(
    cache_dir: &Path,
    args: DatasetArgs,
    show_embeddings: bool,
    use_cache: bool,
) -> LoadedMeasures {
    if use_cache {
        log::warn!("Using cache");
    }
    let mut dstats = DatasetStatisticsCache::new(cache_dir, args, use_cache);
    // Don't recalculate; we're live.
    dstats.set_deployment(true);
    let cache_exists = dstats.check_cache_dir();

    let mut report = LoadReport::default();
    if cache_exists {
        for metric in widget_metrics(show_embeddings) {
            let result = dstats.load_or_prepare(metric);
            report.record(metric, result);
        }
    } else {
        log::info!("No cache at {}", dstats.cache_path().display());
    }

    LoadedMeasures {
        dstats,
        cache_exists,
        report,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> DatasetArgs {
        DatasetArgs {
            dset_name: "notes".into(),
            dset_config: "default".into(),
            split_name: "train".into(),
            text_field: vec!["text".into()],
            label_field: None,
            label_names: Vec::new(),
        }
    }

    fn write_source(dir: &Path) -> PathBuf {
        let path = dir.join("notes.csv");
        std::fs::write(
            &path,
            "text\nbuy milk and eggs\ncall the plumber\nbuy milk and eggs\nwater the plants\n",
        )
        .unwrap();
        path
    }

    #[test]
    fn full_preparation_then_live_widgets_are_complete() {
        let dir = tempfile::tempdir().unwrap();
        let cache_dir = dir.path().join("cache");
        let source = write_source(dir.path());

        let prepared = load_or_prepare(&cache_dir, args(), Some(source), true, true).unwrap();
        assert!(prepared.complete());

        let live = load_or_prepare_widgets(&cache_dir, args(), true, true);
        assert!(live.cache_exists);
        assert!(live.report.failures().is_empty(), "{:?}", live.report.failures());
        assert_eq!(live.report.attempted(), widget_metrics(true).len());
        assert!(live.dstats.complete());
        let tree_size = |d: &DatasetStatisticsCache| d.embeddings.as_ref().map(|e| e.node_list.len());
        assert_eq!(tree_size(&live.dstats), tree_size(&prepared));
    }

    #[test]
    fn live_widgets_without_cache_attempt_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let live = load_or_prepare_widgets(dir.path(), args(), false, true);
        assert!(!live.cache_exists);
        assert_eq!(live.report.attempted(), 0);
        assert!(!live.dstats.complete());
    }

    #[test]
    fn one_missing_artifact_does_not_block_the_others() {
        let dir = tempfile::tempdir().unwrap();
        let cache_dir = dir.path().join("cache");
        let source = write_source(dir.path());
        let prepared = load_or_prepare(&cache_dir, args(), Some(source), false, true).unwrap();
        std::fs::remove_file(prepared.cache_path().join(Metric::TextLengths.file_name())).unwrap();

        let live = load_or_prepare_widgets(&cache_dir, args(), false, true);
        let failures = live.report.failures();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].0, Metric::TextLengths);
        assert!(live.dstats.zipf.is_some());
        assert!(live.dstats.dup_stats.is_some());
        assert!(!live.dstats.complete());
    }

    #[test]
    fn widget_metrics_include_embeddings_only_when_asked() {
        assert!(!widget_metrics(false).contains(&Metric::Embeddings));
        assert!(widget_metrics(true).contains(&Metric::Embeddings));
    }
}
