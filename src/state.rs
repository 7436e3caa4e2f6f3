use std::path::PathBuf;
use std::time::{Duration, Instant};

use poll_promise::Promise;

use crate::config::Settings;
use crate::data::catalog::{CatalogCache, DatasetCatalog};
use crate::data::model::DatasetArgs;
use crate::measure::{self, LoadedMeasures};
use crate::request::{
    self, ComputeRequest, EmailCheck, INVALID_EMAIL_MESSAGE, REQUEST_FAILED_MESSAGE,
    RequestOutcome,
};

// ---------------------------------------------------------------------------
// Sidebar selection for one column
// ---------------------------------------------------------------------------

/// Indices into the catalog chosen in the sidebar.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Selection {
    pub dataset: usize,
    pub config: usize,
    pub split: usize,
    pub text_field: usize,
}

impl Selection {
    /// Pull every index back into range after the catalog changed.
    pub fn clamp(&mut self, catalog: &DatasetCatalog) {
        fn fit(idx: &mut usize, len: usize) {
            if *idx >= len {
                *idx = 0;
            }
        }
        fit(&mut self.dataset, catalog.datasets.len());
        let Some(ds) = catalog.datasets.get(self.dataset) else {
            return;
        };
        fit(&mut self.config, ds.configs.len());
        let Some(cfg) = ds.configs.get(self.config) else {
            return;
        };
        fit(&mut self.split, cfg.splits.len());
        fit(&mut self.text_field, cfg.text_fields.len());
    }

    pub fn resolve(&self, catalog: &DatasetCatalog) -> Option<DatasetArgs> {
        let ds = catalog.datasets.get(self.dataset)?;
        let cfg = ds.configs.get(self.config)?;
        let split = cfg.splits.keys().nth(self.split)?;
        let text_field = cfg.text_fields.get(self.text_field)?;
        Some(cfg.args(&ds.name, split, text_field))
    }
}

// ---------------------------------------------------------------------------
// What a column shows
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnView {
    /// Cached and complete: all measurement widgets.
    Results,
    /// Cached but not every artifact is there yet.
    CheckBackLater,
    /// Nothing cached: offer to compute it.
    RequestCompute,
}

pub fn column_view(cache_exists: bool, complete: bool) -> ColumnView {
    match (cache_exists, complete) {
        (true, true) => ColumnView::Results,
        (true, false) => ColumnView::CheckBackLater,
        (false, _) => ColumnView::RequestCompute,
    }
}

// ---------------------------------------------------------------------------
// Compute request form
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct ComputeForm {
    pub email: String,
    /// Set by a click on an invalid address; cleared when the address changes.
    attempted: bool,
    /// A request went out; the form is hidden from now on.
    pub sent: bool,
    pub message: Option<String>,
    pending: Option<Promise<Result<RequestOutcome, String>>>,
}

impl ComputeForm {
    pub fn email_changed(&mut self) {
        self.attempted = false;
    }

    /// Validate the current input and send the request on a valid click.
    /// Returns the feedback to display under the form.
    pub fn handle_input(
        &mut self,
        clicked: bool,
        args: &DatasetArgs,
        server_url: Option<&str>,
    ) -> Option<&'static str> {
        match request::check_email_input(&self.email, clicked || self.attempted) {
            EmailCheck::Submit(email) if clicked => {
                self.submit(ComputeRequest { email, args: args.clone() }, server_url);
                None
            }
            EmailCheck::Invalid => {
                self.attempted |= clicked;
                Some(INVALID_EMAIL_MESSAGE)
            }
            _ => None,
        }
    }

    fn submit(&mut self, req: ComputeRequest, server_url: Option<&str>) {
        self.sent = true;
        let Some(url) = server_url.map(str::to_string) else {
            log::error!("Cannot request measurements: SERVER_URL is not set");
            self.message = Some(REQUEST_FAILED_MESSAGE.to_string());
            return;
        };
        self.pending = Some(Promise::spawn_thread("compute_request", move || {
            req.send(Some(&url)).map_err(|e| e.to_string())
        }));
    }

    /// Returns true while a request is in flight.
    pub fn poll(&mut self) -> bool {
        let Some(promise) = self.pending.take() else {
            return false;
        };
        match promise.try_take() {
            Ok(result) => {
                let message = match result {
                    Ok(outcome) => {
                        if let RequestOutcome::Rejected(body) = &outcome {
                            log::warn!("Compute server answered: {body}");
                        }
                        outcome.message()
                    }
                    Err(e) => {
                        log::error!("{e}");
                        REQUEST_FAILED_MESSAGE
                    }
                };
                self.message = Some(message.to_string());
                false
            }
            Err(promise) => {
                self.pending = Some(promise);
                true
            }
        }
    }
}

// ---------------------------------------------------------------------------
// One result column
// ---------------------------------------------------------------------------

/// How long a column without complete results waits before looking at the
/// cache again.
pub const RELOAD_INTERVAL: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq, Eq)]
struct LoadKey {
    args: DatasetArgs,
    show_embeddings: bool,
}

pub struct ColumnState {
    pub selection: Selection,
    loaded: Option<(LoadKey, LoadedMeasures)>,
    loaded_at: Option<Instant>,
    pending: Option<(LoadKey, Promise<LoadedMeasures>)>,
    /// Incomplete results are reloaded once they are this old.
    pub reload_after: Duration,
    pub form: ComputeForm,
    /// Indices into the available identity terms for the nPMI widget.
    pub npmi_pair: (usize, usize),
}

impl Default for ColumnState {
    fn default() -> Self {
        Self {
            selection: Selection::default(),
            loaded: None,
            loaded_at: None,
            pending: None,
            reload_after: RELOAD_INTERVAL,
            form: ComputeForm::default(),
            npmi_pair: (0, 1),
        }
    }
}

impl ColumnState {
    pub fn measures(&self) -> Option<&LoadedMeasures> {
        self.loaded.as_ref().map(|(_, m)| m)
    }

    pub fn args(&self) -> Option<&DatasetArgs> {
        self.loaded.as_ref().map(|(key, _)| &key.args)
    }

    pub fn is_loading(&self) -> bool {
        self.pending.is_some()
    }

    /// Whether the loaded measures are for `key` and still worth showing.
    /// Results missing from the cache may have been written since.
    fn is_fresh(&self, key: &LoadKey) -> bool {
        let Some((current, measures)) = &self.loaded else {
            return false;
        };
        if current != key {
            return false;
        }
        let view = column_view(measures.cache_exists, measures.dstats.complete());
        view == ColumnView::Results
            || self.loaded_at.is_some_and(|at| at.elapsed() < self.reload_after)
    }

    /// Start loading `args` in the background unless it is already loaded
    /// or on its way.
    fn request_load(&mut self, key: LoadKey, cache_dir: PathBuf, use_cache: bool) {
        let in_flight = self.pending.as_ref().map(|(k, _)| k);
        if in_flight == Some(&key) || self.is_fresh(&key) {
            return;
        }
        log::info!(
            "Loading {} / {} / {} / {}",
            key.args.dset_name,
            key.args.dset_config,
            key.args.split_name,
            key.args.text_field_label()
        );
        let args = key.args.clone();
        let show_embeddings = key.show_embeddings;
        let promise = Promise::spawn_thread("load_measures", move || {
            measure::load_or_prepare_widgets(&cache_dir, args, show_embeddings, use_cache)
        });
        self.pending = Some((key, promise));
    }

    /// Returns true while a load or a request is in flight.
    fn poll(&mut self) -> bool {
        if let Some((key, promise)) = self.pending.take() {
            match promise.try_take() {
                Ok(measures) => {
                    let selection_changed = self.args() != Some(&key.args);
                    if selection_changed {
                        self.form = ComputeForm::default();
                        self.npmi_pair = (0, 1);
                    }
                    self.loaded = Some((key, measures));
                    self.loaded_at = Some(Instant::now());
                }
                Err(promise) => self.pending = Some((key, promise)),
            }
        }
        let requesting = self.form.poll();
        self.pending.is_some() || requesting
    }
}

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full UI state, independent of rendering.
pub struct AppState {
    pub settings: Settings,
    pub catalog: CatalogCache,
    pub compare_mode: bool,
    pub show_embeddings: bool,
    /// The live app always reads the cache.
    pub use_cache: bool,
    pub columns: [ColumnState; 2],
    /// Status / error message shown in the UI.
    pub status_message: Option<String>,
}

impl AppState {
    pub fn new(settings: Settings) -> Self {
        let catalog = CatalogCache::new(settings.catalog_path.clone(), settings.catalog_ttl);
        Self {
            settings,
            catalog,
            compare_mode: false,
            show_embeddings: false,
            use_cache: true,
            columns: [ColumnState::default(), ColumnState::default()],
            status_message: None,
        }
    }

    pub fn active_columns(&self) -> usize {
        if self.compare_mode { 2 } else { 1 }
    }

    /// Suffix used in titles and widget ids: empty in single mode.
    pub fn column_id(&self, idx: usize) -> &'static str {
        match (self.compare_mode, idx) {
            (false, _) => "",
            (true, 0) => " A",
            (true, _) => " B",
        }
    }

    /// Current catalog, refreshed when its TTL ran out. Errors land in the
    /// status line.
    pub fn catalog(&mut self) -> Option<DatasetCatalog> {
        match self.catalog.get() {
            Ok(catalog) => Some(catalog.clone()),
            Err(e) => {
                let msg = format!("Error: {e:#}");
                if self.status_message.as_deref() != Some(msg.as_str()) {
                    log::error!("Failed to load catalog: {e:#}");
                }
                self.status_message = Some(msg);
                None
            }
        }
    }

    pub fn open_catalog(&mut self, path: PathBuf) {
        self.catalog.set_path(path);
        self.status_message = None;
        for col in &mut self.columns {
            col.selection = Selection::default();
        }
    }

    /// Kick off loads for the visible columns and collect finished work.
    /// Returns true while anything is still running.
    pub fn refresh(&mut self, catalog: &DatasetCatalog) -> bool {
        let mut busy = false;
        let cache_dir = self.settings.cache_dir.clone();
        for idx in 0..self.active_columns() {
            let col = &mut self.columns[idx];
            col.selection.clamp(catalog);
            if let Some(args) = col.selection.resolve(catalog) {
                let key = LoadKey {
                    args,
                    show_embeddings: self.show_embeddings,
                };
                col.request_load(key, cache_dir.clone(), self.use_cache);
            }
            busy |= col.poll();
        }
        busy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    use crate::data::catalog::{ConfigEntry, DatasetEntry};

    fn catalog() -> DatasetCatalog {
        let config = |name: &str, splits: &[&str]| ConfigEntry {
            name: name.to_string(),
            splits: splits
                .iter()
                .map(|s| (s.to_string(), PathBuf::from(format!("{s}.json"))))
                .collect::<BTreeMap<_, _>>(),
            text_fields: vec![vec!["text".to_string()]],
            label_field: None,
            label_names: Vec::new(),
        };
        DatasetCatalog {
            datasets: vec![
                DatasetEntry {
                    name: "first".into(),
                    description: String::new(),
                    configs: vec![config("a", &["test", "train"]), config("b", &["train"])],
                },
                DatasetEntry {
                    name: "second".into(),
                    description: String::new(),
                    configs: vec![config("only", &["validation"])],
                },
            ],
            root: PathBuf::new(),
        }
    }

    #[test]
    fn column_view_follows_cache_state() {
        assert_eq!(column_view(true, true), ColumnView::Results);
        assert_eq!(column_view(true, false), ColumnView::CheckBackLater);
        assert_eq!(column_view(false, false), ColumnView::RequestCompute);
        assert_eq!(column_view(false, true), ColumnView::RequestCompute);
    }

    #[test]
    fn selection_resolves_and_clamps() {
        let catalog = catalog();
        let mut sel = Selection { dataset: 0, config: 0, split: 1, text_field: 0 };
        let args = sel.resolve(&catalog).unwrap();
        assert_eq!(args.dset_config, "a");
        assert_eq!(args.split_name, "train");

        // Switching dataset leaves stale indices behind.
        sel.dataset = 1;
        assert!(sel.resolve(&catalog).is_none());
        sel.clamp(&catalog);
        let args = sel.resolve(&catalog).unwrap();
        assert_eq!(args.dset_name, "second");
        assert_eq!(args.split_name, "validation");
    }

    #[test]
    fn column_ids_depend_on_mode() {
        let mut state = AppState::new(Settings::default());
        assert_eq!(state.active_columns(), 1);
        assert_eq!(state.column_id(0), "");
        state.compare_mode = true;
        assert_eq!(state.active_columns(), 2);
        assert_eq!((state.column_id(0), state.column_id(1)), (" A", " B"));
    }

    fn args() -> DatasetArgs {
        catalog().all_args().remove(0)
    }

    #[test]
    fn invalid_click_keeps_complaining_until_the_email_changes() {
        let mut form = ComputeForm::default();
        assert_eq!(form.handle_input(false, &args(), None), None);

        form.email = "not-an-email".into();
        assert_eq!(form.handle_input(true, &args(), None), Some(INVALID_EMAIL_MESSAGE));
        assert!(!form.sent);

        form.email = "me@example.com".into();
        form.email_changed();
        assert_eq!(form.handle_input(false, &args(), None), None);
    }

    #[test]
    fn submitting_without_server_reports_failure() {
        let mut form = ComputeForm {
            email: "me@example.com".into(),
            ..ComputeForm::default()
        };
        assert_eq!(form.handle_input(true, &args(), None), None);
        assert!(form.sent);
        assert_eq!(form.message.as_deref(), Some(REQUEST_FAILED_MESSAGE));
        assert!(!form.poll());
    }

    #[test]
    fn refresh_loads_selected_configuration_in_background() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings {
            cache_dir: dir.path().to_path_buf(),
            ..Settings::default()
        };
        let mut state = AppState::new(settings);
        let catalog = catalog();

        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(10);
        while state.refresh(&catalog) {
            assert!(std::time::Instant::now() < deadline, "load never finished");
            std::thread::sleep(std::time::Duration::from_millis(5));
        }
        let col = &state.columns[0];
        let measures = col.measures().unwrap();
        assert!(!measures.cache_exists);
        assert_eq!(col.args().unwrap().dset_name, "first");
        assert!(!state.columns[1].is_loading());
    }

    #[test]
    fn column_picks_up_a_cache_written_after_the_first_load() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings {
            cache_dir: dir.path().join("cache"),
            ..Settings::default()
        };
        let cache_dir = settings.cache_dir.clone();
        let mut state = AppState::new(settings);
        let catalog = catalog();

        let deadline = Instant::now() + Duration::from_secs(10);
        while state.refresh(&catalog) {
            assert!(Instant::now() < deadline, "load never finished");
            std::thread::sleep(Duration::from_millis(5));
        }
        assert!(!state.columns[0].measures().unwrap().cache_exists);

        // Another process fills the cache for the selected configuration.
        let source = dir.path().join("test.json");
        std::fs::write(
            &source,
            r#"[{"text": "buy milk and eggs"}, {"text": "call the plumber"},
                {"text": "buy milk and eggs"}, {"text": "water the plants"}]"#,
        )
        .unwrap();
        measure::load_or_prepare(&cache_dir, args(), Some(source), false, true).unwrap();

        state.columns[0].reload_after = Duration::ZERO;
        let deadline = Instant::now() + Duration::from_secs(10);
        loop {
            state.refresh(&catalog);
            let measures = state.columns[0].measures().unwrap();
            if measures.cache_exists && measures.dstats.complete() {
                break;
            }
            assert!(Instant::now() < deadline, "cache was never picked up");
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn complete_results_are_not_reloaded() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("test.json");
        std::fs::write(
            &source,
            r#"[{"text": "buy milk and eggs"}, {"text": "call the plumber"},
                {"text": "buy milk and eggs"}, {"text": "water the plants"}]"#,
        )
        .unwrap();
        let cache_dir = dir.path().join("cache");
        measure::load_or_prepare(&cache_dir, args(), Some(source), false, true).unwrap();

        let mut state = AppState::new(Settings {
            cache_dir,
            ..Settings::default()
        });
        state.columns[0].reload_after = Duration::ZERO;
        let catalog = catalog();
        let deadline = Instant::now() + Duration::from_secs(10);
        while state.refresh(&catalog) {
            assert!(Instant::now() < deadline, "load never finished");
            std::thread::sleep(Duration::from_millis(5));
        }
        assert!(state.columns[0].measures().unwrap().dstats.complete());
        assert!(!state.refresh(&catalog));
        assert!(!state.columns[0].is_loading());
    }
}
