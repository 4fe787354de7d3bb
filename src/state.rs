use std::collections::{BTreeMap, VecDeque};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};

use crate::config::AppConfig;
use crate::data::loader::{export_dataset, load_file};
use crate::data::model::{ElementDataset, GREY};
use crate::data::task::{save_task, task_dir, task_name, StitchTask};
use crate::data::workspace::Workspace;
use crate::data::h5;
use crate::debounce::Debouncer;
use crate::imaging::compare::{self, Boundary, Offset, Placement, ViewWindow};
use crate::imaging::pair::{self, normalise, PairMethod, RgbImage};
use crate::imaging::ImagingError;
use crate::worker::{Worker, WorkerEvent};

/// Task selector entry meaning "not a saved task".
pub const NEW_TASK: &str = "New";

/// Lines kept in the hint box.
pub const MAX_HINTS: usize = 1000;

// ---------------------------------------------------------------------------
// Comparison result
// ---------------------------------------------------------------------------

/// The last rendered comparison of the selected tiles.
#[derive(Debug, Clone)]
pub struct Comparison {
    pub image: RgbImage,
    pub boundary: Option<Boundary>,
    pub offset: Offset,
    /// Bumped every time `image` changes so the UI can refresh its texture.
    pub generation: u64,
}

/// What the central panel shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewMode {
    #[default]
    Comparison,
    /// The selected element of the left tile, as a heatmap.
    Single,
}

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full UI state, independent of rendering.
pub struct AppState {
    pub config: AppConfig,
    pub workspace: Option<Workspace>,

    /// Loaded tiles (and stitch results) by name.
    pub datasets: BTreeMap<String, ElementDataset>,
    /// Saved tasks by name.
    pub tasks: BTreeMap<String, StitchTask>,
    /// Pixel size reported for exports.
    pub resolution: Option<f64>,

    // ---- selection ----
    pub task_choice: String,
    pub left: String,
    pub right: String,
    pub element: String,
    /// Fields common to the left and right tiles.
    pub elements: Vec<String>,
    pub transpose: bool,
    pub placement: Placement,
    /// 0..=100
    pub zoom: f64,
    pub method: PairMethod,
    pub view_mode: ViewMode,

    pub comparison: Comparison,

    // ---- background work ----
    pub worker: Worker,
    /// Whether a folder scan is in progress.
    pub loading: bool,
    loaded_folders: usize,
    expected_folders: usize,
    pub pending_writes: usize,
    compare_debounce: Debouncer,

    /// Timestamped log shown in the hint box.
    pub hints: VecDeque<String>,
    /// Status / error message shown in the top bar.
    pub status_message: Option<String>,
}

impl AppState {
    pub fn new(config: AppConfig, worker: Worker) -> Self {
        let wait = Duration::from_millis(config.debounce_ms);
        let method = config.pair_method;
        Self {
            config,
            workspace: None,
            datasets: BTreeMap::new(),
            tasks: BTreeMap::new(),
            resolution: None,
            task_choice: NEW_TASK.to_string(),
            left: String::new(),
            right: String::new(),
            element: String::new(),
            elements: Vec::new(),
            transpose: false,
            placement: Placement::default(),
            zoom: 0.0,
            method,
            view_mode: ViewMode::default(),
            comparison: Comparison {
                image: pair::placeholder(),
                boundary: None,
                offset: Offset::default(),
                generation: 0,
            },
            worker,
            loading: false,
            loaded_folders: 0,
            expected_folders: 0,
            pending_writes: 0,
            compare_debounce: Debouncer::new(wait),
            hints: VecDeque::new(),
            status_message: None,
        }
    }

    // -----------------------------------------------------------------------
    // Hint log
    // -----------------------------------------------------------------------

    /// Append a timestamped line to the hint box.
    pub fn hint(&mut self, message: impl AsRef<str>) {
        let prefix = chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f$ ");
        let line = format!("{prefix}{}", message.as_ref());
        log::info!("{}", message.as_ref());
        if self.hints.len() == MAX_HINTS {
            self.hints.pop_front();
        }
        self.hints.push_back(line);
    }

    /// Log an error to the hint box and the status line.
    pub fn report_error(&mut self, err: &anyhow::Error) {
        log::error!("{err:#}");
        let msg = format!("Error: {err:#}");
        self.status_message = Some(msg.clone());
        self.hint(msg);
    }

    // -----------------------------------------------------------------------
    // Loading
    // -----------------------------------------------------------------------

    /// Scan a new root folder and start loading every tile in the background.
    pub fn choose_root(&mut self, root: &Path) {
        let folder_name = root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| root.display().to_string());
        self.hint(format!("Loading data from: {folder_name}"));

        let ws = match Workspace::scan(root) {
            Ok(ws) => ws,
            Err(e) => {
                self.report_error(&e);
                return;
            }
        };

        self.config.last_root = Some(root.to_path_buf());
        self.datasets.clear();
        self.tasks = ws.tasks.clone();
        self.status_message = None;
        self.loaded_folders = 0;
        self.expected_folders = ws.len();
        self.loading = true;

        for name in ws.folders.keys() {
            if let Some(folder) = ws.folder_path(name) {
                self.worker.load(name.clone(), folder);
            }
        }
        self.workspace = Some(ws);

        if self.expected_folders == 0 {
            self.on_all_data_loaded();
        }
    }

    /// Open a single `.h5` / `.csv` dataset and add it as a tile.
    pub fn open_file(&mut self, path: &Path) -> Result<String> {
        let dataset = load_file(path)?;
        let name = match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("csv") => path.parent().and_then(Path::file_name),
            _ => path.file_stem(),
        }
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| anyhow!("cannot name dataset from {}", path.display()))?;

        log::info!("Opened {name} with fields {:?}", dataset.fields().collect::<Vec<_>>());
        self.datasets.insert(name.clone(), dataset);
        self.update_image_choices();
        self.update_element_choices();
        self.hint(format!("Opened {name}"));
        Ok(name)
    }

    /// Process finished background jobs and fire the debounced compare.
    pub fn poll(&mut self, now: Instant) {
        for event in self.worker.drain() {
            self.handle_event(event);
        }
        if self.compare_debounce.poll(now) {
            self.compare();
        }
    }

    /// Time until the debounced compare fires, for scheduling a repaint.
    pub fn next_wakeup(&self, now: Instant) -> Option<Duration> {
        self.compare_debounce.remaining(now)
    }

    pub fn handle_event(&mut self, event: WorkerEvent) {
        match event {
            WorkerEvent::Loaded { name, result } => {
                match result {
                    Ok(tile) => {
                        if let Some(cache) = tile.cache_path {
                            self.pending_writes += 1;
                            self.worker.write_hdf5(
                                name.clone(),
                                cache,
                                tile.dataset.clone(),
                                self.config.compression_level,
                            );
                        }
                        self.datasets.insert(name, tile.dataset);
                    }
                    Err(e) => self.report_error(&e.context(format!("loading {name}"))),
                }
                self.loaded_folders += 1;
                if self.loading && self.loaded_folders == self.expected_folders {
                    self.on_all_data_loaded();
                }
            }
            WorkerEvent::Written { name, kind, result } => {
                self.pending_writes = self.pending_writes.saturating_sub(1);
                match result {
                    Ok(()) => self.hint(format!("{name} {} data written!", kind.label())),
                    Err(e) => self.report_error(&e),
                }
            }
        }
    }

    fn on_all_data_loaded(&mut self) {
        self.loading = false;
        self.hint("All folders loaded!");
        self.update_image_choices();
        self.update_element_choices();

        let first_task = self
            .tasks
            .values()
            .find(|t| self.datasets.contains_key(&t.left) && self.datasets.contains_key(&t.right))
            .map(|t| t.name.clone());
        if let Some(name) = first_task {
            self.select_task(&name);
        }
    }

    // -----------------------------------------------------------------------
    // Selection
    // -----------------------------------------------------------------------

    /// Names of all loaded tiles, sorted.
    pub fn tile_names(&self) -> Vec<String> {
        self.datasets.keys().cloned().collect()
    }

    /// Task selector entries: saved tasks then `New`.
    pub fn task_choices(&self) -> Vec<String> {
        self.tasks
            .keys()
            .cloned()
            .chain(std::iter::once(NEW_TASK.to_string()))
            .collect()
    }

    /// Keep the left/right selections pointing at loaded tiles.
    pub fn update_image_choices(&mut self) {
        let names = self.tile_names();
        if !self.datasets.contains_key(&self.left) {
            self.left = names.first().cloned().unwrap_or_default();
        }
        if !self.datasets.contains_key(&self.right) {
            self.right = names.get(1).or(names.first()).cloned().unwrap_or_default();
        }
        self.resolution = names
            .first()
            .and_then(|n| self.datasets.get(n))
            .and_then(|ds| ds.resolution);
    }

    /// Refresh the element list from the fields both tiles share.
    pub fn update_element_choices(&mut self) {
        let (Some(left), Some(right)) = (self.datasets.get(&self.left), self.datasets.get(&self.right)) else {
            self.elements.clear();
            return;
        };
        self.elements = left.common_fields(right);
        if !self.elements.contains(&self.element) {
            self.element = if self.elements.iter().any(|e| e == GREY) {
                GREY.to_string()
            } else {
                self.elements.first().cloned().unwrap_or_default()
            };
        }
        self.left_or_right_changed();
    }

    /// Point the task selector at the task for the current pair, or `New`.
    fn left_or_right_changed(&mut self) {
        let name = task_name(&self.left, &self.right);
        self.task_choice = match name {
            Some(n) if self.tasks.contains_key(&n) => n,
            _ => NEW_TASK.to_string(),
        };
    }

    pub fn set_left(&mut self, name: &str) {
        self.left = name.to_string();
        self.update_element_choices();
    }

    pub fn set_right(&mut self, name: &str) {
        self.right = name.to_string();
        self.update_element_choices();
    }

    /// Choose an entry of the task selector and restore it.
    pub fn select_task(&mut self, name: &str) {
        self.task_choice = name.to_string();
        self.restore_task();
    }

    /// Restore element, tiles, offset and transpose flag of the chosen task.
    ///
    /// Sliders go back to the centre so the stored offset is the effective one.
    pub fn restore_task(&mut self) {
        let Some(task) = self.tasks.get(&self.task_choice).cloned() else {
            return;
        };
        self.left = task.left;
        self.right = task.right;
        self.update_element_choices();
        if self.elements.contains(&task.element) {
            self.element = task.element;
        }
        self.placement = Placement {
            percent_x: 50.0,
            percent_y: 50.0,
            dx: task.add_x,
            dy: task.add_y,
        };
        self.transpose = task.transpose;
        self.task_choice = task.name;
    }

    // -----------------------------------------------------------------------
    // Alignment controls
    // -----------------------------------------------------------------------

    pub fn move_x(&mut self, delta: i64) {
        self.placement.dx += delta;
        self.compare();
    }

    pub fn move_y(&mut self, delta: i64) {
        self.placement.dy += delta;
        self.compare();
    }

    /// A slider moved: compare once it has been idle long enough.
    pub fn slider_changed(&mut self, now: Instant) {
        self.compare_debounce.trigger(now);
    }

    pub fn reset(&mut self) {
        self.placement = Placement::default();
        self.zoom = 0.0;
        self.compare_debounce.cancel();
    }

    /// Both selected tiles placed on the shared canvas for `field`.
    fn prepare(&self, field: &str) -> Result<compare::Prepared> {
        let map = |tile: &str| {
            self.datasets
                .get(tile)
                .and_then(|ds| ds.get(field))
                .ok_or_else(|| ImagingError::MissingField(field.to_string()))
        };
        let left = map(&self.left)?;
        let right = map(&self.right)?;
        Ok(compare::prepare(left, right, self.transpose, self.placement)?)
    }

    /// Render the comparison image for the selected element.
    pub fn compare(&mut self) {
        self.hint("Comparing ...");
        match self.try_compare() {
            Ok(offset) => self.hint(format!(
                "Comparing done! (dx, dy) = ({}, {})",
                offset.add_x, offset.add_y
            )),
            Err(e) => self.report_error(&e),
        }
    }

    fn try_compare(&mut self) -> Result<Offset> {
        let prepared = self.prepare(&self.element.clone())?;
        let image = pair::show_pair(
            &normalise(&prepared.left),
            &normalise(&prepared.right),
            self.method,
        )?;
        let boundary = compare::boundary(&image, 0.0);
        self.comparison = Comparison {
            image,
            boundary,
            offset: prepared.offset,
            generation: self.comparison.generation + 1,
        };
        Ok(prepared.offset)
    }

    /// Visible part of the comparison image.
    pub fn view_window(&self) -> ViewWindow {
        let (rows, cols, _) = self.comparison.image.dim();
        match self.comparison.boundary {
            Some(b) => compare::view_window(b, rows, cols, self.config.view_margin, self.zoom / 100.0),
            None => ViewWindow {
                x_min: 0.0,
                x_max: cols as f64,
                y_min: 0.0,
                y_max: rows as f64,
            },
        }
    }

    // -----------------------------------------------------------------------
    // Save / stitch / export
    // -----------------------------------------------------------------------

    fn root(&self) -> Result<PathBuf> {
        self.workspace
            .as_ref()
            .map(|ws| ws.root.clone())
            .context("Choose a folder first")
    }

    /// Save the current alignment as a task.  Returns `None` on failure.
    pub fn save(&mut self) -> Option<StitchTask> {
        let Some(name) = task_name(&self.left, &self.right) else {
            self.hint("Error: The two images are the same!");
            return None;
        };
        // Offset and boundary must match the current placement and tiles.
        if let Err(e) = self.try_compare() {
            self.report_error(&e);
            return None;
        }
        let task = StitchTask {
            name: name.clone(),
            element: self.element.clone(),
            left: self.left.clone(),
            right: self.right.clone(),
            add_x: self.comparison.offset.add_x,
            add_y: self.comparison.offset.add_y,
            transpose: self.transpose,
        };
        let saved = self.root().and_then(|root| save_task(&root, &task));
        match saved {
            Ok(path) => {
                self.hint(format!("Saved to {}", path.display()));
                self.tasks.insert(name.clone(), task.clone());
                self.task_choice = name;
                Some(task)
            }
            Err(e) => {
                self.report_error(&e);
                None
            }
        }
    }

    /// Save, then merge every common field and write the result in the background.
    pub fn stitch(&mut self) {
        let Some(task) = self.save() else {
            return;
        };
        if let Err(e) = self.try_stitch(&task) {
            self.report_error(&e);
        }
    }

    fn try_stitch(&mut self, task: &StitchTask) -> Result<()> {
        let boundary = self
            .comparison
            .boundary
            .ok_or(ImagingError::NothingToCompare)?;

        let resolution = self.datasets.get(&self.left).and_then(|ds| ds.resolution);
        let mut result = ElementDataset::new(resolution.or(self.resolution));
        for field in self.elements.clone() {
            let prepared = self.prepare(&field)?;
            let merged = compare::stitch(&prepared.left, &prepared.right, boundary)?;
            result.insert(field, merged);
        }

        self.datasets.insert(task.name.clone(), result.clone());
        self.update_image_choices();
        self.task_choice = task.name.clone();

        self.hint("Saving hdf5 and element data ...");
        let dir = task_dir(&self.root()?, &task.name);
        if h5::ENABLED {
            self.pending_writes += 1;
            self.worker.write_hdf5(
                task.name.clone(),
                dir.join(format!("{}.h5", task.name)),
                result.clone(),
                self.config.compression_level,
            );
        }
        self.pending_writes += 1;
        self.worker.write_elements(task.name.clone(), dir, result);
        Ok(())
    }

    /// Write the left tile to `dir` as element CSVs (and HDF5 when available).
    pub fn export_selected(&mut self, dir: &Path) -> Result<()> {
        let dataset = self
            .datasets
            .get(&self.left)
            .with_context(|| format!("No tile named '{}'", self.left))?;
        export_dataset(dir, &self.left, dataset, self.config.compression_level)?;
        self.hint(format!("Exported {} to {}", self.left, dir.display()));
        Ok(())
    }

    /// Save the comparison image as PNG.
    pub fn save_image(&mut self, path: &Path) -> Result<()> {
        let (rows, cols, _) = self.comparison.image.dim();
        let buf = image::RgbImage::from_raw(cols as u32, rows as u32, pair::to_rgb8(&self.comparison.image))
            .context("comparison image has an invalid size")?;
        buf.save(path).with_context(|| format!("writing {}", path.display()))?;
        self.hint(format!("Image saved to {}", path.display()));
        Ok(())
    }

    /// Whether the Stitch button can be used.
    pub fn can_stitch(&self) -> bool {
        !self.loading && self.pending_writes == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::element::write_element_dataset;
    use crate::data::task::{load_task, task_file, OUTPUT_DIR};
    use ndarray::Array2;
    use std::fs;

    fn tile(value: f64, grey: f64) -> ElementDataset {
        let mut ds = ElementDataset::new(Some(0.5));
        ds.insert("Fe", Array2::from_elem((4, 4), value));
        ds.insert("Grey", Array2::from_elem((4, 4), grey));
        ds
    }

    fn workspace_with_two_tiles() -> tempfile::TempDir {
        let root = tempfile::tempdir().unwrap();
        write_element_dataset(&root.path().join("Area1"), "Area1", &tile(1.0, 100.0)).unwrap();
        write_element_dataset(&root.path().join("Area2"), "Area2", &tile(2.0, 200.0)).unwrap();
        root
    }

    fn state() -> AppState {
        AppState::new(AppConfig::default(), Worker::new(None))
    }

    /// Feed worker events until nothing is loading or being written.
    fn settle(state: &mut AppState) {
        while state.loading || state.pending_writes > 0 {
            let event = state.worker.recv().expect("worker event");
            state.handle_event(event);
        }
    }

    #[test]
    fn loads_every_tile_and_selects_common_fields() {
        let root = workspace_with_two_tiles();
        let mut st = state();
        st.choose_root(root.path());
        settle(&mut st);

        assert_eq!(st.tile_names(), ["Area1", "Area2"]);
        assert_eq!((st.left.as_str(), st.right.as_str()), ("Area1", "Area2"));
        assert_eq!(st.elements, ["Fe", "Grey"]);
        assert_eq!(st.element, GREY);
        assert_eq!(st.task_choice, NEW_TASK);
        assert_eq!(st.resolution, Some(0.5));
        assert!(st.hints.iter().any(|h| h.ends_with("$ All folders loaded!")));
    }

    #[test]
    fn broken_tile_is_reported_and_loading_finishes() {
        let root = workspace_with_two_tiles();
        fs::create_dir(root.path().join("Empty")).unwrap();
        let mut st = state();
        st.choose_root(root.path());
        settle(&mut st);

        assert!(!st.loading);
        assert_eq!(st.datasets.len(), 2);
        assert!(st.status_message.as_deref().unwrap().contains("is empty"));
    }

    #[test]
    fn same_tile_cannot_be_saved() {
        let root = workspace_with_two_tiles();
        let mut st = state();
        st.choose_root(root.path());
        settle(&mut st);
        st.set_right("Area1");
        assert!(st.save().is_none());
        assert!(st.hints.back().unwrap().ends_with("Error: The two images are the same!"));
    }

    #[test]
    fn compare_save_stitch_and_restore() {
        let root = workspace_with_two_tiles();
        let mut st = state();
        st.choose_root(root.path());
        settle(&mut st);

        st.element = "Fe".into();
        st.move_x(2);
        assert_eq!(st.comparison.offset, Offset { add_x: 2, add_y: 0 });
        assert_eq!(
            st.comparison.boundary,
            Some(Boundary {
                left: 3,
                right: 10,
                top: 3,
                bottom: 8
            })
        );

        st.stitch();
        settle(&mut st);

        let stitched = &st.datasets["Area1_2"];
        let fe = stitched.get("Fe").unwrap();
        assert_eq!(fe.dim(), (5, 7));
        assert_eq!(fe[[0, 0]], 0.0);
        assert_eq!(fe[[1, 1]], 1.0);
        assert_eq!(fe[[1, 3]], 2.0);
        assert_eq!(stitched.get("Grey").unwrap()[[1, 6]], 200.0);

        let out = root.path().join(OUTPUT_DIR).join("Area1_2");
        assert!(out.join("Area1_2.json").exists());
        assert!(out.join("Area1_2 atom__Fe K.csv").exists());
        assert_eq!(st.tasks["Area1_2"].add_x, 2);

        // A fresh session picks the saved task up again.
        let mut again = state();
        again.choose_root(root.path());
        settle(&mut again);
        assert_eq!(again.task_choice, "Area1_2");
        assert_eq!(again.element, "Fe");
        assert_eq!(again.placement.dx, 2);
        assert!(again.datasets.contains_key("Area1_2"));
    }

    #[test]
    fn save_compares_at_the_current_placement() {
        let root = workspace_with_two_tiles();
        let mut st = state();
        st.choose_root(root.path());
        settle(&mut st);

        st.element = "Fe".into();
        st.compare();
        st.placement.dx = 3;
        st.placement.percent_y = 75.0;
        let task = st.save().unwrap();

        assert_eq!((task.add_x, task.add_y), (3, 3));
        assert_eq!(st.comparison.offset, Offset { add_x: 3, add_y: 3 });
        let saved = load_task(&task_file(root.path(), "Area1_2")).unwrap();
        assert_eq!((saved.add_x, saved.add_y), (3, 3));
    }

    #[test]
    fn stitch_is_disabled_while_writing() {
        let root = workspace_with_two_tiles();
        let mut st = state();
        st.choose_root(root.path());
        settle(&mut st);
        assert!(st.can_stitch());

        st.element = "Fe".into();
        st.stitch();
        assert!(!st.can_stitch());
        settle(&mut st);
        assert!(st.can_stitch());
    }

    #[test]
    fn hint_log_keeps_the_latest_lines() {
        let mut st = state();
        for i in 0..MAX_HINTS + 5 {
            st.hint(format!("line {i}"));
        }
        assert_eq!(st.hints.len(), MAX_HINTS);
        assert!(st.hints.front().unwrap().ends_with("$ line 5"));
        assert!(st.hints.back().unwrap().ends_with(&format!("$ line {}", MAX_HINTS + 4)));
    }

    #[test]
    fn reset_restores_defaults() {
        let mut st = state();
        st.placement.dx = 9;
        st.placement.percent_y = 10.0;
        st.zoom = 40.0;
        st.reset();
        assert_eq!(st.placement, Placement::default());
        assert_eq!(st.zoom, 0.0);
    }

    #[test]
    fn debounced_compare_waits_for_idle_sliders() {
        let root = workspace_with_two_tiles();
        let mut st = state();
        st.choose_root(root.path());
        settle(&mut st);

        let t0 = Instant::now();
        st.slider_changed(t0);
        st.poll(t0);
        assert_eq!(st.comparison.generation, 0);
        st.poll(t0 + Duration::from_millis(st.config.debounce_ms));
        assert_eq!(st.comparison.generation, 1);
    }

    #[test]
    fn saves_comparison_png() {
        let dir = tempfile::tempdir().unwrap();
        let mut st = state();
        let path = dir.path().join("cmp.png");
        st.save_image(&path).unwrap();
        let img = image::open(&path).unwrap();
        assert_eq!((img.width(), img.height()), (256, 256));
    }
}
