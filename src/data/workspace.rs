use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use super::task::{load_task, task_file, StitchTask, OUTPUT_DIR};

/// A root folder with one subfolder per tile and the saved stitch tasks.
#[derive(Debug, Clone, Default)]
pub struct Workspace {
    pub root: PathBuf,
    /// Tile name → folder path relative to `root`.
    pub folders: BTreeMap<String, PathBuf>,
    /// Saved tasks found under `Output/`.
    pub tasks: BTreeMap<String, StitchTask>,
}

impl Workspace {
    /// Scan `root`: input tiles, then previously stitched outputs.
    ///
    /// Creates `Output/` if it is missing.  A stitched folder without a
    /// readable task file still counts as a tile.
    pub fn scan(root: &Path) -> Result<Self> {
        let mut ws = Workspace {
            root: root.to_path_buf(),
            ..Default::default()
        };

        ws.add_subfolders(root)?;

        let output = root.join(OUTPUT_DIR);
        fs::create_dir_all(&output).with_context(|| format!("creating {}", output.display()))?;

        for name in ws.add_subfolders(&output)? {
            let path = task_file(root, &name);
            match load_task(&path) {
                Ok(task) => {
                    ws.tasks.insert(name, task);
                }
                Err(e) => log::warn!("Skipping task {name}: {e:#}"),
            }
        }

        log::info!(
            "Workspace {}: {} tiles, {} saved tasks",
            root.display(),
            ws.folders.len(),
            ws.tasks.len()
        );
        Ok(ws)
    }

    /// Register the subfolders of `parent` (except `Output`) and return
    /// their names, sorted.
    fn add_subfolders(&mut self, parent: &Path) -> Result<Vec<String>> {
        let mut names = Vec::new();
        let entries = fs::read_dir(parent).with_context(|| format!("listing {}", parent.display()))?;
        for entry in entries {
            let entry = entry.context("reading directory entry")?;
            if !entry.path().is_dir() {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                log::warn!("Skipping non UTF-8 folder {:?}", entry.file_name());
                continue;
            };
            if name == OUTPUT_DIR {
                continue;
            }
            let relative = entry
                .path()
                .strip_prefix(&self.root)
                .map(Path::to_path_buf)
                .unwrap_or_else(|_| entry.path());
            self.folders.entry(name.clone()).or_insert(relative);
            names.push(name);
        }
        names.sort();
        Ok(names)
    }

    /// Absolute folder of a tile.
    pub fn folder_path(&self, name: &str) -> Option<PathBuf> {
        self.folders.get(name).map(|rel| self.root.join(rel))
    }

    /// Number of tiles.
    pub fn len(&self) -> usize {
        self.folders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.folders.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::task::save_task;

    #[test]
    fn scans_tiles_outputs_and_tasks() {
        let root = tempfile::tempdir().unwrap();
        fs::create_dir(root.path().join("Area1")).unwrap();
        fs::create_dir(root.path().join("Area2")).unwrap();
        fs::write(root.path().join("notes.txt"), "ignored").unwrap();

        let task = StitchTask {
            name: "Area1_2".into(),
            element: "Fe".into(),
            left: "Area1".into(),
            right: "Area2".into(),
            add_x: 5,
            add_y: 0,
            transpose: false,
        };
        save_task(root.path(), &task).unwrap();
        fs::create_dir_all(root.path().join("Output/Broken")).unwrap();

        let ws = Workspace::scan(root.path()).unwrap();
        let names: Vec<&str> = ws.folders.keys().map(String::as_str).collect();
        assert_eq!(names, ["Area1", "Area1_2", "Area2", "Broken"]);
        assert_eq!(ws.folders["Area1_2"], PathBuf::from("Output/Area1_2"));
        assert_eq!(ws.tasks.len(), 1);
        assert_eq!(ws.tasks["Area1_2"], task);
        assert_eq!(
            ws.folder_path("Area1").unwrap(),
            root.path().join("Area1")
        );
    }

    #[test]
    fn malformed_task_json_is_skipped() {
        let root = tempfile::tempdir().unwrap();
        fs::create_dir_all(root.path().join("Output/Bad")).unwrap();
        fs::write(root.path().join("Output/Bad/Bad.json"), "{ nope").unwrap();

        let ws = Workspace::scan(root.path()).unwrap();
        assert!(ws.tasks.is_empty());
        assert!(ws.folders.contains_key("Bad"));
    }

    #[test]
    fn creates_output_folder() {
        let root = tempfile::tempdir().unwrap();
        let ws = Workspace::scan(root.path()).unwrap();
        assert!(ws.is_empty());
        assert!(root.path().join(OUTPUT_DIR).is_dir());
    }
}
