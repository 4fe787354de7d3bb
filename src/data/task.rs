use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Name of the folder under the root that holds stitch results.
pub const OUTPUT_DIR: &str = "Output";

/// A saved alignment of two tiles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StitchTask {
    pub name: String,
    /// Element used to judge the alignment.
    pub element: String,
    pub left: String,
    pub right: String,
    #[serde(rename = "addX")]
    pub add_x: i64,
    #[serde(rename = "addY")]
    pub add_y: i64,
    pub transpose: bool,
}

/// Longest common character prefix of two names.
pub fn common_prefix<'a>(a: &'a str, b: &str) -> &'a str {
    let end = a
        .char_indices()
        .zip(b.chars())
        .find(|((_, ca), cb)| ca != cb)
        .map(|((i, _), _)| i)
        .unwrap_or_else(|| a.len().min(b.len()));
    &a[..end]
}

/// Task name for a tile pair: `Area1` + `Area2` → `Area1_2`.
///
/// Returns `None` when both sides are the same tile.
pub fn task_name(left: &str, right: &str) -> Option<String> {
    if left == right {
        return None;
    }
    let common = common_prefix(left, right);
    let left_rest = &left[common.len()..];
    let right_rest = &right[common.len()..];
    Some(format!("{common}{left_rest}_{right_rest}"))
}

/// Folder holding everything produced for `task_name`.
pub fn task_dir(root: &Path, task_name: &str) -> PathBuf {
    root.join(OUTPUT_DIR).join(task_name)
}

/// Path of the task's JSON file.
pub fn task_file(root: &Path, task_name: &str) -> PathBuf {
    task_dir(root, task_name).join(format!("{task_name}.json"))
}

/// Write `Output/<name>/<name>.json` with four-space indentation.
pub fn save_task(root: &Path, task: &StitchTask) -> Result<PathBuf> {
    let dir = task_dir(root, &task.name);
    fs::create_dir_all(&dir).with_context(|| format!("creating {}", dir.display()))?;

    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    task.serialize(&mut ser).context("serializing task")?;

    let path = task_file(root, &task.name);
    fs::write(&path, buf).with_context(|| format!("writing {}", path.display()))?;
    Ok(path)
}

/// Read a task JSON file.
pub fn load_task(path: &Path) -> Result<StitchTask> {
    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_pairs_by_common_prefix() {
        assert_eq!(task_name("Area1", "Area2").as_deref(), Some("Area1_2"));
        assert_eq!(task_name("Site 10", "Site 11").as_deref(), Some("Site 10_1"));
        assert_eq!(task_name("A", "B").as_deref(), Some("A_B"));
        assert_eq!(task_name("Tile", "Tile").as_deref(), None);
    }

    #[test]
    fn common_prefix_respects_char_boundaries() {
        assert_eq!(common_prefix("µm1", "µm2"), "µm");
        assert_eq!(common_prefix("ab", "abc"), "ab");
        assert_eq!(common_prefix("", "abc"), "");
    }

    #[test]
    fn task_json_uses_add_x_add_y_keys_and_round_trips() {
        let root = tempfile::tempdir().unwrap();
        let task = StitchTask {
            name: "Area1_2".into(),
            element: "Grey".into(),
            left: "Area1".into(),
            right: "Area2".into(),
            add_x: -12,
            add_y: 40,
            transpose: true,
        };
        let path = save_task(root.path(), &task).unwrap();
        assert_eq!(path, root.path().join("Output/Area1_2/Area1_2.json"));

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("\n    \"addX\": -12,"));
        assert_eq!(load_task(&path).unwrap(), task);
    }
}
