use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use super::element::read_element_folder;
use super::error::DataError;
use super::h5;
use super::model::ElementDataset;

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Result of loading one tile folder.
#[derive(Debug)]
pub struct LoadedTile {
    pub dataset: ElementDataset,
    /// Where an HDF5 cache of the CSV data should be written, if any.
    pub cache_path: Option<PathBuf>,
}

/// Cached HDF5 file of a tile: `<folder>/<name>.h5`.
pub fn cache_path(name: &str, folder: &Path) -> PathBuf {
    folder.join(format!("{name}.h5"))
}

/// Load a tile folder, preferring its HDF5 cache over the raw CSV exports.
pub fn load_folder(name: &str, folder: &Path) -> Result<LoadedTile> {
    let h5_path = cache_path(name, folder);

    if h5::ENABLED && h5_path.exists() {
        let dataset = h5::read_all_datasets(&h5_path)?;
        return Ok(LoadedTile {
            dataset,
            cache_path: None,
        });
    }

    let dataset = read_element_folder(folder)?;
    Ok(LoadedTile {
        dataset,
        cache_path: h5::ENABLED.then_some(h5_path),
    })
}

/// Load a single dataset file.  Dispatch by extension.
///
/// Supported formats:
/// * `.h5` / `.hdf5` – one 2-D dataset per element
/// * `.csv`          – an element export; its whole folder is read
pub fn load_file(path: &Path) -> Result<ElementDataset> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "h5" | "hdf5" => h5::read_all_datasets(path),
        "csv" => {
            let folder = path
                .parent()
                .with_context(|| format!("{} has no parent folder", path.display()))?;
            read_element_folder(folder)
        }
        other => Err(DataError::UnsupportedExtension(other.to_string()).into()),
    }
}

/// Write a dataset into `dir` as element CSVs and, when available, HDF5.
pub fn export_dataset(dir: &Path, name: &str, dataset: &ElementDataset, compression: u8) -> Result<()> {
    super::element::write_element_dataset(dir, name, dataset)?;
    if h5::ENABLED {
        h5::write_all_datasets(&cache_path(name, dir), dataset, compression)?;
    }
    Ok(())
}
