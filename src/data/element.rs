use std::fs;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use ndarray::Array2;

use super::error::DataError;
use super::model::{ElementDataset, ElementMap, GREY};
use crate::imaging::matrix::neighbour_sum;

/// Lines before the first data row: one header plus four metadata rows.
const HEADER_LINES: usize = 5;

// ---------------------------------------------------------------------------
// Folder loader
// ---------------------------------------------------------------------------

/// Read every element CSV of an EDX export folder.
///
/// Files containing `Point` (spot analyses) are ignored.  The pixel size is
/// taken from the first file in name order.  When no `Grey` CSV exists a
/// `*Grey*.tif` electron image is used instead.
pub fn read_element_folder(folder: &Path) -> Result<ElementDataset> {
    let files = csv_files(folder)?;
    let first = files
        .first()
        .ok_or_else(|| DataError::EmptyFolder(folder.to_path_buf()))?;

    let resolution = obtain_resolution(first)?;
    let mut dataset = ElementDataset::new(Some(resolution));

    for path in &files {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();
        let name = element_name(file_name);
        let map = remove_noise_data(&read_element_csv(path)?);
        log::debug!("{}: {name} {:?}", folder.display(), map.dim());
        dataset.insert(name, map);
    }

    if dataset.get(GREY).is_none() {
        if let Some(tif) = grey_tif(folder)? {
            dataset.insert(GREY, read_grey_image(&tif)?);
        }
    }

    if let Some(grey) = dataset.maps.get_mut(GREY) {
        grey.mapv_inplace(|v| v as u8 as f64);
    }

    Ok(dataset)
}

fn csv_files(folder: &Path) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = list_files(folder)?
        .into_iter()
        .filter(|p| {
            let name = p.file_name().and_then(|n| n.to_str()).unwrap_or_default();
            name.ends_with(".csv") && !name.contains("Point")
        })
        .collect();
    files.sort();
    Ok(files)
}

fn grey_tif(folder: &Path) -> Result<Option<PathBuf>> {
    let mut tifs: Vec<PathBuf> = list_files(folder)?
        .into_iter()
        .filter(|p| {
            let name = p.file_name().and_then(|n| n.to_str()).unwrap_or_default();
            name.ends_with(".tif") && name.contains(GREY)
        })
        .collect();
    tifs.sort();
    Ok(tifs.into_iter().next())
}

fn list_files(folder: &Path) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(folder)
        .with_context(|| format!("listing {}", folder.display()))?;
    let mut files = Vec::new();
    for entry in entries {
        let path = entry.context("reading directory entry")?.path();
        if path.is_file() {
            files.push(path);
        }
    }
    Ok(files)
}

fn read_grey_image(path: &Path) -> Result<ElementMap> {
    let img = image::open(path)
        .with_context(|| format!("opening {}", path.display()))?
        .to_luma8();
    let (w, h) = img.dimensions();
    Ok(Array2::from_shape_fn((h as usize, w as usize), |(r, c)| {
        img.get_pixel(c as u32, r as u32)[0] as f64
    }))
}

/// Element symbol from an export file name: `Tile 3_Fe K.csv` → `Fe`.
pub fn element_name(file_name: &str) -> String {
    let tail = file_name.rsplit('_').next().unwrap_or(file_name);
    let stem = tail.split('.').next().unwrap_or(tail);
    stem.split(' ').next().unwrap_or(stem).to_string()
}

// ---------------------------------------------------------------------------
// Single CSV file
// ---------------------------------------------------------------------------

/// Read the numeric block of an element CSV, skipping the metadata header.
pub fn read_element_csv(path: &Path) -> Result<ElementMap> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("opening {}", path.display()))?;

    let mut values = Vec::new();
    let mut width: Option<usize> = None;
    let mut rows = 0usize;

    for (row_no, result) in reader.records().enumerate().skip(HEADER_LINES) {
        let record = result.with_context(|| format!("{}: CSV row {row_no}", path.display()))?;
        let mut cells: Vec<&str> = record.iter().collect();
        while cells.last().is_some_and(|c| c.trim().is_empty()) {
            cells.pop();
        }
        if cells.is_empty() {
            continue;
        }

        let expected = *width.get_or_insert(cells.len());
        if cells.len() != expected {
            return Err(DataError::RaggedRow {
                path: path.to_path_buf(),
                row: row_no,
                found: cells.len(),
                expected,
            }
            .into());
        }

        for (col, cell) in cells.iter().enumerate() {
            let v = cell.trim().parse::<f64>().map_err(|_| DataError::BadNumber {
                path: path.to_path_buf(),
                row: row_no,
                col,
                value: cell.to_string(),
            })?;
            values.push(v);
        }
        rows += 1;
    }

    let cols = width.ok_or_else(|| DataError::NoDataRows(path.to_path_buf()))?;
    Ok(Array2::from_shape_vec((rows, cols), values)?)
}

/// Pixel size in micrometres, from the `Pixel Size` metadata row.
pub fn obtain_resolution(path: &Path) -> Result<f64> {
    let file = fs::File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let line = BufReader::new(file)
        .lines()
        .nth(3)
        .transpose()
        .with_context(|| format!("reading {}", path.display()))?
        .unwrap_or_default();
    parse_resolution(&line).ok_or_else(|| {
        DataError::BadResolution {
            path: path.to_path_buf(),
            line: line.clone(),
        }
        .into()
    })
}

fn parse_resolution(line: &str) -> Option<f64> {
    let (_, after) = line.split_once("Size,")?;
    if let Some((value, _)) = after.split_once("um") {
        value.trim().parse().ok()
    } else {
        let (value, _) = after.split_once("nm")?;
        value.trim().parse::<f64>().ok().map(|nm| nm / 1000.0)
    }
}

// ---------------------------------------------------------------------------
// Noise removal
// ---------------------------------------------------------------------------

/// Zero every pixel whose eight neighbours are all empty.
pub fn remove_noise_data(map: &ElementMap) -> ElementMap {
    let sums = neighbour_sum(map);
    let mut out = map.clone();
    out.zip_mut_with(&sums, |v, &s| {
        if s == 0.0 {
            *v = 0.0;
        }
    });
    out
}

// ---------------------------------------------------------------------------
// Writer
// ---------------------------------------------------------------------------

/// File name used for an exported element map.
pub fn atom_file_name(task_name: &str, element: &str) -> String {
    format!("{task_name} atom__{element} K.csv")
}

/// Write one element map in the EDX export layout.
pub fn write_atom_data(
    dir: &Path,
    task_name: &str,
    element: &str,
    resolution: f64,
    map: &ElementMap,
) -> Result<PathBuf> {
    let path = dir.join(atom_file_name(task_name, element));
    let (rows, cols) = map.dim();
    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .from_path(&path)
        .with_context(|| format!("creating {}", path.display()))?;

    let header = format!("{element} K");
    let x_pixels = cols.to_string();
    let y_pixels = rows.to_string();
    let pixel_size = format!("{resolution:.6} um");
    writer.write_record(["Image Name", header.as_str()])?;
    writer.write_record(["Number X Pixels", x_pixels.as_str()])?;
    writer.write_record(["Number Y Pixels", y_pixels.as_str()])?;
    writer.write_record(["Pixel Size", pixel_size.as_str()])?;
    writer.write_record(["Data Type", "AT% x 100"])?;
    for row in map.outer_iter() {
        writer.write_record(row.iter().map(|v| v.to_string()))?;
    }
    writer.flush().with_context(|| format!("writing {}", path.display()))?;
    Ok(path)
}

/// Write every map of a dataset into `dir`.
pub fn write_element_dataset(dir: &Path, task_name: &str, dataset: &ElementDataset) -> Result<()> {
    fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    let resolution = dataset.resolution.unwrap_or(1.0);
    for (element, map) in &dataset.maps {
        write_atom_data(dir, task_name, element, resolution, map)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn write_export(dir: &Path, name: &str, pixel_size: &str, rows: &[&str]) {
        let mut text = String::from("Image Name,Fe K\nNumber X Pixels,3\nNumber Y Pixels,2\n");
        text.push_str(&format!("Pixel Size,{pixel_size}\nData Type,AT% x 100\n"));
        for r in rows {
            text.push_str(r);
            text.push('\n');
        }
        fs::write(dir.join(name), text).unwrap();
    }

    #[test]
    fn parses_element_names() {
        assert_eq!(element_name("Tile 3_Fe K.csv"), "Fe");
        assert_eq!(element_name("A1 atom__Grey K.csv"), "Grey");
        assert_eq!(element_name("Si.csv"), "Si");
    }

    #[test]
    fn reads_resolution_in_um_and_nm() {
        assert_eq!(parse_resolution("Pixel Size,0.250000 um"), Some(0.25));
        assert_eq!(parse_resolution("Pixel Size,125 nm"), Some(0.125));
        assert_eq!(parse_resolution("Pixel Size,abc"), None);
    }

    #[test]
    fn reads_csv_and_drops_trailing_empty_cells() {
        let dir = tempfile::tempdir().unwrap();
        write_export(dir.path(), "t_Fe K.csv", "1.5 um", &["1,2,3,", "4,5,6,"]);
        let map = read_element_csv(&dir.path().join("t_Fe K.csv")).unwrap();
        assert_eq!(map, array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]);
    }

    #[test]
    fn ragged_rows_are_a_schema_error() {
        let dir = tempfile::tempdir().unwrap();
        write_export(dir.path(), "t_Fe K.csv", "1 um", &["1,2,3", "4,5"]);
        let err = read_element_csv(&dir.path().join("t_Fe K.csv")).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DataError>(),
            Some(DataError::RaggedRow { found: 2, expected: 3, .. })
        ));
    }

    #[test]
    fn non_numeric_cells_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        write_export(dir.path(), "t_Fe K.csv", "1 um", &["1,x,3"]);
        let err = read_element_csv(&dir.path().join("t_Fe K.csv")).unwrap_err();
        assert!(matches!(err.downcast_ref::<DataError>(), Some(DataError::BadNumber { col: 1, .. })));
    }

    #[test]
    fn empty_folder_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("Point 1_Fe K.csv"), "x").unwrap();
        let err = read_element_folder(dir.path()).unwrap_err();
        assert!(err.to_string().ends_with("is empty"));
    }

    #[test]
    fn bad_pixel_size_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        write_export(dir.path(), "t_Fe K.csv", "unknown", &["1,2,3"]);
        let err = read_element_folder(dir.path()).unwrap_err();
        assert!(matches!(err.downcast_ref::<DataError>(), Some(DataError::BadResolution { .. })));
    }

    #[test]
    fn noise_removal_clears_isolated_pixels_only() {
        let map = array![
            [0.0, 0.0, 0.0, 0.0, 0.0],
            [0.0, 7.0, 0.0, 0.0, 0.0],
            [0.0, 0.0, 0.0, 0.0, 0.0],
            [0.0, 0.0, 0.0, 2.0, 3.0],
            [0.0, 0.0, 0.0, 0.0, 0.0]
        ];
        let clean = remove_noise_data(&map);
        assert_eq!(clean[[1, 1]], 0.0);
        assert_eq!(clean[[3, 3]], 2.0);
        assert_eq!(clean[[3, 4]], 3.0);
    }

    #[test]
    fn grey_tif_is_used_when_no_grey_csv_exists() {
        let dir = tempfile::tempdir().unwrap();
        write_export(dir.path(), "t_Fe K.csv", "1 um", &["1,2,3", "4,5,6"]);
        image::GrayImage::from_raw(2, 1, vec![7, 9])
            .unwrap()
            .save(dir.path().join("t_Grey.tif"))
            .unwrap();

        let ds = read_element_folder(dir.path()).unwrap();
        assert_eq!(ds.get(GREY), Some(&array![[7.0, 9.0]]));
        assert_eq!(ds.get("Fe").map(|m| m.dim()), Some((2, 3)));
    }

    #[test]
    fn grey_csv_values_are_clamped_to_bytes() {
        let dir = tempfile::tempdir().unwrap();
        write_export(dir.path(), "t_Grey K.csv", "1 um", &["300,-4,10", "20,30,40"]);
        let ds = read_element_folder(dir.path()).unwrap();
        let grey = ds.get(GREY).unwrap();
        assert_eq!(grey[[0, 0]], 255.0);
        assert_eq!(grey[[0, 1]], 0.0);
        assert_eq!(grey[[1, 2]], 40.0);
    }

    #[test]
    fn folder_round_trips_through_atom_files() {
        let src = tempfile::tempdir().unwrap();
        let mut ds = ElementDataset::new(Some(0.125));
        ds.insert("Fe", array![[1.0, 2.0], [3.0, 4.5]]);
        ds.insert("Grey", array![[10.0, 20.0], [30.0, 255.0]]);
        write_element_dataset(src.path(), "A1_A2", &ds).unwrap();

        assert!(src.path().join("A1_A2 atom__Fe K.csv").exists());
        let back = read_element_folder(src.path()).unwrap();
        assert_eq!(back, ds);
    }
}
