use std::collections::{BTreeMap, BTreeSet};

use ndarray::Array2;

/// Field name reserved for the electron (grey) image of a tile.
pub const GREY: &str = "Grey";

/// Name under which the pixel size is stored next to the maps.
pub const RESOLUTION: &str = "resolution";

/// A single element map: rows are pixel rows, columns are pixel columns.
pub type ElementMap = Array2<f64>;

// ---------------------------------------------------------------------------
// ElementDataset – all maps of one tile
// ---------------------------------------------------------------------------

/// The maps of one scanned tile, keyed by element symbol (or `Grey`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ElementDataset {
    /// Element symbol → map.  Never contains [`RESOLUTION`].
    pub maps: BTreeMap<String, ElementMap>,
    /// Pixel size in micrometres, when the source recorded one.
    pub resolution: Option<f64>,
}

impl ElementDataset {
    pub fn new(resolution: Option<f64>) -> Self {
        Self {
            maps: BTreeMap::new(),
            resolution,
        }
    }

    /// Insert a map.  The reserved `resolution` name is ignored.
    pub fn insert(&mut self, field: impl Into<String>, map: ElementMap) {
        let field = field.into();
        if field == RESOLUTION {
            log::warn!("Ignoring map named '{RESOLUTION}'");
            return;
        }
        self.maps.insert(field, map);
    }

    pub fn get(&self, field: &str) -> Option<&ElementMap> {
        self.maps.get(field)
    }

    /// Field names in sorted order.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.maps.keys().map(String::as_str)
    }

    /// Number of maps.
    pub fn len(&self) -> usize {
        self.maps.len()
    }

    /// Whether the dataset holds no maps.
    pub fn is_empty(&self) -> bool {
        self.maps.is_empty()
    }

    /// Fields present in both datasets, sorted.
    pub fn common_fields(&self, other: &ElementDataset) -> Vec<String> {
        let mine: BTreeSet<&String> = self.maps.keys().collect();
        other
            .maps
            .keys()
            .filter(|k| mine.contains(k))
            .cloned()
            .collect()
    }

    /// Per-field summary rows for the dataset table.
    pub fn summaries(&self) -> Vec<FieldSummary> {
        self.maps
            .iter()
            .map(|(name, map)| FieldSummary::of(name, map))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// FieldSummary – one table row
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct FieldSummary {
    pub name: String,
    pub rows: usize,
    pub cols: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
}

impl FieldSummary {
    pub fn of(name: &str, map: &ElementMap) -> Self {
        let (rows, cols) = map.dim();
        let min = map.iter().cloned().fold(f64::INFINITY, f64::min);
        let max = map.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let mean = map.mean().unwrap_or(f64::NAN);
        Self {
            name: name.to_string(),
            rows,
            cols,
            min,
            max,
            mean,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn common_fields_are_sorted_intersection() {
        let mut a = ElementDataset::new(Some(0.5));
        a.insert("Fe", array![[1.0]]);
        a.insert("Grey", array![[2.0]]);
        a.insert("O", array![[3.0]]);
        let mut b = ElementDataset::new(None);
        b.insert("O", array![[1.0]]);
        b.insert("Fe", array![[1.0]]);
        b.insert("Si", array![[1.0]]);

        assert_eq!(a.common_fields(&b), vec!["Fe".to_string(), "O".to_string()]);
    }

    #[test]
    fn resolution_name_is_reserved() {
        let mut ds = ElementDataset::default();
        ds.insert(RESOLUTION, array![[1.0]]);
        assert!(ds.is_empty());
    }

    #[test]
    fn summary_reports_shape_and_range() {
        let s = FieldSummary::of("Fe", &array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]);
        assert_eq!((s.rows, s.cols), (2, 3));
        assert_eq!(s.min, 1.0);
        assert_eq!(s.max, 6.0);
        assert!((s.mean - 3.5).abs() < 1e-12);
    }
}
