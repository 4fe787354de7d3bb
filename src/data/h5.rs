//! HDF5 passthrough: one 2-D dataset per element plus a scalar `resolution`.
//!
//! Requires the `hdf5-support` feature.  Without it every call reports
//! [`DataError::Hdf5Disabled`] so the rest of the app keeps working on CSV.

use std::path::Path;

use anyhow::Result;

use super::model::ElementDataset;

/// Deflate level used when writing, matching the tools that produce these files.
pub const DEFAULT_COMPRESSION: u8 = 3;

/// Whether this build can read and write HDF5.
pub const ENABLED: bool = cfg!(feature = "hdf5-support");

#[cfg(feature = "hdf5-support")]
pub use enabled::{read_all_datasets, write_all_datasets};

#[cfg(not(feature = "hdf5-support"))]
pub fn read_all_datasets(path: &Path) -> Result<ElementDataset> {
    Err(super::error::DataError::Hdf5Disabled(path.to_path_buf()).into())
}

#[cfg(not(feature = "hdf5-support"))]
pub fn write_all_datasets(path: &Path, _dataset: &ElementDataset, _compression: u8) -> Result<()> {
    Err(super::error::DataError::Hdf5Disabled(path.to_path_buf()).into())
}

#[cfg(feature = "hdf5-support")]
mod enabled {
    use super::*;

    use anyhow::Context;
    use ::hdf5::File as H5File;

    use crate::data::model::RESOLUTION;

    /// Read every top-level dataset of `path`.
    ///
    /// 2-D datasets become maps; a scalar `resolution` becomes the pixel size.
    /// Anything else is skipped.
    pub fn read_all_datasets(path: &Path) -> Result<ElementDataset> {
        let file = H5File::open(path).with_context(|| format!("opening {}", path.display()))?;
        let mut dataset = ElementDataset::default();

        let names = file
            .member_names()
            .with_context(|| format!("listing members of {}", path.display()))?;

        for name in names {
            let Ok(ds) = file.dataset(&name) else {
                log::debug!("{}: '{name}' is not a dataset", path.display());
                continue;
            };
            match ds.ndim() {
                0 if name == RESOLUTION => {
                    let res: f64 = ds
                        .read_scalar()
                        .with_context(|| format!("reading '{name}' from {}", path.display()))?;
                    dataset.resolution = Some(res);
                }
                2 => {
                    let map = ds
                        .read_2d::<f64>()
                        .with_context(|| format!("reading '{name}' from {}", path.display()))?;
                    dataset.insert(name, map);
                }
                n => log::warn!("{}: skipping '{name}' with {n} dimensions", path.display()),
            }
        }

        Ok(dataset)
    }

    /// Write every map as a compressed dataset, replacing `path`.
    pub fn write_all_datasets(path: &Path, dataset: &ElementDataset, compression: u8) -> Result<()> {
        let file = H5File::create(path).with_context(|| format!("creating {}", path.display()))?;

        for (name, map) in &dataset.maps {
            file.new_dataset_builder()
                .with_data(map)
                .deflate(compression)
                .create(name.as_str())
                .with_context(|| format!("writing '{name}' to {}", path.display()))?;
        }

        if let Some(res) = dataset.resolution {
            file.new_dataset::<f64>()
                .create(RESOLUTION)
                .and_then(|ds| ds.write_scalar(&res))
                .with_context(|| format!("writing '{RESOLUTION}' to {}", path.display()))?;
        }

        Ok(())
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use ndarray::array;

        #[test]
        fn round_trips_maps_and_resolution() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("tile.h5");
            let mut ds = ElementDataset::new(Some(0.2));
            ds.insert("Fe", array![[1.0, 2.0], [3.0, 4.0]]);
            ds.insert("Grey", array![[0.0, 128.0], [255.0, 1.0]]);

            write_all_datasets(&path, &ds, DEFAULT_COMPRESSION).unwrap();
            assert_eq!(read_all_datasets(&path).unwrap(), ds);
        }
    }
}

#[cfg(all(test, not(feature = "hdf5-support")))]
mod tests {
    use super::*;
    use crate::data::error::DataError;

    #[test]
    fn disabled_build_reports_missing_support() {
        let err = read_all_datasets(Path::new("tile.h5")).unwrap_err();
        assert!(matches!(err.downcast_ref::<DataError>(), Some(DataError::Hdf5Disabled(_))));
    }
}
