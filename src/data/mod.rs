/// Data layer: core types, loading, and writing.
///
/// Architecture:
/// ```text
///   root/
///   ├── Area1/  *.csv, *Grey*.tif, Area1.h5
///   ├── Area2/
///   └── Output/Area1_2/  Area1_2.json, Area1_2.h5, atom CSVs
///        │
///        ▼
///   ┌───────────┐
///   │ workspace │  scan root → tiles + saved tasks
///   └───────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  loader  │  .h5 cache or element CSVs → ElementDataset
///   └──────────┘
///        │
///        ▼
///   ┌────────────────┐
///   │ ElementDataset │  element → Array2<f64>, pixel size
///   └────────────────┘
/// ```
pub mod element;
pub mod error;
pub mod h5;
pub mod loader;
pub mod model;
pub mod task;
pub mod workspace;
