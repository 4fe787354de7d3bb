//! Writes a demo workspace with two overlapping EDX tiles.
//!
//! ```text
//! cargo run --bin generate_sample -- [output_dir]
//! ```
//!
//! Both tiles are cut from one synthetic specimen; the right tile starts
//! `SHIFT_X` pixels further along, so stitching them with `dx = SHIFT_X`
//! reproduces the specimen.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

const ROWS: usize = 96;
const COLS: usize = 128;
const SHIFT_X: usize = 80;
const PIXEL_SIZE_NM: f64 = 250.0;

/// Grain centres (row, col, radius) of each element in the specimen.
const GRAINS: [(&str, &[(f64, f64, f64)]); 3] = [
    ("Fe", &[(30.0, 40.0, 14.0), (70.0, 120.0, 18.0), (20.0, 170.0, 10.0)]),
    ("Si", &[(60.0, 30.0, 20.0), (40.0, 100.0, 12.0), (80.0, 190.0, 15.0)]),
    ("O", &[(50.0, 60.0, 30.0), (45.0, 150.0, 35.0)]),
];

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }
}

/// Specimen-wide map of one element: counts inside grains, sparse hits outside.
fn specimen(grains: &[(f64, f64, f64)], width: usize, rng: &mut SimpleRng) -> Vec<Vec<f64>> {
    (0..ROWS)
        .map(|r| {
            (0..width)
                .map(|c| {
                    let inside = grains.iter().any(|&(gr, gc, radius)| {
                        let (dr, dc) = (r as f64 - gr, c as f64 - gc);
                        dr * dr + dc * dc < radius * radius
                    });
                    if inside {
                        (800.0 + 400.0 * rng.next_f64()).round()
                    } else if rng.next_f64() < 0.01 {
                        // isolated detector hit
                        (200.0 * rng.next_f64()).round()
                    } else {
                        0.0
                    }
                })
                .collect()
        })
        .collect()
}

fn grey(width: usize) -> Vec<Vec<f64>> {
    (0..ROWS)
        .map(|r| {
            (0..width)
                .map(|c| (64.0 + 48.0 * ((r as f64 / 9.0).sin() + (c as f64 / 13.0).cos())).round())
                .collect()
        })
        .collect()
}

fn write_map(dir: &Path, tile: &str, element: &str, data: &[Vec<f64>], offset: usize) -> Result<()> {
    let path = dir.join(format!("{tile}_{element} K.csv"));
    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .from_path(&path)
        .with_context(|| format!("creating {}", path.display()))?;

    let header = format!("{element} K");
    let x_pixels = COLS.to_string();
    let y_pixels = ROWS.to_string();
    let pixel_size = format!("{PIXEL_SIZE_NM} nm");
    writer.write_record(["Image Name", header.as_str()])?;
    writer.write_record(["Number X Pixels", x_pixels.as_str()])?;
    writer.write_record(["Number Y Pixels", y_pixels.as_str()])?;
    writer.write_record(["Pixel Size", pixel_size.as_str()])?;
    writer.write_record(["Data Type", "Counts"])?;
    for row in data {
        writer.write_record(row[offset..offset + COLS].iter().map(|v| v.to_string()))?;
    }
    writer.flush()?;
    Ok(())
}

fn main() -> Result<()> {
    let root = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("sample_workspace"));
    let width = COLS + SHIFT_X;
    let mut rng = SimpleRng::new(42);

    let mut maps: Vec<(&str, Vec<Vec<f64>>)> = GRAINS
        .iter()
        .map(|(element, grains)| (*element, specimen(grains, width, &mut rng)))
        .collect();
    maps.push(("Grey", grey(width)));

    for (tile, offset) in [("Area1", 0), ("Area2", SHIFT_X)] {
        let dir = root.join(tile);
        fs::create_dir_all(&dir).with_context(|| format!("creating {}", dir.display()))?;
        for (element, data) in &maps {
            write_map(&dir, tile, element, data, offset)?;
        }
    }

    println!(
        "Wrote 2 tiles ({ROWS}×{COLS}, {} elements) to {}; stitch with dx = {SHIFT_X}",
        maps.len(),
        root.display()
    );
    Ok(())
}
