use eframe::egui::{Color32, ColorImage};
use ndarray::Array2;
use palette::{Hsl, IntoColor, Srgb};

use crate::imaging::pair::{normalise, to_rgb8, PairMethod, RgbImage};

// ---------------------------------------------------------------------------
// Color palette generator
// ---------------------------------------------------------------------------

fn hsl_to_color32(hue: f32, saturation: f32, lightness: f32) -> Color32 {
    let rgb: Srgb = Hsl::new(hue, saturation, lightness).into_color();
    Color32::from_rgb(
        (rgb.red * 255.0) as u8,
        (rgb.green * 255.0) as u8,
        (rgb.blue * 255.0) as u8,
    )
}

/// Generates `n` visually distinct colours using evenly spaced hues.
pub fn generate_palette(n: usize) -> Vec<Color32> {
    (0..n)
        .map(|i| hsl_to_color32((i as f32 / n as f32) * 360.0, 0.75, 0.55))
        .collect()
}

// ---------------------------------------------------------------------------
// Heatmap for single element maps
// ---------------------------------------------------------------------------

/// Blue → red lookup table for showing one map on its own.
#[derive(Debug, Clone)]
pub struct Heatmap {
    lut: Vec<Color32>,
}

impl Default for Heatmap {
    fn default() -> Self {
        Self::new(256)
    }
}

impl Heatmap {
    pub fn new(steps: usize) -> Self {
        let steps = steps.max(2);
        let lut = (0..steps)
            .map(|i| {
                let t = i as f32 / (steps - 1) as f32;
                // Hue runs from blue (240°) to red (0°); zero stays black.
                if i == 0 {
                    Color32::BLACK
                } else {
                    hsl_to_color32(240.0 * (1.0 - t), 0.85, 0.25 + 0.3 * t)
                }
            })
            .collect();
        Self { lut }
    }

    /// Colour of a value in `[0, 1]`; out-of-range values are clamped.
    pub fn color_for(&self, v: f64) -> Color32 {
        let last = self.lut.len() - 1;
        let idx = (v.clamp(0.0, 1.0) * last as f64).round() as usize;
        self.lut[idx.min(last)]
    }

    /// Render a map scaled to its own maximum.
    pub fn render(&self, map: &Array2<f64>) -> ColorImage {
        let scaled = normalise(map);
        let (rows, cols) = scaled.dim();
        let mut img = ColorImage::new([cols, rows], Color32::BLACK);
        img.pixels = scaled.iter().map(|&v| self.color_for(v)).collect();
        img
    }
}

// ---------------------------------------------------------------------------
// Comparison image helpers
// ---------------------------------------------------------------------------

/// Convert an `(rows, cols, 3)` image to an egui texture image.
pub fn rgb_to_color_image(img: &RgbImage) -> ColorImage {
    let (rows, cols, _) = img.dim();
    ColorImage::from_rgb([cols, rows], &to_rgb8(img))
}

/// Legend entries (label → colour) describing how a pair method is drawn.
pub fn legend_entries(method: PairMethod, left: &str, right: &str) -> Vec<(String, Color32)> {
    match method {
        PairMethod::Falsecolor => vec![
            (left.to_string(), Color32::RED),
            (right.to_string(), Color32::GREEN),
            ("overlap".to_string(), Color32::YELLOW),
        ],
        PairMethod::Diff => vec![("|left − right|".to_string(), Color32::WHITE)],
        PairMethod::Blend => vec![("½ left + ½ right".to_string(), Color32::WHITE)],
        PairMethod::Checkerboard => vec![
            (left.to_string(), Color32::WHITE),
            (right.to_string(), Color32::GRAY),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array3};

    #[test]
    fn palette_has_requested_size() {
        assert!(generate_palette(0).is_empty());
        let p = generate_palette(5);
        assert_eq!(p.len(), 5);
        assert_ne!(p[0], p[1]);
    }

    #[test]
    fn heatmap_keeps_zero_black_and_clamps() {
        let h = Heatmap::default();
        assert_eq!(h.color_for(0.0), Color32::BLACK);
        assert_eq!(h.color_for(-3.0), Color32::BLACK);
        assert_eq!(h.color_for(7.0), h.color_for(1.0));
    }

    #[test]
    fn heatmap_image_is_sized_width_first() {
        let img = Heatmap::default().render(&array![[0.0, 1.0, 2.0], [3.0, 4.0, 5.0]]);
        assert_eq!(img.size, [3, 2]);
        assert_eq!(img.pixels.len(), 6);
    }

    #[test]
    fn rgb_conversion_keeps_pixel_order() {
        let mut img = Array3::zeros((1, 2, 3));
        img[[0, 1, 0]] = 1.0;
        let ci = rgb_to_color_image(&img);
        assert_eq!(ci.size, [2, 1]);
        assert_eq!(ci.pixels[1], Color32::from_rgb(255, 0, 0));
        assert_eq!(ci.pixels[0], Color32::from_rgb(0, 0, 0));
    }
}
