use std::fmt;
use std::str::FromStr;

use ndarray::{Array2, Array3, Zip};
use serde::{Deserialize, Serialize};

use super::ImagingError;

/// An RGB image with channels in `[0, 1]`, shaped `(rows, cols, 3)`.
pub type RgbImage = Array3<f64>;

// ---------------------------------------------------------------------------
// PairMethod – how two maps are shown together
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PairMethod {
    /// Absolute difference, in grey.
    Diff,
    /// 50 % of each image.
    Blend,
    /// One-pixel checkerboard alternating between the images.
    Checkerboard,
    /// Left in red, right in green.
    #[default]
    Falsecolor,
}

impl PairMethod {
    pub const ALL: [PairMethod; 4] = [
        PairMethod::Falsecolor,
        PairMethod::Diff,
        PairMethod::Blend,
        PairMethod::Checkerboard,
    ];
}

impl fmt::Display for PairMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PairMethod::Diff => "diff",
            PairMethod::Blend => "blend",
            PairMethod::Checkerboard => "checkerboard",
            PairMethod::Falsecolor => "falsecolor",
        };
        write!(f, "{name}")
    }
}

impl FromStr for PairMethod {
    type Err = ImagingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "diff" => Ok(PairMethod::Diff),
            "blend" => Ok(PairMethod::Blend),
            "checkerboard" => Ok(PairMethod::Checkerboard),
            "falsecolor" => Ok(PairMethod::Falsecolor),
            other => Err(ImagingError::UnknownMethod(other.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Pair rendering
// ---------------------------------------------------------------------------

/// Combine two equally sized maps into one RGB image.
pub fn show_pair(
    a: &Array2<f64>,
    b: &Array2<f64>,
    method: PairMethod,
) -> Result<RgbImage, ImagingError> {
    if a.dim() != b.dim() {
        return Err(ImagingError::ShapeMismatch(a.dim(), b.dim()));
    }

    let grey = |m: Array2<f64>| -> RgbImage {
        let (rows, cols) = m.dim();
        Array3::from_shape_fn((rows, cols, 3), |(r, c, _)| m[[r, c]])
    };

    let out = match method {
        PairMethod::Diff => grey(Zip::from(a).and(b).map_collect(|&x, &y| (x - y).abs())),
        PairMethod::Blend => grey(Zip::from(a).and(b).map_collect(|&x, &y| 0.5 * x + 0.5 * y)),
        PairMethod::Checkerboard => grey(Array2::from_shape_fn(a.dim(), |(r, c)| {
            if (r + c) % 2 == 0 {
                a[[r, c]]
            } else {
                b[[r, c]]
            }
        })),
        PairMethod::Falsecolor => {
            let (rows, cols) = a.dim();
            Array3::from_shape_fn((rows, cols, 3), |(r, c, ch)| match ch {
                0 => a[[r, c]],
                1 => b[[r, c]],
                _ => 0.0,
            })
        }
    };
    Ok(out)
}

/// Scale a map so its maximum becomes 1.  Maps without a positive maximum
/// are returned unchanged.
pub fn normalise(map: &Array2<f64>) -> Array2<f64> {
    let max = map.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    if max > 0.0 && max.is_finite() {
        map / max
    } else {
        map.clone()
    }
}

/// Startup image: two overlapping disks rendered in falsecolor.
pub fn placeholder() -> RgbImage {
    let size = 256;
    let a = disk(size, (size / 2, size / 2), 50);
    let b = disk(size, (size / 4, size / 4), 50);
    // Same shape by construction.
    show_pair(&a, &b, PairMethod::Falsecolor).unwrap_or_else(|_| Array3::zeros((size, size, 3)))
}

fn disk(size: usize, centre: (usize, usize), radius: usize) -> Array2<f64> {
    let (cr, cc) = (centre.0 as f64, centre.1 as f64);
    let r2 = (radius * radius) as f64;
    Array2::from_shape_fn((size, size), |(r, c)| {
        let dr = r as f64 - cr;
        let dc = c as f64 - cc;
        if dr * dr + dc * dc < r2 {
            1.0
        } else {
            0.0
        }
    })
}

/// Quantise an RGB image to packed 8-bit RGB, row-major.
pub fn to_rgb8(img: &RgbImage) -> Vec<u8> {
    img.iter()
        .map(|v| (v.clamp(0.0, 1.0) * 255.0).round() as u8)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn falsecolor_puts_left_in_red_and_right_in_green() {
        let a = array![[1.0, 0.0]];
        let b = array![[0.0, 0.5]];
        let out = show_pair(&a, &b, PairMethod::Falsecolor).unwrap();
        assert_eq!(out.dim(), (1, 2, 3));
        assert_eq!(out[[0, 0, 0]], 1.0);
        assert_eq!(out[[0, 1, 1]], 0.5);
        assert_eq!(out[[0, 0, 2]], 0.0);
    }

    #[test]
    fn checkerboard_alternates_sources() {
        let a = Array2::from_elem((2, 2), 1.0);
        let b = Array2::from_elem((2, 2), 2.0);
        let out = show_pair(&a, &b, PairMethod::Checkerboard).unwrap();
        assert_eq!(out[[0, 0, 0]], 1.0);
        assert_eq!(out[[0, 1, 0]], 2.0);
        assert_eq!(out[[1, 0, 0]], 2.0);
        assert_eq!(out[[1, 1, 0]], 1.0);
    }

    #[test]
    fn diff_and_blend() {
        let a = array![[1.0]];
        let b = array![[0.25]];
        assert_eq!(show_pair(&a, &b, PairMethod::Diff).unwrap()[[0, 0, 1]], 0.75);
        assert_eq!(show_pair(&a, &b, PairMethod::Blend).unwrap()[[0, 0, 2]], 0.625);
    }

    #[test]
    fn mismatched_shapes_are_rejected() {
        let err = show_pair(&Array2::zeros((2, 2)), &Array2::zeros((2, 3)), PairMethod::Diff);
        assert_eq!(err, Err(ImagingError::ShapeMismatch((2, 2), (2, 3))));
    }

    #[test]
    fn method_names_parse() {
        for m in PairMethod::ALL {
            assert_eq!(m.to_string().parse::<PairMethod>().unwrap(), m);
        }
        assert!("sideways".parse::<PairMethod>().is_err());
    }

    #[test]
    fn normalise_leaves_blank_maps_alone() {
        assert_eq!(normalise(&array![[0.0, 0.0]]), array![[0.0, 0.0]]);
        assert_eq!(normalise(&array![[2.0, 4.0]]), array![[0.5, 1.0]]);
    }

    #[test]
    fn placeholder_has_both_disks() {
        let img = placeholder();
        assert_eq!(img.dim(), (256, 256, 3));
        assert_eq!(img[[128, 128, 0]], 1.0);
        assert_eq!(img[[64, 64, 1]], 1.0);
        assert_eq!(img[[250, 5, 0]], 0.0);
    }
}
