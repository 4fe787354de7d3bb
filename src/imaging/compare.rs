use ndarray::{s, Array2, Zip};

use super::matrix::{add_small_to_big_periodically, round_half_even};
use super::pair::RgbImage;
use super::ImagingError;

// ---------------------------------------------------------------------------
// Alignment input
// ---------------------------------------------------------------------------

/// User-controlled placement of the right tile relative to the left one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    /// Horizontal slider position, 0..=100.
    pub percent_x: f64,
    /// Vertical slider position, 0..=100.
    pub percent_y: f64,
    /// Fine horizontal shift in pixels.
    pub dx: i64,
    /// Fine vertical shift in pixels.
    pub dy: i64,
}

impl Default for Placement {
    fn default() -> Self {
        Self {
            percent_x: 50.0,
            percent_y: 50.0,
            dx: 0,
            dy: 0,
        }
    }
}

/// Offset of the right tile centre from the canvas centre, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Offset {
    pub add_x: i64,
    pub add_y: i64,
}

/// Both tiles placed on a shared `3·rows × 3·cols` canvas.
#[derive(Debug, Clone)]
pub struct Prepared {
    pub left: Array2<f64>,
    pub right: Array2<f64>,
    pub offset: Offset,
}

/// Centre `left` on a canvas three times its size.
pub fn precondition_left(left: &Array2<f64>) -> Result<Array2<f64>, ImagingError> {
    let (rows, cols) = left.dim();
    let mut canvas = Array2::zeros((rows * 3, cols * 3));
    let core_x = round_half_even(cols as f64 * 3.0 / 2.0);
    let core_y = round_half_even(rows as f64 * 3.0 / 2.0);
    add_small_to_big_periodically(&mut canvas, left, core_x, core_y)?;
    Ok(canvas)
}

/// Place `right` on a canvas sized after the left tile (`rows × cols`).
pub fn precondition_right(
    right: &Array2<f64>,
    rows: usize,
    cols: usize,
    placement: Placement,
) -> Result<(Array2<f64>, Offset), ImagingError> {
    let mut canvas = Array2::zeros((rows * 3, cols * 3));
    let add_x = round_half_even(
        cols as f64 * 3.0 * placement.percent_x / 100.0 + placement.dx as f64,
    );
    let add_y = round_half_even(
        rows as f64 * 3.0 * placement.percent_y / 100.0 + placement.dy as f64,
    );
    add_small_to_big_periodically(&mut canvas, right, add_x, add_y)?;
    let offset = Offset {
        add_x: add_x - round_half_even(cols as f64 * 1.5),
        add_y: add_y - round_half_even(rows as f64 * 1.5),
    };
    Ok((canvas, offset))
}

/// Place both tiles, optionally transposed first.
pub fn prepare(
    left: &Array2<f64>,
    right: &Array2<f64>,
    transpose: bool,
    placement: Placement,
) -> Result<Prepared, ImagingError> {
    let (left, right) = if transpose {
        (left.t().to_owned(), right.t().to_owned())
    } else {
        (left.to_owned(), right.to_owned())
    };
    let (rows, cols) = left.dim();
    let left_out = precondition_left(&left)?;
    let (right_out, offset) = precondition_right(&right, rows, cols, placement)?;
    Ok(Prepared {
        left: left_out,
        right: right_out,
        offset,
    })
}

// ---------------------------------------------------------------------------
// Content boundary
// ---------------------------------------------------------------------------

/// Pixel bounds of the non-empty region: `left..right` × `top..bottom`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Boundary {
    pub left: usize,
    pub right: usize,
    pub top: usize,
    pub bottom: usize,
}

/// Grey level of an RGB image (ITU-R 709 luma weights).
pub fn rgb_to_grey(img: &RgbImage) -> Array2<f64> {
    let (rows, cols, _) = img.dim();
    Array2::from_shape_fn((rows, cols), |(r, c)| {
        0.2125 * img[[r, c, 0]] + 0.7154 * img[[r, c, 1]] + 0.0721 * img[[r, c, 2]]
    })
}

/// Find the bounds of the pixels brighter than `threshold`.
///
/// Each bound sits one pixel outside the content.  Returns `None` when
/// nothing passes the threshold.
pub fn boundary(img: &RgbImage, threshold: f64) -> Option<Boundary> {
    let grey = rgb_to_grey(img);
    let mask = grey.mapv(|v| if v > threshold { 1usize } else { 0 });
    let per_col: Vec<usize> = mask.sum_axis(ndarray::Axis(0)).to_vec();
    let per_row: Vec<usize> = mask.sum_axis(ndarray::Axis(1)).to_vec();
    let (left, right) = find_border(&per_col)?;
    let (top, bottom) = find_border(&per_row)?;
    Some(Boundary {
        left,
        right,
        top,
        bottom,
    })
}

/// First non-zero index minus one and last non-zero index plus one.
/// Index 0 is never inspected.
fn find_border(sums: &[usize]) -> Option<(usize, usize)> {
    let first = (1..sums.len()).find(|&i| sums[i] != 0)?;
    let last = (1..sums.len()).rev().find(|&i| sums[i] != 0)?;
    Some((first - 1, last + 1))
}

// ---------------------------------------------------------------------------
// Display window
// ---------------------------------------------------------------------------

/// Visible region of the comparison image, in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewWindow {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
}

/// Grow the boundary by `margin` of the image size, clamp to the image and
/// shrink symmetrically by `zoom` (0 = no zoom, 1 = collapsed).
pub fn view_window(b: Boundary, rows: usize, cols: usize, margin: f64, zoom: f64) -> ViewWindow {
    let clamp = |v: i64, hi: usize| v.clamp(0, hi.saturating_sub(1) as i64);
    let left = clamp(round_half_even(b.left as f64 - cols as f64 * margin), cols);
    let right = clamp(round_half_even(b.right as f64 + cols as f64 * margin), cols);
    let top = clamp(round_half_even(b.top as f64 - rows as f64 * margin), rows);
    let bottom = clamp(round_half_even(b.bottom as f64 + rows as f64 * margin), rows);

    let zoom = zoom.clamp(0.0, 1.0);
    let off_x = round_half_even((right - left) as f64 * 0.5 * zoom);
    let off_y = round_half_even((bottom - top) as f64 * 0.5 * zoom);

    ViewWindow {
        x_min: (left + off_x) as f64,
        x_max: (right - off_x) as f64,
        y_min: (top + off_y) as f64,
        y_max: (bottom - off_y) as f64,
    }
}

// ---------------------------------------------------------------------------
// Stitching
// ---------------------------------------------------------------------------

/// Merge two placed tiles and crop to `boundary`.
///
/// Where the right tile has signal it wins; elsewhere the tiles are summed.
pub fn stitch(
    left: &Array2<f64>,
    right: &Array2<f64>,
    b: Boundary,
) -> Result<Array2<f64>, ImagingError> {
    if left.dim() != right.dim() {
        return Err(ImagingError::ShapeMismatch(left.dim(), right.dim()));
    }
    let merged = Zip::from(left).and(right).map_collect(|&l, &r| {
        let sum = l + r;
        if sum > l {
            r
        } else {
            sum
        }
    });
    let (rows, cols) = merged.dim();
    let top = b.top.min(rows);
    let bottom = b.bottom.min(rows).max(top);
    let left_i = b.left.min(cols);
    let right_i = b.right.min(cols).max(left_i);
    Ok(merged.slice(s![top..bottom, left_i..right_i]).to_owned())
}
