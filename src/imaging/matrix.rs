use ndarray::Array2;

use super::ImagingError;

// ---------------------------------------------------------------------------
// Periodic placement
// ---------------------------------------------------------------------------

/// Add `small` into `big` so that its centre lands on (`add_x`, `add_y`).
///
/// The top-left corner of `small` goes to `add - dim / 2` on each axis and
/// indices wrap around the edges of `big`, so a tile pushed past the right
/// border re-enters on the left.
pub fn add_small_to_big_periodically(
    big: &mut Array2<f64>,
    small: &Array2<f64>,
    add_x: i64,
    add_y: i64,
) -> Result<(), ImagingError> {
    let (rows_small, cols_small) = small.dim();
    let (rows_big, cols_big) = big.dim();

    if rows_small > rows_big || cols_small > cols_big {
        return Err(ImagingError::SmallLargerThanBig(small.dim(), big.dim()));
    }

    let start_x = add_x - (cols_small / 2) as i64;
    let start_y = add_y - (rows_small / 2) as i64;

    let cols: Vec<usize> = (0..cols_small)
        .map(|j| wrap(start_x + j as i64, cols_big))
        .collect();

    for (i, row) in small.outer_iter().enumerate() {
        let r = wrap(start_y + i as i64, rows_big);
        for (value, &c) in row.iter().zip(&cols) {
            big[[r, c]] += *value;
        }
    }
    Ok(())
}

fn wrap(idx: i64, len: usize) -> usize {
    idx.rem_euclid(len as i64) as usize
}

// ---------------------------------------------------------------------------
// Neighbourhood sums
// ---------------------------------------------------------------------------

/// D2Q9 lattice directions, minus the rest direction.
const NEIGHBOURS: [(i64, i64); 8] = [
    (1, 0),
    (0, 1),
    (-1, 0),
    (0, -1),
    (1, 1),
    (-1, 1),
    (-1, -1),
    (1, -1),
];

/// Sum of the eight surrounding pixels of every pixel, with periodic edges.
pub fn neighbour_sum(map: &Array2<f64>) -> Array2<f64> {
    let (rows, cols) = map.dim();
    let mut out = Array2::zeros((rows, cols));
    if rows == 0 || cols == 0 {
        return out;
    }
    for ((r, c), slot) in out.indexed_iter_mut() {
        *slot = NEIGHBOURS
            .iter()
            .map(|&(dx, dy)| {
                map[[
                    wrap(r as i64 + dy, rows),
                    wrap(c as i64 + dx, cols),
                ]]
            })
            .sum();
    }
    out
}

/// Round to the nearest integer, ties to even.
pub fn round_half_even(v: f64) -> i64 {
    v.round_ties_even() as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn places_inside_without_wrapping() {
        let mut big = Array2::zeros((5, 5));
        let small = array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0], [7.0, 8.0, 9.0]];
        add_small_to_big_periodically(&mut big, &small, 2, 2).unwrap();
        assert_eq!(big[[1, 1]], 1.0);
        assert_eq!(big[[2, 2]], 5.0);
        assert_eq!(big[[3, 3]], 9.0);
        assert_eq!(big.sum(), small.sum());
    }

    #[test]
    fn wraps_past_right_and_bottom_edges() {
        let mut big = Array2::zeros((4, 4));
        let small = array![[1.0, 2.0], [3.0, 4.0]];
        // start = (3, 3): second column/row re-enter at index 0
        add_small_to_big_periodically(&mut big, &small, 4, 4).unwrap();
        assert_eq!(big[[3, 3]], 1.0);
        assert_eq!(big[[3, 0]], 2.0);
        assert_eq!(big[[0, 3]], 3.0);
        assert_eq!(big[[0, 0]], 4.0);
    }

    #[test]
    fn wraps_past_left_and_top_edges() {
        let mut big = Array2::zeros((4, 4));
        let small = array![[1.0, 2.0], [3.0, 4.0]];
        // start = (-1, -1)
        add_small_to_big_periodically(&mut big, &small, 0, 0).unwrap();
        assert_eq!(big[[3, 3]], 1.0);
        assert_eq!(big[[3, 0]], 2.0);
        assert_eq!(big[[0, 3]], 3.0);
        assert_eq!(big[[0, 0]], 4.0);
    }

    #[test]
    fn accumulates_instead_of_overwriting() {
        let mut big = Array2::from_elem((3, 3), 1.0);
        add_small_to_big_periodically(&mut big, &array![[2.0]], 1, 1).unwrap();
        assert_eq!(big[[1, 1]], 3.0);
    }

    #[test]
    fn rejects_oversized_tile() {
        let mut big = Array2::zeros((2, 2));
        let small = Array2::zeros((3, 1));
        assert_eq!(
            add_small_to_big_periodically(&mut big, &small, 0, 0),
            Err(ImagingError::SmallLargerThanBig((3, 1), (2, 2)))
        );
    }

    #[test]
    fn neighbour_sum_is_periodic() {
        let mut map = Array2::zeros((3, 4));
        map[[0, 0]] = 1.0;
        let sums = neighbour_sum(&map);
        assert_eq!(sums[[0, 0]], 0.0);
        assert_eq!(sums[[2, 3]], 1.0);
        assert_eq!(sums[[1, 1]], 1.0);
        assert_eq!(sums[[1, 2]], 0.0);
        assert_eq!(sums.sum(), 8.0);
    }

    #[test]
    fn rounds_ties_to_even() {
        assert_eq!(round_half_even(1.5), 2);
        assert_eq!(round_half_even(2.5), 2);
        assert_eq!(round_half_even(-0.5), 0);
        assert_eq!(round_half_even(7.4), 7);
    }
}
