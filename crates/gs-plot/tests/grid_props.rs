//! Property tests for grid assembly invariants.

use gs_plot::{assemble, slice_grid, DatasetShape, Grid, SliceAxis};
use gs_store::{ParamRole, ParamSpec, RawRow, RowBatch};
use proptest::prelude::*;

fn spec(name: &str, depends_on: &[&str]) -> ParamSpec {
    ParamSpec {
        name: name.to_string(),
        label: String::new(),
        unit: String::new(),
        role: if depends_on.is_empty() {
            ParamRole::Independent
        } else {
            ParamRole::Dependent
        },
        depends_on: depends_on.iter().map(|s| s.to_string()).collect(),
    }
}

fn shape_1d() -> DatasetShape {
    DatasetShape::OneD {
        x: spec("x", &[]),
        value: spec("v", &["x"]),
    }
}

fn shape_2d() -> DatasetShape {
    DatasetShape::TwoD {
        x: spec("x", &[]),
        y: spec("y", &[]),
        value: spec("v", &["x", "y"]),
    }
}

// Set-points repeat exactly in a sweep, so draw coordinates from a small
// fixed menu to force duplicates.
const SETPOINTS: [f64; 5] = [-2.0, -0.5, 0.0, 1.25, 3.0];

fn batch_1d(rows: &[(usize, f64)]) -> RowBatch {
    RowBatch {
        columns: vec!["x".to_string(), "v".to_string()],
        rows: rows
            .iter()
            .enumerate()
            .map(|(i, (xi, v))| RawRow {
                position: i as i64 + 1,
                values: vec![Some(SETPOINTS[*xi]), Some(*v)],
            })
            .collect(),
        next_position: rows.len() as i64 + 1,
    }
}

fn batch_2d(rows: &[(usize, usize, f64)]) -> RowBatch {
    RowBatch {
        columns: vec!["x".to_string(), "y".to_string(), "v".to_string()],
        rows: rows
            .iter()
            .enumerate()
            .map(|(i, (xi, yi, v))| RawRow {
                position: i as i64 + 1,
                values: vec![Some(SETPOINTS[*xi]), Some(SETPOINTS[*yi]), Some(*v)],
            })
            .collect(),
        next_position: rows.len() as i64 + 1,
    }
}

proptest! {
    #[test]
    fn one_d_axis_is_strictly_increasing_and_last_write_wins(
        rows in proptest::collection::vec((0usize..5, -100.0f64..100.0), 0..64),
    ) {
        let Grid::OneD { points } = assemble(&batch_1d(&rows), &shape_1d()).unwrap() else {
            panic!("expected 1D grid");
        };

        prop_assert!(points.windows(2).all(|w| w[0].0 < w[1].0));

        // one point per distinct coordinate, carrying the latest value
        for (x, v) in &points {
            let latest = rows
                .iter()
                .rev()
                .find(|(xi, _)| SETPOINTS[*xi] == *x)
                .map(|(_, value)| *value)
                .unwrap();
            prop_assert_eq!(*v, latest);
        }
        let distinct: std::collections::BTreeSet<u64> =
            rows.iter().map(|(xi, _)| SETPOINTS[*xi].to_bits()).collect();
        prop_assert_eq!(points.len(), distinct.len());
    }

    #[test]
    fn two_d_axes_never_shrink_as_rows_arrive(
        rows in proptest::collection::vec((0usize..5, 0usize..5, -100.0f64..100.0), 1..64),
        split in 0usize..64,
    ) {
        let split = split.min(rows.len());
        let early = assemble(&batch_2d(&rows[..split]), &shape_2d()).unwrap();
        let full = assemble(&batch_2d(&rows), &shape_2d()).unwrap();

        let (Grid::TwoD { xs: xs_a, ys: ys_a, .. }, Grid::TwoD { xs: xs_b, ys: ys_b, .. }) =
            (early, full)
        else {
            panic!("expected 2D grids");
        };

        for x in &xs_a {
            prop_assert!(xs_b.contains(x));
        }
        for y in &ys_a {
            prop_assert!(ys_b.contains(y));
        }
    }

    #[test]
    fn two_d_cells_match_latest_row_exactly(
        rows in proptest::collection::vec((0usize..5, 0usize..5, -100.0f64..100.0), 1..64),
    ) {
        let grid = assemble(&batch_2d(&rows), &shape_2d()).unwrap();
        let Grid::TwoD { xs, ys, .. } = &grid else { panic!("expected 2D grid") };

        for (ix, x) in xs.iter().enumerate() {
            for (iy, y) in ys.iter().enumerate() {
                let latest = rows
                    .iter()
                    .rev()
                    .find(|(xi, yi, _)| SETPOINTS[*xi] == *x && SETPOINTS[*yi] == *y)
                    .map(|(_, _, v)| *v);
                prop_assert_eq!(grid.cell(ix, iy), latest);
            }
        }
    }

    #[test]
    fn slicing_at_an_existing_coordinate_hits_that_index(
        rows in proptest::collection::vec((0usize..5, 0usize..5, -100.0f64..100.0), 1..64),
        pick in 0usize..5,
    ) {
        let grid = assemble(&batch_2d(&rows), &shape_2d()).unwrap();
        let Grid::TwoD { xs, .. } = &grid else { panic!("expected 2D grid") };

        let target = SETPOINTS[pick];
        if let Some(expected) = xs.iter().position(|x| *x == target) {
            let slice = slice_grid(&grid, SliceAxis::X, target).unwrap();
            prop_assert_eq!(slice.index, expected);
            prop_assert_eq!(slice.at, target);
        }
    }
}
