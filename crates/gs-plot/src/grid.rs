//! Grid assembly from raw measurement rows.
//!
//! Rows arrive in write order, not coordinate order, and an in-progress run
//! has holes everywhere: a row may miss its value, a 2D sweep may not have
//! reached a set-point yet. Assembly always rebuilds the grid from the full
//! row history (axes can grow between refreshes); only the fetch is
//! incremental.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use gs_core::CoordKey;
use gs_store::RowBatch;
use serde::{Deserialize, Serialize};

use crate::shape::DatasetShape;
use crate::{PlotError, PlotResult};

/// Plot-ready data. 1D is sorted, deduplicated (x, value) pairs; 2D is a
/// row-major |xs| x |ys| matrix with `None` for unmeasured cells.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Grid {
    OneD {
        points: Vec<(f64, f64)>,
    },
    TwoD {
        xs: Vec<f64>,
        ys: Vec<f64>,
        cells: Vec<Option<f64>>,
    },
}

impl Grid {
    pub fn dimension(&self) -> u8 {
        match self {
            Grid::OneD { .. } => 1,
            Grid::TwoD { .. } => 2,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Grid::OneD { points } => points.is_empty(),
            Grid::TwoD { xs, ys, .. } => xs.is_empty() || ys.is_empty(),
        }
    }

    /// Cell value of a 2D grid, `None` when unmeasured or out of range.
    pub fn cell(&self, ix: usize, iy: usize) -> Option<f64> {
        match self {
            Grid::OneD { .. } => None,
            Grid::TwoD { ys, cells, .. } => cells.get(ix * ys.len() + iy).copied().flatten(),
        }
    }
}

/// Assemble rows into a plot-ready grid for the resolved shape.
///
/// Later write positions win on duplicate coordinates. Rows with a missing
/// or non-finite coordinate or value are skipped; they may still be filled
/// in by the engine on a later row.
pub fn assemble(batch: &RowBatch, shape: &DatasetShape) -> PlotResult<Grid> {
    match shape {
        DatasetShape::OneD { x, value } => {
            let xi = column(batch, &x.name)?;
            let vi = column(batch, &value.name)?;

            // BTreeMap over bit-exact keys: sorted + deduplicated in one
            // pass, insertion order makes the last write win.
            let mut points: BTreeMap<CoordKey, f64> = BTreeMap::new();
            for row in &batch.rows {
                let (Some(xv), Some(vv)) = (slot(row, xi), slot(row, vi)) else {
                    continue;
                };
                if !xv.is_finite() || !vv.is_finite() {
                    continue;
                }
                points.insert(CoordKey::new(xv), vv);
            }
            Ok(Grid::OneD {
                points: points.into_iter().map(|(k, v)| (k.value(), v)).collect(),
            })
        }
        DatasetShape::TwoD { x, y, value } => {
            let xi = column(batch, &x.name)?;
            let yi = column(batch, &y.name)?;
            let vi = column(batch, &value.name)?;

            let mut x_set: BTreeSet<CoordKey> = BTreeSet::new();
            let mut y_set: BTreeSet<CoordKey> = BTreeSet::new();
            let mut values: HashMap<(CoordKey, CoordKey), f64> = HashMap::new();
            for row in &batch.rows {
                let (Some(xv), Some(yv), Some(vv)) = (slot(row, xi), slot(row, yi), slot(row, vi))
                else {
                    continue;
                };
                if !xv.is_finite() || !yv.is_finite() || !vv.is_finite() {
                    continue;
                }
                let (xk, yk) = (CoordKey::new(xv), CoordKey::new(yv));
                x_set.insert(xk);
                y_set.insert(yk);
                values.insert((xk, yk), vv);
            }

            let x_index: HashMap<CoordKey, usize> =
                x_set.iter().enumerate().map(|(i, k)| (*k, i)).collect();
            let y_index: HashMap<CoordKey, usize> =
                y_set.iter().enumerate().map(|(i, k)| (*k, i)).collect();

            let mut cells = vec![None; x_set.len() * y_set.len()];
            for ((xk, yk), v) in values {
                cells[x_index[&xk] * y_set.len() + y_index[&yk]] = Some(v);
            }

            Ok(Grid::TwoD {
                xs: x_set.into_iter().map(CoordKey::value).collect(),
                ys: y_set.into_iter().map(CoordKey::value).collect(),
                cells,
            })
        }
    }
}

fn slot(row: &gs_store::RawRow, index: usize) -> Option<f64> {
    row.values.get(index).copied().flatten()
}

fn column(batch: &RowBatch, name: &str) -> PlotResult<usize> {
    batch
        .column_index(name)
        .ok_or_else(|| PlotError::SchemaInconsistency {
            message: format!("result rows carry no column for parameter {name}"),
        })
}

#[cfg(test)]
mod tests {
    use gs_store::{ParamRole, ParamSpec, RawRow};

    use super::*;

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

    fn batch(columns: &[&str], rows: &[&[Option<f64>]]) -> RowBatch {
        RowBatch {
            columns: columns.iter().map(|s| s.to_string()).collect(),
            rows: rows
                .iter()
                .enumerate()
                .map(|(i, values)| RawRow {
                    position: i as i64 + 1,
                    values: values.to_vec(),
                })
                .collect(),
            next_position: rows.len() as i64 + 1,
        }
    }

    #[test]
    fn one_d_sorts_and_keeps_last_write() {
        // positions 1..3; the later write at x=0 overrides the first
        let b = batch(
            &["x", "v"],
            &[
                &[Some(0.0), Some(1.0)],
                &[Some(1.0), Some(3.0)],
                &[Some(0.0), Some(5.0)],
            ],
        );
        let grid = assemble(&b, &shape_1d()).unwrap();
        match grid {
            Grid::OneD { points } => assert_eq!(points, vec![(0.0, 5.0), (1.0, 3.0)]),
            other => panic!("expected 1D grid, got {other:?}"),
        }
    }

    #[test]
    fn one_d_drops_incomplete_rows() {
        let b = batch(
            &["x", "v"],
            &[
                &[Some(2.0), None],
                &[None, Some(7.0)],
                &[Some(1.0), Some(4.0)],
            ],
        );
        let grid = assemble(&b, &shape_1d()).unwrap();
        match grid {
            Grid::OneD { points } => assert_eq!(points, vec![(1.0, 4.0)]),
            other => panic!("expected 1D grid, got {other:?}"),
        }
    }

    #[test]
    fn one_d_x_is_strictly_increasing() {
        let b = batch(
            &["x", "v"],
            &[
                &[Some(3.0), Some(0.0)],
                &[Some(-1.0), Some(0.0)],
                &[Some(2.0), Some(0.0)],
                &[Some(3.0), Some(9.0)],
            ],
        );
        let Grid::OneD { points } = assemble(&b, &shape_1d()).unwrap() else {
            panic!("expected 1D grid");
        };
        assert!(points.windows(2).all(|w| w[0].0 < w[1].0));
        assert_eq!(points.last().unwrap(), &(3.0, 9.0));
    }

    #[test]
    fn two_d_marks_unmeasured_cells_missing() {
        let b = batch(
            &["x", "y", "v"],
            &[
                &[Some(0.0), Some(0.0), Some(10.0)],
                &[Some(0.0), Some(1.0), Some(20.0)],
                &[Some(1.0), Some(0.0), Some(30.0)],
            ],
        );
        let grid = assemble(&b, &shape_2d()).unwrap();
        assert_eq!(grid.cell(0, 0), Some(10.0));
        assert_eq!(grid.cell(0, 1), Some(20.0));
        assert_eq!(grid.cell(1, 0), Some(30.0));
        assert_eq!(grid.cell(1, 1), None);
    }

    #[test]
    fn two_d_last_write_wins_per_cell() {
        let b = batch(
            &["x", "y", "v"],
            &[
                &[Some(0.0), Some(0.0), Some(1.0)],
                &[Some(0.0), Some(0.0), Some(2.0)],
            ],
        );
        let grid = assemble(&b, &shape_2d()).unwrap();
        assert_eq!(grid.cell(0, 0), Some(2.0));
    }

    #[test]
    fn two_d_axes_are_sorted_and_deduplicated() {
        let b = batch(
            &["x", "y", "v"],
            &[
                &[Some(5.0), Some(-1.0), Some(0.0)],
                &[Some(-3.0), Some(2.0), Some(0.0)],
                &[Some(5.0), Some(2.0), Some(0.0)],
            ],
        );
        let Grid::TwoD { xs, ys, .. } = assemble(&b, &shape_2d()).unwrap() else {
            panic!("expected 2D grid");
        };
        assert_eq!(xs, vec![-3.0, 5.0]);
        assert_eq!(ys, vec![-1.0, 2.0]);
    }

    #[test]
    fn empty_batch_yields_empty_grid() {
        let b = batch(&["x", "v"], &[]);
        assert!(assemble(&b, &shape_1d()).unwrap().is_empty());
        let b = batch(&["x", "y", "v"], &[]);
        assert!(assemble(&b, &shape_2d()).unwrap().is_empty());
    }

    #[test]
    fn missing_column_is_schema_inconsistency() {
        let b = batch(&["x"], &[]);
        assert!(matches!(
            assemble(&b, &shape_1d()),
            Err(PlotError::SchemaInconsistency { .. })
        ));
    }
}
