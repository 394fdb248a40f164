//! 1D cuts through 2D grids.

use std::fmt;

use gs_core::nearest_index;
use serde::{Deserialize, Serialize};

use crate::grid::Grid;
use crate::{PlotError, PlotResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SliceAxis {
    X,
    Y,
}

impl SliceAxis {
    /// The axis whose coordinates survive into the slice.
    pub fn orthogonal(self) -> SliceAxis {
        match self {
            SliceAxis::X => SliceAxis::Y,
            SliceAxis::Y => SliceAxis::X,
        }
    }
}

impl fmt::Display for SliceAxis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SliceAxis::X => write!(f, "x"),
            SliceAxis::Y => write!(f, "y"),
        }
    }
}

/// A 1D cut through a 2D grid at a fixed index on the sliced axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Slice {
    pub axis: SliceAxis,
    /// Index on the sliced axis that was actually used.
    pub index: usize,
    /// Coordinate at that index (nearest to the requested target).
    pub at: f64,
    /// (orthogonal coordinate, value) pairs; missing cells are omitted.
    pub points: Vec<(f64, f64)>,
}

/// Extract the 1D cross-section nearest to `target` on the chosen axis.
/// Ties between two equally-near coordinates go to the lower index.
pub fn slice_grid(grid: &Grid, axis: SliceAxis, target: f64) -> PlotResult<Slice> {
    let Grid::TwoD { xs, ys, cells } = grid else {
        return Err(PlotError::DimensionMismatch);
    };

    let coords = match axis {
        SliceAxis::X => xs,
        SliceAxis::Y => ys,
    };
    let index = nearest_index(coords, target).ok_or(PlotError::EmptyAxis { axis })?;

    let mut points = Vec::new();
    match axis {
        SliceAxis::X => {
            for (iy, &y) in ys.iter().enumerate() {
                if let Some(v) = cells[index * ys.len() + iy] {
                    points.push((y, v));
                }
            }
        }
        SliceAxis::Y => {
            for (ix, &x) in xs.iter().enumerate() {
                if let Some(v) = cells[ix * ys.len() + index] {
                    points.push((x, v));
                }
            }
        }
    }

    Ok(Slice {
        axis,
        index,
        at: coords[index],
        points,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    // x in {0, 1}, y in {0, 1}; (1, 1) not measured yet
    fn grid() -> Grid {
        Grid::TwoD {
            xs: vec![0.0, 1.0],
            ys: vec![0.0, 1.0],
            cells: vec![Some(10.0), Some(20.0), Some(30.0), None],
        }
    }

    #[test]
    fn exact_coordinate_uses_exactly_that_index() {
        let s = slice_grid(&grid(), SliceAxis::X, 0.0).unwrap();
        assert_eq!(s.index, 0);
        assert_eq!(s.at, 0.0);
        assert_eq!(s.points, vec![(0.0, 10.0), (1.0, 20.0)]);
    }

    #[test]
    fn missing_cells_are_omitted() {
        let s = slice_grid(&grid(), SliceAxis::X, 1.0).unwrap();
        assert_eq!(s.points, vec![(0.0, 30.0)]);
    }

    #[test]
    fn between_coordinates_prefers_the_lower() {
        let s = slice_grid(&grid(), SliceAxis::X, 0.5).unwrap();
        assert_eq!(s.index, 0);
    }

    #[test]
    fn slicing_along_y() {
        let s = slice_grid(&grid(), SliceAxis::Y, 2.0).unwrap();
        assert_eq!(s.index, 1);
        assert_eq!(s.at, 1.0);
        assert_eq!(s.points, vec![(0.0, 20.0)]);
    }

    #[test]
    fn one_d_grid_is_dimension_mismatch() {
        let g = Grid::OneD {
            points: vec![(0.0, 1.0)],
        };
        assert!(matches!(
            slice_grid(&g, SliceAxis::X, 0.0),
            Err(PlotError::DimensionMismatch)
        ));
    }

    #[test]
    fn empty_axis_is_reported() {
        let g = Grid::TwoD {
            xs: vec![],
            ys: vec![],
            cells: vec![],
        };
        assert!(matches!(
            slice_grid(&g, SliceAxis::X, 0.0),
            Err(PlotError::EmptyAxis { axis: SliceAxis::X })
        ));
    }
}
