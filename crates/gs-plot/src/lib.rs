//! gs-plot: dataset shape resolution, grid assembly and slicing.
//!
//! The algorithmic core of gridscope: raw rows from a partially-written,
//! possibly unordered result table become plot-ready 1D point lists or 2D
//! grids with explicit gaps, and 2D grids can be cut into 1D slices.

pub mod grid;
pub mod shape;
pub mod slice;

pub use grid::{assemble, Grid};
pub use shape::{resolve_shape, DatasetShape};
pub use slice::{slice_grid, Slice, SliceAxis};

pub type PlotResult<T> = Result<T, PlotError>;

#[derive(thiserror::Error, Debug)]
pub enum PlotError {
    #[error("Unsupported shape: {parameter} depends on {dependency_count} parameters (1D and 2D only)")]
    UnsupportedShape {
        parameter: String,
        dependency_count: usize,
    },

    #[error("Run has no dependent parameter to plot")]
    NoDependentParameter,

    #[error("Unknown parameter: {name}")]
    UnknownParameter { name: String },

    #[error("Schema inconsistency: {message}")]
    SchemaInconsistency { message: String },

    #[error("Axis {axis} has no coordinates")]
    EmptyAxis { axis: SliceAxis },

    #[error("Slicing requires a 2D grid")]
    DimensionMismatch,
}
