//! Plot-ready structures handed to the UIs.

use gs_plot::{Grid, Slice};
use gs_store::RunId;
use serde::{Deserialize, Serialize};

/// Everything a frontend needs to render one refresh cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlotFrame {
    pub run_id: RunId,
    pub dimension: u8,
    pub x_label: String,
    /// Second axis label: the measured quantity for 1D, the y coordinate
    /// for 2D (where the measured quantity is the color scale).
    pub y_label: String,
    pub value_label: String,
    /// Sample / experiment / start-time line shown above the plot.
    pub info: String,
    pub completed: bool,
    /// Rows fetched so far, including ones not yet plottable.
    pub row_count: usize,
    /// Dependent parameters available in this run (UI selector).
    pub parameters: Vec<String>,
    pub grid: Grid,
    pub slice_available: bool,
    pub slice: Option<Slice>,
}
