//! The fetch -> resolve -> assemble -> slice refresh pipeline.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use gs_plot::{assemble, resolve_shape, slice_grid, SliceAxis};
use gs_store::{MeasurementDb, RowBatch, RunId};
use tracing::debug;

use crate::error::AppResult;
use crate::frame::PlotFrame;

/// What to plot on the next refresh cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct PlotRequest {
    pub run_id: RunId,
    /// Dependent parameter to plot; the run's first one when unset.
    pub parameter: Option<String>,
    pub slice: Option<SliceRequest>,
}

impl PlotRequest {
    pub fn for_run(run_id: RunId) -> Self {
        Self {
            run_id,
            parameter: None,
            slice: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SliceRequest {
    pub axis: SliceAxis,
    pub target: f64,
}

/// Drives refresh cycles against one database.
///
/// Fetched rows are cached per run with a resume cursor, so a growing run is
/// not re-read from scratch on every tick. Grids are still rebuilt from the
/// full cached history each cycle: axis sets can grow, so a previous grid is
/// never patched in place.
pub struct Pipeline {
    db: MeasurementDb,
    cache: HashMap<RunId, RowBatch>,
}

impl Pipeline {
    pub fn new(db: MeasurementDb) -> Self {
        Self {
            db,
            cache: HashMap::new(),
        }
    }

    pub fn db(&self) -> &MeasurementDb {
        &self.db
    }

    /// Forget cached rows for a run (full re-fetch on the next cycle).
    pub fn invalidate(&mut self, run_id: RunId) {
        self.cache.remove(&run_id);
    }

    /// Run one refresh cycle and produce a plot-ready frame.
    pub fn refresh(&mut self, request: &PlotRequest) -> AppResult<PlotFrame> {
        let meta = self.db.fetch_metadata(request.run_id)?;
        let shape = resolve_shape(&meta, request.parameter.as_deref())?;

        let since = self
            .cache
            .get(&request.run_id)
            .map(|b| b.next_position)
            .unwrap_or(1);
        let fresh = self.db.fetch_run_rows(&meta, since)?;
        let fetched = fresh.rows.len();
        let rows = match self.cache.entry(request.run_id) {
            Entry::Occupied(entry) => {
                let batch = entry.into_mut();
                batch.append(fresh);
                batch
            }
            Entry::Vacant(entry) => entry.insert(fresh),
        };
        debug!(
            run_id = request.run_id,
            fetched,
            total = rows.rows.len(),
            "refresh cycle fetched rows"
        );

        let grid = assemble(rows, &shape)?;
        let slice = match request.slice {
            Some(s) => Some(slice_grid(&grid, s.axis, s.target)?),
            None => None,
        };

        let value_label = shape.value().axis_label();
        Ok(PlotFrame {
            run_id: request.run_id,
            dimension: shape.dimension(),
            x_label: shape.x().axis_label(),
            y_label: shape
                .y()
                .map(|p| p.axis_label())
                .unwrap_or_else(|| value_label.clone()),
            value_label,
            info: meta.info_line(),
            completed: meta.completed,
            row_count: rows.rows.len(),
            parameters: meta.dependent().map(|p| p.name.clone()).collect(),
            slice_available: shape.dimension() == 2,
            slice,
            grid,
        })
    }
}
