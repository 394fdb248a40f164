//! Error types for the gs-app service layer.

use gs_plot::PlotError;
use gs_store::{RunId, StoreError};

pub type AppResult<T> = Result<T, AppError>;

/// Application error type that wraps errors from the store and plot crates
/// and provides a unified error interface for both CLI and GUI.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("No such run: {run_id}")]
    RunNotFound { run_id: RunId },

    #[error("Store unavailable: {message}")]
    StoreUnavailable { message: String },

    #[error("Unsupported shape: {message}")]
    UnsupportedShape { message: String },

    #[error("Schema inconsistency: {message}")]
    SchemaInconsistency { message: String },

    #[error("Axis {axis} has no coordinates to slice at")]
    EmptyAxis { axis: String },

    #[error("Slicing requires a 2D dataset")]
    DimensionMismatch,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    /// Transient failures keep a live schedule retrying on the next tick;
    /// everything else is static (bad metadata, bad input) and only worth
    /// reporting once per change.
    pub fn is_transient(&self) -> bool {
        matches!(self, AppError::StoreUnavailable { .. })
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::RunNotFound { run_id } => AppError::RunNotFound { run_id },
            StoreError::Unavailable(e) => AppError::StoreUnavailable {
                message: e.to_string(),
            },
            StoreError::Schema { message } => AppError::SchemaInconsistency { message },
        }
    }
}

impl From<PlotError> for AppError {
    fn from(err: PlotError) -> Self {
        match err {
            PlotError::UnsupportedShape { .. } | PlotError::NoDependentParameter => {
                AppError::UnsupportedShape {
                    message: err.to_string(),
                }
            }
            PlotError::UnknownParameter { name } => {
                AppError::InvalidInput(format!("unknown parameter: {name}"))
            }
            PlotError::SchemaInconsistency { message } => AppError::SchemaInconsistency { message },
            PlotError::EmptyAxis { axis } => AppError::EmptyAxis {
                axis: axis.to_string(),
            },
            PlotError::DimensionMismatch => AppError::DimensionMismatch,
        }
    }
}
