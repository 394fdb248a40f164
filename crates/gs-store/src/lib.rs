//! gs-store: read-only query adapter for the measurement database.
//!
//! The external measurement engine owns the SQLite file and keeps writing to
//! it while a run is in progress; this crate only ever reads.

pub mod store;
pub mod testkit;
pub mod types;

pub use store::MeasurementDb;
pub use types::*;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("Run not found: {run_id}")]
    RunNotFound { run_id: RunId },

    #[error("Store unavailable: {0}")]
    Unavailable(#[from] rusqlite::Error),

    #[error("Store schema inconsistency: {message}")]
    Schema { message: String },
}
