//! Shared application service layer for gridscope.
//!
//! This crate provides a unified interface for both CLI and GUI frontends:
//! the fetch -> resolve -> assemble -> slice refresh pipeline, the live
//! monitor that re-drives it on a timer, and the error taxonomy both
//! frontends report from.

pub mod error;
pub mod frame;
pub mod monitor;
pub mod pipeline;

// Re-export key types for convenience
pub use error::{AppError, AppResult};
pub use frame::PlotFrame;
pub use monitor::{LiveMonitor, MonitorEvent, MonitorState};
pub use pipeline::{Pipeline, PlotRequest, SliceRequest};
