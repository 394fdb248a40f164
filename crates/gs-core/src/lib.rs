//! gs-core: stable foundation for gridscope.
//!
//! Contains:
//! - numeric (Real + float helpers + bit-exact coordinate keys)
//! - error (shared error types)

pub mod error;
pub mod numeric;

// Re-exports: nice ergonomics for downstream crates
pub use error::{GsError, GsResult};
pub use numeric::*;
