//! Utility modules shared across the pipeline: error types and source
//! location tracking.

pub mod errors;
pub mod location;

// Re-exports
pub use errors::*;
pub use location::{SourceLocation, Span};
