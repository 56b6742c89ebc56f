//! State module for tracking audit progress
//!
//! # Components
//!
//! - `VisitState`: Tracks the state of individual page descriptors (queued, fetching, matched, etc.)
//! - `VisitStatistics`: Counts descriptors per terminal state

mod visit_state;

// Re-export main types
pub use visit_state::{VisitState, VisitStatistics};
