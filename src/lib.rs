//! Oslo - a one-dimensional sandpile with random critical slopes
//!
//! Simulates the Oslo model of self-organized criticality: grains are added
//! at the leftmost site of a lattice and relaxed by a toppling rule that can
//! cascade into avalanches. Each site carries a local slope (gradient) and a
//! critical threshold in {1, 2}, redrawn every time the site topples.

pub mod error;
pub mod lattice;
pub mod sim;
pub mod threshold;
pub mod transitions;

// Re-export main types
pub use error::OsloError;
pub use lattice::{Lattice, Phase, DEFAULT_THRESHOLD_PROBABILITY, MAX_RELAX_COUNT, MIN_LENGTH};
pub use sim::SimConfig;
pub use threshold::{Threshold, ThresholdSource};
pub use transitions::TransitionCounts;
