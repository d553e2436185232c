//! Field solver backends.
//!
//! The production path is [`FemmSolver`], which drives an external FEMM-style
//! time-harmonic magnetics tool through a generated script and working model
//! file. [`FilamentSolver`] is a built-in free-space reference backend used
//! for pipeline tests and quick estimates.

mod femm;
mod filament;
mod grid;

pub use femm::{FemmSolver, FemmSolverDescriptor, SampleWindow};
pub use filament::FilamentSolver;
pub use grid::GridFieldMap;

/// Vacuum permeability in H/m.
pub(crate) const MU0_H_PER_M: f64 = 4.0e-7 * std::f64::consts::PI;

/// Failure of the external solve; never retried automatically.
#[derive(thiserror::Error, Debug)]
pub enum SolveError {
    #[error("invalid sample window: {0}")]
    InvalidWindow(String),
    #[error("external solver could not be launched: {0}")]
    Unavailable(#[from] std::io::Error),
    #[error("external solver exited with status {status}: {diagnostic}")]
    ToolFailure { status: i32, diagnostic: String },
    #[error("external solve did not finish within {timeout_s} s")]
    Timeout { timeout_s: f64 },
    #[error("solver field output is malformed: {0}")]
    MalformedOutput(String),
}
