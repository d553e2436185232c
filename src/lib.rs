//! A framework for assessing the electromagnetic-field emissions of buried
//! three-phase subsea power cables.
//!
//! The crate turns a small set of physical layer thicknesses, material
//! constants, and an electrical operating point into a solver-ready
//! multi-region 2D cross-section model, submits it to a time-harmonic
//! magnetic field solver through the [`FieldSolver`] capability trait, and
//! samples the resulting flux density into EMF profiles, including batch
//! sweeps over many cable design variants.
//!
//! To get started, refer to the `\demos` directory in the main repository.

pub mod assembly;
pub mod catalog;
pub mod environment;
pub mod export;
pub mod geometry;
pub mod prelude;
pub mod sampler;
pub mod solver;
pub mod source;
pub mod sweep;

pub use assembly::{AssemblyDescriptor, AssemblyError, ProblemModel, Region, RegionShape};
pub use catalog::{MaterialCatalog, MaterialProperties};
pub use environment::EnvironmentSpec;
pub use export::{SaveSettings, SaveType};
pub use geometry::{
    CableCrossSection, FormationLayout, GeometryError, LayerRole, LayerSpec, PhaseFormation,
};
pub use sampler::{
    EmfProfile, FieldSample, MagnitudeConvention, ObservationLine, OutOfDomainError,
};
pub use solver::SolveError;
pub use source::{ElectricalOperatingPoint, PhaseAssignment, SourcePhasor, ThreePhaseSource};
pub use sweep::{CableConfig, SweepDescriptor, SweepEntry, SweepOutcome, SweepResult};

/// Represents an error anywhere in the modeling pipeline.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Geometry(#[from] GeometryError),
    #[error(transparent)]
    Assembly(#[from] AssemblyError),
    #[error(transparent)]
    Solve(#[from] SolveError),
    #[error(transparent)]
    OutOfDomain(#[from] OutOfDomainError),
    #[error(transparent)]
    H5Error(#[from] hdf5::Error),
    #[error("configuration file error: {0}")]
    Config(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Queryable complex flux density over a solved 2D domain.
///
/// Positions are in millimeters in the model frame (formation centroid at
/// the origin); flux densities are phasors in Tesla, RMS-valued like the
/// source phasors that produced them.
pub trait FieldMap: std::fmt::Debug {
    fn flux_density_t(&self, x_mm: f64, y_mm: f64) -> [num_complex::Complex64; 2];
}

/// Manages the actual field solve.
///
/// One invocation owns its [`ProblemModel`] exclusively for the duration of
/// the (synchronous, blocking) call and leaves no shared mutable state
/// behind, so sweeps run configurations strictly one at a time.
pub trait FieldSolver {
    fn solve(&mut self, model: &ProblemModel) -> Result<Box<dyn FieldMap>, SolveError>;
}
