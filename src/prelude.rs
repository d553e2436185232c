//! Includes commonly used library components.

pub use crate::{
    AssemblyDescriptor,
    CableConfig,
    CableCrossSection,
    ElectricalOperatingPoint,
    EmfProfile,
    EnvironmentSpec,
    Error,
    FieldMap,
    FieldSolver,
    FormationLayout,
    LayerRole,
    LayerSpec,
    MagnitudeConvention,
    MaterialCatalog,
    MaterialProperties,
    ObservationLine,
    PhaseAssignment,
    PhaseFormation,
    ProblemModel,
    SaveSettings,
    SaveType,
    SweepDescriptor,
    SweepResult,
    ThreePhaseSource,
};
pub use crate::sampler::sample_profile;
pub use crate::solver::{FemmSolver, FemmSolverDescriptor, FilamentSolver, SampleWindow};
pub use crate::sweep::{run_pipeline, run_sweep};
