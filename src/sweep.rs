//! Batch iteration of the modeling pipeline over cable design variants.

use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::assembly::{AssemblyDescriptor, ProblemModel};
use crate::catalog::MaterialCatalog;
use crate::environment::EnvironmentSpec;
use crate::export;
use crate::geometry::{CableCrossSection, FormationLayout, LayerSpec, PhaseFormation};
use crate::sampler::{sample_profile, EmfProfile, MagnitudeConvention};
use crate::source::{ElectricalOperatingPoint, PhaseAssignment, ThreePhaseSource};
use crate::{Error, FieldSolver, SaveSettings};

/// One cable design variant submitted to a sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CableConfig {
    /// Caller-supplied identifier, the key of the sweep result entry.
    pub id: String,
    pub layers: Vec<LayerSpec>,
    pub formation: PhaseFormation,
    pub environment: EnvironmentSpec,
    pub operating_point: ElectricalOperatingPoint,
    #[serde(default)]
    pub assignment: PhaseAssignment,
}

impl CableConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, Error> {
        let contents = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }
}

/// Loads an ordered sweep batch from a JSON array.
pub fn load_configs(path: impl AsRef<Path>) -> Result<Vec<CableConfig>, Error> {
    let contents = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&contents)?)
}

/// Runs the full pipeline for one configuration: geometry validation,
/// placement, source construction, assembly, solve, sampling.
///
/// Geometry and assembly defects short-circuit before the solver is
/// touched.
pub fn run_pipeline<S: FieldSolver + ?Sized>(
    solver: &mut S,
    config: &CableConfig,
    catalog: &MaterialCatalog,
    observation_points: &[[f64; 2]],
    convention: MagnitudeConvention,
) -> Result<EmfProfile, Error> {
    config.environment.validate()?;
    let cross_section = CableCrossSection::build(&config.layers)?;
    let layout = FormationLayout::place(&cross_section, config.formation)?;
    let source = ThreePhaseSource::balanced(&config.operating_point, config.assignment);
    let model = ProblemModel::assemble(AssemblyDescriptor {
        cross_section: &cross_section,
        layout: &layout,
        environment: &config.environment,
        source: &source,
        operating_frequency_hz: config.operating_point.frequency_hz,
        catalog,
    })?;

    let field = solver.solve(&model)?;
    let profile = sample_profile(&model, field.as_ref(), observation_points, convention)?;
    Ok(profile)
}

/// Describes a sweep run.
pub struct SweepDescriptor<'a, P: AsRef<Path>> {
    /// Configurations in submission order.
    pub configs: &'a [CableConfig],
    pub observation_points: &'a [[f64; 2]],
    pub convention: MagnitudeConvention,
    /// Whether or not to print progress to the console.
    pub verbose: bool,
    /// Checked before each configuration's solve; remaining entries are
    /// marked cancelled once set.
    pub cancel: Option<Arc<AtomicBool>>,
    /// What, if any, information to save to file.
    pub save_settings: Option<SaveSettings<P>>,
}

/// Outcome of one configuration's pipeline run.
#[derive(Debug)]
pub enum SweepOutcome {
    Profile(EmfProfile),
    Failed(Error),
    Cancelled,
}

impl SweepOutcome {
    pub fn profile(&self) -> Option<&EmfProfile> {
        match self {
            Self::Profile(profile) => Some(profile),
            _ => None,
        }
    }
}

/// One sweep entry, keyed by the configuration identifier.
#[derive(Debug)]
pub struct SweepEntry {
    pub id: String,
    /// Which conductor position carried which phase angle for this run.
    pub assignment: PhaseAssignment,
    pub outcome: SweepOutcome,
}

/// All sweep entries, in submission order.
#[derive(Debug, Default)]
pub struct SweepResult {
    pub entries: Vec<SweepEntry>,
}

impl SweepResult {
    pub fn get(&self, id: &str) -> Option<&SweepEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn failed_ids(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|e| matches!(e.outcome, SweepOutcome::Failed(_)))
            .map(|e| e.id.as_str())
            .collect()
    }
}

/// Iterates the pipeline over a batch of configurations.
///
/// Configurations run strictly one at a time against the shared solver.
/// A failed configuration is recorded against its entry and never aborts
/// the batch: the returned result covers every submitted configuration.
/// Only save-file errors propagate.
pub fn run_sweep<S: FieldSolver + ?Sized, P: AsRef<Path>>(
    solver: &mut S,
    catalog: &MaterialCatalog,
    desc: SweepDescriptor<P>,
) -> Result<SweepResult, Error> {
    let file = match &desc.save_settings {
        Some(SaveSettings {
            filename,
            overwrite,
            ..
        }) => {
            let filename = filename.as_ref();
            let file = if filename.exists() && !*overwrite {
                hdf5::File::open_rw(filename)?
            } else {
                hdf5::File::create(filename)?
            };
            Some(file)
        }
        None => None,
    };

    let bar = if desc.verbose {
        println!("# of configurations: {}", desc.configs.len());
        Some(indicatif::ProgressBar::new(desc.configs.len() as u64))
    } else {
        None
    };

    let mut result = SweepResult::default();
    let mut cancelled = false;
    for config in desc.configs {
        if !cancelled {
            if let Some(flag) = &desc.cancel {
                cancelled = flag.load(Ordering::Relaxed);
            }
        }

        let outcome = if cancelled {
            SweepOutcome::Cancelled
        } else {
            match run_pipeline(
                solver,
                config,
                catalog,
                desc.observation_points,
                desc.convention,
            ) {
                Ok(profile) => SweepOutcome::Profile(profile),
                Err(error) => SweepOutcome::Failed(error),
            }
        };

        if let (Some(file), Some(save), SweepOutcome::Profile(profile)) =
            (&file, &desc.save_settings, &outcome)
        {
            export::write_profile_h5(
                file,
                &config.id,
                profile,
                save.save_type,
                &export::ProfileMeta {
                    frequency_hz: config.operating_point.frequency_hz,
                    burial_depth_mm: config.environment.burial_depth_mm,
                    assignment: config.assignment.label(),
                },
            )?;
        }

        result.entries.push(SweepEntry {
            id: config.id.clone(),
            assignment: config.assignment,
            outcome,
        });
        if let Some(ref bar) = bar {
            bar.inc(1);
        }
    }

    if let Some(ref bar) = bar {
        bar.finish();
    }
    if let Some(file) = file {
        file.close()?;
    }

    Ok(result)
}
