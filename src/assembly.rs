//! Composition of geometry, environment, materials, and sources into one
//! solver-ready model.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::catalog::{MaterialCatalog, MaterialProperties};
use crate::environment::EnvironmentSpec;
use crate::geometry::{AnnularLayer, CableCrossSection, FormationLayout};
use crate::source::ThreePhaseSource;

/// Closed 2D region of the model domain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RegionShape {
    /// Ring (or full disk when `inner_mm` is zero) around a phase center.
    Annulus {
        center_mm: [f64; 2],
        inner_mm: f64,
        outer_mm: f64,
    },
    /// Everything above the seabed interface, inside the far boundary.
    HalfPlaneAbove { y_mm: f64 },
    /// Everything at or below the seabed interface, inside the far boundary.
    HalfPlaneBelow { y_mm: f64 },
}

/// One region with exactly one material assignment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub label: String,
    pub shape: RegionShape,
    pub material: String,
    /// Conductor position (0..3) excited by this region, if any. The phase
    /// current is applied as a uniform current density over the region
    /// area, not as a filament.
    pub phase: Option<usize>,
}

/// A region resolved for a query point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegionMatch<'a> {
    pub index: usize,
    pub region: &'a Region,
    /// The point lies on (or within tolerance of) a region boundary.
    pub boundary_adjacent: bool,
}

/// Fully assembled, solver-ready model description.
///
/// Assembly is deterministic: identical inputs produce an identical
/// serialized description. The model is owned by exactly one solve
/// invocation and discarded afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProblemModel {
    pub frequency_hz: f64,
    pub source: ThreePhaseSource,
    pub layers: Vec<AnnularLayer>,
    pub phase_centers_mm: [[f64; 2]; 3],
    pub stack_outer_radius_mm: f64,
    pub conductor_radius_mm: f64,
    pub environment: EnvironmentSpec,
    pub regions: Vec<Region>,
    /// Properties of every referenced material, snapshotted from the catalog.
    pub materials: BTreeMap<String, MaterialProperties>,
}

/// Describes the inputs of one assembly.
pub struct AssemblyDescriptor<'a> {
    pub cross_section: &'a CableCrossSection,
    pub layout: &'a FormationLayout,
    pub environment: &'a EnvironmentSpec,
    pub source: &'a ThreePhaseSource,
    pub operating_frequency_hz: f64,
    pub catalog: &'a MaterialCatalog,
}

impl ProblemModel {
    /// Composes one solver-ready model. No solving happens here.
    pub fn assemble(desc: AssemblyDescriptor) -> Result<Self, AssemblyError> {
        if !(desc.operating_frequency_hz > 0.0) {
            return Err(AssemblyError::UnsupportedDcFormulation {
                frequency_hz: desc.operating_frequency_hz,
            });
        }

        // Balance precondition: checked, never silently corrected.
        if !desc.source.allow_unbalanced {
            let max_magnitude = desc
                .source
                .phasors
                .iter()
                .map(|p| p.rms_magnitude_a)
                .fold(0.0, f64::max);
            let tolerance = 1e-6 * max_magnitude.max(1e-12);
            if !desc.source.is_balanced(tolerance) {
                return Err(AssemblyError::UnbalancedSource {
                    residual_a: desc.source.residual_a().norm(),
                });
            }
        }

        let extent = desc.layout.extent_mm(desc.cross_section);
        let far = desc.environment.far_boundary_radius_mm;
        if far <= extent || far <= desc.environment.burial_depth_mm {
            return Err(AssemblyError::FarBoundaryTooSmall {
                actual_mm: far,
                required_mm: extent.max(desc.environment.burial_depth_mm),
            });
        }

        // Regions in a fixed order: phase stacks inner to outer, then the
        // two environment half-planes.
        let interface = desc.environment.interface_y_mm();
        let mut regions = Vec::new();
        for (phase, center) in desc.layout.centers_mm.iter().enumerate() {
            for layer in desc.cross_section.layers() {
                regions.push(Region {
                    label: format!("phase{}/{}", phase + 1, layer.name),
                    shape: RegionShape::Annulus {
                        center_mm: *center,
                        inner_mm: layer.inner_radius_mm,
                        outer_mm: layer.outer_radius_mm,
                    },
                    material: layer.material.clone(),
                    phase: (layer.inner_radius_mm == 0.0).then_some(phase),
                });
            }
        }
        regions.push(Region {
            label: "seabed".to_string(),
            shape: RegionShape::HalfPlaneBelow { y_mm: interface },
            material: desc.environment.seabed_material.clone(),
            phase: None,
        });
        regions.push(Region {
            label: "seawater".to_string(),
            shape: RegionShape::HalfPlaneAbove { y_mm: interface },
            material: desc.environment.seawater_material.clone(),
            phase: None,
        });

        // Every region must resolve to exactly one cataloged material.
        let mut materials = BTreeMap::new();
        for region in &regions {
            if region.material.is_empty() {
                return Err(AssemblyError::UnassignedRegion {
                    region: region.label.clone(),
                });
            }
            match desc.catalog.get(&region.material) {
                Some(properties) => {
                    materials.insert(region.material.clone(), *properties);
                }
                None => {
                    return Err(AssemblyError::UnknownMaterial {
                        material: region.material.clone(),
                        region: region.label.clone(),
                    })
                }
            }
        }

        Ok(Self {
            frequency_hz: desc.operating_frequency_hz,
            source: *desc.source,
            layers: desc.cross_section.layers().to_vec(),
            phase_centers_mm: desc.layout.centers_mm,
            stack_outer_radius_mm: desc.cross_section.outer_radius_mm(),
            conductor_radius_mm: desc.cross_section.conductor_radius_mm(),
            environment: desc.environment.clone(),
            regions,
            materials,
        })
    }

    /// Geometric tolerance for boundary checks, relative to the domain size.
    fn epsilon_mm(&self) -> f64 {
        1e-9 * self.environment.far_boundary_radius_mm
    }

    /// Whether a point lies inside the truncated domain.
    pub fn contains(&self, x_mm: f64, y_mm: f64) -> bool {
        (x_mm * x_mm + y_mm * y_mm).sqrt()
            <= self.environment.far_boundary_radius_mm + self.epsilon_mm()
    }

    /// Resolves the region containing a point.
    ///
    /// Tie-break for points exactly on a boundary: a layer boundary belongs
    /// to the inner region (first enclosing annulus wins), the seabed
    /// interface belongs to the seabed. Returns `None` outside the far
    /// boundary.
    pub fn classify(&self, x_mm: f64, y_mm: f64) -> Option<RegionMatch<'_>> {
        if !self.contains(x_mm, y_mm) {
            return None;
        }
        let eps = self.epsilon_mm();

        for (index, region) in self.regions.iter().enumerate() {
            let (hit, on_boundary) = match &region.shape {
                RegionShape::Annulus {
                    center_mm,
                    inner_mm,
                    outer_mm,
                } => {
                    let dx = x_mm - center_mm[0];
                    let dy = y_mm - center_mm[1];
                    let d = (dx * dx + dy * dy).sqrt();
                    let hit = d >= *inner_mm - eps && d <= *outer_mm + eps;
                    let on_boundary = (d - outer_mm).abs() <= eps
                        || (*inner_mm > 0.0 && (d - inner_mm).abs() <= eps);
                    (hit, on_boundary)
                }
                RegionShape::HalfPlaneBelow { y_mm: interface } => {
                    (y_mm <= *interface + eps, (y_mm - interface).abs() <= eps)
                }
                RegionShape::HalfPlaneAbove { y_mm: interface } => {
                    (y_mm > *interface, (y_mm - interface).abs() <= eps)
                }
            };
            if hit {
                let far_adjacent = ((x_mm * x_mm + y_mm * y_mm).sqrt()
                    - self.environment.far_boundary_radius_mm)
                    .abs()
                    <= eps;
                return Some(RegionMatch {
                    index,
                    region,
                    boundary_adjacent: on_boundary || far_adjacent,
                });
            }
        }
        None
    }

    pub fn properties_of(&self, material: &str) -> Option<&MaterialProperties> {
        self.materials.get(material)
    }
}

/// Inconsistent model composition, detected before any solver interaction.
#[derive(thiserror::Error, Debug)]
pub enum AssemblyError {
    #[error(
        "source phasors do not sum to zero (residual {residual_a} A RMS); \
        use an explicitly unbalanced source if this is intended"
    )]
    UnbalancedSource { residual_a: f64 },
    #[error("region '{region}' references unknown material '{material}'")]
    UnknownMaterial { material: String, region: String },
    #[error("region '{region}' has no material assignment")]
    UnassignedRegion { region: String },
    #[error(
        "far boundary radius {actual_mm} mm does not enclose the model \
        (needs more than {required_mm} mm)"
    )]
    FarBoundaryTooSmall { actual_mm: f64, required_mm: f64 },
    #[error(
        "a magnetostatic formulation at {frequency_hz} Hz is not supported; \
        eddy-current shielding requires a positive operating frequency"
    )]
    UnsupportedDcFormulation { frequency_hz: f64 },
}
