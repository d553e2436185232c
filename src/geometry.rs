//! Parametric cross-section geometry for one cable and its three-phase layout.

use serde::{Deserialize, Serialize};

/// Structural role of a layer within the cable cross-section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerRole {
    Conductor,
    ConductorScreen,
    Insulation,
    InsulationScreenNonMetallic,
    InsulationScreenMetallic,
    Bedding,
    Armour,
    Armour2,
    OverSheath,
}

/// One declared layer of the cable build-up.
///
/// A thickness of zero marks the layer as absent: it contributes no radius
/// increment and no geometric region, but is retained in the audit record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerSpec {
    pub name: String,
    pub thickness_mm: f64,
    pub material: String,
    pub role: LayerRole,
}

impl LayerSpec {
    pub fn new(
        name: impl Into<String>,
        thickness_mm: f64,
        material: impl Into<String>,
        role: LayerRole,
    ) -> Self {
        Self {
            name: name.into(),
            thickness_mm,
            material: material.into(),
            role,
        }
    }

    /// Conductor layer sized from its cross-sectional area in mm².
    ///
    /// The conductor is the innermost layer, so its "thickness" is the
    /// conductor radius `sqrt(area / π)`.
    pub fn conductor_from_area(
        area_mm2: f64,
        material: impl Into<String>,
    ) -> Result<Self, GeometryError> {
        if !(area_mm2 > 0.0) {
            return Err(GeometryError::InvalidConductorArea { area_mm2 });
        }
        Ok(Self::new(
            "conductor",
            (area_mm2 / std::f64::consts::PI).sqrt(),
            material,
            LayerRole::Conductor,
        ))
    }
}

/// A present layer with its derived absolute radii.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnularLayer {
    pub name: String,
    pub role: LayerRole,
    pub material: String,
    pub inner_radius_mm: f64,
    pub outer_radius_mm: f64,
}

/// Derived radial build-up of one cable phase.
///
/// Radii are a strict running sum over present layers only; absent layers
/// are listed in `skipped` so downstream stages never create zero-area
/// regions for them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CableCrossSection {
    layers: Vec<AnnularLayer>,
    skipped: Vec<String>,
    outer_radius_mm: f64,
}

impl CableCrossSection {
    /// Derives absolute radii from an ordered layer sequence.
    ///
    /// The first present layer must be the conductor. Fails before any
    /// solver interaction if a thickness is negative or no conductor is
    /// declared.
    pub fn build(specs: &[LayerSpec]) -> Result<Self, GeometryError> {
        let mut layers = Vec::with_capacity(specs.len());
        let mut skipped = Vec::new();
        let mut radius_mm = 0.0;

        for spec in specs {
            if spec.thickness_mm < 0.0 {
                return Err(GeometryError::NegativeThickness {
                    layer: spec.name.clone(),
                    thickness_mm: spec.thickness_mm,
                });
            }
            if spec.thickness_mm == 0.0 {
                skipped.push(spec.name.clone());
                continue;
            }
            if layers.is_empty() && spec.role != LayerRole::Conductor {
                return Err(GeometryError::MissingConductor);
            }
            let inner = radius_mm;
            radius_mm += spec.thickness_mm;
            layers.push(AnnularLayer {
                name: spec.name.clone(),
                role: spec.role,
                material: spec.material.clone(),
                inner_radius_mm: inner,
                outer_radius_mm: radius_mm,
            });
        }

        if layers.is_empty() {
            return Err(GeometryError::MissingConductor);
        }

        Ok(Self {
            layers,
            skipped,
            outer_radius_mm: radius_mm,
        })
    }

    /// Present layers, innermost first.
    pub fn layers(&self) -> &[AnnularLayer] {
        &self.layers
    }

    /// Names of declared layers that were absent (zero thickness).
    pub fn skipped(&self) -> &[String] {
        &self.skipped
    }

    pub fn outer_radius_mm(&self) -> f64 {
        self.outer_radius_mm
    }

    pub fn conductor_radius_mm(&self) -> f64 {
        self.layers[0].outer_radius_mm
    }
}

/// How the three phase conductors are laid relative to each other.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseFormation {
    /// Mutually touching cables on the vertices of an equilateral triangle.
    Trefoil,
    /// Colinear cables with a fixed center-to-center spacing.
    Flat { spacing_mm: f64 },
}

/// Absolute 2D placement of the three phase stacks, centroid at the origin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormationLayout {
    pub formation: PhaseFormation,
    pub centers_mm: [[f64; 2]; 3],
}

impl FormationLayout {
    /// Places three copies of the cross-section per the formation rule.
    ///
    /// Fails if the rule would make the phase outer boundaries overlap.
    pub fn place(
        cross_section: &CableCrossSection,
        formation: PhaseFormation,
    ) -> Result<Self, GeometryError> {
        let outer = cross_section.outer_radius_mm();
        let centers_mm = match formation {
            PhaseFormation::Trefoil => {
                // Touching cables: triangle side equals twice the stack
                // outer radius, circumradius side/sqrt(3).
                let side = 2.0 * outer;
                let circumradius = side / 3f64.sqrt();
                let apothem = circumradius / 2.0;
                [
                    [0.0, circumradius],
                    [-side / 2.0, -apothem],
                    [side / 2.0, -apothem],
                ]
            }
            PhaseFormation::Flat { spacing_mm } => {
                if spacing_mm < 2.0 * outer {
                    return Err(GeometryError::OverlappingPhases {
                        spacing_mm,
                        required_mm: 2.0 * outer,
                    });
                }
                [[-spacing_mm, 0.0], [0.0, 0.0], [spacing_mm, 0.0]]
            }
        };

        Ok(Self {
            formation,
            centers_mm,
        })
    }

    /// Largest distance from the formation centroid to any stack boundary.
    pub fn extent_mm(&self, cross_section: &CableCrossSection) -> f64 {
        self.centers_mm
            .iter()
            .map(|c| (c[0] * c[0] + c[1] * c[1]).sqrt() + cross_section.outer_radius_mm())
            .fold(0.0, f64::max)
    }
}

/// Invalid layer or formation geometry, detected before assembly.
#[derive(thiserror::Error, Debug)]
pub enum GeometryError {
    #[error("layer '{layer}' has negative thickness {thickness_mm} mm")]
    NegativeThickness { layer: String, thickness_mm: f64 },
    #[error("conductor cross-sectional area {area_mm2} mm^2 is not positive")]
    InvalidConductorArea { area_mm2: f64 },
    #[error("cross-section declares no present conductor layer")]
    MissingConductor,
    #[error(
        "flat formation spacing {spacing_mm} mm overlaps phase stacks \
        (center distance must be at least {required_mm} mm)"
    )]
    OverlappingPhases { spacing_mm: f64, required_mm: f64 },
    #[error("burial depth {burial_depth_mm} mm is negative")]
    NegativeBurialDepth { burial_depth_mm: f64 },
    #[error("far boundary radius {radius_mm} mm is not positive")]
    NonPositiveFarBoundary { radius_mm: f64 },
}
