//! Surrounding seawater/seabed half-spaces and the truncating far boundary.

use serde::{Deserialize, Serialize};

use crate::geometry::GeometryError;

/// The marine environment around the cable formation.
///
/// The formation centroid sits at the origin. The seabed/seawater interface
/// is the horizontal line `y = burial_depth_mm`: seawater above, seabed
/// below. A burial depth of zero therefore puts the formation right at the
/// interface (surface-laid). A circular far boundary of radius
/// `far_boundary_radius_mm` truncates the otherwise unbounded domain and
/// carries an asymptotic open boundary condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentSpec {
    pub seawater_material: String,
    pub seabed_material: String,
    pub burial_depth_mm: f64,
    pub far_boundary_radius_mm: f64,
}

impl EnvironmentSpec {
    pub fn new(
        seawater_material: impl Into<String>,
        seabed_material: impl Into<String>,
        burial_depth_mm: f64,
        far_boundary_radius_mm: f64,
    ) -> Result<Self, GeometryError> {
        let spec = Self {
            seawater_material: seawater_material.into(),
            seabed_material: seabed_material.into(),
            burial_depth_mm,
            far_boundary_radius_mm,
        };
        spec.validate()?;
        Ok(spec)
    }

    /// Re-checks the invariants enforced by [`EnvironmentSpec::new`], for
    /// specs that arrived through deserialization.
    pub fn validate(&self) -> Result<(), GeometryError> {
        if self.burial_depth_mm < 0.0 {
            return Err(GeometryError::NegativeBurialDepth {
                burial_depth_mm: self.burial_depth_mm,
            });
        }
        if !(self.far_boundary_radius_mm > 0.0) {
            return Err(GeometryError::NonPositiveFarBoundary {
                radius_mm: self.far_boundary_radius_mm,
            });
        }
        Ok(())
    }

    /// Default seawater-over-sand environment from the shipped catalog.
    pub fn subsea(burial_depth_mm: f64, far_boundary_radius_mm: f64) -> Result<Self, GeometryError> {
        Self::new("seawater", "seabed_sand", burial_depth_mm, far_boundary_radius_mm)
    }

    /// Height of the seabed/seawater interface above the formation centroid.
    pub fn interface_y_mm(&self) -> f64 {
        self.burial_depth_mm
    }

    pub fn surface_laid(&self) -> bool {
        self.burial_depth_mm == 0.0
    }
}
