//! Flux density extraction along caller-defined observation points.

use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::assembly::ProblemModel;
use crate::FieldMap;

/// How a scalar EMF magnitude is derived from the complex flux density.
///
/// Solvers are linear in the RMS-valued source phasors, so the resultant
/// `sqrt(|Bx|^2 + |By|^2)` is itself an RMS value; `Peak` applies the
/// crest factor sqrt(2) of the sinusoidal excitation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MagnitudeConvention {
    Rms,
    Peak,
}

impl MagnitudeConvention {
    fn scale(self) -> f64 {
        match self {
            Self::Rms => 1.0,
            Self::Peak => std::f64::consts::SQRT_2,
        }
    }
}

impl Default for MagnitudeConvention {
    fn default() -> Self {
        Self::Rms
    }
}

/// Generates evenly spaced observation points along a straight line.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ObservationLine {
    pub start_mm: [f64; 2],
    pub end_mm: [f64; 2],
    pub npoints: usize,
}

impl ObservationLine {
    /// Lateral scan at a fixed height, e.g. along the seabed surface.
    pub fn horizontal(y_mm: f64, x_start_mm: f64, x_end_mm: f64, npoints: usize) -> Self {
        Self {
            start_mm: [x_start_mm, y_mm],
            end_mm: [x_end_mm, y_mm],
            npoints,
        }
    }

    /// Vertical scan above the formation, for radial decay curves.
    pub fn vertical(x_mm: f64, y_start_mm: f64, y_end_mm: f64, npoints: usize) -> Self {
        Self {
            start_mm: [x_mm, y_start_mm],
            end_mm: [x_mm, y_end_mm],
            npoints,
        }
    }

    /// The observation points, endpoints included.
    pub fn points(&self) -> Vec<[f64; 2]> {
        if self.npoints <= 1 {
            return vec![self.start_mm];
        }
        let steps = (self.npoints - 1) as f64;
        (0..self.npoints)
            .map(|i| {
                let t = i as f64 / steps;
                [
                    self.start_mm[0] + t * (self.end_mm[0] - self.start_mm[0]),
                    self.start_mm[1] + t * (self.end_mm[1] - self.start_mm[1]),
                ]
            })
            .collect()
    }
}

/// Flux density at one observation point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FieldSample {
    pub position_mm: [f64; 2],
    /// Complex (Bx, By) in Tesla, RMS-valued.
    pub b_phasor_t: [Complex64; 2],
    /// Scalar magnitude per the profile's declared convention.
    pub magnitude_t: f64,
    /// The point fell on (or within tolerance of) a region boundary and was
    /// resolved by the documented tie-break.
    pub boundary_adjacent: bool,
}

/// An ordered sequence of samples along an observation path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmfProfile {
    pub convention: MagnitudeConvention,
    pub samples: Vec<FieldSample>,
}

impl EmfProfile {
    pub fn magnitudes_t(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.magnitude_t).collect()
    }

    pub fn positions_mm(&self) -> Vec<[f64; 2]> {
        self.samples.iter().map(|s| s.position_mm).collect()
    }

    pub fn max_magnitude_t(&self) -> f64 {
        self.samples
            .iter()
            .map(|s| s.magnitude_t)
            .fold(0.0, f64::max)
    }
}

/// A query point outside the truncated solution domain.
#[derive(thiserror::Error, Debug)]
#[error(
    "observation point ({x_mm} mm, {y_mm} mm) lies outside the far boundary \
    (radius {far_boundary_radius_mm} mm); refusing to extrapolate"
)]
pub struct OutOfDomainError {
    pub x_mm: f64,
    pub y_mm: f64,
    pub far_boundary_radius_mm: f64,
}

/// Queries flux density at each observation point and derives the profile.
///
/// Points on region boundaries resolve through the model's tie-break and
/// are flagged; points beyond the far boundary fail instead of being
/// extrapolated.
pub fn sample_profile(
    model: &ProblemModel,
    field: &dyn FieldMap,
    points: &[[f64; 2]],
    convention: MagnitudeConvention,
) -> Result<EmfProfile, OutOfDomainError> {
    let scale = convention.scale();
    let mut samples = Vec::with_capacity(points.len());

    for &[x_mm, y_mm] in points {
        let matched = model.classify(x_mm, y_mm).ok_or(OutOfDomainError {
            x_mm,
            y_mm,
            far_boundary_radius_mm: model.environment.far_boundary_radius_mm,
        })?;

        let b_phasor_t = field.flux_density_t(x_mm, y_mm);
        let magnitude_t =
            scale * (b_phasor_t[0].norm_sqr() + b_phasor_t[1].norm_sqr()).sqrt();

        samples.push(FieldSample {
            position_mm: [x_mm, y_mm],
            b_phasor_t,
            magnitude_t,
            boundary_adjacent: matched.boundary_adjacent,
        });
    }

    Ok(EmfProfile {
        convention,
        samples,
    })
}
