//! Three-phase sinusoidal current excitation.

use num_complex::Complex64;
use serde::{Deserialize, Serialize};

/// Electrical operating point of the cable.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ElectricalOperatingPoint {
    pub rms_phase_current_a: f64,
    pub frequency_hz: f64,
}

/// One phase current phasor, RMS-valued.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SourcePhasor {
    pub rms_magnitude_a: f64,
    pub phase_angle_deg: f64,
}

impl SourcePhasor {
    pub fn new(rms_magnitude_a: f64, phase_angle_deg: f64) -> Self {
        Self {
            rms_magnitude_a,
            phase_angle_deg,
        }
    }

    /// Complex RMS current in amperes.
    pub fn phasor_a(&self) -> Complex64 {
        Complex64::from_polar(self.rms_magnitude_a, self.phase_angle_deg.to_radians())
    }
}

/// Which physical conductor position carries which phase angle.
///
/// The assignment changes the spatial field-cancellation pattern, so it is
/// declared configuration and is recorded against every sweep result.
/// `order[k]` is the index into the balanced angle set (0°, −120°, +120°)
/// carried by conductor position `k`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseAssignment {
    pub order: [u8; 3],
}

impl PhaseAssignment {
    /// Position 0 at 0°, position 1 at −120°, position 2 at +120°.
    pub const ABC: Self = Self { order: [0, 1, 2] };
    /// Reversed rotation: position 1 and 2 swapped.
    pub const ACB: Self = Self { order: [0, 2, 1] };

    pub fn label(&self) -> String {
        self.order
            .iter()
            .map(|&i| ["a", "b", "c"][i as usize])
            .collect()
    }
}

impl Default for PhaseAssignment {
    fn default() -> Self {
        Self::ABC
    }
}

/// The full excitation of the three conductor positions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThreePhaseSource {
    /// Phasor carried by each conductor position, in placement order.
    pub phasors: [SourcePhasor; 3],
    /// Set only by [`ThreePhaseSource::unbalanced`]; without it, assembly
    /// rejects any set whose phasors do not sum to zero.
    pub allow_unbalanced: bool,
}

const BALANCED_ANGLES_DEG: [f64; 3] = [0.0, -120.0, 120.0];

impl ThreePhaseSource {
    /// Balanced positive-sequence excitation at the operating current.
    pub fn balanced(operating_point: &ElectricalOperatingPoint, assignment: PhaseAssignment) -> Self {
        let phasors = assignment.order.map(|i| {
            SourcePhasor::new(
                operating_point.rms_phase_current_a,
                BALANCED_ANGLES_DEG[i as usize],
            )
        });
        Self {
            phasors,
            allow_unbalanced: false,
        }
    }

    /// Explicitly requested unbalanced excitation, e.g. for fault studies.
    pub fn unbalanced(phasors: [SourcePhasor; 3]) -> Self {
        Self {
            phasors,
            allow_unbalanced: true,
        }
    }

    /// Complex sum of the three phasors; ~0 for a balanced system.
    pub fn residual_a(&self) -> Complex64 {
        self.phasors
            .iter()
            .map(SourcePhasor::phasor_a)
            .sum::<Complex64>()
    }

    pub fn is_balanced(&self, tolerance_a: f64) -> bool {
        self.residual_a().norm() <= tolerance_a
    }
}
