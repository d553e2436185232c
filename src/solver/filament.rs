//! Built-in free-space reference backend.

use num_complex::Complex64;

use crate::assembly::ProblemModel;
use crate::solver::{SolveError, MU0_H_PER_M};
use crate::{FieldMap, FieldSolver};

/// Superposes the analytic field of three finite-radius straight conductors
/// carrying the phase current phasors.
///
/// Conductors are treated as uniform current densities: the field grows
/// linearly inside the conductor radius and falls off as 1/d outside. All
/// materials are treated as free space, so eddy-current shielding by
/// armour, screens, and sheaths is *not* modeled; results upper-bound the
/// emissions of a shielded cable. Use the external solver for production
/// numbers.
pub struct FilamentSolver;

impl FieldSolver for FilamentSolver {
    fn solve(&mut self, model: &ProblemModel) -> Result<Box<dyn FieldMap>, SolveError> {
        let conductors = [0, 1, 2].map(|phase| Conductor {
            center_m: [
                model.phase_centers_mm[phase][0] * 1e-3,
                model.phase_centers_mm[phase][1] * 1e-3,
            ],
            radius_m: model.conductor_radius_mm * 1e-3,
            current_a: model.source.phasors[phase].phasor_a(),
        });
        Ok(Box::new(FilamentFieldMap { conductors }))
    }
}

#[derive(Debug)]
struct Conductor {
    center_m: [f64; 2],
    radius_m: f64,
    current_a: Complex64,
}

#[derive(Debug)]
struct FilamentFieldMap {
    conductors: [Conductor; 3],
}

impl FieldMap for FilamentFieldMap {
    fn flux_density_t(&self, x_mm: f64, y_mm: f64) -> [Complex64; 2] {
        let x = x_mm * 1e-3;
        let y = y_mm * 1e-3;
        let mut bx = Complex64::new(0.0, 0.0);
        let mut by = Complex64::new(0.0, 0.0);

        for conductor in &self.conductors {
            let dx = x - conductor.center_m[0];
            let dy = y - conductor.center_m[1];
            let d_sqr = dx * dx + dy * dy;
            // Inside the conductor only the enclosed current contributes,
            // which collapses to the same tangential form with the radius
            // replacing the distance. At the exact center both components
            // vanish.
            let denom = d_sqr.max(conductor.radius_m * conductor.radius_m);
            let k = conductor.current_a * (MU0_H_PER_M / (2.0 * std::f64::consts::PI) / denom);
            bx -= k * dy;
            by += k * dx;
        }

        [bx, by]
    }
}
