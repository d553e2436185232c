//! Regular-grid field storage with bilinear interpolation.

use ndarray::Array2;
use num_complex::Complex64;

use crate::solver::SolveError;
use crate::FieldMap;

/// Complex flux density sampled on a regular grid, queryable anywhere on
/// the covered window.
///
/// Queries between grid nodes interpolate bilinearly; queries outside the
/// window clamp to its edge (domain membership is enforced upstream by the
/// sampler, and solver windows are sized to cover the observation area).
#[derive(Debug)]
pub struct GridFieldMap {
    xs_mm: Vec<f64>,
    ys_mm: Vec<f64>,
    bx_t: Array2<Complex64>,
    by_t: Array2<Complex64>,
}

impl GridFieldMap {
    /// Builds a map from ascending axes and `[ny, nx]`-shaped component
    /// arrays.
    pub fn new(
        xs_mm: Vec<f64>,
        ys_mm: Vec<f64>,
        bx_t: Array2<Complex64>,
        by_t: Array2<Complex64>,
    ) -> Result<Self, SolveError> {
        let expected = (ys_mm.len(), xs_mm.len());
        if xs_mm.len() < 2 || ys_mm.len() < 2 {
            return Err(SolveError::MalformedOutput(format!(
                "field grid needs at least 2x2 nodes, got {}x{}",
                ys_mm.len(),
                xs_mm.len()
            )));
        }
        if bx_t.dim() != expected || by_t.dim() != expected {
            return Err(SolveError::MalformedOutput(format!(
                "field component shape {:?} does not match grid {:?}",
                bx_t.dim(),
                expected
            )));
        }
        if xs_mm.windows(2).any(|w| w[1] <= w[0]) || ys_mm.windows(2).any(|w| w[1] <= w[0]) {
            return Err(SolveError::MalformedOutput(
                "field grid axes are not strictly ascending".to_string(),
            ));
        }
        Ok(Self {
            xs_mm,
            ys_mm,
            bx_t,
            by_t,
        })
    }

    /// Cell index and clamped interpolation weight along one axis.
    fn locate(axis: &[f64], value: f64) -> (usize, f64) {
        let n = axis.len();
        if value <= axis[0] {
            return (0, 0.0);
        }
        if value >= axis[n - 1] {
            return (n - 2, 1.0);
        }
        let i = axis.partition_point(|&a| a <= value) - 1;
        let i = i.min(n - 2);
        let t = (value - axis[i]) / (axis[i + 1] - axis[i]);
        (i, t)
    }
}

impl FieldMap for GridFieldMap {
    fn flux_density_t(&self, x_mm: f64, y_mm: f64) -> [Complex64; 2] {
        let (ix, tx) = Self::locate(&self.xs_mm, x_mm);
        let (iy, ty) = Self::locate(&self.ys_mm, y_mm);

        let lerp2 = |field: &Array2<Complex64>| {
            let f00 = field[[iy, ix]];
            let f01 = field[[iy, ix + 1]];
            let f10 = field[[iy + 1, ix]];
            let f11 = field[[iy + 1, ix + 1]];
            f00 * ((1.0 - tx) * (1.0 - ty))
                + f01 * (tx * (1.0 - ty))
                + f10 * ((1.0 - tx) * ty)
                + f11 * (tx * ty)
        };

        [lerp2(&self.bx_t), lerp2(&self.by_t)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linear_map() -> GridFieldMap {
        // bx = x + i*y, by = 2x - y over a 3x4 grid
        let xs = vec![0.0, 1.0, 2.0, 4.0];
        let ys = vec![0.0, 2.0, 3.0];
        let bx = Array2::from_shape_fn((3, 4), |(iy, ix)| {
            Complex64::new(xs[ix], ys[iy])
        });
        let by = Array2::from_shape_fn((3, 4), |(iy, ix)| {
            Complex64::new(2.0 * xs[ix] - ys[iy], 0.0)
        });
        GridFieldMap::new(xs, ys, bx, by).unwrap()
    }

    #[test]
    fn interpolation_reproduces_linear_fields() {
        let map = linear_map();
        for &(x, y) in &[(0.5, 1.0), (1.5, 2.5), (3.0, 0.25), (2.0, 2.0)] {
            let [bx, by] = map.flux_density_t(x, y);
            assert!((bx.re - x).abs() < 1e-12);
            assert!((bx.im - y).abs() < 1e-12);
            assert!((by.re - (2.0 * x - y)).abs() < 1e-12);
        }
    }

    #[test]
    fn queries_clamp_to_the_window_edge() {
        let map = linear_map();
        let [bx, _] = map.flux_density_t(-5.0, -5.0);
        assert_eq!(bx, Complex64::new(0.0, 0.0));
        let [bx, _] = map.flux_density_t(100.0, 100.0);
        assert_eq!(bx, Complex64::new(4.0, 3.0));
    }

    #[test]
    fn shape_mismatch_is_malformed_output() {
        let xs = vec![0.0, 1.0];
        let ys = vec![0.0, 1.0];
        let good = Array2::from_elem((2, 2), Complex64::new(0.0, 0.0));
        let bad = Array2::from_elem((2, 3), Complex64::new(0.0, 0.0));
        let err = GridFieldMap::new(xs, ys, bad, good).unwrap_err();
        assert!(matches!(err, SolveError::MalformedOutput(_)));
    }
}
