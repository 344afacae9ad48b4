//! Natural cubic spline through 3D knots
//!
//! Each coordinate is interpolated independently against a shared scalar
//! parameter (the point index along a branch). The second derivative
//! vanishes at both ends. The tridiagonal system for the knot second
//! derivatives is solved with the Thomas algorithm; its scalar coefficients
//! are shared by all three coordinates, so the right-hand side is carried
//! as a `Vector3`.

use nalgebra::{Point3, Vector3};

#[derive(Debug, Clone)]
pub struct CubicSpline3 {
    params: Vec<f64>,
    values: Vec<Vector3<f64>>,
    /// Second derivatives at the knots
    second: Vec<Vector3<f64>>,
}

impl CubicSpline3 {
    /// Fit through `(parameter, value)` knots. Parameters must be finite and
    /// strictly increasing; fewer than two knots give `None`.
    pub fn new(knots: &[(f64, Point3<f64>)]) -> Option<Self> {
        if knots.len() < 2 {
            return None;
        }
        if knots.iter().any(|(t, _)| !t.is_finite()) || knots.windows(2).any(|w| w[1].0 <= w[0].0) {
            return None;
        }
        let params: Vec<f64> = knots.iter().map(|(t, _)| *t).collect();
        let values: Vec<Vector3<f64>> = knots.iter().map(|(_, p)| p.coords).collect();
        let second = natural_second_derivatives(&params, &values);
        Some(Self {
            params,
            values,
            second,
        })
    }

    /// Spline value at `t`; parameters outside the knot range are clamped.
    pub fn evaluate(&self, t: f64) -> Point3<f64> {
        let n = self.params.len();
        let t = t.clamp(self.params[0], self.params[n - 1]);
        // segment i spans params[i]..=params[i + 1]
        let i = self
            .params
            .partition_point(|&p| p <= t)
            .saturating_sub(1)
            .min(n - 2);

        let h = self.params[i + 1] - self.params[i];
        let a = self.params[i + 1] - t;
        let b = t - self.params[i];
        let (m0, m1) = (self.second[i], self.second[i + 1]);
        let (y0, y1) = (self.values[i], self.values[i + 1]);

        let v = m0 * (a * a * a / (6.0 * h))
            + m1 * (b * b * b / (6.0 * h))
            + (y0 / h - m0 * (h / 6.0)) * a
            + (y1 / h - m1 * (h / 6.0)) * b;
        Point3::from(v)
    }
}

fn natural_second_derivatives(params: &[f64], values: &[Vector3<f64>]) -> Vec<Vector3<f64>> {
    let n = params.len();
    let mut second = vec![Vector3::zeros(); n];
    if n < 3 {
        return second;
    }

    let m = n - 2;
    let h: Vec<f64> = params.windows(2).map(|w| w[1] - w[0]).collect();
    let slope = |i: usize| (values[i + 1] - values[i]) / h[i];

    // rows for interior knots 1..=n-2
    let mut diag = vec![0.0; m];
    let mut upper = vec![0.0; m];
    let mut rhs = vec![Vector3::zeros(); m];
    for r in 0..m {
        let k = r + 1;
        diag[r] = 2.0 * (h[k - 1] + h[k]);
        upper[r] = h[k];
        rhs[r] = (slope(k) - slope(k - 1)) * 6.0;
    }

    // forward sweep; lower[r] = h[r] for row r
    for r in 1..m {
        let w = h[r] / diag[r - 1];
        diag[r] -= w * upper[r - 1];
        let prev = rhs[r - 1];
        rhs[r] -= prev * w;
    }
    // back substitution
    second[m] = rhs[m - 1] / diag[m - 1];
    for r in (0..m - 1).rev() {
        second[r + 1] = (rhs[r] - second[r + 2] * upper[r]) / diag[r];
    }
    second
}

#[cfg(test)]
mod tests {
    use super::*;

    fn knots(points: &[(f64, [f64; 3])]) -> Vec<(f64, Point3<f64>)> {
        points.iter().map(|(t, p)| (*t, Point3::new(p[0], p[1], p[2]))).collect()
    }

    #[test]
    fn test_interpolates_knots() {
        let k = knots(&[
            (0.0, [0.0, 0.0, 0.0]),
            (3.0, [1.0, 2.0, 0.5]),
            (4.0, [2.0, 1.0, -1.0]),
            (9.0, [0.0, 5.0, 3.0]),
        ]);
        let spline = CubicSpline3::new(&k).unwrap();
        for (t, p) in &k {
            assert!((spline.evaluate(*t) - p).norm() < 1e-9);
        }
    }

    #[test]
    fn test_two_knots_are_linear() {
        let k = knots(&[(0.0, [0.0, 0.0, 0.0]), (10.0, [10.0, -20.0, 5.0])]);
        let spline = CubicSpline3::new(&k).unwrap();
        let mid = spline.evaluate(2.5);
        assert!((mid - Point3::new(2.5, -5.0, 1.25)).norm() < 1e-12);
    }

    #[test]
    fn test_collinear_knots_stay_on_line() {
        // natural spline reproduces linear data exactly
        let k: Vec<(f64, Point3<f64>)> = [0.0, 2.0, 3.0, 7.0, 8.0]
            .iter()
            .map(|&t| (t, Point3::new(t, 2.0 * t, -t)))
            .collect();
        let spline = CubicSpline3::new(&k).unwrap();
        for i in 0..=16 {
            let t = i as f64 * 0.5;
            assert!((spline.evaluate(t) - Point3::new(t, 2.0 * t, -t)).norm() < 1e-9);
        }
    }

    #[test]
    fn test_natural_end_conditions() {
        let k = knots(&[
            (0.0, [0.0, 0.0, 0.0]),
            (1.0, [1.0, 1.0, 0.0]),
            (2.0, [2.0, 0.0, 0.0]),
            (3.0, [3.0, 1.0, 0.0]),
        ]);
        let spline = CubicSpline3::new(&k).unwrap();
        assert_eq!(spline.second[0], Vector3::zeros());
        assert_eq!(spline.second[3], Vector3::zeros());
        // symmetric zig-zag: interior curvature equal and opposite
        assert!((spline.second[1].y + spline.second[2].y).abs() < 1e-12);
    }

    #[test]
    fn test_rejects_degenerate_knots() {
        assert!(CubicSpline3::new(&knots(&[(0.0, [0.0; 3])])).is_none());
        assert!(CubicSpline3::new(&knots(&[(1.0, [0.0; 3]), (1.0, [1.0; 3])])).is_none());
        assert!(CubicSpline3::new(&knots(&[(2.0, [0.0; 3]), (1.0, [1.0; 3])])).is_none());
    }

    #[test]
    fn test_clamps_outside_range() {
        let k = knots(&[(0.0, [0.0; 3]), (1.0, [1.0; 3]), (2.0, [4.0; 3])]);
        let spline = CubicSpline3::new(&k).unwrap();
        assert_eq!(spline.evaluate(-5.0), Point3::new(0.0, 0.0, 0.0));
        assert!((spline.evaluate(9.0) - Point3::new(4.0, 4.0, 4.0)).norm() < 1e-12);
    }
}
