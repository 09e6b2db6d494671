//! Three-dimensional thin-plate spline transforms
//!
//! The spline maps a world point `p` to
//! `Σ wᵢ U(|p − cᵢ|) + a₀ + A p`, with the 3-D kernel `U(r) = r`, control
//! points `cᵢ`, weights `wᵢ` and an affine part `(a₀, A)`. Fitting solves the
//! standard bordered system
//!
//! ```text
//! | K  P | | W |   | Y |
//! | Pᵀ 0 | | A | = | 0 |
//! ```
//!
//! exactly, so the spline interpolates every control point.

use crate::io::error::{Result, computation_error, invalid_parameter};
use nalgebra::{DMatrix, Point3};

/// Thin-plate spline through a set of control points
#[derive(Debug, Clone, PartialEq)]
pub struct ThinPlateSpline {
    points: Vec<Point3<f64>>,
    // (n + 4) x 3: n kernel weights, then constant, x, y, z rows
    coefficients: DMatrix<f64>,
}

fn kernel(r: f64) -> f64 {
    r
}

impl ThinPlateSpline {
    /// Rebuild a spline from stored control points and coefficients
    ///
    /// # Errors
    ///
    /// Returns an error unless `coefficients` is `(n + 4) x 3` for `n` points
    pub fn from_parts(points: Vec<Point3<f64>>, coefficients: DMatrix<f64>) -> Result<Self> {
        if coefficients.nrows() != points.len() + 4 || coefficients.ncols() != 3 {
            return Err(invalid_parameter(
                "coefficients",
                &format!("{}x{}", coefficients.nrows(), coefficients.ncols()),
                &format!("expected {}x3 for {} points", points.len() + 4, points.len()),
            ));
        }
        Ok(Self {
            points,
            coefficients,
        })
    }

    /// Fit the spline that maps every `source` point onto its `target`
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The point sets differ in length
    /// - The system is singular (duplicate or coplanar control points)
    pub fn fit(source: &[Point3<f64>], target: &[Point3<f64>]) -> Result<Self> {
        if source.len() != target.len() {
            return Err(invalid_parameter(
                "target",
                &target.len(),
                &format!("expected {} points to match the source", source.len()),
            ));
        }

        let n = source.len();
        let size = n + 4;
        let mut system = DMatrix::<f64>::zeros(size, size);
        let mut rhs = DMatrix::<f64>::zeros(size, 3);

        for (row, (p, t)) in source.iter().zip(target.iter()).enumerate() {
            for (col, q) in source.iter().enumerate() {
                if let Some(entry) = system.get_mut((row, col)) {
                    *entry = kernel(nalgebra::distance(p, q));
                }
            }
            let affine = [1.0, p.x, p.y, p.z];
            for (offset, &value) in affine.iter().enumerate() {
                if let Some(entry) = system.get_mut((row, n + offset)) {
                    *entry = value;
                }
                if let Some(entry) = system.get_mut((n + offset, row)) {
                    *entry = value;
                }
            }
            for axis in 0..3 {
                if let Some(entry) = rhs.get_mut((row, axis)) {
                    *entry = t.coords.get(axis).copied().unwrap_or(0.0);
                }
            }
        }

        let coefficients = system.lu().solve(&rhs).ok_or_else(|| {
            computation_error(
                "thin-plate spline fit",
                &"singular system (duplicate or degenerate control points)",
            )
        })?;

        Ok(Self {
            points: source.to_vec(),
            coefficients,
        })
    }

    /// Control points of the spline
    pub fn points(&self) -> &[Point3<f64>] {
        &self.points
    }

    /// Coefficient matrix: kernel weights followed by the affine rows
    pub const fn coefficients(&self) -> &DMatrix<f64> {
        &self.coefficients
    }

    /// Evaluate the spline at `p`
    pub fn transform_point(&self, p: &Point3<f64>) -> Point3<f64> {
        let n = self.points.len();
        let coefficient = |row: usize, axis: usize| {
            self.coefficients.get((row, axis)).copied().unwrap_or(0.0)
        };

        let mut result = [0.0f64; 3];
        for (axis, value) in result.iter_mut().enumerate() {
            let mut sum = coefficient(n, axis)
                + coefficient(n + 1, axis) * p.x
                + coefficient(n + 2, axis) * p.y
                + coefficient(n + 3, axis) * p.z;
            for (row, c) in self.points.iter().enumerate() {
                sum += coefficient(row, axis) * kernel(nalgebra::distance(p, c));
            }
            *value = sum;
        }
        Point3::new(result[0], result[1], result[2])
    }
}
