//! Transform fitting from corresponding point pairs
//!
//! Every family maps `source` points onto `target` points in the
//! least-squares sense:
//!
//! - `lsq6`: rigid body, closed form by SVD (Kabsch) with reflection
//!   correction
//! - `lsq7`: rigid body plus one isotropic scale (Umeyama)
//! - `lsq9` / `lsq10`: rotation, translation and three scales (plus one shear),
//!   refined from the `lsq7` solution by simplex search
//! - `lsq12`: unconstrained affine by linear least squares
//! - `tps`: thin-plate spline interpolating every pair

use crate::io::configuration::{
    MIN_POINTS_LINEAR, MIN_POINTS_TPS, SIMPLEX_MAX_ITERATIONS, SIMPLEX_ROTATION_STEP,
    SIMPLEX_SCALE_STEP, SIMPLEX_TOLERANCE, SIMPLEX_TRANSLATION_STEP,
};
use crate::io::error::{Result, ToolError, computation_error, invalid_parameter};
use crate::math::simplex::{SimplexOptions, minimize};
use crate::transform::general::{GeneralTransform, LinearTransform, TransformKind};
use crate::transform::tps::ThinPlateSpline;
use log::debug;
use nalgebra::{DMatrix, Matrix3, Matrix4, Point3, Rotation3, Vector3};

const RANK_TOLERANCE: f64 = 1e-10;

/// Family of transforms a point-pair fit can produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransformFamily {
    /// Rotation and translation
    #[default]
    Lsq6,
    /// Rotation, translation and one isotropic scale
    Lsq7,
    /// Rotation, translation and three scales
    Lsq9,
    /// Rotation, translation, three scales and one shear
    Lsq10,
    /// Full affine
    Lsq12,
    /// Thin-plate spline
    Tps,
}

impl TransformFamily {
    /// Command-line name of the family
    pub const fn name(self) -> &'static str {
        match self {
            Self::Lsq6 => "lsq6",
            Self::Lsq7 => "lsq7",
            Self::Lsq9 => "lsq9",
            Self::Lsq10 => "lsq10",
            Self::Lsq12 => "lsq12",
            Self::Tps => "tps",
        }
    }

    /// Wording used in transform file comments
    pub const fn description(self) -> &'static str {
        match self {
            Self::Lsq6 => "6 parameter linear least-squares",
            Self::Lsq7 => "7 parameter linear least-squares",
            Self::Lsq9 => "9 parameter linear least-squares",
            Self::Lsq10 => "10 parameter linear least-squares",
            Self::Lsq12 => "12 parameter linear least-squares",
            Self::Tps => "thin-plate spline",
        }
    }

    /// Minimum number of point pairs the fit accepts
    pub const fn min_points(self) -> usize {
        if self.is_linear() {
            MIN_POINTS_LINEAR
        } else {
            MIN_POINTS_TPS
        }
    }

    /// Whether the fitted transform is affine
    pub const fn is_linear(self) -> bool {
        !matches!(self, Self::Tps)
    }
}

/// Fit a transform of `family` mapping each `source` point onto its `target`
///
/// # Errors
///
/// Returns an error if:
/// - The point sets differ in length
/// - Fewer than [`TransformFamily::min_points`] pairs are given
/// - The points are degenerate for the family (e.g. all coplanar for `lsq12`)
pub fn fit_transform(
    source: &[Point3<f64>],
    target: &[Point3<f64>],
    family: TransformFamily,
) -> Result<GeneralTransform> {
    if source.len() != target.len() {
        return Err(invalid_parameter(
            "target",
            &target.len(),
            &format!("expected {} points to match the source", source.len()),
        ));
    }
    if source.len() < family.min_points() {
        return Err(ToolError::InsufficientPoints {
            family: family.name(),
            required: family.min_points(),
            found: source.len(),
        });
    }

    let kind = match family {
        TransformFamily::Lsq6 => linear(similarity(source, target, false)?)?,
        TransformFamily::Lsq7 => linear(similarity(source, target, true)?)?,
        TransformFamily::Lsq9 => linear(scaled_fit(source, target, false)?)?,
        TransformFamily::Lsq10 => linear(scaled_fit(source, target, true)?)?,
        TransformFamily::Lsq12 => linear(affine(source, target)?)?,
        TransformFamily::Tps => TransformKind::ThinPlateSpline(ThinPlateSpline::fit(source, target)?),
    };
    Ok(GeneralTransform::single(kind))
}

fn linear(matrix: Matrix4<f64>) -> Result<TransformKind> {
    Ok(TransformKind::Linear(LinearTransform::new(matrix)?))
}

fn centroid(points: &[Point3<f64>]) -> Vector3<f64> {
    points
        .iter()
        .fold(Vector3::zeros(), |acc, p| acc + p.coords)
        / points.len().max(1) as f64
}

/// Rotation (and optional scale) from centred correspondences
struct Similarity {
    rotation: Matrix3<f64>,
    scale: f64,
    source_centroid: Vector3<f64>,
    target_centroid: Vector3<f64>,
}

impl Similarity {
    fn matrix(&self) -> Matrix4<f64> {
        compose(
            &(self.rotation * self.scale),
            self.source_centroid,
            self.target_centroid,
        )
    }
}

// Homogeneous matrix for p -> linear * (p - source_c) + target_c
fn compose(
    linear: &Matrix3<f64>,
    source_centroid: Vector3<f64>,
    target_centroid: Vector3<f64>,
) -> Matrix4<f64> {
    let translation = target_centroid - linear * source_centroid;
    let mut matrix = linear.to_homogeneous();
    matrix.fixed_view_mut::<3, 1>(0, 3).copy_from(&translation);
    matrix
}

fn solve_similarity(
    source: &[Point3<f64>],
    target: &[Point3<f64>],
    with_scale: bool,
) -> Result<Similarity> {
    let source_centroid = centroid(source);
    let target_centroid = centroid(target);

    let mut covariance = Matrix3::zeros();
    let mut source_spread = 0.0;
    for (p, q) in source.iter().zip(target.iter()) {
        let a = p.coords - source_centroid;
        let b = q.coords - target_centroid;
        covariance += a * b.transpose();
        source_spread += a.norm_squared();
    }

    let svd = covariance.svd(true, true);
    let (Some(u), Some(v_t)) = (svd.u, svd.v_t) else {
        return Err(computation_error("rigid fit", &"SVD did not converge"));
    };
    let v = v_t.transpose();
    let reflection = if (v * u.transpose()).determinant() < 0.0 {
        -1.0
    } else {
        1.0
    };
    let correction = Matrix3::from_diagonal(&Vector3::new(1.0, 1.0, reflection));
    let rotation = v * correction * u.transpose();

    let scale = if with_scale {
        if source_spread <= f64::EPSILON {
            return Err(computation_error(
                "similarity fit",
                &"source points coincide",
            ));
        }
        let singular = svd.singular_values;
        (singular.x + singular.y + reflection * singular.z) / source_spread
    } else {
        1.0
    };

    Ok(Similarity {
        rotation,
        scale,
        source_centroid,
        target_centroid,
    })
}

fn similarity(source: &[Point3<f64>], target: &[Point3<f64>], with_scale: bool) -> Result<Matrix4<f64>> {
    let solved = solve_similarity(source, target, with_scale)?;
    debug!(
        "similarity fit: scale {:.6}, rms residual {:.6}",
        solved.scale,
        rms_residual(&solved.matrix(), source, target)
    );
    Ok(solved.matrix())
}

// Parameters: rotation delta (3), translation delta (3), scales (3), shear (0 or 1)
fn scaled_matrix(start: &Similarity, parameters: &[f64]) -> Matrix4<f64> {
    let parameter = |i: usize| parameters.get(i).copied().unwrap_or(0.0);
    let delta = Rotation3::from_euler_angles(parameter(0), parameter(1), parameter(2));
    let translation = Vector3::new(parameter(3), parameter(4), parameter(5));
    let scales = Matrix3::from_diagonal(&Vector3::new(parameter(6), parameter(7), parameter(8)));
    let mut shear = Matrix3::identity();
    if let Some(entry) = shear.get_mut((0, 1)) {
        *entry = parameter(9);
    }

    let linear = start.rotation * delta.matrix() * scales * shear;
    compose(
        &linear,
        start.source_centroid,
        start.target_centroid + translation,
    )
}

fn scaled_fit(source: &[Point3<f64>], target: &[Point3<f64>], with_shear: bool) -> Result<Matrix4<f64>> {
    let start = solve_similarity(source, target, true)?;
    let s = start.scale;

    let mut initial = vec![0.0, 0.0, 0.0, 0.0, 0.0, 0.0, s, s, s];
    let mut steps = vec![
        SIMPLEX_ROTATION_STEP,
        SIMPLEX_ROTATION_STEP,
        SIMPLEX_ROTATION_STEP,
        SIMPLEX_TRANSLATION_STEP,
        SIMPLEX_TRANSLATION_STEP,
        SIMPLEX_TRANSLATION_STEP,
        SIMPLEX_SCALE_STEP,
        SIMPLEX_SCALE_STEP,
        SIMPLEX_SCALE_STEP,
    ];
    if with_shear {
        initial.push(0.0);
        steps.push(SIMPLEX_SCALE_STEP);
    }

    let objective = |parameters: &[f64]| {
        let matrix = scaled_matrix(&start, parameters);
        squared_residual(&matrix, source, target)
    };
    let minimum = minimize(
        objective,
        &initial,
        &steps,
        SimplexOptions {
            max_iterations: SIMPLEX_MAX_ITERATIONS,
            tolerance: SIMPLEX_TOLERANCE,
        },
    );
    debug!(
        "simplex fit converged after {} iterations, residual {:.6e}",
        minimum.iterations, minimum.value
    );

    if !minimum.value.is_finite() {
        return Err(computation_error(
            "scaled linear fit",
            &"objective is not finite",
        ));
    }
    Ok(scaled_matrix(&start, &minimum.point))
}

fn affine(source: &[Point3<f64>], target: &[Point3<f64>]) -> Result<Matrix4<f64>> {
    let n = source.len();
    let design = DMatrix::from_fn(n, 4, |row, col| {
        source.get(row).map_or(0.0, |p| match col {
            0 => p.x,
            1 => p.y,
            2 => p.z,
            _ => 1.0,
        })
    });
    let observed = DMatrix::from_fn(n, 3, |row, col| {
        target
            .get(row)
            .and_then(|q| q.coords.get(col).copied())
            .unwrap_or(0.0)
    });

    let svd = design.svd(true, true);
    if svd.rank(RANK_TOLERANCE) < 4 {
        return Err(computation_error(
            "affine fit",
            &"points are coplanar or coincide",
        ));
    }
    let solution = svd
        .solve(&observed, RANK_TOLERANCE)
        .map_err(|reason| computation_error("affine fit", &reason))?;

    let mut matrix = Matrix4::identity();
    for row in 0..3 {
        for col in 0..4 {
            if let (Some(entry), Some(&value)) = (matrix.get_mut((row, col)), solution.get((col, row))) {
                *entry = value;
            }
        }
    }
    debug!(
        "affine fit rms residual {:.6}",
        rms_residual(&matrix, source, target)
    );
    Ok(matrix)
}

fn squared_residual(matrix: &Matrix4<f64>, source: &[Point3<f64>], target: &[Point3<f64>]) -> f64 {
    source
        .iter()
        .zip(target.iter())
        .map(|(p, q)| (matrix.transform_point(p) - q).norm_squared())
        .sum()
}

fn rms_residual(matrix: &Matrix4<f64>, source: &[Point3<f64>], target: &[Point3<f64>]) -> f64 {
    (squared_residual(matrix, source, target) / source.len().max(1) as f64).sqrt()
}
