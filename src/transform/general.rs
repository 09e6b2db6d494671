//! World-to-world spatial transforms
//!
//! A [`GeneralTransform`] is a concatenation of linear, thin-plate spline and
//! grid (displacement volume) parts applied in order. Each part may carry an
//! invert flag; inverted linear parts use the matrix inverse, inverted
//! non-linear parts are solved numerically by fixed-point iteration.

use crate::io::configuration::{INVERSE_MAX_ITERATIONS, INVERSE_TOLERANCE};
use crate::io::error::{Result, invalid_parameter};
use crate::math::interpolation::Interpolation;
use crate::spatial::grid::VectorField;
use crate::transform::tps::ThinPlateSpline;
use nalgebra::{Matrix4, Point3, Vector3};
use std::path::PathBuf;

/// Affine transform with its precomputed inverse
#[derive(Debug, Clone, PartialEq)]
pub struct LinearTransform {
    matrix: Matrix4<f64>,
    inverse: Matrix4<f64>,
}

impl LinearTransform {
    /// Wrap a homogeneous 4x4 matrix
    ///
    /// # Errors
    ///
    /// Returns an error if the matrix is not invertible
    pub fn new(matrix: Matrix4<f64>) -> Result<Self> {
        let inverse = matrix.try_inverse().ok_or_else(|| {
            invalid_parameter(
                "linear transform",
                &format!("{matrix:?}"),
                &"matrix is singular",
            )
        })?;
        Ok(Self { matrix, inverse })
    }

    /// The identity transform
    pub fn identity() -> Self {
        Self {
            matrix: Matrix4::identity(),
            inverse: Matrix4::identity(),
        }
    }

    /// Forward homogeneous matrix
    pub const fn matrix(&self) -> &Matrix4<f64> {
        &self.matrix
    }
}

/// Non-linear transform defined by a sampled displacement field
#[derive(Debug, Clone)]
pub struct GridTransform {
    /// Displacements added to world points
    pub field: VectorField,
    /// File the displacement volume was loaded from or will be written to
    pub volume_path: PathBuf,
}

impl GridTransform {
    fn transform_point(&self, p: &Point3<f64>) -> Point3<f64> {
        let [dx, dy, dz] = self.field.sample_world(p, Interpolation::Trilinear);
        p + Vector3::new(dx, dy, dz)
    }
}

/// Kind of a single transform part
#[derive(Debug, Clone)]
pub enum TransformKind {
    /// Affine transform
    Linear(LinearTransform),
    /// Thin-plate spline
    ThinPlateSpline(ThinPlateSpline),
    /// Displacement-volume transform
    Grid(GridTransform),
}

impl TransformKind {
    fn forward(&self, p: &Point3<f64>) -> Point3<f64> {
        match self {
            Self::Linear(linear) => linear.matrix.transform_point(p),
            Self::ThinPlateSpline(spline) => spline.transform_point(p),
            Self::Grid(grid) => grid.transform_point(p),
        }
    }

    /// Short name used in log messages and file headers
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Linear(_) => "Linear",
            Self::ThinPlateSpline(_) => "Thin_Plate_Spline_Transform",
            Self::Grid(_) => "Grid_Transform",
        }
    }
}

/// One part of a concatenated transform
#[derive(Debug, Clone)]
pub struct Transform {
    /// Forward definition
    pub kind: TransformKind,
    /// Apply the inverse of `kind` instead of the forward map
    pub inverted: bool,
}

impl Transform {
    /// Forward transform part
    pub const fn new(kind: TransformKind) -> Self {
        Self {
            kind,
            inverted: false,
        }
    }

    /// Map a world point through this part
    pub fn transform_point(&self, p: &Point3<f64>) -> Point3<f64> {
        if !self.inverted {
            return self.kind.forward(p);
        }
        match &self.kind {
            TransformKind::Linear(linear) => linear.inverse.transform_point(p),
            kind => invert_numerically(|q| kind.forward(q), p),
        }
    }
}

// Solve forward(x) = target by x <- x + (target - forward(x))
fn invert_numerically<F>(forward: F, target: &Point3<f64>) -> Point3<f64>
where
    F: Fn(&Point3<f64>) -> Point3<f64>,
{
    let mut estimate = *target;
    for _ in 0..INVERSE_MAX_ITERATIONS {
        let residual = target - forward(&estimate);
        if residual.norm() < INVERSE_TOLERANCE {
            break;
        }
        estimate += residual;
    }
    estimate
}

/// Concatenation of transform parts applied first to last
#[derive(Debug, Clone)]
pub struct GeneralTransform {
    parts: Vec<Transform>,
}

impl GeneralTransform {
    /// Concatenate parts in application order
    ///
    /// # Errors
    ///
    /// Returns an error if `parts` is empty
    pub fn new(parts: Vec<Transform>) -> Result<Self> {
        if parts.is_empty() {
            return Err(invalid_parameter(
                "transform",
                &"<empty>",
                &"a transform needs at least one part",
            ));
        }
        Ok(Self { parts })
    }

    /// Single forward part
    pub fn single(kind: TransformKind) -> Self {
        Self {
            parts: vec![Transform::new(kind)],
        }
    }

    /// The identity transform
    pub fn identity() -> Self {
        Self::single(TransformKind::Linear(LinearTransform::identity()))
    }

    /// Parts in application order
    pub fn parts(&self) -> &[Transform] {
        &self.parts
    }

    /// Number of concatenated parts
    pub fn len(&self) -> usize {
        self.parts.len()
    }

    /// Whether the transform has no parts (never true for a constructed value)
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Map a world point through every part
    pub fn transform_point(&self, p: &Point3<f64>) -> Point3<f64> {
        self.parts
            .iter()
            .fold(*p, |point, part| part.transform_point(&point))
    }

    /// Displacement `transform(p) - p`
    pub fn displacement(&self, p: &Point3<f64>) -> Vector3<f64> {
        self.transform_point(p) - p
    }

    /// Only the thin-plate spline and grid parts, in their original order
    ///
    /// Returns `None` when every part is linear.
    pub fn non_linear(&self) -> Option<Self> {
        let parts: Vec<Transform> = self
            .parts
            .iter()
            .filter(|part| !matches!(part.kind, TransformKind::Linear(_)))
            .cloned()
            .collect();
        (!parts.is_empty()).then_some(Self { parts })
    }
}
