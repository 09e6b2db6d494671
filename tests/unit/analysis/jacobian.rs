//! Tests for Jacobian determinants and displacement smoothing

#[cfg(test)]
mod tests {
    use crate::{grid_from, unit_geometry};
    use neurovol::ToolError;
    use neurovol::analysis::jacobian::{jacobian_determinant, log_determinant, smooth_field};
    use neurovol::io::progress::SliceProgress;
    use neurovol::spatial::grid::{GridGeometry, VectorField};

    fn field_from(geometry: GridGeometry, displacement: impl Fn([usize; 3]) -> [f64; 3]) -> VectorField {
        let mut field = VectorField::zeros(geometry.clone());
        let [n0, n1, n2] = geometry.sizes;
        for i in 0..n0 {
            for j in 0..n1 {
                for k in 0..n2 {
                    field.set_vector([i, j, k], displacement([i, j, k]));
                }
            }
        }
        field
    }

    // Tests a zero field has determinant one everywhere
    #[test]
    fn test_zero_field() {
        let progress = SliceProgress::hidden();
        let field = VectorField::zeros(unit_geometry([3, 4, 2]));

        let determinant = jacobian_determinant(&field, &progress).unwrap();
        assert_eq!(determinant.geometry.sizes, [3, 4, 2]);
        assert!(determinant.data.iter().all(|&d| (d - 1.0).abs() < 1e-12));
        assert_eq!(progress.position(), 3);
    }

    // Tests derivatives are taken per world unit, not per voxel
    // Verified by dropping the voxel-to-world inverse
    #[test]
    fn test_spacing_scales_gradient() {
        let geometry = GridGeometry::axis_aligned([4, 3, 3], [0.0; 3], [2.0, 1.0, 1.0]).unwrap();
        // u_x = i, so du_x/dx = 1/2
        let field = field_from(geometry, |[i, _, _]| [i as f64, 0.0, 0.0]);

        let determinant = jacobian_determinant(&field, &SliceProgress::hidden()).unwrap();
        assert!(determinant.data.iter().all(|&d| (d - 1.5).abs() < 1e-12));
    }

    // Tests central differences inside and one-sided differences on the border
    #[test]
    fn test_quadratic_field() {
        let field = field_from(unit_geometry([5, 1, 1]), |[i, _, _]| [(i * i) as f64, 0.0, 0.0]);

        let determinant = jacobian_determinant(&field, &SliceProgress::hidden()).unwrap();
        assert_eq!(determinant.get([0, 0, 0]), Some(2.0));
        assert_eq!(determinant.get([2, 0, 0]), Some(5.0));
        assert_eq!(determinant.get([4, 0, 0]), Some(8.0));
    }

    #[test]
    fn test_uniform_scaling() {
        let field = field_from(unit_geometry([3, 3, 3]), |[i, j, k]| [i as f64, j as f64, k as f64]);

        let determinant = jacobian_determinant(&field, &SliceProgress::hidden()).unwrap();
        assert!(determinant.data.iter().all(|&d| (d - 8.0).abs() < 1e-12));
    }

    // Tests axes of a single voxel contribute no derivative
    #[test]
    fn test_single_voxel_axis() {
        let field = field_from(unit_geometry([1, 1, 1]), |_| [5.0, -3.0, 2.0]);

        let determinant = jacobian_determinant(&field, &SliceProgress::hidden()).unwrap();
        assert_eq!(determinant.get([0, 0, 0]), Some(1.0));
    }

    #[test]
    fn test_log_determinant() {
        let grid = grid_from([1, 1, 2], vec![std::f64::consts::E, 1.0]);

        let logged = log_determinant(grid).unwrap();
        assert!((logged.get([0, 0, 0]).unwrap() - 1.0).abs() < 1e-12);
        assert_eq!(logged.get([0, 0, 1]), Some(0.0));
    }

    // Tests folded voxels cannot be logged
    #[test]
    fn test_log_rejects_folding() {
        let grid = grid_from([1, 1, 3], vec![1.0, 0.5, -0.25]);

        let result = log_determinant(grid);
        assert!(matches!(
            result,
            Err(ToolError::Computation {
                operation: "log determinant",
                ..
            })
        ));
    }

    // Tests smoothing leaves a constant field unchanged, borders included
    #[test]
    fn test_smooth_constant() {
        let field = field_from(unit_geometry([4, 5, 3]), |_| [1.5, -2.0, 0.25]);

        let smoothed = smooth_field(&field, 3.0).unwrap();
        for (before, after) in field.data.iter().zip(smoothed.data.iter()) {
            assert!((before - after).abs() < 1e-12);
        }
    }

    // Tests smoothing spreads an impulse symmetrically without losing mass
    #[test]
    fn test_smooth_impulse() {
        let field = field_from(unit_geometry([1, 1, 11]), |[_, _, k]| {
            if k == 5 { [1.0, 0.0, 0.0] } else { [0.0; 3] }
        });

        let smoothed = smooth_field(&field, 2.0).unwrap();
        let component = smoothed.component(0);
        let total: f64 = component.iter().sum();
        assert!((total - 1.0).abs() < 1e-12);

        let at = |k: usize| component.get([0, 0, k]).copied().unwrap();
        let centre = at(5);
        assert!(centre < 1.0);
        for offset in 1..=3 {
            let left = at(5 - offset);
            let right = at(5 + offset);
            assert!((left - right).abs() < 1e-12);
            assert!(left < centre);
        }
    }

    #[test]
    fn test_smooth_rejects_bad_fwhm() {
        let field = VectorField::zeros(unit_geometry([2, 2, 2]));
        for fwhm in [0.0, -1.0, f64::NAN] {
            assert!(matches!(
                smooth_field(&field, fwhm),
                Err(ToolError::InvalidParameter { .. })
            ));
        }
    }
}
