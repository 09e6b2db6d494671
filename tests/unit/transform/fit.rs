//! Tests for point-pair transform fitting

#[cfg(test)]
mod tests {
    use crate::points_close;
    use nalgebra::{Matrix4, Point3, Rotation3, Vector3};
    use neurovol::ToolError;
    use neurovol::transform::fit::{TransformFamily, fit_transform};
    use neurovol::transform::general::{GeneralTransform, TransformKind};

    fn cloud() -> Vec<Point3<f64>> {
        vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(10.0, 0.0, 0.0),
            Point3::new(0.0, 12.0, 0.0),
            Point3::new(0.0, 0.0, 8.0),
            Point3::new(7.0, 5.0, 3.0),
            Point3::new(-4.0, 6.0, 9.0),
            Point3::new(3.0, -8.0, 2.0),
            Point3::new(-6.0, -3.0, -5.0),
        ]
    }

    fn apply(matrix: &Matrix4<f64>, points: &[Point3<f64>]) -> Vec<Point3<f64>> {
        points.iter().map(|p| matrix.transform_point(p)).collect()
    }

    fn rms(transform: &GeneralTransform, source: &[Point3<f64>], target: &[Point3<f64>]) -> f64 {
        let total: f64 = source
            .iter()
            .zip(target.iter())
            .map(|(p, q)| (transform.transform_point(p) - q).norm_squared())
            .sum();
        (total / source.len() as f64).sqrt()
    }

    fn rigid() -> Matrix4<f64> {
        let rotation = Rotation3::from_euler_angles(0.3, -0.2, 0.7);
        Matrix4::new_translation(&Vector3::new(5.0, -3.0, 12.0)) * rotation.to_homogeneous()
    }

    // Tests lsq6 recovers an exact rigid motion
    #[test]
    fn test_lsq6_exact() {
        let source = cloud();
        let target = apply(&rigid(), &source);
        let transform = fit_transform(&source, &target, TransformFamily::Lsq6).unwrap();

        assert!(rms(&transform, &source, &target) < 1e-9);
        let point = Point3::new(20.0, -20.0, 1.0);
        assert!(points_close(&transform.transform_point(&point), &rigid().transform_point(&point), 1e-8));
    }

    // Tests lsq6 never returns a reflection for mirrored input
    // Verified by removing the determinant correction
    #[test]
    fn test_lsq6_rejects_reflection() {
        let source = cloud();
        let mirror = Matrix4::new_nonuniform_scaling(&Vector3::new(-1.0, 1.0, 1.0));
        let target = apply(&mirror, &source);
        let transform = fit_transform(&source, &target, TransformFamily::Lsq6).unwrap();

        let determinant = match transform.parts().first().map(|p| &p.kind) {
            Some(TransformKind::Linear(linear)) => Some(linear.matrix().fixed_view::<3, 3>(0, 0).determinant()),
            _ => None,
        };
        assert!(determinant.is_some_and(|d| (d - 1.0).abs() < 1e-9));
    }

    // Tests lsq7 recovers an isotropic scale
    #[test]
    fn test_lsq7_scale() {
        let source = cloud();
        let matrix = rigid() * Matrix4::new_scaling(1.5);
        let target = apply(&matrix, &source);

        let transform = fit_transform(&source, &target, TransformFamily::Lsq7).unwrap();
        assert!(rms(&transform, &source, &target) < 1e-8);

        let rigid_only = fit_transform(&source, &target, TransformFamily::Lsq6).unwrap();
        assert!(rms(&rigid_only, &source, &target) > 1.0);
    }

    // Tests lsq9 recovers per-axis scales that lsq7 cannot
    #[test]
    fn test_lsq9_anisotropic_scale() {
        let source = cloud();
        let matrix = Matrix4::new_translation(&Vector3::new(2.0, 1.0, -1.0))
            * Matrix4::new_nonuniform_scaling(&Vector3::new(2.0, 1.0, 0.5));
        let target = apply(&matrix, &source);

        let lsq7 = fit_transform(&source, &target, TransformFamily::Lsq7).unwrap();
        let lsq9 = fit_transform(&source, &target, TransformFamily::Lsq9).unwrap();
        let lsq10 = fit_transform(&source, &target, TransformFamily::Lsq10).unwrap();

        let baseline = rms(&lsq7, &source, &target);
        assert!(rms(&lsq9, &source, &target) < 1e-2);
        assert!(rms(&lsq10, &source, &target) < baseline);
    }

    // Tests lsq12 recovers a general affine map
    #[test]
    fn test_lsq12_exact() {
        let source = cloud();
        let matrix = Matrix4::new(
            1.2, 0.1, -0.3, 4.0, //
            0.05, 0.9, 0.2, -2.0, //
            -0.1, 0.3, 1.4, 7.5, //
            0.0, 0.0, 0.0, 1.0,
        );
        let target = apply(&matrix, &source);
        let transform = fit_transform(&source, &target, TransformFamily::Lsq12).unwrap();
        assert!(rms(&transform, &source, &target) < 1e-9);
    }

    // Tests coplanar points cannot determine an affine map
    #[test]
    fn test_lsq12_coplanar() {
        let source: Vec<_> = cloud().into_iter().map(|p| Point3::new(p.x, p.y, 0.0)).collect();
        let target = source.clone();
        assert!(matches!(
            fit_transform(&source, &target, TransformFamily::Lsq12),
            Err(ToolError::Computation { .. })
        ));
    }

    // Tests the spline family interpolates every pair
    #[test]
    fn test_tps_interpolates() {
        let source = cloud();
        let target: Vec<_> = source.iter().map(|p| p + Vector3::new(0.1 * p.y, 0.0, 0.02 * p.x * p.x)).collect();
        let transform = fit_transform(&source, &target, TransformFamily::Tps).unwrap();
        assert!(rms(&transform, &source, &target) < 1e-8);
        assert_eq!(transform.parts().first().map(|p| p.kind.name()), Some("Thin_Plate_Spline_Transform"));
    }

    // Tests the minimum point counts per family
    #[test]
    fn test_insufficient_points() {
        let source = cloud();
        let few = &source[..3];
        assert!(matches!(
            fit_transform(few, few, TransformFamily::Lsq6),
            Err(ToolError::InsufficientPoints {
                family: "lsq6",
                required: 4,
                found: 3
            })
        ));

        let five = &source[..5];
        assert!(fit_transform(five, five, TransformFamily::Lsq12).is_ok());
        assert!(matches!(
            fit_transform(five, five, TransformFamily::Tps),
            Err(ToolError::InsufficientPoints { required: 6, .. })
        ));
    }

    #[test]
    fn test_length_mismatch() {
        let source = cloud();
        assert!(fit_transform(&source, &source[..5], TransformFamily::Lsq6).is_err());
    }

    #[test]
    fn test_family_properties() {
        assert_eq!(TransformFamily::default(), TransformFamily::Lsq6);
        assert_eq!(TransformFamily::Lsq10.name(), "lsq10");
        assert_eq!(TransformFamily::Lsq6.description(), "6 parameter linear least-squares");
        assert_eq!(TransformFamily::Tps.description(), "thin-plate spline");
        assert!(TransformFamily::Lsq12.is_linear());
        assert!(!TransformFamily::Tps.is_linear());
    }
}
