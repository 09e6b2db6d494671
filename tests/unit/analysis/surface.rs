//! Tests for projecting displacements onto surface normals

#[cfg(test)]
mod tests {
    use crate::unit_geometry;
    use nalgebra::{Point3, Vector3};
    use neurovol::analysis::surface::{normal_dot_products, write_values};
    use neurovol::io::polygons::PolygonMesh;
    use neurovol::spatial::grid::VectorField;

    fn mesh(points: Vec<Point3<f64>>, normals: Vec<Vector3<f64>>) -> PolygonMesh {
        PolygonMesh {
            points,
            normals,
            end_indices: Vec::new(),
            indices: Vec::new(),
        }
    }

    // Tests dot products use the nearest voxel displacement
    #[test]
    fn test_dot_products() {
        let mut field = VectorField::zeros(unit_geometry([3, 3, 3]));
        field.set_vector([1, 1, 1], [1.0, 2.0, 3.0]);
        field.set_vector([2, 0, 0], [-4.0, 0.0, 0.0]);

        let surface = mesh(
            vec![
                Point3::new(1.1, 0.9, 1.2),
                Point3::new(1.0, 1.0, 1.0),
                Point3::new(1.8, 0.2, 0.0),
            ],
            vec![Vector3::z(), Vector3::new(0.0, 0.6, 0.8), Vector3::x()],
        );

        let values = normal_dot_products(&surface, &field);
        assert_eq!(values.len(), 3);
        assert!((values[0] - 3.0).abs() < 1e-12);
        assert!((values[1] - 3.6).abs() < 1e-12);
        assert!((values[2] + 4.0).abs() < 1e-12);
    }

    // Tests vertices outside the field read zero
    #[test]
    fn test_outside_is_zero() {
        let mut field = VectorField::zeros(unit_geometry([2, 2, 2]));
        field.set_vector([1, 1, 1], [5.0, 5.0, 5.0]);
        let surface = mesh(vec![Point3::new(40.0, 1.0, 1.0)], vec![Vector3::x()]);
        assert_eq!(normal_dot_products(&surface, &field), vec![0.0]);
    }

    #[test]
    fn test_write_values() {
        let mut out = Vec::new();
        write_values(&[1.0, -0.25, 3.1234567], &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "1.000000\n-0.250000\n3.123457\n");
    }
}
