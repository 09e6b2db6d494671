//! Tests for surface normal dot products

#[cfg(test)]
mod tests {
    use crate::unit_geometry;
    use neurovol::ToolError;
    use neurovol::io::volume::{WriteOptions, write_vector_field};
    use neurovol::spatial::grid::VectorField;
    use neurovol::tools::dot_product::{Cli, run};
    use tempfile::TempDir;

    const TRIANGLE: &str = "P 0.3 0.3 0.4 10 1 3\n\
        0 0 0\n2 0 0\n0 2 0\n\
        0 0 1\n0 0 1\n1 0 0\n\
        1\n0 1 1 1 1\n3\n0 1 2\n";

    // Tests one value is written per vertex
    #[test]
    fn test_writes_values_per_vertex() {
        let temp_dir = TempDir::new().unwrap();
        let polygons = temp_dir.path().join("surface.obj");
        std::fs::write(&polygons, TRIANGLE).unwrap();

        let mut field = VectorField::zeros(unit_geometry([3, 3, 1]));
        field.set_vector([0, 0, 0], [0.0, 0.0, 2.0]);
        field.set_vector([2, 0, 0], [0.0, 0.0, -1.5]);
        field.set_vector([0, 2, 0], [4.0, 0.0, 0.0]);
        let displacement = temp_dir.path().join("disp.nii");
        write_vector_field(&displacement, &field, &WriteOptions::default()).unwrap();

        let output = temp_dir.path().join("values.txt");
        run(&Cli {
            polygons,
            displacement,
            output: output.clone(),
        })
        .unwrap();

        let text = std::fs::read_to_string(output).unwrap();
        assert_eq!(text, "2.000000\n-1.500000\n4.000000\n");
    }

    #[test]
    fn test_missing_inputs() {
        let temp_dir = TempDir::new().unwrap();
        let cli = Cli {
            polygons: temp_dir.path().join("absent.obj"),
            displacement: temp_dir.path().join("absent.nii"),
            output: temp_dir.path().join("out.txt"),
        };
        assert!(matches!(run(&cli), Err(ToolError::MissingInput { .. })));
    }
}
