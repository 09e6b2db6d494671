//! Tests for writing transform displacement volumes

#[cfg(test)]
mod tests {
    use crate::{grid_from, write_grid};
    use clap::Parser;
    use nalgebra::{Matrix4, Vector3};
    use neurovol::ToolError;
    use neurovol::io::volume::{OutputType, read_vector_field};
    use neurovol::io::xfm::write_transform_file;
    use neurovol::tools::displacement::{Cli, Config, run};
    use neurovol::transform::general::{GeneralTransform, LinearTransform, TransformKind};
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    fn inputs(dir: &Path, transform: &GeneralTransform) -> (PathBuf, PathBuf) {
        let reference = write_grid(dir, "reference.nii", &grid_from([2, 3, 4], vec![0.0; 24]));
        let xfm = dir.join("transform.xfm");
        write_transform_file(&xfm, transform, "").unwrap();
        (reference, xfm)
    }

    fn parse(args: &[&Path]) -> Cli {
        let mut argv = vec![Path::new("minc_displacement")];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    // Tests the identity transform writes a zero float field
    #[test]
    fn test_identity_float_field() {
        let temp_dir = TempDir::new().unwrap();
        let (reference, xfm) = inputs(temp_dir.path(), &GeneralTransform::identity());
        let output = temp_dir.path().join("disp.nii");

        let mut cli = parse(&[&reference, &xfm, &output]);
        cli.output_type.float = true;
        run(cli).unwrap();

        let field = read_vector_field(&output).unwrap();
        assert_eq!(field.geometry.sizes, [2, 3, 4]);
        assert!(field.data.iter().all(|&v| v == 0.0));
    }

    // Tests short output stays within quantisation of the true shift
    #[test]
    fn test_translation_short_field() {
        let temp_dir = TempDir::new().unwrap();
        let shift = Matrix4::new_translation(&Vector3::new(3.0, -1.0, 0.5));
        let transform = GeneralTransform::single(TransformKind::Linear(LinearTransform::new(shift).unwrap()));
        let (reference, xfm) = inputs(temp_dir.path(), &transform);
        let output = temp_dir.path().join("disp.nii");

        run(parse(&[&reference, &xfm, &output])).unwrap();

        let field = read_vector_field(&output).unwrap();
        let step = 200.0 / 65535.0;
        let vector = field.vector_at([1, 2, 3]).unwrap();
        assert!((vector[0] - 3.0).abs() <= step);
        assert!((vector[1] + 1.0).abs() <= step);
        assert!((vector[2] - 0.5).abs() <= step);
    }

    // Tests existing outputs need -clobber
    #[test]
    fn test_clobber() {
        let temp_dir = TempDir::new().unwrap();
        let (reference, xfm) = inputs(temp_dir.path(), &GeneralTransform::identity());
        let output = temp_dir.path().join("disp.nii");
        std::fs::write(&output, b"old").unwrap();

        let cli = parse(&[&reference, &xfm, &output]);
        assert!(matches!(Config::from_cli(cli), Err(ToolError::OutputExists { .. })));

        let cli = parse(&[Path::new("--clobber"), &reference, &xfm, &output]);
        assert!(run(cli).is_ok());
    }

    // Tests write options follow the selected sample type
    #[test]
    fn test_write_options() {
        let temp_dir = TempDir::new().unwrap();
        let (reference, xfm) = inputs(temp_dir.path(), &GeneralTransform::identity());
        let output = temp_dir.path().join("disp.nii");

        let config = Config::from_cli(parse(&[&reference, &xfm, &output])).unwrap();
        assert_eq!(config.output_type, OutputType::Short);
        assert_eq!(config.write_options().real_range, Some((-100.0, 100.0)));

        let config = Config::from_cli(parse(&[Path::new("--double"), &reference, &xfm, &output])).unwrap();
        assert_eq!(config.output_type, OutputType::Double);
        assert_eq!(config.write_options().real_range, None);
    }

    #[test]
    fn test_conflicting_types_rejected() {
        assert!(Cli::try_parse_from(["minc_displacement", "--byte", "--float", "a", "b", "c"]).is_err());
    }

    #[test]
    fn test_missing_transform() {
        let temp_dir = TempDir::new().unwrap();
        let (reference, _) = inputs(temp_dir.path(), &GeneralTransform::identity());
        let cli = parse(&[&reference, &temp_dir.path().join("absent.xfm"), &temp_dir.path().join("o.nii")]);
        assert!(matches!(run(cli), Err(ToolError::MissingInput { .. })));
    }
}
