//! Tests for sampling transforms into tag files

#[cfg(test)]
mod tests {
    use crate::{grid_from, points_close, write_grid};
    use clap::Parser;
    use nalgebra::{Matrix4, Point3, Vector3};
    use neurovol::ToolError;
    use neurovol::io::tags::read_tag_file;
    use neurovol::io::xfm::write_transform_file;
    use neurovol::tools::xfm2tag::{Cli, run};
    use neurovol::transform::general::{GeneralTransform, LinearTransform, TransformKind};
    use std::path::Path;
    use tempfile::TempDir;

    fn shift_xfm(dir: &Path) -> std::path::PathBuf {
        let shift = Matrix4::new_translation(&Vector3::new(0.5, 0.0, -2.0));
        let transform = GeneralTransform::single(TransformKind::Linear(LinearTransform::new(shift).unwrap()));
        let path = dir.join("shift.xfm");
        write_transform_file(&path, &transform, "").unwrap();
        path
    }

    fn parse(args: &[&Path]) -> Cli {
        let mut argv = vec![Path::new("xfm2tag")];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    // Tests every fifth voxel away from the far border is sampled
    #[test]
    fn test_samples_lattice() {
        let temp_dir = TempDir::new().unwrap();
        let reference = write_grid(temp_dir.path(), "ref.nii", &grid_from([11, 6, 6], vec![0.0; 396]));
        let xfm = shift_xfm(temp_dir.path());
        let output = temp_dir.path().join("out.tag");

        run(parse(&[&reference, &xfm, &output])).unwrap();

        let tags = read_tag_file(&output).unwrap();
        assert_eq!(tags.comments, vec!["Tagfile from xfm".to_string()]);
        assert_eq!(tags.len(), 2);
        let (moved, original) = tags.point_lists(&output).unwrap();
        assert_eq!(original, vec![Point3::new(0.0, 0.0, 0.0), Point3::new(5.0, 0.0, 0.0)]);
        assert!(points_close(moved.get(1).unwrap(), &Point3::new(5.5, 0.0, -2.0), 1e-12));
    }

    // Tests the mask drops unselected lattice points
    #[test]
    fn test_mask() {
        let temp_dir = TempDir::new().unwrap();
        let reference = write_grid(temp_dir.path(), "ref.nii", &grid_from([11, 6, 6], vec![0.0; 396]));
        let mut mask_values = vec![0.0; 396];
        // Voxel (5, 0, 0)
        mask_values[5 * 36] = 1.0;
        let mask = write_grid(temp_dir.path(), "mask.nii", &grid_from([11, 6, 6], mask_values));
        let xfm = shift_xfm(temp_dir.path());
        let output = temp_dir.path().join("out.tag");

        run(parse(&[Path::new("--mask"), &mask, &reference, &xfm, &output])).unwrap();

        let tags = read_tag_file(&output).unwrap();
        assert_eq!(tags.len(), 1);
        assert_eq!(tags.points.first().and_then(|t| t.second), Some(Point3::new(5.0, 0.0, 0.0)));
    }

    #[test]
    fn test_mask_shape_checked() {
        let temp_dir = TempDir::new().unwrap();
        let reference = write_grid(temp_dir.path(), "ref.nii", &grid_from([11, 6, 6], vec![0.0; 396]));
        let mask = write_grid(temp_dir.path(), "mask.nii", &grid_from([1, 1, 1], vec![1.0]));
        let xfm = shift_xfm(temp_dir.path());
        let output = temp_dir.path().join("out.tag");

        let result = run(parse(&[Path::new("--mask"), &mask, &reference, &xfm, &output]));
        assert!(matches!(result, Err(ToolError::ShapeMismatch { .. })));
    }

    #[test]
    fn test_existing_output() {
        let temp_dir = TempDir::new().unwrap();
        let reference = write_grid(temp_dir.path(), "ref.nii", &grid_from([1, 1, 1], vec![0.0]));
        let xfm = shift_xfm(temp_dir.path());
        let output = temp_dir.path().join("out.tag");
        std::fs::write(&output, "old").unwrap();

        assert!(matches!(
            run(parse(&[&reference, &xfm, &output])),
            Err(ToolError::OutputExists { .. })
        ));
        assert!(run(parse(&[Path::new("--clobber"), &reference, &xfm, &output])).is_ok());
    }
}
