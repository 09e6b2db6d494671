//! Tests for label volumes from log Jacobians

#[cfg(test)]
mod tests {
    use crate::{grid_from, write_grid};
    use ndarray::Array3;
    use neurovol::spatial::grid::{GridGeometry, VoxelGrid};
    use neurovol::tools::jacobians::{Cli, run};
    use tempfile::TempDir;

    fn report(cli: &Cli) -> String {
        let mut out = Vec::new();
        run(cli, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    // Tests a zero log Jacobian reports one voxel volume
    #[test]
    fn test_single_voxel() {
        let temp_dir = TempDir::new().unwrap();
        let structures = write_grid(temp_dir.path(), "labels.nii", &grid_from([1, 1, 1], vec![1.0]));
        let jacobians = write_grid(temp_dir.path(), "jacobians.nii", &grid_from([1, 1, 1], vec![0.0]));

        assert_eq!(report(&Cli { structures, jacobians }), "1, 1.000000\n");
    }

    // Tests the voxel volume comes from the label header
    // Verified by using a unit voxel volume
    #[test]
    fn test_voxel_volume_from_labels() {
        let temp_dir = TempDir::new().unwrap();
        let geometry = GridGeometry::axis_aligned([1, 1, 2], [0.0; 3], [2.0, 2.0, 0.5]).unwrap();
        let labels = VoxelGrid::new(geometry, Array3::from_elem((1, 1, 2), 3.0)).unwrap();
        let structures = write_grid(temp_dir.path(), "labels.nii", &labels);
        let jacobians = write_grid(
            temp_dir.path(),
            "jacobians.nii",
            &grid_from([1, 1, 2], vec![0.0, 0.0]),
        );

        assert_eq!(report(&Cli { structures, jacobians }), "3, 4.000000\n");
    }
}
