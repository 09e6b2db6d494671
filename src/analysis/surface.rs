//! Projection of a displacement field onto surface normals

use crate::io::polygons::PolygonMesh;
use crate::math::interpolation::Interpolation;
use crate::spatial::grid::VectorField;
use std::io::Write;

/// Dot product of each vertex normal with the displacement at that vertex
///
/// The field is sampled by nearest neighbour; vertices outside it see a zero
/// displacement.
pub fn normal_dot_products(mesh: &PolygonMesh, field: &VectorField) -> Vec<f64> {
    mesh.points
        .iter()
        .zip(mesh.normals.iter())
        .map(|(point, normal)| {
            let [dx, dy, dz] = field.sample_world(point, Interpolation::NearestNeighbour);
            normal.z.mul_add(dz, normal.y.mul_add(dy, normal.x * dx))
        })
        .collect()
}

/// Write one value per line
///
/// # Errors
///
/// Returns an error if writing to `out` fails
pub fn write_values<W: Write>(values: &[f64], out: &mut W) -> std::io::Result<()> {
    for value in values {
        writeln!(out, "{value:.6}")?;
    }
    out.flush()
}
