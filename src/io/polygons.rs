//! BIC ASCII polygon objects (`.obj`)
//!
//! A polygon object is a whitespace-separated token stream:
//!
//! ```text
//! P ambient diffuse specular exponent opacity n_points
//! <n_points x y z>
//! <n_points nx ny nz>
//! n_items
//! colour_flag <colours>
//! <n_items end indices>
//! <vertex indices>
//! ```
//!
//! The colour flag selects one RGBA colour (0), one per item (1) or one per
//! vertex (2). Only files holding exactly one polygon object are accepted.

use crate::io::error::{Result, ToolError, WithPath};
use log::debug;
use nalgebra::{Point3, Vector3};
use std::fs;
use std::path::Path;

/// Triangulated or general polygon surface with per-vertex normals
#[derive(Debug, Clone, PartialEq)]
pub struct PolygonMesh {
    /// Vertex positions in world coordinates
    pub points: Vec<Point3<f64>>,
    /// Unit normal per vertex
    pub normals: Vec<Vector3<f64>>,
    /// Exclusive end offset of each polygon in `indices`
    pub end_indices: Vec<usize>,
    /// Vertex indices of all polygons, concatenated
    pub indices: Vec<usize>,
}

impl PolygonMesh {
    /// Number of vertices
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the mesh has no vertices
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Vertex index lists of each polygon
    pub fn polygons(&self) -> impl Iterator<Item = &[usize]> + '_ {
        let starts = std::iter::once(0).chain(self.end_indices.iter().copied());
        starts
            .zip(self.end_indices.iter().copied())
            .map(|(start, end)| self.indices.get(start..end).unwrap_or(&[]))
    }

    /// Replace the vertex normals with area-weighted averages of face normals
    pub fn compute_normals(&mut self) {
        let mut normals = vec![Vector3::zeros(); self.points.len()];
        for polygon in self.polygons() {
            let face = self.face_normal(polygon);
            for &vertex in polygon {
                if let Some(normal) = normals.get_mut(vertex) {
                    *normal += face;
                }
            }
        }
        for normal in &mut normals {
            let length = normal.norm();
            if length > 0.0 {
                *normal /= length;
            }
        }
        self.normals = normals;
    }

    // Newell's method: the magnitude is twice the polygon area
    fn face_normal(&self, polygon: &[usize]) -> Vector3<f64> {
        let corner = |i: usize| {
            polygon
                .get(i % polygon.len().max(1))
                .and_then(|&v| self.points.get(v))
                .copied()
                .unwrap_or_else(Point3::origin)
        };
        let mut normal = Vector3::zeros();
        for i in 0..polygon.len() {
            let a = corner(i);
            let b = corner(i + 1);
            normal.x += (a.y - b.y) * (a.z + b.z);
            normal.y += (a.z - b.z) * (a.x + b.x);
            normal.z += (a.x - b.x) * (a.y + b.y);
        }
        normal
    }
}

/// Read a single polygon object, computing normals if the file has none
///
/// # Errors
///
/// Returns [`ToolError::InvalidGeometry`] if the file does not hold exactly
/// one well-formed polygon object
pub fn read_polygon_file(path: &Path) -> Result<PolygonMesh> {
    let text = fs::read_to_string(path).with_path(path, "read polygons")?;
    let mut tokens = Tokens {
        path,
        inner: text.split_whitespace(),
    };

    let mut mesh = read_polygon_object(&mut tokens)?;
    if tokens.inner.next().is_some() {
        return Err(geometry_error(path, &"File must contain exactly one polygon object"));
    }

    if mesh.normals.iter().all(|n| n.norm_squared() == 0.0) {
        debug!("{} has no stored normals, computing from faces", path.display());
        mesh.compute_normals();
    }
    Ok(mesh)
}

fn geometry_error(path: &Path, reason: &impl ToString) -> ToolError {
    ToolError::InvalidGeometry {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}

struct Tokens<'a> {
    path: &'a Path,
    inner: std::str::SplitWhitespace<'a>,
}

impl<'a> Tokens<'a> {
    fn next_token(&mut self, what: &str) -> Result<&'a str> {
        self.inner
            .next()
            .ok_or_else(|| geometry_error(self.path, &format!("unexpected end of file reading {what}")))
    }

    fn real(&mut self, what: &str) -> Result<f64> {
        let path = self.path;
        let token = self.next_token(what)?;
        token
            .parse()
            .map_err(|e| geometry_error(path, &format!("bad {what} '{token}': {e}")))
    }

    fn count(&mut self, what: &str) -> Result<usize> {
        let path = self.path;
        let token = self.next_token(what)?;
        token
            .parse()
            .map_err(|e| geometry_error(path, &format!("bad {what} '{token}': {e}")))
    }

    fn point(&mut self, what: &str) -> Result<Point3<f64>> {
        Ok(Point3::new(self.real(what)?, self.real(what)?, self.real(what)?))
    }
}

fn read_polygon_object(tokens: &mut Tokens<'_>) -> Result<PolygonMesh> {
    let path = tokens.path;
    let kind = tokens.next_token("object type")?;
    if kind != "P" && kind != "p" {
        return Err(geometry_error(
            path,
            &format!("expected a polygon object, found object type '{kind}'"),
        ));
    }

    // ambient, diffuse, specular, specular exponent, opacity
    for _ in 0..5 {
        tokens.real("surface property")?;
    }
    let n_points = tokens.count("point count")?;

    let points = (0..n_points)
        .map(|_| tokens.point("vertex"))
        .collect::<Result<Vec<_>>>()?;
    let normals = (0..n_points)
        .map(|_| tokens.point("normal").map(|p| p.coords))
        .collect::<Result<Vec<_>>>()?;

    let n_items = tokens.count("polygon count")?;
    let colours = match tokens.count("colour flag")? {
        0 => 1,
        1 => n_items,
        2 => n_points,
        other => return Err(geometry_error(path, &format!("unknown colour flag {other}"))),
    };
    for _ in 0..colours * 4 {
        tokens.real("colour")?;
    }

    let end_indices = (0..n_items)
        .map(|_| tokens.count("end index"))
        .collect::<Result<Vec<_>>>()?;
    if end_indices.windows(2).any(|w| w.first() > w.get(1)) {
        return Err(geometry_error(path, &"end indices are not increasing"));
    }
    let n_indices = end_indices.last().copied().unwrap_or(0);
    let indices = (0..n_indices)
        .map(|_| tokens.count("vertex index"))
        .collect::<Result<Vec<_>>>()?;
    if let Some(&bad) = indices.iter().find(|&&i| i >= n_points) {
        return Err(geometry_error(
            path,
            &format!("vertex index {bad} out of range for {n_points} points"),
        ));
    }

    Ok(PolygonMesh {
        points,
        normals,
        end_indices,
        indices,
    })
}
