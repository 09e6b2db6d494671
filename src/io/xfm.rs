//! MNI transform files (`.xfm`)
//!
//! The format is a line-oriented text file:
//!
//! ```text
//! MNI Transform File
//! % comment lines
//!
//! Transform_Type = Linear;
//! Linear_Transform =
//!  1 0 0 0
//!  0 1 0 0
//!  0 0 1 0;
//! ```
//!
//! A file may concatenate several parts, each starting with
//! `Transform_Type` and optionally flagged with `Invert_Flag = True;`.
//! Thin-plate splines store their control points and an `(n + 4) x 3`
//! coefficient matrix; grid transforms name a displacement volume relative
//! to the transform file.

use crate::io::error::{Result, WithPath, parse_error};
use crate::io::volume::{WriteOptions, read_vector_field, write_vector_field};
use crate::transform::general::{
    GeneralTransform, GridTransform, LinearTransform, Transform, TransformKind,
};
use crate::transform::tps::ThinPlateSpline;
use log::debug;
use nalgebra::{DMatrix, Matrix4, Point3};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

const FILE_HEADER: &str = "MNI Transform File";
const LINEAR_TYPE: &str = "Linear";
const SPLINE_TYPE: &str = "Thin_Plate_Spline_Transform";
const GRID_TYPE: &str = "Grid_Transform";

/// Transform together with the comment block of its file
#[derive(Debug, Clone)]
pub struct TransformFile {
    /// Comment lines with the leading `%` removed
    pub comments: Vec<String>,
    /// Concatenated transform described by the file
    pub transform: GeneralTransform,
}

/// Read a transform file, loading any displacement volumes it references
///
/// # Errors
///
/// Returns an error if the file cannot be read, is malformed, or references
/// a displacement volume that cannot be loaded
pub fn read_transform_file(path: &Path) -> Result<TransformFile> {
    let text = fs::read_to_string(path).with_path(path, "read transform")?;
    let base = path.parent().unwrap_or_else(|| Path::new(""));
    let (comments, statements) = split_document(path, &text)?;

    let mut parts: Vec<Transform> = Vec::new();
    let mut pending: Option<PartBuilder> = None;
    for statement in statements {
        if statement.key == "Transform_Type" {
            if let Some(builder) = pending.take() {
                parts.push(builder.build(path, base)?);
            }
            pending = Some(PartBuilder::new(path, &statement)?);
            continue;
        }
        match pending.as_mut() {
            Some(builder) => builder.accept(path, statement)?,
            None => {
                return Err(parse_error(
                    path,
                    &format!("'{}' appears before any Transform_Type", statement.key),
                ));
            }
        }
    }
    if let Some(builder) = pending.take() {
        parts.push(builder.build(path, base)?);
    }

    debug!("read {} transform part(s) from {}", parts.len(), path.display());
    let transform = GeneralTransform::new(parts)
        .map_err(|e| parse_error(path, &format!("file contains no transforms: {e}")))?;
    Ok(TransformFile {
        comments,
        transform,
    })
}

/// Write `transform` with `comment` as the `%` header block
///
/// Grid parts have their displacement volume written next to the transform
/// file under the part's `volume_path`.
///
/// # Errors
///
/// Returns an error if the transform file or a displacement volume cannot be
/// written
pub fn write_transform_file(path: &Path, transform: &GeneralTransform, comment: &str) -> Result<()> {
    let base = path.parent().unwrap_or_else(|| Path::new(""));
    for part in transform.parts() {
        if let TransformKind::Grid(grid) = &part.kind {
            let volume = resolve(base, &grid.volume_path);
            write_vector_field(&volume, &grid.field, &WriteOptions::default())?;
        }
    }

    let file = File::create(path).with_path(path, "create transform")?;
    let mut out = BufWriter::new(file);
    write_document(&mut out, transform, comment).with_path(path, "write transform")
}

fn write_document<W: Write>(out: &mut W, transform: &GeneralTransform, comment: &str) -> std::io::Result<()> {
    writeln!(out, "{FILE_HEADER}")?;
    for line in comment.lines() {
        writeln!(out, "%{line}")?;
    }

    for part in transform.parts() {
        writeln!(out)?;
        writeln!(out, "Transform_Type = {};", part.kind.name())?;
        if part.inverted {
            writeln!(out, "Invert_Flag = True;")?;
        }
        match &part.kind {
            TransformKind::Linear(linear) => {
                writeln!(out, "Linear_Transform =")?;
                let matrix = linear.matrix();
                write_rows(out, 3, 4, |row, col| matrix.get((row, col)).copied())?;
            }
            TransformKind::ThinPlateSpline(spline) => {
                writeln!(out, "Number_Dimensions = 3;")?;
                writeln!(out, "Points =")?;
                let points = spline.points();
                write_rows(out, points.len(), 3, |row, col| {
                    points.get(row).and_then(|p| p.coords.get(col)).copied()
                })?;
                writeln!(out, "Displacements =")?;
                let coefficients = spline.coefficients();
                write_rows(out, coefficients.nrows(), 3, |row, col| {
                    coefficients.get((row, col)).copied()
                })?;
            }
            TransformKind::Grid(grid) => {
                writeln!(out, "Displacement_Volume = {};", grid.volume_path.display())?;
            }
        }
    }
    out.flush()
}

// One space-indented row per line, the last one closed by `;`
fn write_rows<W, F>(out: &mut W, rows: usize, columns: usize, value: F) -> std::io::Result<()>
where
    W: Write,
    F: Fn(usize, usize) -> Option<f64>,
{
    for row in 0..rows {
        let values: Vec<String> = (0..columns)
            .map(|col| format_number(value(row, col).unwrap_or(0.0)))
            .collect();
        let terminator = if row + 1 == rows { ";" } else { "" };
        writeln!(out, " {}{terminator}", values.join(" "))?;
    }
    Ok(())
}

fn format_number(value: f64) -> String {
    if value == 0.0 { "0".to_string() } else { format!("{value}") }
}

fn resolve(base: &Path, relative: &Path) -> PathBuf {
    if relative.is_absolute() {
        relative.to_path_buf()
    } else {
        base.join(relative)
    }
}

/// `key = values;` entry of the document body
#[derive(Debug)]
struct Statement {
    key: String,
    values: Vec<String>,
}

fn split_document(path: &Path, text: &str) -> Result<(Vec<String>, Vec<Statement>)> {
    let mut lines = text.lines();
    if lines.next().map(str::trim) != Some(FILE_HEADER) {
        return Err(parse_error(path, &format!("missing '{FILE_HEADER}' header")));
    }

    let mut comments = Vec::new();
    let mut body = String::new();
    for line in lines {
        if let Some(comment) = line.trim_start().strip_prefix('%') {
            comments.push(comment.to_string());
        } else {
            body.push_str(line);
            body.push('\n');
        }
    }

    let mut statements = Vec::new();
    for raw in body.split(';') {
        let raw = raw.trim();
        if raw.is_empty() {
            continue;
        }
        let Some((key, values)) = raw.split_once('=') else {
            return Err(parse_error(path, &format!("expected 'key = value' near '{raw}'")));
        };
        statements.push(Statement {
            key: key.trim().to_string(),
            values: values.split_whitespace().map(str::to_string).collect(),
        });
    }
    Ok((comments, statements))
}

fn parse_numbers(path: &Path, statement: &Statement) -> Result<Vec<f64>> {
    statement
        .values
        .iter()
        .map(|token| {
            token.parse::<f64>().map_err(|e| {
                parse_error(path, &format!("bad number '{token}' in {}: {e}", statement.key))
            })
        })
        .collect()
}

fn triples(values: &[f64]) -> Vec<Point3<f64>> {
    values
        .chunks_exact(3)
        .map(|c| {
            let coordinate = |i: usize| c.get(i).copied().unwrap_or(0.0);
            Point3::new(coordinate(0), coordinate(1), coordinate(2))
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PartType {
    Linear,
    Spline,
    Grid,
}

/// Fields collected for one transform part before it is validated
struct PartBuilder {
    part_type: PartType,
    inverted: bool,
    linear: Option<Vec<f64>>,
    points: Option<Vec<f64>>,
    displacements: Option<Vec<f64>>,
    volume: Option<PathBuf>,
}

impl PartBuilder {
    fn new(path: &Path, statement: &Statement) -> Result<Self> {
        let name = statement.values.first().map_or("", String::as_str);
        let part_type = match name {
            LINEAR_TYPE => PartType::Linear,
            SPLINE_TYPE => PartType::Spline,
            GRID_TYPE => PartType::Grid,
            other => {
                return Err(parse_error(path, &format!("unsupported transform type '{other}'")));
            }
        };
        Ok(Self {
            part_type,
            inverted: false,
            linear: None,
            points: None,
            displacements: None,
            volume: None,
        })
    }

    fn accept(&mut self, path: &Path, statement: Statement) -> Result<()> {
        match statement.key.as_str() {
            "Invert_Flag" => {
                self.inverted = statement
                    .values
                    .first()
                    .is_some_and(|v| v.eq_ignore_ascii_case("true"));
            }
            "Linear_Transform" => self.linear = Some(parse_numbers(path, &statement)?),
            "Points" => self.points = Some(parse_numbers(path, &statement)?),
            "Displacements" => self.displacements = Some(parse_numbers(path, &statement)?),
            "Displacement_Volume" => {
                self.volume = Some(PathBuf::from(statement.values.join(" ")));
            }
            "Number_Dimensions" => {
                if statement.values.first().map(String::as_str) != Some("3") {
                    return Err(parse_error(path, &"only 3-dimensional transforms are supported"));
                }
            }
            other => debug!("ignoring transform field '{other}'"),
        }
        Ok(())
    }

    fn build(self, path: &Path, base: &Path) -> Result<Transform> {
        let kind = match self.part_type {
            PartType::Linear => {
                let values = self
                    .linear
                    .ok_or_else(|| parse_error(path, &"linear transform without Linear_Transform"))?;
                if values.len() != 12 {
                    return Err(parse_error(
                        path,
                        &format!("Linear_Transform needs 12 values, found {}", values.len()),
                    ));
                }
                let mut matrix = Matrix4::identity();
                for (index, value) in values.into_iter().enumerate() {
                    if let Some(entry) = matrix.get_mut((index / 4, index % 4)) {
                        *entry = value;
                    }
                }
                TransformKind::Linear(
                    LinearTransform::new(matrix).map_err(|e| parse_error(path, &e))?,
                )
            }
            PartType::Spline => {
                let points = self
                    .points
                    .ok_or_else(|| parse_error(path, &"spline transform without Points"))?;
                let displacements = self
                    .displacements
                    .ok_or_else(|| parse_error(path, &"spline transform without Displacements"))?;
                if points.len() % 3 != 0 || displacements.len() % 3 != 0 {
                    return Err(parse_error(path, &"spline values are not 3-component rows"));
                }
                let rows = displacements.len() / 3;
                let coefficients = DMatrix::from_row_slice(rows, 3, &displacements);
                TransformKind::ThinPlateSpline(
                    ThinPlateSpline::from_parts(triples(&points), coefficients)
                        .map_err(|e| parse_error(path, &e))?,
                )
            }
            PartType::Grid => {
                let volume_path = self
                    .volume
                    .ok_or_else(|| parse_error(path, &"grid transform without Displacement_Volume"))?;
                let field = read_vector_field(&resolve(base, &volume_path))?;
                TransformKind::Grid(GridTransform { field, volume_path })
            }
        };
        Ok(Transform {
            kind,
            inverted: self.inverted,
        })
    }
}
