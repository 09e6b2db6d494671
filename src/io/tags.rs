//! MNI tag point files (`.tag`)
//!
//! ```text
//! MNI Tag Point File
//! Volumes = 2;
//! % comment
//!
//! Points =
//!  x1 y1 z1 x2 y2 z2 [weight structure_id patient_id] ["label"]
//!  ...;
//! ```
//!
//! One tag per line; the point list ends with `;`. Files with a single
//! volume carry three coordinates per tag.

use crate::io::error::{Result, WithPath, parse_error};
use log::debug;
use nalgebra::Point3;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

const FILE_HEADER: &str = "MNI Tag Point File";

/// One tag: a point in the first volume, optionally its partner in the second
#[derive(Debug, Clone, PartialEq)]
pub struct TagPoint {
    /// World position in volume 1
    pub first: Point3<f64>,
    /// World position in volume 2 (two-volume files only)
    pub second: Option<Point3<f64>>,
    /// Per-tag weight
    pub weight: Option<f64>,
    /// Anatomical structure id
    pub structure_id: Option<i32>,
    /// Patient id
    pub patient_id: Option<i32>,
    /// Free-text label
    pub label: Option<String>,
}

impl TagPoint {
    /// Two-volume tag without any extra attributes
    pub const fn pair(first: Point3<f64>, second: Point3<f64>) -> Self {
        Self {
            first,
            second: Some(second),
            weight: None,
            structure_id: None,
            patient_id: None,
            label: None,
        }
    }
}

/// Contents of a tag file
#[derive(Debug, Clone, PartialEq)]
pub struct TagSet {
    /// Number of volumes the tags refer to (1 or 2)
    pub volumes: usize,
    /// Comment lines with the leading `%` removed
    pub comments: Vec<String>,
    /// Tags in file order
    pub points: Vec<TagPoint>,
}

impl TagSet {
    /// Two-volume tag set built from point pairs
    pub fn from_pairs(comment: &str, pairs: impl IntoIterator<Item = (Point3<f64>, Point3<f64>)>) -> Self {
        Self {
            volumes: 2,
            comments: comment.lines().map(str::to_string).collect(),
            points: pairs
                .into_iter()
                .map(|(first, second)| TagPoint::pair(first, second))
                .collect(),
        }
    }

    /// Number of tags
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the set holds no tags
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Split a two-volume set into its volume-1 and volume-2 point lists
    ///
    /// # Errors
    ///
    /// Returns a parse error naming `path` unless the set has two volumes
    pub fn point_lists(&self, path: &Path) -> Result<(Vec<Point3<f64>>, Vec<Point3<f64>>)> {
        if self.volumes != 2 {
            return Err(parse_error(
                path,
                &format!("Tag file must contain two volumes (found {})", self.volumes),
            ));
        }
        let mut first = Vec::with_capacity(self.points.len());
        let mut second = Vec::with_capacity(self.points.len());
        for tag in &self.points {
            let Some(partner) = tag.second else {
                return Err(parse_error(path, &"tag without a second-volume point"));
            };
            first.push(tag.first);
            second.push(partner);
        }
        Ok((first, second))
    }
}

/// Read a tag file
///
/// # Errors
///
/// Returns an error if the file cannot be read or is malformed
pub fn read_tag_file(path: &Path) -> Result<TagSet> {
    let text = fs::read_to_string(path).with_path(path, "read tags")?;
    let mut lines = text.lines();
    if lines.next().map(str::trim) != Some(FILE_HEADER) {
        return Err(parse_error(path, &format!("missing '{FILE_HEADER}' header")));
    }

    let mut comments = Vec::new();
    let mut volumes = None;
    let mut points = Vec::new();
    let mut in_points = false;
    let mut terminated = false;

    for line in lines {
        let trimmed = line.trim();
        if let Some(comment) = trimmed.strip_prefix('%') {
            comments.push(comment.to_string());
            continue;
        }
        if trimmed.is_empty() || terminated {
            continue;
        }

        if !in_points {
            let Some((key, value)) = trimmed.split_once('=') else {
                return Err(parse_error(path, &format!("unexpected line '{trimmed}'")));
            };
            match key.trim() {
                "Volumes" => {
                    let value = value.trim().trim_end_matches(';').trim();
                    volumes = Some(value.parse::<usize>().map_err(|e| {
                        parse_error(path, &format!("bad volume count '{value}': {e}"))
                    })?);
                }
                "Points" => {
                    in_points = true;
                    let rest = value.trim();
                    if !rest.is_empty() {
                        terminated = parse_point_line(path, rest, volumes, &mut points)?;
                    }
                }
                other => debug!("ignoring tag file field '{other}'"),
            }
            continue;
        }

        terminated = parse_point_line(path, trimmed, volumes, &mut points)?;
    }

    let Some(volumes) = volumes else {
        return Err(parse_error(path, &"missing 'Volumes' entry"));
    };
    if !in_points {
        return Err(parse_error(path, &"missing 'Points' entry"));
    }
    debug!("read {} tag(s) from {}", points.len(), path.display());
    Ok(TagSet {
        volumes,
        comments,
        points,
    })
}

/// Write a tag file
///
/// # Errors
///
/// Returns an error if the file cannot be written
pub fn write_tag_file(path: &Path, tags: &TagSet) -> Result<()> {
    let file = File::create(path).with_path(path, "create tags")?;
    let mut out = BufWriter::new(file);
    write_tags(&mut out, tags).with_path(path, "write tags")
}

fn write_tags<W: Write>(out: &mut W, tags: &TagSet) -> std::io::Result<()> {
    writeln!(out, "{FILE_HEADER}")?;
    writeln!(out, "Volumes = {};", tags.volumes)?;
    for comment in &tags.comments {
        writeln!(out, "%{comment}")?;
    }
    writeln!(out)?;
    write!(out, "Points =")?;

    for tag in &tags.points {
        write!(out, "\n {} {} {}", tag.first.x, tag.first.y, tag.first.z)?;
        if let Some(second) = tag.second.filter(|_| tags.volumes == 2) {
            write!(out, " {} {} {}", second.x, second.y, second.z)?;
        }
        if let Some(weight) = tag.weight {
            write!(
                out,
                " {weight} {} {}",
                tag.structure_id.unwrap_or(-1),
                tag.patient_id.unwrap_or(-1)
            )?;
        }
        if let Some(label) = &tag.label {
            write!(out, " \"{label}\"")?;
        }
    }
    writeln!(out, ";")?;
    out.flush()
}

// Returns whether the line closed the point list
fn parse_point_line(
    path: &Path,
    line: &str,
    volumes: Option<usize>,
    points: &mut Vec<TagPoint>,
) -> Result<bool> {
    let (content, terminated) = match line.strip_suffix(';') {
        Some(content) => (content.trim(), true),
        None => (line, false),
    };
    if content.is_empty() {
        return Ok(terminated);
    }
    let Some(volumes) = volumes else {
        return Err(parse_error(path, &"'Points' appears before 'Volumes'"));
    };

    let tokens = tokenize(content);
    let coordinates = 3 * volumes;
    let mut numbers = Vec::with_capacity(coordinates + 3);
    let mut label = None;
    for token in tokens {
        match token {
            Token::Quoted(text) => label = Some(text),
            Token::Bare(text) => match text.parse::<f64>() {
                Ok(value) => numbers.push(value),
                Err(_) if numbers.len() >= coordinates => label = Some(text),
                Err(e) => {
                    return Err(parse_error(path, &format!("bad coordinate '{text}': {e}")));
                }
            },
        }
    }

    if numbers.len() < coordinates {
        return Err(parse_error(
            path,
            &format!("tag needs {coordinates} coordinates, found {}", numbers.len()),
        ));
    }
    let number = |i: usize| numbers.get(i).copied().unwrap_or(0.0);
    let first = Point3::new(number(0), number(1), number(2));
    let second = (volumes >= 2).then(|| Point3::new(number(3), number(4), number(5)));
    let extras = numbers.len() - coordinates;
    let extra = |i: usize| (extras > i).then(|| number(coordinates + i));

    points.push(TagPoint {
        first,
        second,
        weight: extra(0),
        structure_id: extra(1).map(|v| v as i32),
        patient_id: extra(2).map(|v| v as i32),
        label,
    });
    Ok(terminated)
}

enum Token {
    Bare(String),
    Quoted(String),
}

fn tokenize(line: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut chars = line.chars().peekable();
    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
        } else if c == '"' {
            chars.next();
            let text: String = chars.by_ref().take_while(|&ch| ch != '"').collect();
            tokens.push(Token::Quoted(text));
        } else {
            let mut text = String::new();
            while let Some(&ch) = chars.peek() {
                if ch.is_whitespace() || ch == '"' {
                    break;
                }
                text.push(ch);
                chars.next();
            }
            tokens.push(Token::Bare(text));
        }
    }
    tokens
}
