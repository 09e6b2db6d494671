//! Displacement along surface normals at every mesh vertex

use crate::analysis::surface::{normal_dot_products, write_values};
use crate::io::cli::{ToolCommand, ensure_input_exists};
use crate::io::error::{Result, WithPath};
use crate::io::polygons::read_polygon_file;
use crate::io::volume::read_vector_field;
use clap::Parser;
use log::info;
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "object_volume_dot_product", version)]
#[command(
    about = "Dot each vertex normal of a surface with the displacement sampled at that vertex"
)]
/// Command-line arguments for `object_volume_dot_product`
pub struct Cli {
    /// Surface with exactly one polygon object
    #[arg(value_name = "POLYHEDRA.OBJ")]
    pub polygons: PathBuf,

    /// Displacement field volume
    #[arg(value_name = "DISPLACEMENT")]
    pub displacement: PathBuf,

    /// Text file receiving one value per vertex
    #[arg(value_name = "OUTPUT.TXT")]
    pub output: PathBuf,
}

impl ToolCommand for Cli {}

/// Run the tool
///
/// # Errors
///
/// Returns an error if the surface or field cannot be read or the output
/// cannot be written
pub fn run(cli: &Cli) -> Result<()> {
    ensure_input_exists(&cli.polygons)?;
    ensure_input_exists(&cli.displacement)?;

    let mesh = read_polygon_file(&cli.polygons)?;
    let field = read_vector_field(&cli.displacement)?;
    let values = normal_dot_products(&mesh, &field);
    info!("projected displacements at {} vertices", values.len());

    let file = File::create(&cli.output).with_path(&cli.output, "create output")?;
    let mut out = BufWriter::new(file);
    write_values(&values, &mut out).with_path(&cli.output, "write output")
}
