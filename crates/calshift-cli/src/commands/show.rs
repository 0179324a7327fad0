//! Show command implementation.
//!
//! Resolves one map and prints its decoded values from both images next to
//! each other, so a relocation can be checked by eye.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use calshift_core::{
    AxisDef, CancelToken, LogProgress, MapEntity, ScanConfig, ScanPipeline, format_address,
    format_value,
};
use clap::Args;
use owo_colors::OwoColorize;

use crate::commands::scan::load_inputs;
use crate::config::load_scan_config;

const PRECISION: usize = 2;

#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Map definition document (JSON)
    #[arg(short, long)]
    pub definitions: PathBuf,
    /// Image the definitions were written for
    #[arg(short, long)]
    pub source: PathBuf,
    /// Image to relocate the definitions into
    #[arg(short, long)]
    pub target: PathBuf,
    /// Map name
    #[arg(short, long)]
    pub name: String,
    /// Run the fuzzy pass
    #[arg(long)]
    pub fuzzy: bool,
    /// Scan configuration file (TOML)
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

/// Render decoded cells as rows of right-aligned columns
fn format_grid(values: &[f64], cols: usize, integral: bool) -> Vec<String> {
    let cells: Vec<String> = values
        .iter()
        .map(|&v| format_value(v, PRECISION, integral))
        .collect();
    let width = cells.iter().map(String::len).max().unwrap_or(0);
    cells
        .chunks(cols.max(1))
        .map(|row| {
            row.iter()
                .map(|c| format!("{:>width$}", c))
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect()
}

fn print_axis(
    label: &str,
    axis: &AxisDef,
    target_addr: Option<usize>,
    source: &[u8],
    target: &[u8],
) {
    if !axis.is_defined() {
        return;
    }
    let integral = axis.equation.is_identity();
    let values = MapEntity::axis_values(axis, source, axis.address);
    println!(
        "{} axis source {}: {}",
        label,
        format_address(axis.address),
        format_grid(&values, values.len(), integral).join(" ")
    );
    match target_addr {
        Some(addr) => {
            let values = MapEntity::axis_values(axis, target, addr);
            println!(
                "{} axis target {}: {}",
                label,
                format_address(addr),
                format_grid(&values, values.len(), integral).join(" ")
            );
        }
        None => println!("{} axis target: {}", label, "not found".red()),
    }
}

/// Run the show command
pub fn run(args: ShowArgs) -> Result<()> {
    let mut builder = ScanConfig::builder().base(load_scan_config(args.config.as_deref())?);
    if args.fuzzy {
        builder = builder.fuzzy(true);
    }
    let pipeline = ScanPipeline::new(builder.build());

    let mut inputs = load_inputs(&args.definitions, &args.source, &args.target)?;
    if inputs.registry.get(&args.name).is_none() {
        bail!("No map named '{}' in {}", args.name, args.definitions.display());
    }

    pipeline.run(
        &mut inputs.registry,
        &inputs.source,
        &inputs.target,
        &CancelToken::new(),
        &LogProgress::default(),
    );
    let entity = inputs
        .registry
        .get(&args.name)
        .context("Map disappeared from registry")?;

    println!(
        "{} [{} {}, {}x{}, {}]",
        entity.name.bold(),
        entity.z.element.width,
        if entity.z.element.signed { "signed" } else { "unsigned" },
        entity.z.rows,
        entity.z.cols,
        entity.z.equation
    );
    println!(
        "Match: {} ({}%, {} candidates)",
        entity.match_type(),
        entity.resolution.match_percent,
        entity.resolution.match_count
    );
    println!();

    let integral = entity.z.equation.is_identity();
    println!("Source {}:", format_address(entity.z.address));
    let values = entity.z_values(&inputs.source, entity.z.address);
    for line in format_grid(&values, entity.z.cols, integral) {
        println!("  {}", line);
    }

    match entity.target_addr() {
        Some(addr) => {
            println!("Target {}:", format_address(addr));
            let values = entity.z_values(&inputs.target, addr);
            for line in format_grid(&values, entity.z.cols, integral) {
                println!("  {}", line);
            }
        }
        None => println!("Target: {}", "not resolved".red()),
    }
    println!();

    let (source, target) = (&inputs.source, &inputs.target);
    print_axis("X", &entity.x, entity.x_resolution.target_addr, source, target);
    print_axis("Y", &entity.y, entity.y_resolution.target_addr, source, target);

    Ok(())
}
