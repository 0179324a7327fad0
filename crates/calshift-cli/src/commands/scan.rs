//! Scan command implementation.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use calshift_core::{
    AxisMatchType, DefinitionDocument, LogProgress, MapEntity, MapRegistry, MatchType, ScanConfig,
    ScanOutcome, ScanPipeline, ScanReport, ScanSummary, ScanWorker, SequentialPolicy,
    WriteOptions, format_address, load_definitions, relocate_document, save_definitions,
};
use clap::Args;
use owo_colors::OwoColorize;
use tracing::{info, warn};

use crate::config::load_scan_config;

#[derive(Args, Debug)]
pub struct ScanArgs {
    /// Map definition document (JSON)
    #[arg(short, long)]
    pub definitions: PathBuf,
    /// Image the definitions were written for
    #[arg(short, long)]
    pub source: PathBuf,
    /// Image to relocate the definitions into
    #[arg(short, long)]
    pub target: PathBuf,
    /// Write the relocated definition document here
    #[arg(short, long)]
    pub output: Option<PathBuf>,
    /// Write a JSON scan report here
    #[arg(long)]
    pub report: Option<PathBuf>,
    /// Run the fuzzy pass for maps without an exact match
    #[arg(long)]
    pub fuzzy: bool,
    /// Leave maps that needed surrounding context out of the output
    #[arg(long)]
    pub exclude_deep: bool,
    /// Only pair identical maps by address order in groups of at least N
    #[arg(long, value_name = "N")]
    pub strict_sequential: Option<usize>,
    /// Scan configuration file (TOML)
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// List every map, not only the unresolved ones
    #[arg(short, long)]
    pub verbose: bool,
}

/// Loaded inputs shared by the scan and show commands
pub struct ScanInputs {
    pub document: DefinitionDocument,
    pub registry: MapRegistry,
    pub source: Arc<[u8]>,
    pub target: Arc<[u8]>,
}

pub fn read_image(path: &Path) -> Result<Arc<[u8]>> {
    let data = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    if data.is_empty() {
        bail!("{} is empty", path.display());
    }
    info!("Loaded {} ({} bytes)", path.display(), data.len());
    Ok(data.into())
}

pub fn load_inputs(definitions: &Path, source: &Path, target: &Path) -> Result<ScanInputs> {
    let document = load_definitions(definitions)
        .with_context(|| format!("Failed to load definitions {}", definitions.display()))?;
    let registry = MapRegistry::from_document(&document)?;
    info!("Loaded {} map definitions", registry.len());

    Ok(ScanInputs {
        document,
        registry,
        source: read_image(source)?,
        target: read_image(target)?,
    })
}

fn build_config(args: &ScanArgs) -> Result<ScanConfig> {
    let mut builder = ScanConfig::builder().base(load_scan_config(args.config.as_deref())?);
    if args.fuzzy {
        builder = builder.fuzzy(true);
    }
    if let Some(min_group_size) = args.strict_sequential {
        builder = builder.sequential(SequentialPolicy::Strict { min_group_size });
    }
    Ok(builder.build())
}

/// Run the scan command
pub fn run(args: ScanArgs) -> Result<()> {
    let config = build_config(&args)?;
    let inputs = load_inputs(&args.definitions, &args.source, &args.target)?;

    let worker = ScanWorker::spawn(
        ScanPipeline::new(config),
        inputs.registry,
        Arc::clone(&inputs.source),
        Arc::clone(&inputs.target),
        LogProgress::default(),
    )?;

    let cancel = worker.cancel_token();
    ctrlc::set_handler(move || {
        info!("Received interrupt, cancelling scan...");
        cancel.cancel();
    })?;

    let result = worker.join();
    let summary = match result.outcome {
        ScanOutcome::Completed(summary) => summary,
        ScanOutcome::Cancelled { scanned } => {
            bail!("Scan cancelled after {} maps, nothing written", scanned)
        }
    };

    print_maps(&result.registry, args.verbose);
    print_summary(&summary);

    if let Some(path) = &args.report {
        ScanReport::from_registry(&result.registry, inputs.source.len(), inputs.target.len())
            .save(path)
            .with_context(|| format!("Failed to write report {}", path.display()))?;
        println!("Report written to {}", path.display());
    }

    if let Some(path) = &args.output {
        let options = WriteOptions {
            exclude_deep: args.exclude_deep,
        };
        let relocated = relocate_document(&inputs.document, &result.registry, options);
        save_definitions(path, &relocated)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        println!(
            "Relocated document with {} maps written to {}",
            relocated.maps.len(),
            path.display()
        );
    } else if summary.found() > 0 {
        warn!("No --output given, relocated document not written");
    }

    Ok(())
}

fn colored_type(match_type: MatchType) -> String {
    let label: &'static str = match_type.into();
    match match_type {
        MatchType::Unique => label.green().to_string(),
        MatchType::Sequential => label.yellow().to_string(),
        MatchType::Fuzzy => label.cyan().to_string(),
        MatchType::Ambiguous => label.magenta().to_string(),
        MatchType::None => label.red().to_string(),
    }
}

fn axis_note(axis: &str, match_type: AxisMatchType) -> Option<String> {
    match match_type {
        AxisMatchType::Offset => Some(format!("{} offset", axis)),
        AxisMatchType::Guess => Some(format!("{} guessed", axis).yellow().to_string()),
        AxisMatchType::Unique | AxisMatchType::None => None,
    }
}

fn describe(entity: &MapEntity) -> String {
    let target = entity
        .target_addr()
        .map_or_else(|| "-".to_string(), format_address);
    let mut line = format!(
        "{:<11} {:<32} {:>9} -> {:<9}",
        colored_type(entity.match_type()),
        entity.name,
        format_address(entity.z.address),
        target
    );

    let mut notes = Vec::new();
    if entity.match_type() == MatchType::Ambiguous {
        notes.push(format!("{} candidates", entity.resolution.match_count));
    }
    if let Some(deep) = entity.resolution.deep {
        notes.push(format!("context {}/{}", deep.left, deep.right));
    }
    if entity.match_type() == MatchType::Fuzzy {
        notes.push(format!("{}%", entity.resolution.match_percent));
    }
    notes.extend(axis_note("x", entity.x_resolution.match_type));
    notes.extend(axis_note("y", entity.y_resolution.match_type));
    if !notes.is_empty() {
        line.push_str(&format!("  ({})", notes.join(", ")));
    }
    line
}

fn print_maps(registry: &MapRegistry, verbose: bool) {
    for entity in registry.iter() {
        if verbose || !entity.match_type().is_resolved() {
            println!("{}", describe(entity));
        }
    }
}

fn print_summary(summary: &ScanSummary) {
    println!();
    println!(
        "{} of {} maps found",
        summary.found().bold(),
        summary.total
    );
    println!("  {:<11} {}", "UNIQUE".green(), summary.unique);
    println!("  {:<11} {}", "SEQUENTIAL".yellow(), summary.sequential);
    println!("  {:<11} {}", "FUZZY".cyan(), summary.fuzzy);
    println!("  {:<11} {}", "AMBIGUOUS".magenta(), summary.ambiguous);
    println!("  {:<11} {}", "NONE".red(), summary.none);
    if summary.deep > 0 {
        println!("  ({} resolved with surrounding context)", summary.deep);
    }
}
