//! Search command implementation.

use std::path::PathBuf;

use anyhow::{Result, bail};
use calshift_core::scan::constants::{DEFAULT_FUZZY_THRESHOLD, DEFAULT_MAX_MATCHES};
use calshift_core::scan::utils::format_hex_bytes;
use calshift_core::scan::similarity;
use calshift_core::{PatternScanner, find_fuzzy_match};
use clap::Args;

use crate::commands::hex_utils::{parse_hex_address, parse_pattern};
use crate::commands::scan::read_image;

#[derive(Args, Debug)]
pub struct SearchArgs {
    /// Image file
    #[arg(short, long)]
    pub file: PathBuf,
    /// Byte pattern, e.g. "00 04 ?? 0A"
    #[arg(short, long)]
    pub pattern: String,
    /// Per-byte tolerance; enables approximate matching
    #[arg(long)]
    pub tolerance: Option<u8>,
    /// Share of bytes within tolerance (0.0 - 1.0)
    #[arg(long)]
    pub threshold: Option<f64>,
    /// Start offset (hex)
    #[arg(long)]
    pub start: Option<String>,
    /// End offset (hex, exclusive)
    #[arg(long)]
    pub end: Option<String>,
    /// Maximum results
    #[arg(short, long, default_value_t = DEFAULT_MAX_MATCHES)]
    pub limit: usize,
}

/// Exact search where `mask[i]` marks byte `i` as a wildcard
fn find_masked(
    data: &[u8],
    start: usize,
    end: usize,
    bytes: &[u8],
    mask: &[bool],
    limit: usize,
) -> Vec<usize> {
    let end = end.min(data.len());
    if start >= end {
        return Vec::new();
    }
    if !mask.contains(&true) {
        return PatternScanner::new(start, limit).find_all(&data[..end], bytes);
    }

    let Some(last) = end.checked_sub(bytes.len()) else {
        return Vec::new();
    };
    let mut found = Vec::new();
    for pos in start..=last {
        let window = &data[pos..pos + bytes.len()];
        let hit = window
            .iter()
            .zip(bytes.iter().zip(mask))
            .all(|(&d, (&b, &wild))| wild || d == b);
        if hit {
            found.push(pos);
            if found.len() >= limit {
                break;
            }
        }
    }
    found
}

/// Every approximate match, each search resuming one byte after the last hit
fn find_fuzzy(
    data: &[u8],
    start: usize,
    end: usize,
    bytes: &[u8],
    tolerance: u8,
    threshold: f64,
    limit: usize,
) -> Vec<usize> {
    let mut found = Vec::new();
    let mut from = start;
    while found.len() < limit {
        match find_fuzzy_match(data, from, end, bytes, tolerance, threshold) {
            Some(pos) => {
                found.push(pos);
                from = pos + 1;
            }
            None => break,
        }
    }
    found
}

/// Run the search command
pub fn run(args: SearchArgs) -> Result<()> {
    let data = read_image(&args.file)?;
    let (bytes, mask) = parse_pattern(&args.pattern)?;
    let start = args.start.as_deref().map(parse_hex_address).transpose()?.unwrap_or(0);
    let end = args
        .end
        .as_deref()
        .map(parse_hex_address)
        .transpose()?
        .unwrap_or(data.len());

    println!(
        "Searching {} for {} ({} bytes) in 0x{:X} - 0x{:X}",
        args.file.display(),
        args.pattern,
        bytes.len(),
        start,
        end
    );

    let found = match args.tolerance {
        Some(tolerance) => {
            if mask.contains(&true) {
                bail!("Wildcards cannot be combined with --tolerance");
            }
            let threshold = args
                .threshold
                .unwrap_or(DEFAULT_FUZZY_THRESHOLD)
                .clamp(0.0, 1.0);
            find_fuzzy(&data, start, end, &bytes, tolerance, threshold, args.limit)
        }
        None => find_masked(&data, start, end, &bytes, &mask, args.limit),
    };

    println!();
    for (i, &pos) in found.iter().enumerate() {
        let window = &data[pos..pos + bytes.len()];
        match args.tolerance {
            Some(tolerance) => println!(
                "[{}] 0x{:X}  {}  ({}%)",
                i + 1,
                pos,
                format_hex_bytes(window),
                similarity(window, &bytes, tolerance)
            ),
            None => println!("[{}] 0x{:X}  {}", i + 1, pos, format_hex_bytes(window)),
        }
    }

    println!();
    println!("Found {} result(s)", found.len());
    if found.len() >= args.limit {
        println!("(limit reached, use --limit to increase)");
    }

    Ok(())
}
