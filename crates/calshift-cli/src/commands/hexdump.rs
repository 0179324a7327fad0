//! Hexdump command implementation.
//!
//! ```text
//! 0x1C4A0: 48 65 6C 6C 6F 20 57 6F  72 6C 64 00 00 00 00 00  |Hello World.....|
//! ```

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};

/// Render `bytes` as hexdump lines, labelled from `base`
pub fn format_lines(bytes: &[u8], base: usize, ascii: bool) -> Vec<String> {
    bytes
        .chunks(16)
        .enumerate()
        .map(|(i, chunk)| {
            let mut line = format!("0x{:05X}: ", base + i * 16);
            for j in 0..16 {
                if j == 8 {
                    line.push(' ');
                }
                match chunk.get(j) {
                    Some(byte) => line.push_str(&format!("{:02X} ", byte)),
                    None => line.push_str("   "),
                }
            }
            if ascii {
                line.push_str(" |");
                for &byte in chunk {
                    line.push(if (0x20..0x7F).contains(&byte) {
                        byte as char
                    } else {
                        '.'
                    });
                }
                for _ in chunk.len()..16 {
                    line.push(' ');
                }
                line.push('|');
            }
            line.trim_end_matches(' ').to_string()
        })
        .collect()
}

/// Run the hexdump command
pub fn run(file: &Path, address: usize, size: usize, ascii: bool) -> Result<()> {
    let data = fs::read(file).with_context(|| format!("Failed to read {}", file.display()))?;
    if address >= data.len() {
        bail!(
            "Address 0x{:X} is past the end of {} (0x{:X} bytes)",
            address,
            file.display(),
            data.len()
        );
    }
    let end = address.saturating_add(size).min(data.len());

    println!("Hexdump at 0x{:X} ({} bytes):", address, end - address);
    println!();
    for line in format_lines(&data[address..end], address, ascii) {
        println!("{}", line);
    }

    Ok(())
}
