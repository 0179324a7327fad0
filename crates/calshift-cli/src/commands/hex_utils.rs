//! Hex address and byte pattern parsing.

use anyhow::{Result, anyhow, bail};

/// Parse a hex offset (with or without 0x prefix).
pub fn parse_hex_address(s: &str) -> Result<usize> {
    let digits = s
        .trim()
        .trim_start_matches("0x")
        .trim_start_matches("0X");
    usize::from_str_radix(digits, 16).map_err(|e| anyhow!("Invalid hex address '{}': {}", s, e))
}

/// Parse a byte pattern such as `"0A 0B ?? FF"`.
///
/// Returns the bytes and a mask where `true` marks a wildcard.
pub fn parse_pattern(pattern: &str) -> Result<(Vec<u8>, Vec<bool>)> {
    let mut bytes = Vec::new();
    let mut mask = Vec::new();
    for part in pattern.split_whitespace() {
        if part == "??" {
            bytes.push(0);
            mask.push(true);
        } else {
            let byte =
                u8::from_str_radix(part, 16).map_err(|_| anyhow!("Invalid hex byte: {}", part))?;
            bytes.push(byte);
            mask.push(false);
        }
    }
    if bytes.is_empty() {
        bail!("Empty pattern");
    }
    Ok((bytes, mask))
}
