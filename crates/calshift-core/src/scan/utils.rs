//! Utility functions for pattern scanning

use crate::memory::ElementWidth;

/// Byte length of a `rows` x `cols` block, `None` on overflow
pub fn pattern_len(rows: usize, cols: usize, width: ElementWidth) -> Option<usize> {
    rows.checked_mul(cols)?.checked_mul(width.bytes())
}

/// Space-separated hex rendering of a byte slice, for diagnostics
pub fn format_hex_bytes(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Whether `[a, a + a_len)` and `[b, b + b_len)` share at least one byte
pub fn spans_overlap(a: usize, a_len: usize, b: usize, b_len: usize) -> bool {
    a < b.saturating_add(b_len) && b < a.saturating_add(a_len)
}
