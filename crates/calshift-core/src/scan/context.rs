//! Context expansion for patterns with several occurrences.
//!
//! Small tables are often padded with filler that also appears elsewhere in
//! the image. The bytes around a table (neighbouring headers, adjacent axis
//! data) usually tell its occurrences apart, so the window is grown one byte
//! at a time, first to the left and then to the right, and candidates whose
//! surroundings differ from the source are dropped.

use tracing::debug;

use crate::map::DeepMatch;
use crate::memory::ElementWidth;
use crate::scan::constants::CONTEXT_RADIUS;
use crate::scan::utils::pattern_len;
use crate::scan::{PatternScanner, ScanConfig};

/// Result of a context-expanded scan
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContextMatch {
    /// Surviving candidates, ascending
    pub matches: Vec<usize>,
    /// Set when context removed at least one raw candidate
    pub deep: Option<DeepMatch>,
}

impl ContextMatch {
    pub fn is_deep(&self) -> bool {
        self.deep.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextExpander {
    scanner: PatternScanner,
    radius: usize,
}

impl Default for ContextExpander {
    fn default() -> Self {
        Self::new(PatternScanner::default(), CONTEXT_RADIUS)
    }
}

impl ContextExpander {
    pub fn new(scanner: PatternScanner, radius: usize) -> Self {
        Self { scanner, radius }
    }

    pub fn from_config(config: &ScanConfig) -> Self {
        Self::new(PatternScanner::from_config(config), config.context_radius)
    }

    pub fn scanner(&self) -> &PatternScanner {
        &self.scanner
    }

    pub fn scan_with_context(
        &self,
        source: &[u8],
        target: &[u8],
        addr: usize,
        rows: usize,
        cols: usize,
        width: ElementWidth,
    ) -> ContextMatch {
        let matches = self.scanner.scan(source, target, addr, rows, cols, width);
        if matches.len() <= 1 {
            return ContextMatch {
                matches,
                deep: None,
            };
        }

        // A non-empty scan implies the length is valid
        let len = pattern_len(rows, cols, width).unwrap_or(0);
        let raw_count = matches.len();
        let mut candidates = matches;

        let (left, unique) = self.expand(source, target, addr, len, &mut candidates, Side::Left);
        if unique {
            debug!(
                "  0x{:X}: unique after {} bytes of left context",
                addr, left
            );
            return ContextMatch {
                matches: candidates,
                deep: Some(DeepMatch { left, right: 0 }),
            };
        }

        let (right, unique) = self.expand(source, target, addr, len, &mut candidates, Side::Right);
        if unique {
            debug!(
                "  0x{:X}: unique after {}/{} bytes of left/right context",
                addr, left, right
            );
        }

        let deep = (candidates.len() < raw_count).then_some(DeepMatch { left, right });
        ContextMatch {
            matches: candidates,
            deep,
        }
    }

    /// Grow one side of the window, narrowing `candidates` in place.
    ///
    /// Returns the radius reached and whether a single candidate remains.
    /// A step that would eliminate every candidate, or that leaves the
    /// source buffer, ends the phase at the previous radius.
    fn expand(
        &self,
        source: &[u8],
        target: &[u8],
        addr: usize,
        len: usize,
        candidates: &mut Vec<usize>,
        side: Side,
    ) -> (usize, bool) {
        let mut reached = 0;
        for step in 1..=self.radius {
            let Some(context) = context_slice(source, addr, len, step, side) else {
                break;
            };

            let filtered: Vec<usize> = candidates
                .iter()
                .copied()
                .filter(|&c| context_slice(target, c, len, step, side) == Some(context))
                .collect();

            match filtered.len() {
                0 => break,
                1 => {
                    *candidates = filtered;
                    return (step, true);
                }
                _ => {
                    *candidates = filtered;
                    reached = step;
                }
            }
        }
        (reached, false)
    }
}

/// The `step` bytes before (left) or after (right) a `len`-byte block at `addr`
fn context_slice(data: &[u8], addr: usize, len: usize, step: usize, side: Side) -> Option<&[u8]> {
    match side {
        Side::Left => {
            let start = addr.checked_sub(step)?;
            data.get(start..addr)
        }
        Side::Right => {
            let start = addr.checked_add(len)?;
            data.get(start..start.checked_add(step)?)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PATTERN: [u8; 4] = [0x11, 0x22, 0x33, 0x44];

    fn expander() -> ContextExpander {
        ContextExpander::new(PatternScanner::new(0, 100), 8)
    }

    #[test]
    fn test_single_match_is_not_deep() {
        let mut source = vec![0u8; 32];
        source[8..12].copy_from_slice(&PATTERN);
        let mut target = vec![0u8; 64];
        target[40..44].copy_from_slice(&PATTERN);

        let result = expander().scan_with_context(&source, &target, 8, 1, 4, ElementWidth::Byte);
        assert_eq!(result.matches, vec![40]);
        assert!(!result.is_deep());
    }

    #[test]
    fn test_left_context_disambiguates() {
        let mut source = vec![0u8; 32];
        source[6..8].copy_from_slice(&[0xA0, 0xA1]);
        source[8..12].copy_from_slice(&PATTERN);

        let mut target = vec![0u8; 128];
        target[20..24].copy_from_slice(&PATTERN);
        target[62..64].copy_from_slice(&[0xB0, 0xA1]);
        target[64..68].copy_from_slice(&PATTERN);
        target[98..100].copy_from_slice(&[0xA0, 0xA1]);
        target[100..104].copy_from_slice(&PATTERN);

        let result = expander().scan_with_context(&source, &target, 8, 1, 4, ElementWidth::Byte);
        // step 1 keeps 64 and 100, step 2 keeps only 100
        assert_eq!(result.matches, vec![100]);
        assert_eq!(result.deep, Some(DeepMatch { left: 2, right: 0 }));
    }

    #[test]
    fn test_right_context_disambiguates() {
        let mut source = vec![0u8; 32];
        source[8..12].copy_from_slice(&PATTERN);
        source[12] = 0x77;

        let mut target = vec![0u8; 128];
        target[20..24].copy_from_slice(&PATTERN);
        target[64..68].copy_from_slice(&PATTERN);
        target[68] = 0x77;

        let result = expander().scan_with_context(&source, &target, 8, 1, 4, ElementWidth::Byte);
        assert_eq!(result.matches, vec![64]);
        assert_eq!(result.deep, Some(DeepMatch { left: 8, right: 1 }));
    }

    #[test]
    fn test_identical_surroundings_stay_ambiguous() {
        let mut source = vec![0u8; 64];
        source[20..24].copy_from_slice(&PATTERN);
        let mut target = vec![0u8; 256];
        target[100..104].copy_from_slice(&PATTERN);
        target[200..204].copy_from_slice(&PATTERN);

        let result = expander().scan_with_context(&source, &target, 20, 1, 4, ElementWidth::Byte);
        assert_eq!(result.matches, vec![100, 200]);
        assert!(!result.is_deep());
    }

    #[test]
    fn test_partial_narrowing_is_deep() {
        let mut source = vec![0u8; 64];
        source[19] = 0x55;
        source[20..24].copy_from_slice(&PATTERN);
        let mut target = vec![0u8; 256];
        target[50..54].copy_from_slice(&PATTERN);
        target[99] = 0x55;
        target[100..104].copy_from_slice(&PATTERN);
        target[199] = 0x55;
        target[200..204].copy_from_slice(&PATTERN);

        let result = expander().scan_with_context(&source, &target, 20, 1, 4, ElementWidth::Byte);
        assert_eq!(result.matches, vec![100, 200]);
        assert!(result.is_deep());
    }

    #[test]
    fn test_never_grows_candidate_set() {
        let source: Vec<u8> = (0..64u8).map(|i| i % 3).collect();
        let target: Vec<u8> = (0..512u32).map(|i| (i % 3) as u8).collect();
        let raw = PatternScanner::new(0, 100).scan(&source, &target, 9, 1, 3, ElementWidth::Byte);
        let result = expander().scan_with_context(&source, &target, 9, 1, 3, ElementWidth::Byte);
        assert!(result.matches.len() <= raw.len());
        assert!(result.matches.iter().all(|m| raw.contains(m)));
    }

    #[test]
    fn test_context_at_buffer_start() {
        // No bytes to the left of the source block
        let source = [0x11, 0x22, 0x33, 0x44, 0x99];
        let mut target = vec![0u8; 64];
        target[0..4].copy_from_slice(&PATTERN);
        target[30..34].copy_from_slice(&PATTERN);
        target[34] = 0x99;

        let result = expander().scan_with_context(&source, &target, 0, 1, 4, ElementWidth::Byte);
        assert_eq!(result.matches, vec![30]);
        assert_eq!(result.deep, Some(DeepMatch { left: 0, right: 1 }));
    }
}
