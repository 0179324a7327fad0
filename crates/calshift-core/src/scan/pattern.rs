use memchr::memmem;

use crate::memory::ElementWidth;
use crate::scan::ScanConfig;
use crate::scan::utils::pattern_len;

/// Exact, overlapping pattern search over the target image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatternScanner {
    reserved_region: usize,
    max_matches: usize,
}

impl Default for PatternScanner {
    fn default() -> Self {
        Self::from_config(&ScanConfig::default())
    }
}

impl PatternScanner {
    pub fn new(reserved_region: usize, max_matches: usize) -> Self {
        Self {
            reserved_region,
            max_matches,
        }
    }

    pub fn from_config(config: &ScanConfig) -> Self {
        Self::new(config.search_start(), config.max_matches)
    }

    pub fn reserved_region(&self) -> usize {
        self.reserved_region
    }

    pub fn max_matches(&self) -> usize {
        self.max_matches
    }

    /// Find every occurrence in `target` of the `rows` x `cols` block stored at
    /// `addr` in `source`.
    ///
    /// Returns offsets in ascending order. An empty block, an empty buffer or
    /// a block running past the end of `source` yields no matches.
    pub fn scan(
        &self,
        source: &[u8],
        target: &[u8],
        addr: usize,
        rows: usize,
        cols: usize,
        width: ElementWidth,
    ) -> Vec<usize> {
        let Some(len) = pattern_len(rows, cols, width) else {
            return Vec::new();
        };
        let Some(end) = addr.checked_add(len) else {
            return Vec::new();
        };
        match source.get(addr..end) {
            Some(pattern) => self.find_all(target, pattern),
            None => Vec::new(),
        }
    }

    /// Find every occurrence of `pattern` past the reserved region.
    ///
    /// Overlapping occurrences are all reported; the search resumes one byte
    /// after each hit. Stops once `max_matches` hits are collected.
    pub fn find_all(&self, target: &[u8], pattern: &[u8]) -> Vec<usize> {
        let mut matches = Vec::new();
        if pattern.is_empty() || target.len() <= self.reserved_region {
            return matches;
        }

        let finder = memmem::Finder::new(pattern);
        let mut start = self.reserved_region;
        while matches.len() < self.max_matches {
            match finder.find(&target[start..]) {
                Some(pos) => {
                    let hit = start + pos;
                    matches.push(hit);
                    start = hit + 1;
                }
                None => break,
            }
        }

        matches
    }

    /// Whether a result hit the cap and may be incomplete
    pub fn is_capped(&self, matches: &[usize]) -> bool {
        matches.len() >= self.max_matches
    }
}
