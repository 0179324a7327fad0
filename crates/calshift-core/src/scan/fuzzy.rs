//! Approximate matching for maps without an exact occurrence.
//!
//! Recalibrated tables keep their location relative to their neighbours even
//! when their bytes change. Resolved maps act as anchors: a map lying between
//! two anchors in the source is searched for only between the same anchors in
//! the target. Every fuzzy hit becomes an anchor itself, so later maps get
//! tighter windows.

use tracing::{debug, info};

use crate::map::{MapEntity, MapRegistry, MatchType};
use crate::pipeline::{CancelToken, ProgressSink};
use crate::scan::constants::MIN_FUZZY_PATTERN_LEN;
use crate::scan::utils::spans_overlap;
use crate::scan::{FuzzyConfig, MatchResolver, ScanConfig};

/// Number of mismatching bytes a `len`-byte pattern may have.
///
/// Computed in per-mille so that float rounding never drops a byte from the
/// budget (80% of 10 bytes allows exactly 2).
pub fn mismatch_budget(len: usize, threshold: f64) -> usize {
    let per_mille = (threshold.clamp(0.0, 1.0) * 1000.0).round() as usize;
    len * (1000 - per_mille) / 1000
}

fn within(a: u8, b: u8, tolerance: u8) -> bool {
    a.abs_diff(b) <= tolerance
}

/// Percentage of bytes of `window` within `tolerance` of `pattern`
pub fn similarity(window: &[u8], pattern: &[u8], tolerance: u8) -> u8 {
    if pattern.is_empty() || window.len() != pattern.len() {
        return 0;
    }
    let hits = window
        .iter()
        .zip(pattern)
        .filter(|&(&d, &p)| within(d, p, tolerance))
        .count();
    (hits * 100 / pattern.len()) as u8
}

/// First offset in `[start, end - pattern.len()]` where `pattern` matches
/// `data` within `tolerance` per byte for at least `threshold` of its bytes.
///
/// Patterns shorter than four bytes are never matched.
pub fn find_fuzzy_match(
    data: &[u8],
    start: usize,
    end: usize,
    pattern: &[u8],
    tolerance: u8,
    threshold: f64,
) -> Option<usize> {
    let len = pattern.len();
    if len < MIN_FUZZY_PATTERN_LEN {
        return None;
    }
    let end = end.min(data.len());
    let last = end.checked_sub(len)?;
    if start > last {
        return None;
    }

    let budget = mismatch_budget(len, threshold);
    let first = pattern[0];
    let tail = pattern[len - 1];

    'candidates: for pos in start..=last {
        let window = &data[pos..pos + len];
        if budget == 0
            && !(within(window[0], first, tolerance) && within(window[len - 1], tail, tolerance))
        {
            continue;
        }

        let mut mismatches = 0;
        for (&d, &p) in window.iter().zip(pattern) {
            if !within(d, p, tolerance) {
                mismatches += 1;
                if mismatches > budget {
                    continue 'candidates;
                }
            }
        }
        return Some(pos);
    }

    None
}

/// A resolved map's footprint in both images
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Anchor {
    pub source_addr: usize,
    pub target_addr: usize,
    pub len: usize,
}

impl Anchor {
    fn from_entity(entity: &MapEntity) -> Option<Self> {
        Some(Self {
            source_addr: entity.z.address,
            target_addr: entity.target_addr()?,
            len: entity.z.byte_len()?,
        })
    }

    fn target_end(&self) -> usize {
        self.target_addr.saturating_add(self.len)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FuzzyResolver {
    config: FuzzyConfig,
    reserved_region: usize,
    axes: MatchResolver,
}

impl Default for FuzzyResolver {
    fn default() -> Self {
        Self::from_config(&ScanConfig::default())
    }
}

impl FuzzyResolver {
    pub fn from_config(config: &ScanConfig) -> Self {
        Self {
            config: config.fuzzy.clone(),
            reserved_region: config.search_start(),
            axes: MatchResolver::from_config(config),
        }
    }

    pub fn config(&self) -> &FuzzyConfig {
        &self.config
    }

    /// Try to place every NONE map between its resolved neighbours.
    ///
    /// Reports 0-100 percent over the pending maps and stops early when
    /// `cancel` is set. Returns the number of maps resolved.
    pub fn scan_fuzzy(
        &self,
        registry: &mut MapRegistry,
        source: &[u8],
        target: &[u8],
        progress: &dyn ProgressSink,
        cancel: &CancelToken,
    ) -> usize {
        let entities = registry.entities_mut();

        let mut anchors: Vec<Anchor> = entities.iter().filter_map(Anchor::from_entity).collect();
        anchors.sort_by_key(|a| a.source_addr);

        let mut pending: Vec<usize> = (0..entities.len())
            .filter(|&i| {
                entities[i].match_type() == MatchType::None
                    && entities[i]
                        .z_pattern(source)
                        .is_some_and(|p| p.len() >= MIN_FUZZY_PATTERN_LEN)
            })
            .collect();
        pending.sort_by(|&a, &b| {
            (entities[a].z.address, &entities[a].name)
                .cmp(&(entities[b].z.address, &entities[b].name))
        });

        info!(
            "Fuzzy pass: {} unresolved maps, {} anchors",
            pending.len(),
            anchors.len()
        );

        let total = pending.len();
        let mut resolved = 0;
        for (done, &i) in pending.iter().enumerate() {
            if cancel.is_cancelled() {
                debug!("Fuzzy pass cancelled after {} maps", done);
                break;
            }

            let entity = &mut entities[i];
            let Some(pattern) = entity.z_pattern(source) else {
                continue;
            };

            if let Some((hit, percent)) = self.search(&anchors, entity.z.address, pattern, target) {
                debug!(
                    "  {}: 0x{:X} -> 0x{:X} (fuzzy, {}%)",
                    entity.name, entity.z.address, hit, percent
                );
                entity.resolution.assign(MatchType::Fuzzy, hit, percent);
                self.axes.resolve_axes(entity, source, target);

                let anchor = Anchor {
                    source_addr: entity.z.address,
                    target_addr: hit,
                    len: pattern.len(),
                };
                let at = anchors.partition_point(|a| a.source_addr <= anchor.source_addr);
                anchors.insert(at, anchor);
                resolved += 1;
            }

            progress.percent(((done + 1) * 100 / total) as u8);
        }

        info!("Fuzzy pass resolved {} maps", resolved);
        resolved
    }

    /// Search the window between the anchors around `source_addr`
    fn search(
        &self,
        anchors: &[Anchor],
        source_addr: usize,
        pattern: &[u8],
        target: &[u8],
    ) -> Option<(usize, u8)> {
        let (start, end) = self.window(anchors, source_addr, target.len());
        let len = pattern.len();

        let mut from = start;
        while let Some(hit) = find_fuzzy_match(
            target,
            from,
            end,
            pattern,
            self.config.tolerance,
            self.config.threshold,
        ) {
            if anchors
                .iter()
                .any(|a| spans_overlap(hit, len, a.target_addr, a.len))
            {
                from = hit + 1;
                continue;
            }
            let percent = similarity(&target[hit..hit + len], pattern, self.config.tolerance);
            return Some((hit, percent));
        }
        None
    }

    /// Target range bounded by the nearest anchors below and above
    /// `source_addr`, widened by the margin when empty
    fn window(&self, anchors: &[Anchor], source_addr: usize, target_len: usize) -> (usize, usize) {
        let below = anchors.partition_point(|a| a.source_addr < source_addr);
        let above = anchors.partition_point(|a| a.source_addr <= source_addr);

        let mut start = below
            .checked_sub(1)
            .map_or(self.reserved_region, |i| anchors[i].target_end());
        let mut end = anchors
            .get(above)
            .map_or(target_len, |a| a.target_addr)
            .min(target_len);

        if start >= end {
            start = start
                .saturating_sub(self.config.window_margin)
                .max(self.reserved_region);
            end = end.saturating_add(self.config.window_margin).min(target_len);
        }
        (start, end)
    }
}
