//! Scan pipeline: per-map scan, resolution, optional fuzzy pass.

mod cancel;
mod progress;
mod worker;

pub use cancel::CancelToken;
pub use progress::*;
pub use worker::{ScanResult, ScanWorker};

use serde::Serialize;
use tracing::info;

use crate::map::{MapRegistry, MatchType};
use crate::scan::constants::SCAN_PROGRESS_SHARE;
use crate::scan::{FuzzyResolver, MatchResolver, ScanConfig};

/// Counts per match type after a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScanSummary {
    pub total: usize,
    pub unique: usize,
    pub sequential: usize,
    pub fuzzy: usize,
    pub ambiguous: usize,
    pub none: usize,
    /// Resolved maps that needed surrounding context
    pub deep: usize,
}

impl ScanSummary {
    pub fn from_registry(registry: &MapRegistry) -> Self {
        Self {
            total: registry.len(),
            unique: registry.count_by_type(MatchType::Unique),
            sequential: registry.count_by_type(MatchType::Sequential),
            fuzzy: registry.count_by_type(MatchType::Fuzzy),
            ambiguous: registry.count_by_type(MatchType::Ambiguous),
            none: registry.count_by_type(MatchType::None),
            deep: registry
                .iter()
                .filter(|e| e.match_type().is_resolved() && e.resolution.is_deep())
                .count(),
        }
    }

    /// Maps with a target address
    pub fn found(&self) -> usize {
        self.unique + self.sequential + self.fuzzy
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    Completed(ScanSummary),
    /// Stopped by the cancel token; `scanned` maps had finished the exact scan
    Cancelled { scanned: usize },
}

impl ScanOutcome {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }

    pub fn summary(&self) -> Option<&ScanSummary> {
        match self {
            Self::Completed(summary) => Some(summary),
            Self::Cancelled { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScanPipeline {
    config: ScanConfig,
    resolver: MatchResolver,
    fuzzy: FuzzyResolver,
}

impl Default for ScanPipeline {
    fn default() -> Self {
        Self::new(ScanConfig::default())
    }
}

impl ScanPipeline {
    pub fn new(config: ScanConfig) -> Self {
        Self {
            resolver: MatchResolver::from_config(&config),
            fuzzy: FuzzyResolver::from_config(&config),
            config,
        }
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    pub fn resolver(&self) -> &MatchResolver {
        &self.resolver
    }

    /// Run every stage over `registry` on the calling thread.
    ///
    /// Cancellation is checked before each map's scan and before the fuzzy
    /// pass. Each map's scan fields are written in one assignment, so a
    /// cancelled run never leaves a map half-updated.
    pub fn run(
        &self,
        registry: &mut MapRegistry,
        source: &[u8],
        target: &[u8],
        cancel: &CancelToken,
        progress: &dyn ProgressSink,
    ) -> ScanOutcome {
        let total = registry.len();
        info!(
            "Scanning {} maps (source {} bytes, target {} bytes)",
            total,
            source.len(),
            target.len()
        );
        progress.status("Scanning maps");
        progress.percent(0);

        for (i, entity) in registry.iter_mut().enumerate() {
            if cancel.is_cancelled() {
                info!("Scan cancelled after {}/{} maps", i, total);
                return ScanOutcome::Cancelled { scanned: i };
            }
            self.resolver.scan_z(entity, source, target);
            if i % 10 == 0 {
                progress.percent((i * SCAN_PROGRESS_SHARE / total) as u8);
            }
        }

        progress.status("Resolving matches");
        self.resolver.resolve(registry, source, target);

        if self.config.fuzzy.enabled {
            if cancel.is_cancelled() {
                return ScanOutcome::Cancelled { scanned: total };
            }
            progress.status("Fuzzy matching");
            let scaled = ScaledProgress::new(progress, SCAN_PROGRESS_SHARE as u8, 100);
            self.fuzzy
                .scan_fuzzy(registry, source, target, &scaled, cancel);
            if cancel.is_cancelled() {
                return ScanOutcome::Cancelled { scanned: total };
            }
        }

        progress.percent(100);
        let summary = ScanSummary::from_registry(registry);
        info!(
            "Scan complete: {}/{} maps found ({} unique, {} sequential, {} fuzzy)",
            summary.found(),
            summary.total,
            summary.unique,
            summary.sequential,
            summary.fuzzy
        );
        ScanOutcome::Completed(summary)
    }
}
