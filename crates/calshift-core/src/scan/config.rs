use serde::{Deserialize, Serialize};

use crate::memory::layout::RESERVED_REGION_SIZE;
use crate::scan::constants::*;

/// How groups of identical patterns may be paired by address order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum SequentialPolicy {
    /// Pair any group whose size equals the number of free occurrences
    #[default]
    Permissive,
    /// Only pair groups of at least `min_group_size` maps; smaller groups
    /// stay AMBIGUOUS
    Strict { min_group_size: usize },
}

impl SequentialPolicy {
    pub fn allows(self, group_size: usize) -> bool {
        match self {
            Self::Permissive => true,
            Self::Strict { min_group_size } => group_size >= min_group_size,
        }
    }
}

/// Approximate-match settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FuzzyConfig {
    /// Run the fuzzy pass after exact resolution
    pub enabled: bool,
    /// Allowed deviation per byte
    pub tolerance: u8,
    /// Share of bytes (0.0 - 1.0) that must be within tolerance
    pub threshold: f64,
    /// Widening applied to a degenerate search window
    pub window_margin: usize,
}

impl Default for FuzzyConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            tolerance: DEFAULT_FUZZY_TOLERANCE,
            threshold: DEFAULT_FUZZY_THRESHOLD,
            window_margin: FUZZY_WINDOW_MARGIN,
        }
    }
}

/// Configuration for one scan run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Bytes at the start of the target never searched
    pub reserved_region: usize,
    /// Cap on collected hits per pattern
    pub max_matches: usize,
    /// Maximum context grown on each side of an ambiguous pattern
    pub context_radius: usize,
    pub sequential: SequentialPolicy,
    pub fuzzy: FuzzyConfig,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            reserved_region: RESERVED_REGION_SIZE,
            max_matches: DEFAULT_MAX_MATCHES,
            context_radius: CONTEXT_RADIUS,
            sequential: SequentialPolicy::default(),
            fuzzy: FuzzyConfig::default(),
        }
    }
}

impl ScanConfig {
    /// Create a new configuration builder
    pub fn builder() -> ScanConfigBuilder {
        ScanConfigBuilder::default()
    }

    /// First target offset a map may resolve to.
    ///
    /// Offset 0 marks an unresolved address in definition documents, so it is
    /// skipped even when no region is reserved.
    pub fn search_start(&self) -> usize {
        self.reserved_region.max(1)
    }
}

/// Builder for ScanConfig
#[derive(Debug, Clone, Default)]
pub struct ScanConfigBuilder {
    config: Option<ScanConfig>,
    reserved_region: Option<usize>,
    max_matches: Option<usize>,
    context_radius: Option<usize>,
    sequential: Option<SequentialPolicy>,
    fuzzy_enabled: Option<bool>,
    fuzzy_tolerance: Option<u8>,
    fuzzy_threshold: Option<f64>,
}

impl ScanConfigBuilder {
    /// Start from an existing configuration instead of the defaults
    pub fn base(mut self, config: ScanConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn reserved_region(mut self, size: usize) -> Self {
        self.reserved_region = Some(size);
        self
    }

    pub fn max_matches(mut self, max: usize) -> Self {
        self.max_matches = Some(max);
        self
    }

    pub fn context_radius(mut self, radius: usize) -> Self {
        self.context_radius = Some(radius);
        self
    }

    pub fn sequential(mut self, policy: SequentialPolicy) -> Self {
        self.sequential = Some(policy);
        self
    }

    /// Enable or disable the fuzzy pass
    pub fn fuzzy(mut self, enabled: bool) -> Self {
        self.fuzzy_enabled = Some(enabled);
        self
    }

    pub fn fuzzy_tolerance(mut self, tolerance: u8) -> Self {
        self.fuzzy_tolerance = Some(tolerance);
        self
    }

    pub fn fuzzy_threshold(mut self, threshold: f64) -> Self {
        self.fuzzy_threshold = Some(threshold);
        self
    }

    /// Build the configuration
    pub fn build(self) -> ScanConfig {
        let mut config = self.config.unwrap_or_default();
        if let Some(v) = self.reserved_region {
            config.reserved_region = v;
        }
        if let Some(v) = self.max_matches {
            config.max_matches = v;
        }
        if let Some(v) = self.context_radius {
            config.context_radius = v;
        }
        if let Some(v) = self.sequential {
            config.sequential = v;
        }
        if let Some(v) = self.fuzzy_enabled {
            config.fuzzy.enabled = v;
        }
        if let Some(v) = self.fuzzy_tolerance {
            config.fuzzy.tolerance = v;
        }
        if let Some(v) = self.fuzzy_threshold {
            config.fuzzy.threshold = v.clamp(0.0, 1.0);
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ScanConfig::default();
        assert_eq!(config.reserved_region, 0x10000);
        assert_eq!(config.search_start(), 0x10000);
        assert_eq!(config.max_matches, 100);
        assert_eq!(config.context_radius, 8);
        assert_eq!(config.sequential, SequentialPolicy::Permissive);
        assert!(!config.fuzzy.enabled);
        assert_eq!(config.fuzzy.tolerance, 10);
        assert_eq!(config.fuzzy.threshold, 0.80);
        assert_eq!(config.fuzzy.window_margin, 0x2000);
    }

    #[test]
    fn test_builder_overrides() {
        let config = ScanConfig::builder()
            .reserved_region(0)
            .fuzzy(true)
            .fuzzy_threshold(1.5)
            .sequential(SequentialPolicy::Strict { min_group_size: 3 })
            .build();
        assert_eq!(config.reserved_region, 0);
        assert_eq!(config.search_start(), 1);
        assert!(config.fuzzy.enabled);
        assert_eq!(config.fuzzy.threshold, 1.0);
        assert_eq!(config.max_matches, 100);
    }

    #[test]
    fn test_builder_base_keeps_unset_fields() {
        let base = ScanConfig {
            max_matches: 10,
            ..Default::default()
        };
        let config = ScanConfig::builder().base(base).fuzzy(true).build();
        assert_eq!(config.max_matches, 10);
        assert!(config.fuzzy.enabled);
    }

    #[test]
    fn test_sequential_policy() {
        assert!(SequentialPolicy::Permissive.allows(2));
        let strict = SequentialPolicy::Strict { min_group_size: 3 };
        assert!(!strict.allows(2));
        assert!(strict.allows(3));
    }

    #[test]
    fn test_deserialize_partial_json() {
        let config: ScanConfig = serde_json::from_str(
            r#"{"reserved_region": 4096, "sequential": {"mode": "strict", "min_group_size": 3},
                "fuzzy": {"enabled": true}}"#,
        )
        .unwrap();
        assert_eq!(config.reserved_region, 4096);
        assert_eq!(
            config.sequential,
            SequentialPolicy::Strict { min_group_size: 3 }
        );
        assert!(config.fuzzy.enabled);
        assert_eq!(config.fuzzy.tolerance, 10);
    }
}
