use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::Result;
use crate::map::{
    AxisDef, AxisMatchType, AxisResolution, DeepMatch, MapRegistry, MatchType, format_address,
};
use crate::pipeline::ScanSummary;

/// Candidates listed per map in a report
const REPORT_CANDIDATES: usize = 5;

/// Scan result dump for review outside the tool
#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    pub generated_at: DateTime<Utc>,
    pub source_size: usize,
    pub target_size: usize,
    pub summary: ScanSummary,
    pub maps: Vec<MapReport>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MapReport {
    pub name: String,
    pub match_type: MatchType,
    pub source_address: String,
    pub target_address: Option<String>,
    pub match_percent: u8,
    pub match_count: usize,
    /// First candidates in the target, hex
    pub candidates: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deep: Option<DeepMatch>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<AxisReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<AxisReport>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AxisReport {
    pub source_address: String,
    pub target_address: Option<String>,
    pub match_type: AxisMatchType,
    pub match_count: usize,
}

impl AxisReport {
    fn new(axis: &AxisDef, resolution: &AxisResolution) -> Option<Self> {
        axis.is_defined().then(|| Self {
            source_address: format_address(axis.address),
            target_address: resolution.target_addr.map(format_address),
            match_type: resolution.match_type,
            match_count: resolution.matches.len(),
        })
    }
}

impl ScanReport {
    pub fn from_registry(registry: &MapRegistry, source_size: usize, target_size: usize) -> Self {
        let maps = registry
            .iter()
            .map(|entity| MapReport {
                name: entity.name.clone(),
                match_type: entity.match_type(),
                source_address: format_address(entity.z.address),
                target_address: entity.target_addr().map(format_address),
                match_percent: entity.resolution.match_percent,
                match_count: entity.resolution.match_count,
                candidates: entity
                    .resolution
                    .matches
                    .iter()
                    .take(REPORT_CANDIDATES)
                    .map(|&addr| format_address(addr))
                    .collect(),
                deep: entity.resolution.deep,
                x: AxisReport::new(&entity.x, &entity.x_resolution),
                y: AxisReport::new(&entity.y, &entity.y_resolution),
            })
            .collect();

        Self {
            generated_at: Utc::now(),
            source_size,
            target_size,
            summary: ScanSummary::from_registry(registry),
            maps,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        fs::write(path, self.to_json()?)?;
        Ok(())
    }
}
