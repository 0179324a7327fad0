//! Scan configuration file loading.
//!
//! The file is TOML and mirrors `ScanConfig`; every key is optional:
//!
//! ```toml
//! reserved_region = 65536
//! max_matches = 100
//!
//! [sequential]
//! mode = "strict"
//! min_group_size = 3
//!
//! [fuzzy]
//! enabled = true
//! tolerance = 10
//! threshold = 0.8
//! ```

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use calshift_core::ScanConfig;
use tracing::info;

pub fn load_scan_config(path: Option<&Path>) -> Result<ScanConfig> {
    let Some(path) = path else {
        return Ok(ScanConfig::default());
    };
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    let config = parse_scan_config(&content)
        .with_context(|| format!("Invalid config {}", path.display()))?;
    info!("Loaded scan config from {}", path.display());
    Ok(config)
}

pub fn parse_scan_config(content: &str) -> Result<ScanConfig> {
    Ok(toml::from_str(content)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use calshift_core::SequentialPolicy;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_partial_config() {
        let config = parse_scan_config(
            r#"
            reserved_region = 4096

            [sequential]
            mode = "strict"
            min_group_size = 3

            [fuzzy]
            enabled = true
            "#,
        )
        .unwrap();
        assert_eq!(config.reserved_region, 4096);
        assert_eq!(config.max_matches, 100);
        assert_eq!(
            config.sequential,
            SequentialPolicy::Strict { min_group_size: 3 }
        );
        assert!(config.fuzzy.enabled);
        assert_eq!(config.fuzzy.threshold, 0.80);
    }

    #[test]
    fn test_empty_config_is_default() {
        assert_eq!(parse_scan_config("").unwrap(), ScanConfig::default());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "max_matches = 50").unwrap();
        let config = load_scan_config(Some(file.path())).unwrap();
        assert_eq!(config.max_matches, 50);

        assert_eq!(load_scan_config(None).unwrap(), ScanConfig::default());
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        assert!(parse_scan_config("max_matches = \"many\"").is_err());
    }
}
