//! Interchange format for map definitions.
//!
//! A `DefinitionDocument` is what a definition-file importer hands to the
//! engine and what the exporter hands back. Addresses are hex strings as
//! calibration tools print them (`"0x1C4A6"`).
//!
//! Loading is lenient on individual fields: an unparsable address or
//! dimension becomes 0, and an unparsable equation becomes `X`. Such maps
//! simply end up unresolved instead of failing the whole document.

use std::borrow::Cow;
use std::fs;
use std::path::Path;

use encoding_rs::WINDOWS_1252;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::warn;

use crate::error::Result;
use crate::map::{AxisDef, Equation, MapEntity, MapKind, ZData};
use crate::memory::{Element, ElementWidth};

fn zero_address() -> String {
    "0x0".to_string()
}

fn default_bits() -> u32 {
    8
}

fn identity_equation() -> String {
    "X".to_string()
}

fn one() -> usize {
    1
}

/// Accepts a JSON number or a decimal/hex string; anything else becomes 0
fn lenient_usize<'de, D>(deserializer: D) -> std::result::Result<usize, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    let parsed = match &value {
        serde_json::Value::Number(n) => n.as_u64().map(|v| v as usize),
        serde_json::Value::String(s) => {
            let s = s.trim();
            if s.starts_with("0x") || s.starts_with("0X") {
                parse_address(s)
            } else {
                s.parse::<usize>().ok()
            }
        }
        _ => None,
    };
    Ok(parsed.unwrap_or_else(|| {
        warn!("Unparsable numeric field {}, using 0", value);
        0
    }))
}

/// Parse a hex address (with or without 0x prefix)
pub fn parse_address(text: &str) -> Option<usize> {
    let s = text.trim();
    let s = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    usize::from_str_radix(s, 16).ok()
}

/// Format an address the way definition documents store it
pub fn format_address(addr: usize) -> String {
    format!("0x{:X}", addr)
}

/// Z block of a map definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZDefinition {
    #[serde(default = "zero_address")]
    pub address: String,
    #[serde(default = "default_bits")]
    pub bits: u32,
    #[serde(default)]
    pub signed: bool,
    #[serde(default = "identity_equation")]
    pub equation: String,
    #[serde(default = "one", deserialize_with = "lenient_usize")]
    pub rows: usize,
    #[serde(default = "one", deserialize_with = "lenient_usize")]
    pub cols: usize,
}

impl Default for ZDefinition {
    fn default() -> Self {
        Self {
            address: zero_address(),
            bits: default_bits(),
            signed: false,
            equation: identity_equation(),
            rows: 1,
            cols: 1,
        }
    }
}

/// Axis block of a map definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AxisDefinition {
    #[serde(default = "zero_address")]
    pub address: String,
    #[serde(default = "default_bits")]
    pub bits: u32,
    #[serde(default)]
    pub signed: bool,
    #[serde(default = "identity_equation")]
    pub equation: String,
    #[serde(default = "one", deserialize_with = "lenient_usize")]
    pub count: usize,
}

impl Default for AxisDefinition {
    fn default() -> Self {
        Self {
            address: zero_address(),
            bits: default_bits(),
            signed: false,
            equation: identity_equation(),
            count: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapDefinition {
    pub name: String,
    #[serde(default)]
    pub kind: MapKind,
    #[serde(default)]
    pub z: ZDefinition,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<AxisDefinition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<AxisDefinition>,
}

impl MapDefinition {
    /// Build the engine-side entity with no resolution state
    pub fn to_entity(&self) -> MapEntity {
        let z = ZData {
            address: self.lenient_address(&self.z.address, "z"),
            element: Element::new(ElementWidth::from_bits(self.z.bits), self.z.signed),
            equation: self.equation(&self.z.equation, "z"),
            rows: self.z.rows,
            cols: self.z.cols,
        };
        let x = self.axis(self.x.as_ref(), "x");
        let y = self.axis(self.y.as_ref(), "y");
        MapEntity::new(self.name.clone(), self.kind, z).with_axes(x, y)
    }

    fn axis(&self, def: Option<&AxisDefinition>, id: &str) -> AxisDef {
        let Some(def) = def else {
            return AxisDef::default();
        };
        AxisDef {
            address: self.lenient_address(&def.address, id),
            element: Element::new(ElementWidth::from_bits(def.bits), def.signed),
            equation: self.equation(&def.equation, id),
            count: def.count,
        }
    }

    fn lenient_address(&self, text: &str, id: &str) -> usize {
        parse_address(text).unwrap_or_else(|| {
            warn!("{}: invalid {} address '{}', using 0", self.name, id, text);
            0
        })
    }

    fn equation(&self, text: &str, id: &str) -> Equation {
        Equation::parse(text).unwrap_or_else(|e| {
            warn!("{}: {} equation ignored: {}", self.name, id, e);
            Equation::identity()
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DefinitionDocument {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub title: String,
    #[serde(default)]
    pub maps: Vec<MapDefinition>,
}

fn decode_document(bytes: &[u8]) -> Cow<'_, str> {
    match std::str::from_utf8(bytes) {
        Ok(text) => Cow::Borrowed(text),
        Err(_) => {
            let (decoded, _, _) = WINDOWS_1252.decode(bytes);
            decoded
        }
    }
}

pub fn load_definitions<P: AsRef<Path>>(path: P) -> Result<DefinitionDocument> {
    let bytes = fs::read(&path)?;
    let content = decode_document(&bytes);
    let document = serde_json::from_str(&content)?;
    Ok(document)
}

pub fn save_definitions<P: AsRef<Path>>(path: P, document: &DefinitionDocument) -> Result<()> {
    let content = serde_json::to_string_pretty(document)?;
    fs::write(path, content)?;
    Ok(())
}
