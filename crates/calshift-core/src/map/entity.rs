use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};

use crate::map::Equation;
use crate::memory::{Element, read_value};
use crate::scan::utils::pattern_len;

/// Whether a definition describes a table or a single constant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
pub enum MapKind {
    #[default]
    #[strum(serialize = "table")]
    Table,
    #[strum(serialize = "scalar")]
    Scalar,
}

/// Confidence of a resolved Z address
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Default,
    Serialize,
    Deserialize,
    EnumString,
    IntoStaticStr,
    Display,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchType {
    /// Exactly one occurrence in the target
    Unique,
    /// Paired by address order with other maps sharing the same bytes
    Sequential,
    /// Approximate match between resolved neighbours
    Fuzzy,
    /// Occurrences exist but cannot be assigned
    Ambiguous,
    #[default]
    None,
}

impl MatchType {
    /// Match types that carry a target address
    pub fn is_resolved(self) -> bool {
        matches!(self, Self::Unique | Self::Sequential | Self::Fuzzy)
    }
}

/// Confidence of a resolved axis address
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    EnumString,
    IntoStaticStr,
    Display,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum AxisMatchType {
    /// Exactly one occurrence in the target
    Unique,
    /// One of several occurrences, at the table's own shift
    Offset,
    /// First of several occurrences
    Guess,
    #[default]
    None,
}

/// Bytes of surrounding context needed to single out a candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DeepMatch {
    pub left: usize,
    pub right: usize,
}

/// Z data location and encoding in the source image
#[derive(Debug, Clone, PartialEq)]
pub struct ZData {
    pub address: usize,
    pub element: Element,
    pub equation: Equation,
    pub rows: usize,
    pub cols: usize,
}

impl ZData {
    /// `None` when the dimensions overflow
    pub fn cell_count(&self) -> Option<usize> {
        self.rows.checked_mul(self.cols)
    }

    /// Length in bytes of the Z block, `None` when it overflows
    pub fn byte_len(&self) -> Option<usize> {
        pattern_len(self.rows, self.cols, self.element.width)
    }
}

impl Default for ZData {
    fn default() -> Self {
        Self {
            address: 0,
            element: Element::default(),
            equation: Equation::identity(),
            rows: 1,
            cols: 1,
        }
    }
}

/// Axis location and encoding in the source image
///
/// An address of 0 means the axis is not stored in the image.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AxisDef {
    pub address: usize,
    pub element: Element,
    pub equation: Equation,
    pub count: usize,
}

impl AxisDef {
    pub fn is_defined(&self) -> bool {
        self.address > 0
    }

    pub fn byte_len(&self) -> Option<usize> {
        pattern_len(1, self.count, self.element.width)
    }
}

/// Resolution state of the Z block
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Resolution {
    pub target_addr: Option<usize>,
    pub match_type: MatchType,
    pub match_percent: u8,
    pub match_count: usize,
    /// Candidate offsets in the target, ascending
    pub matches: Vec<usize>,
    pub deep: Option<DeepMatch>,
}

impl Resolution {
    pub fn is_deep(&self) -> bool {
        self.deep.is_some()
    }

    /// Target address with -1 standing for "unresolved"
    pub fn target_or_sentinel(&self) -> i64 {
        self.target_addr.map_or(-1, |addr| addr as i64)
    }

    /// Drop the classification while keeping the scan candidates
    pub(crate) fn clear_classification(&mut self) {
        self.target_addr = None;
        self.match_type = MatchType::None;
        self.match_percent = 0;
    }

    pub(crate) fn assign(&mut self, match_type: MatchType, target: usize, percent: u8) {
        self.match_type = match_type;
        self.target_addr = Some(target);
        self.match_percent = percent;
    }
}

/// Resolution state of one axis
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AxisResolution {
    pub target_addr: Option<usize>,
    pub match_type: AxisMatchType,
    pub matches: Vec<usize>,
    pub deep: Option<DeepMatch>,
}

impl AxisResolution {
    pub fn is_deep(&self) -> bool {
        self.deep.is_some()
    }
}

/// One calibration table or constant together with its resolution state
#[derive(Debug, Clone, PartialEq)]
pub struct MapEntity {
    pub name: String,
    pub kind: MapKind,
    pub z: ZData,
    pub x: AxisDef,
    pub y: AxisDef,
    pub resolution: Resolution,
    pub x_resolution: AxisResolution,
    pub y_resolution: AxisResolution,
}

impl MapEntity {
    pub fn new(name: impl Into<String>, kind: MapKind, z: ZData) -> Self {
        Self {
            name: name.into(),
            kind,
            z,
            x: AxisDef::default(),
            y: AxisDef::default(),
            resolution: Resolution::default(),
            x_resolution: AxisResolution::default(),
            y_resolution: AxisResolution::default(),
        }
    }

    pub fn with_axes(mut self, x: AxisDef, y: AxisDef) -> Self {
        if self.kind == MapKind::Table {
            self.x = x;
            self.y = y;
        }
        self
    }

    pub fn is_scalar(&self) -> bool {
        self.kind == MapKind::Scalar
    }

    pub fn match_type(&self) -> MatchType {
        self.resolution.match_type
    }

    pub fn target_addr(&self) -> Option<usize> {
        self.resolution.target_addr
    }

    /// Source bytes of the Z block, if the block lies inside `source`
    pub fn z_pattern<'a>(&self, source: &'a [u8]) -> Option<&'a [u8]> {
        let len = self.z.byte_len()?;
        if self.z.address == 0 || len == 0 {
            return None;
        }
        let end = self.z.address.checked_add(len)?;
        source.get(self.z.address..end)
    }

    /// Clear every output field ahead of a fresh scan
    pub fn reset_resolution(&mut self) {
        self.resolution = Resolution::default();
        self.x_resolution = AxisResolution::default();
        self.y_resolution = AxisResolution::default();
    }

    /// Decoded Z cells starting at `base`, row-major.
    ///
    /// Stops at the end of `data`, so an oversized definition yields at most
    /// as many cells as the image holds.
    pub fn z_values(&self, data: &[u8], base: usize) -> Vec<f64> {
        let cells = self.z.cell_count().unwrap_or(0);
        decode_cells(data, base, cells, self.z.element, &self.z.equation)
    }

    /// Decoded axis breakpoints starting at `base`
    pub fn axis_values(axis: &AxisDef, data: &[u8], base: usize) -> Vec<f64> {
        decode_cells(data, base, axis.count, axis.element, &axis.equation)
    }
}

fn decode_cells(
    data: &[u8],
    base: usize,
    count: usize,
    element: Element,
    equation: &Equation,
) -> Vec<f64> {
    let step = element.bytes();
    let available = data.len().saturating_sub(base) / step;
    (0..count.min(available))
        .map(|i| {
            let raw = read_value(data, base + i * step, element);
            equation.evaluate(raw as f64)
        })
        .collect()
}
