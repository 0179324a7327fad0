//! Fixed-width element reads from raw image buffers.
//!
//! Reads never fail: an out-of-range access yields 0, matching how an
//! unmapped cell is displayed.

use serde::{Deserialize, Serialize};
use strum::{Display, IntoStaticStr};

/// Width of one table element
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
    IntoStaticStr,
    Display,
)]
#[repr(u8)]
pub enum ElementWidth {
    #[default]
    #[strum(serialize = "8-bit")]
    Byte = 1,
    #[strum(serialize = "16-bit")]
    Word = 2,
}

impl ElementWidth {
    /// Width from a bit count as stored in definition documents.
    ///
    /// Anything other than 16 is treated as a byte.
    pub fn from_bits(bits: u32) -> Self {
        if bits == 16 { Self::Word } else { Self::Byte }
    }

    pub fn bytes(self) -> usize {
        self as usize
    }

    pub fn bits(self) -> u32 {
        self.bytes() as u32 * 8
    }
}

/// Element encoding: width plus signedness
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Element {
    pub width: ElementWidth,
    pub signed: bool,
}

impl Element {
    pub fn new(width: ElementWidth, signed: bool) -> Self {
        Self { width, signed }
    }

    pub fn bytes(&self) -> usize {
        self.width.bytes()
    }
}

/// Read the little-endian unsigned bit pattern of one element.
///
/// Returns 0 when the buffer is empty or the element would run past its end.
pub fn read_raw(data: &[u8], addr: usize, width: ElementWidth) -> u32 {
    let size = width.bytes();
    let Some(end) = addr.checked_add(size) else {
        return 0;
    };
    if data.is_empty() || end > data.len() {
        return 0;
    }

    match width {
        ElementWidth::Byte => data[addr] as u32,
        ElementWidth::Word => u16::from_le_bytes([data[addr], data[addr + 1]]) as u32,
    }
}

/// Two's-complement interpretation of a raw bit pattern.
pub fn to_signed(raw: u32, width: ElementWidth) -> i32 {
    let bits = width.bits();
    let raw = raw & ((1u32 << bits) - 1);
    if raw >= 1 << (bits - 1) {
        raw as i32 - (1i32 << bits)
    } else {
        raw as i32
    }
}

/// Read one element and apply its sign convention.
pub fn read_value(data: &[u8], addr: usize, element: Element) -> i32 {
    let raw = read_raw(data, addr, element.width);
    if element.signed {
        to_signed(raw, element.width)
    } else {
        raw as i32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_raw_little_endian() {
        let data = [0x34, 0x12, 0xFF];
        assert_eq!(read_raw(&data, 0, ElementWidth::Word), 0x1234);
        assert_eq!(read_raw(&data, 0, ElementWidth::Byte), 0x34);
        assert_eq!(read_raw(&data, 2, ElementWidth::Byte), 0xFF);
    }

    #[test]
    fn test_read_raw_out_of_bounds() {
        let data = [0x01, 0x02];
        assert_eq!(read_raw(&data, 1, ElementWidth::Word), 0);
        assert_eq!(read_raw(&data, 2, ElementWidth::Byte), 0);
        assert_eq!(read_raw(&data, usize::MAX, ElementWidth::Word), 0);
        assert_eq!(read_raw(&[], 0, ElementWidth::Byte), 0);
    }

    #[test]
    fn test_to_signed() {
        assert_eq!(to_signed(0x7F, ElementWidth::Byte), 127);
        assert_eq!(to_signed(0x80, ElementWidth::Byte), -128);
        assert_eq!(to_signed(0xFF, ElementWidth::Byte), -1);
        assert_eq!(to_signed(0x7FFF, ElementWidth::Word), 32767);
        assert_eq!(to_signed(0x8000, ElementWidth::Word), -32768);
        assert_eq!(to_signed(0xFFFE, ElementWidth::Word), -2);
    }

    #[test]
    fn test_read_value_applies_sign_once() {
        let data = [0xFE, 0xFF];
        let signed = Element::new(ElementWidth::Word, true);
        let unsigned = Element::new(ElementWidth::Word, false);
        assert_eq!(read_value(&data, 0, signed), -2);
        assert_eq!(read_value(&data, 0, unsigned), 0xFFFE);
    }

    #[test]
    fn test_element_width_from_bits() {
        assert_eq!(ElementWidth::from_bits(16), ElementWidth::Word);
        assert_eq!(ElementWidth::from_bits(8), ElementWidth::Byte);
        assert_eq!(ElementWidth::from_bits(0), ElementWidth::Byte);
        assert_eq!(ElementWidth::Word.to_string(), "16-bit");
    }
}
