//! Address-space constants for firmware images
//!
//! Calibration images share a common memory map: a low region holding the
//! bootloader and RAM-mapped segments, followed by code and calibration data.
//! Tables are never placed in the low region, and its contents produce
//! spurious matches for short patterns, so pattern searches skip it.

/// Size of the reserved low region skipped by every target-side search (64KB)
pub const RESERVED_REGION_SIZE: usize = 0x10000;
