//! Search-related constants for address resolution
//!
//! # Resolution Strategy
//!
//! Each map's Z bytes are copied out of the source image and searched for in
//! the target image. Evidence is ranked from strongest to weakest:
//!
//! ```text
//!   exact, one hit ──────────────► UNIQUE
//!   exact, several hits
//!     └─ surrounding bytes agree ─► UNIQUE (deep)
//!     └─ N maps share N hits ─────► SEQUENTIAL
//!     └─ otherwise ───────────────► AMBIGUOUS
//!   no exact hit
//!     └─ approximate hit between
//!        resolved neighbours ─────► FUZZY
//! ```

/// Maximum hits collected per pattern
///
/// Reaching the cap means "many", not an exact count. All-zero filler tables
/// would otherwise produce thousands of hits.
pub const DEFAULT_MAX_MATCHES: usize = 100;

/// Maximum bytes of context grown on each side of an ambiguous pattern
pub const CONTEXT_RADIUS: usize = 8;

/// Patterns shorter than this are never fuzzy-matched
pub const MIN_FUZZY_PATTERN_LEN: usize = 4;

/// Allowed deviation per byte for a fuzzy match
pub const DEFAULT_FUZZY_TOLERANCE: u8 = 10;

/// Share of bytes that must be within tolerance for a fuzzy match
pub const DEFAULT_FUZZY_THRESHOLD: f64 = 0.80;

/// Margin added on both sides of a degenerate fuzzy window (8KB)
pub const FUZZY_WINDOW_MARGIN: usize = 0x2000;

/// Progress share of the per-map scan loop; resolution fills the rest
pub const SCAN_PROGRESS_SHARE: usize = 90;
