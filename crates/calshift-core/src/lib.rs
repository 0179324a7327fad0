//! # calshift-core
//!
//! Relocates calibration map addresses from one firmware image to another.
//!
//! This crate provides:
//! - Map definitions and the in-memory registry (`map`)
//! - Little-endian element reads and value decoding (`memory`)
//! - Exact search, context expansion, match classification and the fuzzy
//!   fallback (`scan`)
//! - A cancellable scan pipeline with progress reporting (`pipeline`)
//! - Relocated document and report output (`export`)

pub mod error;
pub mod export;
pub mod map;
pub mod memory;
pub mod pipeline;
pub mod scan;

pub use error::{Error, Result};
pub use export::{
    ScanReport, WriteOptions, display_label, is_exportable, relocate_document, strip_markers,
};
pub use map::{
    AxisDef, AxisMatchType, AxisResolution, DeepMatch, DefinitionDocument, Equation, MapDefinition,
    MapEntity, MapKind, MapRegistry, MatchType, Resolution, ZData, format_address, format_value,
    load_definitions, parse_address, save_definitions,
};
pub use memory::{Element, ElementWidth, read_raw, read_value, to_signed};
pub use pipeline::{
    CancelToken, ChannelProgress, LogProgress, NullProgress, ProgressEvent, ProgressSink,
    ScanOutcome, ScanPipeline, ScanResult, ScanSummary, ScanWorker,
};
pub use scan::{
    ContextExpander, FuzzyConfig, FuzzyResolver, MatchResolver, PatternScanner, ScanConfig,
    SequentialPolicy, find_fuzzy_match,
};
