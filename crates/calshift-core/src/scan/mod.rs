//! Address resolution: exact scan, context expansion, classification and
//! the fuzzy fallback.

mod config;
pub mod constants;
mod context;
mod fuzzy;
mod pattern;
mod resolver;
pub mod utils;

pub use config::*;
pub use context::{ContextExpander, ContextMatch};
pub use fuzzy::{Anchor, FuzzyResolver, find_fuzzy_match, mismatch_budget, similarity};
pub use pattern::PatternScanner;
pub use resolver::MatchResolver;
