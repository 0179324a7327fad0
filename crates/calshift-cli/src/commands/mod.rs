//! CLI command implementations.

pub mod hex_utils;
pub mod hexdump;
pub mod scan;
pub mod search;
pub mod show;
