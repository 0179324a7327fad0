//! Output side: relocated definition documents and scan reports.

mod label;
mod report;
mod writer;

pub use label::{display_label, markers, strip_markers};
pub use report::*;
pub use writer::*;
