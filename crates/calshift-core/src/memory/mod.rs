pub mod layout;
mod reader;

pub use reader::{Element, ElementWidth, read_raw, read_value, to_signed};
