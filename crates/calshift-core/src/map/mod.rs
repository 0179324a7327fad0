mod definition;
mod entity;
mod equation;
mod registry;

pub use definition::*;
pub use entity::*;
pub use equation::{Equation, format_value};
pub use registry::*;
