//! Validation and per-date dashboard generation.

mod generate;
mod validate;

pub use generate::*;
pub use validate::*;
