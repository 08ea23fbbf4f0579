//! Domain models for the hydration pipeline.

mod dashboard;
mod input;
mod resident;

pub use dashboard::*;
pub use input::*;
pub use resident::*;
