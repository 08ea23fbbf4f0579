//! Dashboard artifacts: JS data files, the roster CSV and their on-disk layout.

mod files;
mod js;
mod roster;

pub use files::*;
pub use js::*;
pub use roster::*;
