//! Command-line front end for the care-home hydration pipeline.
//!
//! Reads care plans, hydration logs and IPC sheets from directories, runs the
//! pipeline and writes the dashboards to `files/hydration/<home-id>/`.

pub mod inputs;

pub use inputs::*;
