//! Configuration module for SourceFinder-RS
//!
//! Handles loading settings from YAML files and environment variables.
//! Settings are passed explicitly to the components that need them; there
//! is no process-global configuration state.

mod settings;

pub use settings::*;
