//! Configuration Management
//!
//! Unified configuration system with hierarchical resolution:
//! 1. Built-in defaults
//! 2. Global config (~/.config/jobfit/config.toml)
//! 3. Project config (.jobfit/config.toml)
//! 4. Environment variables (JOBFIT_*)

mod loader;
mod types;

pub use loader::ConfigLoader;
pub use types::*;
