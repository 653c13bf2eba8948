// src/config/mod.rs

//! Configuration loading and validation for sitepipe.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk, or fall back to defaults (`loader.rs`).
//! - Validate basic invariants like task-graph correctness (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{DEFAULT_CONFIG_FILE, load_and_validate, load_from_path, resolve_config};
pub use model::{
    AssembleSection, CompositeTaskConfig, ConfigFile, DeploySection, ImagesSection, PathsSection,
    RawConfigFile, ScriptsSection, ServerSection, StylesSection, WatchRuleConfig, WatchSection,
};
