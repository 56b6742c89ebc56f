//! Configuration module for Stylesweep
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use stylesweep::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("stylesweep.toml")).unwrap();
//! println!("Auditing {} stylesheets", config.css.len());
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{AuthConfig, Config, HttpConfig, PageEntry, PagesConfig};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
pub use validation::validate;
