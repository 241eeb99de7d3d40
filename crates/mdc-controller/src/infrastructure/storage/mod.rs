//! Storage infrastructure: configuration files.
//!
//! - **`config`** – Loads and saves the controller's TOML configuration,
//!   with defaults for everything that is missing.
//! - **`export`** – Generates a ready-to-use configuration from discovery
//!   results.

pub mod config;
pub mod export;
