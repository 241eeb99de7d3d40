//! Infrastructure layer for the fleet controller.
//!
//! Contains the I/O-facing adapters: TCP sessions to displays, LAN
//! discovery, and TOML file storage.

pub mod network;
pub mod storage;
