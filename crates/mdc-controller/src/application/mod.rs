//! Application layer: fleet operations built on top of device sessions.
//!
//! # Sub-modules
//!
//! - **`display_control`** – [`DisplayController`](display_control::DisplayController),
//!   the typed command facade for one display, and [`ControlError`](display_control::ControlError).
//!
//! - **`health_monitor`** – Runs concurrent health checks across the fleet on
//!   a fixed interval.
//!
//! - **`alerts`** – Turns health records into deduplicated alerts and the
//!   fleet status summary.
//!
//! - **`video_wall`** – Applies a planned layout to every display of a wall,
//!   or switches wall mode off again.
//!
//! Fan-out operations never fail as a whole because of one display: every
//! per-display failure is reported next to the other displays' results.

pub mod alerts;
pub mod display_control;
pub mod health_monitor;
pub mod video_wall;
