//! Network infrastructure.
//!
//! # Sub-modules
//!
//! - **`session`** – One TCP link per display: connect and response
//!   timeouts, framed reads, and the retry policy.
//!
//! - **`discovery`** – Scans an IPv4 range for displays that answer MDC
//!   queries.

pub mod discovery;
pub mod session;
