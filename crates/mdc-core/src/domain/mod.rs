//! Domain entities for MDC fleet control.
//!
//! Pure data and planning logic: no sockets, no clocks of its own, no OS
//! APIs.  The controller crate feeds these types with what it observes on
//! the network.

/// Health records, alerts, and the fleet status summary.
pub mod health;

/// Video-wall layout enumeration and grid assignment.
///
/// See [`layout::LayoutPlanner`] for the main type.
pub mod layout;
