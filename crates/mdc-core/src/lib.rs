//! # mdc-core
//!
//! Shared library for controlling commercial displays over the vendor
//! Multiple Display Control (MDC) protocol.
//!
//! This crate has zero dependencies on OS APIs or network sockets; the
//! `mdc-controller` crate owns all I/O.
//!
//! - **`protocol`** – How bytes travel over the wire.  Every MDC message is a
//!   small frame: `0xAA`, command, display id, payload length, payload, and a
//!   one-byte additive checksum.  The codec encodes and validates these
//!   frames; the command tables map symbolic names to codes.
//!
//! - **`domain`** – Health records, alerts, and fleet status produced by the
//!   monitor, plus the video-wall [`LayoutPlanner`] that arranges a set of
//!   displays into every possible rectangular grid.

pub mod domain;
pub mod protocol;

pub use domain::health::{
    Alert, AlertId, AlertLevel, FleetStatus, HealthRecord, SystemHealth,
};
pub use domain::layout::{
    DisplayId, GridPosition, LayoutError, LayoutPlanner, VideoWallLayout,
};
pub use protocol::codec::{decode_frame, encode_frame, DecodedFrame, ProtocolError};
pub use protocol::commands::{CommandCode, InputSource};
