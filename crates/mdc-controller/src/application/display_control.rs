//! Command facade over a single display.
//!
//! [`DisplayController`] exposes the typed MDC operations (power, volume,
//! input, video wall, identity queries) on top of a [`DeviceSession`].
//! Argument validation happens here, before any frame is built, so an
//! out-of-range value never reaches the network.

use std::sync::Arc;
use std::time::SystemTime;

use async_trait::async_trait;
use mdc_core::{CommandCode, DisplayId, GridPosition, HealthRecord, InputSource, ProtocolError};
use thiserror::Error;
use tracing::{debug, warn};

use crate::application::health_monitor::HealthProbe;
use crate::application::video_wall::VideoWallDisplay;
use crate::infrastructure::network::session::{
    DeviceSession, SessionConfig, SessionState, TcpConnector,
};

/// Largest grid dimension the video wall command accepts.
pub const MAX_WALL_MONITORS: u8 = 15;

/// Errors returned by display operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ControlError {
    /// An argument was rejected before anything was sent.
    #[error("{field} must be between {min} and {max}, got {value}")]
    OutOfRange {
        field: &'static str,
        value: i64,
        min: i64,
        max: i64,
    },

    /// Every send attempt failed.
    #[error("command failed after {attempts} attempts: {last_error}")]
    RetriesExhausted { attempts: u32, last_error: String },

    /// A layout referenced a display that was not supplied.
    #[error("no controller for display {0}")]
    AdapterNotFound(DisplayId),

    #[error("unknown video wall layout {0:?}")]
    LayoutNotFound(String),

    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// A spawned per-display task panicked or was cancelled.
    #[error("task failed: {0}")]
    TaskFailed(String),
}

// ── VideoWallMode ─────────────────────────────────────────────────────────────

/// Arguments of the video wall command.
///
/// Sent as the payload `[enabled, h_monitors, v_monitors, h_position, v_position]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoWallMode {
    pub enabled: bool,
    pub h_monitors: u8,
    pub v_monitors: u8,
    pub h_position: u8,
    pub v_position: u8,
}

impl VideoWallMode {
    /// Wall mode off, single-monitor grid.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            h_monitors: 1,
            v_monitors: 1,
            h_position: 1,
            v_position: 1,
        }
    }

    /// Wall mode on for the display at `position` in an `h x v` grid.
    pub fn enabled_at(horizontal: u8, vertical: u8, position: GridPosition) -> Self {
        Self {
            enabled: true,
            h_monitors: horizontal,
            v_monitors: vertical,
            h_position: position.horizontal,
            v_position: position.vertical,
        }
    }

    /// Checks grid size and position bounds.
    ///
    /// # Errors
    ///
    /// [`ControlError::OutOfRange`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ControlError> {
        check_range("h_monitors", self.h_monitors.into(), 1, MAX_WALL_MONITORS.into())?;
        check_range("v_monitors", self.v_monitors.into(), 1, MAX_WALL_MONITORS.into())?;
        check_range("h_position", self.h_position.into(), 1, self.h_monitors.into())?;
        check_range("v_position", self.v_position.into(), 1, self.v_monitors.into())?;
        Ok(())
    }

    fn payload(&self) -> [u8; 5] {
        [
            u8::from(self.enabled),
            self.h_monitors,
            self.v_monitors,
            self.h_position,
            self.v_position,
        ]
    }
}

fn check_range(field: &'static str, value: i64, min: i64, max: i64) -> Result<(), ControlError> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ControlError::OutOfRange {
            field,
            value,
            min,
            max,
        })
    }
}

/// Decodes an ASCII text reply, dropping non-ASCII bytes and trimming
/// whitespace and NUL padding.
fn ascii_text(payload: &[u8]) -> String {
    let text: String = payload
        .iter()
        .filter(|b| b.is_ascii())
        .map(|&b| char::from(b))
        .collect();
    text.trim_matches(|c: char| c.is_whitespace() || c == '\0')
        .to_string()
}

// ── DisplayController ─────────────────────────────────────────────────────────

/// Typed MDC operations for one display.
pub struct DisplayController {
    session: DeviceSession,
}

impl DisplayController {
    pub fn new(session: DeviceSession) -> Self {
        Self { session }
    }

    /// Controller for a display reachable over plain TCP.
    pub fn tcp(
        display_id: DisplayId,
        host: impl Into<String>,
        port: u16,
        config: SessionConfig,
    ) -> Self {
        Self::new(DeviceSession::new(
            display_id,
            host,
            port,
            config,
            Arc::new(TcpConnector),
        ))
    }

    pub fn display_id(&self) -> DisplayId {
        self.session.device_id()
    }

    pub fn address(&self) -> String {
        self.session.address()
    }

    pub fn session(&self) -> &DeviceSession {
        &self.session
    }

    pub async fn power(&self, on: bool) -> Result<(), ControlError> {
        self.command(CommandCode::POWER, &[u8::from(on)]).await
    }

    /// Sets the volume.
    ///
    /// # Errors
    ///
    /// [`ControlError::OutOfRange`] unless `0 <= volume <= 100`; nothing is
    /// sent in that case.
    pub async fn set_volume(&self, volume: i32) -> Result<(), ControlError> {
        check_range("volume", volume.into(), 0, 100)?;
        // Range checked above.
        let level = volume as u8;
        self.command(CommandCode::VOLUME, &[level]).await
    }

    pub async fn set_mute(&self, muted: bool) -> Result<(), ControlError> {
        self.command(CommandCode::MUTE, &[u8::from(muted)]).await
    }

    pub async fn set_input_source(&self, source: InputSource) -> Result<(), ControlError> {
        self.command(CommandCode::INPUT_SOURCE, &[source.0]).await
    }

    /// Queries the panel temperature in degrees Celsius.
    ///
    /// Returns `Ok(None)` when the display answers with an empty payload.
    pub async fn get_temperature(&self) -> Result<Option<u8>, ControlError> {
        let payload = self.query(CommandCode::CURRENT_TEMP).await?;
        Ok(payload.first().copied())
    }

    pub async fn get_serial_number(&self) -> Result<String, ControlError> {
        Ok(ascii_text(&self.query(CommandCode::SERIAL_NUMBER).await?))
    }

    pub async fn get_model_number(&self) -> Result<String, ControlError> {
        Ok(ascii_text(&self.query(CommandCode::MODEL_NUMBER).await?))
    }

    pub async fn get_software_version(&self) -> Result<String, ControlError> {
        Ok(ascii_text(&self.query(CommandCode::SOFTWARE_VERSION).await?))
    }

    /// Applies a video wall configuration.
    ///
    /// # Errors
    ///
    /// [`ControlError::OutOfRange`] if the grid is larger than
    /// [`MAX_WALL_MONITORS`] or the position lies outside it; nothing is sent.
    pub async fn set_video_wall_mode(&self, mode: VideoWallMode) -> Result<(), ControlError> {
        mode.validate()?;
        self.command(CommandCode::VIDEO_WALL_MODE, &mode.payload()).await
    }

    /// Connectivity, responsiveness, and identity in one record.
    ///
    /// Never fails: an unreachable display yields a record with
    /// `connected == false`.  Identity queries are best-effort and leave
    /// their field unset on failure.
    pub async fn health_check(&self) -> HealthRecord {
        let session = &self.session;
        if !session.is_connected() {
            if let Err(e) = session.connect().await {
                warn!(parent: session.span(), error = %e, "health check could not connect");
            }
        }
        let connected = session.is_connected();

        let mut record = HealthRecord {
            display_id: self.display_id(),
            address: self.address(),
            connected,
            responsive: false,
            temperature: None,
            model: None,
            serial_number: None,
            software_version: None,
            error_count: 0,
            last_response: None,
            timestamp: SystemTime::now(),
            error: None,
        };

        if connected {
            match self.get_temperature().await {
                Ok(temperature) => {
                    record.responsive = true;
                    record.temperature = temperature;
                }
                Err(e) => debug!(parent: session.span(), error = %e, "temperature probe failed"),
            }
            record.model = self.get_model_number().await.ok();
            record.serial_number = self.get_serial_number().await.ok();
            record.software_version = self.get_software_version().await.ok();
        }

        let snapshot = session.snapshot();
        record.error_count = snapshot.error_count;
        record.last_response = snapshot.last_response;
        record
    }

    pub async fn disconnect(&self) {
        self.session.disconnect().await;
    }

    pub fn state(&self) -> SessionState {
        self.session.snapshot().state
    }

    async fn command(&self, command: CommandCode, payload: &[u8]) -> Result<(), ControlError> {
        self.session.send_command(command, payload, true).await?;
        Ok(())
    }

    async fn query(&self, command: CommandCode) -> Result<Vec<u8>, ControlError> {
        let response = self.session.send_command(command, &[], true).await?;
        Ok(response.map(|frame| frame.payload).unwrap_or_default())
    }
}

#[async_trait]
impl HealthProbe for DisplayController {
    fn display_id(&self) -> DisplayId {
        DisplayController::display_id(self)
    }

    fn address(&self) -> String {
        DisplayController::address(self)
    }

    async fn check(&self) -> Result<HealthRecord, ControlError> {
        Ok(self.health_check().await)
    }
}

#[async_trait]
impl VideoWallDisplay for DisplayController {
    fn display_id(&self) -> DisplayId {
        DisplayController::display_id(self)
    }

    async fn set_video_wall_mode(&self, mode: VideoWallMode) -> Result<(), ControlError> {
        DisplayController::set_video_wall_mode(self, mode).await
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use mdc_core::encode_frame;

    use super::*;
    use crate::infrastructure::network::session::tests::{spawn_display, QueueConnector};
    use crate::infrastructure::network::session::{Connector, MockConnector, DEFAULT_MDC_PORT};

    fn controller_with(connector: Arc<dyn Connector>) -> DisplayController {
        DisplayController::new(DeviceSession::new(
            1,
            "10.0.0.5",
            DEFAULT_MDC_PORT,
            SessionConfig::default(),
            connector,
        ))
    }

    /// A connector that must never be used.
    fn offline() -> Arc<MockConnector> {
        let mut connector = MockConnector::new();
        connector.expect_connect().times(0);
        Arc::new(connector)
    }

    fn reply(command: CommandCode, payload: &[u8]) -> Vec<u8> {
        encode_frame(1, command, payload).unwrap()
    }

    // ── Validation (no I/O) ───────────────────────────────────────────────────

    #[tokio::test]
    async fn test_volume_out_of_range_fails_without_network() {
        let controller = controller_with(offline());

        let low = controller.set_volume(-1).await;
        let high = controller.set_volume(101).await;

        assert_eq!(
            low,
            Err(ControlError::OutOfRange {
                field: "volume",
                value: -1,
                min: 0,
                max: 100
            })
        );
        assert!(matches!(high, Err(ControlError::OutOfRange { value: 101, .. })));
    }

    #[tokio::test]
    async fn test_video_wall_mode_rejects_oversized_grid_without_network() {
        let controller = controller_with(offline());
        let mode = VideoWallMode {
            enabled: true,
            h_monitors: 16,
            v_monitors: 1,
            h_position: 1,
            v_position: 1,
        };

        let result = controller.set_video_wall_mode(mode).await;

        assert!(matches!(
            result,
            Err(ControlError::OutOfRange { field: "h_monitors", value: 16, .. })
        ));
    }

    #[tokio::test]
    async fn test_video_wall_mode_rejects_position_outside_grid() {
        let controller = controller_with(offline());
        let mode = VideoWallMode::enabled_at(
            2,
            2,
            GridPosition {
                horizontal: 1,
                vertical: 3,
            },
        );

        let result = controller.set_video_wall_mode(mode).await;

        assert!(matches!(
            result,
            Err(ControlError::OutOfRange { field: "v_position", value: 3, min: 1, max: 2 })
        ));
    }

    #[test]
    fn test_disabled_wall_mode_is_single_cell_grid() {
        let mode = VideoWallMode::disabled();
        assert_eq!(mode.payload(), [0, 1, 1, 1, 1]);
        assert!(mode.validate().is_ok());
    }

    #[test]
    fn test_ascii_text_trims_padding_and_drops_non_ascii() {
        assert_eq!(ascii_text(b"  LH55BECHLGFXGO\0\0"), "LH55BECHLGFXGO");
        assert_eq!(ascii_text(&[b'A', 0xC3, b'B', b' ']), "AB");
        assert_eq!(ascii_text(&[]), "");
    }

    // ── Commands over a fake display ─────────────────────────────────────────

    #[tokio::test]
    async fn test_set_volume_sends_volume_frame() {
        // Arrange
        let (client, server) = tokio::io::duplex(1024);
        let display = spawn_display(server, vec![reply(CommandCode::VOLUME, &[])]);
        let controller = controller_with(Arc::new(QueueConnector::new(vec![client])));

        // Act
        controller.set_volume(35).await.expect("volume");
        controller.disconnect().await;

        // Assert
        let frames = display.await.unwrap();
        assert_eq!(frames, vec![reply(CommandCode::VOLUME, &[35])]);
    }

    #[tokio::test]
    async fn test_volume_bounds_are_accepted_and_sent() {
        // Arrange
        let (client, server) = tokio::io::duplex(1024);
        let display = spawn_display(
            server,
            vec![reply(CommandCode::VOLUME, &[]), reply(CommandCode::VOLUME, &[])],
        );
        let controller = controller_with(Arc::new(QueueConnector::new(vec![client])));

        // Act
        let low = controller.set_volume(0).await;
        let high = controller.set_volume(100).await;
        controller.disconnect().await;

        // Assert
        assert_eq!(low, Ok(()));
        assert_eq!(high, Ok(()));
        let frames = display.await.unwrap();
        assert_eq!(
            frames,
            vec![reply(CommandCode::VOLUME, &[0]), reply(CommandCode::VOLUME, &[100])]
        );
    }

    #[tokio::test]
    async fn test_video_wall_mode_sends_five_byte_payload() {
        let (client, server) = tokio::io::duplex(1024);
        let display = spawn_display(server, vec![reply(CommandCode::VIDEO_WALL_MODE, &[])]);
        let controller = controller_with(Arc::new(QueueConnector::new(vec![client])));
        let mode = VideoWallMode::enabled_at(
            3,
            2,
            GridPosition {
                horizontal: 2,
                vertical: 1,
            },
        );

        controller.set_video_wall_mode(mode).await.expect("wall mode");
        controller.disconnect().await;

        let frames = display.await.unwrap();
        assert_eq!(frames, vec![reply(CommandCode::VIDEO_WALL_MODE, &[1, 3, 2, 2, 1])]);
    }

    #[tokio::test]
    async fn test_empty_temperature_reply_is_none() {
        let (client, server) = tokio::io::duplex(1024);
        let _display = spawn_display(server, vec![reply(CommandCode::CURRENT_TEMP, &[])]);
        let controller = controller_with(Arc::new(QueueConnector::new(vec![client])));

        assert_eq!(controller.get_temperature().await, Ok(None));
    }

    #[tokio::test]
    async fn test_health_check_collects_identity() {
        // Arrange
        let (client, server) = tokio::io::duplex(1024);
        let _display = spawn_display(
            server,
            vec![
                reply(CommandCode::CURRENT_TEMP, &[38]),
                reply(CommandCode::MODEL_NUMBER, b"LH55BECH "),
                reply(CommandCode::SERIAL_NUMBER, b"0K3N3CAM600123X\0"),
                reply(CommandCode::SOFTWARE_VERSION, b"T-HKMLAKUC-1011.5"),
            ],
        );
        let controller = controller_with(Arc::new(QueueConnector::new(vec![client])));

        // Act
        let record = controller.health_check().await;

        // Assert
        assert!(record.connected);
        assert!(record.responsive);
        assert_eq!(record.temperature, Some(38));
        assert_eq!(record.model.as_deref(), Some("LH55BECH"));
        assert_eq!(record.serial_number.as_deref(), Some("0K3N3CAM600123X"));
        assert_eq!(record.software_version.as_deref(), Some("T-HKMLAKUC-1011.5"));
        assert!(record.error.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_health_check_of_unreachable_display_is_not_connected() {
        let controller = controller_with(Arc::new(QueueConnector::new(Vec::new())));

        let record = controller.health_check().await;

        assert!(!record.connected);
        assert!(!record.responsive);
        assert_eq!(record.temperature, None);
        assert_eq!(record.model, None);
        assert_eq!(controller.state(), SessionState::Faulted);
    }

    #[tokio::test(start_paused = true)]
    async fn test_health_check_tolerates_failed_identity_queries() {
        // Arrange: temperature answers, everything after that is ignored
        let (client, server) = tokio::io::duplex(1024);
        let _display = spawn_display(server, vec![reply(CommandCode::CURRENT_TEMP, &[45])]);
        let controller = controller_with(Arc::new(QueueConnector::new(vec![client])));
        let started = tokio::time::Instant::now();

        // Act
        let record = controller.health_check().await;

        // Assert
        assert!(record.responsive);
        assert_eq!(record.temperature, Some(45));
        assert_eq!(record.model, None);
        assert_eq!(record.serial_number, None);
        assert_eq!(record.software_version, None);
        assert!(started.elapsed() >= Duration::from_secs(5));
    }
}
