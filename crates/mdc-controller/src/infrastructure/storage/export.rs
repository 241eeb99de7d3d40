//! Video-wall configuration export from discovery results.
//!
//! The generated TOML is a valid [`AppConfig`](super::config::AppConfig)
//! file: the `[[displays]]` entries carry `id`, `host`, `port`, and `name`,
//! plus informational fields that the loader ignores.

use mdc_core::domain::layout::grid_position;
use mdc_core::{DisplayId, GridPosition};
use serde::{Deserialize, Serialize};

use crate::infrastructure::network::discovery::DiscoveredDisplay;
use crate::infrastructure::network::session::DEFAULT_MDC_PORT;

/// Model name used when a display did not report one.
const UNKNOWN_MODEL: &str = "Samsung";

/// Generated configuration document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WallConfig {
    pub displays: Vec<WallDisplayEntry>,
    pub video_wall: WallSection,
}

/// One display of the generated wall.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WallDisplayEntry {
    pub id: DisplayId,
    pub host: String,
    pub port: u16,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serial_number: Option<String>,
    pub video_wall_position: GridPosition,
}

/// Wall geometry of the generated configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WallSection {
    /// Walls of a single display are generated disabled.
    pub enabled: bool,
    pub horizontal: u8,
    pub vertical: u8,
    /// `"{horizontal}x{vertical}"`.
    pub default_layout: String,
}

impl WallConfig {
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

/// Builds a wall configuration for at most `horizontal * vertical` of the
/// discovered displays, in discovery order.
///
/// Displays are numbered from 1 and placed row-major.  The wall is enabled
/// when more than one display was discovered.
pub fn generate_wall_config(discovered: &[DiscoveredDisplay], (horizontal, vertical): (u8, u8)) -> WallConfig {
    let capacity = usize::from(horizontal) * usize::from(vertical);
    let displays = discovered
        .iter()
        .take(capacity)
        .zip(1..=DisplayId::MAX)
        .enumerate()
        .map_while(|(index, (display, id))| {
            Some(WallDisplayEntry {
                id,
                host: display.address.to_string(),
                port: DEFAULT_MDC_PORT,
                name: format!(
                    "Display {id} - {}",
                    display.model.as_deref().unwrap_or(UNKNOWN_MODEL)
                ),
                model: display.model.clone(),
                serial_number: display.serial_number.clone(),
                video_wall_position: grid_position(index, horizontal)?,
            })
        })
        .collect();

    WallConfig {
        displays,
        video_wall: WallSection {
            enabled: discovered.len() > 1,
            horizontal,
            vertical,
            default_layout: format!("{horizontal}x{vertical}"),
        },
    }
}
