//! MDC command codes and input source codes.
//!
//! Both are thin `u8` newtypes backed by constant lookup tables instead of
//! closed enums: displays answer with codes that newer firmware may add, and
//! those must survive decoding as opaque values.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// One MDC command byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommandCode(pub u8);

impl CommandCode {
    pub const POWER: Self = Self(0x11);
    pub const VOLUME: Self = Self(0x12);
    pub const MUTE: Self = Self(0x13);
    pub const INPUT_SOURCE: Self = Self(0x14);
    pub const PICTURE_MODE: Self = Self(0x15);
    pub const SOUND_MODE: Self = Self(0x16);
    pub const SAFETY_LOCK: Self = Self(0x17);
    pub const PICTURE_SIZE: Self = Self(0x18);
    pub const AUTO_ADJUSTMENT: Self = Self(0x19);
    pub const WALL_MODE: Self = Self(0x1A);
    pub const SAFETY_SCREEN: Self = Self(0x1B);
    pub const LOGO_DISPLAY: Self = Self(0x1C);
    pub const POWER_ON_DELAY: Self = Self(0x1D);
    pub const POWER_OFF_DELAY: Self = Self(0x1E);
    pub const SOUND_SELECT: Self = Self(0x1F);
    pub const LAMP_CONTROL: Self = Self(0x20);
    pub const PANEL_LOCK: Self = Self(0x21);
    pub const CONTRAST: Self = Self(0x22);
    pub const BRIGHTNESS: Self = Self(0x23);
    pub const SHARPNESS: Self = Self(0x24);
    pub const COLOR: Self = Self(0x25);
    pub const TINT: Self = Self(0x26);
    pub const RED_GAIN: Self = Self(0x27);
    pub const GREEN_GAIN: Self = Self(0x28);
    pub const BLUE_GAIN: Self = Self(0x29);
    pub const RESET: Self = Self(0x2A);
    pub const CURRENT_TEMP: Self = Self(0x2B);
    pub const SERIAL_NUMBER: Self = Self(0x2C);
    pub const SOFTWARE_VERSION: Self = Self(0x2D);
    pub const MODEL_NUMBER: Self = Self(0x2E);
    pub const INPUT_SOURCE_AUTO_SWITCH: Self = Self(0x2F);
    pub const CLOCK_1: Self = Self(0x30);
    pub const CLOCK_2: Self = Self(0x31);
    pub const CLOCK_3: Self = Self(0x32);
    pub const HOLIDAY_APPLY: Self = Self(0x33);
    pub const SCHEDULE_TYPE: Self = Self(0x34);
    pub const HOLIDAY_DELETE: Self = Self(0x35);
    pub const TIMER_1: Self = Self(0x36);
    pub const TIMER_2: Self = Self(0x37);
    pub const TIMER_3: Self = Self(0x38);
    pub const CLONE_SETTINGS: Self = Self(0x39);
    pub const NETWORK_SETTINGS: Self = Self(0x3A);
    pub const OSD_DISPLAY: Self = Self(0x3B);
    pub const VIDEO_WALL_MODE: Self = Self(0x84);
    pub const VIDEO_WALL_USER: Self = Self(0x89);

    /// Symbolic name of a known code, `None` for codes outside the table.
    pub fn name(self) -> Option<&'static str> {
        COMMAND_TABLE
            .iter()
            .find(|(_, code)| *code == self)
            .map(|(name, _)| *name)
    }

    /// Looks up a code by its symbolic name (exact match).
    pub fn from_name(name: &str) -> Option<Self> {
        COMMAND_TABLE
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, code)| *code)
    }
}

impl fmt::Display for CommandCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{name} (0x{:02X})", self.0),
            None => write!(f, "0x{:02X}", self.0),
        }
    }
}

/// The vendor command table, in code order.
pub const COMMAND_TABLE: &[(&str, CommandCode)] = &[
    ("POWER", CommandCode::POWER),
    ("VOLUME", CommandCode::VOLUME),
    ("MUTE", CommandCode::MUTE),
    ("INPUT_SOURCE", CommandCode::INPUT_SOURCE),
    ("PICTURE_MODE", CommandCode::PICTURE_MODE),
    ("SOUND_MODE", CommandCode::SOUND_MODE),
    ("SAFETY_LOCK", CommandCode::SAFETY_LOCK),
    ("PICTURE_SIZE", CommandCode::PICTURE_SIZE),
    ("AUTO_ADJUSTMENT", CommandCode::AUTO_ADJUSTMENT),
    ("WALL_MODE", CommandCode::WALL_MODE),
    ("SAFETY_SCREEN", CommandCode::SAFETY_SCREEN),
    ("LOGO_DISPLAY", CommandCode::LOGO_DISPLAY),
    ("POWER_ON_DELAY", CommandCode::POWER_ON_DELAY),
    ("POWER_OFF_DELAY", CommandCode::POWER_OFF_DELAY),
    ("SOUND_SELECT", CommandCode::SOUND_SELECT),
    ("LAMP_CONTROL", CommandCode::LAMP_CONTROL),
    ("PANEL_LOCK", CommandCode::PANEL_LOCK),
    ("CONTRAST", CommandCode::CONTRAST),
    ("BRIGHTNESS", CommandCode::BRIGHTNESS),
    ("SHARPNESS", CommandCode::SHARPNESS),
    ("COLOR", CommandCode::COLOR),
    ("TINT", CommandCode::TINT),
    ("RED_GAIN", CommandCode::RED_GAIN),
    ("GREEN_GAIN", CommandCode::GREEN_GAIN),
    ("BLUE_GAIN", CommandCode::BLUE_GAIN),
    ("RESET", CommandCode::RESET),
    ("CURRENT_TEMP", CommandCode::CURRENT_TEMP),
    ("SERIAL_NUMBER", CommandCode::SERIAL_NUMBER),
    ("SOFTWARE_VERSION", CommandCode::SOFTWARE_VERSION),
    ("MODEL_NUMBER", CommandCode::MODEL_NUMBER),
    ("INPUT_SOURCE_AUTO_SWITCH", CommandCode::INPUT_SOURCE_AUTO_SWITCH),
    ("CLOCK_1", CommandCode::CLOCK_1),
    ("CLOCK_2", CommandCode::CLOCK_2),
    ("CLOCK_3", CommandCode::CLOCK_3),
    ("HOLIDAY_APPLY", CommandCode::HOLIDAY_APPLY),
    ("SCHEDULE_TYPE", CommandCode::SCHEDULE_TYPE),
    ("HOLIDAY_DELETE", CommandCode::HOLIDAY_DELETE),
    ("TIMER_1", CommandCode::TIMER_1),
    ("TIMER_2", CommandCode::TIMER_2),
    ("TIMER_3", CommandCode::TIMER_3),
    ("CLONE_SETTINGS", CommandCode::CLONE_SETTINGS),
    ("NETWORK_SETTINGS", CommandCode::NETWORK_SETTINGS),
    ("OSD_DISPLAY", CommandCode::OSD_DISPLAY),
    ("VIDEO_WALL_MODE", CommandCode::VIDEO_WALL_MODE),
    ("VIDEO_WALL_USER", CommandCode::VIDEO_WALL_USER),
];

// ── Input sources ─────────────────────────────────────────────────────────────

/// Input source byte carried in an `INPUT_SOURCE` payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InputSource(pub u8);

impl InputSource {
    pub const PC: Self = Self(0x14);
    pub const DVI: Self = Self(0x18);
    pub const DVI_VIDEO: Self = Self(0x1F);
    pub const MAGIC_INFO: Self = Self(0x20);
    pub const HDMI: Self = Self(0x21);
    pub const HDMI_PC: Self = Self(0x22);
    pub const HDMI2: Self = Self(0x23);
    pub const HDMI2_PC: Self = Self(0x24);
    pub const DISPLAY_PORT: Self = Self(0x25);
    pub const DTV: Self = Self(0x30);
    pub const MEDIA_PLAYER_HDMI: Self = Self(0x60);
    pub const MEDIA_PLAYER_DVI: Self = Self(0x61);

    pub fn name(self) -> Option<&'static str> {
        INPUT_SOURCE_TABLE
            .iter()
            .find(|(_, source)| *source == self)
            .map(|(name, _)| *name)
    }

    pub fn from_name(name: &str) -> Option<Self> {
        INPUT_SOURCE_TABLE
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, source)| *source)
    }
}

/// The vendor input source table.
pub const INPUT_SOURCE_TABLE: &[(&str, InputSource)] = &[
    ("PC", InputSource::PC),
    ("DVI", InputSource::DVI),
    ("DVI_VIDEO", InputSource::DVI_VIDEO),
    ("MAGIC_INFO", InputSource::MAGIC_INFO),
    ("HDMI", InputSource::HDMI),
    ("HDMI_PC", InputSource::HDMI_PC),
    ("HDMI2", InputSource::HDMI2),
    ("HDMI2_PC", InputSource::HDMI2_PC),
    ("DISPLAY_PORT", InputSource::DISPLAY_PORT),
    ("DTV", InputSource::DTV),
    ("MEDIA_PLAYER_HDMI", InputSource::MEDIA_PLAYER_HDMI),
    ("MEDIA_PLAYER_DVI", InputSource::MEDIA_PLAYER_DVI),
];

/// Error returned when parsing an unknown input source name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown input source: {0}")]
pub struct UnknownInputSource(pub String);

impl FromStr for InputSource {
    type Err = UnknownInputSource;

    /// Accepts table names case-insensitively, with `-` allowed for `_`,
    /// or a raw hex code such as `0x21`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase().replace('-', "_");
        if let Some(source) = Self::from_name(&normalized) {
            return Ok(source);
        }
        normalized
            .strip_prefix("0X")
            .and_then(|hex| u8::from_str_radix(hex, 16).ok())
            .map(InputSource)
            .ok_or_else(|| UnknownInputSource(s.to_string()))
    }
}

impl fmt::Display for InputSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "0x{:02X}", self.0),
        }
    }
}
