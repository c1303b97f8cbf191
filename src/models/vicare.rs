//! Vendor-side value types and the host framework's climate vocabulary.
//!
//! Notes
//! - Raw program and mode labels stay plain strings; the vendor does not
//!   publish a closed set and the entity must store whatever it reports.
//! - `OperationState` is the presentation enum handed to the host.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// =====================
// Raw vendor labels
// =====================

pub const PROGRAM_COMFORT: &str = "comfort";
pub const PROGRAM_ECO: &str = "eco";
pub const PROGRAM_HOLIDAY: &str = "holiday";
pub const PROGRAM_NORMAL: &str = "normal";
pub const PROGRAM_REDUCED: &str = "reduced";
pub const PROGRAM_STANDBY: &str = "standby";

pub const MODE_DHW_AND_HEATING: &str = "dhwAndHeating";
pub const MODE_FORCED_NORMAL: &str = "forcedNormal";
pub const MODE_FORCED_REDUCED: &str = "forcedReduced";
pub const MODE_HOLIDAY: &str = "holiday";
pub const MODE_NORMAL: &str = "normal";
pub const MODE_STANDBY: &str = "standby";

/// Active modes in which the appliance counts as switched on.
pub const ON_MODES: [&str; 3] = [MODE_DHW_AND_HEATING, MODE_FORCED_REDUCED, MODE_FORCED_NORMAL];

/// Initial raw program before the first poll.
pub const PROGRAM_UNKNOWN: &str = "unknown";

// =====================
// Temperature readings
// =====================

/// A temperature as the vendor reports it: a number, the `"error"` sentinel, or nothing.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub enum TemperatureReading {
    Celsius(f64),
    Error,
    #[default]
    Missing,
}

impl TemperatureReading {
    /// Value in degrees Celsius, if the reading carries one.
    pub fn celsius(&self) -> Option<f64> {
        match self {
            TemperatureReading::Celsius(v) => Some(*v),
            _ => None,
        }
    }

    /// True for a numeric reading; false for the sentinel and for absence.
    pub fn is_usable(&self) -> bool {
        matches!(self, TemperatureReading::Celsius(_))
    }
}

// =====================
// Host vocabulary
// =====================

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationState {
    Off,
    Heat,
    Eco,
    Auto,
    Unknown,
}

/// Operation states a user may request.
pub const OPERATION_LIST: [OperationState; 4] = [
    OperationState::Off,
    OperationState::Heat,
    OperationState::Eco,
    OperationState::Auto,
];

impl OperationState {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationState::Off => "off",
            OperationState::Heat => "heat",
            OperationState::Eco => "eco",
            OperationState::Auto => "auto",
            OperationState::Unknown => "unknown",
        }
    }

    /// Translate a raw vendor program label. Case-insensitive and total.
    pub fn from_program_label(label: &str) -> Self {
        match label.to_lowercase().as_str() {
            "comfort" => OperationState::Heat,
            "sparmodus" | "eco" => OperationState::Eco,
            "normal" | "reduced" => OperationState::Auto,
            "standby" => OperationState::Off,
            _ => OperationState::Unknown,
        }
    }

    /// Vendor program to activate for this state; `None` for `Unknown`.
    pub fn program_label(&self) -> Option<&'static str> {
        match self {
            OperationState::Heat => Some(PROGRAM_COMFORT),
            OperationState::Eco => Some(PROGRAM_ECO),
            OperationState::Auto => Some(PROGRAM_NORMAL),
            OperationState::Off => Some(PROGRAM_STANDBY),
            OperationState::Unknown => None,
        }
    }
}

impl fmt::Display for OperationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperationState {
    type Err = String;

    /// Parses the host's operation-mode names exactly as the host spells them.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "off" => Ok(OperationState::Off),
            "heat" => Ok(OperationState::Heat),
            "eco" => Ok(OperationState::Eco),
            "auto" => Ok(OperationState::Auto),
            "unknown" => Ok(OperationState::Unknown),
            other => Err(format!("unrecognised operation mode: {}", other)),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TemperatureUnit {
    #[serde(rename = "°C")]
    Celsius,
}

/// Climate capability bits, using the host's historical values.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SupportedFeatures(pub u32);

impl SupportedFeatures {
    pub const TARGET_TEMPERATURE: SupportedFeatures = SupportedFeatures(1);
    pub const OPERATION_MODE: SupportedFeatures = SupportedFeatures(128);
    pub const AWAY_MODE: SupportedFeatures = SupportedFeatures(1024);
    pub const ON_OFF: SupportedFeatures = SupportedFeatures(4096);
}
