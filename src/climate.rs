//! Contract between a climate entity and the host framework.
//!
//! The host owns scheduling and lifecycle: it calls `update` on its own cadence,
//! forwards user commands, and reads properties to render state. Entities call
//! back through `StateNotifier` whenever they change local state ahead of a poll.

use chrono::{DateTime, Utc};
use log::debug;
use serde::Serialize;
use std::error::Error;
use std::fmt::{self, Display, Formatter};
use std::sync::mpsc::Sender;

use crate::models::vicare::{OperationState, SupportedFeatures, TemperatureUnit};
use crate::session::SessionError;

#[derive(Debug)]
pub enum ClimateError {
    /// A set-mode command named something outside the operation list.
    InvalidModeRequested(String),
    /// A vendor call failed; passed through untouched.
    Vendor(SessionError),
}

impl Display for ClimateError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ClimateError::InvalidModeRequested(m) => write!(f, "invalid operation mode: {}", m),
            ClimateError::Vendor(e) => write!(f, "vendor call failed: {}", e),
        }
    }
}

impl Error for ClimateError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ClimateError::Vendor(e) => Some(e),
            _ => None,
        }
    }
}

impl From<SessionError> for ClimateError {
    fn from(value: SessionError) -> Self {
        ClimateError::Vendor(value)
    }
}

/// Request from an entity asking the host to re-publish its state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshRequest {
    pub entity: String,
}

pub trait StateNotifier {
    fn schedule_update_state(&self, entity: &str);
}

impl StateNotifier for Sender<RefreshRequest> {
    fn schedule_update_state(&self, entity: &str) {
        let request = RefreshRequest {
            entity: entity.to_string(),
        };
        if self.send(request).is_err() {
            debug!("Refresh for {} dropped: host receiver is gone", entity);
        }
    }
}

/// Attribute snapshot the host publishes for a climate entity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClimateState {
    pub name: String,
    pub state: OperationState,
    pub current_temperature: Option<f64>,
    pub temperature: Option<f64>,
    pub unit_of_measurement: TemperatureUnit,
    pub operation_mode: OperationState,
    pub operation_list: Vec<OperationState>,
    pub away_mode: Option<bool>,
    pub is_on: Option<bool>,
    pub supported_features: SupportedFeatures,
    pub last_updated: Option<DateTime<Utc>>,
}

pub trait ClimateEntity {
    fn name(&self) -> &str;
    fn temperature_unit(&self) -> TemperatureUnit;
    fn supported_features(&self) -> SupportedFeatures;
    fn current_temperature(&self) -> Option<f64>;
    fn target_temperature(&self) -> Option<f64>;
    fn current_operation(&self) -> OperationState;
    fn operation_list(&self) -> &[OperationState];
    fn is_away_mode_on(&self) -> Option<bool>;
    fn is_on(&self) -> Option<bool>;
    /// Time of the last poll that completed without error.
    fn last_updated(&self) -> Option<DateTime<Utc>>;

    /// Refresh local state from the device.
    fn update(&mut self) -> Result<(), ClimateError>;
    /// Store `temperature` (when given) as the target and push it to the active program.
    ///
    /// With no argument and no target known yet (nothing polled), no device call is
    /// made; the refresh notification is still sent.
    fn set_temperature(&mut self, temperature: Option<f64>) -> Result<(), ClimateError>;
    fn set_operation_mode(&mut self, operation_mode: &str) -> Result<(), ClimateError>;
    fn turn_away_mode_on(&mut self) -> Result<(), ClimateError>;
    fn turn_away_mode_off(&mut self) -> Result<(), ClimateError>;
    fn turn_on(&mut self) -> Result<(), ClimateError>;
    fn turn_off(&mut self) -> Result<(), ClimateError>;

    fn state(&self) -> ClimateState {
        let operation = self.current_operation();
        ClimateState {
            name: self.name().to_string(),
            state: operation,
            current_temperature: self.current_temperature(),
            temperature: self.target_temperature(),
            unit_of_measurement: self.temperature_unit(),
            operation_mode: operation,
            operation_list: self.operation_list().to_vec(),
            away_mode: self.is_away_mode_on(),
            is_on: self.is_on(),
            supported_features: self.supported_features(),
            last_updated: self.last_updated(),
        }
    }
}
