//! Seam to the vendor's device-control client.
//!
//! The client itself (login, token refresh, transport) lives outside this crate.
//! Everything the climate entity needs from it is the blocking call set below.

use std::path::PathBuf;

use crate::models::vicare::TemperatureReading;

/// Where the vendor client caches its OAuth token unless told otherwise.
pub const DEFAULT_TOKEN_FILE: &str = "/tmp/vicare_token.save";

#[derive(Debug)]
pub enum SessionError {
    /// Login or token refresh was refused.
    Auth(String),
    /// The device or the vendor cloud could not be reached.
    Transport(String),
    /// The vendor answered but rejected the call.
    Rejected { operation: String, message: String },
}

impl core::fmt::Display for SessionError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            SessionError::Auth(e) => write!(f, "auth error: {}", e),
            SessionError::Transport(s) => write!(f, "transport error: {}", s),
            SessionError::Rejected { operation, message } => write!(f, "{} rejected: {}", operation, message),
        }
    }
}

impl std::error::Error for SessionError {}

/// Login material handed to the vendor client at platform setup.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionCredentials {
    pub user: String,
    pub password: String,
    pub token_file: PathBuf,
}

/// Blocking vendor API used by the climate entity.
pub trait VendorSession {
    fn get_room_temperature(&mut self) -> Result<TemperatureReading, SessionError>;
    fn get_boiler_temperature(&mut self) -> Result<TemperatureReading, SessionError>;
    fn get_active_program(&mut self) -> Result<String, SessionError>;
    fn get_current_desired_temperature(&mut self) -> Result<TemperatureReading, SessionError>;
    fn get_active_mode(&mut self) -> Result<String, SessionError>;
    fn activate_program(&mut self, program: &str) -> Result<(), SessionError>;
    fn deactivate_program(&mut self, program: &str) -> Result<(), SessionError>;
    fn set_mode(&mut self, mode: &str) -> Result<(), SessionError>;
    fn set_program_temperature(&mut self, program: &str, celsius: f64) -> Result<(), SessionError>;
}
