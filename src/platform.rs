//! Platform setup: turns the host's `vicare` config block into a climate entity.

use log::info;
use serde::Deserialize;
use std::error::Error;
use std::fmt::{self, Display, Formatter};
use std::path::Path;

use crate::climate::StateNotifier;
use crate::entity::ViCareClimate;
use crate::session::{SessionCredentials, SessionError, VendorSession};

pub const PLATFORM_NAME: &str = "vicare";
pub const CONF_USER: &str = "user";
pub const CONF_PASSWORD: &str = "password";
pub const DEFAULT_ENTITY_NAME: &str = "vicare";

#[derive(Debug)]
pub enum PlatformError {
    /// The config block is malformed; `path` names the offending key.
    Config { path: String, message: String },
    /// The block belongs to another platform.
    WrongPlatform(String),
    /// Logging in to the vendor failed.
    Session(SessionError),
}

impl Display for PlatformError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            PlatformError::Config { path, message } => write!(f, "invalid platform config at `{}`: {}", path, message),
            PlatformError::WrongPlatform(p) => write!(f, "config is for platform `{}`, not `{}`", p, PLATFORM_NAME),
            PlatformError::Session(e) => write!(f, "vendor login failed: {}", e),
        }
    }
}

impl Error for PlatformError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            PlatformError::Session(e) => Some(e),
            _ => None,
        }
    }
}

impl From<SessionError> for PlatformError {
    fn from(value: SessionError) -> Self {
        PlatformError::Session(value)
    }
}

/// The host's config block for this platform.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlatformConfig {
    #[serde(default)]
    pub platform: Option<String>,
    pub user: String,
    pub password: String,
}

impl PlatformConfig {
    pub fn new(user: impl Into<String>, password: impl Into<String>) -> Self {
        PlatformConfig {
            platform: Some(PLATFORM_NAME.to_string()),
            user: user.into(),
            password: password.into(),
        }
    }

    pub fn from_json(json: &str) -> Result<Self, PlatformError> {
        let mut de = serde_json::Deserializer::from_str(json);
        let cfg: PlatformConfig = serde_path_to_error::deserialize(&mut de).map_err(|e| PlatformError::Config {
            path: e.path().to_string(),
            message: e.inner().to_string(),
        })?;
        de.end().map_err(|e| PlatformError::Config {
            path: ".".to_string(),
            message: e.to_string(),
        })?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), PlatformError> {
        if let Some(p) = self.platform.as_deref()
            && p != PLATFORM_NAME
        {
            return Err(PlatformError::WrongPlatform(p.to_string()));
        }
        for (key, value) in [(CONF_USER, &self.user), (CONF_PASSWORD, &self.password)] {
            if value.trim().is_empty() {
                return Err(PlatformError::Config {
                    path: key.to_string(),
                    message: "must not be empty".to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Log in once and hand the host a single climate entity.
///
/// `connect` is the vendor client's login; it runs exactly once, after the
/// config has been validated.
pub fn setup_platform<S, N, C, A>(
    config: &PlatformConfig,
    token_file: &Path,
    notifier: N,
    connect: C,
    add_entities: A,
) -> Result<(), PlatformError>
where
    S: VendorSession,
    N: StateNotifier,
    C: FnOnce(&SessionCredentials) -> Result<S, SessionError>,
    A: FnOnce(Vec<ViCareClimate<S, N>>),
{
    config.validate()?;
    let credentials = SessionCredentials {
        user: config.user.clone(),
        password: config.password.clone(),
        token_file: token_file.to_path_buf(),
    };
    let session = connect(&credentials)?;
    info!("Platform {}: vendor session established for {}", PLATFORM_NAME, credentials.user);
    add_entities(vec![ViCareClimate::new(DEFAULT_ENTITY_NAME, session, notifier)]);
    Ok(())
}
