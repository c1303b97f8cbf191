//! Runtime configuration from the process environment and an optional `.env` file.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::platform::PlatformConfig;
use crate::session::DEFAULT_TOKEN_FILE;

pub const DEFAULT_POLL_SECS: u64 = 60;

#[derive(Debug, Clone)]
pub struct Config {
    /// The `vicare` platform block (user and password).
    pub platform: PlatformConfig,
    /// Where the vendor client caches its token between runs.
    pub token_file: PathBuf,
    pub poll_interval: Duration,
    /// Stop after this many poll cycles; run forever when unset.
    pub poll_max_cycles: Option<u64>,
    pub simulation_seed: Option<u64>,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        let platform = match non_empty_var("VICARE_PLATFORM_CONFIG") {
            Some(path) => {
                let json = fs::read_to_string(&path).map_err(|e| format!("failed to read {}: {}", path, e))?;
                PlatformConfig::from_json(&json).map_err(|e| format!("{}: {}", path, e))?
            }
            None => {
                let user = non_empty_var("VICARE_USER")
                    .ok_or_else(|| "Missing credentials: set VICARE_USER or VICARE_PLATFORM_CONFIG".to_string())?;
                let password = non_empty_var("VICARE_PASSWORD")
                    .ok_or_else(|| "Missing credentials: set VICARE_PASSWORD or VICARE_PLATFORM_CONFIG".to_string())?;
                let cfg = PlatformConfig::new(user, password);
                cfg.validate().map_err(|e| e.to_string())?;
                cfg
            }
        };

        let token_file = non_empty_var("VICARE_TOKEN_FILE").unwrap_or_else(|| DEFAULT_TOKEN_FILE.to_string());

        let poll_secs = match non_empty_var("POLL_INTERVAL_SECS") {
            Some(s) => match s.parse::<u64>() {
                Ok(v) if v > 0 => v,
                _ => return Err("POLL_INTERVAL_SECS must be a positive integer".to_string()),
            },
            None => DEFAULT_POLL_SECS,
        };

        let poll_max_cycles = non_empty_var("POLL_MAX_CYCLES")
            .map(|s| s.parse::<u64>())
            .transpose()
            .map_err(|_| "POLL_MAX_CYCLES must be a non-negative integer".to_string())?;

        let simulation_seed = non_empty_var("SIMULATION_SEED")
            .map(|s| s.parse::<u64>())
            .transpose()
            .map_err(|_| "SIMULATION_SEED must be an unsigned integer".to_string())?;

        Ok(Config {
            platform,
            token_file: PathBuf::from(token_file),
            poll_interval: Duration::from_secs(poll_secs),
            poll_max_cycles,
            simulation_seed,
        })
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Apply `KEY=VALUE` lines from `path`. Variables already set in the process win.
pub fn load_env_file(path: &Path) -> Result<(), String> {
    let contents = fs::read_to_string(path).map_err(|e| format!("failed to read {}: {}", path.display(), e))?;
    for (index, line) in contents.lines().enumerate() {
        let parsed = parse_env_assignment(line).map_err(|e| format!("{}:{}: {}", path.display(), index + 1, e))?;
        if let Some((key, value)) = parsed
            && std::env::var_os(&key).is_none()
        {
            // Updating process-level environment variables is unsafe on some targets.
            unsafe {
                std::env::set_var(key, value);
            }
        }
    }
    Ok(())
}

fn parse_env_assignment(line: &str) -> Result<Option<(String, String)>, String> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(None);
    }
    let assignment = trimmed.strip_prefix("export ").map(str::trim_start).unwrap_or(trimmed);
    let (key, raw) = assignment
        .split_once('=')
        .ok_or_else(|| "missing '=' in assignment".to_string())?;
    let key = key.trim();
    if key.is_empty() || key.chars().any(char::is_whitespace) {
        return Err(format!("invalid environment variable name: {:?}", key));
    }

    let raw = raw.trim();
    let value = match raw.chars().next() {
        Some(q @ ('"' | '\'')) => {
            let inner = &raw[1..];
            let end = inner.find(q).ok_or_else(|| format!("unterminated {} quoted value", q))?;
            let rest = inner[end + 1..].trim();
            if !rest.is_empty() && !rest.starts_with('#') {
                return Err("unexpected characters after closing quote".to_string());
            }
            inner[..end].to_string()
        }
        _ => raw.split('#').next().unwrap_or_default().trim_end().to_string(),
    };
    Ok(Some((key.to_string(), value)))
}
