pub mod models {
    pub mod vicare;
}

pub mod climate;
pub mod config;
pub mod entity;
pub mod platform;
pub mod session;
pub mod services {
    pub mod poller;
    pub mod simulated;
}

use crate::climate::ClimateEntity;
use crate::config::{Config, load_env_file};
use crate::platform::{DEFAULT_ENTITY_NAME, PLATFORM_NAME, setup_platform};
use crate::services::poller;
use crate::services::simulated::SimulatedBoiler;
use log::{error, info};
use std::path::PathBuf;
use std::sync::mpsc;

#[derive(Debug)]
struct LoadedEnvFile {
    path: PathBuf,
    explicit: bool,
}

pub fn run() -> Result<(), String> {
    // 1) Load config
    let cfg = Config::from_env()?;
    info!(
        "Config loaded (user={}, token_file={}, poll_interval={}s, max_cycles={}, seed={})",
        cfg.platform.user,
        cfg.token_file.display(),
        cfg.poll_interval.as_secs(),
        cfg.poll_max_cycles
            .map(|v| v.to_string())
            .unwrap_or_else(|| "-".to_string()),
        cfg.simulation_seed
            .map(|v| v.to_string())
            .unwrap_or_else(|| "-".to_string()),
    );

    // 2) Set up the platform against the simulated boiler
    let (tx, rx) = mpsc::channel();
    let mut entities = Vec::new();
    setup_platform(
        &cfg.platform,
        &cfg.token_file,
        tx,
        |creds| SimulatedBoiler::connect(creds, cfg.simulation_seed),
        |added| entities = added,
    )
    .map_err(|e| format!("Platform setup failed: {}", e))?;
    let mut entity = entities
        .pop()
        .ok_or_else(|| "Platform setup added no entities".to_string())?;
    info!(
        "Platform {} added entity {} (unit={:?}, supported_features={})",
        PLATFORM_NAME,
        entity.name(),
        entity.temperature_unit(),
        entity.supported_features().0
    );

    // 3) Poll loop (steady cadence)
    info!("Starting poll loop: interval={}s", cfg.poll_interval.as_secs());
    let cycles = poller::run_loop(&mut entity, &rx, cfg.poll_interval, cfg.poll_max_cycles)?;
    info!("Poll loop finished after {} cycle(s)", cycles);

    Ok(())
}

fn configure_env_from_cli() -> Result<Option<LoadedEnvFile>, String> {
    let mut args = std::env::args_os();
    args.next(); // skip program name

    let mut env_file: Option<PathBuf> = None;

    while let Some(arg) = args.next() {
        let path = match arg.to_str() {
            Some("--env-file") => args
                .next()
                .map(PathBuf::from)
                .ok_or_else(|| "`--env-file` requires a path argument".to_string())?,
            Some(s) if s.starts_with("--env-file=") => {
                let path_str = &s["--env-file=".len()..];
                if path_str.is_empty() {
                    return Err("`--env-file` requires a path argument".to_string());
                }
                PathBuf::from(path_str)
            }
            Some("--") => break,
            Some(other) => return Err(format!("unrecognised argument: {}", other)),
            None => return Err("argument contains invalid UTF-8".to_string()),
        };
        if env_file.replace(path).is_some() {
            return Err("`--env-file` provided more than once".to_string());
        }
    }

    if let Some(path) = env_file {
        if !path.is_file() {
            return Err(format!("env file not found: {}", path.display()));
        }
        load_env_file(&path)?;
        return Ok(Some(LoadedEnvFile { path, explicit: true }));
    }

    let cwd = std::env::current_dir().map_err(|e| format!("unable to read current directory: {}", e))?;
    let default_path = cwd.join(".env");
    if default_path.is_file() {
        load_env_file(&default_path)?;
        Ok(Some(LoadedEnvFile {
            path: default_path,
            explicit: false,
        }))
    } else {
        Ok(None)
    }
}

fn startup_banner(version: &str, git_hash: &str) -> String {
    format!(
        "vicare-climate {} (git {}) starting: platform={}, entity=climate.{}, session=simulated",
        version, git_hash, PLATFORM_NAME, DEFAULT_ENTITY_NAME
    )
}

fn main() {
    let loaded_env = match configure_env_from_cli() {
        Ok(info) => info,
        Err(err) => {
            eprintln!("fatal: {}", err);
            std::process::exit(1);
        }
    };

    // Init logging after environment so RUST_LOG from .env is respected.
    let default_filter = env_logger::Env::default().default_filter_or("info");
    env_logger::Builder::from_env(default_filter)
        .format_timestamp_secs()
        .init();

    if let Some(info) = loaded_env.as_ref() {
        let origin = if info.explicit { "CLI-specified" } else { "default" };
        info!("Environment loaded from {} .env file: {}", origin, info.path.display());
    }

    info!("{}", startup_banner(env!("CARGO_PKG_VERSION"), env!("BUILD_TIME_GIT_HASH")));
    if let Err(e) = run() {
        error!("fatal: {}", e);
        std::process::exit(1);
    }
}
